// controller.rs

use std::panic::{self, AssertUnwindSafe};
use std::time::{Duration, Instant};

use rand::{Rng, SeedableRng};
use rand_xorshift::XorShiftRng;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::config::SchedulerConfig;
use super::error::{GameLoopError, Result};
use super::input::{InputLatch, Key};
use super::scheduler::FrameScheduler;
use super::surface::{DrawList, Rgb, Surface};
use super::{Game, StepOutcome};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionStatus {
    Idle,
    Running,
    Ended,
}

/// What the host UI gets to see of the session. Refreshed by the controller
/// at most once per publish interval, and on every lifecycle transition.
#[derive(Clone, Debug, PartialEq)]
pub struct HostView<S> {
    pub status: SessionStatus,
    pub score: S,
    /// Set when the session ended because a tick failed.
    pub crash: Option<String>,
}

impl<S> HostView<S> {
    pub fn is_running(&self) -> bool {
        self.status == SessionStatus::Running
    }

    pub fn game_over(&self) -> bool {
        self.status == SessionStatus::Ended
    }
}

struct GameSession<G> {
    id: Uuid,
    game: G,
    status: SessionStatus,
    ticks: u64,
    crash: Option<String>,
}

/// Start/restart/stop entry points for one game, plus the per-frame driver.
pub struct GameController<G: Game> {
    config: G::Config,
    scheduler: FrameScheduler,
    input: InputLatch,
    session: Option<GameSession<G>>,
    surface: Option<DrawList>,
    rng: XorShiftRng,
    view: HostView<G::Score>,
    publish_interval: Duration,
    last_publish: Option<Instant>,
    key_hold: Option<Duration>,
}

impl<G: Game> GameController<G> {
    pub fn new(config: G::Config, scheduler_config: &SchedulerConfig, seed: u64) -> Self {
        Self {
            config,
            scheduler: FrameScheduler::new(scheduler_config.frame_interval()),
            input: InputLatch::new(),
            session: None,
            surface: None,
            rng: XorShiftRng::seed_from_u64(seed),
            view: HostView {
                status: SessionStatus::Idle,
                score: G::Score::default(),
                crash: None,
            },
            publish_interval: scheduler_config.publish_interval(),
            last_publish: None,
            key_hold: scheduler_config.key_hold(),
        }
    }

    /// Mounts the render surface.
    pub fn attach_surface(&mut self) {
        let (width, height) = G::canvas_size(&self.config);
        let mut surface = DrawList::new(width, height);
        match &self.session {
            Some(session) => render_session(&session.game, &mut surface),
            None => render_idle::<G>(&self.config, &mut surface),
        }
        self.surface = Some(surface);
    }

    /// Unmounts the surface. A running session is stopped.
    pub fn detach_surface(&mut self, now: Instant) {
        if self.scheduler.is_running() {
            warn!(game = G::NAME, "render surface detached while running");
            self.stop(now);
        }
        self.surface = None;
    }

    pub fn surface(&self) -> Option<&DrawList> {
        self.surface.as_ref()
    }

    /// Begins a session unless one is already running, in which case this
    /// does nothing.
    pub fn start(&mut self, now: Instant) -> Result<()> {
        if self.status() == SessionStatus::Running {
            debug!(game = G::NAME, "start ignored, already running");
            return Ok(());
        }
        self.begin_session(now)
    }

    /// Throws away the current session, if any, and begins a fresh one.
    pub fn restart(&mut self, now: Instant) -> Result<()> {
        self.begin_session(now)
    }

    /// Tears the loop down and returns to idle.
    pub fn stop(&mut self, now: Instant) {
        self.teardown();
        if let Some(session) = self.session.take() {
            info!(game = G::NAME, session = %session.id, ticks = session.ticks, "session stopped");
        }
        if let Some(surface) = self.surface.as_mut() {
            render_idle::<G>(&self.config, surface);
        }
        self.publish(now, true);
    }

    pub fn key_down(&mut self, key: Key, now: Instant) {
        self.input.key_down(key, now);
    }

    pub fn key_up(&mut self, key: Key) {
        self.input.key_up(key);
    }

    pub fn status(&self) -> SessionStatus {
        self.session
            .as_ref()
            .map_or(SessionStatus::Idle, |session| session.status)
    }

    /// Authoritative score of the current session.
    pub fn score(&self) -> G::Score {
        self.session
            .as_ref()
            .map_or_else(G::Score::default, |session| session.game.score())
    }

    pub fn view(&self) -> &HostView<G::Score> {
        &self.view
    }

    pub fn game(&self) -> Option<&G> {
        self.session.as_ref().map(|session| &session.game)
    }

    /// Simulation ticks performed by the current session.
    pub fn ticks(&self) -> u64 {
        self.session.as_ref().map_or(0, |session| session.ticks)
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.scheduler.next_deadline()
    }

    /// Runs one frame if one is due: input, step, render, in that order.
    /// Returns whether a frame ran.
    pub fn frame(&mut self, now: Instant) -> bool {
        if let Some(hold) = self.key_hold {
            self.input.release_stale(now, hold);
        }
        let session = &mut self.session;
        let input = &mut self.input;
        let surface = &mut self.surface;
        let mut ended = false;

        let ran = self.scheduler.run_due(now, |handle, now| {
            let (Some(session), Some(surface)) = (session.as_mut(), surface.as_mut()) else {
                warn!(game = G::NAME, "frame without session or surface, stopping loop");
                handle.stop();
                return;
            };
            if !handle.is_running() || session.status != SessionStatus::Running {
                return;
            }
            let snapshot = input.snapshot();
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| -> Result<StepOutcome> {
                let outcome = session.game.step(&snapshot, now)?;
                render_session(&session.game, surface);
                Ok(outcome)
            }));

            let failure = match outcome {
                Ok(Ok(StepOutcome::Idle)) => None,
                Ok(Ok(StepOutcome::Advanced)) => {
                    session.ticks += 1;
                    None
                }
                Ok(Ok(StepOutcome::Ended)) => {
                    session.ticks += 1;
                    session.status = SessionStatus::Ended;
                    info!(
                        game = G::NAME,
                        session = %session.id,
                        ticks = session.ticks,
                        score = ?session.game.score(),
                        "session ended"
                    );
                    None
                }
                Ok(Err(err)) => Some(err),
                Err(payload) => Some(GameLoopError::TickPanicked {
                    game: G::NAME,
                    tick: session.ticks,
                    message: panic_message(payload.as_ref()),
                }),
            };
            if let Some(err) = failure {
                error!(game = G::NAME, session = %session.id, "tick failed: {err}");
                session.status = SessionStatus::Ended;
                session.crash = Some(err.to_string());
            }
            if session.status == SessionStatus::Ended {
                handle.stop();
                ended = true;
            }
        });

        if ended {
            self.input.unsubscribe();
        }
        if ran {
            self.publish(now, ended);
        }
        ran
    }

    fn begin_session(&mut self, now: Instant) -> Result<()> {
        if self.surface.is_none() {
            warn!(game = G::NAME, "render surface unavailable, not starting");
            return Err(GameLoopError::SurfaceUnavailable);
        }
        self.teardown();
        let seed = self.rng.gen::<u64>();
        let session = GameSession {
            id: Uuid::new_v4(),
            game: G::new(&self.config, seed, now),
            status: SessionStatus::Running,
            ticks: 0,
            crash: None,
        };
        info!(game = G::NAME, session = %session.id, seed, "session started");
        if let Some(surface) = self.surface.as_mut() {
            render_session(&session.game, surface);
        }
        self.session = Some(session);
        self.input.subscribe();
        self.scheduler.start(now);
        self.publish(now, true);
        Ok(())
    }

    fn teardown(&mut self) {
        self.scheduler.stop();
        self.input.unsubscribe();
    }

    fn publish(&mut self, now: Instant, force: bool) {
        let due = self
            .last_publish
            .map_or(true, |last| now.saturating_duration_since(last) >= self.publish_interval);
        if !force && !due {
            return;
        }
        self.view = HostView {
            status: self.status(),
            score: self.score(),
            crash: self
                .session
                .as_ref()
                .and_then(|session| session.crash.clone()),
        };
        self.last_publish = Some(now);
    }
}

fn render_session<G: Game>(game: &G, surface: &mut DrawList) {
    surface.clear(Rgb::BLACK);
    game.render(surface);
}

fn render_idle<G: Game>(config: &G::Config, surface: &mut DrawList) {
    surface.clear(Rgb::BLACK);
    G::render_idle(config, surface);
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::input::InputSnapshot;

    const FRAME: Duration = Duration::from_millis(10);

    #[derive(Clone, Default)]
    struct CounterConfig {
        end_after: Option<u32>,
        panic_at: Option<u32>,
        fail_at: Option<u32>,
    }

    struct Counter {
        config: CounterConfig,
        steps: u32,
        seen_presses: u32,
    }

    impl Game for Counter {
        type Config = CounterConfig;
        type Score = u32;

        const NAME: &'static str = "counter";

        fn new(config: &CounterConfig, _seed: u64, _now: Instant) -> Self {
            Self {
                config: config.clone(),
                steps: 0,
                seen_presses: 0,
            }
        }

        fn canvas_size(_config: &CounterConfig) -> (f32, f32) {
            (300.0, 300.0)
        }

        fn step(&mut self, input: &InputSnapshot, _now: Instant) -> Result<StepOutcome> {
            self.steps += 1;
            self.seen_presses += input.presses().len() as u32;
            if self.config.panic_at == Some(self.steps) {
                panic!("counter blew up");
            }
            if self.config.fail_at == Some(self.steps) {
                return Err(GameLoopError::CellOccupied { x: 0, y: 0 });
            }
            if self.config.end_after == Some(self.steps) {
                return Ok(StepOutcome::Ended);
            }
            Ok(StepOutcome::Advanced)
        }

        fn render(&self, surface: &mut dyn Surface) {
            surface.text(0.0, 0.0, &format!("steps {}", self.steps), Rgb::WHITE);
        }

        fn score(&self) -> u32 {
            self.steps
        }

        fn render_idle(_config: &CounterConfig, surface: &mut dyn Surface) {
            surface.text(0.0, 0.0, "idle", Rgb::WHITE);
        }
    }

    fn controller(config: CounterConfig) -> GameController<Counter> {
        let scheduler = SchedulerConfig {
            fps: 100,
            publish_interval_ms: 50,
            key_hold_ms: None,
        };
        GameController::new(config, &scheduler, 7)
    }

    fn run_frames(controller: &mut GameController<Counter>, start: Instant, frames: u32) -> Instant {
        let mut now = start;
        for _ in 0..frames {
            controller.frame(now);
            now += FRAME;
        }
        now
    }

    #[test]
    fn test_start_without_surface_declines() {
        let mut controller = controller(CounterConfig::default());
        let result = controller.start(Instant::now());
        assert!(matches!(result, Err(GameLoopError::SurfaceUnavailable)));
        assert_eq!(controller.status(), SessionStatus::Idle);
        assert!(!controller.frame(Instant::now()));
    }

    #[test]
    fn test_idle_screen_on_attach() {
        let mut controller = controller(CounterConfig::default());
        controller.attach_surface();
        let texts: Vec<_> = controller.surface().unwrap().texts().collect();
        assert_eq!(texts, vec!["idle"]);
    }

    #[test]
    fn test_frames_step_and_render() {
        let now = Instant::now();
        let mut controller = controller(CounterConfig::default());
        controller.attach_surface();
        controller.start(now).unwrap();
        run_frames(&mut controller, now, 3);
        assert_eq!(controller.ticks(), 3);
        assert_eq!(controller.score(), 3);
        let texts: Vec<_> = controller.surface().unwrap().texts().collect();
        assert_eq!(texts, vec!["steps 3"]);
    }

    #[test]
    fn test_start_while_running_is_noop() {
        let now = Instant::now();
        let mut controller = controller(CounterConfig::default());
        controller.attach_surface();
        controller.start(now).unwrap();
        let later = run_frames(&mut controller, now, 4);
        controller.start(later).unwrap();
        assert_eq!(controller.score(), 4);
    }

    #[test]
    fn test_restart_resets_score() {
        let now = Instant::now();
        let mut controller = controller(CounterConfig::default());
        controller.attach_surface();
        controller.start(now).unwrap();
        let later = run_frames(&mut controller, now, 4);
        controller.restart(later).unwrap();
        assert_eq!(controller.score(), 0);
        assert_eq!(controller.view().score, 0);
        assert!(controller.view().is_running());
    }

    #[test]
    fn test_stop_prevents_further_ticks() {
        let now = Instant::now();
        let mut controller = controller(CounterConfig::default());
        controller.attach_surface();
        controller.start(now).unwrap();
        let later = run_frames(&mut controller, now, 2);
        controller.stop(later);
        assert!(!controller.frame(later + FRAME));
        assert!(!controller.frame(later + FRAME * 2));
        assert_eq!(controller.status(), SessionStatus::Idle);
        assert_eq!(controller.next_deadline(), None);
    }

    #[test]
    fn test_ended_session_keeps_score_until_restart() {
        let now = Instant::now();
        let mut controller = controller(CounterConfig {
            end_after: Some(2),
            ..Default::default()
        });
        controller.attach_surface();
        controller.start(now).unwrap();
        let later = run_frames(&mut controller, now, 5);
        assert_eq!(controller.status(), SessionStatus::Ended);
        assert_eq!(controller.ticks(), 2);
        assert!(controller.view().game_over());
        assert_eq!(controller.view().score, 2);

        controller.start(later).unwrap();
        assert_eq!(controller.status(), SessionStatus::Running);
        assert_eq!(controller.score(), 0);
    }

    #[test]
    fn test_panicking_tick_stops_loop() {
        let now = Instant::now();
        let mut controller = controller(CounterConfig {
            panic_at: Some(2),
            ..Default::default()
        });
        controller.attach_surface();
        controller.start(now).unwrap();
        let later = run_frames(&mut controller, now, 2);
        assert_eq!(controller.status(), SessionStatus::Ended);
        assert!(!controller.frame(later));
        let crash = controller.view().crash.clone().unwrap();
        assert!(crash.contains("counter blew up"));
    }

    #[test]
    fn test_failing_tick_stops_loop() {
        let now = Instant::now();
        let mut controller = controller(CounterConfig {
            fail_at: Some(1),
            ..Default::default()
        });
        controller.attach_surface();
        controller.start(now).unwrap();
        run_frames(&mut controller, now, 3);
        assert_eq!(controller.status(), SessionStatus::Ended);
        assert!(controller.view().crash.is_some());
    }

    #[test]
    fn test_view_is_throttled() {
        let now = Instant::now();
        let mut controller = controller(CounterConfig::default());
        controller.attach_surface();
        controller.start(now).unwrap();
        // first frame lands within the publish interval of the start
        controller.frame(now);
        assert_eq!(controller.score(), 1);
        assert_eq!(controller.view().score, 0);
        run_frames(&mut controller, now + FRAME, 5);
        assert_eq!(controller.view().score, controller.score());
    }

    #[test]
    fn test_input_reaches_step_only_while_running() {
        let now = Instant::now();
        let mut controller = controller(CounterConfig::default());
        controller.attach_surface();
        controller.key_down(Key::W, now);
        controller.start(now).unwrap();
        controller.key_down(Key::S, now);
        controller.frame(now);
        assert_eq!(controller.game().unwrap().seen_presses, 1);
    }

    #[test]
    fn test_detach_stops_running_session() {
        let now = Instant::now();
        let mut controller = controller(CounterConfig::default());
        controller.attach_surface();
        controller.start(now).unwrap();
        controller.detach_surface(now);
        assert_eq!(controller.status(), SessionStatus::Idle);
        assert!(matches!(
            controller.restart(now),
            Err(GameLoopError::SurfaceUnavailable)
        ));
    }
}
