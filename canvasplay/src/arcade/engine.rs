// engine.rs

use std::io;
use std::time::{Duration, Instant};

use canvasloop::engine::{
    controller::{GameController, HostView, SessionStatus},
    Game,
};
use canvasloop::games::pong::PongScore;
use ratatui::{prelude::*, widgets::*};
use tracing::warn;

use super::input::GameInput;
use super::render_engine::SurfaceView;

const PANEL_WIDTH: u16 = 26;
const MIN_SURFACE: (u16, u16) = (24, 12);
const MAX_POLL: Duration = Duration::from_millis(50);

pub trait Engine {
    fn tick(&mut self, input: Option<GameInput>) -> io::Result<bool>;
    fn render_frame(&self, frame: &mut Frame);
}

/// How a score is shown in the side panel.
pub trait ScoreLabel {
    fn label(&self) -> Option<String>;
}

impl ScoreLabel for PongScore {
    fn label(&self) -> Option<String> {
        Some(format!("CPU {}  You {}", self.left, self.right))
    }
}

impl ScoreLabel for u32 {
    fn label(&self) -> Option<String> {
        Some(format!("Score {self}"))
    }
}

impl ScoreLabel for () {
    fn label(&self) -> Option<String> {
        None
    }
}

fn controls(game: &str) -> &'static [(&'static str, &'static str)] {
    match game {
        "pong" => &[("W/S", "move paddle")],
        "snake" => &[("WASD", "steer")],
        _ => &[],
    }
}

/// Hosts one game controller in the terminal.
pub struct ArcadeEngine<G: Game> {
    controller: GameController<G>,
    notice: Option<String>,
}

impl<G: Game> ArcadeEngine<G>
where
    G::Score: ScoreLabel,
{
    pub fn new(controller: GameController<G>, terminal_size: (u16, u16)) -> Self {
        let mut engine = Self {
            controller,
            notice: None,
        };
        engine.resize(terminal_size, Instant::now());
        engine
    }

    /// How long the host may wait for input before the next frame is due.
    pub fn poll_timeout(&self, now: Instant) -> Duration {
        self.controller
            .next_deadline()
            .map_or(MAX_POLL, |deadline| {
                deadline.saturating_duration_since(now).min(MAX_POLL)
            })
    }

    pub fn shutdown(&mut self) {
        self.controller.stop(Instant::now());
    }

    fn resize(&mut self, (width, height): (u16, u16), now: Instant) {
        let fits = width.saturating_sub(PANEL_WIDTH) >= MIN_SURFACE.0 && height >= MIN_SURFACE.1;
        match (fits, self.controller.surface().is_some()) {
            (true, false) => self.controller.attach_surface(),
            (false, true) => self.controller.detach_surface(now),
            _ => {}
        }
    }

    fn begin(&mut self, restart: bool, now: Instant) {
        let result = if restart {
            self.controller.restart(now)
        } else {
            self.controller.start(now)
        };
        self.notice = match result {
            Ok(()) => None,
            Err(err) => {
                warn!(game = G::NAME, "could not start: {err}");
                Some(err.to_string())
            }
        };
    }

    fn status_lines(&self, view: &HostView<G::Score>) -> Vec<Line<'static>> {
        let (status, status_color) = match view.status {
            SessionStatus::Idle => ("Idle", Color::Gray),
            SessionStatus::Running => ("Running", Color::Green),
            SessionStatus::Ended => ("Game over", Color::Red),
        };
        let mut lines = vec![
            Line::from(vec![
                Span::raw("Status "),
                Span::styled(status, Style::default().fg(status_color).bold()),
            ]),
        ];
        if let Some(score) = view.score.label() {
            lines.push(Line::from(score));
        }
        if let Some(crash) = &view.crash {
            lines.push(Line::from(crash.clone().red()));
        }
        if let Some(notice) = &self.notice {
            lines.push(Line::from(notice.clone().yellow()));
        }
        lines.push(Line::default());
        let keys = [
            ("Enter", "start"),
            ("r", "restart"),
            ("x", "stop"),
            ("q", "quit"),
        ];
        for (key, action) in controls(G::NAME).iter().chain(keys.iter()) {
            lines.push(Line::from(vec![
                Span::styled(format!("{key:<6}"), Style::default().fg(Color::LightBlue)),
                Span::raw(*action),
            ]));
        }
        lines
    }
}

impl<G: Game> Engine for ArcadeEngine<G>
where
    G::Score: ScoreLabel,
{
    fn tick(&mut self, user_input: Option<GameInput>) -> io::Result<bool> {
        let now = Instant::now();
        let mut should_quit = false;
        match user_input {
            Some(GameInput::Quit) => should_quit = true,
            Some(GameInput::Start) => self.begin(false, now),
            Some(GameInput::Restart) => self.begin(true, now),
            Some(GameInput::Stop) => self.controller.stop(now),
            Some(GameInput::KeyDown(key)) => self.controller.key_down(key, now),
            Some(GameInput::KeyUp(key)) => self.controller.key_up(key),
            Some(GameInput::Resize(width, height)) => self.resize((width, height), now),
            None => {}
        }
        self.controller.frame(now);
        Ok(should_quit)
    }

    fn render_frame(&self, frame: &mut Frame) {
        let [game_area, panel_area] =
            Layout::horizontal([Constraint::Min(0), Constraint::Length(PANEL_WIDTH)])
                .areas(frame.size());
        frame.render_widget(
            SurfaceView::new(G::NAME, self.controller.surface()),
            game_area,
        );
        let panel = Paragraph::new(self.status_lines(self.controller.view()))
            .wrap(Wrap { trim: true })
            .block(Block::bordered().title("Arcade"));
        frame.render_widget(panel, panel_area);
    }
}
