mod engine;
mod input;
mod render_engine;

use std::{io, time::Instant};

use canvasloop::engine::{
    config::{ArcadeConfig, SchedulerConfig},
    controller::GameController,
    Game,
};
use canvasloop::games::{pong::PongGame, rain::RainGame, snake::SnakeGame};
use input::handle_events;
use rand::Rng;
use tracing::info;

use crate::ArcadeMode;

use self::{
    engine::{ArcadeEngine, Engine, ScoreLabel},
    render_engine::RenderEngine,
};

// Held keys are released after this long when the terminal never reports
// key releases. Has to outlast the autorepeat delay (250-500ms on most
// systems) or a held key drops between the first press and the repeats. A
// released key keeps acting for up to this long.
const FALLBACK_KEY_HOLD_MS: u64 = 550;

pub fn game_loop(mode: ArcadeMode, mut config: ArcadeConfig, seed: Option<u64>) -> io::Result<()> {
    let seed = seed.unwrap_or_else(|| rand::thread_rng().gen());
    let mut render_engine = RenderEngine::init_render_engine()?;
    apply_key_hold_fallback(&mut config.scheduler, render_engine.reports_key_release());
    info!(?mode, seed, "starting arcade");

    let result = match mode {
        ArcadeMode::Pong => {
            let game_config = config.pong.clone();
            run::<PongGame>(game_config, &config, seed, &mut render_engine)
        }
        ArcadeMode::Snake { .. } => {
            let game_config = config.snake.clone();
            run::<SnakeGame>(game_config, &config, seed, &mut render_engine)
        }
        ArcadeMode::Rain => {
            let game_config = config.rain.clone();
            run::<RainGame>(game_config, &config, seed, &mut render_engine)
        }
    };
    // the terminal is restored even when the loop failed
    render_engine.deinit_render_engine()?;
    result
}

fn apply_key_hold_fallback(scheduler: &mut SchedulerConfig, reports_key_release: bool) {
    if !reports_key_release && scheduler.key_hold_ms.is_none() {
        scheduler.key_hold_ms = Some(FALLBACK_KEY_HOLD_MS);
    }
}

fn run<G>(
    game_config: G::Config,
    config: &ArcadeConfig,
    seed: u64,
    render_engine: &mut RenderEngine,
) -> io::Result<()>
where
    G: Game,
    G::Score: ScoreLabel,
{
    let controller = GameController::<G>::new(game_config, &config.scheduler, seed);
    let mut arcade_engine = ArcadeEngine::new(controller, crossterm::terminal::size()?);
    let mut should_quit = false;
    while !should_quit {
        // rendering
        render_engine.render(|frame| arcade_engine.render_frame(frame))?;
        // tick
        let user_input = handle_events(arcade_engine.poll_timeout(Instant::now()))?;
        should_quit = arcade_engine.tick(user_input)?;
    }
    arcade_engine.shutdown();
    Ok(())
}
