mod arcade;

use std::{fs::File, io, panic, path::PathBuf, sync::Mutex};

use canvasloop::engine::{config::ArcadeConfig, error::GameLoopError};
use clap::{command, Parser, Subcommand, ValueEnum};
use tracing::{error, Level};
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(about)]
pub struct ArcadeArgs {
    #[command(subcommand)]
    mode: ArcadeMode,
    /// JSON config file, missing sections fall back to defaults
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Seed for reproducible sessions
    #[arg(long, global = true)]
    seed: Option<u64>,
    /// Display refresh rate the frame loop runs at
    #[arg(long, global = true)]
    fps: Option<u32>,
    /// Write logs to this file, nothing is logged otherwise
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
    #[arg(value_enum, long, global = true, default_value_t = LogLevel::Info)]
    log_level: LogLevel,
}

#[derive(Subcommand, Clone, Debug)]
pub enum ArcadeMode {
    Pong,
    Snake {
        #[arg(value_enum, long)]
        speed: Option<Speed>,
    },
    Rain,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum Speed {
    Slow,
    Normal,
    Fast,
}

impl Speed {
    fn step_interval_ms(self) -> u64 {
        match self {
            Speed::Slow => 600,
            Speed::Normal => 400,
            Speed::Fast => 200,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for Level {
    fn from(value: LogLevel) -> Self {
        match value {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }
}

impl ArcadeArgs {
    /// Config file (or defaults) with the command line overrides applied.
    fn arcade_config(&self) -> Result<ArcadeConfig, GameLoopError> {
        let mut config = match &self.config {
            Some(path) => ArcadeConfig::from_file(path)?,
            None => ArcadeConfig::default(),
        };
        if let Some(fps) = self.fps {
            config.scheduler.fps = fps;
        }
        if let ArcadeMode::Snake { speed: Some(speed) } = self.mode {
            config.snake.step_interval_ms = speed.step_interval_ms();
        }
        config.validate()?;
        Ok(config)
    }
}

fn init_logging(log_file: Option<&PathBuf>, level: LogLevel) -> io::Result<()> {
    // stdout belongs to the terminal UI
    let Some(path) = log_file else {
        return Ok(());
    };
    let file = File::create(path)?;
    tracing_subscriber::fmt()
        .with_max_level(Level::from(level))
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .compact()
        .finish()
        .init();
    Ok(())
}

/// Routes panic reports to the log, the default hook would print them over
/// the alternate screen. Tick panics are caught by the controller, so this is
/// the only place their message ends up.
fn install_panic_hook() {
    panic::set_hook(Box::new(|info| {
        error!(target: "panic", "{info}");
    }));
}

fn main() -> io::Result<()> {
    let args = ArcadeArgs::parse();
    init_logging(args.log_file.as_ref(), args.log_level)?;
    install_panic_hook();
    let config = args
        .arcade_config()
        .map_err(|err| io::Error::new(io::ErrorKind::InvalidInput, err))?;
    arcade::game_loop(args.mode, config, args.seed)
}
