use serde_json::Error as SerdeError;
use std::io::Error as IOError;

#[derive(thiserror::Error, Debug)]
pub enum GameLoopError {
    #[error("The render surface is not available.")]
    SurfaceUnavailable,
    #[error("Render surface of {width}x{height} is too small, at least {min_width}x{min_height} is needed.")]
    SurfaceTooSmall {
        width: u32,
        height: u32,
        min_width: u32,
        min_height: u32,
    },
    #[error("Tick {tick} of `{game}` panicked with message: {message}")]
    TickPanicked {
        game: &'static str,
        tick: u64,
        message: String,
    },
    #[error("Cell ({x}, {y}) is outside of the {width}x{height} grid.")]
    CellOutOfBounds {
        x: i32,
        y: i32,
        width: i32,
        height: i32,
    },
    #[error("Cell ({x}, {y}) is occupied by the snake.")]
    CellOccupied { x: i32, y: i32 },
    #[error("Invalid config value for `{field}`: {reason}")]
    InvalidConfig { field: &'static str, reason: String },
    #[error("Couldn't parse the config.")]
    ConfigParseError(#[from] SerdeError),
    #[error("IO error")]
    IOError(#[from] IOError),
}

pub type Result<T> = std::result::Result<T, GameLoopError>;
