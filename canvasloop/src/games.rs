// games.rs
pub mod pong;
pub mod rain;
pub mod snake;

use crate::engine::error::{GameLoopError, Result};

fn ensure_positive(field: &'static str, value: f32) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(GameLoopError::InvalidConfig {
            field,
            reason: format!("{value} must be a positive number"),
        })
    }
}
