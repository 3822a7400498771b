use std::{fs, path::Path, time::Duration};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::games::{pong::PongConfig, rain::RainConfig, snake::SnakeConfig};

use super::error::{GameLoopError, Result};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Display refresh rate the frame loop is synchronised to.
    pub fps: u32,
    /// How often the host view is refreshed from the running session.
    pub publish_interval_ms: u64,
    /// Auto-release window for hosts without key release events.
    pub key_hold_ms: Option<u64>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            fps: 60,
            publish_interval_ms: 100,
            key_hold_ms: None,
        }
    }
}

impl SchedulerConfig {
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs(1) / self.fps.max(1)
    }

    pub fn publish_interval(&self) -> Duration {
        Duration::from_millis(self.publish_interval_ms)
    }

    pub fn key_hold(&self) -> Option<Duration> {
        self.key_hold_ms.map(Duration::from_millis)
    }

    pub fn validate(&self) -> Result<()> {
        if self.fps == 0 || self.fps > 240 {
            return Err(GameLoopError::InvalidConfig {
                field: "scheduler.fps",
                reason: format!("{} is not between 1 and 240", self.fps),
            });
        }
        Ok(())
    }
}

/// Everything the arcade can be configured with, as read from a JSON file.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArcadeConfig {
    pub scheduler: SchedulerConfig,
    pub pong: PongConfig,
    pub snake: SnakeConfig,
    pub rain: RainConfig,
}

impl ArcadeConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: ArcadeConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = fs::read_to_string(path.as_ref())?;
        let config = Self::from_json(&json)?;
        info!(path = %path.as_ref().display(), "loaded arcade config");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.scheduler.validate()?;
        self.pong.validate()?;
        self.snake.validate()?;
        self.rain.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_json_gives_defaults() {
        let config = ArcadeConfig::from_json("{}").unwrap();
        assert_eq!(config, ArcadeConfig::default());
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let config =
            ArcadeConfig::from_json(r#"{ "snake": { "step_interval_ms": 200 }, "scheduler": { "fps": 30 } }"#)
                .unwrap();
        assert_eq!(config.snake.step_interval_ms, 200);
        assert_eq!(config.snake.score_increment, SnakeConfig::default().score_increment);
        assert_eq!(config.scheduler.frame_interval(), Duration::from_secs(1) / 30);
        assert_eq!(config.pong, PongConfig::default());
    }

    #[test]
    fn test_invalid_fps_rejected() {
        let result = ArcadeConfig::from_json(r#"{ "scheduler": { "fps": 0 } }"#);
        assert!(matches!(
            result,
            Err(GameLoopError::InvalidConfig {
                field: "scheduler.fps",
                ..
            })
        ));
    }

    #[test]
    fn test_malformed_json() {
        let result = ArcadeConfig::from_json("{ fps: ");
        assert!(matches!(result, Err(GameLoopError::ConfigParseError(_))));
    }

    #[test]
    fn test_missing_file() {
        let result = ArcadeConfig::from_file("/definitely/not/here/arcade.json");
        assert!(matches!(result, Err(GameLoopError::IOError(_))));
    }
}
