use std::collections::VecDeque;
use std::time::{Duration, Instant};

use rand::{seq::SliceRandom, Rng, SeedableRng};
use rand_xorshift::XorShiftRng;
use serde::{Deserialize, Serialize};

use crate::engine::{
    error::{GameLoopError, Result},
    input::InputSnapshot,
    surface::{Rgb, Surface},
    Game, StepOutcome,
};

use super::ensure_positive;

const GLYPHS: &[char] = &[
    'ｱ', 'ｲ', 'ｳ', 'ｴ', 'ｵ', 'ｶ', 'ｷ', 'ｸ', 'ｹ', 'ｺ', 'ｻ', 'ｼ', 'ｽ', 'ｾ', 'ｿ', 'ﾀ', 'ﾁ', 'ﾂ',
    'ﾃ', 'ﾄ', 'ﾅ', 'ﾆ', 'ﾇ', 'ﾈ', 'ﾉ', 'ﾊ', 'ﾋ', 'ﾌ', 'ﾍ', 'ﾎ', 'ﾏ', 'ﾐ', 'ﾑ', 'ﾒ', 'ﾓ', 'ﾔ',
    'ﾕ', 'ﾖ', 'ﾗ', 'ﾘ', 'ﾙ', 'ﾚ', 'ﾛ', 'ﾜ', 'ﾝ', '0', '1', '2', '3', '4', '5', '6', '7', '8',
    '9',
];

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RainConfig {
    pub width: f32,
    pub height: f32,
    pub glyph_size: f32,
    pub step_interval_ms: u64,
    /// Chance per step that a drop below the bottom edge restarts at the top.
    pub reset_chance: f64,
    /// Glyphs kept per column, older ones fade out.
    pub trail: usize,
}

impl Default for RainConfig {
    fn default() -> Self {
        Self {
            width: 300.0,
            height: 300.0,
            glyph_size: 15.0,
            step_interval_ms: 50,
            reset_chance: 0.025,
            trail: 12,
        }
    }
}

impl RainConfig {
    pub fn columns(&self) -> usize {
        (self.width / self.glyph_size) as usize
    }

    pub fn rows(&self) -> u32 {
        (self.height / self.glyph_size) as u32
    }

    pub fn validate(&self) -> Result<()> {
        ensure_positive("rain.width", self.width)?;
        ensure_positive("rain.height", self.height)?;
        ensure_positive("rain.glyph_size", self.glyph_size)?;
        if !(0.0..=1.0).contains(&self.reset_chance) {
            return Err(GameLoopError::InvalidConfig {
                field: "rain.reset_chance",
                reason: format!("{} is not a probability", self.reset_chance),
            });
        }
        if self.step_interval_ms == 0 || self.trail == 0 || self.columns() == 0 {
            return Err(GameLoopError::InvalidConfig {
                field: "rain",
                reason: "interval, trail and column count must be above zero".to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Clone, Debug)]
struct Column {
    drop: u32,
    trail: VecDeque<(u32, char)>,
}

/// Falling glyph columns. Takes no input, keeps no score, never ends.
#[derive(Debug)]
pub struct RainGame {
    config: RainConfig,
    rng: XorShiftRng,
    columns: Vec<Column>,
    interval: Duration,
    last_tick: Instant,
}

impl RainGame {
    /// Current drop row of every column.
    pub fn drops(&self) -> Vec<u32> {
        self.columns.iter().map(|column| column.drop).collect()
    }

    fn fade(age: usize, trail: usize) -> Rgb {
        if age == 0 {
            return Rgb(200, 255, 200);
        }
        let green = 255 - (age * 200 / trail.max(1)).min(200) as u8;
        Rgb(0, green, (green / 4).saturating_add(10))
    }

    fn advance(&mut self) {
        let rows = self.config.rows();
        let trail = self.config.trail;
        let reset_chance = self.config.reset_chance;
        for column in self.columns.iter_mut() {
            let glyph = *GLYPHS.choose(&mut self.rng).unwrap_or(&'0');
            if column.trail.len() >= trail {
                column.trail.pop_front();
            }
            column.trail.push_back((column.drop, glyph));
            if column.drop >= rows && self.rng.gen_bool(reset_chance) {
                column.drop = 0;
            } else {
                column.drop += 1;
            }
        }
    }
}

impl Game for RainGame {
    type Config = RainConfig;
    type Score = ();

    const NAME: &'static str = "rain";

    fn new(config: &RainConfig, seed: u64, now: Instant) -> Self {
        let columns = vec![
            Column {
                drop: 0,
                trail: VecDeque::with_capacity(config.trail),
            };
            config.columns()
        ];
        Self {
            config: config.clone(),
            rng: XorShiftRng::seed_from_u64(seed),
            columns,
            interval: Duration::from_millis(config.step_interval_ms),
            last_tick: now,
        }
    }

    fn canvas_size(config: &RainConfig) -> (f32, f32) {
        (config.width, config.height)
    }

    fn step(&mut self, _input: &InputSnapshot, now: Instant) -> Result<StepOutcome> {
        if now.saturating_duration_since(self.last_tick) < self.interval {
            return Ok(StepOutcome::Idle);
        }
        self.last_tick = now;
        self.advance();
        Ok(StepOutcome::Advanced)
    }

    fn render(&self, surface: &mut dyn Surface) {
        let size = self.config.glyph_size;
        let rows = self.config.rows();
        for (i, column) in self.columns.iter().enumerate() {
            let x = i as f32 * size;
            for (age, (row, glyph)) in column.trail.iter().rev().enumerate() {
                if *row >= rows {
                    continue;
                }
                let color = Self::fade(age, self.config.trail);
                surface.text(x, *row as f32 * size, &glyph.to_string(), color);
            }
        }
    }

    fn score(&self) {}

    fn render_idle(config: &RainConfig, surface: &mut dyn Surface) {
        surface.text(
            config.width / 2.0 - 50.0,
            config.height / 2.0,
            "Press Start",
            Rgb::GREEN,
        );
    }
}
