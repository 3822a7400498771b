use std::time::Instant;

use rand::{Rng, SeedableRng};
use rand_xorshift::XorShiftRng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::engine::{
    error::{GameLoopError, Result},
    input::{InputSnapshot, Key},
    surface::{Rgb, Surface},
    Game, StepOutcome,
};

use super::ensure_positive;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PongConfig {
    pub width: f32,
    pub height: f32,
    pub paddle_width: f32,
    pub paddle_height: f32,
    pub ball_radius: f32,
    /// Left paddle speed in px per tick.
    pub ai_speed: f32,
    /// The left paddle holds still while the ball is this close to its center.
    pub ai_dead_zone: f32,
    /// Right paddle speed in px per tick.
    pub player_speed: f32,
    pub serve_speed_x: f32,
    /// Serves draw the vertical speed from `-serve_speed_y..=serve_speed_y`.
    pub serve_speed_y: f32,
    /// Ball speed multiplier on every paddle hit.
    pub speed_up: f32,
    /// Vertical speed added per px of distance from the paddle center.
    pub spin: f32,
    pub max_speed_x: f32,
    pub max_speed_y: f32,
}

impl Default for PongConfig {
    fn default() -> Self {
        Self {
            width: 300.0,
            height: 300.0,
            paddle_width: 10.0,
            paddle_height: 60.0,
            ball_radius: 5.0,
            ai_speed: 3.0,
            ai_dead_zone: 10.0,
            player_speed: 5.0,
            serve_speed_x: 2.0,
            serve_speed_y: 1.5,
            speed_up: 1.05,
            spin: 0.05,
            max_speed_x: 8.0,
            max_speed_y: 6.0,
        }
    }
}

impl PongConfig {
    pub fn validate(&self) -> Result<()> {
        ensure_positive("pong.width", self.width)?;
        ensure_positive("pong.height", self.height)?;
        ensure_positive("pong.paddle_width", self.paddle_width)?;
        ensure_positive("pong.paddle_height", self.paddle_height)?;
        ensure_positive("pong.ball_radius", self.ball_radius)?;
        ensure_positive("pong.ai_speed", self.ai_speed)?;
        ensure_positive("pong.player_speed", self.player_speed)?;
        ensure_positive("pong.serve_speed_x", self.serve_speed_x)?;
        ensure_positive("pong.max_speed_x", self.max_speed_x)?;
        ensure_positive("pong.max_speed_y", self.max_speed_y)?;
        if self.paddle_height >= self.height {
            return Err(GameLoopError::InvalidConfig {
                field: "pong.paddle_height",
                reason: "paddle must be shorter than the canvas".to_string(),
            });
        }
        if self.ball_radius * 2.0 >= self.height.min(self.width / 2.0 - self.paddle_width) {
            return Err(GameLoopError::InvalidConfig {
                field: "pong.ball_radius",
                reason: "ball does not fit between the paddles".to_string(),
            });
        }
        if self.speed_up < 1.0 {
            return Err(GameLoopError::InvalidConfig {
                field: "pong.speed_up",
                reason: format!("{} would slow the ball down", self.speed_up),
            });
        }
        if self.serve_speed_x > self.max_speed_x {
            return Err(GameLoopError::InvalidConfig {
                field: "pong.serve_speed_x",
                reason: "serve is faster than the speed cap".to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PongScore {
    /// Computer controlled paddle.
    pub left: u32,
    pub right: u32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ball {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Side {
    Left,
    Right,
}

/// Pong against a simple computer player. Advances on every rendered frame.
#[derive(Debug)]
pub struct PongGame {
    config: PongConfig,
    rng: XorShiftRng,
    ball: Ball,
    left_paddle_y: f32,
    right_paddle_y: f32,
    score: PongScore,
}

impl PongGame {
    pub fn ball(&self) -> Ball {
        self.ball
    }

    pub fn left_paddle_y(&self) -> f32 {
        self.left_paddle_y
    }

    pub fn right_paddle_y(&self) -> f32 {
        self.right_paddle_y
    }

    fn clamp_paddle(&self, y: f32) -> f32 {
        y.clamp(0.0, self.config.height - self.config.paddle_height)
    }

    fn serve(&mut self) {
        let sign = if self.rng.gen_bool(0.5) { 1.0 } else { -1.0 };
        let max_y = self.config.serve_speed_y;
        let vy = if max_y > 0.0 {
            self.rng.gen_range(-max_y..=max_y)
        } else {
            0.0
        };
        self.ball = Ball {
            x: self.config.width / 2.0,
            y: self.config.height / 2.0,
            vx: self.config.serve_speed_x * sign,
            vy,
        };
    }

    fn move_player(&mut self, input: &InputSnapshot) {
        let mut y = self.right_paddle_y;
        if input.is_down(Key::W) {
            y -= self.config.player_speed;
        }
        if input.is_down(Key::S) {
            y += self.config.player_speed;
        }
        self.right_paddle_y = self.clamp_paddle(y);
    }

    fn move_computer(&mut self) {
        if self.ball.x >= self.config.width / 2.0 {
            return;
        }
        let center = self.left_paddle_y + self.config.paddle_height / 2.0;
        let offset = self.ball.y - center;
        if offset.abs() <= self.config.ai_dead_zone {
            return;
        }
        let step = self.config.ai_speed.copysign(offset);
        self.left_paddle_y = self.clamp_paddle(self.left_paddle_y + step);
    }

    fn bounce_off_walls(&mut self) {
        let radius = self.config.ball_radius;
        if self.ball.y - radius < 0.0 {
            self.ball.y = radius;
            self.ball.vy = self.ball.vy.abs();
        } else if self.ball.y + radius > self.config.height {
            self.ball.y = self.config.height - radius;
            self.ball.vy = -self.ball.vy.abs();
        }
    }

    fn hits_paddle(&self, side: Side) -> bool {
        let config = &self.config;
        let (paddle_y, reached) = match side {
            Side::Left => (
                self.left_paddle_y,
                self.ball.vx < 0.0 && self.ball.x - config.ball_radius <= config.paddle_width,
            ),
            Side::Right => (
                self.right_paddle_y,
                self.ball.vx > 0.0
                    && self.ball.x + config.ball_radius >= config.width - config.paddle_width,
            ),
        };
        reached && self.ball.y >= paddle_y && self.ball.y <= paddle_y + config.paddle_height
    }

    fn bounce_off_paddle(&mut self, side: Side) {
        let config = &self.config;
        let paddle_y = match side {
            Side::Left => self.left_paddle_y,
            Side::Right => self.right_paddle_y,
        };
        let offset = self.ball.y - (paddle_y + config.paddle_height / 2.0);
        let vx = (-self.ball.vx * config.speed_up).clamp(-config.max_speed_x, config.max_speed_x);
        let vy = (self.ball.vy * config.speed_up + offset * config.spin)
            .clamp(-config.max_speed_y, config.max_speed_y);
        let x = match side {
            Side::Left => config.paddle_width + config.ball_radius,
            Side::Right => config.width - config.paddle_width - config.ball_radius,
        };
        self.ball = Ball {
            x,
            y: self.ball.y,
            vx,
            vy,
        };
    }

    fn draw_net(width: f32, height: f32, surface: &mut dyn Surface) {
        let x = width / 2.0;
        let mut y = 0.0;
        while y < height {
            surface.line((x, y), (x, (y + 10.0).min(height)), Rgb::GRAY);
            y += 20.0;
        }
    }
}

impl Game for PongGame {
    type Config = PongConfig;
    type Score = PongScore;

    const NAME: &'static str = "pong";

    fn new(config: &PongConfig, seed: u64, _now: Instant) -> Self {
        let paddle_y = (config.height - config.paddle_height) / 2.0;
        let mut game = Self {
            config: config.clone(),
            rng: XorShiftRng::seed_from_u64(seed),
            ball: Ball {
                x: config.width / 2.0,
                y: config.height / 2.0,
                vx: 0.0,
                vy: 0.0,
            },
            left_paddle_y: paddle_y,
            right_paddle_y: paddle_y,
            score: PongScore::default(),
        };
        game.serve();
        game
    }

    fn canvas_size(config: &PongConfig) -> (f32, f32) {
        (config.width, config.height)
    }

    fn step(&mut self, input: &InputSnapshot, _now: Instant) -> Result<StepOutcome> {
        self.move_player(input);
        self.move_computer();

        self.ball.x += self.ball.vx;
        self.ball.y += self.ball.vy;
        self.bounce_off_walls();

        if self.hits_paddle(Side::Left) {
            self.bounce_off_paddle(Side::Left);
        } else if self.hits_paddle(Side::Right) {
            self.bounce_off_paddle(Side::Right);
        }

        let radius = self.config.ball_radius;
        if self.ball.x < radius {
            self.score.right += 1;
            debug!(score = ?self.score, "right side scored");
            self.serve();
        } else if self.ball.x > self.config.width - radius {
            self.score.left += 1;
            debug!(score = ?self.score, "left side scored");
            self.serve();
        }
        Ok(StepOutcome::Advanced)
    }

    fn render(&self, surface: &mut dyn Surface) {
        let config = &self.config;
        Self::draw_net(config.width, config.height, surface);
        surface.fill_rect(
            0.0,
            self.left_paddle_y,
            config.paddle_width,
            config.paddle_height,
            Rgb::WHITE,
        );
        surface.fill_rect(
            config.width - config.paddle_width,
            self.right_paddle_y,
            config.paddle_width,
            config.paddle_height,
            Rgb::WHITE,
        );
        surface.fill_circle(self.ball.x, self.ball.y, config.ball_radius, Rgb::WHITE);
        surface.text(
            config.width / 4.0,
            20.0,
            &format!("CPU {}", self.score.left),
            Rgb::WHITE,
        );
        surface.text(
            config.width * 3.0 / 4.0,
            20.0,
            &format!("You {}", self.score.right),
            Rgb::WHITE,
        );
        surface.text(
            config.width / 2.0 + 10.0,
            config.height - 15.0,
            "W/S to move",
            Rgb::GRAY,
        );
    }

    fn score(&self) -> PongScore {
        self.score
    }

    fn render_idle(config: &PongConfig, surface: &mut dyn Surface) {
        Self::draw_net(config.width, config.height, surface);
        surface.text(
            config.width / 2.0 - 50.0,
            config.height / 2.0,
            "Press Start to play",
            Rgb::WHITE,
        );
    }
}
