// engine.rs
pub mod config;
pub mod controller;
pub mod error;
pub mod input;
pub mod scheduler;
pub mod surface;

use std::time::Instant;

use error::Result;
use input::InputSnapshot;
use surface::Surface;

/// What a simulation step reports back to the lifecycle controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepOutcome {
    /// Nothing advanced, the fixed interval has not elapsed yet.
    Idle,
    Advanced,
    /// The session reached a terminal state during this step.
    Ended,
}

/// A single hand-rolled simulation driven by the frame loop.
///
/// Implementors own all of their entity state. A new value is built for every
/// session, so a restart never sees state from the previous one.
pub trait Game {
    type Config: Clone;
    type Score: Copy + Default + std::fmt::Debug + PartialEq;

    const NAME: &'static str;

    fn new(config: &Self::Config, seed: u64, now: Instant) -> Self;

    /// Logical size of the surface the game draws on.
    fn canvas_size(config: &Self::Config) -> (f32, f32);

    /// Advances the simulation. Called once per rendered frame; implementors
    /// that run on a fixed interval gate themselves on `now`.
    fn step(&mut self, input: &InputSnapshot, now: Instant) -> Result<StepOutcome>;

    /// Draws the current state. Must not mutate the simulation.
    fn render(&self, surface: &mut dyn Surface);

    fn score(&self) -> Self::Score;

    /// Draws the idle screen shown before the first session starts.
    fn render_idle(config: &Self::Config, surface: &mut dyn Surface);
}
