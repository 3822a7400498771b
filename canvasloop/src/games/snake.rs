use std::collections::VecDeque;
use std::time::{Duration, Instant};

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

const SAMPLE_ATTEMPTS: usize = 64;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnakeConfig {
    pub width: f32,
    pub height: f32,
    pub cell_size: f32,
    /// The snake moves one cell per interval, independent of the frame rate.
    pub step_interval_ms: u64,
    pub score_increment: u32,
    /// Head cell at the start, the body trails to the left of it.
    pub start: (i32, i32),
    pub start_length: usize,
}

impl Default for SnakeConfig {
    fn default() -> Self {
        Self {
            width: 300.0,
            height: 300.0,
            cell_size: 15.0,
            step_interval_ms: 400,
            score_increment: 10,
            start: (10, 10),
            start_length: 3,
        }
    }
}

impl SnakeConfig {
    /// Grid size in cells.
    pub fn grid(&self) -> (i32, i32) {
        (
            (self.width / self.cell_size) as i32,
            (self.height / self.cell_size) as i32,
        )
    }

    pub fn validate(&self) -> Result<()> {
        ensure_positive("snake.width", self.width)?;
        ensure_positive("snake.height", self.height)?;
        ensure_positive("snake.cell_size", self.cell_size)?;
        if self.step_interval_ms == 0 {
            return Err(GameLoopError::InvalidConfig {
                field: "snake.step_interval_ms",
                reason: "interval must be above zero".to_string(),
            });
        }
        let (width, height) = self.grid();
        if width < 2 || height < 2 {
            return Err(GameLoopError::InvalidConfig {
                field: "snake.cell_size",
                reason: format!("grid of {width}x{height} cells is too small"),
            });
        }
        let (x, y) = self.start;
        let tail_x = x - self.start_length as i32 + 1;
        if self.start_length == 0
            || x >= width
            || tail_x < 0
            || y < 0
            || y >= height
            || self.start_length as i64 >= (width as i64) * (height as i64)
        {
            return Err(GameLoopError::InvalidConfig {
                field: "snake.start",
                reason: format!(
                    "a snake of {} cells with its head at ({x}, {y}) does not fit the grid",
                    self.start_length
                ),
            });
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Cell {
    pub x: i32,
    pub y: i32,
}

impl Cell {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    fn moved(self, heading: Heading) -> Cell {
        let (dx, dy) = heading.delta();
        Cell::new(self.x + dx, self.y + dy)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Heading {
    Up,
    Down,
    Left,
    Right,
}

impl Heading {
    pub fn delta(self) -> (i32, i32) {
        match self {
            Heading::Up => (0, -1),
            Heading::Down => (0, 1),
            Heading::Left => (-1, 0),
            Heading::Right => (1, 0),
        }
    }

    pub fn opposite(self) -> Heading {
        match self {
            Heading::Up => Heading::Down,
            Heading::Down => Heading::Up,
            Heading::Left => Heading::Right,
            Heading::Right => Heading::Left,
        }
    }

    pub fn from_key(key: Key) -> Option<Heading> {
        match key {
            Key::W => Some(Heading::Up),
            Key::A => Some(Heading::Left),
            Key::S => Some(Heading::Down),
            Key::D => Some(Heading::Right),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SnakeOutcome {
    Playing,
    /// Hit a wall or itself.
    Crashed,
    /// No free cell left for the food.
    BoardFull,
}

/// Grid snake that moves once per step interval.
#[derive(Debug)]
pub struct SnakeGame {
    config: SnakeConfig,
    grid: (i32, i32),
    rng: XorShiftRng,
    segments: VecDeque<Cell>,
    food: Cell,
    heading: Heading,
    pending_heading: Heading,
    score: u32,
    interval: Duration,
    last_tick: Instant,
    outcome: SnakeOutcome,
}

impl SnakeGame {
    /// Snake cells, head first.
    pub fn segments(&self) -> impl ExactSizeIterator<Item = &Cell> {
        self.segments.iter()
    }

    pub fn head(&self) -> Option<Cell> {
        self.segments.front().copied()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn food(&self) -> Cell {
        self.food
    }

    pub fn heading(&self) -> Heading {
        self.heading
    }

    pub fn pending_heading(&self) -> Heading {
        self.pending_heading
    }

    pub fn outcome(&self) -> SnakeOutcome {
        self.outcome
    }

    /// Queues a turn for the next step. Turning back onto the body is
    /// ignored.
    pub fn steer(&mut self, heading: Heading) {
        if heading == self.heading.opposite() {
            debug!(?heading, current = ?self.heading, "reverse turn ignored");
            return;
        }
        self.pending_heading = heading;
    }

    /// Moves the food to `cell`, which must be a free cell inside the grid.
    pub fn place_food(&mut self, cell: Cell) -> Result<()> {
        if !self.in_bounds(cell) {
            return Err(GameLoopError::CellOutOfBounds {
                x: cell.x,
                y: cell.y,
                width: self.grid.0,
                height: self.grid.1,
            });
        }
        if self.segments.contains(&cell) {
            return Err(GameLoopError::CellOccupied {
                x: cell.x,
                y: cell.y,
            });
        }
        self.food = cell;
        Ok(())
    }

    fn in_bounds(&self, cell: Cell) -> bool {
        cell.x >= 0 && cell.y >= 0 && cell.x < self.grid.0 && cell.y < self.grid.1
    }

    fn cell_count(&self) -> usize {
        (self.grid.0 as usize) * (self.grid.1 as usize)
    }

    /// Picks a random cell not covered by the snake. Rejection sampling is
    /// used while at least half the board is free, otherwise (or when
    /// sampling keeps missing) the free cells are listed and one is drawn.
    fn free_cell(&mut self) -> Option<Cell> {
        let cells = self.cell_count();
        if self.segments.len() >= cells {
            return None;
        }
        if (cells - self.segments.len()) * 2 >= cells {
            for _ in 0..SAMPLE_ATTEMPTS {
                let cell = Cell::new(
                    self.rng.gen_range(0..self.grid.0),
                    self.rng.gen_range(0..self.grid.1),
                );
                if !self.segments.contains(&cell) {
                    return Some(cell);
                }
            }
        }
        let free: Vec<Cell> = (0..self.grid.1)
            .flat_map(|y| (0..self.grid.0).map(move |x| Cell::new(x, y)))
            .filter(|cell| !self.segments.contains(cell))
            .collect();
        if free.is_empty() {
            None
        } else {
            Some(free[self.rng.gen_range(0..free.len())])
        }
    }

    /// One movement step of the snake.
    fn advance(&mut self) -> StepOutcome {
        self.heading = self.pending_heading;
        let Some(head) = self.head() else {
            self.outcome = SnakeOutcome::Crashed;
            return StepOutcome::Ended;
        };
        let next = head.moved(self.heading);
        // the tail has not moved yet, so running into it is a crash
        if !self.in_bounds(next) || self.segments.contains(&next) {
            debug!(?next, "snake crashed");
            self.outcome = SnakeOutcome::Crashed;
            return StepOutcome::Ended;
        }

        self.segments.push_front(next);
        if next != self.food {
            self.segments.pop_back();
            return StepOutcome::Advanced;
        }

        self.score += self.config.score_increment;
        match self.free_cell() {
            Some(cell) => {
                self.food = cell;
                StepOutcome::Advanced
            }
            None => {
                self.outcome = SnakeOutcome::BoardFull;
                StepOutcome::Ended
            }
        }
    }

    fn draw_grid(config: &SnakeConfig, surface: &mut dyn Surface) {
        let (columns, rows) = config.grid();
        let size = config.cell_size;
        for column in 0..=columns {
            let x = column as f32 * size;
            surface.line((x, 0.0), (x, rows as f32 * size), Rgb::GRAY);
        }
        for row in 0..=rows {
            let y = row as f32 * size;
            surface.line((0.0, y), (columns as f32 * size, y), Rgb::GRAY);
        }
    }
}

impl Game for SnakeGame {
    type Config = SnakeConfig;
    type Score = u32;

    const NAME: &'static str = "snake";

    fn new(config: &SnakeConfig, seed: u64, now: Instant) -> Self {
        let (x, y) = config.start;
        let segments = (0..config.start_length as i32)
            .map(|i| Cell::new(x - i, y))
            .collect();
        let mut game = Self {
            config: config.clone(),
            grid: config.grid(),
            rng: XorShiftRng::seed_from_u64(seed),
            segments,
            food: Cell::new(0, 0),
            heading: Heading::Right,
            pending_heading: Heading::Right,
            score: 0,
            interval: Duration::from_millis(config.step_interval_ms),
            last_tick: now,
            outcome: SnakeOutcome::Playing,
        };
        match game.free_cell() {
            Some(cell) => game.food = cell,
            None => game.outcome = SnakeOutcome::BoardFull,
        }
        game
    }

    fn canvas_size(config: &SnakeConfig) -> (f32, f32) {
        (config.width, config.height)
    }

    fn step(&mut self, input: &InputSnapshot, now: Instant) -> Result<StepOutcome> {
        if self.outcome != SnakeOutcome::Playing {
            return Ok(StepOutcome::Ended);
        }
        for heading in input.presses().iter().filter_map(|key| Heading::from_key(*key)) {
            self.steer(heading);
        }
        if now.saturating_duration_since(self.last_tick) < self.interval {
            return Ok(StepOutcome::Idle);
        }
        self.last_tick = now;
        Ok(self.advance())
    }

    fn render(&self, surface: &mut dyn Surface) {
        let size = self.config.cell_size;
        Self::draw_grid(&self.config, surface);
        surface.fill_circle(
            (self.food.x as f32 + 0.5) * size,
            (self.food.y as f32 + 0.5) * size,
            size / 2.0,
            Rgb::RED,
        );
        for (i, cell) in self.segments.iter().enumerate() {
            let color = if i == 0 { Rgb::GREEN } else { Rgb::DARK_GREEN };
            surface.fill_rect(cell.x as f32 * size, cell.y as f32 * size, size, size, color);
        }
        surface.text(5.0, 5.0, &format!("Score: {}", self.score), Rgb::WHITE);
        let (message, color) = match self.outcome {
            SnakeOutcome::Playing => ("WASD to steer", Rgb::GRAY),
            SnakeOutcome::Crashed => ("Game over", Rgb::RED),
            SnakeOutcome::BoardFull => ("Board cleared!", Rgb::GREEN),
        };
        surface.text(5.0, self.config.height - 20.0, message, color);
    }

    fn score(&self) -> u32 {
        self.score
    }

    fn render_idle(config: &SnakeConfig, surface: &mut dyn Surface) {
        Self::draw_grid(config, surface);
        surface.text(
            config.width / 2.0 - 50.0,
            config.height / 2.0,
            "Press Start to play",
            Rgb::WHITE,
        );
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::engine::surface::DrawList;

    const TICK: Duration = Duration::from_millis(400);

    fn new_game(seed: u64) -> (SnakeGame, Instant) {
        let now = Instant::now();
        (SnakeGame::new(&SnakeConfig::default(), seed, now), now)
    }

    fn no_input() -> InputSnapshot {
        InputSnapshot::default()
    }

    fn assert_no_duplicates(game: &SnakeGame) {
        let unique: HashSet<_> = game.segments().collect();
        assert_eq!(unique.len(), game.len());
    }

    #[test]
    fn test_starting_layout() {
        let (game, _) = new_game(1);
        let cells: Vec<_> = game.segments().copied().collect();
        assert_eq!(
            cells,
            vec![Cell::new(10, 10), Cell::new(9, 10), Cell::new(8, 10)]
        );
        assert_eq!(game.heading(), Heading::Right);
        assert!(!cells.contains(&game.food()));
        assert_eq!(game.score(), 0);
    }

    #[test]
    fn test_five_ticks_to_the_right() {
        let (mut game, start) = new_game(2);
        game.place_food(Cell::new(0, 0)).unwrap();
        assert_eq!(game.step(&no_input(), start).unwrap(), StepOutcome::Idle);
        for i in 1..=5 {
            let outcome = game.step(&no_input(), start + TICK * i).unwrap();
            assert_eq!(outcome, StepOutcome::Advanced);
            assert_eq!(game.head(), Some(Cell::new(10 + i as i32, 10)));
            assert_eq!(game.len(), 3);
        }
        assert_eq!(game.head(), Some(Cell::new(15, 10)));
    }

    #[test]
    fn test_no_step_before_interval() {
        let (mut game, start) = new_game(3);
        game.place_food(Cell::new(0, 0)).unwrap();
        let early = start + TICK - Duration::from_millis(1);
        assert_eq!(game.step(&no_input(), early).unwrap(), StepOutcome::Idle);
        assert_eq!(game.head(), Some(Cell::new(10, 10)));
    }

    #[test]
    fn test_reverse_input_ignored() {
        let (mut game, start) = new_game(4);
        game.place_food(Cell::new(0, 0)).unwrap();
        let input = InputSnapshot::new(&[], &[Key::A]);
        game.step(&input, start + TICK).unwrap();
        assert_eq!(game.heading(), Heading::Right);
        assert_eq!(game.head(), Some(Cell::new(11, 10)));
    }

    #[test]
    fn test_turn_applies_on_next_tick() {
        let (mut game, start) = new_game(5);
        game.place_food(Cell::new(0, 0)).unwrap();
        let input = InputSnapshot::new(&[], &[Key::from_char('W')]);
        assert_eq!(game.step(&input, start).unwrap(), StepOutcome::Idle);
        assert_eq!(game.heading(), Heading::Right);
        assert_eq!(game.pending_heading(), Heading::Up);
        game.step(&no_input(), start + TICK).unwrap();
        assert_eq!(game.heading(), Heading::Up);
        assert_eq!(game.head(), Some(Cell::new(10, 9)));
        assert_no_duplicates(&game);
    }

    #[test]
    fn test_eating_grows_and_scores() {
        let (mut game, start) = new_game(6);
        game.place_food(Cell::new(11, 10)).unwrap();
        game.step(&no_input(), start + TICK).unwrap();
        assert_eq!(game.len(), 4);
        assert_eq!(game.score(), 10);
        assert_eq!(game.head(), Some(Cell::new(11, 10)));
        assert!(!game.segments().any(|cell| *cell == game.food()));
    }

    #[test]
    fn test_wall_ends_game() {
        let (mut game, start) = new_game(7);
        game.place_food(Cell::new(0, 0)).unwrap();
        let mut now = start;
        let mut outcome = StepOutcome::Idle;
        for _ in 0..20 {
            now += TICK;
            outcome = game.step(&no_input(), now).unwrap();
            if outcome == StepOutcome::Ended {
                break;
            }
        }
        assert_eq!(outcome, StepOutcome::Ended);
        assert_eq!(game.outcome(), SnakeOutcome::Crashed);
        assert_eq!(game.head(), Some(Cell::new(19, 10)));
    }

    #[test]
    fn test_running_into_tail_ends_game() {
        let (mut game, start) = new_game(8);
        game.segments = VecDeque::from(vec![
            Cell::new(5, 5),
            Cell::new(5, 6),
            Cell::new(6, 6),
            Cell::new(6, 5),
        ]);
        game.heading = Heading::Up;
        game.pending_heading = Heading::Up;
        game.place_food(Cell::new(0, 0)).unwrap();
        game.steer(Heading::Right);
        let outcome = game.step(&no_input(), start + TICK).unwrap();
        assert_eq!(outcome, StepOutcome::Ended);
        assert_eq!(game.outcome(), SnakeOutcome::Crashed);
    }

    #[test]
    fn test_place_food_rejects_snake_cells() {
        let (mut game, _) = new_game(9);
        assert!(matches!(
            game.place_food(Cell::new(9, 10)),
            Err(GameLoopError::CellOccupied { x: 9, y: 10 })
        ));
        assert!(matches!(
            game.place_food(Cell::new(20, 0)),
            Err(GameLoopError::CellOutOfBounds { .. })
        ));
    }

    fn key_for(heading: Heading) -> Key {
        match heading {
            Heading::Up => Key::W,
            Heading::Down => Key::S,
            Heading::Left => Key::A,
            Heading::Right => Key::D,
        }
    }

    /// Heading that chases the food without reversing, preferring cells that
    /// are not fatal. Every few ticks a random safe heading is taken instead.
    fn chase(game: &SnakeGame, rng: &mut XorShiftRng) -> Heading {
        let head = game.head().unwrap();
        let food = game.food();
        let distance = |cell: Cell| (cell.x - food.x).abs() + (cell.y - food.y).abs();
        let mut options: Vec<Heading> = [Heading::Up, Heading::Down, Heading::Left, Heading::Right]
            .into_iter()
            .filter(|heading| *heading != game.heading().opposite())
            .collect();
        options.sort_by_key(|heading| distance(head.moved(*heading)));
        let safe: Vec<Heading> = options
            .iter()
            .copied()
            .filter(|heading| {
                let next = head.moved(*heading);
                game.in_bounds(next) && !game.segments.contains(&next)
            })
            .collect();
        match safe.len() {
            0 => options[0],
            len if rng.gen_ratio(1, 5) => safe[rng.gen_range(0..len)],
            _ => safe[0],
        }
    }

    #[test]
    fn test_random_walk_invariants() {
        let (mut game, start) = new_game(10);
        let mut rng = XorShiftRng::seed_from_u64(10);
        let mut now = start;
        let mut meals = 0;
        for _ in 0..500 {
            now += TICK;
            let before = game.len();
            let score = game.score();
            let food = game.food();
            let input = InputSnapshot::new(&[], &[key_for(chase(&game, &mut rng))]);
            let outcome = game.step(&input, now).unwrap();
            if outcome == StepOutcome::Ended {
                break;
            }
            assert_no_duplicates(&game);
            assert!(!game.segments().any(|cell| *cell == game.food()));
            if game.score() > score {
                meals += 1;
                assert_eq!(game.head(), Some(food));
                assert_eq!(game.len(), before + 1);
                assert_eq!(game.score(), score + 10);
                assert_ne!(game.food(), food);
            } else {
                assert_eq!(game.len(), before);
                assert_eq!(game.food(), food);
            }
        }
        assert!(meals > 0);
        assert!(game.score() > 0);
        assert_eq!(game.len(), 3 + meals);
    }

    #[test]
    fn test_food_on_nearly_full_board_takes_last_free_cell() {
        let (mut game, _) = new_game(14);
        let free = Cell::new(7, 13);
        // serpentine over the whole 20x20 grid, skipping one cell
        game.segments = (0..20)
            .flat_map(|y| {
                let row: Vec<i32> = if y % 2 == 0 {
                    (0..20).collect()
                } else {
                    (0..20).rev().collect()
                };
                row.into_iter().map(move |x| Cell::new(x, y))
            })
            .filter(|cell| *cell != free)
            .collect();
        assert_eq!(game.len(), 399);
        assert_eq!(game.free_cell(), Some(free));
        game.segments.push_back(free);
        assert_eq!(game.free_cell(), None);
    }

    #[test]
    fn test_board_full_ends_game() {
        let config = SnakeConfig {
            width: 30.0,
            height: 30.0,
            start: (1, 0),
            start_length: 2,
            ..Default::default()
        };
        let start = Instant::now();
        let mut game = SnakeGame::new(&config, 11, start);
        // 2x2 grid, snake on the top row
        game.steer(Heading::Down);
        game.place_food(Cell::new(1, 1)).unwrap();
        assert_eq!(
            game.step(&no_input(), start + TICK).unwrap(),
            StepOutcome::Advanced
        );
        assert_eq!(game.food(), Cell::new(0, 1));
        game.steer(Heading::Left);
        assert_eq!(
            game.step(&no_input(), start + TICK * 2).unwrap(),
            StepOutcome::Ended
        );
        assert_eq!(game.outcome(), SnakeOutcome::BoardFull);
        assert_eq!(game.score(), 20);
    }

    #[test]
    fn test_render_after_game_over() {
        let (mut game, start) = new_game(12);
        game.outcome = SnakeOutcome::Crashed;
        assert_eq!(game.step(&no_input(), start + TICK).unwrap(), StepOutcome::Ended);
        let mut list = DrawList::default();
        game.render(&mut list);
        let texts: Vec<_> = list.texts().collect();
        assert_eq!(texts, vec!["Score: 0", "Game over"]);
    }

    #[test]
    fn test_render_with_no_segments() {
        let (mut game, _) = new_game(13);
        game.segments.clear();
        let mut list = DrawList::default();
        game.render(&mut list);
        assert!(list.texts().any(|text| text == "Score: 0"));
    }

    #[test]
    fn test_config_validation() {
        assert!(SnakeConfig::default().validate().is_ok());
        let config = SnakeConfig {
            start: (1, 10),
            ..Default::default()
        };
        assert!(config.validate().is_err());
        let config = SnakeConfig {
            step_interval_ms: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
