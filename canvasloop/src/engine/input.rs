use std::collections::{HashMap, HashSet, VecDeque};
use std::time::{Duration, Instant};

use tracing::debug;

/// Most presses kept between two snapshots, older ones are dropped.
const MAX_QUEUED_PRESSES: usize = 8;

/// Case-insensitive key identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Key(char);

impl Key {
    pub const W: Key = Key('w');
    pub const A: Key = Key('a');
    pub const S: Key = Key('s');
    pub const D: Key = Key('d');

    pub fn from_char(c: char) -> Key {
        Key(c.to_lowercase().next().unwrap_or(c))
    }

    pub fn as_char(&self) -> char {
        self.0
    }
}

impl From<char> for Key {
    fn from(value: char) -> Self {
        Key::from_char(value)
    }
}

#[derive(Clone, Copy, Debug)]
struct KeyState {
    down: bool,
    last_seen: Instant,
}

/// Key state recorded between frames.
///
/// The latch only stores what the host reported. The simulation reads it
/// through [`InputLatch::snapshot`] at the start of a step, so nothing in here
/// ever touches game state.
#[derive(Debug, Default)]
pub struct InputLatch {
    keys: HashMap<Key, KeyState>,
    presses: VecDeque<Key>,
    subscribed: bool,
}

impl InputLatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts accepting key events. Returns false if already subscribed.
    pub fn subscribe(&mut self) -> bool {
        if self.subscribed {
            return false;
        }
        self.subscribed = true;
        debug!("input latch subscribed");
        true
    }

    /// Stops accepting key events and forgets every recorded key. Only the
    /// first call after a subscribe does anything.
    pub fn unsubscribe(&mut self) -> bool {
        if !self.subscribed {
            return false;
        }
        self.subscribed = false;
        self.keys.clear();
        self.presses.clear();
        debug!("input latch unsubscribed");
        true
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscribed
    }

    pub fn key_down(&mut self, key: Key, now: Instant) {
        if !self.subscribed {
            return;
        }
        self.keys.insert(
            key,
            KeyState {
                down: true,
                last_seen: now,
            },
        );
        if self.presses.len() >= MAX_QUEUED_PRESSES {
            self.presses.pop_front();
        }
        self.presses.push_back(key);
    }

    pub fn key_up(&mut self, key: Key) {
        if !self.subscribed {
            return;
        }
        if let Some(state) = self.keys.get_mut(&key) {
            state.down = false;
        }
    }

    /// Releases keys not re-pressed within `hold`. For hosts that never
    /// report key releases.
    pub fn release_stale(&mut self, now: Instant, hold: Duration) {
        for state in self.keys.values_mut() {
            if state.down && now.saturating_duration_since(state.last_seen) > hold {
                state.down = false;
            }
        }
    }

    pub fn is_down(&self, key: Key) -> bool {
        self.keys.get(&key).is_some_and(|state| state.down)
    }

    /// Captures the held keys and drains the queued presses.
    pub fn snapshot(&mut self) -> InputSnapshot {
        let held = self
            .keys
            .iter()
            .filter(|(_, state)| state.down)
            .map(|(key, _)| *key)
            .collect();
        InputSnapshot {
            held,
            presses: self.presses.drain(..).collect(),
        }
    }
}

/// Immutable view of the input for one simulation step.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct InputSnapshot {
    held: HashSet<Key>,
    presses: Vec<Key>,
}

impl InputSnapshot {
    pub fn new(held: &[Key], presses: &[Key]) -> Self {
        Self {
            held: held.iter().copied().collect(),
            presses: presses.to_vec(),
        }
    }

    pub fn is_down(&self, key: Key) -> bool {
        self.held.contains(&key)
    }

    /// Key presses in the order they arrived.
    pub fn presses(&self) -> &[Key] {
        &self.presses
    }
}
