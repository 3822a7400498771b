// scheduler.rs

use std::time::{Duration, Instant};

use tracing::debug;

/// Live state of a frame loop, handed by `&mut` to every frame callback.
///
/// Stopping bumps the generation, so a request scheduled before the stop can
/// never run against a later start.
#[derive(Debug, Default)]
pub struct LoopHandle {
    running: bool,
    generation: u64,
    frames: u64,
}

impl LoopHandle {
    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Frames executed since the last start.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn stop(&mut self) {
        if self.running {
            self.running = false;
            self.generation += 1;
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct FrameRequest {
    deadline: Instant,
    generation: u64,
}

/// Refresh-synchronised driver of a single repeating frame callback.
///
/// There is at most one outstanding request at any time. The host calls
/// [`FrameScheduler::run_due`] whenever it wakes up and the scheduler decides
/// whether a frame is due.
#[derive(Debug)]
pub struct FrameScheduler {
    interval: Duration,
    handle: LoopHandle,
    pending: Option<FrameRequest>,
}

impl FrameScheduler {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            handle: LoopHandle::default(),
            pending: None,
        }
    }

    pub fn from_fps(fps: u32) -> Self {
        Self::new(Duration::from_secs(1) / fps.max(1))
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_running()
    }

    pub fn handle(&self) -> &LoopHandle {
        &self.handle
    }

    /// Starts the loop with the first frame due at `now`. Returns false and
    /// schedules nothing if the loop is already running.
    pub fn start(&mut self, now: Instant) -> bool {
        if self.handle.running {
            return false;
        }
        self.handle.running = true;
        self.handle.frames = 0;
        self.pending = Some(FrameRequest {
            deadline: now,
            generation: self.handle.generation,
        });
        debug!(generation = self.handle.generation, "frame loop started");
        true
    }

    /// Cancels the pending request. No frame runs after this returns.
    pub fn stop(&mut self) {
        if self.handle.running {
            debug!(generation = self.handle.generation, "frame loop stopped");
        }
        self.handle.stop();
        self.pending = None;
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.map(|request| request.deadline)
    }

    /// Runs the frame callback if a request is due at `now`.
    ///
    /// The request is consumed before the callback runs and the next one is
    /// only scheduled if the loop is still live afterwards. Returns whether
    /// the callback ran.
    pub fn run_due<F>(&mut self, now: Instant, frame: F) -> bool
    where
        F: FnOnce(&mut LoopHandle, Instant),
    {
        let Some(request) = self.pending else {
            return false;
        };
        if now < request.deadline {
            return false;
        }
        self.pending = None;
        if !self.handle.running || request.generation != self.handle.generation {
            return false;
        }

        self.handle.frames += 1;
        frame(&mut self.handle, now);

        if self.handle.running && request.generation == self.handle.generation {
            let mut deadline = request.deadline + self.interval;
            // fell behind, drop the missed frames instead of bursting
            if deadline <= now {
                deadline = now + self.interval;
            }
            self.pending = Some(FrameRequest {
                deadline,
                generation: request.generation,
            });
        }
        true
    }
}
