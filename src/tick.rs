//! Once-per-second tick counter shared between the timer interrupt and the
//! sequencing code.
//!
//! The counter has exactly one writer (the tick callback, `ElapsedSeconds::tick`)
//! and one reader that also clears it (`Stopwatch`). Nothing else is touched
//! from interrupt context.

use portable_atomic::{AtomicU32, Ordering};

/// Seconds elapsed since the last restart.
pub struct ElapsedSeconds {
    seconds: AtomicU32,
}

impl ElapsedSeconds {
    pub const fn new() -> Self {
        Self {
            seconds: AtomicU32::new(0),
        }
    }

    /// Tick callback. Called from the timer interrupt; must stay trivial.
    #[inline]
    pub fn tick(&self) {
        self.seconds.fetch_add(1, Ordering::AcqRel);
    }

    #[inline]
    pub fn read(&self) -> u32 {
        self.seconds.load(Ordering::Acquire)
    }

    /// Start timing a new phase.
    #[inline]
    pub fn restart(&self) {
        self.seconds.store(0, Ordering::Release);
    }
}

impl Default for ElapsedSeconds {
    fn default() -> Self {
        Self::new()
    }
}

/// A periodic one-second event source.
///
/// Once started, the source calls `counter.tick()` once per period until
/// stopped. A missed period is not detected or retried, so everything timed
/// off the counter is accurate to about one second.
pub trait TickSource {
    fn start(&mut self, counter: &'static ElapsedSeconds);

    fn stop(&mut self);

    /// Called on every iteration of a busy-wait on the counter.
    fn idle(&mut self) {
        core::hint::spin_loop();
    }
}

/// Busy-wait timing on top of a running tick source.
pub struct Stopwatch<T> {
    counter: &'static ElapsedSeconds,
    source: T,
}

impl<T: TickSource> Stopwatch<T> {
    /// Start `source` ticking into `counter`.
    pub fn start(counter: &'static ElapsedSeconds, mut source: T) -> Self {
        counter.restart();
        source.start(counter);
        Self { counter, source }
    }

    /// Restart the counter and block until `seconds` ticks have been seen.
    pub fn wait_seconds(&mut self, seconds: u32) {
        self.counter.restart();
        while self.counter.read() < seconds {
            self.source.idle();
        }
    }

    pub fn elapsed(&self) -> u32 {
        self.counter.read()
    }

    /// Stop ticking and hand the source back.
    pub fn stop(mut self) -> T {
        self.source.stop();
        self.source
    }
}
