//! Time source and periodic scheduling boundary used by the timer engine

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

/// Monotonic time source
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Clock backed by `Instant::now()`
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Callback invoked by a scheduler on every period
pub type TickCallback = Arc<dyn Fn() + Send + Sync>;

/// Token identifying one scheduled periodic callback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TickHandle(pub u64);

/// Periodic scheduling primitive.
///
/// Implementations must not invoke `callback` synchronously from inside
/// `schedule`: the engine holds its own lock while scheduling.
pub trait Scheduler: Send + Sync {
    fn schedule(&self, every: Duration, callback: TickCallback) -> TickHandle;

    /// Cancel a scheduled callback. Unknown or already cancelled handles are ignored.
    fn cancel(&self, handle: TickHandle);
}
