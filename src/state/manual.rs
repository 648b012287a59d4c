//! Simulated clock and scheduler for deterministic driving of the timer engine in tests

use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard, PoisonError},
    time::{Duration, Instant},
};

use super::clock::{Clock, Scheduler, TickCallback, TickHandle};

/// Clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    offset: Mutex<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut offset = self.offset.lock().unwrap_or_else(PoisonError::into_inner);
        *offset += by;
    }

    pub fn advance_secs(&self, secs: u64) {
        self.advance(Duration::from_secs(secs));
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + *self.offset.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    active: HashMap<u64, TickCallback>,
    scheduled: usize,
    cancelled: usize,
}

/// Scheduler whose callbacks run only when `fire` is called.
///
/// Keeps schedule/cancel counters so tests can check that no periodic
/// callbacks overlap.
#[derive(Default)]
pub struct ManualScheduler {
    registry: Mutex<Registry>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    fn registry(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run every active callback once, returning how many ran
    pub fn fire(&self) -> usize {
        // Callbacks may cancel themselves, so run them without the registry lock.
        let callbacks: Vec<TickCallback> = self.registry().active.values().cloned().collect();
        for callback in &callbacks {
            callback();
        }
        callbacks.len()
    }

    pub fn active(&self) -> usize {
        self.registry().active.len()
    }

    pub fn scheduled(&self) -> usize {
        self.registry().scheduled
    }

    pub fn cancelled(&self) -> usize {
        self.registry().cancelled
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, _every: Duration, callback: TickCallback) -> TickHandle {
        let mut registry = self.registry();
        registry.next_id += 1;
        let id = registry.next_id;
        registry.active.insert(id, callback);
        registry.scheduled += 1;
        TickHandle(id)
    }

    fn cancel(&self, handle: TickHandle) {
        let mut registry = self.registry();
        if registry.active.remove(&handle.0).is_some() {
            registry.cancelled += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use super::*;

    #[test]
    fn clock_moves_only_on_advance() {
        let clock = ManualClock::new();
        let before = clock.now();
        assert_eq!(clock.now(), before);
        clock.advance_secs(3);
        assert_eq!(clock.now() - before, Duration::from_secs(3));
    }

    #[test]
    fn scheduler_fires_until_cancelled() {
        let scheduler = ManualScheduler::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let handle = scheduler.schedule(
            Duration::from_secs(1),
            Arc::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );

        assert_eq!(scheduler.fire(), 1);
        assert_eq!(scheduler.fire(), 1);
        scheduler.cancel(handle);
        scheduler.cancel(handle);
        assert_eq!(scheduler.fire(), 0);

        assert_eq!(hits.load(Ordering::SeqCst), 2);
        assert_eq!(scheduler.scheduled(), 1);
        assert_eq!(scheduler.cancelled(), 1);
        assert_eq!(scheduler.active(), 0);
    }
}
