//! Countdown timer engine
//!
//! The engine owns the selected session, the running flag and the absolute
//! deadline of the current countdown. Remaining time is always derived from
//! `deadline - now`, so late tick delivery never accumulates drift.

use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError, Weak},
    time::{Duration, Instant},
};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info};

use super::{
    clock::{Clock, Scheduler, TickHandle},
    session::{Session, SessionDurations},
};
use crate::utils::format_clock;

/// How often a running countdown is recomputed
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

const EVENT_CHANNEL_CAPACITY: usize = 100;

/// What the engine does once a countdown reaches zero
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CompletionPolicy {
    /// Keep the finished session selected
    #[default]
    Stay,
    /// Select the next session (focus <-> break) without starting it
    AutoAdvance,
}

/// Events published to subscribers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TimerEvent {
    Tick { remaining_seconds: u64 },
    SessionCompleted { session: Session },
    SessionSelected { session: Session, remaining_seconds: u64 },
    Started { session: Session, remaining_seconds: u64 },
    Stopped { session: Session, remaining_seconds: u64 },
}

impl TimerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            TimerEvent::Tick { .. } => "tick",
            TimerEvent::SessionCompleted { .. } => "session_completed",
            TimerEvent::SessionSelected { .. } => "session_selected",
            TimerEvent::Started { .. } => "started",
            TimerEvent::Stopped { .. } => "stopped",
        }
    }
}

/// Mutable countdown state guarded by the engine
#[derive(Debug, Clone)]
pub struct TimerState {
    pub selected: Session,
    pub running: bool,
    pub deadline: Option<Instant>,
    pub remaining_seconds: u64,
    tick_handle: Option<TickHandle>,
}

impl TimerState {
    /// Fresh state with `Focus` selected and stopped
    pub fn new(durations: &SessionDurations) -> Self {
        Self {
            selected: Session::Focus,
            running: false,
            deadline: None,
            remaining_seconds: durations.nominal(Session::Focus),
            tick_handle: None,
        }
    }

    /// Remaining whole seconds at `now`, rounded up and clamped at zero
    pub fn remaining_at(&self, now: Instant) -> u64 {
        match (self.running, self.deadline) {
            (true, Some(deadline)) => ceil_secs(deadline.saturating_duration_since(now)),
            _ => self.remaining_seconds,
        }
    }
}

fn ceil_secs(duration: Duration) -> u64 {
    duration.as_secs() + u64::from(duration.subsec_nanos() > 0)
}

/// Point-in-time view of the timer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerSnapshot {
    pub session: Session,
    pub running: bool,
    pub remaining_seconds: u64,
    pub nominal_seconds: u64,
    pub display: String,
}

struct Shared {
    state: Mutex<TimerState>,
    durations: SessionDurations,
    policy: CompletionPolicy,
    clock: Arc<dyn Clock>,
    scheduler: Arc<dyn Scheduler>,
    events_tx: broadcast::Sender<TimerEvent>,
}

/// Cloneable handle to a single countdown engine
#[derive(Clone)]
pub struct TimerEngine {
    shared: Arc<Shared>,
}

impl TimerEngine {
    pub fn new(
        durations: SessionDurations,
        policy: CompletionPolicy,
        clock: Arc<dyn Clock>,
        scheduler: Arc<dyn Scheduler>,
    ) -> Self {
        let (events_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(TimerState::new(&durations)),
                durations,
                policy,
                clock,
                scheduler,
                events_tx,
            }),
        }
    }

    pub fn durations(&self) -> SessionDurations {
        self.shared.durations
    }

    pub fn policy(&self) -> CompletionPolicy {
        self.shared.policy
    }

    /// Receive every event emitted after this call
    pub fn subscribe(&self) -> broadcast::Receiver<TimerEvent> {
        self.shared.events_tx.subscribe()
    }

    /// Cancel any countdown and select `session` at its nominal duration
    pub fn select_session(&self, session: Session) -> TimerSnapshot {
        let mut state = self.lock();
        self.cancel_tick(&mut state);

        state.selected = session;
        state.running = false;
        state.deadline = None;
        state.remaining_seconds = self.shared.durations.nominal(session);
        info!("Selected {} session ({})", session, format_clock(state.remaining_seconds));

        self.emit(TimerEvent::SessionSelected {
            session,
            remaining_seconds: state.remaining_seconds,
        });
        self.snapshot_of(&state)
    }

    /// Start the countdown. Returns false if it was already running.
    pub fn start(&self) -> bool {
        let mut state = self.lock();
        if state.running {
            debug!("Start ignored, {} countdown already running", state.selected);
            return false;
        }
        self.cancel_tick(&mut state);

        if state.remaining_seconds == 0 {
            state.remaining_seconds = self.shared.durations.nominal(state.selected);
        }
        let now = self.shared.clock.now();
        state.deadline = Some(now + Duration::from_secs(state.remaining_seconds));
        state.running = true;

        let weak: Weak<Shared> = Arc::downgrade(&self.shared);
        let handle = self.shared.scheduler.schedule(
            TICK_INTERVAL,
            Arc::new(move || {
                if let Some(shared) = weak.upgrade() {
                    TimerEngine { shared }.tick();
                }
            }),
        );
        state.tick_handle = Some(handle);

        info!(
            "Started {} countdown with {} remaining",
            state.selected,
            format_clock(state.remaining_seconds)
        );
        self.emit(TimerEvent::Started {
            session: state.selected,
            remaining_seconds: state.remaining_seconds,
        });
        true
    }

    /// Cancel the countdown and reset to the nominal duration (no pause)
    pub fn stop(&self) {
        let mut state = self.lock();
        let was_running = state.running;
        self.cancel_tick(&mut state);

        state.running = false;
        state.deadline = None;
        state.remaining_seconds = self.shared.durations.nominal(state.selected);
        if was_running {
            info!("Stopped {} countdown", state.selected);
        }

        self.emit(TimerEvent::Stopped {
            session: state.selected,
            remaining_seconds: state.remaining_seconds,
        });
    }

    /// Recompute remaining time from the deadline; invoked by the scheduler
    pub(crate) fn tick(&self) {
        let mut state = self.lock();
        // Stale callbacks after a cancel or completion are dropped here.
        if !state.running {
            return;
        }

        let remaining = state.remaining_at(self.shared.clock.now());
        if remaining > 0 {
            state.remaining_seconds = remaining;
            self.emit(TimerEvent::Tick {
                remaining_seconds: remaining,
            });
            return;
        }

        self.cancel_tick(&mut state);
        state.running = false;
        state.deadline = None;
        state.remaining_seconds = 0;

        let completed = state.selected;
        info!("{} session completed", completed);
        self.emit(TimerEvent::SessionCompleted { session: completed });

        if self.shared.policy == CompletionPolicy::AutoAdvance {
            let next = completed.next();
            state.selected = next;
            state.remaining_seconds = self.shared.durations.nominal(next);
            info!("Auto-advancing to {} session", next);
            self.emit(TimerEvent::SessionSelected {
                session: next,
                remaining_seconds: state.remaining_seconds,
            });
        }
    }

    pub fn selected_session(&self) -> Session {
        self.lock().selected
    }

    pub fn is_running(&self) -> bool {
        self.lock().running
    }

    /// Remaining seconds, computed live from the deadline while running
    pub fn remaining_seconds(&self) -> u64 {
        let state = self.lock();
        state.remaining_at(self.shared.clock.now())
    }

    /// Remaining time as `MM:SS`
    pub fn display(&self) -> String {
        format_clock(self.remaining_seconds())
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        let state = self.lock();
        self.snapshot_of(&state)
    }

    fn snapshot_of(&self, state: &TimerState) -> TimerSnapshot {
        let remaining_seconds = state.remaining_at(self.shared.clock.now());
        TimerSnapshot {
            session: state.selected,
            running: state.running,
            remaining_seconds,
            nominal_seconds: self.shared.durations.nominal(state.selected),
            display: format_clock(remaining_seconds),
        }
    }

    fn lock(&self) -> MutexGuard<'_, TimerState> {
        self.shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn cancel_tick(&self, state: &mut TimerState) {
        if let Some(handle) = state.tick_handle.take() {
            debug!("Cancelling tick process {:?}", handle);
            self.shared.scheduler.cancel(handle);
        }
    }

    fn emit(&self, event: TimerEvent) {
        // No subscribers is a normal condition.
        let _ = self.shared.events_tx.send(event);
    }
}

impl std::fmt::Debug for TimerEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerEngine")
            .field("state", &*self.lock())
            .field("durations", &self.shared.durations)
            .field("policy", &self.shared.policy)
            .finish()
    }
}
