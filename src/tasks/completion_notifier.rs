//! Session completion background task

use std::sync::Arc;
use tokio::sync::broadcast::{error::RecvError, Receiver};
use tracing::{debug, error, info, warn};

use crate::state::{AppState, TimerEvent};

/// Logged when the assistant cannot be asked about a finished session
pub const LOCAL_COMPLETION_NOTE: &str = "Timer finished! Great work. Keep going!";

/// Background task reacting to completed sessions.
///
/// Takes an already-subscribed receiver so no event emitted between spawn
/// and first poll is missed. Assistant requests run in their own tasks so a
/// slow backend never stalls the receiver.
pub async fn completion_notifier_task(state: Arc<AppState>, mut events: Receiver<TimerEvent>) {
    info!(
        "Starting completion notifier (assistant notifications {})",
        if state.notify_assistant { "on" } else { "off" }
    );

    loop {
        match events.recv().await {
            Ok(TimerEvent::SessionCompleted { session }) => {
                let total = state.record_completion();
                info!("{} session finished ({} completed so far)", session, total);
                if !state.notify_assistant {
                    continue;
                }

                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    match state.notify_session_completed(session).await {
                        Ok(reply) => info!("Assistant: {}", reply.content),
                        Err(e) => {
                            warn!("Failed to reach assistant after {} session: {}", session, e);
                            info!("{}", LOCAL_COMPLETION_NOTE);
                        }
                    }
                });
            }
            Ok(event) => debug!("Notifier ignoring {} event", event.name()),
            Err(RecvError::Lagged(skipped)) => {
                warn!("Completion notifier lagged, {} events skipped", skipped);
            }
            Err(RecvError::Closed) => {
                error!("Timer event channel closed, stopping completion notifier");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{
        services::{chat::tests::{echo_backend, failing_backend, slow_backend}, Message},
        state::{app_state::{tests::test_app, SESSION_COMPLETE_PROMPT}, CompletionPolicy},
    };

    async fn wait_for_history(state: &AppState, len: usize) -> Vec<Message> {
        for _ in 0..200 {
            let history = state.get_history().unwrap();
            if history.len() >= len {
                return history;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("history never reached {} messages", len);
    }

    async fn wait_for_completions(state: &AppState, count: u64) {
        for _ in 0..200 {
            if state.get_completed_sessions() >= count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("never saw {} completed sessions", count);
    }

    #[tokio::test]
    async fn asks_assistant_when_a_session_completes() {
        let (url, seen) = echo_backend().await;
        let app = test_app(&url, CompletionPolicy::Stay, true);
        let events = app.state.timer.subscribe();
        tokio::spawn(completion_notifier_task(Arc::clone(&app.state), events));

        app.state.start_timer();
        app.clock.advance_secs(1500);
        app.scheduler.fire();

        let history = wait_for_history(&app.state, 2).await;
        assert_eq!(history[0], Message::user(SESSION_COMPLETE_PROMPT));
        assert_eq!(
            history[1],
            Message::assistant(format!("echo: {}", SESSION_COMPLETE_PROMPT))
        );
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn stays_quiet_when_notifications_are_off() {
        let (url, seen) = echo_backend().await;
        let app = test_app(&url, CompletionPolicy::Stay, false);
        let events = app.state.timer.subscribe();
        tokio::spawn(completion_notifier_task(Arc::clone(&app.state), events));

        app.state.start_timer();
        app.clock.advance_secs(1500);
        app.scheduler.fire();
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(app.state.get_history().unwrap().is_empty());
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn backend_failure_leaves_history_empty() {
        let url = failing_backend().await;
        let app = test_app(&url, CompletionPolicy::Stay, true);
        let events = app.state.timer.subscribe();
        let notifier = tokio::spawn(completion_notifier_task(Arc::clone(&app.state), events));

        app.state.start_timer();
        app.clock.advance_secs(1500);
        app.scheduler.fire();

        wait_for_completions(&app.state, 1).await;
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(app.state.get_history().unwrap().is_empty());
        assert!(!notifier.is_finished());
    }

    #[tokio::test]
    async fn keeps_counting_completions_while_assistant_is_busy() {
        let url = slow_backend(Duration::from_secs(3600)).await;
        let app = test_app(&url, CompletionPolicy::Stay, true);
        let events = app.state.timer.subscribe();
        tokio::spawn(completion_notifier_task(Arc::clone(&app.state), events));

        for _ in 0..2 {
            app.state.start_timer();
            app.clock.advance_secs(1500);
            app.scheduler.fire();
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        wait_for_completions(&app.state, 2).await;
        // Only the first prompt is in flight; the second waits its turn.
        assert_eq!(app.state.get_history().unwrap(), vec![Message::user(SESSION_COMPLETE_PROMPT)]);
    }
}
