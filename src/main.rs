//! Pomodoro Chat - A focus-session countdown timer with an assistant chat proxy
//!
//! This is the main entry point for the pomodoro-chat server.

use std::sync::Arc;
use tokio::{net::TcpListener, runtime::Handle};
use tracing::info;

use pomodoro_chat::{
    config::Config,
    state::{AppState, SystemClock, TimerEngine},
    api::create_router,
    services::ChatClient,
    tasks::{completion_notifier_task, TokioScheduler},
    utils::{format_clock, shutdown_signal},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Initialize tracing with appropriate log level
    tracing_subscriber::fmt()
        .with_env_filter(format!("pomodoro_chat={},tower_http=info", config.log_level()))
        .init();

    let durations = config.durations();
    info!("Starting pomodoro-chat server v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Configuration: host={}, port={}, focus={}, short-break={}, long-break={}, policy={:?}",
        config.host,
        config.port,
        format_clock(durations.focus),
        format_clock(durations.short_break),
        format_clock(durations.long_break),
        config.completion_policy()
    );

    let scheduler = Arc::new(TokioScheduler::new(Handle::current()));
    let timer = TimerEngine::new(
        durations,
        config.completion_policy(),
        Arc::new(SystemClock),
        scheduler,
    );
    let chat = ChatClient::new(config.chat_url.clone(), config.chat_timeout())?;
    info!("Chat backend: {}", chat.endpoint());

    let state = Arc::new(AppState::new(
        timer,
        chat,
        config.notify_assistant,
        config.port,
        config.host.clone(),
    ));

    // Subscribe before spawning so the first completion is never missed
    let events = state.timer.subscribe();
    tokio::spawn(completion_notifier_task(Arc::clone(&state), events));

    let app = create_router(Arc::clone(&state));

    let addr = config.address();
    let listener = TcpListener::bind(&addr).await?;

    info!("Server running on http://{}", addr);
    info!("Endpoints:");
    info!("  POST /session/:session - Select focus, short-break or long-break");
    info!("  POST /start            - Start the countdown");
    info!("  POST /stop             - Stop and reset the countdown");
    info!("  GET  /status           - Current timer and server status");
    info!("  GET  /events           - Timer event stream (SSE)");
    info!("  POST /chat             - Send a message to the assistant");
    info!("  GET  /chat/history     - Conversation so far");
    info!("  GET  /health           - Health check");

    let server = axum::serve(listener, app);

    tokio::select! {
        result = server => {
            if let Err(e) = result {
                tracing::error!("Server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            info!("Shutdown signal received");
        }
    }

    state.timer.stop();
    info!("Server shutdown complete");
    Ok(())
}
