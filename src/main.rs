//! Eye Break - a local daemon that reminds you to rest your eyes
//!
//! This is the main entry point for the eye-break application.

use std::sync::Arc;

use tokio::{net::TcpListener, sync::mpsc};
use tracing::info;

use eye_break::{
    api::create_router,
    config::Config,
    notifier::spawn_console_page,
    services::{error_log::install_panic_hook, ErrorKind, JsonFileStore, MemoryStore, Store},
    state::AppState,
    tasks::{error_log_task, reminder_task},
    utils::shutdown_signal,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Initialize tracing with appropriate log level
    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "eye_break={},page=info,tower_http=info",
            config.log_level()
        ))
        .init();

    info!("Starting eye-break v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration: host={}, port={}", config.host, config.port);

    // Open the persistent store
    let mut load_error = None;
    let store: Arc<dyn Store> = if config.ephemeral {
        info!("Ephemeral mode, state is kept in memory");
        Arc::new(MemoryStore::new())
    } else {
        let (store, error) = JsonFileStore::open_or_recover(config.store_path()).await?;
        info!("Store: {}", store.path().display());
        load_error = error;
        Arc::new(store)
    };

    // Create application state
    let state = Arc::new(AppState::new(store, config.host.clone(), config.port));

    // Capture panics into the error log
    let (error_tx, error_rx) = mpsc::unbounded_channel();
    install_panic_hook(error_tx);
    tokio::spawn(error_log_task(Arc::clone(&state), error_rx));

    if let Some(e) = load_error {
        state
            .record_error(ErrorKind::StateLoadFailed, e.to_string(), None)
            .await;
    }

    // Start the reminder task before arming the alarm
    let reminder_state = Arc::clone(&state);
    tokio::spawn(async move {
        reminder_task(reminder_state).await;
    });

    state.load().await;

    if config.console {
        spawn_console_page(Arc::clone(&state)).await?;
    }

    // Create HTTP router with all endpoints
    let app = create_router(Arc::clone(&state));

    // Bind to the specified address
    let addr = config.address();
    let listener = TcpListener::bind(&addr).await?;

    info!("Server running on http://{}", addr);
    info!("Endpoints:");
    info!("  POST /enable    - Turn reminders on");
    info!("  POST /disable   - Turn reminders off");
    info!("  GET  /settings  - Current interval and break duration");
    info!("  PUT  /settings  - Save interval (1-180 min) and break duration (5-300 s)");
    info!("  POST /message   - Send an action-tagged message");
    info!("  GET  /stats     - Today's counters");
    info!("  GET  /errors    - Recorded errors");
    info!("  GET  /status    - Current status and timer");
    info!("  GET  /health    - Health check");
    info!("  GET  /page      - WebSocket for page notifiers");

    // Setup graceful shutdown
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

    info!("Server shutdown complete");
    Ok(())
}
