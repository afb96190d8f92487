//! Spawning of background tasks with error capture

use std::{future::Future, sync::Arc};

use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, error, info};

use crate::{
    services::error_log::{ErrorKind, ErrorRecord},
    state::AppState,
};

/// Spawn `task` and record an error it returns as `UNHANDLED_REJECTION`.
/// Panics are captured by the panic hook instead.
pub fn spawn_supervised<F>(state: Arc<AppState>, name: &'static str, task: F) -> JoinHandle<()>
where
    F: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    let inner = tokio::spawn(task);
    tokio::spawn(async move {
        match inner.await {
            Ok(Ok(())) => debug!("Task {} finished", name),
            Ok(Err(e)) => {
                state
                    .record_error(
                        ErrorKind::UnhandledRejection,
                        format!("{}: {:#}", name, e),
                        Some(format!("{:?}", e)),
                    )
                    .await;
            }
            Err(join_error) if join_error.is_panic() => {
                error!("Task {} panicked", name);
            }
            Err(_) => debug!("Task {} cancelled", name),
        }
    })
}

/// Drain records produced by the panic hook into the error log
pub async fn error_log_task(state: Arc<AppState>, mut rx: mpsc::UnboundedReceiver<ErrorRecord>) {
    info!("Starting error log task");
    while let Some(record) = rx.recv().await {
        error!("[{}] {}", record.kind, record.message);
        state.store_error(record).await;
    }
}
