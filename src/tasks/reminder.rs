//! Reminder background task

use std::sync::Arc;

use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, error, info, warn};

use crate::{state::AppState, tasks::alarm::AlarmEvent};

/// Background task that turns alarm firings into reminder sessions
pub async fn reminder_task(state: Arc<AppState>) {
    info!("Starting reminder task");
    let alarm_rx = state.alarm_tx.subscribe();
    handle_alarms(&state, alarm_rx).await;
}

/// Drive `on_alarm` for each firing until the alarm channel closes
pub async fn handle_alarms(state: &AppState, mut alarm_rx: broadcast::Receiver<AlarmEvent>) {
    loop {
        match alarm_rx.recv().await {
            Ok(event) => {
                debug!("Reminder task received alarm: {:?}", event);
                match state.on_alarm(&event).await {
                    Ok(Some(session)) => debug!("Reminder session {} broadcast", session),
                    Ok(None) => {}
                    Err(e) => error!("Failed to handle alarm: {}", e),
                }
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!("Reminder task fell behind, {} alarm firings dropped", skipped);
            }
            Err(RecvError::Closed) => {
                info!("Alarm channel closed, reminder task stopping");
                return;
            }
        }
    }
}
