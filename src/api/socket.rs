//! WebSocket endpoint for page contexts
//!
//! A connected socket is a page. The background pushes [`PageSignal`]s as
//! JSON text frames; the page sends action-tagged messages and gets a
//! [`Reply`] frame for each one.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message as Frame, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use super::handlers::dispatch_value;
use crate::{
    messages::{PageSignal, Reply},
    services::pages::{PageId, PageKind},
    state::AppState,
    tasks::spawn_supervised,
};

/// Page-local controls that never reach the dispatch table
#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
enum PageControl {
    /// The page gained or lost focus
    Visibility { active: bool },
}

/// Handle GET /page - Upgrade to a page socket
pub async fn page_socket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> Response {
    ws.on_upgrade(move |socket| async move {
        let task_state = Arc::clone(&state);
        let _ = spawn_supervised(state, "page socket", run_page_socket(task_state, socket)).await;
    })
}

/// Handle one text frame from a page
pub async fn handle_page_frame(state: &AppState, page: PageId, text: &str) -> Reply {
    if let Ok(PageControl::Visibility { active }) = serde_json::from_str::<PageControl>(text) {
        return match state.pages.set_active(page, active) {
            Ok(_) => Reply::ok(),
            Err(e) => Reply::failure(e.to_string()),
        };
    }

    match serde_json::from_str::<Value>(text) {
        Ok(value) => dispatch_value(state, value).await,
        Err(e) => {
            state.count_message_failure().await;
            Reply::failure(format!("invalid message: {}", e))
        }
    }
}

async fn run_page_socket(state: Arc<AppState>, socket: WebSocket) -> anyhow::Result<()> {
    let connection = state.pages.register(PageKind::Socket)?;
    let page = connection.id;
    let mut signals = connection.signals;
    let (mut sender, mut receiver) = socket.split();
    info!("Page {} connected", page);

    loop {
        tokio::select! {
            signal = signals.recv() => {
                let Some(signal) = signal else { break };
                let text = encode_signal(&signal)?;
                if sender.send(Frame::Text(text)).await.is_err() {
                    debug!("Page {} went away while sending", page);
                    break;
                }
            }
            frame = receiver.next() => match frame {
                Some(Ok(Frame::Text(text))) => {
                    let reply = handle_page_frame(&state, page, &text).await;
                    if sender.send(Frame::Text(serde_json::to_string(&reply)?)).await.is_err() {
                        break;
                    }
                }
                Some(Ok(Frame::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    debug!("Page {} socket error: {}", page, e);
                    break;
                }
            }
        }
    }

    state.pages.unregister(page)?;
    info!("Page {} disconnected", page);
    Ok(())
}

fn encode_signal(signal: &PageSignal) -> serde_json::Result<String> {
    serde_json::to_string(signal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{services::store::MemoryStore, state::ReminderPhase};

    async fn state() -> Arc<AppState> {
        let state = Arc::new(AppState::new(Arc::new(MemoryStore::new()), "127.0.0.1".into(), 0));
        state.load().await;
        state
    }

    #[tokio::test(start_paused = true)]
    async fn visibility_frame_toggles_page() {
        let state = state().await;
        let page = state.pages.register(PageKind::Socket).unwrap();

        let frame = r#"{"action":"visibility","active":false}"#;
        let reply = handle_page_frame(&state, page.id, frame).await;

        assert_eq!(reply, Reply::ok());
        assert!(!state.pages.list()[0].active);
    }

    #[tokio::test(start_paused = true)]
    async fn action_frames_reach_dispatch() {
        let state = state().await;
        let frame = r#"{"action":"toggleEnable","status":false}"#;
        let reply = handle_page_frame(&state, 1, frame).await;

        assert_eq!(reply, Reply::ok());
        assert_eq!(state.snapshot().await.phase, ReminderPhase::Disabled);
    }

    #[tokio::test(start_paused = true)]
    async fn garbage_frame_counts_as_failure() {
        let state = state().await;

        let reply = handle_page_frame(&state, 1, "not json").await;
        assert!(!reply.success);
        let reply = handle_page_frame(&state, 1, r#"{"action":"getTimerStatus"}"#).await;
        assert!(!reply.success);

        assert_eq!(state.snapshot().await.stats.message_failures, 2);
    }
}
