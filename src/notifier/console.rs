//! Terminal overlay and the in-process console page

use std::{
    io::{self, Write},
    sync::Arc,
};

use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::mpsc::{self, UnboundedReceiver},
};
use tracing::{debug, info};

use super::{run_notifier, Notifier, Overlay, PageInput};
use crate::{
    messages::Message,
    services::pages::{PageId, PageKind},
    state::AppState,
    tasks::spawn_supervised,
};

/// Draws the break prompt on stdout
#[derive(Debug, Default)]
pub struct ConsoleOverlay {
    duration: u32,
}

impl ConsoleOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    fn subtip(&self) -> String {
        format!("Relax your eyes for {} seconds", self.duration)
    }
}

impl Overlay for ConsoleOverlay {
    fn show(&mut self, duration: u32) {
        self.duration = duration;
        let mut out = io::stdout().lock();
        let _ = writeln!(out);
        let _ = writeln!(out, "👁️  Time to rest your eyes!");
        let _ = writeln!(out, "   Look at something 6 meters away. {}.", self.subtip());
        let _ = writeln!(out, "   Press Enter when you are done.");
        let _ = out.flush();
    }

    fn update_countdown(&mut self, remaining: u32) {
        let mut out = io::stdout().lock();
        let _ = write!(out, "\r   Closing automatically in {:>3}s ", remaining);
        let _ = out.flush();
    }

    fn update_subtip(&mut self, duration: u32) {
        self.duration = duration;
        debug!("Console overlay tip: {}", self.subtip());
    }

    fn hide(&mut self) {
        let mut out = io::stdout().lock();
        let _ = writeln!(out);
        let _ = writeln!(out, "   Break over.");
        let _ = out.flush();
    }
}

/// Register a console page and run its notifier. Each line on stdin
/// confirms the running break.
pub async fn spawn_console_page(state: Arc<AppState>) -> anyhow::Result<()> {
    let connection = state.pages.register(PageKind::Console)?;
    let page_id = connection.id;
    let notifier = Notifier::new(ConsoleOverlay::new(), &state.settings().await);

    let (input_tx, input_rx) = mpsc::unbounded_channel();
    let (outbox_tx, mut outbox_rx) = mpsc::unbounded_channel::<Message>();

    spawn_supervised(Arc::clone(&state), "console input", async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while lines.next_line().await?.is_some() {
            if input_tx.send(PageInput::Confirm).is_err() {
                break;
            }
        }
        debug!("Console input closed");
        Ok(())
    });

    let dispatch_state = Arc::clone(&state);
    spawn_supervised(Arc::clone(&state), "console outbox", async move {
        forward_outbox(&dispatch_state, page_id, &mut outbox_rx).await;
        Ok(())
    });

    let runner_state = Arc::clone(&state);
    spawn_supervised(state, "console page", async move {
        run_notifier(notifier, connection.signals, input_rx, outbox_tx).await;
        runner_state.pages.unregister(page_id)?;
        info!("Console page {} closed", page_id);
        Ok(())
    });

    info!("Console page {} attached, press Enter to confirm breaks", page_id);
    Ok(())
}

/// Dispatch everything the console notifier reports until it shuts down
async fn forward_outbox(state: &AppState, page: PageId, outbox: &mut UnboundedReceiver<Message>) {
    while let Some(message) = outbox.recv().await {
        let action = message.action();
        let reply = state.dispatch(message).await;
        debug!("Console page {} -> {}: {:?}", page, action, reply);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::store::MemoryStore;

    #[tokio::test(start_paused = true)]
    async fn outbox_messages_reach_dispatch() {
        let state = AppState::new(Arc::new(MemoryStore::new()), "127.0.0.1".into(), 0);
        state.load().await;
        let (outbox_tx, mut outbox_rx) = mpsc::unbounded_channel::<Message>();

        outbox_tx.send(Message::SkipTimer { session: None }).unwrap();
        outbox_tx.send(Message::RestartTimer { session: Some(42) }).unwrap();
        drop(outbox_tx);
        forward_outbox(&state, 1, &mut outbox_rx).await;

        let snapshot = state.snapshot().await;
        assert_eq!(snapshot.stats.skipped_breaks, 1);
        assert_eq!(snapshot.stats.completed_breaks, 0);
        assert_eq!(state.get_last_action().0.as_deref(), Some("restartTimer"));
    }
}
