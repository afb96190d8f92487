//! Event loop driving a notifier inside one page

use std::time::Duration;

use tokio::{
    sync::mpsc,
    time::{interval_at, Instant, Interval},
};
use tracing::{debug, warn};

use super::{Notifier, Overlay, SessionOutcome};
use crate::messages::{Message, PageSignal};

/// Input from the user or the page itself
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageInput {
    /// The confirm button was pressed
    Confirm,
    /// The page is going away
    Unload,
}

fn countdown() -> Interval {
    let second = Duration::from_secs(1);
    interval_at(Instant::now() + second, second)
}

async fn next_tick(countdown: &mut Option<Interval>) {
    match countdown {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

fn report(outbox: &mpsc::UnboundedSender<Message>, outcome: SessionOutcome) {
    debug!("Session ended: {:?}", outcome);
    if outbox.send(outcome.into_message()).is_err() {
        warn!("Background unreachable, {:?} not reported", outcome);
    }
}

/// Run the notifier until the page unloads or its signal channel closes.
///
/// Events are handled one at a time, so countdown ticks never overlap.
/// Signals take priority over user input, and the countdown is dropped
/// before an outcome is reported.
pub async fn run_notifier<O: Overlay>(
    mut notifier: Notifier<O>,
    mut signals: mpsc::UnboundedReceiver<PageSignal>,
    mut inputs: mpsc::UnboundedReceiver<PageInput>,
    outbox: mpsc::UnboundedSender<Message>,
) -> Notifier<O> {
    let mut ticker: Option<Interval> = None;
    let mut inputs_open = true;

    loop {
        tokio::select! {
            biased;

            signal = signals.recv() => match signal {
                Some(PageSignal::ShowReminder { session }) => {
                    notifier.show(session);
                    ticker = Some(countdown());
                }
                Some(PageSignal::SettingsUpdated { settings }) => {
                    notifier.apply_settings(&settings)
                }
                None => break,
            },
            input = inputs.recv(), if inputs_open => match input {
                Some(PageInput::Confirm) => {
                    if let Some(outcome) = notifier.confirm() {
                        ticker = None;
                        report(&outbox, outcome);
                    }
                }
                Some(PageInput::Unload) => break,
                None => inputs_open = false,
            },
            _ = next_tick(&mut ticker) => {
                if let Some(outcome) = notifier.tick() {
                    ticker = None;
                    report(&outbox, outcome);
                }
            }
        }
    }

    notifier.destroy();
    notifier
}

#[cfg(test)]
mod tests {
    use super::super::testing::{OverlayEvent, RecordingOverlay};
    use super::*;
    use crate::state::Settings;

    struct Page {
        signals: mpsc::UnboundedSender<PageSignal>,
        inputs: mpsc::UnboundedSender<PageInput>,
        outbox: mpsc::UnboundedReceiver<Message>,
        overlay: RecordingOverlay,
        handle: tokio::task::JoinHandle<Notifier<RecordingOverlay>>,
    }

    fn spawn_page(break_duration: u32) -> Page {
        let overlay = RecordingOverlay::default();
        let notifier = Notifier::new(overlay.clone(), &Settings { interval: 20, break_duration });
        let (signals_tx, signals_rx) = mpsc::unbounded_channel();
        let (inputs_tx, inputs_rx) = mpsc::unbounded_channel();
        let (outbox_tx, outbox_rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(run_notifier(notifier, signals_rx, inputs_rx, outbox_tx));
        Page {
            signals: signals_tx,
            inputs: inputs_tx,
            outbox: outbox_rx,
            overlay,
            handle,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn unanswered_session_skips_after_duration() {
        let mut page = spawn_page(20);
        let started = Instant::now();
        page.signals
            .send(PageSignal::ShowReminder { session: Some(1) })
            .unwrap();

        let message = page.outbox.recv().await.unwrap();

        assert_eq!(message, Message::SkipTimer { session: Some(1) });
        assert_eq!(started.elapsed(), Duration::from_secs(20));
        let countdowns: Vec<u32> = page
            .overlay
            .events()
            .into_iter()
            .filter_map(|e| match e {
                OverlayEvent::Countdown(n) => Some(n),
                _ => None,
            })
            .collect();
        assert_eq!(countdowns, (0..=20).rev().collect::<Vec<_>>());

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(page.outbox.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn confirmation_completes_and_stops_ticking() {
        let mut page = spawn_page(20);
        page.signals
            .send(PageSignal::ShowReminder { session: Some(7) })
            .unwrap();
        page.inputs.send(PageInput::Confirm).unwrap();

        let message = page.outbox.recv().await.unwrap();
        assert_eq!(message, Message::RestartTimer { session: Some(7) });

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(page.outbox.try_recv().is_err());
        assert_eq!(page.overlay.events().last(), Some(&OverlayEvent::Hide));
    }

    #[tokio::test(start_paused = true)]
    async fn confirm_while_hidden_reports_nothing() {
        let mut page = spawn_page(20);
        page.inputs.send(PageInput::Confirm).unwrap();
        page.inputs.send(PageInput::Unload).unwrap();

        let notifier = page.handle.await.unwrap();
        assert!(!notifier.is_visible());
        assert!(page.outbox.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn unload_during_session_hides_without_outcome() {
        let mut page = spawn_page(20);
        page.signals.send(PageSignal::ShowReminder { session: None }).unwrap();
        tokio::time::sleep(Duration::from_millis(3500)).await;
        page.inputs.send(PageInput::Unload).unwrap();

        let notifier = page.handle.await.unwrap();
        assert!(!notifier.is_visible());
        assert!(page.outbox.try_recv().is_err());
        assert_eq!(page.overlay.events().last(), Some(&OverlayEvent::Hide));
    }

    #[tokio::test(start_paused = true)]
    async fn new_show_restarts_countdown() {
        let mut page = spawn_page(10);
        let started = Instant::now();
        page.signals.send(PageSignal::ShowReminder { session: Some(1) }).unwrap();
        tokio::time::sleep(Duration::from_millis(6500)).await;
        page.signals.send(PageSignal::ShowReminder { session: Some(2) }).unwrap();

        let message = page.outbox.recv().await.unwrap();

        assert_eq!(message, Message::SkipTimer { session: Some(2) });
        assert_eq!(started.elapsed(), Duration::from_millis(16500));
    }
}
