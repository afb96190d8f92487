//! Page-side break notifier
//!
//! The notifier shows an overlay when the background signals a reminder,
//! counts the break down once per second and reports how the session ended:
//! confirming before the countdown reaches zero completes the break, running
//! out skips it. The overlay itself is behind the [`Overlay`] trait so the
//! state machine is independent of how it is drawn.

pub mod console;
pub mod runner;

use crate::{
    messages::Message,
    state::settings::{Settings, MIN_BREAK_SECONDS},
};

pub use console::{spawn_console_page, ConsoleOverlay};
pub use runner::{run_notifier, PageInput};

/// Drawing surface of the notifier
pub trait Overlay: Send {
    /// Make the overlay visible for a break of `duration` seconds
    fn show(&mut self, duration: u32);
    fn update_countdown(&mut self, remaining: u32);
    /// Refresh the configured duration shown in the tip
    fn update_subtip(&mut self, duration: u32);
    fn hide(&mut self);
}

/// A running break session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotifierSession {
    pub session: Option<u64>,
    pub remaining: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifierState {
    Hidden,
    Counting(NotifierSession),
}

/// How a session ended, as reported to the background
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    Completed { session: Option<u64> },
    Skipped { session: Option<u64> },
}

impl SessionOutcome {
    pub fn into_message(self) -> Message {
        match self {
            SessionOutcome::Completed { session } => Message::RestartTimer { session },
            SessionOutcome::Skipped { session } => Message::SkipTimer { session },
        }
    }
}

/// Notifier state machine: `Hidden` or `Counting`
#[derive(Debug)]
pub struct Notifier<O> {
    overlay: O,
    break_duration: u32,
    state: NotifierState,
}

impl<O: Overlay> Notifier<O> {
    pub fn new(overlay: O, settings: &Settings) -> Self {
        Self {
            overlay,
            break_duration: settings.break_duration.max(MIN_BREAK_SECONDS),
            state: NotifierState::Hidden,
        }
    }

    pub fn state(&self) -> NotifierState {
        self.state
    }

    pub fn is_visible(&self) -> bool {
        matches!(self.state, NotifierState::Counting(_))
    }

    /// Duration the next session will count down from
    pub fn break_duration(&self) -> u32 {
        self.break_duration
    }

    pub fn overlay(&self) -> &O {
        &self.overlay
    }

    /// Start a session. A session already running is replaced.
    pub fn show(&mut self, session: Option<u64>) {
        let remaining = self.break_duration;
        self.overlay.show(remaining);
        self.overlay.update_countdown(remaining);
        self.state = NotifierState::Counting(NotifierSession { session, remaining });
    }

    /// One second passed. Reaching zero ends the session as skipped.
    pub fn tick(&mut self) -> Option<SessionOutcome> {
        let NotifierState::Counting(current) = &mut self.state else {
            return None;
        };
        current.remaining = current.remaining.saturating_sub(1);
        let NotifierSession { session, remaining } = *current;
        self.overlay.update_countdown(remaining);

        if remaining == 0 {
            self.close();
            Some(SessionOutcome::Skipped { session })
        } else {
            None
        }
    }

    /// The user confirmed the break
    pub fn confirm(&mut self) -> Option<SessionOutcome> {
        let NotifierState::Counting(NotifierSession { session, .. }) = self.state else {
            return None;
        };
        self.close();
        Some(SessionOutcome::Completed { session })
    }

    /// New settings apply to the next session; a running countdown keeps
    /// its length.
    pub fn apply_settings(&mut self, settings: &Settings) {
        self.break_duration = settings.break_duration.max(MIN_BREAK_SECONDS);
        self.overlay.update_subtip(self.break_duration);
    }

    /// Tear down without reporting an outcome (page unload)
    pub fn destroy(&mut self) {
        if self.is_visible() {
            self.close();
        }
    }

    fn close(&mut self) {
        self.state = NotifierState::Hidden;
        self.overlay.hide();
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{OverlayEvent, RecordingOverlay};
    use super::*;

    fn notifier(break_duration: u32) -> Notifier<RecordingOverlay> {
        Notifier::new(
            RecordingOverlay::default(),
            &Settings { interval: 20, break_duration },
        )
    }

    #[test]
    fn countdown_to_zero_skips_exactly_once() {
        let mut notifier = notifier(20);
        notifier.show(Some(4));

        let outcomes: Vec<_> = (0..25).filter_map(|_| notifier.tick()).collect();

        assert_eq!(outcomes, vec![SessionOutcome::Skipped { session: Some(4) }]);
        assert_eq!(notifier.state(), NotifierState::Hidden);
        assert_eq!(notifier.confirm(), None);

        let events = notifier.overlay().events();
        assert_eq!(events.first(), Some(&OverlayEvent::Show(20)));
        assert_eq!(events.last(), Some(&OverlayEvent::Hide));
        assert!(events.contains(&OverlayEvent::Countdown(0)));
    }

    #[test]
    fn confirm_at_fifteen_seconds_completes() {
        let mut notifier = notifier(20);
        notifier.show(Some(1));
        for _ in 0..5 {
            assert_eq!(notifier.tick(), None);
        }
        assert_eq!(
            notifier.state(),
            NotifierState::Counting(NotifierSession { session: Some(1), remaining: 15 })
        );

        assert_eq!(notifier.confirm(), Some(SessionOutcome::Completed { session: Some(1) }));
        assert!(!notifier.is_visible());
        assert_eq!(notifier.tick(), None);
        assert_eq!(notifier.confirm(), None);
    }

    #[test]
    fn show_restarts_running_session() {
        let mut notifier = notifier(10);
        notifier.show(Some(1));
        notifier.tick();
        notifier.tick();

        notifier.show(Some(2));

        assert_eq!(
            notifier.state(),
            NotifierState::Counting(NotifierSession { session: Some(2), remaining: 10 })
        );
    }

    #[test]
    fn settings_apply_to_next_session() {
        let mut notifier = notifier(20);
        notifier.show(None);
        notifier.apply_settings(&Settings { interval: 20, break_duration: 30 });

        assert_eq!(
            notifier.state(),
            NotifierState::Counting(NotifierSession { session: None, remaining: 20 })
        );
        notifier.confirm();
        notifier.show(None);
        assert_eq!(
            notifier.state(),
            NotifierState::Counting(NotifierSession { session: None, remaining: 30 })
        );
        assert!(notifier.overlay().events().contains(&OverlayEvent::Subtip(30)));
    }

    #[test]
    fn break_duration_has_a_floor() {
        let mut notifier = notifier(2);
        assert_eq!(notifier.break_duration(), 5);
        notifier.apply_settings(&Settings { interval: 20, break_duration: 0 });
        assert_eq!(notifier.break_duration(), 5);
    }

    #[test]
    fn destroy_hides_without_outcome() {
        let mut notifier = notifier(20);
        notifier.destroy();
        assert!(notifier.overlay().events().is_empty());

        notifier.show(None);
        notifier.destroy();
        assert_eq!(notifier.state(), NotifierState::Hidden);
        assert_eq!(notifier.overlay().events().last(), Some(&OverlayEvent::Hide));
    }

    #[test]
    fn outcomes_map_to_messages() {
        assert_eq!(
            SessionOutcome::Completed { session: Some(2) }.into_message(),
            Message::RestartTimer { session: Some(2) }
        );
        assert_eq!(
            SessionOutcome::Skipped { session: None }.into_message(),
            Message::SkipTimer { session: None }
        );
    }
}
