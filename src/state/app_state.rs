//! Main application state and the reminder orchestrator

use std::{
    sync::{Arc, Mutex},
    time::Instant,
};

use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use super::{ReminderPhase, Settings, SettingsPatch, StatField, Stats};
use crate::{
    error::Result,
    messages::{Message, PageSignal, Reply},
    services::{
        error_log::{push_bounded, ErrorKind, ErrorRecord},
        pages::{DeliveryReport, PageRegistry},
        store::{
            read_value, write_value, Store, KEY_ERRORS, KEY_IS_ENABLED, KEY_SETTINGS, KEY_STATS,
        },
    },
    tasks::alarm::{AlarmEvent, Scheduler},
};

/// How the user ended a break session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakOutcome {
    Completed,
    Skipped,
}

impl BreakOutcome {
    fn stat(self) -> StatField {
        match self {
            BreakOutcome::Completed => StatField::CompletedBreaks,
            BreakOutcome::Skipped => StatField::SkippedBreaks,
        }
    }
}

/// What happened to a reported outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeDisposition {
    /// Counted; the alarm was re-armed if reminders are enabled
    Recorded,
    /// Belonged to an older or already answered session and was ignored
    Absorbed,
}

/// Point-in-time view for the popup and `/status`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderSnapshot {
    pub is_enabled: bool,
    pub phase: ReminderPhase,
    pub settings: Settings,
    pub stats: Stats,
    pub timer_armed: bool,
    pub timer_remaining_seconds: Option<u64>,
}

/// Everything guarded by the orchestrator lock. Handlers hold the lock for
/// their whole run, so they execute one at a time.
#[derive(Debug)]
struct ReminderCore {
    enabled: bool,
    settings: Settings,
    stats: Stats,
    phase: ReminderPhase,
    scheduler: Scheduler,
    last_session: u64,
    /// Shown session still waiting for an outcome. Survives toggling.
    open_session: Option<u64>,
}

/// Persisted state as read at startup
#[derive(Debug, Default)]
struct Persisted {
    enabled: Option<bool>,
    settings: Option<Settings>,
    stats: Option<Stats>,
}

/// Main application state shared by the HTTP API, pages and background tasks
pub struct AppState {
    store: Arc<dyn Store>,
    /// Connected page contexts
    pub pages: PageRegistry,
    core: tokio::sync::Mutex<ReminderCore>,
    /// Alarm firings, subscribed to by the reminder task
    pub alarm_tx: broadcast::Sender<AlarmEvent>,
    /// Server metadata
    pub start_time: Instant,
    pub port: u16,
    pub host: String,
    /// Last action tracking
    last_action: Mutex<Option<(String, DateTime<Utc>)>>,
}

impl AppState {
    /// Create the state with defaults. Call [`AppState::load`] before use.
    pub fn new(store: Arc<dyn Store>, host: String, port: u16) -> Self {
        let (alarm_tx, _) = broadcast::channel(16);
        let now = Local::now();

        Self {
            store,
            pages: PageRegistry::new(),
            core: tokio::sync::Mutex::new(ReminderCore {
                enabled: true,
                settings: Settings::default(),
                stats: Stats::fresh(now),
                phase: ReminderPhase::Disabled,
                scheduler: Scheduler::new(alarm_tx.clone()),
                last_session: 0,
                open_session: None,
            }),
            alarm_tx,
            start_time: Instant::now(),
            port,
            host,
            last_action: Mutex::new(None),
        }
    }

    async fn read_persisted(&self) -> Result<Persisted> {
        let values = self
            .store
            .get(&[KEY_IS_ENABLED, KEY_SETTINGS, KEY_STATS])
            .await?;
        Ok(Persisted {
            enabled: read_value(&values, KEY_IS_ENABLED)?,
            settings: read_value(&values, KEY_SETTINGS)?,
            stats: read_value(&values, KEY_STATS)?,
        })
    }

    /// Load persisted state, roll stats over to today and arm the alarm if
    /// enabled. A failed read is recorded and the defaults are kept.
    pub async fn load(&self) {
        let persisted = match self.read_persisted().await {
            Ok(persisted) => persisted,
            Err(e) => {
                self.record_error(ErrorKind::StateLoadFailed, e.to_string(), None)
                    .await;
                Persisted::default()
            }
        };

        let now = Local::now();
        let mut core = self.core.lock().await;
        core.enabled = persisted.enabled.unwrap_or(true);
        core.settings = persisted.settings.map(Settings::sanitized).unwrap_or_default();
        core.stats = persisted.stats.unwrap_or_else(|| Stats::fresh(now));

        if core.stats.roll_over(now) {
            info!("New day, daily stats reset");
            if let Err(e) = write_value(self.store.as_ref(), KEY_STATS, &core.stats).await {
                warn!("Failed to persist reset stats: {}", e);
            }
        }

        if core.enabled {
            let interval = core.settings.interval;
            core.scheduler.initialize(interval);
            core.phase = ReminderPhase::Armed;
        } else {
            core.scheduler.clear();
            core.phase = ReminderPhase::Disabled;
        }

        info!(
            "State loaded: enabled={}, interval={}min, breakDuration={}s",
            core.enabled, core.settings.interval, core.settings.break_duration
        );
    }

    async fn bump(&self, core: &mut ReminderCore, fields: &[StatField]) -> Result<()> {
        let now = Local::now();
        for field in fields {
            core.stats.increment(*field, now);
            debug!("{} = {}", field.as_str(), core.stats.get(*field));
        }
        write_value(self.store.as_ref(), KEY_STATS, &core.stats).await
    }

    /// Turn reminders on or off
    pub async fn toggle_enabled(&self, status: bool) -> Result<()> {
        info!("Setting enabled state to: {}", status);
        let mut core = self.core.lock().await;
        core.enabled = status;

        if status {
            let interval = core.settings.interval;
            core.scheduler.start(interval);
            if core.phase == ReminderPhase::Disabled {
                core.phase = ReminderPhase::Armed;
            }
        } else {
            core.scheduler.stop();
            core.phase = ReminderPhase::Disabled;
        }
        debug!("Reminder phase: {}", core.phase.as_str());

        write_value(self.store.as_ref(), KEY_IS_ENABLED, &status).await
    }

    /// Merge, validate and save settings, re-arm the alarm and tell every
    /// page about the new values.
    pub async fn update_settings(&self, patch: SettingsPatch) -> Result<Settings> {
        let mut core = self.core.lock().await;
        let settings = core.settings.merged(&patch);
        settings.validate()?;

        core.settings = settings;
        write_value(self.store.as_ref(), KEY_SETTINGS, &settings).await?;

        if core.enabled {
            core.scheduler.restart(settings.interval);
        }
        drop(core);

        info!(
            "Settings updated: interval={}min, breakDuration={}s",
            settings.interval, settings.break_duration
        );
        let reached = self
            .pages
            .broadcast(&PageSignal::SettingsUpdated { settings })?;
        debug!("Settings pushed to {} pages", reached);
        Ok(settings)
    }

    /// The alarm fired: count the reminder and show it on every active page.
    /// Returns the new session, or `None` for a stale or disabled firing.
    pub async fn on_alarm(&self, event: &AlarmEvent) -> Result<Option<u64>> {
        let mut core = self.core.lock().await;
        if !core.enabled || !core.scheduler.is_current(event) {
            debug!("Ignoring stale alarm firing (generation {})", event.generation);
            return Ok(None);
        }

        if let Some(session) = core.phase.session() {
            debug!("Session {} got no answer, starting a new one", session);
        }
        core.last_session += 1;
        let session = core.last_session;
        core.phase = ReminderPhase::Reminding { session };
        core.open_session = Some(session);
        info!("Reminder session {} started", session);

        let report = match self
            .pages
            .deliver_to_active(&PageSignal::ShowReminder { session: Some(session) })
        {
            Ok(report) => report,
            Err(e) => {
                warn!("Failed to deliver reminder: {}", e);
                DeliveryReport::default()
            }
        };
        if report.delivered == 0 {
            warn!("No active page received reminder session {}", session);
        }

        let mut fields = vec![StatField::TotalReminders];
        fields.extend((0..report.delivered).map(|_| StatField::MessageSuccess));
        fields.extend((0..report.failed).map(|_| StatField::MessageFailures));
        self.bump(&mut core, &fields).await?;

        Ok(Some(session))
    }

    /// A page reported the end of a break
    pub async fn finish_break(
        &self,
        outcome: BreakOutcome,
        session: Option<u64>,
    ) -> Result<OutcomeDisposition> {
        let mut core = self.core.lock().await;
        if let Some(session) = session {
            if core.open_session != Some(session) {
                debug!("Absorbing {:?} for stale session {}", outcome, session);
                return Ok(OutcomeDisposition::Absorbed);
            }
        }

        info!("Break {:?}", outcome);
        self.bump(&mut core, &[outcome.stat()]).await?;
        core.open_session = None;

        if core.enabled {
            let interval = core.settings.interval;
            core.scheduler.restart(interval);
            core.phase = ReminderPhase::Armed;
        }
        Ok(OutcomeDisposition::Recorded)
    }

    pub async fn complete_break(&self, session: Option<u64>) -> Result<OutcomeDisposition> {
        self.finish_break(BreakOutcome::Completed, session).await
    }

    pub async fn skip_break(&self, session: Option<u64>) -> Result<OutcomeDisposition> {
        self.finish_break(BreakOutcome::Skipped, session).await
    }

    /// Run one message through the dispatch table. Failures become a
    /// failure reply and count as a message failure.
    pub async fn dispatch(&self, message: Message) -> Reply {
        let action = message.action();
        self.set_last_action(action);

        let result = match message {
            Message::ToggleEnable { status } => self.toggle_enabled(status).await,
            Message::RestartTimer { session } => self.complete_break(session).await.map(|_| ()),
            Message::SkipTimer { session } => self.skip_break(session).await.map(|_| ()),
            Message::UpdateSettings { settings } => {
                self.update_settings(settings).await.map(|_| ())
            }
            Message::Log { log } => {
                info!(target: "page", "{}", log);
                Ok(())
            }
        };

        match result {
            Ok(()) => Reply::ok(),
            Err(e) => {
                warn!("Message {} failed: {}", action, e);
                self.count_message_failure().await;
                Reply::failure(e.to_string())
            }
        }
    }

    /// Count a message that could not be handled
    pub async fn count_message_failure(&self) {
        let mut core = self.core.lock().await;
        if let Err(e) = self.bump(&mut core, &[StatField::MessageFailures]).await {
            error!("Failed to count message failure: {}", e);
        }
    }

    /// Append to the bounded error log. Never fails; problems are logged.
    pub async fn record_error(&self, kind: ErrorKind, message: String, stack: Option<String>) {
        error!("[{}] {}", kind, message);
        self.store_error(ErrorRecord::new(kind, message, stack)).await;
    }

    /// Append an already built record to the bounded error log
    pub async fn store_error(&self, record: ErrorRecord) {
        let mut records = match self.errors().await {
            Ok(records) => records,
            Err(e) => {
                warn!("Error log unreadable, starting a new one: {}", e);
                Vec::new()
            }
        };
        push_bounded(&mut records, record);
        if let Err(e) = write_value(self.store.as_ref(), KEY_ERRORS, &records).await {
            error!("Failed to save error: {}", e);
        }
    }

    /// Recorded errors, oldest first
    pub async fn errors(&self) -> Result<Vec<ErrorRecord>> {
        let values = self.store.get(&[KEY_ERRORS]).await?;
        Ok(read_value(&values, KEY_ERRORS)?.unwrap_or_default())
    }

    /// Current state, with stats as they read today
    pub async fn snapshot(&self) -> ReminderSnapshot {
        let core = self.core.lock().await;
        let mut stats = core.stats;
        stats.roll_over(Local::now());

        ReminderSnapshot {
            is_enabled: core.enabled,
            phase: core.phase,
            settings: core.settings,
            stats,
            timer_armed: core.scheduler.is_armed(),
            timer_remaining_seconds: core.scheduler.remaining_seconds(),
        }
    }

    pub async fn settings(&self) -> Settings {
        self.core.lock().await.settings
    }

    fn set_last_action(&self, action: &str) {
        if let Ok(mut last) = self.last_action.lock() {
            *last = Some((action.to_string(), Utc::now()));
        }
    }

    /// Get last action information
    pub fn get_last_action(&self) -> (Option<String>, Option<DateTime<Utc>>) {
        match self.last_action.lock().ok().and_then(|a| a.clone()) {
            Some((action, time)) => (Some(action), Some(time)),
            None => (None, None),
        }
    }

    /// Calculate server uptime as a formatted string
    pub fn get_uptime(&self) -> String {
        let duration = self.start_time.elapsed();
        let hours = duration.as_secs() / 3600;
        let minutes = (duration.as_secs() % 3600) / 60;
        let seconds = duration.as_secs() % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}s", seconds)
        }
    }
}
