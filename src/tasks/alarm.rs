//! Single named recurring alarm

use std::time::Duration;

use tokio::{
    sync::broadcast,
    task::JoinHandle,
    time::{interval_at, Instant, MissedTickBehavior},
};
use tracing::{debug, info, warn};

/// Reserved name of the reminder alarm
pub const ALARM_NAME: &str = "eyeProtector";

/// Published every time the alarm fires
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlarmEvent {
    pub name: &'static str,
    /// Arming this firing belongs to; fires from a cleared arming are stale
    pub generation: u64,
}

#[derive(Debug)]
struct ArmedAlarm {
    generation: u64,
    period: Duration,
    armed_at: Instant,
    handle: JoinHandle<()>,
}

/// Owns the reminder alarm. At most one arming is alive at a time.
#[derive(Debug)]
pub struct Scheduler {
    alarm_tx: broadcast::Sender<AlarmEvent>,
    armed: Option<ArmedAlarm>,
    generation: u64,
}

impl Scheduler {
    pub fn new(alarm_tx: broadcast::Sender<AlarmEvent>) -> Self {
        Self {
            alarm_tx,
            armed: None,
            generation: 0,
        }
    }

    /// Arm the alarm to fire every `interval_minutes`. Refuses (and logs)
    /// when already armed; call [`Scheduler::clear`] first.
    pub fn start(&mut self, interval_minutes: u32) -> bool {
        if self.is_armed() {
            warn!("Alarm {} is already armed, clear it before starting", ALARM_NAME);
            return false;
        }

        let period = Duration::from_secs(u64::from(interval_minutes.max(1)) * 60);
        self.generation += 1;
        let generation = self.generation;
        let tx = self.alarm_tx.clone();
        let armed_at = Instant::now();

        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(armed_at + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                debug!("Alarm {} fired (generation {})", ALARM_NAME, generation);
                if tx.send(AlarmEvent { name: ALARM_NAME, generation }).is_err() {
                    warn!("Alarm {} fired with nobody listening", ALARM_NAME);
                }
            }
        });

        info!("Alarm {} armed every {} min", ALARM_NAME, interval_minutes.max(1));
        self.armed = Some(ArmedAlarm {
            generation,
            period,
            armed_at,
            handle,
        });
        true
    }

    /// Disarm the alarm. Returns whether one was armed.
    pub fn clear(&mut self) -> bool {
        match self.armed.take() {
            Some(alarm) => {
                alarm.handle.abort();
                debug!("Alarm {} cleared (generation {})", ALARM_NAME, alarm.generation);
                true
            }
            None => false,
        }
    }

    pub fn stop(&mut self) -> bool {
        self.clear()
    }

    /// Clear then start, after a settings change or a finished break
    pub fn restart(&mut self, interval_minutes: u32) -> bool {
        self.clear();
        self.start(interval_minutes)
    }

    /// Clear then start, at process startup
    pub fn initialize(&mut self, interval_minutes: u32) -> bool {
        self.restart(interval_minutes)
    }

    pub fn is_armed(&self) -> bool {
        self.armed.as_ref().is_some_and(|a| !a.handle.is_finished())
    }

    /// Whether `event` came from the live arming
    pub fn is_current(&self, event: &AlarmEvent) -> bool {
        event.name == ALARM_NAME
            && self
                .armed
                .as_ref()
                .is_some_and(|a| a.generation == event.generation)
    }

    /// The event the live arming publishes when it fires
    pub fn armed_event(&self) -> Option<AlarmEvent> {
        self.armed.as_ref().map(|a| AlarmEvent {
            name: ALARM_NAME,
            generation: a.generation,
        })
    }

    /// Seconds until the next firing
    pub fn remaining_seconds(&self) -> Option<u64> {
        let alarm = self.armed.as_ref()?;
        let period = alarm.period.as_secs().max(1);
        let elapsed = alarm.armed_at.elapsed().as_secs();
        Some(period - elapsed % period)
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scheduler() -> (Scheduler, broadcast::Receiver<AlarmEvent>) {
        let (tx, rx) = broadcast::channel(16);
        (Scheduler::new(tx), rx)
    }

    #[tokio::test(start_paused = true)]
    async fn start_then_clear_leaves_nothing_pending() {
        for interval in [1, 20, 180] {
            let (mut scheduler, mut rx) = scheduler();
            assert!(scheduler.start(interval));
            assert!(scheduler.clear());
            assert!(!scheduler.is_armed());

            tokio::time::sleep(Duration::from_secs(u64::from(interval) * 60 * 3)).await;
            assert!(rx.try_recv().is_err(), "interval {interval} still fired");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn second_start_is_refused() {
        let (mut scheduler, _rx) = scheduler();
        assert!(scheduler.start(20));
        assert!(!scheduler.start(5));
        assert!(scheduler.is_armed());
        assert_eq!(scheduler.remaining_seconds(), Some(20 * 60));
    }

    #[tokio::test(start_paused = true)]
    async fn fires_every_interval() {
        let (mut scheduler, mut rx) = scheduler();
        let started = Instant::now();
        scheduler.start(20);

        let first = rx.recv().await.unwrap();
        assert!(scheduler.is_current(&first));
        assert_eq!(started.elapsed(), Duration::from_secs(20 * 60));

        rx.recv().await.unwrap();
        assert_eq!(started.elapsed(), Duration::from_secs(40 * 60));
    }

    #[tokio::test(start_paused = true)]
    async fn restart_makes_old_generation_stale() {
        let (mut scheduler, _rx) = scheduler();
        scheduler.start(20);
        let stale = AlarmEvent { name: ALARM_NAME, generation: 1 };
        assert!(scheduler.is_current(&stale));

        assert!(scheduler.restart(20));
        assert!(!scheduler.is_current(&stale));
    }

    #[tokio::test]
    async fn clear_is_idempotent() {
        let (mut scheduler, _rx) = scheduler();
        assert!(!scheduler.clear());
        assert!(!scheduler.stop());
        assert!(!scheduler.is_armed());
    }
}
