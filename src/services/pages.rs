//! Registry of connected page contexts and signal delivery

use std::{
    collections::BTreeMap,
    sync::Mutex,
};

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::{
    error::{Error, Result},
    messages::PageSignal,
};

pub type PageId = u64;

/// Where a page lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PageKind {
    /// Remote page over the WebSocket endpoint
    Socket,
    /// In-process terminal notifier
    Console,
}

#[derive(Debug)]
struct PageEntry {
    kind: PageKind,
    active: bool,
    tx: mpsc::UnboundedSender<PageSignal>,
}

/// Receiving half handed to a newly registered page
#[derive(Debug)]
pub struct PageConnection {
    pub id: PageId,
    pub signals: mpsc::UnboundedReceiver<PageSignal>,
}

/// Result of pushing a signal to every active page
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub delivered: u64,
    pub failed: u64,
}

/// Public view of a registered page
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub id: PageId,
    pub kind: PageKind,
    pub active: bool,
    pub listening: bool,
}

#[derive(Debug, Default)]
struct Registry {
    next_id: PageId,
    pages: BTreeMap<PageId, PageEntry>,
}

/// Tracks every page that can receive signals
#[derive(Debug, Default)]
pub struct PageRegistry {
    inner: Mutex<Registry>,
}

impl PageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a page. New pages start active.
    pub fn register(&self, kind: PageKind) -> Result<PageConnection> {
        let (tx, signals) = mpsc::unbounded_channel();
        let mut registry = self.inner.lock().map_err(|_| Error::Lock("page registry"))?;
        registry.next_id += 1;
        let id = registry.next_id;
        registry.pages.insert(id, PageEntry { kind, active: true, tx });
        info!("Page {} registered ({:?})", id, kind);
        Ok(PageConnection { id, signals })
    }

    /// Forget a page; its pending signals are dropped.
    pub fn unregister(&self, id: PageId) -> Result<()> {
        let mut registry = self.inner.lock().map_err(|_| Error::Lock("page registry"))?;
        if registry.pages.remove(&id).is_some() {
            info!("Page {} unregistered", id);
        }
        Ok(())
    }

    /// Mark a page as the one the user is looking at (or not)
    pub fn set_active(&self, id: PageId, active: bool) -> Result<bool> {
        let mut registry = self.inner.lock().map_err(|_| Error::Lock("page registry"))?;
        match registry.pages.get_mut(&id) {
            Some(entry) => {
                entry.active = active;
                debug!("Page {} active={}", id, active);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Send `signal` to each active page in turn. A page whose receiver is
    /// gone counts as a failure and delivery continues with the next one.
    pub fn deliver_to_active(&self, signal: &PageSignal) -> Result<DeliveryReport> {
        let registry = self.inner.lock().map_err(|_| Error::Lock("page registry"))?;
        let mut report = DeliveryReport::default();
        for (id, entry) in registry.pages.iter().filter(|(_, e)| e.active) {
            match entry.tx.send(signal.clone()) {
                Ok(()) => report.delivered += 1,
                Err(_) => {
                    warn!("Page {} has no listener, signal dropped", id);
                    report.failed += 1;
                }
            }
        }
        Ok(report)
    }

    /// Send `signal` to every page regardless of activity. Returns how many
    /// pages accepted it.
    pub fn broadcast(&self, signal: &PageSignal) -> Result<usize> {
        let registry = self.inner.lock().map_err(|_| Error::Lock("page registry"))?;
        Ok(registry
            .pages
            .values()
            .filter(|entry| entry.tx.send(signal.clone()).is_ok())
            .count())
    }

    pub fn list(&self) -> Vec<PageInfo> {
        self.inner
            .lock()
            .map(|registry| {
                registry
                    .pages
                    .iter()
                    .map(|(id, entry)| PageInfo {
                        id: *id,
                        kind: entry.kind,
                        active: entry.active,
                        listening: !entry.tx.is_closed(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn show() -> PageSignal {
        PageSignal::ShowReminder { session: Some(1) }
    }

    #[test]
    fn delivers_only_to_active_pages() {
        let registry = PageRegistry::new();
        let mut first = registry.register(PageKind::Socket).unwrap();
        let mut second = registry.register(PageKind::Socket).unwrap();
        registry.set_active(second.id, false).unwrap();

        let report = registry.deliver_to_active(&show()).unwrap();

        assert_eq!(report, DeliveryReport { delivered: 1, failed: 0 });
        assert_eq!(first.signals.try_recv().unwrap(), show());
        assert!(second.signals.try_recv().is_err());
    }

    #[test]
    fn closed_page_counts_as_failure_and_delivery_continues() {
        let registry = PageRegistry::new();
        let closed = registry.register(PageKind::Socket).unwrap();
        let mut open = registry.register(PageKind::Console).unwrap();
        drop(closed.signals);

        let report = registry.deliver_to_active(&show()).unwrap();

        assert_eq!(report, DeliveryReport { delivered: 1, failed: 1 });
        assert_eq!(open.signals.try_recv().unwrap(), show());
    }

    #[test]
    fn broadcast_reaches_inactive_pages() {
        let registry = PageRegistry::new();
        let mut page = registry.register(PageKind::Socket).unwrap();
        registry.set_active(page.id, false).unwrap();

        let signal = PageSignal::SettingsUpdated {
            settings: Default::default(),
        };
        assert_eq!(registry.broadcast(&signal).unwrap(), 1);
        assert_eq!(page.signals.try_recv().unwrap(), signal);
    }

    #[test]
    fn unregistered_page_is_gone() {
        let registry = PageRegistry::new();
        let page = registry.register(PageKind::Socket).unwrap();
        registry.unregister(page.id).unwrap();

        assert!(registry.list().is_empty());
        assert!(!registry.set_active(page.id, true).unwrap());
        assert_eq!(registry.deliver_to_active(&show()).unwrap(), DeliveryReport::default());
    }
}
