//! User-facing notices and the bus that fans them out.
//!
//! Every load/save failure, every successful save and every rejected edit is
//! turned into a [`Notice`] and published on a [`NoticeBus`]. What a host does
//! with them (toast, status bar, log file) is up to the listeners it registers.

use crate::validate::Rejection;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Info => "info",
            Severity::Success => "success",
            Severity::Warning => "warning",
            Severity::Error => "error",
        })
    }
}

/// One message for the user.
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub severity: Severity,
    /// Domain or component the notice is about, e.g. `"controls"`.
    pub source: String,
    pub message: String,
    /// Permitted combinations, set when an edit hit a whitelist.
    pub allowed: Option<Vec<Vec<String>>>,
}

impl Notice {
    pub fn new(severity: Severity, source: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity,
            source: source.into(),
            message: message.into(),
            allowed: None,
        }
    }

    pub fn info(source: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Info, source, message)
    }

    pub fn success(source: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Success, source, message)
    }

    pub fn warning(source: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, source, message)
    }

    pub fn error(source: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, source, message)
    }

    /// Warning for a refused edit, carrying the whitelist when there is one.
    pub fn rejected(source: impl Into<String>, rejection: &Rejection) -> Self {
        Self {
            severity: Severity::Warning,
            source: source.into(),
            message: rejection.describe(),
            allowed: rejection.allowed().map(<[Vec<String>]>::to_vec),
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity, self.source, self.message)
    }
}

/// Receives published notices.
pub trait NoticeListener: Send {
    fn on_notice(&mut self, notice: &Notice);
}

/// Which notices a listener wants to receive.
#[derive(Debug, Clone, Copy)]
pub enum NoticeFilter {
    All,
    /// Warnings and errors.
    ProblemsOnly,
    ErrorsOnly,
    Custom(fn(&Notice) -> bool),
}

impl NoticeFilter {
    fn accepts(&self, notice: &Notice) -> bool {
        match self {
            NoticeFilter::All => true,
            NoticeFilter::ProblemsOnly => notice.severity >= Severity::Warning,
            NoticeFilter::ErrorsOnly => notice.severity == Severity::Error,
            NoticeFilter::Custom(f) => f(notice),
        }
    }
}

struct ListenerEntry {
    listener: Box<dyn NoticeListener>,
    enabled: bool,
    filter: NoticeFilter,
    source: Option<String>, // only notices from this source
}

/// Registry of listeners. Listeners run in registration order.
#[derive(Default)]
pub struct NoticeBus {
    next_id: u64,
    listeners: BTreeMap<u64, ListenerEntry>,
}

impl NoticeBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener with a filter and optional source tag. Returns its id.
    pub fn add_listener(
        &mut self,
        listener: impl NoticeListener + 'static,
        filter: NoticeFilter,
        source: Option<String>,
    ) -> u64 {
        let id = self.next_id;
        self.listeners.insert(
            id,
            ListenerEntry {
                listener: Box::new(listener),
                enabled: true,
                filter,
                source,
            },
        );
        self.next_id += 1;
        id
    }

    pub fn enable(&mut self, id: u64) {
        if let Some(entry) = self.listeners.get_mut(&id) {
            entry.enabled = true;
        }
    }

    /// Mutes a listener without removing it.
    pub fn disable(&mut self, id: u64) {
        if let Some(entry) = self.listeners.get_mut(&id) {
            entry.enabled = false;
        }
    }

    pub fn remove_listener(&mut self, id: u64) -> bool {
        self.listeners.remove(&id).is_some()
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Delivers `notice` to every enabled, matching listener.
    pub fn publish(&mut self, notice: &Notice) {
        for entry in self.listeners.values_mut() {
            if !entry.enabled {
                continue;
            }
            if let Some(ref wanted) = entry.source {
                if notice.source != *wanted {
                    continue;
                }
            }
            if entry.filter.accepts(notice) {
                entry.listener.on_notice(notice);
            }
        }
    }

    pub fn publish_all(&mut self, notices: &[Notice]) {
        for notice in notices {
            self.publish(notice);
        }
    }
}

/// Collects notices into a shared queue a UI thread can drain.
#[derive(Debug, Clone, Default)]
pub struct NoticeQueue {
    inner: Arc<Mutex<Vec<Notice>>>,
}

impl NoticeQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes every queued notice, oldest first.
    pub fn drain(&self) -> Vec<Notice> {
        std::mem::take(&mut *self.inner.lock().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl NoticeListener for NoticeQueue {
    fn on_notice(&mut self, notice: &Notice) {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notice.clone());
    }
}
