use crate::notify::{Notice, NoticeListener, Severity};
use tracing::{error, info, warn};

/// Forwards every notice to `tracing`, at a level matching its severity.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogListener;

impl LogListener {
    pub fn new() -> Self {
        LogListener
    }
}

impl NoticeListener for LogListener {
    fn on_notice(&mut self, notice: &Notice) {
        match notice.severity {
            Severity::Info | Severity::Success => {
                info!(source = %notice.source, "{}", notice.message)
            }
            Severity::Warning => warn!(source = %notice.source, "{}", notice.message),
            Severity::Error => error!(source = %notice.source, "{}", notice.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logs_without_subscriber() {
        let mut log = LogListener::new();
        log.on_notice(&Notice::error("radio", "Request timed out after 5000 ms"));
        log.on_notice(&Notice::success("radio", "Saved"));
    }
}
