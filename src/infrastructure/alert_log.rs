// Alert log - User-facing error notifications
use crate::application::collaborators::Notifier;
use crate::domain::error::DashboardError;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::VecDeque;

const MAX_ALERT_HISTORY: usize = 100;

#[derive(Debug, Clone, Serialize)]
pub struct Alert {
    pub at: DateTime<Utc>,
    pub title: &'static str,
    pub kind: &'static str,
    pub message: String,
}

/// Logs every notification and keeps the most recent ones for display
#[derive(Default)]
pub struct AlertLog {
    alerts: Mutex<VecDeque<Alert>>,
}

impl AlertLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Newest last
    pub fn recent(&self) -> Vec<Alert> {
        self.alerts.lock().iter().cloned().collect()
    }
}

impl Notifier for AlertLog {
    fn notify(&self, error: &DashboardError) {
        tracing::error!("{}: {}", error.title(), error);

        let mut alerts = self.alerts.lock();
        if alerts.len() == MAX_ALERT_HISTORY {
            alerts.pop_front();
        }
        alerts.push_back(Alert {
            at: Utc::now(),
            title: error.title(),
            kind: error.kind(),
            message: error.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keeps_bounded_history() {
        let log = AlertLog::new();
        for i in 0..(MAX_ALERT_HISTORY + 5) {
            log.notify(&DashboardError::MissingFilter(format!("f{}", i)));
        }

        let recent = log.recent();
        assert_eq!(recent.len(), MAX_ALERT_HISTORY);
        assert_eq!(recent[0].message, "filter 'f5' is required");
        assert_eq!(recent[0].kind, "missing_filter");
    }
}
