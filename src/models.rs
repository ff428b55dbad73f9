use chrono::{DateTime, Utc};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Health {
    Healthy,
    Degrading,
    AlertPending,
    Alerted,
}

#[derive(Debug, Clone)]
pub struct CheckResult {
    pub timestamp: DateTime<Utc>,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CheckResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Failure tracking for the monitored check. Lives only as long as the process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorState {
    pub fail_count: u32,
    pub alert_sent: bool,
    pub current_interval: Duration,
}

impl MonitorState {
    pub fn new(check_interval: Duration) -> Self {
        Self {
            fail_count: 0,
            alert_sent: false,
            current_interval: check_interval,
        }
    }

    pub fn reset(&mut self, check_interval: Duration) {
        *self = Self::new(check_interval);
    }

    pub fn health(&self, failure_threshold: u32) -> Health {
        match (self.fail_count, self.alert_sent) {
            (0, _) => Health::Healthy,
            (n, false) if n < failure_threshold => Health::Degrading,
            (_, false) => Health::AlertPending,
            (_, true) => Health::Alerted,
        }
    }
}
