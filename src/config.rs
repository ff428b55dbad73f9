use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_CONFIG_FILE: &str = "config.json";

/// Flag/value pairs forwarded to the probe binary, in file order.
pub type ProbeArgs = Map<String, Value>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not load config file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CheckConfig {
    pub monitor: MonitorSettings,
    pub nrpe: ProbeArgs,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct MonitorSettings {
    #[serde(default = "default_nrpe_binary")]
    pub nrpe_binary: PathBuf,
    /// Minutes between checks while healthy.
    #[serde(default = "default_check_interval")]
    pub check_interval: u64,
    /// Minutes between checks after a failure.
    #[serde(default = "default_retry_interval")]
    pub retry_interval: u64,
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
    #[serde(default = "default_alert_on_recovery")]
    pub alert_on_recovery: bool,
    pub email_from: String,
    #[serde(default)]
    pub alert_emails: Vec<String>,
    #[serde(default = "default_smtp_host")]
    pub smtp_host: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
}

fn default_nrpe_binary() -> PathBuf { PathBuf::from("/usr/lib/nagios/plugins/check_nrpe") }
fn default_check_interval() -> u64 { 5 }
fn default_retry_interval() -> u64 { 1 }
fn default_failure_threshold() -> u32 { 5 }
fn default_alert_on_recovery() -> bool { true }
fn default_smtp_host() -> String { "localhost".into() }
fn default_smtp_port() -> u16 { 25 }

impl CheckConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: CheckConfig =
            serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for key in ["host", "command"] {
            match self.nrpe.get(key).and_then(Value::as_str) {
                Some(v) if !v.trim().is_empty() => {}
                _ => {
                    return Err(ConfigError::Invalid(format!(
                        "nrpe.{key} must be a non-empty string"
                    )))
                }
            }
        }
        if let Some((key, _)) = self
            .nrpe
            .iter()
            .find(|(_, v)| matches!(v, Value::Array(_) | Value::Object(_)))
        {
            return Err(ConfigError::Invalid(format!(
                "nrpe.{key} must be a string, number or boolean"
            )));
        }
        if self.monitor.failure_threshold == 0 {
            return Err(ConfigError::Invalid("failure-threshold must be at least 1".into()));
        }
        if self.monitor.check_interval == 0 || self.monitor.retry_interval == 0 {
            return Err(ConfigError::Invalid(
                "check-interval and retry-interval must be at least 1 minute".into(),
            ));
        }
        for (key, minutes) in [
            ("check-interval", self.monitor.check_interval),
            ("retry-interval", self.monitor.retry_interval),
        ] {
            if minutes.checked_mul(60).is_none() {
                return Err(ConfigError::Invalid(format!("{key} of {minutes} minutes is too large")));
            }
        }
        if self.monitor.email_from.trim().is_empty() {
            return Err(ConfigError::Invalid("email-from must not be empty".into()));
        }
        Ok(())
    }

    pub fn host(&self) -> &str {
        self.nrpe.get("host").and_then(Value::as_str).unwrap_or_default()
    }

    pub fn command(&self) -> &str {
        self.nrpe.get("command").and_then(Value::as_str).unwrap_or_default()
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.monitor.check_interval.saturating_mul(60))
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_secs(self.monitor.retry_interval.saturating_mul(60))
    }
}
