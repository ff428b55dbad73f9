use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use thiserror::Error;
use tokio::process::Command;
use tracing::warn;

use crate::config::ProbeArgs;
use crate::models::CheckResult;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("failed to run {}: {source}", .binary.display())]
    Spawn {
        binary: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Runs the remote check. Never fails: problems running the binary come back
/// as a failing result.
#[async_trait]
pub trait CheckRunner: Send + Sync {
    async fn run(&self, binary: &Path, args: &[String]) -> CheckResult;
}

/// Runs the probe as a local subprocess and waits for it to exit.
#[derive(Debug, Default, Clone, Copy)]
pub struct NrpeRunner;

impl NrpeRunner {
    async fn spawn(binary: &Path, args: &[String]) -> Result<CheckResult, ProbeError> {
        let output = Command::new(binary)
            .args(args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| ProbeError::Spawn {
                binary: binary.to_path_buf(),
                source,
            })?;

        Ok(CheckResult {
            timestamp: Utc::now(),
            // None means the child was killed by a signal.
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

#[async_trait]
impl CheckRunner for NrpeRunner {
    async fn run(&self, binary: &Path, args: &[String]) -> CheckResult {
        match Self::spawn(binary, args).await {
            Ok(result) => result,
            Err(e) => {
                warn!(error = %e, "probe execution error");
                CheckResult {
                    timestamp: Utc::now(),
                    exit_code: 1,
                    stdout: String::new(),
                    stderr: e.to_string(),
                }
            }
        }
    }
}

/// Flattens the probe section into command-line arguments.
///
/// `true` becomes a bare `--key`, `false` and `null` drop the flag, anything
/// else becomes `--key value`.
pub fn build_command_args(args: &ProbeArgs) -> Vec<String> {
    let mut out = Vec::with_capacity(args.len() * 2);
    for (key, value) in args {
        match value {
            Value::Bool(false) | Value::Null => continue,
            Value::Bool(true) => out.push(format!("--{key}")),
            Value::String(s) => {
                out.push(format!("--{key}"));
                out.push(s.clone());
            }
            other => {
                out.push(format!("--{key}"));
                out.push(other.to_string());
            }
        }
    }
    out
}
