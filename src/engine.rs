use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::alert::Alerter;
use crate::config::CheckConfig;
use crate::models::MonitorState;
use crate::probe::{build_command_args, CheckRunner};

/// Drives the check/decide/sleep cycle for a single NRPE check.
///
/// At most one problem alert goes out per outage. A failed send leaves the
/// outage un-alerted so the next failing check tries again. Recovery resets
/// tracking before the recovery alert is attempted, so a lost recovery mail
/// never holds the monitor in the alerted state.
pub struct Monitor<R, A> {
    config: CheckConfig,
    runner: R,
    alerter: A,
    state: MonitorState,
}

impl<R: CheckRunner, A: Alerter> Monitor<R, A> {
    pub fn new(config: CheckConfig, runner: R, alerter: A) -> Self {
        let state = MonitorState::new(config.check_interval());
        Self {
            config,
            runner,
            alerter,
            state,
        }
    }

    pub fn state(&self) -> &MonitorState {
        &self.state
    }

    /// Runs checks until `shutdown` resolves. Shutdown cancels an in-flight
    /// check or sleep and sends no alert.
    pub async fn run<F>(&mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        info!(
            host = %self.config.host(),
            check = %self.config.command(),
            check_interval = ?self.config.check_interval(),
            retry_interval = ?self.config.retry_interval(),
            failure_threshold = self.config.monitor.failure_threshold,
            "Starting monitor"
        );
        tokio::pin!(shutdown);

        loop {
            let success = tokio::select! {
                success = self.execute_check() => success,
                _ = &mut shutdown => break,
            };
            let interval = self.configure_next_action(success);
            debug!(?interval, "sleeping until next check");

            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = &mut shutdown => break,
            }
        }

        warn!("Process interrupted");
    }

    /// Runs the probe once and feeds the outcome through the state machine.
    pub async fn execute_check(&mut self) -> bool {
        let binary = &self.config.monitor.nrpe_binary;
        let args = build_command_args(&self.config.nrpe);
        debug!(binary = %binary.display(), args = %args.join(" "), "running check command");

        let result = self.runner.run(binary, &args).await;
        if result.success() {
            debug!(check = %self.config.command(), host = %self.config.host(), "check succeeded");
            if self.state.alert_sent {
                self.handle_recovery().await;
            } else if self.state.fail_count > 0 {
                info!(
                    fail_count = self.state.fail_count,
                    "check passed before reaching failure threshold"
                );
                self.reset_on_check_ok();
            }
            return true;
        }

        warn!(
            check = %self.config.command(),
            host = %self.config.host(),
            exit_code = result.exit_code,
            checked_at = %result.timestamp,
            stdout = %result.stdout.trim(),
            stderr = %result.stderr.trim(),
            "check failed"
        );
        self.handle_failure().await;
        false
    }

    async fn handle_failure(&mut self) {
        self.state.fail_count += 1;
        let threshold = self.config.monitor.failure_threshold;
        debug!(fail_count = self.state.fail_count, failure_threshold = threshold, "failure recorded");

        if self.state.fail_count < threshold {
            return;
        }

        warn!(
            check = %self.config.command(),
            host = %self.config.host(),
            "check over failure threshold"
        );
        if self.state.alert_sent {
            debug!("alert already sent for this outage, skipping");
            return;
        }

        let recipients = &self.config.monitor.alert_emails;
        warn!(recipients = %recipients.join(", "), "sending problem alert");
        if self
            .alerter
            .send_problem(recipients, self.config.host(), self.config.command())
            .await
        {
            self.state.alert_sent = true;
        }
        debug!(health = ?self.state.health(threshold), "state after failure");
    }

    async fn handle_recovery(&mut self) {
        info!(check = %self.config.command(), host = %self.config.host(), "service recovered");
        self.reset_on_check_ok();

        if self.config.monitor.alert_on_recovery {
            let recipients = &self.config.monitor.alert_emails;
            info!(recipients = %recipients.join(", "), "sending recovery alert");
            self.alerter
                .send_recovery(recipients, self.config.host(), self.config.command())
                .await;
        }
    }

    fn reset_on_check_ok(&mut self) {
        info!("Resetting failure tracking");
        self.state.reset(self.config.check_interval());
    }

    /// Picks the next sleep: normal cadence after a success, retry cadence
    /// after any failure.
    pub fn configure_next_action(&mut self, success: bool) -> Duration {
        self.state.current_interval = if success {
            self.config.check_interval()
        } else {
            self.config.retry_interval()
        };
        self.state.current_interval
    }
}
