//! Execution submission and bounded status polling.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use fusion_client::{ExecutionResult, ExecutionsApi, SharedClock, SystemClock};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::Result;

/// Default wall-clock budget for polling.
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(120);

/// Default pause between status checks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Submitted,
    Running,
    Completed,
    Failed,
    Error,
    TimedOut,
}

impl ExecutionStatus {
    /// Map a status string reported by the service.
    pub fn from_remote(status: &str) -> Self {
        match status.to_ascii_lowercase().as_str() {
            "completed" => Self::Completed,
            "failed" => Self::Failed,
            "error" => Self::Error,
            _ => Self::Running,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Failed | Self::Error | Self::TimedOut
        )
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Submitted => "submitted",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Error => "error",
            Self::TimedOut => "timed_out",
        })
    }
}

/// A submitted execution.
#[derive(Debug, Clone)]
pub struct ExecutionHandle {
    pub execution_id: String,
    pub definition_id: String,
    /// Start of the polling deadline.
    pub submitted_at: Instant,
    pub status: ExecutionStatus,
}

/// Polling deadline and cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub timeout: Duration,
    pub interval: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_POLL_TIMEOUT,
            interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// How polling ended.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// The service reported a terminal status.
    Terminal(ExecutionResult),
    /// The deadline passed first. The execution may still be running.
    TimedOut { checks: usize, elapsed: Duration },
}

/// Called after every non-terminal check with the last status and elapsed time.
pub type StatusObserver = Arc<dyn Fn(&str, Duration) + Send + Sync>;

/// Submits executions and polls them to completion.
#[derive(Clone)]
pub struct ExecutionPoller {
    executions: ExecutionsApi,
    clock: SharedClock,
    observer: Option<StatusObserver>,
}

impl fmt::Debug for ExecutionPoller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionPoller")
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

impl ExecutionPoller {
    pub fn new(executions: ExecutionsApi) -> Self {
        Self {
            executions,
            clock: SystemClock::shared(),
            observer: None,
        }
    }

    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_observer(mut self, observer: StatusObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Start an execution.
    pub fn submit(
        &self,
        definition_id: &str,
        params: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<ExecutionHandle> {
        let execution_id = self.executions.execute(definition_id, params)?;
        info!(definition_id, execution_id = %execution_id, "Execution submitted");
        Ok(ExecutionHandle {
            execution_id,
            definition_id: definition_id.to_string(),
            submitted_at: self.clock.now(),
            status: ExecutionStatus::Submitted,
        })
    }

    /// Poll until a terminal status or the deadline, measured from submission.
    ///
    /// Failed checks are logged and count as "not finished yet".
    pub fn poll(&self, handle: &mut ExecutionHandle, settings: PollSettings) -> PollOutcome {
        let mut checks = 0;

        while self.elapsed(handle) < settings.timeout {
            checks += 1;
            match self.executions.results(&handle.execution_id) {
                Ok(Some(result)) => {
                    let status = ExecutionStatus::from_remote(&result.status);
                    if status.is_terminal() {
                        info!(execution_id = %handle.execution_id, status = %status, "Execution finished");
                        handle.status = status;
                        return PollOutcome::Terminal(result);
                    }
                    handle.status = ExecutionStatus::Running;
                    debug!(execution_id = %handle.execution_id, status = %result.status, "Execution still running");
                    if let Some(observer) = &self.observer {
                        observer(&result.status, self.elapsed(handle));
                    }
                }
                Ok(None) => {
                    debug!(execution_id = %handle.execution_id, "No result yet");
                }
                Err(e) => {
                    warn!(execution_id = %handle.execution_id, error = %e, "Poll failed, will retry");
                }
            }
            self.clock.sleep(settings.interval);
        }

        let elapsed = self.elapsed(handle);
        warn!(
            execution_id = %handle.execution_id,
            checks,
            elapsed_secs = elapsed.as_secs(),
            "Timed out waiting for execution, it may still be running"
        );
        handle.status = ExecutionStatus::TimedOut;
        PollOutcome::TimedOut { checks, elapsed }
    }

    fn elapsed(&self, handle: &ExecutionHandle) -> Duration {
        self.clock.now().saturating_duration_since(handle.submitted_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::executions;
    use fusion_client::{Envelope, InMemoryGateway, ManualClock, RemoteFailure, endpoints};
    use parking_lot::Mutex;
    use serde_json::json;

    fn poller(gateway: &Arc<InMemoryGateway>, clock: &Arc<ManualClock>) -> ExecutionPoller {
        gateway.on("POST", endpoints::EXECUTE, |_| {
            Ok(Envelope::page(vec![json!({"id": "exec-1"})], 1))
        });
        ExecutionPoller::new(executions(gateway)).with_clock(clock.clone())
    }

    fn status_sequence(gateway: &InMemoryGateway, statuses: Vec<&'static str>) {
        let remaining = Arc::new(Mutex::new(statuses.into_iter()));
        gateway.on("GET", endpoints::EXECUTION_RESULTS, move |_| {
            let status = remaining.lock().next().unwrap_or("running");
            Ok(Envelope::page(
                vec![json!({"execution_id": "exec-1", "status": status, "output": {"ok": true}})],
                1,
            ))
        });
    }

    #[test]
    fn test_timeout_scenario_two_checks() {
        let gateway = Arc::new(InMemoryGateway::new());
        status_sequence(&gateway, vec![]);
        let clock = Arc::new(ManualClock::new());
        let poller = poller(&gateway, &clock);

        let mut handle = poller.submit("def-1", &serde_json::Map::new()).unwrap();
        let outcome = poller.poll(
            &mut handle,
            PollSettings {
                timeout: Duration::from_secs(10),
                interval: Duration::from_secs(5),
            },
        );

        assert!(matches!(outcome, PollOutcome::TimedOut { checks: 2, .. }));
        assert_eq!(gateway.count(endpoints::EXECUTION_RESULTS), 2);
        assert_eq!(handle.status, ExecutionStatus::TimedOut);
    }

    #[test]
    fn test_terminal_status_ends_polling() {
        let gateway = Arc::new(InMemoryGateway::new());
        status_sequence(&gateway, vec!["running", "in_progress", "completed"]);
        let clock = Arc::new(ManualClock::new());
        let poller = poller(&gateway, &clock);

        let mut handle = poller.submit("def-1", &serde_json::Map::new()).unwrap();
        let outcome = poller.poll(&mut handle, PollSettings::default());

        match outcome {
            PollOutcome::Terminal(result) => {
                assert_eq!(result.status, "completed");
                assert_eq!(result.output, Some(json!({"ok": true})));
            }
            other => panic!("expected terminal outcome, got {:?}", other),
        }
        assert_eq!(handle.status, ExecutionStatus::Completed);
        assert_eq!(clock.sleeps().len(), 2);
    }

    #[test]
    fn test_failed_is_terminal() {
        let gateway = Arc::new(InMemoryGateway::new());
        status_sequence(&gateway, vec!["failed"]);
        let clock = Arc::new(ManualClock::new());
        let poller = poller(&gateway, &clock);

        let mut handle = poller.submit("def-1", &serde_json::Map::new()).unwrap();
        poller.poll(&mut handle, PollSettings::default());
        assert_eq!(handle.status, ExecutionStatus::Failed);
    }

    #[test]
    fn test_poll_errors_do_not_abort() {
        let gateway = Arc::new(InMemoryGateway::new());
        let calls = Arc::new(Mutex::new(0));
        gateway.on("GET", endpoints::EXECUTION_RESULTS, move |_| {
            let mut n = calls.lock();
            *n += 1;
            if *n < 3 {
                return Err(RemoteFailure::transient("connection reset"));
            }
            Ok(Envelope::page(vec![json!({"status": "error"})], 1))
        });
        let clock = Arc::new(ManualClock::new());
        let poller = poller(&gateway, &clock);

        let mut handle = poller.submit("def-1", &serde_json::Map::new()).unwrap();
        let outcome = poller.poll(&mut handle, PollSettings::default());
        assert!(matches!(outcome, PollOutcome::Terminal(_)));
        assert_eq!(handle.status, ExecutionStatus::Error);
    }

    #[test]
    fn test_deadline_counts_from_submission() {
        let gateway = Arc::new(InMemoryGateway::new());
        status_sequence(&gateway, vec![]);
        let clock = Arc::new(ManualClock::new());
        let poller = poller(&gateway, &clock);

        let mut handle = poller.submit("def-1", &serde_json::Map::new()).unwrap();
        clock.advance(Duration::from_secs(8));
        let outcome = poller.poll(
            &mut handle,
            PollSettings {
                timeout: Duration::from_secs(10),
                interval: Duration::from_secs(5),
            },
        );
        assert!(matches!(outcome, PollOutcome::TimedOut { checks: 1, .. }));
    }

    #[test]
    fn test_submit_failure_propagates() {
        let gateway = Arc::new(InMemoryGateway::new());
        gateway.on("POST", endpoints::EXECUTE, |_| {
            Ok(Envelope::with_errors(["definition is disabled"]))
        });
        let poller = ExecutionPoller::new(executions(&gateway));

        let err = poller.submit("def-1", &serde_json::Map::new()).unwrap_err();
        assert_eq!(err.to_string(), "definition is disabled");
    }

    #[test]
    fn test_remote_status_mapping() {
        assert_eq!(ExecutionStatus::from_remote("Completed"), ExecutionStatus::Completed);
        assert_eq!(ExecutionStatus::from_remote("queued"), ExecutionStatus::Running);
        assert!(!ExecutionStatus::Running.is_terminal());
        assert!(ExecutionStatus::TimedOut.is_terminal());
    }
}
