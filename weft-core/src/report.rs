//! Lifecycle states and run reports.

use crate::error::FlowError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a component during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ComponentState {
    /// Created but not yet activated by the scheduler.
    NotInitialized,
    /// Body is running.
    Active,
    /// Blocked in a send on a full connection.
    SuspendedSend,
    /// Blocked in a receive on an empty connection.
    SuspendedReceive,
    /// Body returned; ports closed.
    Terminated,
    /// Body failed; failure recorded.
    Errored,
}

impl ComponentState {
    /// Whether the component has finished (normally or with an error).
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Terminated | Self::Errored)
    }

    /// Get the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotInitialized => "not-initialized",
            Self::Active => "active",
            Self::SuspendedSend => "suspended-send",
            Self::SuspendedReceive => "suspended-receive",
            Self::Terminated => "terminated",
            Self::Errored => "errored",
        }
    }
}

impl fmt::Display for ComponentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Run state of a network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum NetworkState {
    /// Built but not running; build operations are accepted.
    #[default]
    Idle,
    /// Components are executing.
    Running,
    /// An error or cancellation was observed; draining to quiescence.
    Terminating,
    /// Quiescent with no recorded failures.
    Terminated,
    /// Quiescent with recorded failures.
    Errored,
}

/// Exit status of a network run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunStatus {
    /// Full quiescence, no failures.
    Completed,
    /// Quiescence reached with one or more component failures.
    Errored,
    /// The deadlock detector fired.
    Deadlocked,
    /// The run was externally terminated.
    Cancelled,
}

/// One recorded component failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentFailure {
    /// The failing component name.
    pub component: String,
    /// Stable error code of the failure (e.g. "E301").
    pub code: String,
    /// Human-readable failure message.
    pub message: String,
    /// The port the component was operating on when it failed, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port_context: Option<String>,
}

impl ComponentFailure {
    /// Record a failure from an error, tagged with the component name.
    pub fn from_error(component: impl Into<String>, error: &FlowError) -> Self {
        Self {
            component: component.into(),
            code: error.code().to_string(),
            message: error.to_string(),
            port_context: None,
        }
    }

    /// Attach the port the component was suspended on.
    pub fn with_port_context(mut self, port: impl Into<String>) -> Self {
        self.port_context = Some(port.into());
        self
    }
}

impl fmt::Display for ComponentFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.component, self.message)?;
        if let Some(ref port) = self.port_context {
            write!(f, " (at {})", port)?;
        }
        Ok(())
    }
}

/// Packet movement counters accumulated over one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PacketCounters {
    /// Packets created by components and initial-packet sources.
    pub creates: u64,
    /// Successful sends onto connections.
    pub sends: u64,
    /// Successful receives from connections.
    pub receives: u64,
    /// Packets released by components or discarded by unconnected outputs.
    pub drops: u64,
    /// Packets discarded by a consumer-side close.
    pub dropped_on_close: u64,
}

/// The result of a network run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Exit status.
    pub status: RunStatus,
    /// Recorded component failures, in observation order.
    pub failures: Vec<ComponentFailure>,
    /// The suspended set, when the run deadlocked.
    pub suspended: Vec<String>,
    /// Packet movement counters.
    pub counters: PacketCounters,
    /// Wall-clock duration of the run in milliseconds.
    pub elapsed_ms: u64,
}

impl RunReport {
    /// Whether the run reached quiescence with no failures.
    pub fn is_success(&self) -> bool {
        matches!(self.status, RunStatus::Completed)
    }

    /// Failures recorded for a given component.
    pub fn failures_for(&self, component: &str) -> Vec<&ComponentFailure> {
        self.failures
            .iter()
            .filter(|f| f.component == component)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn component_state_terminal() {
        assert!(ComponentState::Terminated.is_terminal());
        assert!(ComponentState::Errored.is_terminal());
        assert!(!ComponentState::SuspendedReceive.is_terminal());
    }

    #[test]
    fn failure_from_error_keeps_code() {
        let err = FlowError::ComponentFailed {
            component: "mapper".to_string(),
            cause: "bad input".to_string(),
        };
        let failure = ComponentFailure::from_error("mapper", &err).with_port_context("mapper.IN");
        assert_eq!(failure.code, "E301");
        assert!(format!("{}", failure).contains("mapper.IN"));
    }

    #[test]
    fn report_queries() {
        let report = RunReport {
            status: RunStatus::Errored,
            failures: vec![ComponentFailure {
                component: "b".to_string(),
                code: "E301".to_string(),
                message: "boom".to_string(),
                port_context: None,
            }],
            suspended: vec![],
            counters: PacketCounters::default(),
            elapsed_ms: 12,
        };
        assert!(!report.is_success());
        assert_eq!(report.failures_for("b").len(), 1);
        assert!(report.failures_for("a").is_empty());
    }

    #[test]
    fn serde_roundtrip() {
        let report = RunReport {
            status: RunStatus::Deadlocked,
            failures: vec![],
            suspended: vec!["a".to_string(), "b".to_string()],
            counters: PacketCounters {
                creates: 4,
                sends: 4,
                receives: 2,
                drops: 2,
                dropped_on_close: 0,
            },
            elapsed_ms: 100,
        };
        let json = serde_json::to_string(&report).unwrap();
        let parsed: RunReport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.status, RunStatus::Deadlocked);
        assert_eq!(parsed.suspended.len(), 2);
        assert_eq!(parsed.counters.sends, 4);
    }
}
