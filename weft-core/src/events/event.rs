//! Typed runtime events.
//!
//! The engine emits a closed vocabulary of events during a run. Consumers
//! (editors, monitors, tests) receive them through an `EventSink`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// An event emitted by a running network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum NetworkEvent {
    /// The network entered the running state.
    NetworkStarted {
        /// Network name.
        network: String,
    },
    /// The network reached quiescence.
    NetworkTerminated {
        /// Network name.
        network: String,
    },
    /// The deadlock detector fired.
    NetworkDeadlocked {
        /// Names of the suspended components, with the port each is
        /// blocked on.
        suspended: Vec<String>,
    },
    /// A component body was activated.
    ComponentStarted {
        /// Component name.
        component: String,
    },
    /// A component body returned and its ports were closed.
    ComponentTerminated {
        /// Component name.
        component: String,
    },
    /// A component body failed; the failure was recorded.
    ComponentErrored {
        /// Component name.
        component: String,
        /// Failure message.
        message: String,
        /// Port context at the time of the failure, if known.
        context: Option<String>,
    },
    /// A packet was enqueued on a connection.
    PacketSent {
        /// Upstream port reference.
        src: String,
        /// Downstream port reference.
        dst: String,
    },
    /// A packet was dequeued from a connection.
    PacketReceived {
        /// Upstream port reference.
        src: String,
        /// Downstream port reference.
        dst: String,
    },
    /// A connection reached capacity; its producer will suspend.
    ConnectionFull {
        /// Upstream port reference.
        src: String,
        /// Downstream port reference.
        dst: String,
    },
    /// A previously full connection has space again.
    ConnectionDrained {
        /// Upstream port reference.
        src: String,
        /// Downstream port reference.
        dst: String,
    },
}

impl NetworkEvent {
    /// The kebab-case tag of this event (matches the serialized form).
    pub fn tag(&self) -> &'static str {
        match self {
            Self::NetworkStarted { .. } => "network-started",
            Self::NetworkTerminated { .. } => "network-terminated",
            Self::NetworkDeadlocked { .. } => "network-deadlocked",
            Self::ComponentStarted { .. } => "component-started",
            Self::ComponentTerminated { .. } => "component-terminated",
            Self::ComponentErrored { .. } => "component-errored",
            Self::PacketSent { .. } => "packet-sent",
            Self::PacketReceived { .. } => "packet-received",
            Self::ConnectionFull { .. } => "connection-full",
            Self::ConnectionDrained { .. } => "connection-drained",
        }
    }

    /// Whether this is a per-packet event (high volume).
    pub fn is_packet_event(&self) -> bool {
        matches!(self, Self::PacketSent { .. } | Self::PacketReceived { .. })
    }
}

impl fmt::Display for NetworkEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// An event stamped with a sequence number and timestamp by the sink.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StampedEvent {
    /// Monotonic sequence number assigned by the sink.
    pub seq: u64,
    /// Timestamp in nanoseconds since the UNIX epoch.
    pub timestamp_ns: u64,
    /// The event.
    #[serde(flatten)]
    pub event: NetworkEvent,
}

impl StampedEvent {
    /// Stamp an event with the current time and the given sequence number.
    pub fn now(seq: u64, event: NetworkEvent) -> Self {
        Self {
            seq,
            timestamp_ns: current_timestamp_ns(),
            event,
        }
    }

    /// The timestamp as an ISO 8601 string.
    pub fn timestamp_iso(&self) -> String {
        let secs = self.timestamp_ns / 1_000_000_000;
        let nanos = (self.timestamp_ns % 1_000_000_000) as u32;
        if let Some(datetime) = chrono::DateTime::from_timestamp(secs as i64, nanos) {
            datetime.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
        } else {
            format!("{}ns", self.timestamp_ns)
        }
    }
}

/// Get current timestamp in nanoseconds since UNIX epoch.
fn current_timestamp_ns() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}
