//! Error types for Weft.
//!
//! This module provides strongly-typed errors with actionable context.
//! Every error carries the identifiers needed to locate the fault (component
//! name, port reference) and a stable code for log correlation.

use thiserror::Error;

/// The main error type for Weft operations.
#[derive(Error, Debug, Clone)]
pub enum FlowError {
    // =========================================================================
    // Graph Build Errors (E101-E199)
    // =========================================================================
    /// Reference to a component that does not exist in the graph.
    #[error("E101: Reference to unknown component '{name}'")]
    UnknownComponent {
        /// The component name that could not be resolved.
        name: String,
    },

    /// Reference to a port that the component does not declare.
    #[error("E102: Unknown port '{port}' on component '{component}'")]
    UnknownPort {
        /// The component that was queried.
        component: String,
        /// The port name that could not be resolved.
        port: String,
    },

    /// A port of the wrong direction was used (e.g. an input where an
    /// output was expected).
    #[error("E103: Expected {expected} port, got {actual} port '{port}'")]
    PortKindMismatch {
        /// The port reference in `component.port` form.
        port: String,
        /// The expected direction ("in" or "out").
        expected: &'static str,
        /// The actual direction of the referenced port.
        actual: &'static str,
    },

    /// The declared types at the two ends of a connection disagree.
    #[error(
        "E104: Type mismatch connecting {src} ({src_type}) to {tgt} ({tgt_type})"
    )]
    TypeMismatch {
        /// The upstream port reference.
        src: String,
        /// The downstream port reference.
        tgt: String,
        /// The declared type of the upstream port.
        src_type: String,
        /// The declared type of the downstream port.
        tgt_type: String,
    },

    /// A second connection was attached to a port that allows only one.
    #[error("E105: Port {port} is already connected")]
    DuplicateConnection {
        /// The port reference that already holds a connection.
        port: String,
    },

    /// An initial packet was attached to a port that already has one,
    /// or that already has an inbound connection.
    #[error("E106: Port {port} is already initialized")]
    PortAlreadyInitialized {
        /// The port reference that already holds an initial packet.
        port: String,
    },

    /// An array-port index beyond the declared fixed arity.
    #[error("E107: Index {index} exceeds arity {arity} of array port {port}")]
    ArityExceeded {
        /// The array port reference.
        port: String,
        /// The offending element index.
        index: usize,
        /// The declared fixed arity.
        arity: usize,
    },

    /// A component name was registered twice within one graph.
    #[error("E108: Component '{name}' already exists in graph")]
    DuplicateComponent {
        /// The duplicated component name.
        name: String,
    },

    /// A required input port has neither a connection, an initial packet,
    /// nor a declared default.
    #[error("E109: Required port {port} is not connected")]
    RequiredPortUnconnected {
        /// The unconnected required port reference.
        port: String,
    },

    /// A structural problem in the graph not covered by a more specific
    /// variant (bad export target, compaction of a connected slot, ...).
    #[error("E110: Invalid graph structure: {cause}")]
    GraphStructure {
        /// Description of the structural problem.
        cause: String,
    },

    /// A build operation was attempted while the network is not idle.
    #[error("E111: Cannot {operation}: network is not idle")]
    NetworkNotIdle {
        /// The rejected build operation.
        operation: String,
    },

    /// A component kind string is not present in the registry.
    #[error("E112: Unknown component kind '{kind}'")]
    UnknownKind {
        /// The kind string that could not be resolved.
        kind: String,
    },

    // =========================================================================
    // Port Runtime Errors (E201-E299)
    // =========================================================================
    /// A send was attempted after the downstream port closed.
    #[error("E201: Downstream port {tgt} closed; send from {src} refused")]
    DownstreamClosed {
        /// The sending port reference.
        src: String,
        /// The closed receiving port reference.
        tgt: String,
    },

    /// A payload failed validation against the output port's declared type.
    #[error("E202: Payload of kind '{actual}' sent on port {port} declared as '{expected}'")]
    PayloadTypeMismatch {
        /// The output port reference.
        port: String,
        /// The declared port type.
        expected: String,
        /// The kind of the offending payload.
        actual: String,
    },

    /// A timed port operation expired. The port remains open.
    #[error("E203: Operation on port {port} timed out after {timeout_ms}ms")]
    PortTimeout {
        /// The port reference.
        port: String,
        /// The timeout that elapsed, in milliseconds.
        timeout_ms: u64,
    },

    /// The network was cancelled while the operation was pending.
    #[error("E204: Operation cancelled by network termination")]
    Cancelled,

    /// A close bracket without a matching open bracket (only raised when
    /// bracket validation is enabled).
    #[error("E205: Unbalanced close bracket on port {port}")]
    BracketMismatch {
        /// The output port reference.
        port: String,
    },

    // =========================================================================
    // Component / Network Errors (E301-E399)
    // =========================================================================
    /// A component body returned an error.
    #[error("E301: Component '{component}' failed: {cause}")]
    ComponentFailed {
        /// The failing component name.
        component: String,
        /// The failure description.
        cause: String,
    },

    /// A component body panicked; the panic was captured by the scheduler.
    #[error("E302: Component '{component}' panicked: {message}")]
    ComponentPanicked {
        /// The panicking component name.
        component: String,
        /// The panic payload, if it was a string.
        message: String,
    },

    /// A component deactivated while still owning packets.
    #[error("E303: Component '{component}' terminated owning {count} packet(s)")]
    PacketLeak {
        /// The leaking component name.
        component: String,
        /// The number of packets still owned.
        count: i64,
    },

    /// Every live component is suspended on receive over empty connections.
    #[error("E304: Network deadlocked; suspended: {suspended:?}")]
    Deadlock {
        /// Names of the suspended components.
        suspended: Vec<String>,
    },

    // =========================================================================
    // Serialization Errors (E401-E499)
    // =========================================================================
    /// Serialization or deserialization failure.
    #[error("E401: Serialization error: {0}")]
    Serialization(
        /// The serialization error message.
        String,
    ),
}

impl FlowError {
    /// Get the error code (e.g., "E101").
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnknownComponent { .. } => "E101",
            Self::UnknownPort { .. } => "E102",
            Self::PortKindMismatch { .. } => "E103",
            Self::TypeMismatch { .. } => "E104",
            Self::DuplicateConnection { .. } => "E105",
            Self::PortAlreadyInitialized { .. } => "E106",
            Self::ArityExceeded { .. } => "E107",
            Self::DuplicateComponent { .. } => "E108",
            Self::RequiredPortUnconnected { .. } => "E109",
            Self::GraphStructure { .. } => "E110",
            Self::NetworkNotIdle { .. } => "E111",
            Self::UnknownKind { .. } => "E112",
            Self::DownstreamClosed { .. } => "E201",
            Self::PayloadTypeMismatch { .. } => "E202",
            Self::PortTimeout { .. } => "E203",
            Self::Cancelled => "E204",
            Self::BracketMismatch { .. } => "E205",
            Self::ComponentFailed { .. } => "E301",
            Self::ComponentPanicked { .. } => "E302",
            Self::PacketLeak { .. } => "E303",
            Self::Deadlock { .. } => "E304",
            Self::Serialization(_) => "E401",
        }
    }

    /// Check if this error was raised by a graph build operation.
    #[must_use]
    pub fn is_build_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownComponent { .. }
                | Self::UnknownPort { .. }
                | Self::PortKindMismatch { .. }
                | Self::TypeMismatch { .. }
                | Self::DuplicateConnection { .. }
                | Self::PortAlreadyInitialized { .. }
                | Self::ArityExceeded { .. }
                | Self::DuplicateComponent { .. }
                | Self::RequiredPortUnconnected { .. }
                | Self::GraphStructure { .. }
                | Self::NetworkNotIdle { .. }
                | Self::UnknownKind { .. }
        )
    }

    /// Check if this error was raised by a port operation at runtime.
    #[must_use]
    pub fn is_port_error(&self) -> bool {
        matches!(
            self,
            Self::DownstreamClosed { .. }
                | Self::PayloadTypeMismatch { .. }
                | Self::PortTimeout { .. }
                | Self::Cancelled
                | Self::BracketMismatch { .. }
        )
    }

    /// Check if this error is the cancellation signal. Cancellation is
    /// delivered at suspension points and is not recorded as a component
    /// failure unless the body converts it.
    #[must_use]
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Result type alias using `FlowError`.
pub type Result<T> = std::result::Result<T, FlowError>;

/// Extension trait for adding component context to errors.
pub trait ResultExt<T> {
    /// Convert any error into a `ComponentFailed` tagged with `component`.
    fn with_component(self, component: &str) -> Result<T>;
}

impl<T, E: std::fmt::Display> ResultExt<T> for std::result::Result<T, E> {
    fn with_component(self, component: &str) -> Result<T> {
        self.map_err(|e| FlowError::ComponentFailed {
            component: component.to_string(),
            cause: e.to_string(),
        })
    }
}
