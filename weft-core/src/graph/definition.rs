//! Graph description documents.
//!
//! A [`GraphDefinition`] is the serializable form of a network: named
//! components with kinds, connections between port references, initial
//! packets, and exported boundary ports for composites. Documents load from
//! JSON or YAML.
//!
//! # Example
//!
//! ```yaml
//! name: word_filter
//! description: Keep words starting with a prefix
//!
//! components:
//!   splitter:
//!     kind: std::line-to-words
//!   filter:
//!     kind: std::starts-with
//!   sink:
//!     kind: std::capture
//!
//! connections:
//!   - src: {component: splitter, port: OUT}
//!     tgt: {component: filter, port: IN}
//!   - src: {component: filter, port: ACC}
//!     tgt: {component: sink, port: IN}
//!     capacity: 4
//!
//! iips:
//!   - tgt: {component: splitter, port: IN}
//!     value: "Hello Goodbye World"
//!   - tgt: {component: filter, port: TEST}
//!     value: "G"
//! ```

use super::validation::{GraphValidator, ValidationError, ValidationLimits, ValidationResult};
use crate::types::PortRef;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A component entry in a graph description.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentRef {
    /// The component kind (e.g. "std::copy"), resolved against a registry.
    pub kind: String,
    /// Free-form metadata (editor placement, annotations). Ignored by the
    /// engine.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl ComponentRef {
    /// Create a component reference.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            metadata: HashMap::new(),
        }
    }

    /// Attach a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

/// A connection entry in a graph description.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionDefinition {
    /// Upstream output port.
    pub src: PortRef,
    /// Downstream input port.
    pub tgt: PortRef,
    /// Queue capacity; the network default applies when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<usize>,
}

impl ConnectionDefinition {
    /// Create a connection definition with the default capacity.
    pub fn new(src: PortRef, tgt: PortRef) -> Self {
        Self {
            src,
            tgt,
            capacity: None,
        }
    }

    /// Set an explicit capacity.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity);
        self
    }
}

/// An initial packet entry in a graph description.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IipDefinition {
    /// The input port receiving the initial packet.
    pub tgt: PortRef,
    /// The payload delivered at network start.
    pub value: Value,
}

impl IipDefinition {
    /// Create an initial packet definition.
    pub fn new(tgt: PortRef, value: impl Into<Value>) -> Self {
        Self {
            tgt,
            value: value.into(),
        }
    }
}

/// A complete graph description.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphDefinition {
    /// Graph name (required).
    pub name: String,

    /// Human-readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Components, keyed by instance name. Names are case-sensitive.
    #[serde(default)]
    pub components: HashMap<String, ComponentRef>,

    /// Connections between component ports.
    #[serde(default)]
    pub connections: Vec<ConnectionDefinition>,

    /// Initial packets.
    #[serde(default)]
    pub iips: Vec<IipDefinition>,

    /// Exported input ports (external name -> internal port), for
    /// composites.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub inports: HashMap<String, PortRef>,

    /// Exported output ports (external name -> internal port), for
    /// composites.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub outports: HashMap<String, PortRef>,
}

impl GraphDefinition {
    /// Create an empty graph definition.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            components: HashMap::new(),
            connections: Vec::new(),
            iips: Vec::new(),
            inports: HashMap::new(),
            outports: HashMap::new(),
        }
    }

    /// Parse a graph definition from JSON.
    ///
    /// Note: this method does not apply size or depth limits. For untrusted
    /// input use `from_json_validated`.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Parse a graph definition from YAML.
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    /// Serialize to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Serialize to YAML.
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }

    /// Parse and validate JSON in one step with the given limits.
    ///
    /// This is the recommended entry point for untrusted documents:
    /// 1. content size is checked before parsing,
    /// 2. nesting depth is checked on the raw parse,
    /// 3. counts and referential integrity are checked on the typed form.
    pub fn from_json_validated(json: &str, limits: &ValidationLimits) -> Result<Self, GraphLoadError> {
        limits
            .validate_content_size(json)
            .map_err(|error| GraphLoadError::LimitExceeded { error })?;

        let raw: serde_json::Value =
            serde_json::from_str(json).map_err(|e| GraphLoadError::Parse(e.to_string()))?;
        limits
            .validate_nesting_depth(&raw)
            .map_err(|error| GraphLoadError::LimitExceeded { error })?;

        let graph: Self =
            serde_json::from_value(raw).map_err(|e| GraphLoadError::Parse(e.to_string()))?;

        GraphValidator::with_limits(limits.clone())
            .validate(&graph)
            .map_err(|errors| GraphLoadError::Validation { errors })?;

        Ok(graph)
    }

    /// Parse and validate a YAML or JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, GraphLoadError> {
        Self::from_file_with_limits(path, &ValidationLimits::default())
    }

    /// Parse and validate a file with custom limits.
    pub fn from_file_with_limits(
        path: &std::path::Path,
        limits: &ValidationLimits,
    ) -> Result<Self, GraphLoadError> {
        let metadata = std::fs::metadata(path).map_err(|e| GraphLoadError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        if metadata.len() as usize > limits.max_file_size {
            return Err(GraphLoadError::LimitExceeded {
                error: ValidationError::new(
                    super::validation::ValidationErrorKind::LimitExceeded,
                    "graph",
                    format!(
                        "file size ({} bytes) exceeds maximum allowed ({} bytes)",
                        metadata.len(),
                        limits.max_file_size
                    ),
                ),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| GraphLoadError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        if path.extension().is_some_and(|e| e == "json") {
            return Self::from_json_validated(&content, limits);
        }
        let graph =
            Self::from_yaml(&content).map_err(|e| GraphLoadError::Parse(e.to_string()))?;

        GraphValidator::with_limits(limits.clone())
            .validate(&graph)
            .map_err(|errors| GraphLoadError::Validation { errors })?;
        Ok(graph)
    }

    /// Validate the definition with default limits.
    pub fn validate(&self) -> ValidationResult {
        GraphValidator::new().validate(self)
    }

    /// Set the description.
    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    /// Add a component.
    pub fn with_component(mut self, name: impl Into<String>, component: ComponentRef) -> Self {
        self.components.insert(name.into(), component);
        self
    }

    /// Add a connection.
    pub fn with_connection(mut self, connection: ConnectionDefinition) -> Self {
        self.connections.push(connection);
        self
    }

    /// Add an initial packet.
    pub fn with_iip(mut self, iip: IipDefinition) -> Self {
        self.iips.push(iip);
        self
    }

    /// Export an internal input port under an external name.
    pub fn with_inport(mut self, name: impl Into<String>, port: PortRef) -> Self {
        self.inports.insert(name.into(), port);
        self
    }

    /// Export an internal output port under an external name.
    pub fn with_outport(mut self, name: impl Into<String>, port: PortRef) -> Self {
        self.outports.insert(name.into(), port);
        self
    }

    /// Check if a component with the given name exists.
    pub fn has_component(&self, name: &str) -> bool {
        self.components.contains_key(name)
    }

    /// Get a component entry by name.
    pub fn get_component(&self, name: &str) -> Option<&ComponentRef> {
        self.components.get(name)
    }

    /// All component names.
    pub fn component_names(&self) -> impl Iterator<Item = &str> {
        self.components.keys().map(|s| s.as_str())
    }

    /// Connections originating at a component.
    pub fn connections_from<'a>(&'a self, component: &'a str) -> impl Iterator<Item = &'a ConnectionDefinition> + 'a {
        self.connections
            .iter()
            .filter(move |c| c.src.component == component)
    }

    /// Connections terminating at a component.
    pub fn connections_to<'a>(&'a self, component: &'a str) -> impl Iterator<Item = &'a ConnectionDefinition> + 'a {
        self.connections
            .iter()
            .filter(move |c| c.tgt.component == component)
    }

    /// Initial packets targeting a component.
    pub fn iips_for<'a>(&'a self, component: &'a str) -> impl Iterator<Item = &'a IipDefinition> + 'a {
        self.iips
            .iter()
            .filter(move |i| i.tgt.component == component)
    }
}

/// Error loading a graph definition.
#[derive(Debug)]
pub enum GraphLoadError {
    /// I/O error reading a file.
    Io {
        /// Path to the file that couldn't be read.
        path: std::path::PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },
    /// Document parse error.
    Parse(String),
    /// The definition failed validation.
    Validation {
        /// The validation errors found.
        errors: Vec<ValidationError>,
    },
    /// A structural limit was exceeded before or after parsing.
    LimitExceeded {
        /// The specific limit that was exceeded.
        error: ValidationError,
    },
}

impl std::fmt::Display for GraphLoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read graph file '{}': {}", path.display(), source)
            }
            Self::Parse(message) => write!(f, "failed to parse graph: {}", message),
            Self::Validation { errors } => {
                writeln!(f, "graph validation failed with {} error(s):", errors.len())?;
                for error in errors {
                    writeln!(f, "  - {}", error)?;
                }
                Ok(())
            }
            Self::LimitExceeded { error } => {
                write!(f, "graph validation limit exceeded: {}", error)
            }
        }
    }
}

impl std::error::Error for GraphLoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}
