//! Graph description validation.
//!
//! Validates a [`GraphDefinition`](super::GraphDefinition) before it is
//! handed to a registry for instantiation: structural limits first (size,
//! nesting, counts), then referential integrity.

use super::definition::GraphDefinition;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Result of validating a graph definition.
pub type ValidationResult = std::result::Result<(), Vec<ValidationError>>;

/// Kind of validation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationErrorKind {
    /// A required field is missing or empty.
    MissingField,
    /// A field holds an out-of-range or malformed value.
    InvalidValue,
    /// An identifier is used more than once.
    DuplicateId,
    /// A reference to an undeclared component or port.
    UnknownReference,
    /// A structural limit was exceeded.
    LimitExceeded,
}

/// A single validation failure with its location in the document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationError {
    /// The failure kind.
    pub kind: ValidationErrorKind,
    /// Dotted location within the document (e.g. "connections[2].src").
    pub location: String,
    /// Human-readable description.
    pub message: String,
}

impl ValidationError {
    /// Create a validation error.
    pub fn new(
        kind: ValidationErrorKind,
        location: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            location: location.into(),
            message: message.into(),
        }
    }

    /// A missing-field error.
    pub fn missing_field(location: impl Into<String>, field: &str) -> Self {
        Self::new(
            ValidationErrorKind::MissingField,
            location,
            format!("missing required field '{}'", field),
        )
    }

    /// An invalid-value error.
    pub fn invalid_value(location: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ValidationErrorKind::InvalidValue, location, message)
    }

    /// A duplicate-identifier error.
    pub fn duplicate_id(location: impl Into<String>, id: &str) -> Self {
        Self::new(
            ValidationErrorKind::DuplicateId,
            location,
            format!("duplicate identifier '{}'", id),
        )
    }

    /// An unknown-reference error.
    pub fn unknown_reference(location: impl Into<String>, name: &str) -> Self {
        Self::new(
            ValidationErrorKind::UnknownReference,
            location,
            format!("reference to undeclared component '{}'", name),
        )
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.location, self.message)
    }
}

/// Structural limits applied when loading untrusted graph documents.
#[derive(Debug, Clone)]
pub struct ValidationLimits {
    /// Maximum number of components.
    pub max_components: usize,
    /// Maximum number of connections.
    pub max_connections: usize,
    /// Maximum number of initial packets.
    pub max_iips: usize,
    /// Maximum document size in bytes when loading from a string.
    pub max_content_size: usize,
    /// Maximum file size in bytes when loading from disk.
    pub max_file_size: usize,
    /// Maximum payload/document nesting depth.
    pub max_nesting_depth: usize,
}

impl Default for ValidationLimits {
    fn default() -> Self {
        Self {
            max_components: 1_000,
            max_connections: 5_000,
            max_iips: 1_000,
            max_content_size: 10 * 1024 * 1024,
            max_file_size: 10 * 1024 * 1024,
            max_nesting_depth: 100,
        }
    }
}

impl ValidationLimits {
    /// Check a document's size before parsing.
    pub fn validate_content_size(&self, content: &str) -> Result<(), ValidationError> {
        if content.len() > self.max_content_size {
            return Err(ValidationError::new(
                ValidationErrorKind::LimitExceeded,
                "graph",
                format!(
                    "content size ({} bytes) exceeds maximum allowed ({} bytes)",
                    content.len(),
                    self.max_content_size
                ),
            ));
        }
        Ok(())
    }

    /// Check a parsed document's nesting depth.
    pub fn validate_nesting_depth(&self, value: &serde_json::Value) -> Result<(), ValidationError> {
        let depth = json_depth(value);
        if depth > self.max_nesting_depth {
            return Err(ValidationError::new(
                ValidationErrorKind::LimitExceeded,
                "graph",
                format!(
                    "nesting depth ({}) exceeds maximum allowed ({})",
                    depth, self.max_nesting_depth
                ),
            ));
        }
        Ok(())
    }
}

fn json_depth(value: &serde_json::Value) -> usize {
    match value {
        serde_json::Value::Array(items) => {
            1 + items.iter().map(json_depth).max().unwrap_or(0)
        }
        serde_json::Value::Object(map) => {
            1 + map.values().map(json_depth).max().unwrap_or(0)
        }
        _ => 1,
    }
}

/// Validator for graph definitions.
pub struct GraphValidator {
    errors: Vec<ValidationError>,
    limits: ValidationLimits,
}

impl GraphValidator {
    /// Create a validator with default limits.
    pub fn new() -> Self {
        Self {
            errors: Vec::new(),
            limits: ValidationLimits::default(),
        }
    }

    /// Create a validator with custom limits.
    pub fn with_limits(limits: ValidationLimits) -> Self {
        Self {
            errors: Vec::new(),
            limits,
        }
    }

    /// Validate a graph definition.
    pub fn validate(mut self, graph: &GraphDefinition) -> ValidationResult {
        self.validate_limits(graph);
        self.validate_metadata(graph);
        self.validate_components(graph);
        self.validate_connections(graph);
        self.validate_iips(graph);
        self.validate_boundaries(graph);

        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }

    fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    fn validate_limits(&mut self, graph: &GraphDefinition) {
        if graph.components.len() > self.limits.max_components {
            self.add_error(ValidationError::new(
                ValidationErrorKind::LimitExceeded,
                "components",
                format!(
                    "component count ({}) exceeds maximum allowed ({})",
                    graph.components.len(),
                    self.limits.max_components
                ),
            ));
        }
        if graph.connections.len() > self.limits.max_connections {
            self.add_error(ValidationError::new(
                ValidationErrorKind::LimitExceeded,
                "connections",
                format!(
                    "connection count ({}) exceeds maximum allowed ({})",
                    graph.connections.len(),
                    self.limits.max_connections
                ),
            ));
        }
        if graph.iips.len() > self.limits.max_iips {
            self.add_error(ValidationError::new(
                ValidationErrorKind::LimitExceeded,
                "iips",
                format!(
                    "initial packet count ({}) exceeds maximum allowed ({})",
                    graph.iips.len(),
                    self.limits.max_iips
                ),
            ));
        }
    }

    fn validate_metadata(&mut self, graph: &GraphDefinition) {
        if graph.name.is_empty() {
            self.add_error(ValidationError::missing_field("graph", "name"));
        }
    }

    fn validate_components(&mut self, graph: &GraphDefinition) {
        for (name, component) in &graph.components {
            let location = format!("components.{}", name);
            if name.is_empty() {
                self.add_error(ValidationError::missing_field(&location, "name"));
            }
            if component.kind.is_empty() {
                self.add_error(ValidationError::missing_field(&location, "kind"));
            }
        }
    }

    fn validate_connections(&mut self, graph: &GraphDefinition) {
        let mut seen_targets = HashSet::new();

        for (idx, connection) in graph.connections.iter().enumerate() {
            let location = format!("connections[{}]", idx);

            if !graph.components.contains_key(&connection.src.component) {
                self.add_error(ValidationError::unknown_reference(
                    format!("{}.src", location),
                    &connection.src.component,
                ));
            }
            if !graph.components.contains_key(&connection.tgt.component) {
                self.add_error(ValidationError::unknown_reference(
                    format!("{}.tgt", location),
                    &connection.tgt.component,
                ));
            }

            if let Some(capacity) = connection.capacity {
                if capacity == 0 {
                    self.add_error(ValidationError::invalid_value(
                        format!("{}.capacity", location),
                        "connection capacity must be at least 1",
                    ));
                }
            }

            // An input port element takes at most one inbound connection.
            let key = (
                connection.tgt.component.clone(),
                connection.tgt.port_key(),
            );
            if !seen_targets.insert(key) {
                self.add_error(ValidationError::duplicate_id(
                    format!("{}.tgt", location),
                    &format!("{}", connection.tgt),
                ));
            }
        }
    }

    fn validate_iips(&mut self, graph: &GraphDefinition) {
        let connected: HashSet<(String, String)> = graph
            .connections
            .iter()
            .map(|c| (c.tgt.component.clone(), c.tgt.port_key()))
            .collect();
        let mut seen = HashSet::new();

        for (idx, iip) in graph.iips.iter().enumerate() {
            let location = format!("iips[{}]", idx);

            if !graph.components.contains_key(&iip.tgt.component) {
                self.add_error(ValidationError::unknown_reference(
                    format!("{}.tgt", location),
                    &iip.tgt.component,
                ));
            }

            let key = (iip.tgt.component.clone(), iip.tgt.port_key());
            if connected.contains(&key) {
                self.add_error(ValidationError::invalid_value(
                    format!("{}.tgt", location),
                    format!(
                        "port {} has both an initial packet and a connection",
                        iip.tgt
                    ),
                ));
            }
            if !seen.insert(key) {
                self.add_error(ValidationError::duplicate_id(
                    format!("{}.tgt", location),
                    &format!("{}", iip.tgt),
                ));
            }
        }
    }

    fn validate_boundaries(&mut self, graph: &GraphDefinition) {
        for (name, port) in graph.inports.iter().chain(graph.outports.iter()) {
            if !graph.components.contains_key(&port.component) {
                self.add_error(ValidationError::unknown_reference(
                    format!("ports.{}", name),
                    &port.component,
                ));
            }
        }
    }
}

impl Default for GraphValidator {
    fn default() -> Self {
        Self::new()
    }
}
