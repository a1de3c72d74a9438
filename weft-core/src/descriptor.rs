//! Static component and port descriptors.
//!
//! A component kind declares its ports up front: ordered input and output
//! lists with names, types, and policy flags. The runtime builds handles
//! from these declarations; the control surface serializes them as
//! `ComponentSpec` for introspection.

use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction of a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortDirection {
    /// Input port.
    In,
    /// Output port.
    Out,
}

impl PortDirection {
    /// Get the string representation ("in" / "out").
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::In => "in",
            Self::Out => "out",
        }
    }
}

impl fmt::Display for PortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Declared element type of a port.
///
/// Types are an advisory contract: payloads are validated at send against
/// the output port's type, and `connect` requires both ends to agree.
/// `Any` disables validation for the port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PortType {
    /// Any payload; no validation.
    #[default]
    Any,
    /// String payloads.
    String,
    /// Numeric payloads.
    Number,
    /// Boolean payloads.
    Boolean,
    /// Array payloads.
    Array,
    /// Object/map payloads.
    Object,
}

impl PortType {
    /// Whether `payload` satisfies this type. Null payloads always pass.
    pub fn accepts(&self, payload: &Value) -> bool {
        if payload.is_null() {
            return true;
        }
        match self {
            Self::Any => true,
            Self::String => payload.kind() == "string",
            Self::Number => payload.kind() == "number",
            Self::Boolean => payload.kind() == "boolean",
            Self::Array => payload.kind() == "array",
            Self::Object => payload.kind() == "object",
        }
    }

    /// Whether two declared types may be connected: equal types, or either
    /// side `Any`.
    pub fn agrees_with(&self, other: &PortType) -> bool {
        matches!((self, other), (Self::Any, _) | (_, Self::Any)) || self == other
    }

    /// Get the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Any => "any",
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
        }
    }
}

impl fmt::Display for PortType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A port declaration on a component kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortDefinition {
    /// Port name (e.g. "IN", "OUT", "COUNT").
    pub name: String,
    /// Port direction.
    pub direction: PortDirection,
    /// Declared element type.
    #[serde(rename = "type", default)]
    pub port_type: PortType,
    /// Whether the port must be connected (or initialized) for the network
    /// to run. Only meaningful on inputs.
    #[serde(default)]
    pub required: bool,
    /// Default payload for an unconnected optional input. Behaves like an
    /// initial packet of this value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// Whether this is an array port (indexed elements).
    #[serde(default)]
    pub array: bool,
    /// Fixed arity for array ports; `None` means elastic.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixed_size: Option<usize>,
    /// Whether an output port duplicates packets to several connections.
    #[serde(default)]
    pub fanout: bool,
    /// Whether packets discarded by a consumer-side close are expected
    /// (suppresses the dropped-packet warning).
    #[serde(default)]
    pub drop_tolerant: bool,
    /// Description of the port.
    #[serde(default)]
    pub description: String,
}

impl PortDefinition {
    /// Create a required input port.
    pub fn input(name: impl Into<String>, port_type: PortType) -> Self {
        Self {
            name: name.into(),
            direction: PortDirection::In,
            port_type,
            required: true,
            default: None,
            array: false,
            fixed_size: None,
            fanout: false,
            drop_tolerant: false,
            description: String::new(),
        }
    }

    /// Create an output port.
    pub fn output(name: impl Into<String>, port_type: PortType) -> Self {
        Self {
            name: name.into(),
            direction: PortDirection::Out,
            port_type,
            required: false,
            default: None,
            array: false,
            fixed_size: None,
            fanout: false,
            drop_tolerant: false,
            description: String::new(),
        }
    }

    /// Mark the port as optional.
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Set a default payload for an unconnected input.
    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self.required = false;
        self
    }

    /// Declare an elastic array port.
    pub fn array(mut self) -> Self {
        self.array = true;
        self
    }

    /// Declare an array port with a fixed arity.
    pub fn array_of(mut self, size: usize) -> Self {
        self.array = true;
        self.fixed_size = Some(size);
        self
    }

    /// Allow several downstream connections on an output port.
    pub fn fanout(mut self) -> Self {
        self.fanout = true;
        self
    }

    /// Suppress the dropped-packet warning on consumer-side close.
    pub fn drop_tolerant(mut self) -> Self {
        self.drop_tolerant = true;
        self
    }

    /// Set the port description.
    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = desc.into();
        self
    }
}

/// Metadata about a component kind.
#[derive(Debug, Clone)]
pub struct ComponentInfo {
    /// Fully qualified kind name (e.g. "std::copy").
    pub name: String,
    /// Namespace (e.g. "std").
    pub namespace: String,
    /// Short name (e.g. "copy").
    pub short_name: String,
    /// Description of what the component does.
    pub description: String,
    /// Version of the component implementation.
    pub version: String,
    /// Ordered input port declarations.
    pub inputs: Vec<PortDefinition>,
    /// Ordered output port declarations.
    pub outputs: Vec<PortDefinition>,
    /// Whether the component wraps an inner network.
    pub composite: bool,
}

impl ComponentInfo {
    /// Create new component info.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        let namespace = namespace.into();
        let short_name = name.into();
        let full_name = format!("{}::{}", namespace, short_name);

        Self {
            name: full_name,
            namespace,
            short_name,
            description: String::new(),
            version: "1.0.0".to_string(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            composite: false,
        }
    }

    /// Set the description.
    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = desc.into();
        self
    }

    /// Set the version.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Set input ports.
    pub fn with_inputs(mut self, inputs: Vec<PortDefinition>) -> Self {
        self.inputs = inputs;
        self
    }

    /// Set output ports.
    pub fn with_outputs(mut self, outputs: Vec<PortDefinition>) -> Self {
        self.outputs = outputs;
        self
    }

    /// Mark as a composite (inner-network) component.
    pub fn composite(mut self) -> Self {
        self.composite = true;
        self
    }

    /// Get an input port declaration by name.
    pub fn get_input(&self, name: &str) -> Option<&PortDefinition> {
        self.inputs.iter().find(|p| p.name == name)
    }

    /// Get an output port declaration by name.
    pub fn get_output(&self, name: &str) -> Option<&PortDefinition> {
        self.outputs.iter().find(|p| p.name == name)
    }

    /// Get a port declaration by name in either direction.
    pub fn get_port(&self, name: &str) -> Option<&PortDefinition> {
        self.get_input(name).or_else(|| self.get_output(name))
    }

    /// Serializable descriptor for the control surface.
    pub fn spec(&self) -> ComponentSpec {
        ComponentSpec {
            kind: self.name.clone(),
            description: self.description.clone(),
            composite: self.composite,
            inports: self.inputs.iter().map(PortSpec::from_definition).collect(),
            outports: self.outputs.iter().map(PortSpec::from_definition).collect(),
        }
    }
}

/// Serializable component descriptor, as returned by `describe_component`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentSpec {
    /// Fully qualified kind name.
    pub kind: String,
    /// Component description.
    pub description: String,
    /// Whether the component wraps an inner network.
    #[serde(default)]
    pub composite: bool,
    /// Input port descriptors.
    pub inports: Vec<PortSpec>,
    /// Output port descriptors.
    pub outports: Vec<PortSpec>,
}

/// Serializable port descriptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortSpec {
    /// Port name.
    pub name: String,
    /// Declared element type.
    #[serde(rename = "type")]
    pub port_type: PortType,
    /// Whether the port is required.
    pub required: bool,
    /// Default payload, if declared.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// Whether the port is addressable by index.
    #[serde(default)]
    pub addressable: bool,
    /// Port description.
    #[serde(default)]
    pub description: String,
}

impl PortSpec {
    fn from_definition(def: &PortDefinition) -> Self {
        Self {
            name: def.name.clone(),
            port_type: def.port_type,
            required: def.required,
            default: def.default.clone(),
            addressable: def.array,
            description: def.description.clone(),
        }
    }
}
