//! Strongly-typed identifiers for Weft entities.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a network (one executable graph instance).
///
/// Each run of a network is tagged with its ID in events and log output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NetworkId {
    /// UUID bytes in big-endian format.
    bytes: [u8; 16],
}

impl NetworkId {
    /// Create a new random network ID.
    #[must_use]
    pub fn new() -> Self {
        Self {
            bytes: *Uuid::new_v4().as_bytes(),
        }
    }

    /// Create a network ID from an existing UUID.
    #[must_use]
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self {
            bytes: *uuid.as_bytes(),
        }
    }

    /// Get the underlying UUID.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        Uuid::from_bytes(self.bytes)
    }

    /// Parse a network ID from a string.
    ///
    /// # Errors
    /// Returns `None` if the string is not a valid UUID.
    pub fn parse(s: &str) -> Option<Self> {
        Uuid::parse_str(s).ok().map(Self::from_uuid)
    }
}

impl Default for NetworkId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NetworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "net_{}", self.as_uuid())
    }
}

impl Serialize for NetworkId {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.as_uuid().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for NetworkId {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let uuid = Uuid::deserialize(deserializer)?;
        Ok(Self::from_uuid(uuid))
    }
}

/// Reference to a port on a named component.
///
/// Rendered as `component.port` or `component.port[index]` for array-port
/// elements. Names are case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortRef {
    /// The component the port belongs to.
    pub component: String,
    /// The port name.
    pub port: String,
    /// The element index, for array ports.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
}

impl PortRef {
    /// Create a port reference without an index.
    #[must_use]
    pub fn new(component: impl Into<String>, port: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            port: port.into(),
            index: None,
        }
    }

    /// Create a port reference to an array-port element.
    #[must_use]
    pub fn indexed(component: impl Into<String>, port: impl Into<String>, index: usize) -> Self {
        Self {
            component: component.into(),
            port: port.into(),
            index: Some(index),
        }
    }

    /// Return the same reference with the element index set.
    #[must_use]
    pub fn with_index(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }

    /// The `port` or `port[index]` part of the reference.
    #[must_use]
    pub fn port_key(&self) -> String {
        match self.index {
            Some(i) => format!("{}[{}]", self.port, i),
            None => self.port.clone(),
        }
    }
}

impl fmt::Display for PortRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.index {
            Some(i) => write!(f, "{}.{}[{}]", self.component, self.port, i),
            None => write!(f, "{}.{}", self.component, self.port),
        }
    }
}

/// Parse a port reference string like `reader.OUT` or `merge.IN[2]`.
///
/// # Format
/// `component.port` or `component.port[index]`. The component name may not
/// contain dots; the port name may not be empty.
impl std::str::FromStr for PortRef {
    type Err = &'static str;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (component, rest) = s
            .split_once('.')
            .ok_or("Port reference must be in format 'component.port'")?;

        if component.is_empty() {
            return Err("Component name cannot be empty");
        }
        if rest.is_empty() {
            return Err("Port name cannot be empty");
        }

        if let Some(bracket) = rest.find('[') {
            let port = &rest[..bracket];
            let idx_str = rest[bracket + 1..]
                .strip_suffix(']')
                .ok_or("Unterminated index bracket in port reference")?;
            if port.is_empty() {
                return Err("Port name cannot be empty");
            }
            let index: usize = idx_str.parse().map_err(|_| "Invalid array index")?;
            Ok(PortRef::indexed(component, port, index))
        } else {
            Ok(PortRef::new(component, rest))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn network_id_uniqueness() {
        assert_ne!(NetworkId::new(), NetworkId::new());
    }

    #[test]
    fn network_id_display() {
        let id = NetworkId::new();
        assert!(format!("{}", id).starts_with("net_"));
    }

    #[test]
    fn port_ref_display() {
        assert_eq!(format!("{}", PortRef::new("reader", "OUT")), "reader.OUT");
        assert_eq!(
            format!("{}", PortRef::indexed("merge", "IN", 2)),
            "merge.IN[2]"
        );
    }

    #[test]
    fn port_ref_parse_basic() {
        let r = PortRef::from_str("reader.OUT").unwrap();
        assert_eq!(r.component, "reader");
        assert_eq!(r.port, "OUT");
        assert_eq!(r.index, None);
    }

    #[test]
    fn port_ref_parse_indexed() {
        let r = PortRef::from_str("merge.IN[3]").unwrap();
        assert_eq!(r.component, "merge");
        assert_eq!(r.port, "IN");
        assert_eq!(r.index, Some(3));
    }

    #[test]
    fn port_ref_parse_roundtrip() {
        let original = PortRef::indexed("splitter", "OUT", 7);
        let parsed = PortRef::from_str(&format!("{}", original)).unwrap();
        assert_eq!(parsed, original);
    }

    #[test]
    fn port_ref_parse_rejects_missing_dot() {
        assert!(PortRef::from_str("reader").is_err());
    }

    #[test]
    fn port_ref_parse_rejects_empty_parts() {
        assert!(PortRef::from_str(".OUT").is_err());
        assert!(PortRef::from_str("reader.").is_err());
    }

    #[test]
    fn port_ref_parse_rejects_bad_index() {
        assert!(PortRef::from_str("merge.IN[x]").is_err());
        assert!(PortRef::from_str("merge.IN[2").is_err());
    }

    #[test]
    fn port_key_forms() {
        assert_eq!(PortRef::new("a", "IN").port_key(), "IN");
        assert_eq!(PortRef::indexed("a", "IN", 0).port_key(), "IN[0]");
    }
}
