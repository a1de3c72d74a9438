//! Information packets.
//!
//! A packet is the unit of data that flows over a connection. It either
//! carries a payload (`Normal`) or marks a substream boundary (`OpenBracket`
//! / `CloseBracket`). Brackets carry no payload, only an optional label.
//!
//! Ownership is not stored on the packet itself: the runtime keeps an
//! outstanding-packet counter per component, incremented when a component
//! creates or receives a packet and decremented when it sends or releases
//! one. A packet sitting in a connection queue belongs to the connection.

use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The role of a packet on a connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PacketRole {
    /// An ordinary data packet.
    Normal,
    /// Opens a substream. Carries no payload.
    OpenBracket(Option<String>),
    /// Closes a substream. Carries no payload.
    CloseBracket(Option<String>),
}

/// A packet flowing between components.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Packet {
    payload: Value,
    role: PacketRole,
}

impl Packet {
    /// Create a normal packet carrying `payload`.
    pub fn new(payload: impl Into<Value>) -> Self {
        Self {
            payload: payload.into(),
            role: PacketRole::Normal,
        }
    }

    /// Create an open-bracket packet.
    pub fn open_bracket(label: Option<String>) -> Self {
        Self {
            payload: Value::null(),
            role: PacketRole::OpenBracket(label),
        }
    }

    /// Create a close-bracket packet.
    pub fn close_bracket(label: Option<String>) -> Self {
        Self {
            payload: Value::null(),
            role: PacketRole::CloseBracket(label),
        }
    }

    /// The packet's payload. Non-destructive; brackets yield null.
    pub fn payload(&self) -> &Value {
        &self.payload
    }

    /// Consume the packet and return its payload.
    pub fn into_payload(self) -> Value {
        self.payload
    }

    /// The packet's role.
    pub fn role(&self) -> &PacketRole {
        &self.role
    }

    /// Whether this is an ordinary data packet.
    pub fn is_normal(&self) -> bool {
        matches!(self.role, PacketRole::Normal)
    }

    /// Whether this packet marks a substream boundary.
    pub fn is_bracket(&self) -> bool {
        !self.is_normal()
    }

    /// The bracket label, if this is a bracket packet.
    pub fn bracket_label(&self) -> Option<&str> {
        match &self.role {
            PacketRole::OpenBracket(l) | PacketRole::CloseBracket(l) => l.as_deref(),
            PacketRole::Normal => None,
        }
    }
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.role {
            PacketRole::Normal => write!(f, "{}", self.payload.inner()),
            PacketRole::OpenBracket(l) => {
                write!(f, "OPEN({})", l.as_deref().unwrap_or(""))
            }
            PacketRole::CloseBracket(l) => {
                write!(f, "CLOSE({})", l.as_deref().unwrap_or(""))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normal_packet_carries_payload() {
        let p = Packet::new("hello");
        assert!(p.is_normal());
        assert_eq!(p.payload().as_string(), Some("hello".to_string()));
        assert_eq!(p.into_payload().as_string(), Some("hello".to_string()));
    }

    #[test]
    fn brackets_carry_no_payload() {
        let open = Packet::open_bracket(Some("batch".to_string()));
        assert!(open.is_bracket());
        assert!(open.payload().is_null());
        assert_eq!(open.bracket_label(), Some("batch"));

        let close = Packet::close_bracket(None);
        assert!(close.is_bracket());
        assert_eq!(close.bracket_label(), None);
    }

    #[test]
    fn display_forms() {
        assert_eq!(format!("{}", Packet::new(5_i64)), "5");
        assert_eq!(
            format!("{}", Packet::open_bracket(Some("x".to_string()))),
            "OPEN(x)"
        );
        assert_eq!(format!("{}", Packet::close_bracket(None)), "CLOSE()");
    }
}
