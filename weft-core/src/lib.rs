//! Weft core library.
//!
//! This crate provides the data model for the Weft flow runtime: packets
//! and payloads, port and component descriptors, serializable graph
//! descriptions, the typed runtime event stream, and the shared error type.
//!
//! # Overview
//!
//! A Weft program is a directed graph of components that exchange immutable
//! information packets over bounded connections. This crate defines WHAT
//! flows (packets of [`Value`] payloads), HOW components describe
//! themselves ([`ComponentInfo`] and [`PortDefinition`]), and how whole
//! graphs are written down ([`GraphDefinition`]). The execution engine
//! lives in `weft-engine`.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod descriptor;
pub mod error;
pub mod events;
pub mod graph;
pub mod packet;
pub mod report;
pub mod types;
pub mod value;

// Re-export key types at crate root for convenience
pub use descriptor::{ComponentInfo, ComponentSpec, PortDefinition, PortDirection, PortSpec, PortType};
pub use error::{FlowError, Result, ResultExt};
pub use events::{EventSink, NetworkEvent, NullSink, RingBufferSink, StampedEvent};
pub use graph::{ComponentRef, ConnectionDefinition, GraphDefinition, IipDefinition};
pub use packet::{Packet, PacketRole};
pub use report::{
    ComponentFailure, ComponentState, NetworkState, PacketCounters, RunReport, RunStatus,
};
pub use types::{NetworkId, PortRef};
pub use value::Value;
