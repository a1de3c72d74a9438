//! Convenience re-exports for component authors and embedders.

pub use crate::component::{Component, ComponentFuture, ProcessContext};
pub use crate::config::{DeadlockPolicy, NetworkConfig};
pub use crate::graph::Graph;
pub use crate::network::{Network, NetworkHandle};
pub use crate::port::{InputHandle, OutputHandle};
pub use crate::registry::{ComponentFactory, ComponentRegistry};
pub use crate::subnet::SubGraph;

pub use std::sync::Arc;

pub use weft_core::descriptor::{
    ComponentInfo, ComponentSpec, PortDefinition, PortDirection, PortType,
};
pub use weft_core::error::{FlowError, Result};
pub use weft_core::events::{EventSink, NetworkEvent, RingBufferSink};
pub use weft_core::graph::GraphDefinition;
pub use weft_core::packet::{Packet, PacketRole};
pub use weft_core::report::{ComponentState, NetworkState, RunReport, RunStatus};
pub use weft_core::types::PortRef;
pub use weft_core::value::Value;
