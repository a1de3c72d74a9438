//! Weft execution engine.
//!
//! This crate runs flow graphs: components connected by bounded FIFO
//! connections, scheduled cooperatively, driven from start to quiescence.
//!
//! # Overview
//!
//! - [`Graph`] builds the network: register components, connect ports,
//!   attach initial packets, export boundary ports.
//! - [`Component`] is the contract user code implements: a static
//!   descriptor plus an async body over [`ProcessContext`] port handles.
//! - [`Network`] executes a graph: one task per component, backpressure
//!   through connection capacity, deadlock detection, error aggregation,
//!   cancellation with a grace period.
//! - [`SubGraph`] wraps a graph as a component with bridged boundary
//!   ports.
//! - [`ComponentRegistry`] resolves kind strings for serialized graph
//!   descriptions and powers `describe`/`list` introspection.
//!
//! # Example
//!
//! ```ignore
//! use weft_engine::prelude::*;
//!
//! let mut graph = Graph::new("demo");
//! graph.add_component("source", Arc::new(Inject))?;
//! graph.add_component("sink", Arc::new(Discard))?;
//! graph.initialize("source.CONST", "hello")?;
//! graph.connect("source.OUT", "sink.IN")?;
//!
//! let report = Network::new(graph).run().await?;
//! assert!(report.is_success());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod component;
pub mod config;
pub mod connection;
pub mod graph;
pub mod network;
pub mod port;
pub mod prelude;
pub mod registry;
mod runtime;
pub mod subnet;

// Re-export key types at crate root for convenience
pub use component::{Component, ComponentFuture, ProcessContext};
pub use config::{DeadlockPolicy, NetworkConfig};
pub use connection::Connection;
pub use graph::Graph;
pub use network::{Network, NetworkHandle};
pub use port::{InputHandle, OutputHandle};
pub use registry::{ComponentFactory, ComponentRegistry};
pub use subnet::SubGraph;
