//! The component contract.
//!
//! A component kind is a pair: a static descriptor ([`ComponentInfo`]) and
//! a body. The body runs exactly once per network run, with a
//! [`ProcessContext`] holding handles to the declared ports. It consumes
//! inputs until end-of-stream, emits outputs, and returns; handles and
//! packets must not outlive the activation (the context is consumed by the
//! call, and the runtime closes all ports when the body returns).

use crate::port::{InputHandle, OutputHandle};
use crate::runtime::RuntimeShared;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use weft_core::descriptor::ComponentInfo;
use weft_core::error::{FlowError, Result};
use weft_core::packet::Packet;
use weft_core::value::Value;

/// A boxed future for component body execution.
pub type ComponentFuture<'a> = Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

/// The core trait implemented by all components.
///
/// # Example
///
/// ```ignore
/// use weft_engine::prelude::*;
///
/// struct Doubler;
///
/// impl Component for Doubler {
///     fn info(&self) -> ComponentInfo {
///         ComponentInfo::new("demo", "doubler")
///             .with_inputs(vec![PortDefinition::input("IN", PortType::Number)])
///             .with_outputs(vec![PortDefinition::output("OUT", PortType::Number)])
///     }
///
///     fn execute(&self, ctx: ProcessContext) -> ComponentFuture<'_> {
///         Box::pin(async move {
///             let input = ctx.input("IN")?;
///             let out = ctx.output("OUT")?;
///             while let Some(v) = input.receive_value().await? {
///                 let n = v.as_f64().unwrap_or(0.0);
///                 out.send_value(n * 2.0).await?;
///             }
///             Ok(())
///         })
///     }
/// }
/// ```
pub trait Component: Send + Sync {
    /// Get the static descriptor for this component kind.
    fn info(&self) -> ComponentInfo;

    /// Run the component body.
    fn execute(&self, ctx: ProcessContext) -> ComponentFuture<'_>;
}

impl std::fmt::Debug for dyn Component {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Component({})", self.info().name)
    }
}

/// An input port slot: a single handle, or the elements of an array port.
pub(crate) enum InputSlot {
    Single(InputHandle),
    Array(Vec<InputHandle>),
}

/// An output port slot: a single handle, or the elements of an array port.
pub(crate) enum OutputSlot {
    Single(OutputHandle),
    Array(Vec<OutputHandle>),
}

/// The port handles and packet accounting for one component activation.
pub struct ProcessContext {
    component: String,
    inputs: HashMap<String, InputSlot>,
    outputs: HashMap<String, OutputSlot>,
    shared: Arc<RuntimeShared>,
    owned: Arc<AtomicI64>,
}

impl ProcessContext {
    pub(crate) fn new(
        component: String,
        inputs: HashMap<String, InputSlot>,
        outputs: HashMap<String, OutputSlot>,
        shared: Arc<RuntimeShared>,
        owned: Arc<AtomicI64>,
    ) -> Self {
        Self {
            component,
            inputs,
            outputs,
            shared,
            owned,
        }
    }

    /// The component's name within its graph.
    pub fn name(&self) -> &str {
        &self.component
    }

    /// Handle to a declared single input port.
    pub fn input(&self, name: &str) -> Result<&InputHandle> {
        match self.inputs.get(name) {
            Some(InputSlot::Single(handle)) => Ok(handle),
            Some(InputSlot::Array(_)) => Err(FlowError::GraphStructure {
                cause: format!(
                    "port {}.{} is an array port; use input_array",
                    self.component, name
                ),
            }),
            None => Err(FlowError::UnknownPort {
                component: self.component.clone(),
                port: name.to_string(),
            }),
        }
    }

    /// Handles to the connected elements of a declared array input port,
    /// in index order.
    pub fn input_array(&self, name: &str) -> Result<&[InputHandle]> {
        match self.inputs.get(name) {
            Some(InputSlot::Array(handles)) => Ok(handles),
            Some(InputSlot::Single(_)) => Err(FlowError::GraphStructure {
                cause: format!(
                    "port {}.{} is not an array port; use input",
                    self.component, name
                ),
            }),
            None => Err(FlowError::UnknownPort {
                component: self.component.clone(),
                port: name.to_string(),
            }),
        }
    }

    /// Handle to a declared single output port.
    pub fn output(&self, name: &str) -> Result<&OutputHandle> {
        match self.outputs.get(name) {
            Some(OutputSlot::Single(handle)) => Ok(handle),
            Some(OutputSlot::Array(_)) => Err(FlowError::GraphStructure {
                cause: format!(
                    "port {}.{} is an array port; use output_array",
                    self.component, name
                ),
            }),
            None => Err(FlowError::UnknownPort {
                component: self.component.clone(),
                port: name.to_string(),
            }),
        }
    }

    /// Handles to the connected elements of a declared array output port,
    /// in index order.
    pub fn output_array(&self, name: &str) -> Result<&[OutputHandle]> {
        match self.outputs.get(name) {
            Some(OutputSlot::Array(handles)) => Ok(handles),
            Some(OutputSlot::Single(_)) => Err(FlowError::GraphStructure {
                cause: format!(
                    "port {}.{} is not an array port; use output",
                    self.component, name
                ),
            }),
            None => Err(FlowError::UnknownPort {
                component: self.component.clone(),
                port: name.to_string(),
            }),
        }
    }

    /// Create a packet owned by this component.
    pub fn create(&self, value: impl Into<Value>) -> Packet {
        self.owned.fetch_add(1, Ordering::Relaxed);
        self.shared
            .counters
            .creates
            .fetch_add(1, Ordering::Relaxed);
        Packet::new(value)
    }

    /// Release a packet this component owns, returning its payload.
    pub fn release(&self, packet: Packet) -> Value {
        self.owned.fetch_sub(1, Ordering::Relaxed);
        self.shared.counters.drops.fetch_add(1, Ordering::Relaxed);
        packet.into_payload()
    }

    /// The number of packets this component currently owns.
    pub fn owned_packets(&self) -> i64 {
        self.owned.load(Ordering::Relaxed)
    }

    /// Move a single input handle out of the context. Used by composites
    /// to hand boundary ports to bridge bodies.
    pub(crate) fn take_input(&mut self, name: &str) -> Result<InputHandle> {
        match self.inputs.remove(name) {
            Some(InputSlot::Single(handle)) => Ok(handle),
            Some(slot) => {
                self.inputs.insert(name.to_string(), slot);
                Err(FlowError::GraphStructure {
                    cause: format!("cannot take array port {}.{}", self.component, name),
                })
            }
            None => Err(FlowError::UnknownPort {
                component: self.component.clone(),
                port: name.to_string(),
            }),
        }
    }

    /// Move a single output handle out of the context.
    pub(crate) fn take_output(&mut self, name: &str) -> Result<OutputHandle> {
        match self.outputs.remove(name) {
            Some(OutputSlot::Single(handle)) => Ok(handle),
            Some(slot) => {
                self.outputs.insert(name.to_string(), slot);
                Err(FlowError::GraphStructure {
                    cause: format!("cannot take array port {}.{}", self.component, name),
                })
            }
            None => Err(FlowError::UnknownPort {
                component: self.component.clone(),
                port: name.to_string(),
            }),
        }
    }

    pub(crate) fn shared(&self) -> &Arc<RuntimeShared> {
        &self.shared
    }

    pub(crate) fn owned_counter(&self) -> &Arc<AtomicI64> {
        &self.owned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::InputSource;
    use parking_lot::Mutex;
    use weft_core::events::NullSink;
    use weft_core::types::PortRef;

    fn context_with_one_input() -> ProcessContext {
        let shared = Arc::new(RuntimeShared::new(
            "test".to_string(),
            Arc::new(NullSink),
            false,
        ));
        let owned = Arc::new(AtomicI64::new(0));
        let mut inputs = HashMap::new();
        inputs.insert(
            "IN".to_string(),
            InputSlot::Single(InputHandle::new(
                PortRef::new("c", "IN"),
                false,
                InputSource::Initial(Mutex::new(Some(Value::int(1)))),
                Arc::clone(&shared),
                Arc::clone(&owned),
            )),
        );
        ProcessContext::new("c".to_string(), inputs, HashMap::new(), shared, owned)
    }

    #[test]
    fn port_lookup() {
        let ctx = context_with_one_input();
        assert!(ctx.input("IN").is_ok());
        assert_eq!(ctx.input("MISSING").unwrap_err().code(), "E102");
        assert_eq!(ctx.output("OUT").unwrap_err().code(), "E102");
        assert_eq!(ctx.input_array("IN").unwrap_err().code(), "E110");
    }

    #[test]
    fn create_and_release_balance() {
        let ctx = context_with_one_input();
        let packet = ctx.create("data");
        assert_eq!(ctx.owned_packets(), 1);
        let value = ctx.release(packet);
        assert_eq!(value.as_string(), Some("data".to_string()));
        assert_eq!(ctx.owned_packets(), 0);
    }

    #[test]
    fn take_input_removes_handle() {
        let mut ctx = context_with_one_input();
        assert!(ctx.take_input("IN").is_ok());
        assert_eq!(ctx.input("IN").unwrap_err().code(), "E102");
        assert_eq!(ctx.take_input("IN").unwrap_err().code(), "E102");
    }
}
