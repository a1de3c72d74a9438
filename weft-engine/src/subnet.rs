//! Composite components.
//!
//! A [`SubGraph`] wraps a [`Graph`] as a component: the graph's exported
//! ports become the composite's declared ports. At activation, hidden
//! boundary bodies pump packets between the outer handles and the inner
//! network, so from either side the boundary looks like an ordinary
//! connection. Composites nest arbitrarily. The inner network runs
//! without its own deadlock monitor; whole-graph analysis belongs to the
//! root.

use crate::component::{Component, ComponentFuture, ProcessContext};
use crate::config::NetworkConfig;
use crate::graph::Graph;
use crate::network::Network;
use crate::port::{InputHandle, OutputHandle};
use parking_lot::Mutex;
use std::sync::Arc;
use weft_core::descriptor::{ComponentInfo, PortDefinition, PortDirection};
use weft_core::error::{FlowError, Result};

/// A component whose body is an inner network.
pub struct SubGraph {
    graph: Graph,
    info: ComponentInfo,
}

impl SubGraph {
    /// Wrap a graph as a composite component. The graph must export at
    /// least one port; exported names become the composite's port names.
    pub fn new(name: impl Into<String>, graph: Graph) -> Result<Self> {
        let name = name.into();
        if graph.inports().is_empty() && graph.outports().is_empty() {
            return Err(FlowError::GraphStructure {
                cause: format!("composite '{}' exports no ports", name),
            });
        }

        let mut inputs = Vec::new();
        for (external, internal) in graph.inports() {
            inputs.push(boundary_definition(&graph, external, internal, PortDirection::In)?);
        }
        let mut outputs = Vec::new();
        for (external, internal) in graph.outports() {
            outputs.push(boundary_definition(&graph, external, internal, PortDirection::Out)?);
        }

        let info = ComponentInfo::new("graph", name)
            .with_description(format!("Composite over graph '{}'", graph.name()))
            .with_inputs(inputs)
            .with_outputs(outputs)
            .composite();

        Ok(Self { graph, info })
    }
}

/// Derive the composite's port declaration from the internal port it
/// bridges to, renamed to the exported name.
fn boundary_definition(
    graph: &Graph,
    external: &str,
    internal: &weft_core::types::PortRef,
    direction: PortDirection,
) -> Result<PortDefinition> {
    let info = graph.component_info(&internal.component)?;
    let def = info
        .get_port(&internal.port)
        .ok_or_else(|| FlowError::UnknownPort {
            component: internal.component.clone(),
            port: internal.port.clone(),
        })?;
    if def.direction != direction {
        return Err(FlowError::PortKindMismatch {
            port: internal.to_string(),
            expected: direction.as_str(),
            actual: def.direction.as_str(),
        });
    }
    let mut def = def.clone();
    def.name = external.to_string();
    Ok(def)
}

impl Component for SubGraph {
    fn info(&self) -> ComponentInfo {
        self.info.clone()
    }

    fn execute(&self, ctx: ProcessContext) -> ComponentFuture<'_> {
        Box::pin(async move {
            let mut ctx = ctx;
            let composite = ctx.name().to_string();
            let mut inner = self.graph.clone();

            // Splice boundary bodies between the outer handles and the
            // inner ports.
            for (external, internal) in self.graph.inports() {
                let handle = ctx.take_input(external)?;
                let bridge = format!("_{}", external);
                inner.add_component(bridge.clone(), Arc::new(BoundaryIn::new(handle)))?;
                inner.connect_ports(
                    weft_core::types::PortRef::new(bridge, "OUT"),
                    internal.clone(),
                    None,
                )?;
            }
            for (external, internal) in self.graph.outports() {
                let handle = ctx.take_output(external)?;
                let bridge = format!("_{}", external);
                inner.add_component(bridge.clone(), Arc::new(BoundaryOut::new(handle)))?;
                inner.connect_ports(
                    internal.clone(),
                    weft_core::types::PortRef::new(bridge, "IN"),
                    None,
                )?;
            }

            let config = NetworkConfig::default().with_deadlock_scan_interval(None);
            let mut network = Network::new(inner).with_config(config);
            network.adopt(ctx.shared());

            tracing::debug!(composite = %composite, "Starting inner network");
            let report = network.run().await?;

            if !report.failures.is_empty() {
                let summary: Vec<String> =
                    report.failures.iter().map(|f| f.to_string()).collect();
                return Err(FlowError::ComponentFailed {
                    component: composite,
                    cause: format!("inner network failed: {}", summary.join("; ")),
                });
            }
            Ok(())
        })
    }
}

/// Pumps packets from a composite's outer input into the inner network.
struct BoundaryIn {
    external: Mutex<Option<InputHandle>>,
}

impl BoundaryIn {
    fn new(handle: InputHandle) -> Self {
        Self {
            external: Mutex::new(Some(handle)),
        }
    }
}

impl Component for BoundaryIn {
    fn info(&self) -> ComponentInfo {
        ComponentInfo::new("graph", "boundary-in")
            .with_outputs(vec![PortDefinition::output(
                "OUT",
                weft_core::descriptor::PortType::Any,
            )])
    }

    fn execute(&self, ctx: ProcessContext) -> ComponentFuture<'_> {
        Box::pin(async move {
            let mut external = self
                .external
                .lock()
                .take()
                .ok_or_else(|| FlowError::GraphStructure {
                    cause: "boundary body activated twice".to_string(),
                })?;
            external.retag_owner(Arc::clone(ctx.owned_counter()));

            let out = ctx.output("OUT")?;
            while let Some(packet) = external.receive().await? {
                out.send(packet).await?;
            }
            external.close();
            Ok(())
        })
    }
}

/// Pumps packets from the inner network out through a composite's outer
/// output.
struct BoundaryOut {
    external: Mutex<Option<OutputHandle>>,
}

impl BoundaryOut {
    fn new(handle: OutputHandle) -> Self {
        Self {
            external: Mutex::new(Some(handle)),
        }
    }
}

impl Component for BoundaryOut {
    fn info(&self) -> ComponentInfo {
        ComponentInfo::new("graph", "boundary-out")
            .with_inputs(vec![
                PortDefinition::input("IN", weft_core::descriptor::PortType::Any).optional(),
            ])
    }

    fn execute(&self, ctx: ProcessContext) -> ComponentFuture<'_> {
        Box::pin(async move {
            let mut external = self
                .external
                .lock()
                .take()
                .ok_or_else(|| FlowError::GraphStructure {
                    cause: "boundary body activated twice".to_string(),
                })?;
            external.retag_owner(Arc::clone(ctx.owned_counter()));

            let input = ctx.input("IN")?;
            while let Some(packet) = input.receive().await? {
                external.send(packet).await?;
            }
            external.close();
            Ok(())
        })
    }
}
