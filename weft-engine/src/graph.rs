//! Runtime graph builder.
//!
//! A [`Graph`] collects components, connections, initial packets, and
//! exported boundary ports, validating every operation against the
//! components' declared ports. A built graph is handed to
//! [`Network`](crate::network::Network) for execution, or wrapped in a
//! [`SubGraph`](crate::subnet::SubGraph) to become a composite component.

use crate::component::Component;
use crate::registry::ComponentRegistry;
use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;
use std::sync::Arc;
use weft_core::descriptor::{ComponentInfo, PortDefinition, PortDirection};
use weft_core::error::{FlowError, Result};
use weft_core::graph::{
    ComponentRef, ConnectionDefinition, GraphDefinition, IipDefinition,
};
use weft_core::types::PortRef;
use weft_core::value::Value;

/// A component registered in a graph.
#[derive(Clone)]
pub(crate) struct ComponentEntry {
    pub component: Arc<dyn Component>,
    pub kind: String,
    pub info: ComponentInfo,
    pub metadata: HashMap<String, serde_json::Value>,
}

impl std::fmt::Debug for ComponentEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentEntry")
            .field("kind", &self.kind)
            .field("info", &self.info)
            .field("metadata", &self.metadata)
            .finish()
    }
}

/// A planned connection, materialized at network start.
#[derive(Debug, Clone)]
pub(crate) struct ConnectionPlan {
    pub src: PortRef,
    pub tgt: PortRef,
    pub capacity: Option<usize>,
}

/// A buildable graph of components.
#[derive(Clone, Default, Debug)]
pub struct Graph {
    name: String,
    components: HashMap<String, ComponentEntry>,
    order: Vec<String>,
    connections: Vec<ConnectionPlan>,
    iips: Vec<(PortRef, Value)>,
    inports: BTreeMap<String, PortRef>,
    outports: BTreeMap<String, PortRef>,
}

impl Graph {
    /// Create an empty graph.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// The graph's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    // Components --

    /// Register a component instance under a unique name.
    pub fn add_component(
        &mut self,
        name: impl Into<String>,
        component: Arc<dyn Component>,
    ) -> Result<()> {
        let name = name.into();
        if self.components.contains_key(&name) {
            return Err(FlowError::DuplicateComponent { name });
        }
        let info = component.info();
        let kind = info.name.clone();
        self.components.insert(
            name.clone(),
            ComponentEntry {
                component,
                kind,
                info,
                metadata: HashMap::new(),
            },
        );
        self.order.push(name);
        Ok(())
    }

    /// Register a component of a registered kind.
    pub fn add_component_kind(
        &mut self,
        name: impl Into<String>,
        kind: &str,
        registry: &ComponentRegistry,
    ) -> Result<()> {
        let component = registry.create(kind)?;
        self.add_component(name, component)
    }

    /// Remove a component together with its connections, initial packets,
    /// and exported ports.
    pub fn remove_component(&mut self, name: &str) -> Result<()> {
        if self.components.remove(name).is_none() {
            return Err(FlowError::UnknownComponent {
                name: name.to_string(),
            });
        }
        self.order.retain(|n| n != name);
        self.connections
            .retain(|c| c.src.component != name && c.tgt.component != name);
        self.iips.retain(|(port, _)| port.component != name);
        self.inports.retain(|_, port| port.component != name);
        self.outports.retain(|_, port| port.component != name);
        Ok(())
    }

    /// Whether a component with the given name exists.
    pub fn has_component(&self, name: &str) -> bool {
        self.components.contains_key(name)
    }

    /// The declared descriptor of a registered component.
    pub fn component_info(&self, name: &str) -> Result<&ComponentInfo> {
        self.entry(name).map(|e| &e.info)
    }

    /// Registered components as (name, kind), in registration order.
    pub fn list_components(&self) -> Vec<(String, String)> {
        self.order
            .iter()
            .map(|name| (name.clone(), self.components[name].kind.clone()))
            .collect()
    }

    /// All connections as serializable definitions.
    pub fn list_connections(&self) -> Vec<ConnectionDefinition> {
        self.connections
            .iter()
            .map(|plan| ConnectionDefinition {
                src: plan.src.clone(),
                tgt: plan.tgt.clone(),
                capacity: plan.capacity,
            })
            .collect()
    }

    /// All initial packets as serializable definitions.
    pub fn list_iips(&self) -> Vec<IipDefinition> {
        self.iips
            .iter()
            .map(|(port, value)| IipDefinition::new(port.clone(), value.clone()))
            .collect()
    }

    // Connections --

    /// Connect an output port to an input port using `component.port`
    /// references, with the default capacity.
    pub fn connect(&mut self, src: &str, tgt: &str) -> Result<()> {
        let (src, tgt) = (parse_ref(src)?, parse_ref(tgt)?);
        self.connect_ports(src, tgt, None)
    }

    /// Connect with an explicit queue capacity.
    pub fn connect_with_capacity(&mut self, src: &str, tgt: &str, capacity: usize) -> Result<()> {
        let (src, tgt) = (parse_ref(src)?, parse_ref(tgt)?);
        self.connect_ports(src, tgt, Some(capacity))
    }

    /// Connect resolved port references.
    pub fn connect_ports(
        &mut self,
        src: PortRef,
        tgt: PortRef,
        capacity: Option<usize>,
    ) -> Result<()> {
        if let Some(0) = capacity {
            return Err(FlowError::GraphStructure {
                cause: format!("connection {} -> {} has zero capacity", src, tgt),
            });
        }

        let src_def = self.resolve_port(&src, PortDirection::Out)?.clone();
        let tgt_def = self.resolve_port(&tgt, PortDirection::In)?.clone();

        if !src_def.port_type.agrees_with(&tgt_def.port_type) {
            return Err(FlowError::TypeMismatch {
                src: src.to_string(),
                tgt: tgt.to_string(),
                src_type: src_def.port_type.to_string(),
                tgt_type: tgt_def.port_type.to_string(),
            });
        }

        let src = self.assign_index(src, &src_def, PortDirection::Out)?;
        let tgt = self.assign_index(tgt, &tgt_def, PortDirection::In)?;

        // An input port element accepts one inbound connection, and never
        // alongside an initial packet.
        if self.connection_to(&tgt).is_some() {
            return Err(FlowError::DuplicateConnection {
                port: tgt.to_string(),
            });
        }
        if self.iip_for(&tgt).is_some() {
            return Err(FlowError::PortAlreadyInitialized {
                port: tgt.to_string(),
            });
        }

        // An output port element fans out only when declared to.
        if !src_def.fanout && self.connection_from(&src).is_some() {
            return Err(FlowError::DuplicateConnection {
                port: src.to_string(),
            });
        }

        self.connections.push(ConnectionPlan { src, tgt, capacity });
        Ok(())
    }

    /// Remove the connection between two port references.
    pub fn disconnect(&mut self, src: &str, tgt: &str) -> Result<()> {
        let (src, tgt) = (parse_ref(src)?, parse_ref(tgt)?);
        let position = self.connections.iter().position(|plan| {
            ref_matches(&plan.src, &src) && ref_matches(&plan.tgt, &tgt)
        });
        match position {
            Some(idx) => {
                self.connections.remove(idx);
                Ok(())
            }
            None => Err(FlowError::GraphStructure {
                cause: format!("no connection from {} to {}", src, tgt),
            }),
        }
    }

    // Initial packets --

    /// Attach an initial packet to an input port.
    pub fn initialize(&mut self, port: &str, value: impl Into<Value>) -> Result<()> {
        let port = parse_ref(port)?;
        self.initialize_port(port, value)
    }

    /// Attach an initial packet to a resolved port reference. The payload
    /// must satisfy the port's declared type.
    pub fn initialize_port(&mut self, port: PortRef, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        let def = self.resolve_port(&port, PortDirection::In)?.clone();
        if !def.port_type.accepts(&value) {
            return Err(FlowError::PayloadTypeMismatch {
                port: port.to_string(),
                expected: def.port_type.to_string(),
                actual: value.kind().to_string(),
            });
        }
        let port = self.assign_index(port, &def, PortDirection::In)?;

        if self.connection_to(&port).is_some() {
            return Err(FlowError::DuplicateConnection {
                port: port.to_string(),
            });
        }
        if self.iip_for(&port).is_some() {
            return Err(FlowError::PortAlreadyInitialized {
                port: port.to_string(),
            });
        }

        self.iips.push((port, value));
        Ok(())
    }

    /// Remove the initial packet from a port, returning its payload.
    pub fn uninitialize(&mut self, port: &str) -> Result<Value> {
        let port = parse_ref(port)?;
        let position = self
            .iips
            .iter()
            .position(|(p, _)| ref_matches(p, &port))
            .ok_or_else(|| FlowError::GraphStructure {
                cause: format!("port {} is not initialized", port),
            })?;
        Ok(self.iips.remove(position).1)
    }

    // Boundary ports --

    /// Export an internal port under an external name, making it a
    /// boundary port when this graph is wrapped as a composite.
    pub fn export(&mut self, internal: &str, external: impl Into<String>) -> Result<()> {
        let external = external.into();
        let port = parse_ref(internal)?;
        let direction = {
            let entry = self.entry(&port.component)?;
            entry
                .info
                .get_port(&port.port)
                .ok_or_else(|| FlowError::UnknownPort {
                    component: port.component.clone(),
                    port: port.port.clone(),
                })?
                .direction
        };

        let registry = match direction {
            PortDirection::In => &mut self.inports,
            PortDirection::Out => &mut self.outports,
        };
        if registry.contains_key(&external) {
            return Err(FlowError::GraphStructure {
                cause: format!("boundary port '{}' is already exported", external),
            });
        }
        registry.insert(external, port);
        Ok(())
    }

    /// Exported input ports (external name -> internal port).
    pub fn inports(&self) -> &BTreeMap<String, PortRef> {
        &self.inports
    }

    /// Exported output ports (external name -> internal port).
    pub fn outports(&self) -> &BTreeMap<String, PortRef> {
        &self.outports
    }

    // Array ports --

    /// Renumber the connected elements of an elastic array port so their
    /// indices become contiguous. Freed indices are reused only through
    /// this explicit compaction.
    pub fn compact_array(&mut self, component: &str, port: &str) -> Result<()> {
        let def = self
            .entry(component)?
            .info
            .get_port(port)
            .ok_or_else(|| FlowError::UnknownPort {
                component: component.to_string(),
                port: port.to_string(),
            })?
            .clone();
        if !def.array {
            return Err(FlowError::GraphStructure {
                cause: format!("port {}.{} is not an array port", component, port),
            });
        }

        let mut used: Vec<usize> = Vec::new();
        let select = |r: &PortRef| r.component == component && r.port == port;
        for plan in &self.connections {
            for r in [&plan.src, &plan.tgt] {
                if select(r) {
                    used.extend(r.index);
                }
            }
        }
        for (r, _) in &self.iips {
            if select(r) {
                used.extend(r.index);
            }
        }
        used.sort_unstable();
        used.dedup();

        let remap: HashMap<usize, usize> =
            used.into_iter().enumerate().map(|(new, old)| (old, new)).collect();
        let apply = |r: &mut PortRef| {
            if r.component == component && r.port == port {
                if let Some(old) = r.index {
                    r.index = Some(remap[&old]);
                }
            }
        };
        for plan in &mut self.connections {
            apply(&mut plan.src);
            apply(&mut plan.tgt);
        }
        for (r, _) in &mut self.iips {
            apply(r);
        }
        Ok(())
    }

    // Serialization --

    /// Serialize this graph to a definition document.
    pub fn to_definition(&self) -> GraphDefinition {
        let mut def = GraphDefinition::new(self.name.clone());
        for name in &self.order {
            let entry = &self.components[name];
            let mut component = ComponentRef::new(entry.kind.clone());
            component.metadata = entry.metadata.clone();
            def.components.insert(name.clone(), component);
        }
        def.connections = self.list_connections();
        def.iips = self.list_iips();
        def.inports = self.inports.clone().into_iter().collect();
        def.outports = self.outports.clone().into_iter().collect();
        def
    }

    /// Build a graph from a definition document, resolving component
    /// kinds against a registry.
    pub fn from_definition(def: &GraphDefinition, registry: &ComponentRegistry) -> Result<Self> {
        if let Err(errors) = def.validate() {
            let summary: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            return Err(FlowError::GraphStructure {
                cause: format!("definition invalid: {}", summary.join("; ")),
            });
        }

        let mut graph = Graph::new(def.name.clone());
        let mut names: Vec<&String> = def.components.keys().collect();
        names.sort();
        for name in names {
            let reference = &def.components[name];
            graph.add_component_kind(name.clone(), &reference.kind, registry)?;
            if let Some(entry) = graph.components.get_mut(name) {
                entry.metadata = reference.metadata.clone();
            }
        }
        for connection in &def.connections {
            graph.connect_ports(
                connection.src.clone(),
                connection.tgt.clone(),
                connection.capacity,
            )?;
        }
        for iip in &def.iips {
            graph.initialize_port(iip.tgt.clone(), iip.value.clone())?;
        }
        for (external, internal) in &def.inports {
            graph.export(&internal.to_string(), external.clone())?;
        }
        for (external, internal) in &def.outports {
            graph.export(&internal.to_string(), external.clone())?;
        }
        Ok(graph)
    }

    // Internal --

    pub(crate) fn entry(&self, name: &str) -> Result<&ComponentEntry> {
        self.components
            .get(name)
            .ok_or_else(|| FlowError::UnknownComponent {
                name: name.to_string(),
            })
    }

    pub(crate) fn order(&self) -> &[String] {
        &self.order
    }

    pub(crate) fn plans(&self) -> &[ConnectionPlan] {
        &self.connections
    }

    pub(crate) fn iips_raw(&self) -> &[(PortRef, Value)] {
        &self.iips
    }

    fn resolve_port(&self, port: &PortRef, direction: PortDirection) -> Result<&PortDefinition> {
        let entry = self.entry(&port.component)?;
        let def = entry
            .info
            .get_port(&port.port)
            .ok_or_else(|| FlowError::UnknownPort {
                component: port.component.clone(),
                port: port.port.clone(),
            })?;

        if def.direction != direction {
            return Err(FlowError::PortKindMismatch {
                port: port.to_string(),
                expected: direction.as_str(),
                actual: def.direction.as_str(),
            });
        }
        if port.index.is_some() && !def.array {
            return Err(FlowError::GraphStructure {
                cause: format!("index specified for non-array port {}", port),
            });
        }
        if let (Some(index), Some(size)) = (port.index, def.fixed_size) {
            if index >= size {
                return Err(FlowError::ArityExceeded {
                    port: PortRef::new(port.component.clone(), port.port.clone()).to_string(),
                    index,
                    arity: size,
                });
            }
        }
        Ok(def)
    }

    /// Fill in the element index for array ports: explicit indices pass
    /// through, unindexed references take the next index past the
    /// historical maximum (indices stay stable under disconnect).
    fn assign_index(
        &self,
        mut port: PortRef,
        def: &PortDefinition,
        direction: PortDirection,
    ) -> Result<PortRef> {
        if !def.array || port.index.is_some() {
            return Ok(port);
        }

        let mut next = 0_usize;
        let select = |r: &PortRef| r.component == port.component && r.port == port.port;
        for plan in &self.connections {
            let candidate = match direction {
                PortDirection::Out => &plan.src,
                PortDirection::In => &plan.tgt,
            };
            if select(candidate) {
                if let Some(index) = candidate.index {
                    next = next.max(index + 1);
                }
            }
        }
        if direction == PortDirection::In {
            for (r, _) in &self.iips {
                if select(r) {
                    if let Some(index) = r.index {
                        next = next.max(index + 1);
                    }
                }
            }
        }

        if let Some(size) = def.fixed_size {
            if next >= size {
                return Err(FlowError::ArityExceeded {
                    port: PortRef::new(port.component.clone(), port.port.clone()).to_string(),
                    index: next,
                    arity: size,
                });
            }
        }
        port.index = Some(next);
        Ok(port)
    }

    fn connection_to(&self, tgt: &PortRef) -> Option<&ConnectionPlan> {
        self.connections.iter().find(|plan| &plan.tgt == tgt)
    }

    fn connection_from(&self, src: &PortRef) -> Option<&ConnectionPlan> {
        self.connections.iter().find(|plan| &plan.src == src)
    }

    fn iip_for(&self, tgt: &PortRef) -> Option<&Value> {
        self.iips
            .iter()
            .find(|(port, _)| port == tgt)
            .map(|(_, value)| value)
    }
}

fn parse_ref(s: &str) -> Result<PortRef> {
    PortRef::from_str(s).map_err(|e| FlowError::GraphStructure {
        cause: format!("invalid port reference '{}': {}", s, e),
    })
}

/// Whether a stored reference matches a user-supplied one; a missing
/// index on the query side matches any element.
fn ref_matches(stored: &PortRef, query: &PortRef) -> bool {
    stored.component == query.component
        && stored.port == query.port
        && (query.index.is_none() || stored.index == query.index)
}
