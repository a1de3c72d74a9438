//! Network execution.
//!
//! A [`Network`] wraps a built [`Graph`] and drives it from start to
//! quiescence: it materializes the planned connections, spawns one task
//! per component, watches for deadlock, and aggregates failures into a
//! [`RunReport`].
//!
//! ## Scheduling
//!
//! Every component body runs as its own tokio task. Suspension points are
//! exactly the bounded-connection operations, so scheduler decisions only
//! happen at channel boundaries and intra-connection FIFO order is
//! preserved. The network is quiescent when every task has finished and
//! every connection is empty.
//!
//! ## Error policy
//!
//! The first body error does not terminate peers: the failing component's
//! ports close in both directions (downstreams observe end-of-stream,
//! upstreams observe refused sends) and the rest of the network runs to
//! natural completion. `terminate()` wakes every pending port operation
//! with a cancellation signal; tasks that ignore it are force-aborted
//! after the configured grace period and their outstanding packets are
//! reported as leaks.

use crate::component::{Component, InputSlot, OutputSlot, ProcessContext};
use crate::config::{DeadlockPolicy, NetworkConfig};
use crate::connection::Connection;
use crate::graph::Graph;
use crate::port::{InputHandle, InputSource, OutputHandle};
use crate::runtime::RuntimeShared;
use futures::FutureExt;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use weft_core::descriptor::{PortDefinition, PortDirection};
use weft_core::error::{FlowError, Result};
use weft_core::events::{EventSink, NetworkEvent, RingBufferSink};
use weft_core::report::{
    ComponentFailure, ComponentState, NetworkState, RunReport, RunStatus,
};
use weft_core::types::PortRef;

/// Connections to close when a component's body returns, in both
/// directions.
struct PortCleanup {
    inputs: Vec<(Arc<Connection>, bool)>,
    outputs: Vec<Arc<Connection>>,
}

/// Everything needed to run one component as a task.
struct TaskSpec {
    name: String,
    component: Arc<dyn Component>,
    ctx: ProcessContext,
    cleanup: PortCleanup,
    owned: Arc<AtomicI64>,
}

/// An executable network.
pub struct Network {
    graph: Graph,
    config: NetworkConfig,
    shared: Arc<RuntimeShared>,
}

impl Network {
    /// Create a network over a built graph with default configuration and
    /// a ring-buffer event sink.
    pub fn new(graph: Graph) -> Self {
        let config = NetworkConfig::default();
        let events: Arc<dyn EventSink> = Arc::new(RingBufferSink::with_default_capacity());
        let shared = Arc::new(RuntimeShared::new(
            graph.name().to_string(),
            events,
            config.validate_brackets,
        ));
        Self {
            graph,
            config,
            shared,
        }
    }

    /// Replace the configuration. Call before `handle()` or `run()`.
    pub fn with_config(mut self, config: NetworkConfig) -> Self {
        self.shared = Arc::new(RuntimeShared::new(
            self.graph.name().to_string(),
            Arc::clone(&self.shared.events),
            config.validate_brackets,
        ));
        self.config = config;
        self
    }

    /// Replace the event sink. Call before `handle()` or `run()`.
    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.shared = Arc::new(RuntimeShared::new(
            self.graph.name().to_string(),
            events,
            self.config.validate_brackets,
        ));
        self
    }

    /// The event sink this network emits to.
    pub fn events(&self) -> Arc<dyn EventSink> {
        Arc::clone(&self.shared.events)
    }

    /// A control handle for terminating and observing the run.
    pub fn handle(&self) -> NetworkHandle {
        NetworkHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// The underlying graph.
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Link this network under a parent runtime: counters are shared, the
    /// parent's deadlock scan sees this network's activity, and parent
    /// cancellation propagates here. Used by composites.
    pub(crate) fn adopt(&mut self, parent: &Arc<RuntimeShared>) {
        let shared = Arc::new(RuntimeShared::with_counters(
            self.graph.name().to_string(),
            Arc::clone(&parent.events),
            self.config.validate_brackets,
            Arc::clone(&parent.counters),
        ));
        self.shared = Arc::clone(&shared);
        parent.register_child(shared);
    }

    /// The network's current run state.
    pub fn state(&self) -> NetworkState {
        *self.shared.network_state.lock()
    }

    /// Execute the network to quiescence.
    ///
    /// Returns the run report on any completed run, including errored,
    /// deadlocked, and cancelled ones. An `Err` is returned only for
    /// build-level problems (validation failures, repeated `run`).
    pub async fn run(&mut self) -> Result<RunReport> {
        {
            let mut state = self.shared.network_state.lock();
            if *state != NetworkState::Idle {
                return Err(FlowError::NetworkNotIdle {
                    operation: "run".to_string(),
                });
            }
            *state = NetworkState::Running;
        }

        let specs = match materialize(&self.graph, &self.shared, &self.config) {
            Ok(specs) => specs,
            Err(e) => {
                // Build-time failure: the graph is untouched, the network
                // stays buildable.
                *self.shared.network_state.lock() = NetworkState::Idle;
                return Err(e);
            }
        };

        let started = Instant::now();
        let shared = Arc::clone(&self.shared);
        let connections: Vec<Arc<Connection>> = specs
            .iter()
            .flat_map(|s| s.cleanup.inputs.iter().map(|(c, _)| Arc::clone(c)))
            .collect();
        let names: Vec<String> = specs.iter().map(|s| s.name.clone()).collect();
        let counters_by_component: HashMap<String, Arc<AtomicI64>> = specs
            .iter()
            .map(|s| (s.name.clone(), Arc::clone(&s.owned)))
            .collect();

        for name in &names {
            shared.set_state(name, ComponentState::NotInitialized);
        }

        tracing::info!(network = %shared.network_name, components = names.len(), "Network starting");
        shared.events.emit(NetworkEvent::NetworkStarted {
            network: shared.network_name.clone(),
        });

        let mut tasks: JoinSet<()> = JoinSet::new();
        for spec in specs {
            tasks.spawn(run_component(spec, Arc::clone(&shared)));
        }

        let monitor = self.config.deadlock_scan_interval.map(|interval| {
            tokio::spawn(deadlock_monitor(
                Arc::clone(&shared),
                connections.clone(),
                names.clone(),
                interval,
                self.config.deadlock_policy,
            ))
        });

        let aborted = join_all(&mut tasks, &shared, self.config.grace_period).await;
        if let Some(monitor) = monitor {
            monitor.abort();
        }

        if aborted {
            // Force-abandoned components cannot report; read their
            // counters directly.
            for (name, owned) in &counters_by_component {
                let state = shared.component_state(name);
                if !state.is_some_and(|s| s.is_terminal()) {
                    shared.set_state(name, ComponentState::Errored);
                    let count = owned.load(Ordering::Relaxed);
                    if count != 0 {
                        shared.record_failure(ComponentFailure::from_error(
                            name.clone(),
                            &FlowError::PacketLeak {
                                component: name.clone(),
                                count,
                            },
                        ));
                    }
                }
            }
        }

        let suspended = shared.deadlocked.lock().clone().unwrap_or_default();
        let failures = shared.failures.lock().clone();
        let status = if !suspended.is_empty() {
            RunStatus::Deadlocked
        } else if shared.is_cancelled() {
            RunStatus::Cancelled
        } else if !failures.is_empty() {
            RunStatus::Errored
        } else {
            RunStatus::Completed
        };

        if status == RunStatus::Completed {
            for conn in &connections {
                if !conn.is_empty() {
                    tracing::warn!(
                        connection = %conn.tgt(),
                        queued = conn.len(),
                        "Connection not empty at quiescence"
                    );
                }
            }
        }

        *self.shared.network_state.lock() = match status {
            RunStatus::Completed | RunStatus::Cancelled => NetworkState::Terminated,
            RunStatus::Errored | RunStatus::Deadlocked => NetworkState::Errored,
        };

        let report = RunReport {
            status,
            failures,
            suspended,
            counters: shared.counters.snapshot(),
            elapsed_ms: started.elapsed().as_millis() as u64,
        };

        shared.events.emit(NetworkEvent::NetworkTerminated {
            network: shared.network_name.clone(),
        });
        tracing::info!(
            network = %shared.network_name,
            status = ?report.status,
            sends = report.counters.sends,
            receives = report.counters.receives,
            creates = report.counters.creates,
            drops = report.counters.drops,
            elapsed_ms = report.elapsed_ms,
            "Run complete"
        );

        Ok(report)
    }
}

/// Control handle over a (possibly running) network.
#[derive(Clone)]
pub struct NetworkHandle {
    shared: Arc<RuntimeShared>,
}

impl NetworkHandle {
    /// Request cancellation: every pending port operation wakes with a
    /// cancellation signal.
    pub fn terminate(&self) {
        self.shared.cancel();
    }

    /// The network's current run state.
    pub fn status(&self) -> NetworkState {
        *self.shared.network_state.lock()
    }

    /// A component's current lifecycle state.
    pub fn component_state(&self, component: &str) -> Option<ComponentState> {
        self.shared.component_state(component)
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.shared.is_cancelled()
    }
}

/// Drive the join set to completion, honoring cancellation with a grace
/// period. Returns whether tasks were force-aborted.
async fn join_all(
    tasks: &mut JoinSet<()>,
    shared: &Arc<RuntimeShared>,
    grace: Duration,
) -> bool {
    let mut deadline: Option<tokio::time::Instant> = None;

    loop {
        if deadline.is_none() && shared.is_cancelled() {
            deadline = Some(tokio::time::Instant::now() + grace);
        }

        match deadline {
            None => {
                tokio::select! {
                    joined = tasks.join_next() => {
                        if joined.is_none() {
                            return false;
                        }
                    }
                    _ = shared.cancel_notify.notified() => {}
                }
            }
            Some(at) => match tokio::time::timeout_at(at, tasks.join_next()).await {
                Ok(Some(_)) => {}
                Ok(None) => return false,
                Err(_) => {
                    tracing::warn!(
                        network = %shared.network_name,
                        remaining = tasks.len(),
                        "Grace period expired; aborting remaining components"
                    );
                    tasks.abort_all();
                    while tasks.join_next().await.is_some() {}
                    return true;
                }
            },
        }
    }
}

/// Run one component body, then close its ports in both directions and
/// record the outcome.
async fn run_component(spec: TaskSpec, shared: Arc<RuntimeShared>) {
    let TaskSpec {
        name,
        component,
        ctx,
        cleanup,
        owned,
    } = spec;

    shared.set_state(&name, ComponentState::Active);
    shared.events.emit(NetworkEvent::ComponentStarted {
        component: name.clone(),
    });
    tracing::debug!(component = %name, "Activated");

    let outcome = AssertUnwindSafe(component.execute(ctx)).catch_unwind().await;

    for conn in &cleanup.outputs {
        conn.close_sender();
    }
    for (conn, drop_tolerant) in &cleanup.inputs {
        conn.close_receiver(&shared, *drop_tolerant);
    }

    match outcome {
        Err(panic) => {
            let message = panic_message(panic);
            let error = FlowError::ComponentPanicked {
                component: name.clone(),
                message,
            };
            finish_errored(&shared, &name, &error);
        }
        Ok(Err(error)) if error.is_cancellation() => {
            shared.set_state(&name, ComponentState::Terminated);
            shared.events.emit(NetworkEvent::ComponentTerminated {
                component: name.clone(),
            });
            tracing::debug!(component = %name, "Terminated by cancellation");
        }
        Ok(Err(error)) => {
            finish_errored(&shared, &name, &error);
        }
        Ok(Ok(())) => {
            let count = owned.load(Ordering::Relaxed);
            if count != 0 {
                let error = FlowError::PacketLeak {
                    component: name.clone(),
                    count,
                };
                finish_errored(&shared, &name, &error);
            } else {
                shared.set_state(&name, ComponentState::Terminated);
                shared.events.emit(NetworkEvent::ComponentTerminated {
                    component: name.clone(),
                });
                tracing::debug!(component = %name, "Deactivated");
            }
        }
    }
}

fn finish_errored(shared: &Arc<RuntimeShared>, name: &str, error: &FlowError) {
    let context = shared.blocked_port(name);
    let mut failure = ComponentFailure::from_error(name, error);
    if let Some(port) = context.clone() {
        failure = failure.with_port_context(port);
    }
    shared.record_failure(failure);
    shared.set_state(name, ComponentState::Errored);
    shared.events.emit(NetworkEvent::ComponentErrored {
        component: name.to_string(),
        message: error.to_string(),
        context,
    });
}

fn panic_message(panic: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// A deadlock candidate: every live component blocked on a port
/// operation. Confirmed only when two consecutive scans see the same
/// blocked set with no packet movement in between.
#[derive(PartialEq)]
struct DeadlockScan {
    suspended: Vec<(String, String, ComponentState)>,
    sends: u64,
    receives: u64,
}

/// Confirm a deadlock with two identical consecutive scans, then apply
/// the configured policy.
async fn deadlock_monitor(
    shared: Arc<RuntimeShared>,
    connections: Vec<Arc<Connection>>,
    names: Vec<String>,
    interval: Duration,
    policy: DeadlockPolicy,
) {
    let mut previous: Option<DeadlockScan> = None;

    loop {
        tokio::time::sleep(interval).await;
        if shared.is_cancelled() {
            return;
        }

        let scan = match suspended_scan(&shared, &names) {
            Some(scan) => scan,
            None => {
                previous = None;
                continue;
            }
        };

        if previous.as_ref() == Some(&scan) {
            let suspended: Vec<String> =
                scan.suspended.iter().map(|(name, _, _)| name.clone()).collect();
            for (name, port, state) in &scan.suspended {
                tracing::error!(component = %name, port = %port, state = %state, "Suspended");
            }
            tracing::error!(network = %shared.network_name, "Network has deadlocked");

            shared.record_deadlock(suspended.clone());
            shared.events.emit(NetworkEvent::NetworkDeadlocked { suspended });

            match policy {
                DeadlockPolicy::Abort => shared.cancel(),
                DeadlockPolicy::Drain => {
                    for conn in &connections {
                        conn.close_sender();
                    }
                }
            }
            return;
        }
        previous = Some(scan);
    }
}

/// Returns the blocked set when no component is runnable: every
/// non-terminated component is suspended on a send or receive. Any
/// active (or not-yet-started) component rules a deadlock out.
fn suspended_scan(shared: &RuntimeShared, names: &[String]) -> Option<DeadlockScan> {
    let mut suspended = Vec::new();
    for name in names {
        match shared.component_state(name) {
            Some(ComponentState::Terminated) | Some(ComponentState::Errored) => {}
            Some(state @ ComponentState::SuspendedReceive)
            | Some(state @ ComponentState::SuspendedSend) => {
                suspended.push((
                    name.clone(),
                    shared.blocked_port(name).unwrap_or_default(),
                    state,
                ));
            }
            _ => return None,
        }
    }
    if suspended.is_empty() {
        return None;
    }
    // Activity inside composites counts: a busy inner network means the
    // boundary will move again.
    if shared.children_runnable() {
        return None;
    }
    suspended.sort_by(|a, b| a.0.cmp(&b.0));
    let counters = shared.counters.snapshot();
    Some(DeadlockScan {
        suspended,
        sends: counters.sends,
        receives: counters.receives,
    })
}

/// Build connections and per-component contexts from the graph's plans.
fn materialize(
    graph: &Graph,
    shared: &Arc<RuntimeShared>,
    config: &NetworkConfig,
) -> Result<Vec<TaskSpec>> {
    // One connection per plan.
    let mut by_tgt: HashMap<PortRef, Arc<Connection>> = HashMap::new();
    let mut by_src: HashMap<PortRef, Vec<Arc<Connection>>> = HashMap::new();
    for plan in graph.plans() {
        let capacity = plan.capacity.unwrap_or(config.default_capacity);
        let conn = Connection::new(plan.src.clone(), plan.tgt.clone(), capacity);
        by_tgt.insert(plan.tgt.clone(), Arc::clone(&conn));
        by_src.entry(plan.src.clone()).or_default().push(conn);
    }
    let mut iips: HashMap<PortRef, weft_core::value::Value> = HashMap::new();
    for (port, value) in graph.iips_raw() {
        iips.insert(port.clone(), value.clone());
    }

    let mut specs = Vec::new();
    for name in graph.order() {
        let entry = graph.entry(name)?;
        let owned = Arc::new(AtomicI64::new(0));
        let mut inputs = HashMap::new();
        let mut outputs = HashMap::new();
        let mut cleanup = PortCleanup {
            inputs: Vec::new(),
            outputs: Vec::new(),
        };

        for def in &entry.info.inputs {
            let slot = build_input_slot(
                name, def, &by_tgt, &mut iips, shared, &owned, &mut cleanup,
            )?;
            inputs.insert(def.name.clone(), slot);
        }
        for def in &entry.info.outputs {
            let slot = build_output_slot(name, def, &by_src, shared, &owned, &mut cleanup);
            outputs.insert(def.name.clone(), slot);
        }

        specs.push(TaskSpec {
            name: name.clone(),
            component: Arc::clone(&entry.component),
            ctx: ProcessContext::new(
                name.clone(),
                inputs,
                outputs,
                Arc::clone(shared),
                Arc::clone(&owned),
            ),
            cleanup,
            owned,
        });
    }
    Ok(specs)
}

fn build_input_slot(
    component: &str,
    def: &PortDefinition,
    by_tgt: &HashMap<PortRef, Arc<Connection>>,
    iips: &mut HashMap<PortRef, weft_core::value::Value>,
    shared: &Arc<RuntimeShared>,
    owned: &Arc<AtomicI64>,
    cleanup: &mut PortCleanup,
) -> Result<InputSlot> {
    debug_assert_eq!(def.direction, PortDirection::In);

    let make_handle = |port_ref: PortRef, source: InputSource| {
        InputHandle::new(
            port_ref,
            def.drop_tolerant,
            source,
            Arc::clone(shared),
            Arc::clone(owned),
        )
    };

    if def.array {
        // Gather connected element indices.
        let mut elements: BTreeMap<usize, InputSource> = BTreeMap::new();
        for (port, conn) in by_tgt {
            if port.component == component && port.port == def.name {
                if let Some(index) = port.index {
                    cleanup.inputs.push((Arc::clone(conn), def.drop_tolerant));
                    elements.insert(index, InputSource::Connection(Arc::clone(conn)));
                }
            }
        }
        let iip_keys: Vec<PortRef> = iips
            .keys()
            .filter(|p| p.component == component && p.port == def.name && p.index.is_some())
            .cloned()
            .collect();
        for key in iip_keys {
            let value = iips.remove(&key).expect("iip key vanished");
            elements.insert(
                key.index.expect("array iip without index"),
                InputSource::Initial(Mutex::new(Some(value))),
            );
        }

        if let Some(size) = def.fixed_size {
            for index in 0..size {
                if !elements.contains_key(&index) {
                    if def.required {
                        return Err(FlowError::RequiredPortUnconnected {
                            port: PortRef::indexed(component, def.name.clone(), index).to_string(),
                        });
                    }
                    elements.insert(index, InputSource::Unconnected);
                }
            }
        } else if def.required && elements.is_empty() {
            return Err(FlowError::RequiredPortUnconnected {
                port: PortRef::new(component, def.name.clone()).to_string(),
            });
        }

        let handles = elements
            .into_iter()
            .map(|(index, source)| {
                make_handle(PortRef::indexed(component, def.name.clone(), index), source)
            })
            .collect();
        return Ok(InputSlot::Array(handles));
    }

    let port_ref = PortRef::new(component, def.name.clone());
    let source = if let Some(conn) = by_tgt.get(&port_ref) {
        cleanup.inputs.push((Arc::clone(conn), def.drop_tolerant));
        InputSource::Connection(Arc::clone(conn))
    } else if let Some(value) = iips.remove(&port_ref) {
        InputSource::Initial(Mutex::new(Some(value)))
    } else if let Some(default) = &def.default {
        InputSource::Initial(Mutex::new(Some(default.clone())))
    } else if def.required {
        return Err(FlowError::RequiredPortUnconnected {
            port: port_ref.to_string(),
        });
    } else {
        InputSource::Unconnected
    };

    Ok(InputSlot::Single(make_handle(port_ref, source)))
}

fn build_output_slot(
    component: &str,
    def: &PortDefinition,
    by_src: &HashMap<PortRef, Vec<Arc<Connection>>>,
    shared: &Arc<RuntimeShared>,
    owned: &Arc<AtomicI64>,
    cleanup: &mut PortCleanup,
) -> OutputSlot {
    debug_assert_eq!(def.direction, PortDirection::Out);

    let mut make_handle = |port_ref: PortRef, targets: Vec<Arc<Connection>>| {
        cleanup.outputs.extend(targets.iter().cloned());
        OutputHandle::new(
            port_ref,
            def.port_type,
            targets,
            Arc::clone(shared),
            Arc::clone(owned),
        )
    };

    if def.array {
        let mut elements: BTreeMap<usize, Vec<Arc<Connection>>> = BTreeMap::new();
        for (port, conns) in by_src {
            if port.component == component && port.port == def.name {
                if let Some(index) = port.index {
                    elements.entry(index).or_default().extend(conns.iter().cloned());
                }
            }
        }
        let handles = elements
            .into_iter()
            .map(|(index, targets)| {
                make_handle(PortRef::indexed(component, def.name.clone(), index), targets)
            })
            .collect();
        return OutputSlot::Array(handles);
    }

    let port_ref = PortRef::new(component, def.name.clone());
    let targets = by_src.get(&port_ref).cloned().unwrap_or_default();
    OutputSlot::Single(make_handle(port_ref, targets))
}
