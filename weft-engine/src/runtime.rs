//! Shared runtime state for one network run.
//!
//! Every port handle and the scheduler hold an `Arc<RuntimeShared>`. Port
//! operations update component states and counters through it; the
//! deadlock monitor and the control surface read from it.

use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use weft_core::events::EventSink;
use weft_core::report::{ComponentFailure, ComponentState, NetworkState};
use weft_core::types::PortRef;

/// A component's current state plus the port it is blocked on, if any.
#[derive(Debug, Clone)]
pub(crate) struct StatusEntry {
    pub state: ComponentState,
    pub port: Option<String>,
}

/// Packet movement counters, updated lock-free by port operations.
#[derive(Debug, Default)]
pub(crate) struct CounterSet {
    pub creates: AtomicU64,
    pub sends: AtomicU64,
    pub receives: AtomicU64,
    pub drops: AtomicU64,
    pub dropped_on_close: AtomicU64,
}

impl CounterSet {
    pub fn snapshot(&self) -> weft_core::report::PacketCounters {
        weft_core::report::PacketCounters {
            creates: self.creates.load(Ordering::Relaxed),
            sends: self.sends.load(Ordering::Relaxed),
            receives: self.receives.load(Ordering::Relaxed),
            drops: self.drops.load(Ordering::Relaxed),
            dropped_on_close: self.dropped_on_close.load(Ordering::Relaxed),
        }
    }
}

/// State shared by the scheduler, port handles, and the control surface.
///
/// Composites link their inner runtime here as a child: packet counters
/// are shared with the parent, cancellation propagates downward, and the
/// deadlock scan can see whether anything is still runnable anywhere in
/// the tree.
pub(crate) struct RuntimeShared {
    pub network_name: String,
    pub statuses: DashMap<String, StatusEntry>,
    pub network_state: Mutex<NetworkState>,
    pub failures: Mutex<Vec<ComponentFailure>>,
    pub deadlocked: Mutex<Option<Vec<String>>>,
    pub counters: Arc<CounterSet>,
    pub events: Arc<dyn EventSink>,
    pub validate_brackets: bool,
    children: Mutex<Vec<Arc<RuntimeShared>>>,
    cancelled: AtomicBool,
    pub cancel_notify: Notify,
}

impl RuntimeShared {
    pub fn new(network_name: String, events: Arc<dyn EventSink>, validate_brackets: bool) -> Self {
        Self::with_counters(
            network_name,
            events,
            validate_brackets,
            Arc::new(CounterSet::default()),
        )
    }

    pub fn with_counters(
        network_name: String,
        events: Arc<dyn EventSink>,
        validate_brackets: bool,
        counters: Arc<CounterSet>,
    ) -> Self {
        Self {
            network_name,
            statuses: DashMap::new(),
            network_state: Mutex::new(NetworkState::Idle),
            failures: Mutex::new(Vec::new()),
            deadlocked: Mutex::new(None),
            counters,
            events,
            validate_brackets,
            children: Mutex::new(Vec::new()),
            cancelled: AtomicBool::new(false),
            cancel_notify: Notify::new(),
        }
    }

    /// Link an inner network's runtime under this one.
    pub fn register_child(&self, child: Arc<RuntimeShared>) {
        self.children.lock().push(Arc::clone(&child));
        if self.is_cancelled() {
            child.cancel();
        }
    }

    /// Whether any component in this runtime or a linked child is still
    /// runnable (active or not yet started).
    pub fn any_runnable(&self) -> bool {
        let own = self.statuses.iter().any(|entry| {
            matches!(
                entry.state,
                ComponentState::Active | ComponentState::NotInitialized
            )
        });
        own || self.children_runnable()
    }

    /// Whether any linked child runtime is still runnable.
    pub fn children_runnable(&self) -> bool {
        self.children.lock().iter().any(|c| c.any_runnable())
    }

    /// Update a component's state. The port recorded by the last
    /// suspension is preserved as a causality hint for failure reports.
    pub fn set_state(&self, component: &str, state: ComponentState) {
        self.statuses
            .entry(component.to_string())
            .and_modify(|e| e.state = state)
            .or_insert(StatusEntry { state, port: None });
    }

    /// Record a suspension with the port the component is blocked on.
    pub fn set_blocked(&self, component: &str, state: ComponentState, port: &PortRef) {
        self.statuses.insert(
            component.to_string(),
            StatusEntry {
                state,
                port: Some(port.to_string()),
            },
        );
    }

    pub fn component_state(&self, component: &str) -> Option<ComponentState> {
        self.statuses.get(component).map(|e| e.state)
    }

    pub fn blocked_port(&self, component: &str) -> Option<String> {
        self.statuses.get(component).and_then(|e| e.port.clone())
    }

    pub fn record_failure(&self, failure: ComponentFailure) {
        tracing::error!(
            network = %self.network_name,
            component = %failure.component,
            code = %failure.code,
            "{}",
            failure.message
        );
        self.failures.lock().push(failure);
        let mut state = self.network_state.lock();
        if *state == NetworkState::Running {
            *state = NetworkState::Terminating;
        }
    }

    pub fn record_deadlock(&self, suspended: Vec<String>) {
        let mut slot = self.deadlocked.lock();
        if slot.is_none() {
            *slot = Some(suspended);
        }
    }

    pub fn cancel(&self) {
        if !self.cancelled.swap(true, Ordering::SeqCst) {
            tracing::info!(network = %self.network_name, "Termination requested");
            let mut state = self.network_state.lock();
            if *state == NetworkState::Running {
                *state = NetworkState::Terminating;
            }
        }
        self.cancel_notify.notify_waiters();
        for child in self.children.lock().iter() {
            child.cancel();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}
