//! Input port handles.

use crate::connection::Connection;
use crate::runtime::RuntimeShared;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use weft_core::error::{FlowError, Result};
use weft_core::packet::Packet;
use weft_core::report::ComponentState;
use weft_core::types::PortRef;
use weft_core::value::Value;

/// Where an input port's packets come from.
pub(crate) enum InputSource {
    /// A real inbound connection.
    Connection(Arc<Connection>),
    /// A one-shot initial packet: first receive yields the value, the
    /// second observes end-of-stream.
    Initial(Mutex<Option<Value>>),
    /// No connection; every receive observes end-of-stream.
    Unconnected,
}

/// Handle to an input port, given to a component body for the duration of
/// one activation.
pub struct InputHandle {
    port_ref: PortRef,
    drop_tolerant: bool,
    source: InputSource,
    shared: Arc<RuntimeShared>,
    owned: Arc<AtomicI64>,
    closed: AtomicBool,
}

impl std::fmt::Debug for InputHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InputHandle")
            .field("port_ref", &self.port_ref)
            .field("drop_tolerant", &self.drop_tolerant)
            .field("closed", &self.closed.load(Ordering::Relaxed))
            .finish()
    }
}

impl InputHandle {
    pub(crate) fn new(
        port_ref: PortRef,
        drop_tolerant: bool,
        source: InputSource,
        shared: Arc<RuntimeShared>,
        owned: Arc<AtomicI64>,
    ) -> Self {
        Self {
            port_ref,
            drop_tolerant,
            source,
            shared,
            owned,
            closed: AtomicBool::new(false),
        }
    }

    /// Move ownership accounting to a different component's counter.
    /// Used when a composite hands its boundary ports to bridge bodies.
    pub(crate) fn retag_owner(&mut self, owned: Arc<AtomicI64>) {
        self.owned = owned;
    }

    /// The port this handle reads from.
    pub fn port_ref(&self) -> &PortRef {
        &self.port_ref
    }

    /// The port name.
    pub fn name(&self) -> &str {
        &self.port_ref.port
    }

    /// Whether the consumer side has been closed.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Receive the next packet.
    ///
    /// Suspends the component until a packet is available. Returns
    /// `Ok(None)` at end-of-stream: the upstream closed and the queue
    /// drained, the initial packet was already delivered, or the port is
    /// unconnected.
    pub async fn receive(&self) -> Result<Option<Packet>> {
        if self.is_closed() {
            return Ok(None);
        }
        match &self.source {
            InputSource::Connection(conn) => {
                let received = conn.receive(&self.shared).await?;
                if received.is_some() {
                    self.owned.fetch_add(1, Ordering::Relaxed);
                }
                Ok(received)
            }
            InputSource::Initial(slot) => {
                let value = slot.lock().take();
                match value {
                    Some(v) => {
                        self.shared
                            .counters
                            .creates
                            .fetch_add(1, Ordering::Relaxed);
                        self.shared
                            .counters
                            .receives
                            .fetch_add(1, Ordering::Relaxed);
                        self.owned.fetch_add(1, Ordering::Relaxed);
                        tracing::debug!(port = %self.port_ref, "Received initial packet");
                        Ok(Some(Packet::new(v)))
                    }
                    None => Ok(None),
                }
            }
            InputSource::Unconnected => Ok(None),
        }
    }

    /// Receive the next packet's payload, releasing the packet.
    pub async fn receive_value(&self) -> Result<Option<Value>> {
        match self.receive().await? {
            Some(packet) => {
                self.owned.fetch_sub(1, Ordering::Relaxed);
                self.shared.counters.drops.fetch_add(1, Ordering::Relaxed);
                Ok(Some(packet.into_payload()))
            }
            None => Ok(None),
        }
    }

    /// Receive one payload and close the port. Intended for
    /// parameter-style inputs fed by an initial packet.
    pub async fn receive_once(&self) -> Result<Option<Value>> {
        let value = self.receive_value().await?;
        self.close();
        Ok(value)
    }

    /// Receive with a timeout. On expiry the port stays open and
    /// `PortTimeout` is returned.
    pub async fn receive_timeout(&self, timeout: Duration) -> Result<Option<Packet>> {
        match tokio::time::timeout(timeout, self.receive()).await {
            Ok(result) => result,
            Err(_) => {
                self.shared
                    .set_state(&self.port_ref.component, ComponentState::Active);
                Err(FlowError::PortTimeout {
                    port: self.port_ref.to_string(),
                    timeout_ms: timeout.as_millis() as u64,
                })
            }
        }
    }

    /// Consumer-side close. Idempotent. Discards any queued or later
    /// arrivals; the discard is logged unless the port is declared
    /// drop-tolerant.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        match &self.source {
            InputSource::Connection(conn) => {
                conn.close_receiver(&self.shared, self.drop_tolerant);
            }
            InputSource::Initial(slot) => {
                slot.lock().take();
            }
            InputSource::Unconnected => {}
        }
    }
}
