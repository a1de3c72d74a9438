//! Output port handles.

use crate::connection::Connection;
use crate::runtime::RuntimeShared;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use weft_core::error::{FlowError, Result};
use weft_core::descriptor::PortType;
use weft_core::packet::{Packet, PacketRole};
use weft_core::report::ComponentState;
use weft_core::types::PortRef;
use weft_core::value::Value;

/// Handle to an output port, given to a component body for the duration of
/// one activation.
pub struct OutputHandle {
    port_ref: PortRef,
    port_type: PortType,
    targets: Vec<Arc<Connection>>,
    shared: Arc<RuntimeShared>,
    owned: Arc<AtomicI64>,
    closed: AtomicBool,
    bracket_depth: AtomicI64,
}

impl std::fmt::Debug for OutputHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputHandle")
            .field("port_ref", &self.port_ref)
            .field("port_type", &self.port_type)
            .field("closed", &self.closed.load(Ordering::Relaxed))
            .finish()
    }
}

impl OutputHandle {
    pub(crate) fn new(
        port_ref: PortRef,
        port_type: PortType,
        targets: Vec<Arc<Connection>>,
        shared: Arc<RuntimeShared>,
        owned: Arc<AtomicI64>,
    ) -> Self {
        Self {
            port_ref,
            port_type,
            targets,
            shared,
            owned,
            closed: AtomicBool::new(false),
            bracket_depth: AtomicI64::new(0),
        }
    }

    /// Move ownership accounting to a different component's counter.
    pub(crate) fn retag_owner(&mut self, owned: Arc<AtomicI64>) {
        self.owned = owned;
    }

    /// The port this handle writes to.
    pub fn port_ref(&self) -> &PortRef {
        &self.port_ref
    }

    /// The port name.
    pub fn name(&self) -> &str {
        &self.port_ref.port
    }

    /// Whether the producer side has been closed.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Send a packet downstream.
    ///
    /// Suspends the component while the downstream queue is full. The
    /// packet is consumed whether or not the send succeeds. A fan-out port
    /// duplicates the payload to every open downstream and fails only when
    /// all of them have closed. Sends on an unconnected port discard the
    /// packet.
    ///
    /// # Errors
    /// `DownstreamClosed` when the receiver (or every fan-out receiver)
    /// closed; `PayloadTypeMismatch` when the payload fails the port's
    /// declared type; `Cancelled` on network termination.
    pub async fn send(&self, packet: Packet) -> Result<()> {
        // Ownership leaves the component here, whatever the outcome.
        self.owned.fetch_sub(1, Ordering::Relaxed);

        if self.shared.validate_brackets {
            match packet.role() {
                PacketRole::OpenBracket(_) => {
                    self.bracket_depth.fetch_add(1, Ordering::Relaxed);
                }
                PacketRole::CloseBracket(_) => {
                    if self.bracket_depth.fetch_sub(1, Ordering::Relaxed) <= 0 {
                        self.bracket_depth.store(0, Ordering::Relaxed);
                        self.count_drop();
                        return Err(FlowError::BracketMismatch {
                            port: self.port_ref.to_string(),
                        });
                    }
                }
                PacketRole::Normal => {}
            }
        }

        if packet.is_normal() && !self.port_type.accepts(packet.payload()) {
            let actual = packet.payload().kind().to_string();
            self.count_drop();
            return Err(FlowError::PayloadTypeMismatch {
                port: self.port_ref.to_string(),
                expected: self.port_type.as_str().to_string(),
                actual,
            });
        }

        if self.is_closed() {
            self.count_drop();
            return Err(FlowError::DownstreamClosed {
                src: self.port_ref.to_string(),
                tgt: self
                    .targets
                    .first()
                    .map(|c| c.tgt().to_string())
                    .unwrap_or_else(|| self.port_ref.to_string()),
            });
        }

        if self.targets.is_empty() {
            self.count_drop();
            tracing::debug!(port = %self.port_ref, "Send on unconnected port; packet discarded");
            return Ok(());
        }

        if self.targets.len() == 1 {
            return match self.targets[0].send(packet, &self.shared).await {
                Ok(()) => Ok(()),
                Err(e) => {
                    self.count_drop();
                    Err(e)
                }
            };
        }

        // Fan-out: every open downstream gets the same sequence.
        let mut packet = Some(packet);
        let mut delivered = 0_usize;
        let mut last_refusal = None;
        let count = self.targets.len();
        for (i, conn) in self.targets.iter().enumerate() {
            let copy = if i + 1 == count {
                packet.take().expect("fan-out packet consumed early")
            } else {
                packet.as_ref().expect("fan-out packet consumed early").clone()
            };
            match conn.send(copy, &self.shared).await {
                Ok(()) => delivered += 1,
                Err(e) if e.is_cancellation() => {
                    self.count_drop();
                    return Err(e);
                }
                Err(e) => last_refusal = Some(e),
            }
        }

        if delivered > 0 {
            Ok(())
        } else {
            self.count_drop();
            Err(last_refusal.unwrap_or(FlowError::DownstreamClosed {
                src: self.port_ref.to_string(),
                tgt: self.port_ref.to_string(),
            }))
        }
    }

    /// Create and send a normal packet carrying `value`.
    pub async fn send_value(&self, value: impl Into<Value>) -> Result<()> {
        self.count_create();
        self.send(Packet::new(value)).await
    }

    /// Send an open-bracket packet.
    pub async fn open_bracket(&self, label: Option<&str>) -> Result<()> {
        self.count_create();
        self.send(Packet::open_bracket(label.map(String::from))).await
    }

    /// Send a close-bracket packet.
    pub async fn close_bracket(&self, label: Option<&str>) -> Result<()> {
        self.count_create();
        self.send(Packet::close_bracket(label.map(String::from))).await
    }

    /// Send with a timeout. On expiry the packet is discarded, the port
    /// stays open, and `PortTimeout` is returned.
    pub async fn send_timeout(&self, packet: Packet, timeout: Duration) -> Result<()> {
        match tokio::time::timeout(timeout, self.send(packet)).await {
            Ok(result) => result,
            Err(_) => {
                self.shared
                    .set_state(&self.port_ref.component, ComponentState::Active);
                self.shared.counters.drops.fetch_add(1, Ordering::Relaxed);
                Err(FlowError::PortTimeout {
                    port: self.port_ref.to_string(),
                    timeout_ms: timeout.as_millis() as u64,
                })
            }
        }
    }

    /// Producer-side close. Idempotent. Downstream ports observe
    /// end-of-stream once their queues drain.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        for conn in &self.targets {
            conn.close_sender();
        }
        tracing::debug!(port = %self.port_ref, "Output closed");
    }

    fn count_create(&self) {
        self.owned.fetch_add(1, Ordering::Relaxed);
        self.shared.counters.creates.fetch_add(1, Ordering::Relaxed);
    }

    fn count_drop(&self) {
        self.shared.counters.drops.fetch_add(1, Ordering::Relaxed);
    }
}
