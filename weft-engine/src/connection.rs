//! Bounded connections between ports.
//!
//! A connection is a FIFO of capacity k >= 1 between one output port and
//! one input port. Senders suspend when the queue is full; the receiver
//! suspends when it is empty. Once the sender side closes and the queue
//! drains, the receiver observes end-of-stream. Closing the receiver side
//! discards queued and later packets and refuses further sends.
//!
//! Wakeups use `tokio::sync::Notify` with the waiter registered before the
//! state check, so a notification between the check and the await is never
//! lost.

use crate::runtime::RuntimeShared;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Notify;
use weft_core::error::{FlowError, Result};
use weft_core::events::NetworkEvent;
use weft_core::packet::Packet;
use weft_core::report::ComponentState;
use weft_core::types::PortRef;

struct ConnectionState {
    queue: VecDeque<Packet>,
    sender_open: bool,
    receiver_closed: bool,
    // set while the producer is blocked on a full queue; cleared by the
    // receive that makes space, so the full/drained events pair up
    full_announced: bool,
}

/// A bounded FIFO between an output port and an input port.
pub struct Connection {
    src: PortRef,
    tgt: PortRef,
    capacity: usize,
    state: Mutex<ConnectionState>,
    not_empty: Notify,
    not_full: Notify,
}

impl Connection {
    /// Create an open connection with the given capacity (minimum 1).
    pub fn new(src: PortRef, tgt: PortRef, capacity: usize) -> Arc<Self> {
        let capacity = capacity.max(1);
        Arc::new(Self {
            src,
            tgt,
            capacity,
            state: Mutex::new(ConnectionState {
                queue: VecDeque::with_capacity(capacity),
                sender_open: true,
                receiver_closed: false,
                full_announced: false,
            }),
            not_empty: Notify::new(),
            not_full: Notify::new(),
        })
    }

    /// The upstream port reference.
    pub fn src(&self) -> &PortRef {
        &self.src
    }

    /// The downstream port reference.
    pub fn tgt(&self) -> &PortRef {
        &self.tgt
    }

    /// The queue capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of queued packets.
    pub fn len(&self) -> usize {
        self.state.lock().queue.len()
    }

    /// Whether the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.state.lock().queue.is_empty()
    }

    /// Whether the sender side has closed and the queue is empty.
    pub fn is_drained(&self) -> bool {
        let st = self.state.lock();
        !st.sender_open && st.queue.is_empty()
    }

    /// Enqueue a packet, suspending while the queue is full.
    ///
    /// # Errors
    /// `DownstreamClosed` once the receiver has closed; `Cancelled` when
    /// the network terminates while waiting. The packet is consumed either
    /// way.
    pub async fn send(&self, packet: Packet, shared: &RuntimeShared) -> Result<()> {
        loop {
            let space = self.not_full.notified();
            let cancelled = shared.cancel_notify.notified();

            {
                let mut st = self.state.lock();
                if shared.is_cancelled() {
                    return Err(FlowError::Cancelled);
                }
                if st.receiver_closed {
                    return Err(FlowError::DownstreamClosed {
                        src: self.src.to_string(),
                        tgt: self.tgt.to_string(),
                    });
                }
                if st.queue.len() < self.capacity {
                    st.queue.push_back(packet);
                    shared.counters.sends.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                    drop(st);
                    shared.events.emit(NetworkEvent::PacketSent {
                        src: self.src.to_string(),
                        dst: self.tgt.to_string(),
                    });
                    self.not_empty.notify_waiters();
                    return Ok(());
                }
                if !st.full_announced {
                    st.full_announced = true;
                    drop(st);
                    shared.events.emit(NetworkEvent::ConnectionFull {
                        src: self.src.to_string(),
                        dst: self.tgt.to_string(),
                    });
                }
            }

            shared.set_blocked(
                &self.src.component,
                ComponentState::SuspendedSend,
                &self.src,
            );
            tracing::trace!(connection = %self.tgt, "Send suspended: queue full");

            tokio::select! {
                _ = space => {}
                _ = cancelled => {}
            }

            shared.set_state(&self.src.component, ComponentState::Active);
        }
    }

    /// Dequeue the next packet, suspending while the queue is empty.
    ///
    /// Returns `Ok(None)` at end-of-stream (sender closed and queue
    /// drained, or receiver side already closed).
    ///
    /// # Errors
    /// `Cancelled` when the network terminates while waiting.
    pub async fn receive(&self, shared: &RuntimeShared) -> Result<Option<Packet>> {
        loop {
            let available = self.not_empty.notified();
            let cancelled = shared.cancel_notify.notified();

            {
                let mut st = self.state.lock();
                if shared.is_cancelled() {
                    return Err(FlowError::Cancelled);
                }
                if st.receiver_closed {
                    return Ok(None);
                }
                if let Some(packet) = st.queue.pop_front() {
                    let was_announced = st.full_announced && st.queue.len() + 1 == self.capacity;
                    if was_announced {
                        st.full_announced = false;
                    }
                    shared
                        .counters
                        .receives
                        .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                    drop(st);
                    shared.events.emit(NetworkEvent::PacketReceived {
                        src: self.src.to_string(),
                        dst: self.tgt.to_string(),
                    });
                    if was_announced {
                        shared.events.emit(NetworkEvent::ConnectionDrained {
                            src: self.src.to_string(),
                            dst: self.tgt.to_string(),
                        });
                    }
                    self.not_full.notify_waiters();
                    return Ok(Some(packet));
                }
                if !st.sender_open {
                    return Ok(None);
                }
            }

            shared.set_blocked(
                &self.tgt.component,
                ComponentState::SuspendedReceive,
                &self.tgt,
            );
            tracing::trace!(connection = %self.tgt, "Receive suspended: queue empty");

            tokio::select! {
                _ = available => {}
                _ = cancelled => {}
            }

            shared.set_state(&self.tgt.component, ComponentState::Active);
        }
    }

    /// Producer-side close. Idempotent. Wakes the receiver so it can
    /// observe end-of-stream.
    pub fn close_sender(&self) {
        {
            let mut st = self.state.lock();
            if !st.sender_open {
                return;
            }
            st.sender_open = false;
        }
        self.not_empty.notify_waiters();
    }

    /// Consumer-side close. Idempotent. Discards queued packets (returning
    /// the count) and wakes senders so they observe `DownstreamClosed`.
    pub fn close_receiver(&self, shared: &RuntimeShared, drop_tolerant: bool) -> usize {
        let dropped = {
            let mut st = self.state.lock();
            if st.receiver_closed {
                return 0;
            }
            st.receiver_closed = true;
            let dropped = st.queue.len();
            st.queue.clear();
            dropped
        };

        if dropped > 0 {
            shared
                .counters
                .dropped_on_close
                .fetch_add(dropped as u64, std::sync::atomic::Ordering::Relaxed);
            if !drop_tolerant {
                tracing::warn!(
                    connection = %self.tgt,
                    dropped,
                    "Packets discarded by consumer-side close"
                );
            }
        }

        self.not_full.notify_waiters();
        self.not_empty.notify_waiters();
        dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use weft_core::events::NullSink;
    use weft_core::value::Value;

    fn shared() -> Arc<RuntimeShared> {
        Arc::new(RuntimeShared::new(
            "test".to_string(),
            Arc::new(NullSink),
            false,
        ))
    }

    fn conn(capacity: usize) -> Arc<Connection> {
        Connection::new(
            PortRef::new("a", "OUT"),
            PortRef::new("b", "IN"),
            capacity,
        )
    }

    #[tokio::test]
    async fn fifo_order_preserved() {
        let c = conn(4);
        let s = shared();
        for i in 0..4_i64 {
            c.send(Packet::new(i), &s).await.unwrap();
        }
        c.close_sender();
        for i in 0..4_i64 {
            let p = c.receive(&s).await.unwrap().unwrap();
            assert_eq!(p.payload().as_i64(), Some(i));
        }
        assert_eq!(c.receive(&s).await.unwrap(), None);
    }

    #[tokio::test]
    async fn capacity_never_exceeded() {
        let c = conn(2);
        let s = shared();
        c.send(Packet::new(1_i64), &s).await.unwrap();
        c.send(Packet::new(2_i64), &s).await.unwrap();
        assert_eq!(c.len(), 2);

        // A third send must block until the receiver makes space.
        let c2 = Arc::clone(&c);
        let s2 = Arc::clone(&s);
        let sender = tokio::spawn(async move { c2.send(Packet::new(3_i64), &s2).await });

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(!sender.is_finished());
        assert_eq!(c.len(), 2);

        let first = c.receive(&s).await.unwrap().unwrap();
        assert_eq!(first.payload().as_i64(), Some(1));
        sender.await.unwrap().unwrap();
        assert_eq!(c.len(), 2);
    }

    #[tokio::test]
    async fn receiver_blocks_until_data_arrives() {
        let c = conn(1);
        let s = shared();

        let c2 = Arc::clone(&c);
        let s2 = Arc::clone(&s);
        let receiver = tokio::spawn(async move { c2.receive(&s2).await });

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(!receiver.is_finished());

        c.send(Packet::new("late"), &s).await.unwrap();
        let packet = receiver.await.unwrap().unwrap().unwrap();
        assert_eq!(packet.payload().as_string(), Some("late".to_string()));
    }

    #[tokio::test]
    async fn end_of_stream_after_sender_close() {
        let c = conn(2);
        let s = shared();
        c.send(Packet::new(Value::int(1)), &s).await.unwrap();
        c.close_sender();
        c.close_sender();

        assert!(c.receive(&s).await.unwrap().is_some());
        assert_eq!(c.receive(&s).await.unwrap(), None);
        assert_eq!(c.receive(&s).await.unwrap(), None);
    }

    #[tokio::test]
    async fn send_to_closed_receiver_fails() {
        let c = conn(2);
        let s = shared();
        c.send(Packet::new(1_i64), &s).await.unwrap();
        let dropped = c.close_receiver(&s, false);
        assert_eq!(dropped, 1);

        let err = c.send(Packet::new(2_i64), &s).await.unwrap_err();
        assert_eq!(err.code(), "E201");
    }

    #[tokio::test]
    async fn close_receiver_unblocks_suspended_sender() {
        let c = conn(1);
        let s = shared();
        c.send(Packet::new(1_i64), &s).await.unwrap();

        let c2 = Arc::clone(&c);
        let s2 = Arc::clone(&s);
        let sender = tokio::spawn(async move { c2.send(Packet::new(2_i64), &s2).await });
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        c.close_receiver(&s, true);
        let err = sender.await.unwrap().unwrap_err();
        assert_eq!(err.code(), "E201");
    }

    #[tokio::test]
    async fn cancellation_wakes_both_sides() {
        let full = conn(1);
        let empty = conn(1);
        let s = shared();
        full.send(Packet::new(1_i64), &s).await.unwrap();

        let f2 = Arc::clone(&full);
        let s2 = Arc::clone(&s);
        let sender = tokio::spawn(async move { f2.send(Packet::new(2_i64), &s2).await });
        let e2 = Arc::clone(&empty);
        let s3 = Arc::clone(&s);
        let receiver = tokio::spawn(async move { e2.receive(&s3).await });

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        s.cancel();

        assert!(sender.await.unwrap().unwrap_err().is_cancellation());
        assert!(receiver.await.unwrap().unwrap_err().is_cancellation());
    }

    #[tokio::test]
    async fn status_reflects_suspension() {
        let c = conn(1);
        let s = shared();
        c.send(Packet::new(1_i64), &s).await.unwrap();

        let c2 = Arc::clone(&c);
        let s2 = Arc::clone(&s);
        let sender = tokio::spawn(async move { c2.send(Packet::new(2_i64), &s2).await });
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        assert_eq!(
            s.component_state("a"),
            Some(ComponentState::SuspendedSend)
        );
        assert_eq!(s.blocked_port("a"), Some("a.OUT".to_string()));

        c.receive(&s).await.unwrap();
        sender.await.unwrap().unwrap();
        assert_eq!(s.component_state("a"), Some(ComponentState::Active));
    }
}
