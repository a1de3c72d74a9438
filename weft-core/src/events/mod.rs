//! Runtime event stream.
//!
//! Networks emit a closed vocabulary of typed events while running:
//! lifecycle transitions (`network-started`, `component-terminated`, ...),
//! per-packet movement, and congestion edges (`connection-full` /
//! `connection-drained`). Events flow to an [`EventSink`]; the bundled
//! [`RingBufferSink`] keeps a bounded in-memory history and fans out to
//! subscriber callbacks for live consumers.

mod event;
mod sink;

pub use event::{NetworkEvent, StampedEvent};
pub use sink::{DEFAULT_EVENT_CAPACITY, EventSink, NullSink, RingBufferSink};
