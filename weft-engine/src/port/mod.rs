//! Port handles given to component bodies.
//!
//! A body reads packets through [`InputHandle`] and writes through
//! [`OutputHandle`]. Both suspend the component at the bounded connection:
//! receive on empty, send on full. End-of-stream is a value
//! (`Ok(None)`), never an error; closed-downstream, timeout, and
//! cancellation are tagged error returns the body may handle or
//! propagate.

mod input;
mod output;

pub(crate) use input::InputSource;
pub use input::InputHandle;
pub use output::OutputHandle;
