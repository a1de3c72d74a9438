//! Standard stream components for Weft.
//!
//! A small set of general-purpose components: parameter injection,
//! pass-through, counting, capture, stream merging, and text splitting/
//! joining. They serve as worked examples of the component contract and
//! as building blocks for tests and demos.
//!
//! Register the whole set on a [`ComponentRegistry`] with
//! [`register_std`]; the kinds live under the `std::` namespace.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod basic;
pub mod text;

pub use basic::{Capture, Copy, Counter, Discard, Inject, Merge, Passthru, Repeat};
pub use text::{LineToWords, Output, StartsWith, WordsToLine};

use std::sync::Arc;
use weft_engine::registry::ComponentRegistry;

/// Register every standard component kind on a registry.
pub fn register_std(registry: &mut ComponentRegistry) {
    registry.register_fn("std::inject", || Arc::new(Inject));
    registry.register_fn("std::passthru", || Arc::new(Passthru));
    registry.register_fn("std::copy", || Arc::new(Copy));
    registry.register_fn("std::repeat", || Arc::new(Repeat));
    registry.register_fn("std::discard", || Arc::new(Discard));
    registry.register_fn("std::counter", || Arc::new(Counter));
    registry.register_fn("std::capture", || Arc::new(Capture::new()));
    registry.register_fn("std::merge", || Arc::new(Merge));
    registry.register_fn("std::line-to-words", || Arc::new(LineToWords));
    registry.register_fn("std::starts-with", || Arc::new(StartsWith));
    registry.register_fn("std::words-to-line", || Arc::new(WordsToLine));
    registry.register_fn("std::output", || Arc::new(Output::new()));
}

/// A registry preloaded with the standard set.
pub fn std_registry() -> ComponentRegistry {
    let mut registry = ComponentRegistry::new();
    register_std(&mut registry);
    registry
}
