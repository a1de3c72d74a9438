//! Graph descriptions: the serializable form of a network.

mod definition;
mod validation;

pub use definition::{
    ComponentRef, ConnectionDefinition, GraphDefinition, GraphLoadError, IipDefinition,
};
pub use validation::{
    GraphValidator, ValidationError, ValidationErrorKind, ValidationLimits, ValidationResult,
};
