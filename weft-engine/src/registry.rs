//! Component kind registry.
//!
//! Maps kind strings (e.g. "std::copy") to factories so graphs can be
//! instantiated from serialized descriptions and the control surface can
//! enumerate and describe the available kinds.

use crate::component::Component;
use std::collections::HashMap;
use std::sync::Arc;
use weft_core::descriptor::ComponentSpec;
use weft_core::error::{FlowError, Result};

/// A factory that creates component instances of one kind.
pub trait ComponentFactory: Send + Sync {
    /// The kind string this factory creates (e.g. "std::copy").
    fn kind(&self) -> &str;

    /// Create a new component instance.
    fn create(&self) -> Arc<dyn Component>;

    /// The descriptor for this kind.
    fn describe(&self) -> ComponentSpec {
        self.create().info().spec()
    }
}

/// A factory backed by a closure.
struct FnFactory {
    kind: String,
    make: Box<dyn Fn() -> Arc<dyn Component> + Send + Sync>,
}

impl ComponentFactory for FnFactory {
    fn kind(&self) -> &str {
        &self.kind
    }

    fn create(&self) -> Arc<dyn Component> {
        (self.make)()
    }
}

/// Registry of component kinds.
#[derive(Default)]
pub struct ComponentRegistry {
    factories: HashMap<String, Arc<dyn ComponentFactory>>,
}

impl ComponentRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory under its own kind string. Replaces any
    /// previous registration of the same kind.
    pub fn register(&mut self, factory: Arc<dyn ComponentFactory>) {
        self.factories.insert(factory.kind().to_string(), factory);
    }

    /// Register a closure as the factory for `kind`.
    pub fn register_fn<F>(&mut self, kind: impl Into<String>, make: F)
    where
        F: Fn() -> Arc<dyn Component> + Send + Sync + 'static,
    {
        let kind = kind.into();
        self.register(Arc::new(FnFactory {
            kind,
            make: Box::new(make),
        }));
    }

    /// Whether a kind is registered.
    pub fn contains(&self, kind: &str) -> bool {
        self.factories.contains_key(kind)
    }

    /// Create a component instance of the given kind.
    pub fn create(&self, kind: &str) -> Result<Arc<dyn Component>> {
        self.factories
            .get(kind)
            .map(|f| f.create())
            .ok_or_else(|| FlowError::UnknownKind {
                kind: kind.to_string(),
            })
    }

    /// Describe a registered kind.
    pub fn describe(&self, kind: &str) -> Result<ComponentSpec> {
        self.factories
            .get(kind)
            .map(|f| f.describe())
            .ok_or_else(|| FlowError::UnknownKind {
                kind: kind.to_string(),
            })
    }

    /// All registered kind strings, sorted.
    pub fn list(&self) -> Vec<String> {
        let mut kinds: Vec<String> = self.factories.keys().cloned().collect();
        kinds.sort();
        kinds
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{ComponentFuture, ProcessContext};
    use weft_core::descriptor::ComponentInfo;

    struct Nop;

    impl Component for Nop {
        fn info(&self) -> ComponentInfo {
            ComponentInfo::new("test", "nop").with_description("Does nothing")
        }

        fn execute(&self, _ctx: ProcessContext) -> ComponentFuture<'_> {
            Box::pin(async { Ok(()) })
        }
    }

    #[test]
    fn register_and_create() {
        let mut registry = ComponentRegistry::new();
        registry.register_fn("test::nop", || Arc::new(Nop));

        assert!(registry.contains("test::nop"));
        let component = registry.create("test::nop").unwrap();
        assert_eq!(component.info().name, "test::nop");
    }

    #[test]
    fn unknown_kind_errors() {
        let registry = ComponentRegistry::new();
        assert_eq!(registry.create("test::ghost").unwrap_err().code(), "E112");
        assert_eq!(registry.describe("test::ghost").unwrap_err().code(), "E112");
    }

    #[test]
    fn describe_surfaces_spec() {
        let mut registry = ComponentRegistry::new();
        registry.register_fn("test::nop", || Arc::new(Nop));

        let spec = registry.describe("test::nop").unwrap();
        assert_eq!(spec.kind, "test::nop");
        assert_eq!(spec.description, "Does nothing");
    }

    #[test]
    fn list_is_sorted() {
        let mut registry = ComponentRegistry::new();
        registry.register_fn("test::b", || Arc::new(Nop));
        registry.register_fn("test::a", || Arc::new(Nop));
        assert_eq!(registry.list(), vec!["test::a", "test::b"]);
    }
}
