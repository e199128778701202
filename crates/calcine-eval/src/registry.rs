//! The immutable function registry.
//!
//! Built once (per process for the default table, or per host through
//! [`RegistryBuilder`]) and never mutated afterwards. All metadata invariants
//! are enforced at construction so a missing or contradictory classification
//! fails fast instead of silently defaulting. These panics are
//! integration-boundary contract violations, not data errors.

use once_cell::sync::Lazy;
use rustc_hash::FxHashMap;

use crate::function::{ErrorStrategy, FunctionMetadata, Handler};

#[derive(Debug, Default)]
pub struct RegistryBuilder {
    map: FxHashMap<&'static str, FunctionMetadata>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one function. Panics on duplicate names or inconsistent
    /// metadata; see the assertions for the exact contract.
    pub fn register(&mut self, meta: FunctionMetadata) -> &mut Self {
        assert!(
            !meta.name.is_empty() && meta.name == meta.name.to_ascii_uppercase(),
            "function name '{}' must be canonical uppercase",
            meta.name
        );
        assert!(
            meta.min_args <= meta.max_args,
            "{}: min_args {} exceeds max_args {}",
            meta.name,
            meta.min_args,
            meta.max_args
        );
        assert_eq!(
            meta.iteration.is_some(),
            matches!(meta.handler, Handler::Iterative(_)),
            "{}: iteration policy present iff the handler is iterative",
            meta.name
        );
        assert_eq!(
            matches!(meta.strategy, ErrorStrategy::LazyEvaluation),
            matches!(meta.handler, Handler::Lazy(_)),
            "{}: lazy strategy iff the handler is a lazy kind",
            meta.name
        );
        assert_eq!(
            meta.needs_context,
            matches!(meta.handler, Handler::Contextual(_)),
            "{}: needs_context iff the handler is contextual",
            meta.name
        );
        let name = meta.name;
        if self.map.insert(name, meta).is_some() {
            panic!("duplicate function registration: {name}");
        }
        self
    }

    pub fn build(self) -> FunctionRegistry {
        FunctionRegistry { map: self.map }
    }
}

/// O(1) name → metadata lookup over canonical (uppercase) names.
#[derive(Debug)]
pub struct FunctionRegistry {
    map: FxHashMap<&'static str, FunctionMetadata>,
}

impl FunctionRegistry {
    /// Case-sensitive lookup by canonical name; the dispatcher canonicalises
    /// parser-supplied names before calling this.
    pub fn lookup(&self, name: &str) -> Option<&FunctionMetadata> {
        self.map.get(name)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FunctionMetadata> {
        self.map.values()
    }
}

/// The process-wide table of built-ins, built on first use and immutable
/// thereafter.
pub fn default_registry() -> &'static FunctionRegistry {
    static REGISTRY: Lazy<FunctionRegistry> = Lazy::new(|| {
        let mut b = RegistryBuilder::new();
        crate::builtins::install(&mut b);
        b.build()
    });
    &REGISTRY
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::function::{ArgSpec, MAX_CALL_ARGS};
    use calcine_common::LiteralValue;

    fn meta(name: &'static str) -> FunctionMetadata {
        FunctionMetadata {
            name,
            min_args: 0,
            max_args: MAX_CALL_ARGS,
            strategy: ErrorStrategy::PropagateFirst,
            volatile: false,
            needs_context: false,
            iteration: None,
            args: &[ArgSpec::Any],
            handler: Handler::Pure(|_| LiteralValue::Empty),
        }
    }

    #[test]
    fn lookup_is_exact_on_canonical_names() {
        let mut b = RegistryBuilder::new();
        b.register(meta("FOO"));
        let reg = b.build();
        assert!(reg.lookup("FOO").is_some());
        assert!(reg.lookup("foo").is_none());
        assert!(reg.lookup("BAR").is_none());
    }

    #[test]
    #[should_panic(expected = "duplicate function registration")]
    fn duplicate_names_are_rejected() {
        let mut b = RegistryBuilder::new();
        b.register(meta("FOO"));
        b.register(meta("FOO"));
    }

    #[test]
    #[should_panic(expected = "min_args")]
    fn inverted_arity_bounds_are_rejected() {
        let mut b = RegistryBuilder::new();
        let mut m = meta("FOO");
        m.min_args = 3;
        m.max_args = 1;
        b.register(m);
    }

    #[test]
    #[should_panic(expected = "iteration policy")]
    fn stray_iteration_policy_is_rejected() {
        let mut b = RegistryBuilder::new();
        let mut m = meta("FOO");
        m.iteration = Some(crate::function::IterationPolicy::default());
        b.register(m);
    }

    #[test]
    fn default_registry_is_built_once_and_populated() {
        let a = default_registry();
        let b = default_registry();
        assert!(std::ptr::eq(a, b));
        assert!(a.lookup("SUM").is_some());
        assert!(a.lookup("LAMBDA").is_some());
        assert!(a.lookup("IRR").is_some());
    }
}
