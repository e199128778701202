//! The built-in function set, grouped by strategy family.
//!
//! Hosts extend or replace this table through [`RegistryBuilder`]; nothing
//! in the dispatcher is special-cased on these names.

use calcine_common::{ExcelError, LiteralValue};

use crate::function::{ArgSpec, ErrorStrategy, FunctionMetadata, Handler};
use crate::registry::RegistryBuilder;

mod aggregate;
mod financial;
mod info;
mod lambda;
mod logical;
mod lookup;
mod math;
mod volatile;

/// Install the whole built-in table into `b`. Hosts building a custom
/// registry call this first and register their own functions after.
pub fn install(b: &mut RegistryBuilder) {
    math::install(b);
    aggregate::install(b);
    logical::install(b);
    lambda::install(b);
    info::install(b);
    lookup::install(b);
    financial::install(b);
    volatile::install(b);
}

/// Baseline metadata; call sites override the fields that differ with
/// struct-update syntax so every divergence from the default reads at the
/// registration site.
pub(super) fn base(
    name: &'static str,
    min_args: usize,
    max_args: usize,
    strategy: ErrorStrategy,
    handler: Handler,
) -> FunctionMetadata {
    FunctionMetadata {
        name,
        min_args,
        max_args,
        strategy,
        volatile: false,
        needs_context: matches!(handler, Handler::Contextual(_)),
        iteration: None,
        args: &[ArgSpec::Any],
        handler,
    }
}

/// Run a fallible handler body, folding the error into a value. Handlers
/// are total: they never panic and never return a Rust error.
pub(super) fn catch(f: impl FnOnce() -> Result<LiteralValue, ExcelError>) -> LiteralValue {
    f().unwrap_or_else(LiteralValue::Error)
}
