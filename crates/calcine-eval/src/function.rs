//! Per-function metadata: the data that drives the dispatcher.
//!
//! Every registered function carries *all* of these fields explicitly; there
//! are no defaults to fall back on, so a missing classification fails at
//! registry construction instead of silently evaluating with the wrong
//! control flow.

use calcine_common::{ErrorKind, LiteralValue};

use crate::traits::HandlerCtx;

/// Excel's hard cap on call-site arguments; the canonical `max_args` for
/// variadic functions.
pub const MAX_CALL_ARGS: usize = 255;

/// How the dispatcher evaluates a function's arguments and routes errors.
///
/// The six variants are a closed set; the payload-carrying variants keep the
/// remaining per-function differences as data rather than name matching:
/// AND and OR differ only in `circuit_on`, and financial overflow maps to
/// `#NUM!` or `#DIV/0!` depending on the originating operation.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ErrorStrategy {
    /// Eager, left-to-right; the first error argument is the result and the
    /// handler is never invoked.
    PropagateFirst,
    /// Eager with array/range flattening; errors are dropped as long as at
    /// least one non-error operand survives, otherwise the first error wins.
    SkipErrors,
    /// Arguments are passed as unevaluated thunks; the control flow lives in
    /// the dispatcher's lazy module, selected by [`LazyKind`].
    LazyEvaluation,
    /// Left-to-right until an operand equal to `circuit_on` decides the
    /// result; errors after the deciding operand are legitimately suppressed.
    ShortCircuit { circuit_on: bool },
    /// Reference-shape and index-bounds validation before dispatch; a
    /// handler `#N/A` is a valid "not found" result, never suppressed.
    LookupStrict,
    /// Boolean/non-numeric-text rejection before dispatch, finite-result
    /// validation after; non-finite magnitude maps to `on_overflow`.
    FinancialStrict { on_overflow: ErrorKind },
}

/// Which lazy control flow a `LazyEvaluation` function uses.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LazyKind {
    If,
    Ifs,
    IfError,
    IfNa,
    Switch,
    Let,
    Lambda,
    /// Error inspectors: the argument's error must reach the function as a
    /// value, so the thunk is evaluated by the lazy module itself.
    IsError,
    IsNa,
}

/// Convergence data for the iterative numeric solver, attached to function
/// metadata rather than hard-coded at call sites.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct IterationPolicy {
    pub max_iterations: u32,
    pub tolerance: f64,
    pub algorithm: SolveAlgorithm,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SolveAlgorithm {
    NewtonRaphson,
    Secant,
    Bisection,
}

impl Default for IterationPolicy {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            tolerance: 1e-7,
            algorithm: SolveAlgorithm::NewtonRaphson,
        }
    }
}

/// Which axis of a table argument an index argument addresses.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Axis {
    Rows,
    Cols,
}

/// Declared argument shape, consumed by `LOOKUP_STRICT` validation.
///
/// `Index` arguments are validated against the nearest preceding `Table`
/// argument: values outside `1..=axis_len` yield `#REF!`, with 0 permitted
/// only where `allow_zero` documents INDEX's whole-row/column form.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ArgSpec {
    /// Anything, evaluated to a value.
    Any,
    /// A scalar value.
    Scalar,
    /// A range or array; a scalar here is a `#REF!` shape violation.
    Table,
    /// A 1-based index into a table axis; accepts numeric-string coercion.
    Index { axis: Axis, allow_zero: bool },
}

/// Signature of an externally supplied pure handler.
pub type PureFn = fn(&[LiteralValue]) -> LiteralValue;
/// Handler that additionally reads the worksheet / current cell / clock.
pub type ContextualFn = fn(&HandlerCtx<'_>, &[LiteralValue]) -> LiteralValue;
/// Handler backed by the shared iterative solver; receives its metadata
/// policy so alternate algorithms can be substituted without touching it.
pub type IterativeFn = fn(&IterationPolicy, &[LiteralValue]) -> LiteralValue;

/// The callable side of a function's metadata.
#[derive(Debug, Copy, Clone)]
pub enum Handler {
    Pure(PureFn),
    Contextual(ContextualFn),
    Iterative(IterativeFn),
    Lazy(LazyKind),
}

/// Complete, explicit metadata for one registered function.
#[derive(Debug, Clone)]
pub struct FunctionMetadata {
    /// Canonical (uppercase) unique name.
    pub name: &'static str,
    /// Inclusive arity bounds. Variadic functions use [`MAX_CALL_ARGS`].
    pub min_args: usize,
    pub max_args: usize,
    pub strategy: ErrorStrategy,
    /// Volatile functions are re-evaluated on every pass and never served
    /// from the subexpression cache.
    pub volatile: bool,
    /// Whether the handler reads the evaluation context (worksheet, current
    /// cell, clock, RNG). Must agree with the handler variant.
    pub needs_context: bool,
    /// Present iff the handler is [`Handler::Iterative`].
    pub iteration: Option<IterationPolicy>,
    /// Declared argument shapes; when a call supplies more arguments than
    /// specs, the last spec repeats (variadic tail).
    pub args: &'static [ArgSpec],
    pub handler: Handler,
}

impl FunctionMetadata {
    /// The spec for the `idx`-th call argument.
    pub fn arg_spec(&self, idx: usize) -> ArgSpec {
        self.args
            .get(idx)
            .or_else(|| self.args.last())
            .copied()
            .unwrap_or(ArgSpec::Any)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_matches_documented_constants() {
        let p = IterationPolicy::default();
        assert_eq!(p.max_iterations, 100);
        assert_eq!(p.tolerance, 1e-7);
        assert_eq!(p.algorithm, SolveAlgorithm::NewtonRaphson);
    }

    #[test]
    fn arg_spec_tail_repeats() {
        static SPECS: &[ArgSpec] = &[ArgSpec::Scalar, ArgSpec::Table];
        let meta = FunctionMetadata {
            name: "T",
            min_args: 1,
            max_args: MAX_CALL_ARGS,
            strategy: ErrorStrategy::PropagateFirst,
            volatile: false,
            needs_context: false,
            iteration: None,
            args: SPECS,
            handler: Handler::Pure(|_| LiteralValue::Empty),
        };
        assert_eq!(meta.arg_spec(0), ArgSpec::Scalar);
        assert_eq!(meta.arg_spec(1), ArgSpec::Table);
        assert_eq!(meta.arg_spec(7), ArgSpec::Table);
    }
}
