//! Metadata-driven formula evaluation.
//!
//! The engine walks expression trees against a read-only worksheet
//! accessor. Every function call is routed by its registered
//! [`ErrorStrategy`], which decides argument evaluation order, laziness,
//! and error propagation; errors themselves are ordinary values
//! (`LiteralValue::Error`) carrying the canonical spreadsheet tokens.

pub mod ast;
pub mod coercion;
pub mod function;
pub mod interpreter;
pub mod registry;
pub mod scope;
pub mod solver;
pub mod traits;

pub mod builtins;

mod lazy;

pub mod test_workbook;

#[cfg(test)]
mod tests;

pub use ast::{BinaryOpKind, ExprNode, UnaryOpKind};
pub use function::{
    ArgSpec, Axis, ErrorStrategy, FunctionMetadata, Handler, IterationPolicy, LazyKind,
    SolveAlgorithm, MAX_CALL_ARGS,
};
pub use interpreter::EvalContext;
pub use registry::{default_registry, FunctionRegistry, RegistryBuilder};
pub use scope::{ScopeId, MAX_RECURSION_DEPTH};
pub use traits::{CellResolver, HandlerCtx};

pub use calcine_common::{
    CellAddr, ErrorKind, ExcelError, LambdaId, LiteralValue, RangeAddr, Reference,
};
