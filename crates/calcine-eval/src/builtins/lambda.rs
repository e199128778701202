//! LET and LAMBDA registrations. The behavior lives in the lazy module;
//! these entries only bind the names to their control-flow kinds.

use super::base;
use crate::function::{ErrorStrategy, Handler, LazyKind, MAX_CALL_ARGS};
use crate::registry::RegistryBuilder;

pub(super) fn install(b: &mut RegistryBuilder) {
    b.register(base(
        "LET",
        3,
        MAX_CALL_ARGS,
        ErrorStrategy::LazyEvaluation,
        Handler::Lazy(LazyKind::Let),
    ));
    b.register(base(
        "LAMBDA",
        2,
        MAX_CALL_ARGS,
        ErrorStrategy::LazyEvaluation,
        Handler::Lazy(LazyKind::Lambda),
    ));
}
