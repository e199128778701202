//! Type and error inspectors.
//!
//! ISERROR / ISNA are lazy: PROPAGATE_FIRST would consume the very error
//! they exist to observe. The rest are plain eager predicates (an error
//! argument propagates through them, by the strategy's definition).

use calcine_common::{ErrorKind, ExcelError, LiteralValue};

use super::base;
use crate::function::{ErrorStrategy, Handler, LazyKind};
use crate::registry::RegistryBuilder;

pub(super) fn install(b: &mut RegistryBuilder) {
    b.register(base(
        "ISERROR",
        1,
        1,
        ErrorStrategy::LazyEvaluation,
        Handler::Lazy(LazyKind::IsError),
    ));
    b.register(base(
        "ISNA",
        1,
        1,
        ErrorStrategy::LazyEvaluation,
        Handler::Lazy(LazyKind::IsNa),
    ));

    let eager = |name, f| base(name, 1, 1, ErrorStrategy::PropagateFirst, Handler::Pure(f));
    b.register(eager("ISNUMBER", is_number));
    b.register(eager("ISBLANK", is_blank));
    b.register(eager("ISOMITTED", is_omitted));
    b.register(base(
        "NA",
        0,
        0,
        ErrorStrategy::PropagateFirst,
        Handler::Pure(na),
    ));
}

fn is_number(args: &[LiteralValue]) -> LiteralValue {
    LiteralValue::Boolean(matches!(args[0], LiteralValue::Number(_)))
}

fn is_blank(args: &[LiteralValue]) -> LiteralValue {
    LiteralValue::Boolean(matches!(args[0], LiteralValue::Empty))
}

fn is_omitted(args: &[LiteralValue]) -> LiteralValue {
    LiteralValue::Boolean(matches!(args[0], LiteralValue::Omitted))
}

fn na(_args: &[LiteralValue]) -> LiteralValue {
    LiteralValue::Error(ExcelError::new(ErrorKind::Na))
}
