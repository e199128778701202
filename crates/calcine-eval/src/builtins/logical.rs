//! Logical builtins: the SHORT_CIRCUIT pair, the lazy conditionals, and the
//! eager NOT / TRUE / FALSE.

use calcine_common::{ExcelError, LiteralValue};

use super::{base, catch};
use crate::coercion::to_logical;
use crate::function::{ErrorStrategy, Handler, LazyKind, MAX_CALL_ARGS};
use crate::registry::RegistryBuilder;

pub(super) fn install(b: &mut RegistryBuilder) {
    // The dispatcher stops at the first deciding operand; these handlers are
    // the eager fold over whatever it chose to evaluate.
    b.register(base(
        "AND",
        1,
        MAX_CALL_ARGS,
        ErrorStrategy::ShortCircuit { circuit_on: false },
        Handler::Pure(and),
    ));
    b.register(base(
        "OR",
        1,
        MAX_CALL_ARGS,
        ErrorStrategy::ShortCircuit { circuit_on: true },
        Handler::Pure(or),
    ));

    let lazy = |name, min, max, kind| {
        base(
            name,
            min,
            max,
            ErrorStrategy::LazyEvaluation,
            Handler::Lazy(kind),
        )
    };
    b.register(lazy("IF", 2, 3, LazyKind::If));
    b.register(lazy("IFS", 2, MAX_CALL_ARGS, LazyKind::Ifs));
    b.register(lazy("IFERROR", 2, 2, LazyKind::IfError));
    b.register(lazy("IFNA", 2, 2, LazyKind::IfNa));
    b.register(lazy("SWITCH", 3, MAX_CALL_ARGS, LazyKind::Switch));

    let eager = |name, min, max, f| {
        base(name, min, max, ErrorStrategy::PropagateFirst, Handler::Pure(f))
    };
    b.register(eager("NOT", 1, 1, not));
    b.register(eager("TRUE", 0, 0, |_| LiteralValue::Boolean(true)));
    b.register(eager("FALSE", 0, 0, |_| LiteralValue::Boolean(false)));
}

fn fold_logical(values: &[LiteralValue], circuit_on: bool) -> LiteralValue {
    catch(|| {
        let mut saw = false;
        for v in values {
            if let Some(b) = to_logical(v)? {
                saw = true;
                if b == circuit_on {
                    return Ok(LiteralValue::Boolean(circuit_on));
                }
            }
        }
        if saw {
            Ok(LiteralValue::Boolean(!circuit_on))
        } else {
            Err(ExcelError::new_value().with_message("no logical operands"))
        }
    })
}

fn and(values: &[LiteralValue]) -> LiteralValue {
    fold_logical(values, false)
}

fn or(values: &[LiteralValue]) -> LiteralValue {
    fold_logical(values, true)
}

fn not(args: &[LiteralValue]) -> LiteralValue {
    catch(|| {
        let b = to_logical(&args[0])?.unwrap_or(false);
        Ok(LiteralValue::Boolean(!b))
    })
}
