//! Context-reading builtins: the volatile clock/RNG set and the current-cell
//! inspectors.
//!
//! Volatile functions are re-evaluated on every pass; the dispatcher never
//! serves a subtree containing one from the subexpression cache.

use calcine_common::{date_to_serial, datetime_to_serial, ExcelError, LiteralValue};

use super::{base, catch};
use crate::coercion::to_number_lenient;
use crate::function::{ErrorStrategy, FunctionMetadata, Handler};
use crate::registry::RegistryBuilder;
use crate::traits::HandlerCtx;

pub(super) fn install(b: &mut RegistryBuilder) {
    let volatile = |name, min, max, f| FunctionMetadata {
        volatile: true,
        ..base(
            name,
            min,
            max,
            ErrorStrategy::PropagateFirst,
            Handler::Contextual(f),
        )
    };
    b.register(volatile("RAND", 0, 0, rand));
    b.register(volatile("RANDBETWEEN", 2, 2, randbetween));
    b.register(volatile("NOW", 0, 0, now));
    b.register(volatile("TODAY", 0, 0, today));

    let positional = |name, f| {
        base(name, 0, 0, ErrorStrategy::PropagateFirst, Handler::Contextual(f))
    };
    b.register(positional("ROW", row));
    b.register(positional("COLUMN", column));
}

fn rand(ctx: &HandlerCtx<'_>, _args: &[LiteralValue]) -> LiteralValue {
    LiteralValue::Number(ctx.next_rand())
}

fn randbetween(ctx: &HandlerCtx<'_>, args: &[LiteralValue]) -> LiteralValue {
    catch(|| {
        let lo = to_number_lenient(&args[0])?.ceil();
        let hi = to_number_lenient(&args[1])?.floor();
        if lo > hi {
            return Err(ExcelError::new_num().with_message("empty integer interval"));
        }
        let span = hi - lo + 1.0;
        Ok(LiteralValue::Number(lo + (ctx.next_rand() * span).floor()))
    })
}

fn now(ctx: &HandlerCtx<'_>, _args: &[LiteralValue]) -> LiteralValue {
    LiteralValue::Number(datetime_to_serial(&ctx.now()))
}

fn today(ctx: &HandlerCtx<'_>, _args: &[LiteralValue]) -> LiteralValue {
    LiteralValue::Number(date_to_serial(&ctx.now().date()))
}

fn row(ctx: &HandlerCtx<'_>, _args: &[LiteralValue]) -> LiteralValue {
    catch(|| match ctx.current_cell() {
        Some(addr) => Ok(LiteralValue::Number(f64::from(addr.row))),
        None => Err(ExcelError::new_value().with_message("no current cell")),
    })
}

fn column(ctx: &HandlerCtx<'_>, _args: &[LiteralValue]) -> LiteralValue {
    catch(|| match ctx.current_cell() {
        Some(addr) => Ok(LiteralValue::Number(f64::from(addr.col))),
        None => Err(ExcelError::new_value().with_message("no current cell")),
    })
}
