//! Aggregations, all SKIP_ERRORS: the dispatcher flattens ranges and drops
//! error operands before these handlers run, so they only ever see the
//! non-error survivors (in original order).

use calcine_common::{ExcelError, LiteralValue};

use super::{base, catch};
use crate::function::{ErrorStrategy, Handler, MAX_CALL_ARGS};
use crate::registry::RegistryBuilder;

pub(super) fn install(b: &mut RegistryBuilder) {
    let agg = |name, f| {
        base(
            name,
            1,
            MAX_CALL_ARGS,
            ErrorStrategy::SkipErrors,
            Handler::Pure(f),
        )
    };
    b.register(agg("SUM", sum));
    b.register(agg("AVERAGE", average));
    b.register(agg("MIN", min));
    b.register(agg("MAX", max));
    b.register(agg("COUNT", count));
    b.register(agg("COUNTA", counta));
    b.register(agg("PRODUCT", product));
}

/// The operands that count as numbers: literal numbers, booleans as 1/0,
/// and numeric text. Labels, blanks, and lambdas are transparent, the way
/// range aggregation treats non-numeric cells.
fn numeric(values: &[LiteralValue]) -> impl Iterator<Item = f64> + '_ {
    values.iter().filter_map(|v| match v {
        LiteralValue::Number(n) => Some(*n),
        LiteralValue::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
        LiteralValue::Text(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    })
}

fn sum(values: &[LiteralValue]) -> LiteralValue {
    LiteralValue::Number(numeric(values).sum())
}

fn average(values: &[LiteralValue]) -> LiteralValue {
    catch(|| {
        let (mut total, mut n) = (0.0, 0u32);
        for x in numeric(values) {
            total += x;
            n += 1;
        }
        if n == 0 {
            return Err(ExcelError::new_div().with_message("nothing to average"));
        }
        Ok(LiteralValue::Number(total / f64::from(n)))
    })
}

// MIN/MAX over no numeric operands read as 0.

fn min(values: &[LiteralValue]) -> LiteralValue {
    LiteralValue::Number(numeric(values).fold(None, |acc: Option<f64>, x| {
        Some(acc.map_or(x, |a| a.min(x)))
    }).unwrap_or(0.0))
}

fn max(values: &[LiteralValue]) -> LiteralValue {
    LiteralValue::Number(numeric(values).fold(None, |acc: Option<f64>, x| {
        Some(acc.map_or(x, |a| a.max(x)))
    }).unwrap_or(0.0))
}

fn count(values: &[LiteralValue]) -> LiteralValue {
    let n = values
        .iter()
        .filter(|v| matches!(v, LiteralValue::Number(_)))
        .count();
    LiteralValue::Number(n as f64)
}

fn counta(values: &[LiteralValue]) -> LiteralValue {
    let n = values
        .iter()
        .filter(|v| !matches!(v, LiteralValue::Empty | LiteralValue::Omitted))
        .count();
    LiteralValue::Number(n as f64)
}

fn product(values: &[LiteralValue]) -> LiteralValue {
    let mut acc = 1.0;
    let mut any = false;
    for x in numeric(values) {
        acc *= x;
        any = true;
    }
    LiteralValue::Number(if any { acc } else { 0.0 })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn n(v: f64) -> LiteralValue {
        LiteralValue::Number(v)
    }

    #[test]
    fn sum_ignores_labels_and_blanks() {
        let vs = [n(1.0), "x".into(), LiteralValue::Empty, " 2 ".into(), n(3.0)];
        assert_eq!(sum(&vs), n(6.0));
    }

    #[test]
    fn average_of_nothing_is_div0() {
        match average(&[LiteralValue::Empty, "label".into()]) {
            LiteralValue::Error(e) => assert_eq!(e.kind, calcine_common::ErrorKind::Div),
            other => panic!("expected #DIV/0!, got {other}"),
        }
    }

    #[test]
    fn min_max_defaults() {
        assert_eq!(min(&[]), n(0.0));
        assert_eq!(max(&[]), n(0.0));
        assert_eq!(min(&[n(3.0), n(-1.0)]), n(-1.0));
        assert_eq!(max(&[n(3.0), n(-1.0)]), n(3.0));
    }

    #[test]
    fn count_vs_counta() {
        let vs = [n(1.0), "x".into(), LiteralValue::Empty, LiteralValue::Boolean(true)];
        assert_eq!(count(&vs), n(1.0));
        assert_eq!(counta(&vs), n(3.0));
    }
}
