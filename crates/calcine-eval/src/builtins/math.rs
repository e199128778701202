//! Scalar math and text builtins, all PROPAGATE_FIRST.

use calcine_common::{ExcelError, LiteralValue};

use super::{base, catch};
use crate::coercion::{sanitize_numeric, to_number_lenient, to_text};
use crate::function::{ErrorStrategy, Handler, MAX_CALL_ARGS};
use crate::registry::RegistryBuilder;

pub(super) fn install(b: &mut RegistryBuilder) {
    let eager = |name, min, max, f| {
        base(name, min, max, ErrorStrategy::PropagateFirst, Handler::Pure(f))
    };
    b.register(eager("ABS", 1, 1, abs));
    b.register(eager("SQRT", 1, 1, sqrt));
    b.register(eager("EXP", 1, 1, exp));
    b.register(eager("LN", 1, 1, ln));
    b.register(eager("POWER", 2, 2, power));
    b.register(eager("MOD", 2, 2, modulo));
    b.register(eager("SIGN", 1, 1, sign));
    b.register(eager("ROUND", 2, 2, round));
    b.register(eager("LEN", 1, 1, len));
    b.register(eager("CONCAT", 1, MAX_CALL_ARGS, concat));
}

fn unary_num(args: &[LiteralValue], f: impl FnOnce(f64) -> Result<f64, ExcelError>) -> LiteralValue {
    catch(|| {
        let n = to_number_lenient(&args[0])?;
        Ok(LiteralValue::Number(sanitize_numeric(f(n)?)?))
    })
}

fn abs(args: &[LiteralValue]) -> LiteralValue {
    unary_num(args, |n| Ok(n.abs()))
}

fn sqrt(args: &[LiteralValue]) -> LiteralValue {
    unary_num(args, |n| {
        if n < 0.0 {
            Err(ExcelError::new_num().with_message("square root of a negative number"))
        } else {
            Ok(n.sqrt())
        }
    })
}

fn exp(args: &[LiteralValue]) -> LiteralValue {
    unary_num(args, |n| Ok(n.exp()))
}

fn ln(args: &[LiteralValue]) -> LiteralValue {
    unary_num(args, |n| {
        if n <= 0.0 {
            Err(ExcelError::new_num().with_message("logarithm of a non-positive number"))
        } else {
            Ok(n.ln())
        }
    })
}

fn power(args: &[LiteralValue]) -> LiteralValue {
    catch(|| {
        let base = to_number_lenient(&args[0])?;
        let exponent = to_number_lenient(&args[1])?;
        if base == 0.0 && exponent == 0.0 {
            return Err(ExcelError::new_num());
        }
        Ok(LiteralValue::Number(sanitize_numeric(base.powf(exponent))?))
    })
}

/// Excel MOD: result carries the divisor's sign.
fn modulo(args: &[LiteralValue]) -> LiteralValue {
    catch(|| {
        let n = to_number_lenient(&args[0])?;
        let d = to_number_lenient(&args[1])?;
        if d == 0.0 {
            return Err(ExcelError::new_div());
        }
        Ok(LiteralValue::Number(n - d * (n / d).floor()))
    })
}

fn sign(args: &[LiteralValue]) -> LiteralValue {
    unary_num(args, |n| {
        Ok(if n > 0.0 {
            1.0
        } else if n < 0.0 {
            -1.0
        } else {
            0.0
        })
    })
}

/// Half-away-from-zero rounding at a signed digit position.
fn round(args: &[LiteralValue]) -> LiteralValue {
    catch(|| {
        let n = to_number_lenient(&args[0])?;
        let digits = to_number_lenient(&args[1])?.trunc() as i32;
        let scale = 10f64.powi(digits);
        Ok(LiteralValue::Number(sanitize_numeric(
            (n * scale).round() / scale,
        )?))
    })
}

fn len(args: &[LiteralValue]) -> LiteralValue {
    LiteralValue::Number(to_text(&args[0]).chars().count() as f64)
}

fn concat(args: &[LiteralValue]) -> LiteralValue {
    fn push(v: &LiteralValue, out: &mut String) {
        match v {
            LiteralValue::Array(rows) => {
                for row in rows {
                    for cell in row {
                        push(cell, out);
                    }
                }
            }
            other => out.push_str(&to_text(other)),
        }
    }
    let mut out = String::new();
    for a in args {
        push(a, &mut out);
    }
    LiteralValue::Text(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use calcine_common::ErrorKind;

    fn n(v: f64) -> LiteralValue {
        LiteralValue::Number(v)
    }

    #[test]
    fn mod_sign_follows_divisor() {
        assert_eq!(modulo(&[n(3.0), n(-2.0)]), n(-1.0));
        assert_eq!(modulo(&[n(-3.0), n(2.0)]), n(1.0));
        assert_eq!(
            modulo(&[n(3.0), n(0.0)]),
            LiteralValue::Error(ExcelError::new_div())
        );
    }

    #[test]
    fn sqrt_of_negative_is_num() {
        match sqrt(&[n(-4.0)]) {
            LiteralValue::Error(e) => assert_eq!(e.kind, ErrorKind::Num),
            other => panic!("expected #NUM!, got {other}"),
        }
    }

    #[test]
    fn round_is_half_away_from_zero() {
        assert_eq!(round(&[n(2.5), n(0.0)]), n(3.0));
        assert_eq!(round(&[n(-2.5), n(0.0)]), n(-3.0));
        assert_eq!(round(&[n(1234.5), n(-2.0)]), n(1200.0));
        assert_eq!(round(&[n(1.2345), n(2.0)]), n(1.23));
    }

    #[test]
    fn concat_flattens_arrays() {
        let arr = LiteralValue::Array(vec![vec![n(1.0), n(2.0)]]);
        assert_eq!(
            concat(&[LiteralValue::Text("x".into()), arr]),
            LiteralValue::Text("x12".into())
        );
    }

    #[test]
    fn len_counts_chars_of_rendered_text() {
        assert_eq!(len(&[LiteralValue::Text("héllo".into())]), n(5.0));
        assert_eq!(len(&[LiteralValue::Empty]), n(0.0));
    }
}
