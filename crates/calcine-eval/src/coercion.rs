//! Excel coercion rules shared by the dispatcher, operators, and builtins.

use std::cmp::Ordering;

use calcine_common::{ExcelError, LiteralValue};

/// Coerce a value to `f64` using Excel's lenient rules:
/// Number maps through, Boolean to 1/0, Empty to 0, and text is parsed after
/// trimming. Anything else is `#VALUE!`; an error value re-surfaces as-is.
pub fn to_number_lenient(value: &LiteralValue) -> Result<f64, ExcelError> {
    match value {
        LiteralValue::Number(n) => Ok(*n),
        LiteralValue::Boolean(b) => Ok(if *b { 1.0 } else { 0.0 }),
        LiteralValue::Empty | LiteralValue::Omitted => Ok(0.0),
        LiteralValue::Text(s) => s.trim().parse::<f64>().map_err(|_| {
            ExcelError::new_value().with_message(format!("Cannot convert '{s}' to number"))
        }),
        LiteralValue::Error(e) => Err(e.clone()),
        _ => Err(ExcelError::new_value()),
    }
}

/// Strict numeric coercion: text never converts, not even numeric strings.
pub fn to_number_strict(value: &LiteralValue) -> Result<f64, ExcelError> {
    match value {
        LiteralValue::Number(n) => Ok(*n),
        LiteralValue::Error(e) => Err(e.clone()),
        _ => Err(ExcelError::new_value()),
    }
}

/// Coerce a value to a logical, with `Ok(None)` meaning "skip this operand"
/// (blank cells and omitted arguments are transparent to AND/OR and IF
/// condition chains treat them as FALSE at the call sites that want that).
pub fn to_logical(value: &LiteralValue) -> Result<Option<bool>, ExcelError> {
    match value {
        LiteralValue::Boolean(b) => Ok(Some(*b)),
        LiteralValue::Number(n) => Ok(Some(*n != 0.0)),
        LiteralValue::Empty | LiteralValue::Omitted => Ok(None),
        LiteralValue::Text(s) => {
            if s.eq_ignore_ascii_case("TRUE") {
                Ok(Some(true))
            } else if s.eq_ignore_ascii_case("FALSE") {
                Ok(Some(false))
            } else if let Ok(n) = s.trim().parse::<f64>() {
                Ok(Some(n != 0.0))
            } else {
                Err(ExcelError::new_value()
                    .with_message(format!("Cannot convert '{s}' to logical")))
            }
        }
        LiteralValue::Error(e) => Err(e.clone()),
        _ => Err(ExcelError::new_value()),
    }
}

/// Render a value the way `&` concatenation and text functions see it.
pub fn to_text(value: &LiteralValue) -> String {
    match value {
        LiteralValue::Empty | LiteralValue::Omitted => String::new(),
        other => other.to_string(),
    }
}

/// Excel's total order over scalars, used by the comparison operators,
/// SWITCH matching, and exact-match lookups.
///
/// Within a type: numbers numerically, text ASCII case-insensitively,
/// FALSE < TRUE. Across types: Number < Text < Boolean. A blank operand
/// coerces to the other side's zero value (0, "", or FALSE).
pub fn compare_values(
    left: &LiteralValue,
    right: &LiteralValue,
) -> Result<Ordering, ExcelError> {
    fn rank(v: &LiteralValue) -> Result<u8, ExcelError> {
        match v {
            LiteralValue::Number(_) => Ok(0),
            LiteralValue::Text(_) => Ok(1),
            LiteralValue::Boolean(_) => Ok(2),
            LiteralValue::Error(e) => Err(e.clone()),
            _ => Err(ExcelError::new_value().with_message("value is not comparable")),
        }
    }

    use LiteralValue::{Boolean, Empty, Number, Omitted, Text};
    let blank = |other: &LiteralValue| -> Result<LiteralValue, ExcelError> {
        match other {
            Number(_) | Empty | Omitted => Ok(Number(0.0)),
            Text(_) => Ok(Text(String::new())),
            Boolean(_) => Ok(Boolean(false)),
            LiteralValue::Error(e) => Err(e.clone()),
            _ => Err(ExcelError::new_value().with_message("value is not comparable")),
        }
    };
    let l = match left {
        Empty | Omitted => blank(right)?,
        other => other.clone(),
    };
    let r = match right {
        Empty | Omitted => blank(left)?,
        other => other.clone(),
    };

    match (&l, &r) {
        (Number(a), Number(b)) => Ok(a.partial_cmp(b).unwrap_or(Ordering::Equal)),
        (Text(a), Text(b)) => {
            let (a, b) = (a.to_ascii_uppercase(), b.to_ascii_uppercase());
            Ok(a.cmp(&b))
        }
        (Boolean(a), Boolean(b)) => Ok(a.cmp(b)),
        _ => Ok(rank(&l)?.cmp(&rank(&r)?)),
    }
}

/// Guard numeric results: NaN and infinities never leave the engine as
/// numbers.
pub fn sanitize_numeric(n: f64) -> Result<f64, ExcelError> {
    if n.is_finite() {
        Ok(n)
    } else {
        Err(ExcelError::new_num())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use calcine_common::ErrorKind;

    #[test]
    fn lenient_number_rules() {
        assert_eq!(to_number_lenient(&LiteralValue::Number(2.5)), Ok(2.5));
        assert_eq!(to_number_lenient(&LiteralValue::Boolean(true)), Ok(1.0));
        assert_eq!(to_number_lenient(&LiteralValue::Empty), Ok(0.0));
        assert_eq!(to_number_lenient(&" 42 ".into()), Ok(42.0));
        assert_eq!(
            to_number_lenient(&"abc".into()).unwrap_err().kind,
            ErrorKind::Value
        );
    }

    #[test]
    fn errors_resurface_unchanged() {
        let div = LiteralValue::Error(ExcelError::new_div());
        assert_eq!(to_number_lenient(&div).unwrap_err().kind, ErrorKind::Div);
    }

    #[test]
    fn logical_coercion_skips_blanks() {
        assert_eq!(to_logical(&LiteralValue::Empty), Ok(None));
        assert_eq!(to_logical(&LiteralValue::Number(2.0)), Ok(Some(true)));
        assert_eq!(to_logical(&"false".into()), Ok(Some(false)));
        assert!(to_logical(&"maybe".into()).is_err());
    }

    #[test]
    fn comparison_follows_the_type_ladder() {
        use std::cmp::Ordering::*;
        let n = LiteralValue::Number(999.0);
        let t = LiteralValue::Text("a".into());
        let b = LiteralValue::Boolean(false);
        assert_eq!(compare_values(&n, &t), Ok(Less));
        assert_eq!(compare_values(&t, &b), Ok(Less));
        assert_eq!(
            compare_values(&"ABC".into(), &"abc".into()),
            Ok(Equal)
        );
        assert_eq!(
            compare_values(&LiteralValue::Empty, &LiteralValue::Number(0.0)),
            Ok(Equal)
        );
    }

    #[test]
    fn sanitize_rejects_non_finite() {
        assert_eq!(sanitize_numeric(1.5), Ok(1.5));
        assert_eq!(
            sanitize_numeric(f64::INFINITY).unwrap_err().kind,
            ErrorKind::Num
        );
        assert_eq!(sanitize_numeric(f64::NAN).unwrap_err().kind, ErrorKind::Num);
    }
}
