//! The value union flowing through evaluation, plus Excel serial-date
//! utilities used by date/time functions.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use std::{
    fmt::{self, Display},
    hash::{Hash, Hasher},
};

use crate::{ExcelError, Reference};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/* ───────────────────── Excel date-serial utilities ───────────────────
Excel's serial date system:
  Serial 1  = 1900-01-01
  Serial 59 = 1900-02-28
  Serial 60 = 1900-02-29  (phantom – doesn't exist, but Excel thinks it does)
  Serial 61 = 1900-03-01
Base date = 1899-12-31 so that serial 1 = base + 1 day = 1900-01-01.
Time is stored as fractional days (no timezone).
------------------------------------------------------------------- */

/// Base date for the 1900 date system. Serial 1 = base + 1 day = 1900-01-01.
const EXCEL_EPOCH: NaiveDate = NaiveDate::from_ymd_opt(1899, 12, 31).unwrap();

pub fn datetime_to_serial(dt: &NaiveDateTime) -> f64 {
    let days = (dt.date() - EXCEL_EPOCH).num_days();
    // Dates on or after 1900-03-01 get +1 to account for phantom Feb 29
    let serial_days = if days >= 60 { days + 1 } else { days };

    let secs_in_day = dt.time().num_seconds_from_midnight() as f64;
    serial_days as f64 + secs_in_day / 86_400.0
}

pub fn date_to_serial(date: &NaiveDate) -> f64 {
    datetime_to_serial(&date.and_time(NaiveTime::MIN))
}

/// Opaque handle to a lambda record stored in an evaluation context's arena.
///
/// The value union carries only the index; the record (parameters, body,
/// captured scope) lives in the engine and is reclaimed when the context is
/// dropped, which is what breaks named-lambda reference cycles.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct LambdaId(pub u32);

/// The tagged result type of every evaluation step.
///
/// `Empty` is a blank cell. `Omitted` is distinct from `Empty`: it is only
/// observable as a lambda argument that was not supplied (`f(1,,3)`).
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    Number(f64),
    Text(String),
    Boolean(bool),
    Error(ExcelError),
    /// 2-D, rectangular.
    Array(Vec<Vec<LiteralValue>>),
    Lambda(LambdaId),
    Reference(Reference),
    Empty,
    Omitted,
}

impl Hash for LiteralValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            LiteralValue::Number(n) => n.to_bits().hash(state),
            LiteralValue::Text(s) => s.hash(state),
            LiteralValue::Boolean(b) => b.hash(state),
            LiteralValue::Error(e) => e.hash(state),
            LiteralValue::Array(a) => a.hash(state),
            LiteralValue::Lambda(id) => id.hash(state),
            LiteralValue::Reference(r) => r.hash(state),
            LiteralValue::Empty => state.write_u8(0),
            LiteralValue::Omitted => state.write_u8(1),
        }
    }
}

impl Eq for LiteralValue {}

impl LiteralValue {
    pub fn is_error(&self) -> bool {
        matches!(self, LiteralValue::Error(_))
    }

    pub fn as_error(&self) -> Option<&ExcelError> {
        match self {
            LiteralValue::Error(e) => Some(e),
            _ => None,
        }
    }

    /// Rectangular `(rows, cols)` shape; scalars are 1x1.
    pub fn shape(&self) -> (usize, usize) {
        match self {
            LiteralValue::Array(rows) => (rows.len(), rows.first().map_or(0, |r| r.len())),
            _ => (1, 1),
        }
    }
}

impl Display for LiteralValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LiteralValue::Number(n) => write!(f, "{n}"),
            LiteralValue::Text(s) => write!(f, "{s}"),
            LiteralValue::Boolean(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            LiteralValue::Error(e) => write!(f, "{e}"),
            LiteralValue::Array(rows) => {
                write!(f, "{{")?;
                for (i, row) in rows.iter().enumerate() {
                    if i > 0 {
                        write!(f, ";")?;
                    }
                    for (j, cell) in row.iter().enumerate() {
                        if j > 0 {
                            write!(f, ",")?;
                        }
                        write!(f, "{cell}")?;
                    }
                }
                write!(f, "}}")
            }
            LiteralValue::Lambda(_) => write!(f, "<lambda>"),
            LiteralValue::Reference(_) => write!(f, "<reference>"),
            LiteralValue::Empty => Ok(()),
            LiteralValue::Omitted => Ok(()),
        }
    }
}

impl From<f64> for LiteralValue {
    fn from(n: f64) -> Self {
        LiteralValue::Number(n)
    }
}

impl From<i64> for LiteralValue {
    fn from(n: i64) -> Self {
        LiteralValue::Number(n as f64)
    }
}

impl From<bool> for LiteralValue {
    fn from(b: bool) -> Self {
        LiteralValue::Boolean(b)
    }
}

impl From<&str> for LiteralValue {
    fn from(s: &str) -> Self {
        LiteralValue::Text(s.to_string())
    }
}

impl From<ExcelError> for LiteralValue {
    fn from(e: ExcelError) -> Self {
        LiteralValue::Error(e)
    }
}
