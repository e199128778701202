//! LOOKUP_STRICT builtins.
//!
//! The dispatcher has already validated shapes (tables are ranges or
//! arrays, indices land inside the nearest preceding table), so handlers
//! here address their tables without re-checking bounds. They are
//! contextual: table arguments may arrive as live references that still
//! need worksheet reads. A `#N/A` returned here means "not found" and is
//! never suppressed by the strategy.

use std::cmp::Ordering;

use calcine_common::{ExcelError, LiteralValue};

use super::{base, catch};
use crate::coercion::{compare_values, to_logical, to_number_lenient};
use crate::function::{ArgSpec, Axis, ErrorStrategy, Handler};
use crate::registry::RegistryBuilder;
use crate::traits::HandlerCtx;

pub(super) fn install(b: &mut RegistryBuilder) {
    let strict = |name, min, max, args, f| crate::function::FunctionMetadata {
        args,
        ..base(name, min, max, ErrorStrategy::LookupStrict, Handler::Contextual(f))
    };

    static VLOOKUP_ARGS: &[ArgSpec] = &[
        ArgSpec::Scalar,
        ArgSpec::Table,
        ArgSpec::Index { axis: Axis::Cols, allow_zero: false },
        ArgSpec::Any,
    ];
    static HLOOKUP_ARGS: &[ArgSpec] = &[
        ArgSpec::Scalar,
        ArgSpec::Table,
        ArgSpec::Index { axis: Axis::Rows, allow_zero: false },
        ArgSpec::Any,
    ];
    static XLOOKUP_ARGS: &[ArgSpec] = &[
        ArgSpec::Scalar,
        ArgSpec::Table,
        ArgSpec::Table,
        ArgSpec::Any,
    ];
    static LOOKUP_ARGS: &[ArgSpec] = &[ArgSpec::Scalar, ArgSpec::Table, ArgSpec::Table];
    static INDEX_ARGS: &[ArgSpec] = &[
        ArgSpec::Table,
        ArgSpec::Index { axis: Axis::Rows, allow_zero: true },
        ArgSpec::Index { axis: Axis::Cols, allow_zero: true },
    ];
    static MATCH_ARGS: &[ArgSpec] = &[ArgSpec::Scalar, ArgSpec::Table, ArgSpec::Any];

    b.register(strict("VLOOKUP", 3, 4, VLOOKUP_ARGS, vlookup));
    b.register(strict("HLOOKUP", 3, 4, HLOOKUP_ARGS, hlookup));
    b.register(strict("XLOOKUP", 3, 4, XLOOKUP_ARGS, xlookup));
    b.register(strict("LOOKUP", 2, 3, LOOKUP_ARGS, lookup));
    b.register(strict("INDEX", 2, 3, INDEX_ARGS, index));
    b.register(strict("MATCH", 2, 3, MATCH_ARGS, match_fn));
    b.register(strict("XMATCH", 2, 3, MATCH_ARGS, xmatch));
}

/* ─── shared helpers ─── */

fn table(ctx: &HandlerCtx<'_>, v: &LiteralValue) -> Result<Vec<Vec<LiteralValue>>, ExcelError> {
    match v {
        LiteralValue::Reference(r) => Ok(ctx.materialize(r)),
        LiteralValue::Array(rows) => {
            let width = rows.first().map_or(0, Vec::len);
            if rows.iter().any(|r| r.len() != width) {
                return Err(ExcelError::new_ref().with_message("array is not rectangular"));
            }
            Ok(rows.clone())
        }
        _ => Err(ExcelError::new_ref().with_message("expected a range or array")),
    }
}

fn vector(ctx: &HandlerCtx<'_>, v: &LiteralValue) -> Result<Vec<LiteralValue>, ExcelError> {
    Ok(table(ctx, v)?.into_iter().flatten().collect())
}

/// A 1-based, already-bounds-checked index argument.
fn position(v: &LiteralValue) -> Result<usize, ExcelError> {
    Ok(to_number_lenient(v)?.trunc() as usize)
}

/// Optional trailing argument, `Omitted`/`Empty` meaning absent.
fn optional(values: &[LiteralValue], i: usize) -> Option<&LiteralValue> {
    values
        .get(i)
        .filter(|v| !matches!(v, LiteralValue::Omitted | LiteralValue::Empty))
}

fn values_equal(a: &LiteralValue, b: &LiteralValue) -> bool {
    matches!(compare_values(a, b), Ok(Ordering::Equal))
}

/// Position of the largest element ≤ `needle` (ascending-sorted data).
/// Error cells and incomparable types are transparent.
fn last_le(haystack: &[LiteralValue], needle: &LiteralValue) -> Option<usize> {
    let mut best = None;
    for (i, v) in haystack.iter().enumerate() {
        match compare_values(v, needle) {
            Ok(Ordering::Less) | Ok(Ordering::Equal) => best = Some(i),
            _ => {}
        }
    }
    best
}

fn exact(haystack: &[LiteralValue], needle: &LiteralValue) -> Option<usize> {
    haystack.iter().position(|v| values_equal(v, needle))
}

fn not_found() -> ExcelError {
    ExcelError::new_na().with_message("no match found")
}

/* ─── handlers ─── */

fn vlookup(ctx: &HandlerCtx<'_>, values: &[LiteralValue]) -> LiteralValue {
    catch(|| {
        let rows = table(ctx, &values[1])?;
        let col = position(&values[2])?;
        let approx = match optional(values, 3) {
            Some(v) => to_logical(v)?.unwrap_or(true),
            None => true,
        };
        let keys: Vec<LiteralValue> = rows
            .iter()
            .map(|r| r.first().cloned().unwrap_or(LiteralValue::Empty))
            .collect();
        let hit = if approx {
            last_le(&keys, &values[0])
        } else {
            exact(&keys, &values[0])
        }
        .ok_or_else(not_found)?;
        Ok(rows[hit][col - 1].clone())
    })
}

fn hlookup(ctx: &HandlerCtx<'_>, values: &[LiteralValue]) -> LiteralValue {
    catch(|| {
        let rows = table(ctx, &values[1])?;
        let row = position(&values[2])?;
        let approx = match optional(values, 3) {
            Some(v) => to_logical(v)?.unwrap_or(true),
            None => true,
        };
        let keys = rows.first().cloned().unwrap_or_default();
        let hit = if approx {
            last_le(&keys, &values[0])
        } else {
            exact(&keys, &values[0])
        }
        .ok_or_else(not_found)?;
        Ok(rows[row - 1][hit].clone())
    })
}

fn xlookup(ctx: &HandlerCtx<'_>, values: &[LiteralValue]) -> LiteralValue {
    catch(|| {
        let keys = vector(ctx, &values[1])?;
        let results = vector(ctx, &values[2])?;
        if keys.len() != results.len() {
            return Err(ExcelError::new_value()
                .with_message("lookup and return arrays differ in length"));
        }
        match exact(&keys, &values[0]) {
            Some(i) => Ok(results[i].clone()),
            None => match optional(values, 3) {
                Some(fallback) => Ok(fallback.clone()),
                None => Err(not_found()),
            },
        }
    })
}

fn lookup(ctx: &HandlerCtx<'_>, values: &[LiteralValue]) -> LiteralValue {
    catch(|| {
        let keys = vector(ctx, &values[1])?;
        let results = match optional(values, 2) {
            Some(v) => vector(ctx, v)?,
            None => keys.clone(),
        };
        if keys.len() != results.len() {
            return Err(ExcelError::new_value()
                .with_message("lookup and result vectors differ in length"));
        }
        let hit = last_le(&keys, &values[0]).ok_or_else(not_found)?;
        Ok(results[hit].clone())
    })
}

/// INDEX(table, row, [col]). A zero index selects the whole axis; both zero
/// (or an omitted column on a multi-column table) returns the sub-array.
fn index(ctx: &HandlerCtx<'_>, values: &[LiteralValue]) -> LiteralValue {
    catch(|| {
        let rows = table(ctx, &values[0])?;
        let cols = rows.first().map_or(0, Vec::len);
        let r = position(&values[1])?;
        let c = match optional(values, 2) {
            Some(v) => position(v)?,
            None => {
                if cols == 1 {
                    1
                } else {
                    0
                }
            }
        };
        match (r, c) {
            (0, 0) => Ok(LiteralValue::Array(rows)),
            (0, c) => Ok(LiteralValue::Array(
                rows.iter().map(|row| vec![row[c - 1].clone()]).collect(),
            )),
            (r, 0) => Ok(LiteralValue::Array(vec![rows[r - 1].clone()])),
            (r, c) => Ok(rows[r - 1][c - 1].clone()),
        }
    })
}

/// MATCH match_type: 1 (default) largest ≤ on ascending data, 0 exact,
/// -1 smallest ≥ on descending data.
fn match_fn(ctx: &HandlerCtx<'_>, values: &[LiteralValue]) -> LiteralValue {
    catch(|| {
        let keys = vector(ctx, &values[1])?;
        let mode = match optional(values, 2) {
            Some(v) => to_number_lenient(v)?.trunc() as i64,
            None => 1,
        };
        let hit = match mode {
            0 => exact(&keys, &values[0]),
            1 => last_le(&keys, &values[0]),
            -1 => first_ge(&keys, &values[0]),
            _ => return Err(ExcelError::new_value().with_message("invalid match type")),
        }
        .ok_or_else(not_found)?;
        Ok(LiteralValue::Number((hit + 1) as f64))
    })
}

/// XMATCH match_mode: 0 (default) exact, 1 exact or next larger, -1 exact
/// or next smaller.
fn xmatch(ctx: &HandlerCtx<'_>, values: &[LiteralValue]) -> LiteralValue {
    catch(|| {
        let keys = vector(ctx, &values[1])?;
        let mode = match optional(values, 2) {
            Some(v) => to_number_lenient(v)?.trunc() as i64,
            None => 0,
        };
        let hit = match mode {
            0 => exact(&keys, &values[0]),
            1 => exact(&keys, &values[0]).or_else(|| smallest_ge(&keys, &values[0])),
            -1 => exact(&keys, &values[0]).or_else(|| largest_le(&keys, &values[0])),
            _ => return Err(ExcelError::new_value().with_message("invalid match mode")),
        }
        .ok_or_else(not_found)?;
        Ok(LiteralValue::Number((hit + 1) as f64))
    })
}

/// Position of the first element ≥ `needle` in scan order (descending data).
fn first_ge(haystack: &[LiteralValue], needle: &LiteralValue) -> Option<usize> {
    let mut best = None;
    for (i, v) in haystack.iter().enumerate() {
        match compare_values(v, needle) {
            Ok(Ordering::Greater) | Ok(Ordering::Equal) => best = Some(i),
            _ => {}
        }
    }
    best
}

/// Position of the element closest to `needle` from above (unsorted data).
fn smallest_ge(haystack: &[LiteralValue], needle: &LiteralValue) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (i, v) in haystack.iter().enumerate() {
        if matches!(compare_values(v, needle), Ok(Ordering::Greater)) {
            let closer = match best {
                None => true,
                Some(j) => matches!(compare_values(v, &haystack[j]), Ok(Ordering::Less)),
            };
            if closer {
                best = Some(i);
            }
        }
    }
    best
}

/// Position of the element closest to `needle` from below (unsorted data).
fn largest_le(haystack: &[LiteralValue], needle: &LiteralValue) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (i, v) in haystack.iter().enumerate() {
        if matches!(compare_values(v, needle), Ok(Ordering::Less)) {
            let closer = match best {
                None => true,
                Some(j) => matches!(compare_values(v, &haystack[j]), Ok(Ordering::Greater)),
            };
            if closer {
                best = Some(i);
            }
        }
    }
    best
}
