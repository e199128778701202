//! FINANCIAL_STRICT builtins: closed-form time-value-of-money functions plus
//! the solver-backed IRR and RATE.
//!
//! Arguments arrive pre-coerced by the dispatcher (booleans rejected,
//! numeric strings converted, blanks preserved for positional defaults), and
//! results are post-validated: NaN becomes `#VALUE!`, an infinite magnitude
//! becomes the strategy's `on_overflow` kind.

use calcine_common::{ErrorKind, ExcelError, LiteralValue};

use super::{base, catch};
use crate::function::{
    ErrorStrategy, FunctionMetadata, Handler, IterationPolicy, MAX_CALL_ARGS,
};
use crate::registry::RegistryBuilder;
use crate::solver;

pub(super) fn install(b: &mut RegistryBuilder) {
    let closed = |name, min, max, f| {
        base(
            name,
            min,
            max,
            ErrorStrategy::FinancialStrict { on_overflow: ErrorKind::Num },
            Handler::Pure(f),
        )
    };
    b.register(closed("PV", 3, 5, pv));
    b.register(closed("FV", 3, 5, fv));
    b.register(closed("PMT", 3, 5, pmt));
    b.register(closed("NPER", 3, 5, nper));
    // NPV's blow-up comes from discounting by (1 + rate) = 0, a division.
    b.register(base(
        "NPV",
        2,
        MAX_CALL_ARGS,
        ErrorStrategy::FinancialStrict { on_overflow: ErrorKind::Div },
        Handler::Pure(npv),
    ));

    let iterative = |name, min, max, f| FunctionMetadata {
        iteration: Some(IterationPolicy::default()),
        ..base(
            name,
            min,
            max,
            ErrorStrategy::FinancialStrict { on_overflow: ErrorKind::Num },
            Handler::Iterative(f),
        )
    };
    b.register(iterative("IRR", 1, 2, irr));
    b.register(iterative("RATE", 3, 6, rate));
}

/* ─── argument access ─── */

/// Positional numeric argument with a default for blank/absent slots.
fn num_or(values: &[LiteralValue], i: usize, default: f64) -> Result<f64, ExcelError> {
    match values.get(i) {
        None | Some(LiteralValue::Empty) | Some(LiteralValue::Omitted) => Ok(default),
        Some(LiteralValue::Number(n)) => Ok(*n),
        Some(other) => {
            Err(ExcelError::new_value().with_message(format!("'{other}' is not a number")))
        }
    }
}

/// Flatten a cash-flow argument (scalar or array) into a numeric series,
/// skipping blank cells.
fn cash_flows(values: &[LiteralValue], from: usize) -> Result<Vec<f64>, ExcelError> {
    fn push(v: &LiteralValue, out: &mut Vec<f64>) -> Result<(), ExcelError> {
        match v {
            LiteralValue::Number(n) => out.push(*n),
            LiteralValue::Empty | LiteralValue::Omitted => {}
            LiteralValue::Array(rows) => {
                for row in rows {
                    for cell in row {
                        push(cell, out)?;
                    }
                }
            }
            other => {
                return Err(ExcelError::new_value()
                    .with_message(format!("'{other}' is not a cash flow")))
            }
        }
        Ok(())
    }
    let mut out = Vec::new();
    for v in &values[from..] {
        push(v, &mut out)?;
    }
    Ok(out)
}

/* ─── closed forms ─── */

/// Annuity balance terms shared by the TVM family: `(1+r)^n` and the
/// payment factor `(1 + r·type)`.
fn tvm_factors(rate: f64, nper: f64, when: f64) -> (f64, f64) {
    ((1.0 + rate).powf(nper), 1.0 + rate * when)
}

fn pv(values: &[LiteralValue]) -> LiteralValue {
    catch(|| {
        let rate = num_or(values, 0, 0.0)?;
        let nper = num_or(values, 1, 0.0)?;
        let pmt = num_or(values, 2, 0.0)?;
        let fv = num_or(values, 3, 0.0)?;
        let when = num_or(values, 4, 0.0)?;
        let out = if rate == 0.0 {
            -(pmt * nper + fv)
        } else {
            let (growth, factor) = tvm_factors(rate, nper, when);
            -(pmt * factor * (growth - 1.0) / rate + fv) / growth
        };
        Ok(LiteralValue::Number(out))
    })
}

fn fv(values: &[LiteralValue]) -> LiteralValue {
    catch(|| {
        let rate = num_or(values, 0, 0.0)?;
        let nper = num_or(values, 1, 0.0)?;
        let pmt = num_or(values, 2, 0.0)?;
        let pv = num_or(values, 3, 0.0)?;
        let when = num_or(values, 4, 0.0)?;
        let out = if rate == 0.0 {
            -(pv + pmt * nper)
        } else {
            let (growth, factor) = tvm_factors(rate, nper, when);
            -(pv * growth + pmt * factor * (growth - 1.0) / rate)
        };
        Ok(LiteralValue::Number(out))
    })
}

fn pmt(values: &[LiteralValue]) -> LiteralValue {
    catch(|| {
        let rate = num_or(values, 0, 0.0)?;
        let nper = num_or(values, 1, 0.0)?;
        let pv = num_or(values, 2, 0.0)?;
        let fv = num_or(values, 3, 0.0)?;
        let when = num_or(values, 4, 0.0)?;
        if nper == 0.0 {
            return Err(ExcelError::new_num().with_message("zero periods"));
        }
        let out = if rate == 0.0 {
            -(pv + fv) / nper
        } else {
            let (growth, factor) = tvm_factors(rate, nper, when);
            -(pv * growth + fv) * rate / (factor * (growth - 1.0))
        };
        Ok(LiteralValue::Number(out))
    })
}

fn nper(values: &[LiteralValue]) -> LiteralValue {
    catch(|| {
        let rate = num_or(values, 0, 0.0)?;
        let pmt = num_or(values, 1, 0.0)?;
        let pv = num_or(values, 2, 0.0)?;
        let fv = num_or(values, 3, 0.0)?;
        let when = num_or(values, 4, 0.0)?;
        let out = if rate == 0.0 {
            if pmt == 0.0 {
                return Err(ExcelError::new_num().with_message("no payments"));
            }
            -(pv + fv) / pmt
        } else {
            let annuity = pmt * (1.0 + rate * when) / rate;
            let ratio = (annuity - fv) / (annuity + pv);
            if ratio <= 0.0 {
                return Err(ExcelError::new_num()
                    .with_message("the annuity never reaches the target value"));
            }
            ratio.ln() / (1.0 + rate).ln()
        };
        Ok(LiteralValue::Number(out))
    })
}

/// NPV discounts from period 1, matching the spreadsheet convention.
fn npv(values: &[LiteralValue]) -> LiteralValue {
    catch(|| {
        let rate = num_or(values, 0, 0.0)?;
        let flows = cash_flows(values, 1)?;
        let mut acc = 0.0;
        for (i, cf) in flows.iter().enumerate() {
            acc += cf / (1.0 + rate).powi(i as i32 + 1);
        }
        Ok(LiteralValue::Number(acc))
    })
}

/* ─── iterative ─── */

fn npv_at(flows: &[f64], rate: f64) -> f64 {
    flows
        .iter()
        .enumerate()
        .map(|(i, cf)| cf / (1.0 + rate).powi(i as i32))
        .sum()
}

fn npv_derivative(flows: &[f64], rate: f64) -> f64 {
    flows
        .iter()
        .enumerate()
        .skip(1)
        .map(|(i, cf)| -(i as f64) * cf / (1.0 + rate).powi(i as i32 + 1))
        .sum()
}

/// IRR(values, [guess]): the rate at which the cash-flow series (period 0
/// first) has zero net present value. Needs at least one inflow and one
/// outflow.
fn irr(policy: &IterationPolicy, values: &[LiteralValue]) -> LiteralValue {
    catch(|| {
        let flows = cash_flows(&values[..1], 0)?;
        let guess = num_or(values, 1, 0.1)?;
        let has_inflow = flows.iter().any(|&cf| cf > 0.0);
        let has_outflow = flows.iter().any(|&cf| cf < 0.0);
        if !(has_inflow && has_outflow) {
            return Err(ExcelError::new_num()
                .with_message("cash flows must contain an inflow and an outflow"));
        }
        let f = {
            let flows = flows.clone();
            move |r: f64| npv_at(&flows, r)
        };
        let df = move |r: f64| npv_derivative(&flows, r);
        let root = solver::solve(policy, f, Some(&df), guess)?;
        Ok(LiteralValue::Number(root))
    })
}

/// RATE(nper, pmt, pv, [fv], [type], [guess]): the per-period interest rate
/// that balances the annuity equation, found by the shared solver.
fn rate(policy: &IterationPolicy, values: &[LiteralValue]) -> LiteralValue {
    catch(|| {
        let nper = num_or(values, 0, 0.0)?;
        let pmt = num_or(values, 1, 0.0)?;
        let pv = num_or(values, 2, 0.0)?;
        let fv = num_or(values, 3, 0.0)?;
        let when = num_or(values, 4, 0.0)?;
        let guess = num_or(values, 5, 0.1)?;
        let balance = move |r: f64| {
            if r == 0.0 {
                pv + pmt * nper + fv
            } else {
                let growth = (1.0 + r).powf(nper);
                pv * growth + pmt * (1.0 + r * when) * (growth - 1.0) / r + fv
            }
        };
        let root = solver::solve(policy, balance, None, guess)?;
        Ok(LiteralValue::Number(root))
    })
}
