//! Strategy-level behavior, end to end through `EvalContext::evaluate`.

use std::sync::atomic::{AtomicBool, Ordering};

use calcine_common::{ErrorKind, LiteralValue};

use crate::ast::build::*;
use crate::function::{ErrorStrategy, Handler};
use crate::interpreter::EvalContext;
use crate::registry::RegistryBuilder;
use crate::test_workbook::TestWorkbook;

fn n(v: f64) -> LiteralValue {
    LiteralValue::Number(v)
}

fn div0() -> crate::ast::ExprNode {
    div(num(1.0), num(0.0))
}

fn expect_error(v: LiteralValue, kind: ErrorKind) {
    match v {
        LiteralValue::Error(e) => assert_eq!(e.kind, kind),
        other => panic!("expected {kind}, got {other}"),
    }
}

/* ─── PROPAGATE_FIRST ─── */

static POISON_INVOKED: AtomicBool = AtomicBool::new(false);

fn poisoned(_args: &[LiteralValue]) -> LiteralValue {
    POISON_INVOKED.store(true, Ordering::SeqCst);
    LiteralValue::Text("handler ran".into())
}

#[test]
fn propagate_first_skips_the_handler_entirely() {
    let mut b = RegistryBuilder::new();
    crate::builtins::install(&mut b);
    b.register(crate::function::FunctionMetadata {
        name: "POISONED",
        min_args: 1,
        max_args: 3,
        strategy: ErrorStrategy::PropagateFirst,
        volatile: false,
        needs_context: false,
        iteration: None,
        args: &[crate::function::ArgSpec::Any],
        handler: Handler::Pure(poisoned),
    });
    let reg = b.build();
    let ctx = EvalContext::with_registry(&reg, &());

    POISON_INVOKED.store(false, Ordering::SeqCst);
    let out = ctx.evaluate(&call("POISONED", vec![num(1.0), div0(), num(2.0)]));
    expect_error(out, ErrorKind::Div);
    assert!(
        !POISON_INVOKED.load(Ordering::SeqCst),
        "handler must not run when an argument errors"
    );

    // without an error argument it does run
    let out = ctx.evaluate(&call("POISONED", vec![num(1.0)]));
    assert_eq!(out, LiteralValue::Text("handler ran".into()));
    assert!(POISON_INVOKED.load(Ordering::SeqCst));
}

#[test]
fn propagate_first_takes_the_leftmost_error() {
    let ctx = EvalContext::new(&());
    let bad_name = name("nosuch");
    let out = ctx.evaluate(&call("POWER", vec![bad_name, div0()]));
    expect_error(out, ErrorKind::Name);
}

#[test]
fn arity_violation_beats_argument_errors() {
    let ctx = EvalContext::new(&());
    // ABS takes exactly one argument; the #DIV/0! args are never evaluated.
    let out = ctx.evaluate(&call("ABS", vec![div0(), div0()]));
    expect_error(out, ErrorKind::Value);
}

#[test]
fn unknown_name_beats_everything() {
    let ctx = EvalContext::new(&());
    let out = ctx.evaluate(&call("TOTALLY_UNKNOWN", vec![div0()]));
    expect_error(out, ErrorKind::Name);
}

/* ─── SHORT_CIRCUIT ─── */

#[test]
fn and_is_order_sensitive_about_errors() {
    let ctx = EvalContext::new(&());
    assert_eq!(
        ctx.evaluate(&call("AND", vec![boolean(false), div0()])),
        LiteralValue::Boolean(false)
    );
    expect_error(
        ctx.evaluate(&call("AND", vec![div0(), boolean(false)])),
        ErrorKind::Div,
    );
}

#[test]
fn or_is_order_sensitive_about_errors() {
    let ctx = EvalContext::new(&());
    assert_eq!(
        ctx.evaluate(&call("OR", vec![boolean(true), div0()])),
        LiteralValue::Boolean(true)
    );
    expect_error(
        ctx.evaluate(&call("OR", vec![div0(), boolean(true)])),
        ErrorKind::Div,
    );
}

/* ─── SKIP_ERRORS ─── */

#[test]
fn sum_skips_errors_until_nothing_is_left() {
    let ctx = EvalContext::new(&());
    assert_eq!(
        ctx.evaluate(&call("SUM", vec![div0(), num(5.0), num(10.0)])),
        n(15.0)
    );
    // every operand is an error: the first one comes back
    let text_error = div(num(1.0), text("x")); // #VALUE!
    expect_error(
        ctx.evaluate(&call("SUM", vec![div0(), text_error])),
        ErrorKind::Div,
    );
}

#[test]
fn sum_flattens_ranges_and_skips_error_cells() {
    let wb = TestWorkbook::new()
        .with_column(1, 1, vec![n(1.0), n(2.0), LiteralValue::Error(calcine_common::ExcelError::new_div()), n(4.0)]);
    assert_eq!(wb.evaluate(&call("SUM", vec![range(1, 1, 4, 1)])), n(7.0));
}

/* ─── LAZY_EVALUATION ─── */

#[test]
fn if_never_touches_the_untaken_branch() {
    let ctx = EvalContext::new(&());
    assert_eq!(
        ctx.evaluate(&call("IF", vec![boolean(true), num(1.0), div0()])),
        n(1.0)
    );
    assert_eq!(
        ctx.evaluate(&call("IF", vec![boolean(false), div0(), num(2.0)])),
        n(2.0)
    );
    // missing else-branch reads FALSE
    assert_eq!(
        ctx.evaluate(&call("IF", vec![boolean(false), num(1.0)])),
        LiteralValue::Boolean(false)
    );
}

#[test]
fn iferror_catches_and_ifna_filters() {
    let ctx = EvalContext::new(&());
    assert_eq!(
        ctx.evaluate(&call("IFERROR", vec![div0(), num(0.0)])),
        n(0.0)
    );
    assert_eq!(
        ctx.evaluate(&call("IFNA", vec![call("NA", vec![]), num(0.0)])),
        n(0.0)
    );
    // IFNA lets non-#N/A errors through
    expect_error(
        ctx.evaluate(&call("IFNA", vec![div0(), num(0.0)])),
        ErrorKind::Div,
    );
}

#[test]
fn switch_matches_and_falls_back() {
    let ctx = EvalContext::new(&());
    let formula = |sel| {
        call(
            "SWITCH",
            vec![sel, num(1.0), text("one"), num(2.0), text("two"), text("other")],
        )
    };
    assert_eq!(ctx.evaluate(&formula(num(2.0))), "two".into());
    assert_eq!(ctx.evaluate(&formula(num(9.0))), "other".into());
    expect_error(
        ctx.evaluate(&call("SWITCH", vec![num(9.0), num(1.0), text("one")])),
        ErrorKind::Na,
    );
}

#[test]
fn error_inspectors_observe_instead_of_propagating() {
    let ctx = EvalContext::new(&());
    assert_eq!(
        ctx.evaluate(&call("ISERROR", vec![div0()])),
        LiteralValue::Boolean(true)
    );
    assert_eq!(
        ctx.evaluate(&call("ISNA", vec![div0()])),
        LiteralValue::Boolean(false)
    );
    assert_eq!(
        ctx.evaluate(&call("ISNA", vec![call("NA", vec![])])),
        LiteralValue::Boolean(true)
    );
}

/* ─── LOOKUP_STRICT ─── */

#[test]
fn vlookup_rejects_a_scalar_table_with_ref() {
    let ctx = EvalContext::new(&());
    let out = ctx.evaluate(&call("VLOOKUP", vec![num(1.0), num(5.0), num(1.0)]));
    expect_error(out, ErrorKind::Ref);
}

#[test]
fn column_index_outside_the_table_is_ref() {
    let wb = TestWorkbook::new()
        .with_row(1, 1, vec![n(1.0), "one".into()])
        .with_row(2, 1, vec![n(2.0), "two".into()]);
    let out = wb.evaluate(&call(
        "VLOOKUP",
        vec![num(2.0), range(1, 1, 2, 2), num(3.0), boolean(false)],
    ));
    expect_error(out, ErrorKind::Ref);
}

#[test]
fn vlookup_reads_through_a_live_reference() {
    let wb = TestWorkbook::new()
        .with_row(1, 1, vec![n(1.0), "one".into()])
        .with_row(2, 1, vec![n(2.0), "two".into()]);
    let out = wb.evaluate(&call(
        "VLOOKUP",
        vec![num(2.0), range(1, 1, 2, 2), num(2.0), boolean(false)],
    ));
    assert_eq!(out, "two".into());
}

#[test]
fn index_arguments_coerce_numeric_strings_only() {
    let wb = TestWorkbook::new()
        .with_row(1, 1, vec![n(1.0), "one".into()])
        .with_row(2, 1, vec![n(2.0), "two".into()]);
    let out = wb.evaluate(&call(
        "VLOOKUP",
        vec![num(2.0), range(1, 1, 2, 2), text("2"), boolean(false)],
    ));
    assert_eq!(out, "two".into());
    expect_error(
        wb.evaluate(&call(
            "VLOOKUP",
            vec![num(2.0), range(1, 1, 2, 2), text("abc"), boolean(false)],
        )),
        ErrorKind::Value,
    );
}

#[test]
fn lookup_miss_is_na_and_stays_na() {
    let wb = TestWorkbook::new().with_row(1, 1, vec![n(1.0), n(2.0)]);
    let out = wb.evaluate(&call(
        "MATCH",
        vec![num(9.0), range(1, 1, 1, 2), num(0.0)],
    ));
    expect_error(out, ErrorKind::Na);
}

/* ─── FINANCIAL_STRICT ─── */

#[test]
fn financial_rejects_booleans_and_accepts_numeric_text() {
    let ctx = EvalContext::new(&());
    expect_error(
        ctx.evaluate(&call("PV", vec![boolean(true), num(10.0), num(-100.0)])),
        ErrorKind::Value,
    );
    let out = ctx.evaluate(&call("PV", vec![text("0"), text("10"), num(-100.0)]));
    assert_eq!(out, n(1000.0));
}

#[test]
fn npv_overflow_maps_to_div0() {
    // rate = -1 makes every discount factor zero
    let ctx = EvalContext::new(&());
    let out = ctx.evaluate(&call("NPV", vec![num(-1.0), num(100.0)]));
    expect_error(out, ErrorKind::Div);
}

#[test]
fn irr_residual_is_within_tolerance_or_num() {
    let wb = TestWorkbook::new()
        .with_column(1, 1, vec![n(-1000.0), n(300.0), n(400.0), n(500.0)]);
    let out = wb.evaluate(&call("IRR", vec![range(1, 1, 4, 1)]));
    match out {
        LiteralValue::Number(r) => {
            let flows = [-1000.0, 300.0, 400.0, 500.0];
            let residual: f64 = flows
                .iter()
                .enumerate()
                .map(|(i, cf)| cf / (1.0 + r).powi(i as i32))
                .sum();
            assert!(residual.abs() < 1e-7, "npv({r}) = {residual}");
        }
        LiteralValue::Error(e) => assert_eq!(e.kind, ErrorKind::Num),
        other => panic!("unexpected IRR result: {other}"),
    }
}

/* ─── references and cells ─── */

#[test]
fn blank_cells_read_as_empty_and_error_cells_propagate() {
    let wb = TestWorkbook::new()
        .with_cell(1, 1, LiteralValue::Error(calcine_common::ExcelError::new_num()));
    assert_eq!(wb.evaluate(&cell(9, 9)), LiteralValue::Empty);
    expect_error(wb.evaluate(&cell(1, 1)), ErrorKind::Num);
}

#[test]
fn ranges_materialize_row_major() {
    let wb = TestWorkbook::new()
        .with_row(1, 1, vec![n(1.0), n(2.0)])
        .with_row(2, 1, vec![n(3.0), n(4.0)]);
    assert_eq!(
        wb.evaluate(&range(1, 1, 2, 2)),
        LiteralValue::Array(vec![vec![n(1.0), n(2.0)], vec![n(3.0), n(4.0)]])
    );
}
