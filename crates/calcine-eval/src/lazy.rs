//! Lazy control flow: the strategies whose arguments arrive unevaluated.
//!
//! Each [`LazyKind`] is one control-flow shape the dispatcher routes here
//! instead of calling an eager handler. Branch selectors evaluate first; the
//! branches they reject are never evaluated, which is both the laziness
//! contract and the reason IFERROR can suppress errors PROPAGATE_FIRST never
//! could.

use calcine_common::{ErrorKind, ExcelError, LiteralValue};
use smallvec::SmallVec;
use std::cmp::Ordering;

use crate::ast::ExprNode;
use crate::coercion::{compare_values, to_logical};
use crate::function::{FunctionMetadata, LazyKind};
use crate::interpreter::{validate_params, Interpreter};
use crate::scope::ScopeId;

pub(crate) fn eval_lazy(
    interp: &Interpreter<'_, '_>,
    kind: LazyKind,
    meta: &FunctionMetadata,
    args: &[ExprNode],
    scope: Option<ScopeId>,
) -> Result<LiteralValue, ExcelError> {
    match kind {
        LazyKind::If => eval_if(interp, args, scope),
        LazyKind::Ifs => eval_ifs(interp, meta, args, scope),
        LazyKind::IfError => eval_if_error(interp, args, scope, None),
        LazyKind::IfNa => eval_if_error(interp, args, scope, Some(ErrorKind::Na)),
        LazyKind::Switch => eval_switch(interp, args, scope),
        LazyKind::Let => eval_let(interp, meta, args, scope),
        LazyKind::Lambda => eval_lambda_literal(interp, meta, args, scope),
        LazyKind::IsError => eval_inspect(interp, args, scope, None),
        LazyKind::IsNa => eval_inspect(interp, args, scope, Some(ErrorKind::Na)),
    }
}

/// IF(condition, then, [else]). A blank condition is FALSE; the untaken
/// branch is never evaluated; a missing else-branch yields FALSE.
fn eval_if(
    interp: &Interpreter<'_, '_>,
    args: &[ExprNode],
    scope: Option<ScopeId>,
) -> Result<LiteralValue, ExcelError> {
    let cond = interp.eval(&args[0], scope)?;
    let taken = to_logical(&cond)?.unwrap_or(false);
    if taken {
        interp.eval(&args[1], scope)
    } else if args.len() > 2 {
        interp.eval(&args[2], scope)
    } else {
        Ok(LiteralValue::Boolean(false))
    }
}

/// IFS(cond1, value1, cond2, value2, ...): first true condition wins, later
/// pairs stay unevaluated, no match is `#N/A`.
fn eval_ifs(
    interp: &Interpreter<'_, '_>,
    meta: &FunctionMetadata,
    args: &[ExprNode],
    scope: Option<ScopeId>,
) -> Result<LiteralValue, ExcelError> {
    if args.len() % 2 != 0 {
        return Err(ExcelError::new_value().with_message(format!(
            "{} requires condition/value pairs",
            meta.name
        )));
    }
    for pair in args.chunks_exact(2) {
        let cond = interp.eval(&pair[0], scope)?;
        if to_logical(&cond)?.unwrap_or(false) {
            return interp.eval(&pair[1], scope);
        }
    }
    Err(ExcelError::new_na().with_message("no condition was true"))
}

/// IFERROR / IFNA. `only` narrows which error kinds the fallback catches;
/// other kinds propagate untouched. The fallback is evaluated only on a
/// caught error.
fn eval_if_error(
    interp: &Interpreter<'_, '_>,
    args: &[ExprNode],
    scope: Option<ScopeId>,
    only: Option<ErrorKind>,
) -> Result<LiteralValue, ExcelError> {
    match interp.eval(&args[0], scope) {
        Ok(v) => Ok(v),
        Err(e) if only.is_none() || only == Some(e.kind) => interp.eval(&args[1], scope),
        Err(e) => Err(e),
    }
}

/// SWITCH(selector, case1, result1, ..., [default]).
fn eval_switch(
    interp: &Interpreter<'_, '_>,
    args: &[ExprNode],
    scope: Option<ScopeId>,
) -> Result<LiteralValue, ExcelError> {
    let selector = interp.eval(&args[0], scope)?;
    let rest = &args[1..];
    let pairs = rest.len() / 2;
    for i in 0..pairs {
        let case = interp.eval(&rest[2 * i], scope)?;
        if compare_values(&selector, &case)? == Ordering::Equal {
            return interp.eval(&rest[2 * i + 1], scope);
        }
    }
    if rest.len() % 2 == 1 {
        // trailing unpaired argument is the default branch
        return interp.eval(&rest[rest.len() - 1], scope);
    }
    Err(ExcelError::new_na().with_message("no case matched"))
}

/// LET(name1, value1, ..., body): sequential write-once bindings, each value
/// expression seeing every binding before it. An error from any value
/// expression propagates immediately; the body never runs.
fn eval_let(
    interp: &Interpreter<'_, '_>,
    meta: &FunctionMetadata,
    args: &[ExprNode],
    scope: Option<ScopeId>,
) -> Result<LiteralValue, ExcelError> {
    if args.len() % 2 == 0 {
        return Err(ExcelError::new_value().with_message(format!(
            "{} requires name/value pairs followed by a body",
            meta.name
        )));
    }
    let pairs = args.len() / 2;
    let names = args[..2 * pairs]
        .iter()
        .step_by(2)
        .map(|n| {
            n.as_name().ok_or_else(|| {
                ExcelError::new_value()
                    .with_message(format!("{} binding names must be identifiers", meta.name))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    validate_params(names.iter().copied())?;

    let child = interp.ctx.runtime.borrow_mut().new_scope(scope);
    for (i, name) in names.iter().enumerate() {
        let bound = interp.eval(&args[2 * i + 1], Some(child))?;
        interp.ctx.runtime.borrow_mut().push_binding(child, name, bound);
    }
    interp.eval(&args[2 * pairs], Some(child))
}

/// LAMBDA(param1, ..., paramN, body): records the parameter list, the owned
/// body, and the scope active *here*, producing a first-class value. No
/// parameter binding or body evaluation happens until invocation.
fn eval_lambda_literal(
    interp: &Interpreter<'_, '_>,
    meta: &FunctionMetadata,
    args: &[ExprNode],
    scope: Option<ScopeId>,
) -> Result<LiteralValue, ExcelError> {
    let (body, params) = match args.split_last() {
        Some(split) => split,
        None => return Err(ExcelError::new_value()), // min_args makes this unreachable
    };
    let names = params
        .iter()
        .map(|p| {
            p.as_name().ok_or_else(|| {
                ExcelError::new_value()
                    .with_message(format!("{} parameters must be identifiers", meta.name))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    validate_params(names.iter().copied())?;
    let params: SmallVec<[String; 4]> = names.into_iter().map(str::to_string).collect();
    let id = interp
        .ctx
        .runtime
        .borrow_mut()
        .new_lambda(params, body.clone(), scope);
    Ok(LiteralValue::Lambda(id))
}

/// ISERROR / ISNA: the inspectors observe the argument's error instead of
/// propagating it. `only` narrows ISNA to `#N/A`; other errors read FALSE.
fn eval_inspect(
    interp: &Interpreter<'_, '_>,
    args: &[ExprNode],
    scope: Option<ScopeId>,
    only: Option<ErrorKind>,
) -> Result<LiteralValue, ExcelError> {
    let hit = match interp.eval(&args[0], scope) {
        Ok(_) => false,
        Err(e) => only.is_none() || only == Some(e.kind),
    };
    Ok(LiteralValue::Boolean(hit))
}
