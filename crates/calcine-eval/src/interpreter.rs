//! The tree-walking evaluator and its error-strategy dispatcher.
//!
//! `EvalContext` is the session: it owns the registry handle, the worksheet
//! accessor, the scope/lambda arena, and the recursion and RNG counters. One
//! `Interpreter` is created per top-level [`EvalContext::evaluate`] call and
//! carries that evaluation's subexpression cache.
//!
//! Errors travel on the `Err` channel while a subtree is being evaluated and
//! are folded back into `LiteralValue::Error` at the public boundary, so
//! callers only ever see errors as values.

use std::cell::{Cell, RefCell};
use std::cmp::Ordering;

use calcine_common::{CellAddr, ExcelError, LambdaId, LiteralValue, Reference};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::ast::{BinaryOpKind, ExprNode, UnaryOpKind};
use crate::coercion::{compare_values, sanitize_numeric, to_logical, to_number_lenient, to_text};
use crate::function::{ArgSpec, Axis, ErrorStrategy, FunctionMetadata, Handler};
use crate::registry::{default_registry, FunctionRegistry};
use crate::scope::{DepthGuard, LambdaRuntime, ScopeId};
use crate::traits::{CellResolver, HandlerCtx};

/// Seed used when the host does not supply one.
const DEFAULT_RNG_SEED: u64 = 0x9E37_79B9_7F4A_7C15;

/// Everything one evaluation session needs: registry, worksheet accessor,
/// the lambda/scope arena, and per-session counters. Cheap to construct,
/// single-threaded by design (`Send` across sessions, shared by none).
pub struct EvalContext<'a> {
    registry: &'a FunctionRegistry,
    resolver: &'a dyn CellResolver,
    current_cell: Option<CellAddr>,
    pub(crate) runtime: RefCell<LambdaRuntime>,
    pub(crate) depth: Cell<u32>,
    rng: RefCell<SmallRng>,
}

impl<'a> EvalContext<'a> {
    /// A context over the built-in registry.
    pub fn new(resolver: &'a dyn CellResolver) -> Self {
        Self::with_registry(default_registry(), resolver)
    }

    pub fn with_registry(registry: &'a FunctionRegistry, resolver: &'a dyn CellResolver) -> Self {
        Self {
            registry,
            resolver,
            current_cell: None,
            runtime: RefCell::new(LambdaRuntime::default()),
            depth: Cell::new(0),
            rng: RefCell::new(SmallRng::seed_from_u64(DEFAULT_RNG_SEED)),
        }
    }

    /// Set the cell this formula notionally lives in (ROW()/COLUMN()).
    pub fn current_cell(mut self, addr: CellAddr) -> Self {
        self.current_cell = Some(addr);
        self
    }

    /// Seed the context's deterministic RNG stream.
    pub fn rng_seed(self, seed: u64) -> Self {
        self.rng.replace(SmallRng::seed_from_u64(seed));
        self
    }

    /// Evaluate one expression tree to a value. Errors come back as
    /// `LiteralValue::Error`, never as panics or Rust errors.
    pub fn evaluate(&self, node: &ExprNode) -> LiteralValue {
        self.depth.set(0);
        let interp = Interpreter::new(self);
        interp
            .eval(node, None)
            .unwrap_or_else(LiteralValue::Error)
    }

    /// Define an anonymous lambda directly (host-side convenience; formulas
    /// go through the LAMBDA function).
    pub fn define_lambda(&self, params: &[&str], body: ExprNode) -> Result<LambdaId, ExcelError> {
        validate_params(params.iter().copied())?;
        let params: SmallVec<[String; 4]> = params.iter().map(|p| p.to_string()).collect();
        Ok(self.runtime.borrow_mut().new_lambda(params, body, None))
    }

    /// Define a lambda and make it callable by name from any formula
    /// evaluated in this context.
    pub fn register_lambda(
        &self,
        name: &str,
        params: &[&str],
        body: ExprNode,
    ) -> Result<LambdaId, ExcelError> {
        let id = self.define_lambda(params, body)?;
        self.runtime.borrow_mut().register_named(name, id);
        Ok(id)
    }

    pub(crate) fn handler_ctx(&self) -> HandlerCtx<'_> {
        HandlerCtx::new(self.resolver, self.current_cell, &self.rng)
    }

    pub(crate) fn read_cell(&self, addr: CellAddr) -> LiteralValue {
        self.resolver.get_cell(addr).unwrap_or(LiteralValue::Empty)
    }
}

/// Parameter lists must be non-empty identifiers, unique case-insensitively.
pub(crate) fn validate_params<'p>(
    params: impl Iterator<Item = &'p str>,
) -> Result<(), ExcelError> {
    let mut seen: Vec<String> = Vec::new();
    for p in params {
        if p.is_empty() {
            return Err(ExcelError::new_value().with_message("empty parameter name"));
        }
        let upper = p.to_ascii_uppercase();
        if seen.contains(&upper) {
            return Err(ExcelError::new_value()
                .with_message(format!("duplicate parameter name '{p}'")));
        }
        seen.push(upper);
    }
    Ok(())
}

/// One top-level evaluation: the walker plus its subexpression cache.
pub(crate) struct Interpreter<'c, 'a> {
    pub(crate) ctx: &'c EvalContext<'a>,
    /// Results of scope-free, non-volatile call subtrees, keyed by
    /// structural fingerprint. Never consulted inside LET/lambda scopes,
    /// where identical trees may resolve names differently.
    cache: RefCell<FxHashMap<u64, LiteralValue>>,
    volatility: RefCell<FxHashMap<u64, bool>>,
}

impl<'c, 'a> Interpreter<'c, 'a> {
    pub(crate) fn new(ctx: &'c EvalContext<'a>) -> Self {
        Self {
            ctx,
            cache: RefCell::new(FxHashMap::default()),
            volatility: RefCell::new(FxHashMap::default()),
        }
    }

    pub(crate) fn eval(
        &self,
        node: &ExprNode,
        scope: Option<ScopeId>,
    ) -> Result<LiteralValue, ExcelError> {
        match node {
            ExprNode::Literal(LiteralValue::Error(e)) => Err(e.clone()),
            ExprNode::Literal(v) => Ok(v.clone()),
            ExprNode::Missing => Ok(LiteralValue::Omitted),
            ExprNode::Reference(r) => self.deref_reference(r),
            ExprNode::Name(n) => self.resolve_name(n, scope),
            ExprNode::UnaryOp { op, expr } => self.eval_unary(*op, expr, scope),
            ExprNode::BinaryOp { op, left, right } => self.eval_binary(*op, left, right, scope),
            ExprNode::Call { name, args } => {
                if scope.is_none() && !self.is_volatile(node) {
                    let key = node.fingerprint();
                    if let Some(hit) = self.cache.borrow().get(&key) {
                        return match hit {
                            LiteralValue::Error(e) => Err(e.clone()),
                            v => Ok(v.clone()),
                        };
                    }
                    let result = self.eval_call(name, args, scope);
                    let memo = match &result {
                        Ok(v) => v.clone(),
                        Err(e) => LiteralValue::Error(e.clone()),
                    };
                    self.cache.borrow_mut().insert(key, memo);
                    result
                } else {
                    self.eval_call(name, args, scope)
                }
            }
            ExprNode::Invoke { callee, args } => {
                let target = self.eval(callee, scope)?;
                match target {
                    LiteralValue::Lambda(id) => self.invoke_lambda(id, args, scope),
                    _ => Err(ExcelError::new_value().with_message("value is not callable")),
                }
            }
        }
    }

    /// Whether any call in the subtree is volatile. Unknown names are
    /// treated as volatile: they may resolve to lambdas with volatile
    /// bodies, and an unknown-name miss must stay uncached anyway.
    fn is_volatile(&self, node: &ExprNode) -> bool {
        match node {
            ExprNode::Literal(_) | ExprNode::Reference(_) | ExprNode::Name(_) | ExprNode::Missing => {
                false
            }
            ExprNode::UnaryOp { expr, .. } => self.is_volatile(expr),
            ExprNode::BinaryOp { left, right, .. } => {
                self.is_volatile(left) || self.is_volatile(right)
            }
            ExprNode::Invoke { .. } => true,
            ExprNode::Call { name, args } => {
                let key = node.fingerprint();
                if let Some(&v) = self.volatility.borrow().get(&key) {
                    return v;
                }
                let own = match self.ctx.registry.lookup(&name.to_ascii_uppercase()) {
                    Some(meta) => meta.volatile,
                    None => true,
                };
                let v = own || args.iter().any(|a| self.is_volatile(a));
                self.volatility.borrow_mut().insert(key, v);
                v
            }
        }
    }

    /// A single cell dereferences to its value (blank = `Empty`), a
    /// multi-cell range to a row-major array. Error cells propagate.
    fn deref_reference(&self, reference: &Reference) -> Result<LiteralValue, ExcelError> {
        if reference.is_single_cell() {
            match self.ctx.read_cell(reference.as_range().start) {
                LiteralValue::Error(e) => Err(e),
                v => Ok(v),
            }
        } else {
            Ok(LiteralValue::Array(
                self.ctx.handler_ctx().materialize(reference),
            ))
        }
    }

    fn resolve_name(
        &self,
        name: &str,
        scope: Option<ScopeId>,
    ) -> Result<LiteralValue, ExcelError> {
        if let Some(scope) = scope {
            if let Some(v) = self.ctx.runtime.borrow().lookup(scope, name) {
                return match v {
                    LiteralValue::Error(e) => Err(e.clone()),
                    v => Ok(v.clone()),
                };
            }
        }
        if let Some(id) = self.ctx.runtime.borrow().named(name) {
            return Ok(LiteralValue::Lambda(id));
        }
        Err(ExcelError::new_name().with_message(format!("name '{name}' is not defined")))
    }

    /* ─── operators ─── */

    fn eval_unary(
        &self,
        op: UnaryOpKind,
        expr: &ExprNode,
        scope: Option<ScopeId>,
    ) -> Result<LiteralValue, ExcelError> {
        let n = to_number_lenient(&self.eval(expr, scope)?)?;
        let out = match op {
            UnaryOpKind::Plus => n,
            UnaryOpKind::Minus => -n,
            UnaryOpKind::Percent => n / 100.0,
        };
        Ok(LiteralValue::Number(sanitize_numeric(out)?))
    }

    fn eval_binary(
        &self,
        op: BinaryOpKind,
        left: &ExprNode,
        right: &ExprNode,
        scope: Option<ScopeId>,
    ) -> Result<LiteralValue, ExcelError> {
        let l = self.eval(left, scope)?;
        let r = self.eval(right, scope)?;
        match op {
            BinaryOpKind::Add => numeric_op(&l, &r, |a, b| Ok(a + b)),
            BinaryOpKind::Sub => numeric_op(&l, &r, |a, b| Ok(a - b)),
            BinaryOpKind::Mul => numeric_op(&l, &r, |a, b| Ok(a * b)),
            BinaryOpKind::Div => numeric_op(&l, &r, |a, b| {
                if b == 0.0 {
                    Err(ExcelError::new_div())
                } else {
                    Ok(a / b)
                }
            }),
            BinaryOpKind::Pow => numeric_op(&l, &r, |a, b| {
                if a == 0.0 && b == 0.0 {
                    return Err(ExcelError::new_num());
                }
                Ok(a.powf(b))
            }),
            BinaryOpKind::Concat => Ok(LiteralValue::Text(format!(
                "{}{}",
                to_text(&l),
                to_text(&r)
            ))),
            BinaryOpKind::Eq => Ok(LiteralValue::Boolean(
                compare_values(&l, &r)? == Ordering::Equal,
            )),
            BinaryOpKind::Ne => Ok(LiteralValue::Boolean(
                compare_values(&l, &r)? != Ordering::Equal,
            )),
            BinaryOpKind::Lt => Ok(LiteralValue::Boolean(
                compare_values(&l, &r)? == Ordering::Less,
            )),
            BinaryOpKind::Le => Ok(LiteralValue::Boolean(
                compare_values(&l, &r)? != Ordering::Greater,
            )),
            BinaryOpKind::Gt => Ok(LiteralValue::Boolean(
                compare_values(&l, &r)? == Ordering::Greater,
            )),
            BinaryOpKind::Ge => Ok(LiteralValue::Boolean(
                compare_values(&l, &r)? != Ordering::Less,
            )),
        }
    }

    /* ─── call dispatch ─── */

    fn eval_call(
        &self,
        name: &str,
        args: &[ExprNode],
        scope: Option<ScopeId>,
    ) -> Result<LiteralValue, ExcelError> {
        let canonical = name.to_ascii_uppercase();
        if let Some(meta) = self.ctx.registry.lookup(&canonical) {
            return self.dispatch(meta, args, scope);
        }
        // Not a builtin: a scope binding or a named lambda may be callable.
        if let Some(scope_id) = scope {
            let bound = self.ctx.runtime.borrow().lookup(scope_id, name).cloned();
            if let Some(v) = bound {
                return match v {
                    LiteralValue::Lambda(id) => self.invoke_lambda(id, args, scope),
                    LiteralValue::Error(e) => Err(e),
                    _ => Err(ExcelError::new_value()
                        .with_message(format!("'{name}' is not callable"))),
                };
            }
        }
        let named = self.ctx.runtime.borrow().named(&canonical);
        if let Some(id) = named {
            return self.invoke_lambda(id, args, scope);
        }
        Err(ExcelError::new_name().with_message(format!("unknown function '{canonical}'")))
    }

    /// The error-strategy dispatcher. Arity is checked before any argument
    /// is evaluated; the strategy then decides evaluation order, error
    /// routing, and pre/post validation.
    fn dispatch(
        &self,
        meta: &FunctionMetadata,
        args: &[ExprNode],
        scope: Option<ScopeId>,
    ) -> Result<LiteralValue, ExcelError> {
        if args.len() < meta.min_args || args.len() > meta.max_args {
            return Err(ExcelError::new_value().with_message(format!(
                "{} expects between {} and {} arguments, got {}",
                meta.name,
                meta.min_args,
                meta.max_args,
                args.len()
            )));
        }
        match meta.strategy {
            ErrorStrategy::PropagateFirst => {
                let mut values = Vec::with_capacity(args.len());
                for a in args {
                    values.push(self.eval(a, scope)?);
                }
                self.invoke_handler(meta, &values)
            }
            ErrorStrategy::SkipErrors => self.dispatch_skip_errors(meta, args, scope),
            ErrorStrategy::ShortCircuit { circuit_on } => {
                self.dispatch_short_circuit(circuit_on, args, scope)
            }
            ErrorStrategy::LazyEvaluation => match meta.handler {
                Handler::Lazy(kind) => crate::lazy::eval_lazy(self, kind, meta, args, scope),
                // Unreachable per registry construction; fail closed.
                _ => Err(ExcelError::new_value()
                    .with_message(format!("{} has no lazy control flow", meta.name))),
            },
            ErrorStrategy::LookupStrict => self.dispatch_lookup(meta, args, scope),
            ErrorStrategy::FinancialStrict { on_overflow } => {
                self.dispatch_financial(meta, on_overflow, args, scope)
            }
        }
    }

    fn dispatch_skip_errors(
        &self,
        meta: &FunctionMetadata,
        args: &[ExprNode],
        scope: Option<ScopeId>,
    ) -> Result<LiteralValue, ExcelError> {
        let mut survivors = Vec::new();
        let mut first_error: Option<ExcelError> = None;
        for a in args {
            match self.eval(a, scope) {
                Ok(v) => flatten_value(v, &mut survivors, &mut first_error),
                Err(e) => {
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }
        if survivors.is_empty() {
            if let Some(e) = first_error {
                return Err(e);
            }
        }
        self.invoke_handler(meta, &survivors)
    }

    fn dispatch_short_circuit(
        &self,
        circuit_on: bool,
        args: &[ExprNode],
        scope: Option<ScopeId>,
    ) -> Result<LiteralValue, ExcelError> {
        let mut saw_operand = false;
        for a in args {
            // An error observed before any deciding operand propagates;
            // operands after the decision are never evaluated at all.
            let v = self.eval(a, scope)?;
            let mut flat = Vec::new();
            let mut embedded: Option<ExcelError> = None;
            flatten_value(v, &mut flat, &mut embedded);
            if let Some(e) = embedded {
                return Err(e);
            }
            for operand in &flat {
                match to_logical(operand)? {
                    Some(b) => {
                        saw_operand = true;
                        if b == circuit_on {
                            return Ok(LiteralValue::Boolean(circuit_on));
                        }
                    }
                    None => {} // blanks are transparent
                }
            }
        }
        if saw_operand {
            Ok(LiteralValue::Boolean(!circuit_on))
        } else {
            Err(ExcelError::new_value().with_message("no logical operands"))
        }
    }

    fn dispatch_lookup(
        &self,
        meta: &FunctionMetadata,
        args: &[ExprNode],
        scope: Option<ScopeId>,
    ) -> Result<LiteralValue, ExcelError> {
        // Table-shaped reference arguments stay as references so the handler
        // can address the worksheet; everything else evaluates eagerly.
        let mut values = Vec::with_capacity(args.len());
        for (i, a) in args.iter().enumerate() {
            let v = match (meta.arg_spec(i), a) {
                (ArgSpec::Table, ExprNode::Reference(r)) => LiteralValue::Reference(*r),
                _ => self.eval(a, scope)?,
            };
            values.push(v);
        }

        // Shape validation before dispatch: tables must be two-dimensional
        // and index arguments must land inside the nearest preceding table.
        let mut table_dims: Option<(usize, usize)> = None;
        for (i, v) in values.iter().enumerate() {
            match meta.arg_spec(i) {
                ArgSpec::Table => {
                    table_dims = Some(match v {
                        LiteralValue::Reference(r) => r.dims(),
                        LiteralValue::Array(rows) => {
                            (rows.len(), rows.first().map_or(0, Vec::len))
                        }
                        _ => {
                            return Err(ExcelError::new_ref().with_message(format!(
                                "{} argument {} must be a range or array",
                                meta.name,
                                i + 1
                            )))
                        }
                    });
                }
                ArgSpec::Index { axis, allow_zero } => {
                    if matches!(v, LiteralValue::Omitted | LiteralValue::Empty) {
                        continue; // optional index, handler applies its default
                    }
                    let idx = to_number_lenient(v)?.trunc() as i64;
                    let bound = match (table_dims, axis) {
                        (Some((rows, _)), Axis::Rows) => rows as i64,
                        (Some((_, cols)), Axis::Cols) => cols as i64,
                        (None, _) => i64::MAX,
                    };
                    let in_bounds = (idx == 0 && allow_zero) || (1..=bound).contains(&idx);
                    if !in_bounds {
                        return Err(ExcelError::new_ref().with_message(format!(
                            "{} index {} is outside the table",
                            meta.name, idx
                        )));
                    }
                }
                ArgSpec::Scalar => {
                    if matches!(v, LiteralValue::Array(_) | LiteralValue::Reference(_)) {
                        return Err(ExcelError::new_value().with_message(format!(
                            "{} argument {} must be a scalar",
                            meta.name,
                            i + 1
                        )));
                    }
                }
                ArgSpec::Any => {}
            }
        }
        // A handler #N/A from here on is a legitimate "not found" result.
        self.invoke_handler(meta, &values)
    }

    fn dispatch_financial(
        &self,
        meta: &FunctionMetadata,
        on_overflow: calcine_common::ErrorKind,
        args: &[ExprNode],
        scope: Option<ScopeId>,
    ) -> Result<LiteralValue, ExcelError> {
        let mut values = Vec::with_capacity(args.len());
        for a in args {
            let v = self.eval(a, scope)?;
            values.push(coerce_financial(v)?);
        }
        match self.invoke_handler(meta, &values)? {
            LiteralValue::Number(n) if n.is_nan() => Err(ExcelError::new_value()
                .with_message(format!("{} produced an undefined result", meta.name))),
            LiteralValue::Number(n) if !n.is_finite() => {
                Err(ExcelError::new(on_overflow)
                    .with_message(format!("{} overflowed", meta.name)))
            }
            v => Ok(v),
        }
    }

    fn invoke_handler(
        &self,
        meta: &FunctionMetadata,
        values: &[LiteralValue],
    ) -> Result<LiteralValue, ExcelError> {
        let result = match meta.handler {
            Handler::Pure(f) => f(values),
            Handler::Contextual(f) => f(&self.ctx.handler_ctx(), values),
            Handler::Iterative(f) => {
                let policy = meta.iteration.unwrap_or_default();
                f(&policy, values)
            }
            Handler::Lazy(_) => {
                // Lazy handlers never reach here; dispatch routes them first.
                return Err(ExcelError::new_value()
                    .with_message(format!("{} cannot be invoked eagerly", meta.name)));
            }
        };
        match result {
            LiteralValue::Error(e) => Err(e),
            v => Ok(v),
        }
    }

    /* ─── lambda invocation ─── */

    pub(crate) fn invoke_lambda(
        &self,
        id: LambdaId,
        args: &[ExprNode],
        scope: Option<ScopeId>,
    ) -> Result<LiteralValue, ExcelError> {
        let _guard = DepthGuard::enter(&self.ctx.depth)?;
        let (params, body, captured) = {
            let rt = self.ctx.runtime.borrow();
            let rec = rt.lambda(id);
            (rec.params.clone(), rec.body.clone(), rec.captured)
        };
        if args.len() != params.len() {
            return Err(ExcelError::new_value().with_message(format!(
                "lambda expects {} arguments, got {}",
                params.len(),
                args.len()
            )));
        }
        // Arguments evaluate eagerly in the caller's scope. Error results
        // bind as values: the body may inspect them (IFERROR et al.) or
        // surface them when the parameter is used numerically.
        let mut bound = Vec::with_capacity(args.len());
        for a in args {
            bound.push(match self.eval(a, scope) {
                Ok(v) => v,
                Err(e) => LiteralValue::Error(e),
            });
        }
        let child = {
            let mut rt = self.ctx.runtime.borrow_mut();
            let child = rt.new_scope(captured);
            for (p, v) in params.iter().zip(bound) {
                rt.push_binding(child, p, v);
            }
            child
        };
        self.eval(&body, Some(child))
    }
}

fn numeric_op(
    l: &LiteralValue,
    r: &LiteralValue,
    f: impl Fn(f64, f64) -> Result<f64, ExcelError>,
) -> Result<LiteralValue, ExcelError> {
    let a = to_number_lenient(l)?;
    let b = to_number_lenient(r)?;
    Ok(LiteralValue::Number(sanitize_numeric(f(a, b)?)?))
}

/// Depth-first flattening for aggregation arguments: arrays spill their
/// elements, embedded errors go to `first_error`, everything else survives.
fn flatten_value(
    v: LiteralValue,
    out: &mut Vec<LiteralValue>,
    first_error: &mut Option<ExcelError>,
) {
    match v {
        LiteralValue::Array(rows) => {
            for row in rows {
                for cell in row {
                    flatten_value(cell, out, first_error);
                }
            }
        }
        LiteralValue::Error(e) => {
            if first_error.is_none() {
                *first_error = Some(e);
            }
        }
        other => out.push(other),
    }
}

/// FINANCIAL_STRICT argument coercion: booleans and non-numeric text are
/// rejected before dispatch, numeric strings convert, the empty string is 0.
/// Blanks pass through so handlers can apply positional defaults; arrays
/// (NPV/IRR cash-flow ranges) are coerced element-wise.
fn coerce_financial(v: LiteralValue) -> Result<LiteralValue, ExcelError> {
    match v {
        LiteralValue::Number(_) | LiteralValue::Empty | LiteralValue::Omitted => Ok(v),
        LiteralValue::Boolean(_) => {
            Err(ExcelError::new_value().with_message("booleans are not valid amounts"))
        }
        LiteralValue::Text(s) => {
            let t = s.trim();
            if t.is_empty() {
                return Ok(LiteralValue::Number(0.0));
            }
            t.parse::<f64>().map(LiteralValue::Number).map_err(|_| {
                ExcelError::new_value().with_message(format!("'{s}' is not a number"))
            })
        }
        LiteralValue::Error(e) => Err(e),
        LiteralValue::Array(rows) => {
            let coerced = rows
                .into_iter()
                .map(|row| row.into_iter().map(coerce_financial).collect())
                .collect::<Result<Vec<Vec<_>>, _>>()?;
            Ok(LiteralValue::Array(coerced))
        }
        other => Err(ExcelError::new_value()
            .with_message(format!("'{other}' is not a valid amount"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::build::*;
    use calcine_common::ErrorKind;

    fn eval(node: &ExprNode) -> LiteralValue {
        EvalContext::new(&()).evaluate(node)
    }

    #[test]
    fn literals_and_operators() {
        assert_eq!(eval(&add(num(1.0), num(2.0))), LiteralValue::Number(3.0));
        assert_eq!(
            eval(&binary(BinaryOpKind::Concat, text("a"), num(1.0))),
            LiteralValue::Text("a1".into())
        );
        assert_eq!(eval(&neg(num(4.0))), LiteralValue::Number(-4.0));
        assert_eq!(
            eval(&unary(UnaryOpKind::Percent, num(50.0))),
            LiteralValue::Number(0.5)
        );
    }

    #[test]
    fn division_by_zero_is_an_error_value() {
        match eval(&div(num(1.0), num(0.0))) {
            LiteralValue::Error(e) => assert_eq!(e.kind, ErrorKind::Div),
            other => panic!("expected #DIV/0!, got {other}"),
        }
    }

    #[test]
    fn zero_to_the_zero_is_num() {
        match eval(&binary(BinaryOpKind::Pow, num(0.0), num(0.0))) {
            LiteralValue::Error(e) => assert_eq!(e.kind, ErrorKind::Num),
            other => panic!("expected #NUM!, got {other}"),
        }
    }

    #[test]
    fn comparisons_are_case_insensitive_on_text() {
        assert_eq!(
            eval(&binary(BinaryOpKind::Eq, text("Apple"), text("APPLE"))),
            LiteralValue::Boolean(true)
        );
        assert_eq!(
            eval(&binary(BinaryOpKind::Lt, num(2.0), text("a"))),
            LiteralValue::Boolean(true)
        );
    }

    #[test]
    fn unknown_function_is_name_error_before_arguments_run() {
        // The argument would be #DIV/0!; the name miss must win.
        match eval(&call("NO_SUCH_FN", vec![div(num(1.0), num(0.0))])) {
            LiteralValue::Error(e) => assert_eq!(e.kind, ErrorKind::Name),
            other => panic!("expected #NAME?, got {other}"),
        }
    }

    #[test]
    fn free_identifier_is_name_error() {
        match eval(&name("undefined")) {
            LiteralValue::Error(e) => assert_eq!(e.kind, ErrorKind::Name),
            other => panic!("expected #NAME?, got {other}"),
        }
    }

    #[test]
    fn missing_argument_slot_evaluates_to_omitted() {
        let ctx = EvalContext::new(&());
        assert_eq!(
            Interpreter::new(&ctx).eval(&missing(), None),
            Ok(LiteralValue::Omitted)
        );
    }

    #[test]
    fn financial_coercion_rejects_booleans_and_accepts_numeric_text() {
        assert!(coerce_financial(LiteralValue::Boolean(true)).is_err());
        assert_eq!(
            coerce_financial("  1.5 ".into()),
            Ok(LiteralValue::Number(1.5))
        );
        assert_eq!(coerce_financial("".into()), Ok(LiteralValue::Number(0.0)));
        assert!(coerce_financial("abc".into()).is_err());
    }
}
