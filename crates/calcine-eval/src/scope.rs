//! Lexical scopes and lambda records, arena-allocated and addressed by index.
//!
//! LET bindings and lambda parameters live in `ScopeRecord`s chained through
//! parent indices; lambdas are `LambdaRecord`s holding their parameter list,
//! owned body, and the scope captured at the LAMBDA expression's evaluation
//! site. The named-lambda table maps names to indices, never to owning
//! references, so the cycles formed by self- and mutual recursion are
//! reclaimed wholesale when the evaluation context is dropped.
//!
//! Identifier comparison is ASCII case-insensitive throughout, matching
//! spreadsheet name semantics.

use std::cell::Cell;

use calcine_common::{ExcelError, LambdaId, LiteralValue};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::ast::ExprNode;

/// Upper bound on nested lambda invocations within one top-level evaluation.
///
/// Exceeding it yields `#NUM!` with a recursion message rather than
/// overflowing the call stack (compatibility decision, see DESIGN.md).
pub const MAX_RECURSION_DEPTH: u32 = 100;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ScopeId(u32);

/// One binding environment. Bindings are appended while the owning LET or
/// invocation populates the scope and are write-once thereafter.
#[derive(Debug)]
pub(crate) struct ScopeRecord {
    parent: Option<ScopeId>,
    bindings: SmallVec<[(String, LiteralValue); 4]>,
}

#[derive(Debug)]
pub(crate) struct LambdaRecord {
    pub params: SmallVec<[String; 4]>,
    pub body: ExprNode,
    pub captured: Option<ScopeId>,
}

/// The arena backing scopes, lambdas, and the named-lambda table for one
/// evaluation context (session-scoped, not per top-level call).
#[derive(Debug, Default)]
pub(crate) struct LambdaRuntime {
    scopes: Vec<ScopeRecord>,
    lambdas: Vec<LambdaRecord>,
    named: FxHashMap<String, LambdaId>,
}

impl LambdaRuntime {
    pub fn new_scope(&mut self, parent: Option<ScopeId>) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(ScopeRecord {
            parent,
            bindings: SmallVec::new(),
        });
        id
    }

    pub fn push_binding(&mut self, scope: ScopeId, name: &str, value: LiteralValue) {
        self.scopes[scope.0 as usize]
            .bindings
            .push((name.to_string(), value));
    }

    /// Walk the lexical chain innermost-first.
    pub fn lookup(&self, scope: ScopeId, name: &str) -> Option<&LiteralValue> {
        let mut cursor = Some(scope);
        while let Some(id) = cursor {
            let record = &self.scopes[id.0 as usize];
            // Innermost binding of a name wins; within one scope names are
            // unique (LET and LAMBDA both validate that).
            if let Some((_, v)) = record
                .bindings
                .iter()
                .find(|(n, _)| n.eq_ignore_ascii_case(name))
            {
                return Some(v);
            }
            cursor = record.parent;
        }
        None
    }

    pub fn new_lambda(
        &mut self,
        params: SmallVec<[String; 4]>,
        body: ExprNode,
        captured: Option<ScopeId>,
    ) -> LambdaId {
        let id = LambdaId(self.lambdas.len() as u32);
        self.lambdas.push(LambdaRecord {
            params,
            body,
            captured,
        });
        id
    }

    pub fn lambda(&self, id: LambdaId) -> &LambdaRecord {
        &self.lambdas[id.0 as usize]
    }

    pub fn register_named(&mut self, name: &str, id: LambdaId) {
        self.named.insert(name.to_ascii_uppercase(), id);
    }

    pub fn named(&self, name: &str) -> Option<LambdaId> {
        self.named.get(&name.to_ascii_uppercase()).copied()
    }
}

/// RAII depth accounting: the counter is decremented on every return path,
/// including error returns, so sibling top-level evaluations never observe a
/// leaked depth.
#[derive(Debug)]
pub(crate) struct DepthGuard<'a> {
    depth: &'a Cell<u32>,
}

impl<'a> DepthGuard<'a> {
    pub fn enter(depth: &'a Cell<u32>) -> Result<Self, ExcelError> {
        let next = depth.get() + 1;
        if next > MAX_RECURSION_DEPTH {
            return Err(ExcelError::new_num().with_message(format!(
                "recursion limit of {MAX_RECURSION_DEPTH} exceeded"
            )));
        }
        depth.set(next);
        Ok(Self { depth })
    }
}

impl Drop for DepthGuard<'_> {
    fn drop(&mut self) {
        self.depth.set(self.depth.get() - 1);
    }
}
