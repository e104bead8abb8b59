//! # Matchers
//!
//! Rules describe the shape they want to rewrite as a tree of matchers. Matching that
//! tree against the memo yields a lazy stream of [`Bindings`], one per distinct way the
//! shape can be found. Every matcher carries a [`MatcherId`]; the rule reads what a
//! matcher matched by looking its id up in the bindings.
//!
//! ## Matcher Family
//!
//! Expression matchers apply to a group (trying each variant) or to one expression:
//!
//! - [`TypeMatcher`]: checks the operator with an [`OpMatcher`] and its child list with a
//!   [`ChildrenMatcher`]; binds the matched expression.
//! - [`ReferenceMatcher`]: binds the whole group without looking inside. Always matches
//!   exactly once.
//!
//! Children matchers apply to an expression's ordered child groups:
//!
//! - [`AllChildrenMatcher`]: one matcher against every child; bindings collect per child.
//! - [`ListChildrenMatcher`]: matcher *k* against child *k*; arity must agree.
//! - [`AnyChildMatcher`]: one alternative per child the matcher matches.
//! - [`AnyChildWithRestMatcher`]: like `AnyChildMatcher`, and binds all remaining
//!   children to a reference matcher.
//! - [`ChildrenMatcher::AnyChildren`]: ignores children.
//!
//! ## Streams
//!
//! Everything returns a [`BindingStream`]. Streams are pull driven: alternatives for a
//! later variant or child position are not computed until the consumer asks for them, so
//! a rule that takes the first match pays only for the first match. A malformed pattern
//! shows up as a single `Err` item, after which the stream ends.

mod children;
mod node;
mod rest;

pub use children::{AllChildrenMatcher, AnyChildMatcher, ChildrenMatcher, ListChildrenMatcher};
pub use node::{ReferenceMatcher, TypeMatcher};
pub use rest::AnyChildWithRestMatcher;

use crate::bindings::Bindings;
use crate::error::MatchError;
use crate::expr::{LogicalOpKind, OpKind, Operator, PhysicalOpKind};
use crate::memo::{ExprId, GroupId, Memo};
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

pub type MatchResult = Result<Bindings, MatchError>;

/// Lazy sequence of match results borrowing the memo and the pattern.
pub type BindingStream<'a> = Box<dyn Iterator<Item = MatchResult> + 'a>;

static NEXT_MATCHER_ID: AtomicU64 = AtomicU64::new(0);

/// Identity of one matcher instance in a pattern. Minted at construction; clones of a
/// matcher share the id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct MatcherId(u64);

impl MatcherId {
    pub fn next() -> Self {
        Self(NEXT_MATCHER_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for MatcherId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Shared predicate over operators, for checks that do not fit a kind comparison.
#[derive(Clone)]
pub struct OpPredicate {
    name: &'static str,
    test: Arc<dyn Fn(&Operator) -> bool + Send + Sync>,
}

impl OpPredicate {
    pub fn new(name: &'static str, test: impl Fn(&Operator) -> bool + Send + Sync + 'static) -> Self {
        Self {
            name,
            test: Arc::new(test),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Debug for OpPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("OpPredicate").field(&self.name).finish()
    }
}

/// Operator test of a [`TypeMatcher`].
#[derive(Debug, Clone)]
pub enum OpMatcher {
    LogicalOp(LogicalOpKind),
    PhysicalOp(PhysicalOpKind),
    AnyLogical,
    AnyPhysical,
    Any,
    OneOf(Vec<OpKind>),
    Predicate(OpPredicate),
}

impl OpMatcher {
    pub fn matches(&self, op: &Operator) -> bool {
        match (self, op) {
            (OpMatcher::LogicalOp(kind), Operator::Logical(l)) => l.kind() == *kind,
            (OpMatcher::PhysicalOp(kind), Operator::Physical(p)) => p.kind() == *kind,
            (OpMatcher::AnyLogical, Operator::Logical(_)) => true,
            (OpMatcher::AnyPhysical, Operator::Physical(_)) => true,
            (OpMatcher::Any, _) => true,
            (OpMatcher::OneOf(kinds), op) => kinds.contains(&op.kind()),
            (OpMatcher::Predicate(p), op) => (p.test)(op),
            _ => false,
        }
    }
}

/// A matcher that applies to a group or to a single expression.
#[derive(Debug, Clone)]
pub enum ExpressionMatcher {
    Type(TypeMatcher),
    Reference(ReferenceMatcher),
}

impl ExpressionMatcher {
    pub fn id(&self) -> MatcherId {
        match self {
            ExpressionMatcher::Type(m) => m.id(),
            ExpressionMatcher::Reference(m) => m.id(),
        }
    }

    /// Match every variant of `group`, in the group's variant order.
    pub fn match_group<'a>(&'a self, memo: &'a Memo, group: GroupId) -> BindingStream<'a> {
        halt_on_error(match self {
            ExpressionMatcher::Type(m) => m.match_group(memo, group),
            ExpressionMatcher::Reference(m) => m.match_group(group),
        })
    }

    pub fn match_expr<'a>(&'a self, memo: &'a Memo, expr: ExprId) -> BindingStream<'a> {
        halt_on_error(match self {
            ExpressionMatcher::Type(m) => m.match_expr(memo, expr),
            ExpressionMatcher::Reference(m) => m.match_expr(expr),
        })
    }
}

impl From<TypeMatcher> for ExpressionMatcher {
    fn from(m: TypeMatcher) -> Self {
        ExpressionMatcher::Type(m)
    }
}

impl From<ReferenceMatcher> for ExpressionMatcher {
    fn from(m: ReferenceMatcher) -> Self {
        ExpressionMatcher::Reference(m)
    }
}

/// Where a top-level match starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchRoot {
    Group(GroupId),
    Expr(ExprId),
}

/// Match `matcher` against `root` and stream every resulting set of bindings.
pub fn matches<'a>(memo: &'a Memo, matcher: &'a ExpressionMatcher, root: MatchRoot) -> BindingStream<'a> {
    match root {
        MatchRoot::Group(g) => matcher.match_group(memo, g),
        MatchRoot::Expr(e) => matcher.match_expr(memo, e),
    }
}

/// End the stream right after its first error.
pub(crate) fn halt_on_error<'a>(stream: impl Iterator<Item = MatchResult> + 'a) -> BindingStream<'a> {
    let mut halted = false;
    Box::new(
        stream
            .map_while(move |item| {
                if halted {
                    return None;
                }
                halted = item.is_err();
                Some(item)
            })
            .fuse(),
    )
}

pub(crate) fn fail<'a>(err: MatchError) -> BindingStream<'a> {
    Box::new(std::iter::once(Err(err)))
}

pub(crate) fn succeed<'a>(bindings: Bindings) -> BindingStream<'a> {
    Box::new(std::iter::once(Ok(bindings)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::*;

    #[test]
    fn test_matcher_ids_are_unique_and_survive_clone() {
        let a = ReferenceMatcher::new();
        let b = ReferenceMatcher::new();
        assert_ne!(a.id(), b.id());
        assert_eq!(a.clone().id(), a.id());
    }

    #[test]
    fn test_matcher_ids_are_64_bit_and_increasing() {
        assert_eq!(std::mem::size_of::<MatcherId>(), 8);
        let first = MatcherId::next();
        let second = MatcherId::next();
        assert!(second > first);
    }

    #[test]
    fn test_op_matcher_variants() {
        let join = Operator::Logical(LogicalOp::Join {
            join_type: JoinType::Inner,
            condition: Expr::Literal(ScalarValue::Bool(true)),
        });
        let union_all = Operator::Physical(PhysicalOp::UnionAll);

        assert!(OpMatcher::LogicalOp(LogicalOpKind::Join).matches(&join));
        assert!(!OpMatcher::LogicalOp(LogicalOpKind::Scan).matches(&join));
        assert!(!OpMatcher::PhysicalOp(PhysicalOpKind::UnionAll).matches(&join));
        assert!(OpMatcher::AnyPhysical.matches(&union_all));
        assert!(!OpMatcher::AnyLogical.matches(&union_all));
        assert!(OpMatcher::Any.matches(&union_all));
        assert!(OpMatcher::OneOf(vec![
            OpKind::Logical(LogicalOpKind::Union),
            OpKind::Physical(PhysicalOpKind::UnionAll),
        ])
        .matches(&union_all));

        let inner_only = OpPredicate::new("inner join", |op| {
            matches!(
                op,
                Operator::Logical(LogicalOp::Join {
                    join_type: JoinType::Inner,
                    ..
                })
            )
        });
        assert!(OpMatcher::Predicate(inner_only).matches(&join));
    }

    #[test]
    fn test_halt_on_error_stops_stream() {
        let items = vec![
            Ok(Bindings::empty()),
            Err(MatchError::InvariantViolation("boom".into())),
            Ok(Bindings::empty()),
        ];
        let out: Vec<_> = halt_on_error(items.into_iter()).collect();
        assert_eq!(out.len(), 2);
        assert!(out[1].is_err());
    }
}
