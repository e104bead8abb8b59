use super::{succeed, BindingStream, ChildrenMatcher, MatcherId, OpMatcher};
use crate::bindings::{Bindings, Matched};
use crate::expr::LogicalOpKind;
use crate::memo::{ExprId, GroupId, Memo};

/// Structural matcher: an operator test plus a children matcher.
///
/// Against an expression, yields the children matcher's bindings with this matcher's id
/// bound to the expression. Against a group, does that for every variant in turn.
#[derive(Debug, Clone)]
pub struct TypeMatcher {
    id: MatcherId,
    op: OpMatcher,
    children: ChildrenMatcher,
}

impl TypeMatcher {
    pub fn new(op: OpMatcher, children: ChildrenMatcher) -> Self {
        Self {
            id: MatcherId::next(),
            op,
            children,
        }
    }

    /// Operator test only; children are not inspected.
    pub fn of(op: OpMatcher) -> Self {
        Self::new(op, ChildrenMatcher::AnyChildren)
    }

    pub fn logical(kind: LogicalOpKind, children: ChildrenMatcher) -> Self {
        Self::new(OpMatcher::LogicalOp(kind), children)
    }

    pub fn id(&self) -> MatcherId {
        self.id
    }

    pub fn op_matcher(&self) -> &OpMatcher {
        &self.op
    }

    pub fn children_matcher(&self) -> &ChildrenMatcher {
        &self.children
    }

    pub(crate) fn match_expr<'a>(&'a self, memo: &'a Memo, expr_id: ExprId) -> BindingStream<'a> {
        let expr = memo.expr(expr_id);
        if !self.op.matches(&expr.op) {
            return Box::new(std::iter::empty());
        }
        let own = Bindings::single(self.id, Matched::Expr(expr_id));
        Box::new(
            self.children
                .match_children(memo, &expr.children)
                .map(move |item| item.and_then(|b| b.merge(&own))),
        )
    }

    pub(crate) fn match_group<'a>(&'a self, memo: &'a Memo, group_id: GroupId) -> BindingStream<'a> {
        Box::new(
            memo.group(group_id)
                .exprs()
                .flat_map(move |expr_id| self.match_expr(memo, expr_id)),
        )
    }
}

/// Opaque matcher: binds whatever it is applied to, exactly once.
#[derive(Debug, Clone)]
pub struct ReferenceMatcher {
    id: MatcherId,
}

impl ReferenceMatcher {
    pub fn new() -> Self {
        Self {
            id: MatcherId::next(),
        }
    }

    pub fn id(&self) -> MatcherId {
        self.id
    }

    pub(crate) fn match_group<'a>(&self, group_id: GroupId) -> BindingStream<'a> {
        succeed(Bindings::single(self.id, Matched::Group(group_id)))
    }

    pub(crate) fn match_expr<'a>(&self, expr_id: ExprId) -> BindingStream<'a> {
        succeed(Bindings::single(self.id, Matched::Expr(expr_id)))
    }
}

impl Default for ReferenceMatcher {
    fn default() -> Self {
        Self::new()
    }
}
