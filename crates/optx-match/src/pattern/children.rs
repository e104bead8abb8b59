use super::{fail, halt_on_error, succeed, AnyChildWithRestMatcher, BindingStream, ExpressionMatcher, ReferenceMatcher};
use crate::bindings::Bindings;
use crate::memo::{GroupId, Memo};
use std::rc::Rc;

/// Matcher over an expression's ordered child groups.
#[derive(Debug, Clone)]
pub enum ChildrenMatcher {
    All(AllChildrenMatcher),
    List(ListChildrenMatcher),
    AnyChild(AnyChildMatcher),
    AnyWithRest(AnyChildWithRestMatcher),
    /// Matches once with no bindings, whatever the children are.
    AnyChildren,
}

impl ChildrenMatcher {
    pub fn all(matcher: impl Into<ExpressionMatcher>) -> Self {
        ChildrenMatcher::All(AllChildrenMatcher::new(matcher))
    }

    pub fn list(matchers: Vec<ExpressionMatcher>) -> Self {
        ChildrenMatcher::List(ListChildrenMatcher::new(matchers))
    }

    pub fn any_child(matcher: impl Into<ExpressionMatcher>) -> Self {
        ChildrenMatcher::AnyChild(AnyChildMatcher::new(matcher))
    }

    pub fn any_with_rest(selected: impl Into<ExpressionMatcher>, rest: ReferenceMatcher) -> Self {
        ChildrenMatcher::AnyWithRest(AnyChildWithRestMatcher::new(selected, rest))
    }

    pub fn match_children<'a>(&'a self, memo: &'a Memo, children: &[GroupId]) -> BindingStream<'a> {
        halt_on_error(match self {
            ChildrenMatcher::All(m) => m.match_children(memo, children),
            ChildrenMatcher::List(m) => m.match_children(memo, children),
            ChildrenMatcher::AnyChild(m) => m.match_children(memo, children),
            ChildrenMatcher::AnyWithRest(m) => m.match_children(memo, children),
            ChildrenMatcher::AnyChildren => succeed(Bindings::empty()),
        })
    }
}

/// Applies one matcher to every child; all must match.
///
/// Bindings produced for different children are collected per matcher id in child
/// order, so a reference matcher over `[a, b]` binds `[a, b]`. With zero children the
/// result is a single empty binding set.
///
/// Collected lists are flat. When the sub-pattern itself collects (say an
/// any-child-with-rest whose rest is bound per child), the per-child lists are
/// concatenated into one, and the result no longer records which entries came from which
/// child. Entries of two different ids can then only be lined up by position when every
/// child contributes exactly one entry to each.
#[derive(Debug, Clone)]
pub struct AllChildrenMatcher {
    matcher: Box<ExpressionMatcher>,
}

impl AllChildrenMatcher {
    pub fn new(matcher: impl Into<ExpressionMatcher>) -> Self {
        Self {
            matcher: Box::new(matcher.into()),
        }
    }

    pub fn matcher(&self) -> &ExpressionMatcher {
        &self.matcher
    }

    pub fn match_children<'a>(&'a self, memo: &'a Memo, children: &[GroupId]) -> BindingStream<'a> {
        let pairs = children.iter().map(|&c| (c, self.matcher.as_ref())).collect();
        product(memo, pairs, 0, Bindings::empty(), true)
    }
}

/// Applies matcher *k* to child *k*. Fails when the counts differ.
#[derive(Debug, Clone)]
pub struct ListChildrenMatcher {
    matchers: Vec<ExpressionMatcher>,
}

impl ListChildrenMatcher {
    pub fn new(matchers: Vec<ExpressionMatcher>) -> Self {
        Self { matchers }
    }

    pub fn matchers(&self) -> &[ExpressionMatcher] {
        &self.matchers
    }

    pub fn match_children<'a>(&'a self, memo: &'a Memo, children: &[GroupId]) -> BindingStream<'a> {
        if children.len() != self.matchers.len() {
            return Box::new(std::iter::empty());
        }
        let pairs = children.iter().copied().zip(self.matchers.iter()).collect();
        product(memo, pairs, 0, Bindings::empty(), false)
    }
}

/// Tries the matcher on each child in turn, yielding one alternative per match. The
/// other children are left unbound.
#[derive(Debug, Clone)]
pub struct AnyChildMatcher {
    matcher: Box<ExpressionMatcher>,
}

impl AnyChildMatcher {
    pub fn new(matcher: impl Into<ExpressionMatcher>) -> Self {
        Self {
            matcher: Box::new(matcher.into()),
        }
    }

    pub fn match_children<'a>(&'a self, memo: &'a Memo, children: &[GroupId]) -> BindingStream<'a> {
        Box::new(
            children
                .to_vec()
                .into_iter()
                .flat_map(move |child| self.matcher.match_group(memo, child)),
        )
    }
}

/// Lazy cartesian product over `(child, matcher)` pairs starting at `at`, merging into
/// `acc` in child order. The stream for pair `k` is re-created for each combination of
/// the earlier pairs rather than buffered.
fn product<'a>(
    memo: &'a Memo,
    pairs: Rc<[(GroupId, &'a ExpressionMatcher)]>,
    at: usize,
    acc: Bindings,
    collecting: bool,
) -> BindingStream<'a> {
    let Some(&(child, matcher)) = pairs.get(at) else {
        return succeed(acc);
    };
    Box::new(matcher.match_group(memo, child).flat_map(move |item| {
        let merged = item.and_then(|b| {
            let b = if collecting { b.into_collecting() } else { b };
            acc.merge(&b)
        });
        match merged {
            Ok(next) => product(memo, Rc::clone(&pairs), at + 1, next, collecting),
            Err(e) => fail(e),
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bindings::Matched;
    use crate::expr::*;
    use crate::pattern::{OpMatcher, TypeMatcher};

    fn scan(name: &str) -> Operator {
        Operator::Logical(LogicalOp::Scan {
            table: TableRef {
                schema: "s".into(),
                name: name.into(),
            },
            columns: vec![],
            predicate: None,
        })
    }

    fn filter() -> Operator {
        Operator::Logical(LogicalOp::Filter {
            predicate: Expr::Literal(ScalarValue::Bool(true)),
        })
    }

    #[test]
    fn test_all_children_over_nothing_is_one_empty_binding() {
        let memo = Memo::new();
        let m = AllChildrenMatcher::new(TypeMatcher::of(OpMatcher::AnyLogical));
        let out: Vec<_> = m.match_children(&memo, &[]).collect();
        assert_eq!(out, vec![Ok(Bindings::empty())]);
    }

    #[test]
    fn test_all_children_reference_collects_in_order() {
        let mut memo = Memo::new();
        let (a, _) = memo.add_expr(scan("a"), vec![]);
        let (b, _) = memo.add_expr(scan("b"), vec![]);
        let r = ReferenceMatcher::new();
        let id = r.id();
        let m = AllChildrenMatcher::new(r);

        let out: Vec<_> = m.match_children(&memo, &[b, a]).collect();
        assert_eq!(out.len(), 1);
        let bindings = out[0].as_ref().unwrap();
        assert_eq!(bindings.get_all(id), &[Matched::Group(b), Matched::Group(a)]);
    }

    #[test]
    fn test_all_children_fails_if_one_child_fails() {
        let mut memo = Memo::new();
        let (a, _) = memo.add_expr(scan("a"), vec![]);
        let (f, _) = memo.add_expr(filter(), vec![a]);
        let m = AllChildrenMatcher::new(TypeMatcher::of(OpMatcher::LogicalOp(LogicalOpKind::Scan)));
        assert_eq!(m.match_children(&memo, &[a, f]).count(), 0);
    }

    #[test]
    fn test_all_children_cartesian_product_order() {
        // Two children, each a group with two scan variants: 2 x 2 combinations,
        // first child varying slowest.
        let mut memo = Memo::new();
        let (g0, e00) = memo.add_expr(scan("a"), vec![]);
        let e01 = memo.add_expr_to_group(g0, scan("a2"), vec![]);
        let (g1, e10) = memo.add_expr(scan("b"), vec![]);
        let e11 = memo.add_expr_to_group(g1, scan("b2"), vec![]);

        let t = TypeMatcher::of(OpMatcher::LogicalOp(LogicalOpKind::Scan));
        let id = t.id();
        let m = AllChildrenMatcher::new(t);

        let combos: Vec<Vec<Matched>> = m
            .match_children(&memo, &[g0, g1])
            .map(|b| b.unwrap().get_all(id).to_vec())
            .collect();
        assert_eq!(
            combos,
            vec![
                vec![Matched::Expr(e00), Matched::Expr(e10)],
                vec![Matched::Expr(e00), Matched::Expr(e11)],
                vec![Matched::Expr(e01), Matched::Expr(e10)],
                vec![Matched::Expr(e01), Matched::Expr(e11)],
            ]
        );
    }

    #[test]
    fn test_all_children_flattens_nested_collections() {
        // Children U1 = Union[s1, p, q] and U2 = Union[s2]. The sub-pattern selects the
        // scan of each union and collects its remaining inputs; across the two unions
        // those remaining inputs end up in one flat list.
        let mut memo = Memo::new();
        let (g1, s1) = memo.add_expr(scan("s1"), vec![]);
        let (p, _) = memo.add_expr(filter(), vec![g1]);
        let (q, _) = memo.add_expr(
            Operator::Logical(LogicalOp::Limit { offset: 0, count: 1 }),
            vec![g1],
        );
        let (g2, s2) = memo.add_expr(scan("s2"), vec![]);
        let union = Operator::Logical(LogicalOp::Union { all: true });
        let (u1, _) = memo.add_expr(union.clone(), vec![g1, p, q]);
        let (u2, _) = memo.add_expr(union, vec![g2]);

        let selected = TypeMatcher::of(OpMatcher::LogicalOp(LogicalOpKind::Scan));
        let rest = ReferenceMatcher::new();
        let (x, y) = (selected.id(), rest.id());
        let m = AllChildrenMatcher::new(TypeMatcher::new(
            OpMatcher::LogicalOp(LogicalOpKind::Union),
            ChildrenMatcher::any_with_rest(selected, rest),
        ));

        let forward: Vec<_> = m.match_children(&memo, &[u1, u2]).map(Result::unwrap).collect();
        let backward: Vec<_> = m.match_children(&memo, &[u2, u1]).map(Result::unwrap).collect();
        assert_eq!(forward.len(), 1);
        assert_eq!(backward.len(), 1);
        assert_eq!(forward[0].get_all(x), &[Matched::Expr(s1), Matched::Expr(s2)]);
        assert_eq!(backward[0].get_all(x), &[Matched::Expr(s2), Matched::Expr(s1)]);
        let flat = [Matched::Group(p), Matched::Group(q)];
        assert_eq!(forward[0].get_all(y), &flat);
        assert_eq!(backward[0].get_all(y), &flat);
    }

    #[test]
    fn test_list_children_binds_positionally() {
        let mut memo = Memo::new();
        let (a, _) = memo.add_expr(scan("a"), vec![]);
        let (b, _) = memo.add_expr(scan("b"), vec![]);
        let left = ReferenceMatcher::new();
        let right = ReferenceMatcher::new();
        let (left_id, right_id) = (left.id(), right.id());
        let m = ListChildrenMatcher::new(vec![left.into(), right.into()]);

        let out: Vec<_> = m.match_children(&memo, &[a, b]).collect();
        assert_eq!(out.len(), 1);
        let bindings = out[0].as_ref().unwrap();
        assert_eq!(bindings.get_group(left_id).unwrap(), a);
        assert_eq!(bindings.get_group(right_id).unwrap(), b);
    }

    #[test]
    fn test_list_children_arity_mismatch() {
        let mut memo = Memo::new();
        let (a, _) = memo.add_expr(scan("a"), vec![]);
        let m = ListChildrenMatcher::new(vec![ReferenceMatcher::new().into(), ReferenceMatcher::new().into()]);
        assert_eq!(m.match_children(&memo, &[a]).count(), 0);
        assert_eq!(m.match_children(&memo, &[a, a, a]).count(), 0);
    }

    #[test]
    fn test_any_child_one_alternative_per_match() {
        let mut memo = Memo::new();
        let (a, ea) = memo.add_expr(scan("a"), vec![]);
        let (f, _) = memo.add_expr(filter(), vec![a]);
        let (c, ec) = memo.add_expr(scan("c"), vec![]);
        let t = TypeMatcher::of(OpMatcher::LogicalOp(LogicalOpKind::Scan));
        let id = t.id();
        let m = AnyChildMatcher::new(t);

        let bound: Vec<_> = m
            .match_children(&memo, &[a, f, c])
            .map(|b| b.unwrap().get_expr(id).unwrap())
            .collect();
        assert_eq!(bound, vec![ea, ec]);
    }

    #[test]
    fn test_any_children_ignores_children() {
        let mut memo = Memo::new();
        let (a, _) = memo.add_expr(scan("a"), vec![]);
        let out: Vec<_> = ChildrenMatcher::AnyChildren.match_children(&memo, &[a, a]).collect();
        assert_eq!(out, vec![Ok(Bindings::empty())]);
    }
}
