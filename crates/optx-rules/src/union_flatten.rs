//! # Union Flatten Rule
//!
//! Splices a nested union's inputs into its parent:
//!
//! ```text
//! Before: Union(A, Union(B, C), D)
//! After:  Union(A, B, C, D)
//! ```
//!
//! The nested union is found with an any-child-with-rest matcher, so a union with
//! several nested unions yields one alternative per nested union; repeated firing
//! flattens the rest. Input order is preserved, which keeps `UNION ALL` output order
//! stable for plans that rely on it. Both unions must agree on `all`: a distinct
//! union under a bag union (or the reverse) is not associative.

use crate::selected_position;
use optx_match::error::MatchError;
use optx_match::expr::*;
use optx_match::pattern::{ChildrenMatcher, ExpressionMatcher, MatcherId, ReferenceMatcher, TypeMatcher};
use optx_match::rule::{Rule, RuleCall, RuleResult, RuleType};
use tracing::trace;

pub struct UnionFlattenRule {
    matcher: ExpressionMatcher,
    outer: MatcherId,
    inner: MatcherId,
    inner_children: MatcherId,
    rest: MatcherId,
}

impl UnionFlattenRule {
    pub fn new() -> Self {
        let inner_children = ReferenceMatcher::new();
        let rest = ReferenceMatcher::new();
        let (inner_children_id, rest_id) = (inner_children.id(), rest.id());
        let inner = TypeMatcher::logical(LogicalOpKind::Union, ChildrenMatcher::all(inner_children));
        let inner_id = inner.id();
        let outer = TypeMatcher::logical(LogicalOpKind::Union, ChildrenMatcher::any_with_rest(inner, rest));
        Self {
            outer: outer.id(),
            inner: inner_id,
            inner_children: inner_children_id,
            rest: rest_id,
            matcher: outer.into(),
        }
    }
}

impl Default for UnionFlattenRule {
    fn default() -> Self {
        Self::new()
    }
}

impl Rule for UnionFlattenRule {
    fn name(&self) -> &str {
        "UnionFlatten"
    }

    fn rule_type(&self) -> RuleType {
        RuleType::Transformation
    }

    fn matcher(&self) -> &ExpressionMatcher {
        &self.matcher
    }

    fn apply(&self, call: &RuleCall<'_>) -> Result<Vec<RuleResult>, MatchError> {
        let outer = call.get_expr(self.outer)?;
        let inner = call.get_expr(self.inner)?;
        let (
            Operator::Logical(LogicalOp::Union { all: outer_all }),
            Operator::Logical(LogicalOp::Union { all: inner_all }),
        ) = (&outer.op, &inner.op)
        else {
            return Ok(vec![]);
        };
        if outer_all != inner_all {
            return Ok(vec![]);
        }

        let rest = call.get_all_groups(self.rest);
        let Some(position) = selected_position(&outer.children, inner.group, &rest) else {
            return Err(MatchError::InvariantViolation(format!(
                "nested union group {} is not a child of union expr {}",
                inner.group, outer.id
            )));
        };

        let mut children = rest;
        let spliced = call.get_all_groups(self.inner_children);
        trace!(position, spliced = spliced.len(), "flattening nested union");
        children.splice(position..position, spliced);

        Ok(vec![RuleResult::Substitution(
            Operator::Logical(LogicalOp::Union { all: *outer_all }),
            children,
        )])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use optx_match::memo::Memo;
    use optx_match::rule::{match_rules, MatchConfig, RuleRegistry};

    fn scan(name: &str) -> Operator {
        Operator::Logical(LogicalOp::Scan {
            table: TableRef {
                schema: "tpch".into(),
                name: name.into(),
            },
            columns: vec![],
            predicate: None,
        })
    }

    fn union(all: bool) -> Operator {
        Operator::Logical(LogicalOp::Union { all })
    }

    fn registry() -> RuleRegistry {
        let mut registry = RuleRegistry::new();
        registry.add_rule(Box::new(UnionFlattenRule::new()));
        registry
    }

    #[test]
    fn test_nested_union_is_spliced_in_place() {
        let mut memo = Memo::new();
        let [a, b, c, d] = ["a", "b", "c", "d"].map(|n| memo.add_expr(scan(n), vec![]).0);
        let (nested, _) = memo.add_expr(union(true), vec![b, c]);
        let (_, top) = memo.add_expr(union(true), vec![a, nested, d]);

        let out = match_rules(&memo, &registry(), top, &MatchConfig::default()).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].result, RuleResult::Substitution(union(true), vec![a, b, c, d]));
    }

    #[test]
    fn test_one_alternative_per_nested_union() {
        let mut memo = Memo::new();
        let [a, b, c, d] = ["a", "b", "c", "d"].map(|n| memo.add_expr(scan(n), vec![]).0);
        let (left, _) = memo.add_expr(union(false), vec![a, b]);
        let (right, _) = memo.add_expr(union(false), vec![c, d]);
        let (_, top) = memo.add_expr(union(false), vec![left, right]);

        let results: Vec<_> = match_rules(&memo, &registry(), top, &MatchConfig::default())
            .unwrap()
            .into_iter()
            .map(|m| m.result)
            .collect();
        assert_eq!(
            results,
            vec![
                RuleResult::Substitution(union(false), vec![a, b, right]),
                RuleResult::Substitution(union(false), vec![left, c, d]),
            ]
        );
    }

    #[test]
    fn test_mixed_distinctness_is_not_flattened() {
        let mut memo = Memo::new();
        let [a, b, c] = ["a", "b", "c"].map(|n| memo.add_expr(scan(n), vec![]).0);
        let (nested, _) = memo.add_expr(union(false), vec![b, c]);
        let (_, top) = memo.add_expr(union(true), vec![a, nested]);

        assert!(match_rules(&memo, &registry(), top, &MatchConfig::default())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_repeated_child_groups_keep_their_positions() {
        let mut memo = Memo::new();
        let [a, b] = ["a", "b"].map(|n| memo.add_expr(scan(n), vec![]).0);
        let (nested, _) = memo.add_expr(union(true), vec![a, b]);
        let (_, top) = memo.add_expr(union(true), vec![nested, a, nested]);

        let results: Vec<_> = match_rules(&memo, &registry(), top, &MatchConfig::default())
            .unwrap()
            .into_iter()
            .map(|m| m.result)
            .collect();
        assert_eq!(
            results,
            vec![
                RuleResult::Substitution(union(true), vec![a, b, a, nested]),
                RuleResult::Substitution(union(true), vec![nested, a, a, b]),
            ]
        );
    }
}
