//! # Predicate Pushdown Rule
//!
//! When a Filter sits on top of a Join, this rule merges the filter predicate into
//! the join condition so the join evaluates it instead of a separate pass afterward.
//!
//! ```text
//! Before: Filter(pred, Join(A, B, cond))
//! After:  Join(A, B, cond AND pred)
//! ```
//!
//! ## Memo-Based Approach
//!
//! The new join is an equivalent expression for the Filter's group. The original
//! Filter-over-Join plan stays in the memo and the cost model chooses between them.
//!
//! The join below the filter is a group, and that group may hold several join
//! variants (for instance both input orders after commutativity fired). The pattern
//! binds each variant in turn, and the rule rewrites exactly the variant it was
//! handed, so every join order gets its own merged alternative.
//!
//! Only inner and cross joins are rewritten: moving a predicate into an outer join's
//! condition changes which rows get null-extended. A cross join with a merged
//! predicate becomes an inner join.

use optx_match::error::MatchError;
use optx_match::expr::*;
use optx_match::pattern::{ChildrenMatcher, ExpressionMatcher, MatcherId, ReferenceMatcher, TypeMatcher};
use optx_match::rule::{Rule, RuleCall, RuleResult, RuleType};

/// Push filter predicates into join conditions.
pub struct PredicatePushdownRule {
    matcher: ExpressionMatcher,
    filter: MatcherId,
    join: MatcherId,
    left: MatcherId,
    right: MatcherId,
}

impl PredicatePushdownRule {
    pub fn new() -> Self {
        let left = ReferenceMatcher::new();
        let right = ReferenceMatcher::new();
        let (left_id, right_id) = (left.id(), right.id());
        let join = TypeMatcher::logical(
            LogicalOpKind::Join,
            ChildrenMatcher::list(vec![left.into(), right.into()]),
        );
        let join_id = join.id();
        // Match: Filter(Join(A, B))
        let filter = TypeMatcher::logical(LogicalOpKind::Filter, ChildrenMatcher::list(vec![join.into()]));
        Self {
            filter: filter.id(),
            join: join_id,
            left: left_id,
            right: right_id,
            matcher: filter.into(),
        }
    }
}

impl Default for PredicatePushdownRule {
    fn default() -> Self {
        Self::new()
    }
}

impl Rule for PredicatePushdownRule {
    fn name(&self) -> &str {
        "PredicatePushdown"
    }

    fn rule_type(&self) -> RuleType {
        RuleType::Transformation
    }

    fn matcher(&self) -> &ExpressionMatcher {
        &self.matcher
    }

    fn apply(&self, call: &RuleCall<'_>) -> Result<Vec<RuleResult>, MatchError> {
        let Operator::Logical(LogicalOp::Filter { predicate }) = call.op(self.filter)? else {
            return Ok(vec![]);
        };
        let Operator::Logical(LogicalOp::Join {
            join_type,
            condition,
        }) = call.op(self.join)?
        else {
            return Ok(vec![]);
        };

        if !matches!(join_type, JoinType::Inner | JoinType::Cross) {
            return Ok(vec![]);
        }

        let mut conjuncts: Vec<Expr> = condition
            .conjuncts()
            .into_iter()
            .filter(|c| !matches!(c, Expr::Literal(ScalarValue::Bool(true))))
            .cloned()
            .collect();
        conjuncts.extend(predicate.conjuncts().into_iter().cloned());
        let Some(merged) = Expr::conjunction(conjuncts) else {
            return Ok(vec![]);
        };

        let new_join = Operator::Logical(LogicalOp::Join {
            join_type: JoinType::Inner,
            condition: merged,
        });
        let children = vec![call.get_group(self.left)?, call.get_group(self.right)?];
        Ok(vec![RuleResult::Substitution(new_join, children)])
    }
}
