//! # Join Commutativity Rule
//!
//! Implements `A JOIN B = B JOIN A` for symmetric join types (inner and cross).
//!
//! The pattern is a binary Join whose inputs are bound positionally by two reference
//! matchers, so the rule reads the left and right groups straight from the bindings
//! without looking at the join's child list. Joins with any other number of inputs do
//! not match.
//!
//! Left, right, semi and anti joins have fixed sides and are left alone. The equi-join
//! condition is mirrored along with the inputs so the condition keeps naming the left
//! input first.

use optx_match::error::MatchError;
use optx_match::expr::*;
use optx_match::pattern::{ChildrenMatcher, ExpressionMatcher, MatcherId, ReferenceMatcher, TypeMatcher};
use optx_match::rule::{Rule, RuleCall, RuleResult, RuleType};

/// Join commutativity: A JOIN B -> B JOIN A.
pub struct JoinCommutativityRule {
    matcher: ExpressionMatcher,
    join: MatcherId,
    left: MatcherId,
    right: MatcherId,
}

impl JoinCommutativityRule {
    pub fn new() -> Self {
        let left = ReferenceMatcher::new();
        let right = ReferenceMatcher::new();
        let (left_id, right_id) = (left.id(), right.id());
        let join = TypeMatcher::logical(
            LogicalOpKind::Join,
            ChildrenMatcher::list(vec![left.into(), right.into()]),
        );
        Self {
            join: join.id(),
            left: left_id,
            right: right_id,
            matcher: join.into(),
        }
    }
}

impl Default for JoinCommutativityRule {
    fn default() -> Self {
        Self::new()
    }
}

impl Rule for JoinCommutativityRule {
    fn name(&self) -> &str {
        "JoinCommutativity"
    }

    fn rule_type(&self) -> RuleType {
        RuleType::Transformation
    }

    fn matcher(&self) -> &ExpressionMatcher {
        &self.matcher
    }

    fn apply(&self, call: &RuleCall<'_>) -> Result<Vec<RuleResult>, MatchError> {
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

        let left = call.get_group(self.left)?;
        let right = call.get_group(self.right)?;
        let new_op = Operator::Logical(LogicalOp::Join {
            join_type: *join_type,
            condition: swap_condition_sides(condition),
        });

        Ok(vec![RuleResult::Substitution(new_op, vec![right, left])])
    }
}

/// Mirror equi-join conditions: `A.x = B.y` becomes `B.y = A.x`.
fn swap_condition_sides(expr: &Expr) -> Expr {
    match expr {
        Expr::BinaryOp {
            op: BinaryOp::Eq,
            left,
            right,
        } => Expr::BinaryOp {
            op: BinaryOp::Eq,
            left: right.clone(),
            right: left.clone(),
        },
        Expr::And(conjuncts) => Expr::And(conjuncts.iter().map(swap_condition_sides).collect()),
        other => other.clone(),
    }
}
