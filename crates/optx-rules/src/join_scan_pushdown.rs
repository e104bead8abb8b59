//! # Join Scan Pushdown Rule
//!
//! Moves join conjuncts that only reference one scanned table into that scan:
//!
//! ```text
//! Before: Join(A, Scan(B), C) on a.x = b.y AND b.flag = 1
//! After:  Join(A, Scan(B) where b.flag = 1, C) on a.x = b.y
//! ```
//!
//! The join may have any number of inputs. An any-child-with-rest matcher picks one
//! Scan input at a time and binds the remaining inputs as opaque groups, so the rule
//! produces one alternative per scan input that has something to absorb. The other
//! inputs keep their groups and their positions; only the selected position gets a
//! new Scan expression.
//!
//! Inner joins only. For outer joins a condition on the null-extended side is not a
//! filter on that side's rows.

use crate::selected_position;
use optx_match::error::MatchError;
use optx_match::expr::*;
use optx_match::pattern::{ChildrenMatcher, ExpressionMatcher, MatcherId, OpMatcher, ReferenceMatcher, TypeMatcher};
use optx_match::rule::{Rule, RuleCall, RuleChild, RuleResult, RuleType};
use tracing::trace;

pub struct JoinScanPushdownRule {
    matcher: ExpressionMatcher,
    join: MatcherId,
    scan: MatcherId,
    rest: MatcherId,
}

impl JoinScanPushdownRule {
    pub fn new() -> Self {
        let scan = TypeMatcher::of(OpMatcher::LogicalOp(LogicalOpKind::Scan));
        let rest = ReferenceMatcher::new();
        let (scan_id, rest_id) = (scan.id(), rest.id());
        let join = TypeMatcher::logical(LogicalOpKind::Join, ChildrenMatcher::any_with_rest(scan, rest));
        Self {
            join: join.id(),
            scan: scan_id,
            rest: rest_id,
            matcher: join.into(),
        }
    }
}

impl Default for JoinScanPushdownRule {
    fn default() -> Self {
        Self::new()
    }
}

impl Rule for JoinScanPushdownRule {
    fn name(&self) -> &str {
        "JoinScanPushdown"
    }

    fn rule_type(&self) -> RuleType {
        RuleType::Transformation
    }

    fn matcher(&self) -> &ExpressionMatcher {
        &self.matcher
    }

    fn apply(&self, call: &RuleCall<'_>) -> Result<Vec<RuleResult>, MatchError> {
        let join = call.get_expr(self.join)?;
        let scan = call.get_expr(self.scan)?;
        let Operator::Logical(LogicalOp::Join {
            join_type: JoinType::Inner,
            condition,
        }) = &join.op
        else {
            return Ok(vec![]);
        };
        let Operator::Logical(LogicalOp::Scan {
            table,
            columns,
            predicate,
        }) = &scan.op
        else {
            return Ok(vec![]);
        };

        let (moved, kept): (Vec<&Expr>, Vec<&Expr>) = condition
            .conjuncts()
            .into_iter()
            .partition(|c| c.references_only(&table.name));
        if moved.is_empty() {
            return Ok(vec![]);
        }

        let rest = call.get_all_groups(self.rest);
        let Some(position) = selected_position(&join.children, scan.group, &rest) else {
            return Err(MatchError::InvariantViolation(format!(
                "scan group {} is not an input of join expr {}",
                scan.group, join.id
            )));
        };
        trace!(
            table = %table,
            position,
            moved = moved.len(),
            "pushing join conjuncts into scan"
        );

        let scan_conjuncts = predicate
            .iter()
            .flat_map(|p| p.conjuncts())
            .chain(moved)
            .cloned()
            .collect();
        let new_scan = Operator::Logical(LogicalOp::Scan {
            table: table.clone(),
            columns: columns.clone(),
            predicate: Expr::conjunction(scan_conjuncts),
        });
        let new_join = Operator::Logical(LogicalOp::Join {
            join_type: JoinType::Inner,
            condition: Expr::conjunction(kept.into_iter().cloned().collect())
                .unwrap_or(Expr::Literal(ScalarValue::Bool(true))),
        });

        let mut children: Vec<RuleChild> = rest.into_iter().map(RuleChild::Group).collect();
        children.insert(position, RuleChild::NewExpr(new_scan, vec![]));
        Ok(vec![RuleResult::NewChildren(new_join, children)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use optx_match::memo::Memo;
    use optx_match::rule::{match_rules, MatchConfig, RuleRegistry};

    fn column(table: &str, name: &str) -> Box<Expr> {
        Box::new(Expr::Column(ColumnRef {
            table: Some(table.into()),
            name: name.into(),
            index: 0,
        }))
    }

    fn scan_op(name: &str, predicate: Option<Expr>) -> Operator {
        Operator::Logical(LogicalOp::Scan {
            table: TableRef {
                schema: "tpch".into(),
                name: name.into(),
            },
            columns: vec![],
            predicate,
        })
    }

    fn eq(left: Box<Expr>, right: Box<Expr>) -> Expr {
        Expr::BinaryOp {
            op: BinaryOp::Eq,
            left,
            right,
        }
    }

    fn int(v: i64) -> Box<Expr> {
        Box::new(Expr::Literal(ScalarValue::Int64(v)))
    }

    fn inner_join(condition: Expr) -> Operator {
        Operator::Logical(LogicalOp::Join {
            join_type: JoinType::Inner,
            condition,
        })
    }

    fn registry() -> RuleRegistry {
        let mut registry = RuleRegistry::new();
        registry.add_rule(Box::new(JoinScanPushdownRule::new()));
        registry
    }

    #[test]
    fn test_local_conjunct_moves_into_selected_scan() {
        let mut memo = Memo::new();
        let (a, _) = memo.add_expr(scan_op("a", None), vec![]);
        let (b, _) = memo.add_expr(scan_op("b", None), vec![]);
        let (c, _) = memo.add_expr(scan_op("c", None), vec![]);
        let key = eq(column("a", "x"), column("b", "y"));
        let local = eq(column("b", "flag"), int(1));
        let (_, join) = memo.add_expr(inner_join(Expr::And(vec![key.clone(), local.clone()])), vec![a, b, c]);

        let out = match_rules(&memo, &registry(), join, &MatchConfig::default()).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(
            out[0].result,
            RuleResult::NewChildren(
                inner_join(key),
                vec![
                    RuleChild::Group(a),
                    RuleChild::NewExpr(scan_op("b", Some(local)), vec![]),
                    RuleChild::Group(c),
                ],
            )
        );
    }

    #[test]
    fn test_existing_scan_predicate_is_kept() {
        let mut memo = Memo::new();
        let existing = eq(column("a", "kind"), int(7));
        let (a, _) = memo.add_expr(scan_op("a", Some(existing.clone())), vec![]);
        let (b, _) = memo.add_expr(scan_op("b", None), vec![]);
        let local = eq(column("a", "x"), int(3));
        let (_, join) = memo.add_expr(inner_join(local.clone()), vec![a, b]);

        let out = match_rules(&memo, &registry(), join, &MatchConfig::default()).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(
            out[0].result,
            RuleResult::NewChildren(
                inner_join(Expr::Literal(ScalarValue::Bool(true))),
                vec![
                    RuleChild::NewExpr(scan_op("a", Some(Expr::And(vec![existing, local]))), vec![]),
                    RuleChild::Group(b),
                ],
            )
        );
    }

    #[test]
    fn test_nothing_to_move_produces_nothing() {
        let mut memo = Memo::new();
        let (a, _) = memo.add_expr(scan_op("a", None), vec![]);
        let (b, _) = memo.add_expr(scan_op("b", None), vec![]);
        let (_, join) = memo.add_expr(inner_join(eq(column("a", "x"), column("b", "y"))), vec![a, b]);

        assert!(match_rules(&memo, &registry(), join, &MatchConfig::default())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_left_join_is_untouched() {
        let mut memo = Memo::new();
        let (a, _) = memo.add_expr(scan_op("a", None), vec![]);
        let (b, _) = memo.add_expr(scan_op("b", None), vec![]);
        let (_, join) = memo.add_expr(
            Operator::Logical(LogicalOp::Join {
                join_type: JoinType::Left,
                condition: eq(column("b", "flag"), int(1)),
            }),
            vec![a, b],
        );

        assert!(match_rules(&memo, &registry(), join, &MatchConfig::default())
            .unwrap()
            .is_empty());
    }
}
