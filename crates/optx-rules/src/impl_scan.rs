//! # Scan Implementation Rule
//!
//! Maps a logical Scan to a physical SeqScan carrying the same table, columns and
//! pushed-down predicate. A sequential scan is the only scan strategy for lakehouse
//! tables; partition pruning and file statistics are handled by the connector.

use optx_match::error::MatchError;
use optx_match::expr::*;
use optx_match::pattern::{ExpressionMatcher, MatcherId, OpMatcher, TypeMatcher};
use optx_match::rule::{Rule, RuleCall, RuleResult, RuleType};

/// Implement logical scan as a sequential (full) table scan.
pub struct ImplSeqScanRule {
    matcher: ExpressionMatcher,
    scan: MatcherId,
}

impl ImplSeqScanRule {
    pub fn new() -> Self {
        let scan = TypeMatcher::of(OpMatcher::LogicalOp(LogicalOpKind::Scan));
        Self {
            scan: scan.id(),
            matcher: scan.into(),
        }
    }
}

impl Default for ImplSeqScanRule {
    fn default() -> Self {
        Self::new()
    }
}

impl Rule for ImplSeqScanRule {
    fn name(&self) -> &str {
        "ImplSeqScan"
    }

    fn rule_type(&self) -> RuleType {
        RuleType::Implementation
    }

    fn matcher(&self) -> &ExpressionMatcher {
        &self.matcher
    }

    fn apply(&self, call: &RuleCall<'_>) -> Result<Vec<RuleResult>, MatchError> {
        let Operator::Logical(LogicalOp::Scan {
            table,
            columns,
            predicate,
        }) = call.op(self.scan)?
        else {
            return Ok(vec![]);
        };

        Ok(vec![RuleResult::Substitution(
            Operator::Physical(PhysicalOp::SeqScan {
                table: table.clone(),
                columns: columns.clone(),
                predicate: predicate.clone(),
            }),
            vec![],
        )])
    }
}
