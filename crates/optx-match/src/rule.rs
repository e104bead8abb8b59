//! # Rule Interface
//!
//! Rules are the consumers of bindings. Each rule declares an [`ExpressionMatcher`] for
//! the shape it rewrites; for every set of bindings that shape yields, the rule's
//! `apply` receives a [`RuleCall`] and proposes equivalent expressions as
//! [`RuleResult`]s.
//!
//! ## Rule Types
//!
//! - **Transformation** rules produce logical alternatives (join commutativity, union
//!   flattening, predicate pushdown).
//! - **Implementation** rules map a logical operator to physical ones.
//!
//! ## Reading Bindings
//!
//! A rule keeps the [`MatcherId`]s of the matchers it cares about when it builds its
//! pattern, then reads them back from the call: `call.get_expr(join_id)` returns the exact
//! join variant that matched, `call.get_all_groups(rest_id)` the groups collected for the
//! unseen children, and so on.
//!
//! ## Driving Rules
//!
//! [`match_rules`] runs every active rule of a [`RuleRegistry`] against one memo
//! expression and gathers the results. It only reads the memo; inserting results and
//! deciding what to explore next is the scheduler's business.

use crate::bindings::{Bindings, Matched};
use crate::error::MatchError;
use crate::expr::Operator;
use crate::memo::{ExprId, GroupId, Memo, MemoExpr};
use crate::pattern::{matches, ExpressionMatcher, MatchRoot, MatcherId};
use std::hash::{Hash, Hasher};
use tracing::{debug, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleType {
    /// Logical to logical.
    Transformation,
    /// Logical to physical.
    Implementation,
}

/// A child of a proposed expression: an existing group, or a new sub-expression the
/// scheduler must place in a group of its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleChild {
    Group(GroupId),
    NewExpr(Operator, Vec<RuleChild>),
}

/// An expression proposed by a rule as equivalent to the matched one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleResult {
    /// New expression over existing child groups.
    Substitution(Operator, Vec<GroupId>),
    /// New expression some of whose children are new sub-expressions.
    NewChildren(Operator, Vec<RuleChild>),
}

/// One successful match handed to [`Rule::apply`].
pub struct RuleCall<'a> {
    pub memo: &'a Memo,
    /// The expression the rule's top matcher was applied to.
    pub expr: ExprId,
    pub bindings: Bindings,
}

impl<'a> RuleCall<'a> {
    pub fn get_expr(&self, id: MatcherId) -> Result<&'a MemoExpr, MatchError> {
        Ok(self.memo.expr(self.bindings.get_expr(id)?))
    }

    pub fn get_group(&self, id: MatcherId) -> Result<GroupId, MatchError> {
        self.bindings.get_group(id)
    }

    /// Groups collected under `id`. Expressions contribute their owning group.
    pub fn get_all_groups(&self, id: MatcherId) -> Vec<GroupId> {
        self.bindings
            .get_all(id)
            .iter()
            .map(|m| match m {
                Matched::Group(g) => *g,
                Matched::Expr(e) => self.memo.expr(*e).group,
            })
            .collect()
    }

    /// Operator of the expression bound to `id`.
    pub fn op(&self, id: MatcherId) -> Result<&'a Operator, MatchError> {
        Ok(&self.get_expr(id)?.op)
    }
}

pub trait Rule: Send + Sync {
    fn name(&self) -> &str;

    fn rule_type(&self) -> RuleType;

    /// Shape this rule rewrites. Matcher ids inside must stay stable for the rule's
    /// lifetime, so rules build the matcher once and hand out a reference.
    fn matcher(&self) -> &ExpressionMatcher;

    /// Propose alternatives for one set of bindings. An empty vector means the match was
    /// structurally fine but the rule has nothing to offer (e.g. a non-commutable join).
    fn apply(&self, call: &RuleCall<'_>) -> Result<Vec<RuleResult>, MatchError>;

    /// Fingerprint used by schedulers to avoid re-applying a rule to an expression.
    fn rule_hash(&self) -> u64 {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        self.name().hash(&mut hasher);
        hasher.finish()
    }
}

/// Rules in registration order.
pub struct RuleRegistry {
    pub base_rules: Vec<Box<dyn Rule>>,
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self {
            base_rules: Vec::new(),
        }
    }

    pub fn add_rule(&mut self, rule: Box<dyn Rule>) {
        self.base_rules.push(rule);
    }

    pub fn active_rules(&self) -> Vec<&dyn Rule> {
        self.base_rules.iter().map(|r| r.as_ref()).collect()
    }

    pub fn transformation_rules(&self) -> Vec<&dyn Rule> {
        self.rules_of_type(RuleType::Transformation)
    }

    pub fn implementation_rules(&self) -> Vec<&dyn Rule> {
        self.rules_of_type(RuleType::Implementation)
    }

    fn rules_of_type(&self, rule_type: RuleType) -> Vec<&dyn Rule> {
        self.active_rules()
            .into_iter()
            .filter(|r| r.rule_type() == rule_type)
            .collect()
    }
}

impl Default for RuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Knobs for [`match_rules`].
#[derive(Debug, Clone)]
pub struct MatchConfig {
    /// Upper bound on the bindings pulled per rule and expression. The matchers
    /// themselves never cap enumeration; this is where a caller does.
    pub max_bindings_per_rule: usize,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            max_bindings_per_rule: 1_000,
        }
    }
}

/// A result proposed by a named rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleMatch {
    pub rule: String,
    pub rule_type: RuleType,
    pub result: RuleResult,
}

/// Match every active rule against `expr` and collect what the rules propose.
///
/// Stops at the first [`MatchError`]: a malformed pattern or a rule reading a binding
/// its own pattern cannot produce.
pub fn match_rules(
    memo: &Memo,
    registry: &RuleRegistry,
    expr: ExprId,
    config: &MatchConfig,
) -> Result<Vec<RuleMatch>, MatchError> {
    let mut out = Vec::new();
    for rule in registry.active_rules() {
        let mut matched = 0usize;
        let stream = matches(memo, rule.matcher(), MatchRoot::Expr(expr));
        for bindings in stream.take(config.max_bindings_per_rule) {
            let call = RuleCall {
                memo,
                expr,
                bindings: bindings?,
            };
            matched += 1;
            for result in rule.apply(&call)? {
                trace!("Rule '{}' proposed {:?} for expr {}", rule.name(), result, expr);
                out.push(RuleMatch {
                    rule: rule.name().to_string(),
                    rule_type: rule.rule_type(),
                    result,
                });
            }
        }
        if matched > 0 {
            debug!("Rule '{}' matched expr {} with {} binding set(s)", rule.name(), expr, matched);
        }
    }
    Ok(out)
}
