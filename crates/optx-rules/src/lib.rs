//! # Built-in Optimization Rules
//!
//! The default rules of the optimizer, each declared as a matcher tree from
//! `optx-match` and applied to the bindings that tree produces.
//!
//! ## Transformation Rules (Logical -> Logical)
//!
//! - **`JoinCommutativityRule`**: `A JOIN B -> B JOIN A` for inner and cross joins.
//!   Binds both inputs positionally with a list-children matcher.
//! - **`PredicatePushdownRule`**: merges a Filter's predicate into the inner join below
//!   it. The bound join variant is the one rewritten, so a group holding several join
//!   orders yields one result per order.
//! - **`UnionFlattenRule`**: splices a nested union's inputs into its parent union.
//!   Picks the nested union with an any-child-with-rest matcher.
//! - **`JoinScanPushdownRule`**: moves join conjuncts that only reference one scanned
//!   table into that scan. Same any-child-with-rest shape, with a Scan as the
//!   distinguished child.
//!
//! ## Implementation Rules (Logical -> Physical)
//!
//! - **`ImplSeqScanRule`**: a logical scan as a sequential table scan.

pub mod impl_scan;
pub mod join_commutativity;
pub mod join_scan_pushdown;
pub mod predicate_pushdown;
pub mod union_flatten;

use optx_match::memo::GroupId;
use optx_match::rule::RuleRegistry;

/// Create a rule registry holding every built-in rule.
pub fn default_rule_registry() -> RuleRegistry {
    let mut registry = RuleRegistry::new();

    registry.add_rule(Box::new(join_commutativity::JoinCommutativityRule::new()));
    registry.add_rule(Box::new(predicate_pushdown::PredicatePushdownRule::new()));
    registry.add_rule(Box::new(union_flatten::UnionFlattenRule::new()));
    registry.add_rule(Box::new(join_scan_pushdown::JoinScanPushdownRule::new()));

    registry.add_rule(Box::new(impl_scan::ImplSeqScanRule::new()));

    registry
}

/// Recover the position of the distinguished child of an any-child-with-rest match:
/// the first index holding `selected` whose removal leaves exactly `rest`.
pub(crate) fn selected_position(children: &[GroupId], selected: GroupId, rest: &[GroupId]) -> Option<usize> {
    (0..children.len()).find(|&i| {
        children[i] == selected
            && children[..i]
                .iter()
                .chain(&children[i + 1..])
                .eq(rest.iter())
    })
}
