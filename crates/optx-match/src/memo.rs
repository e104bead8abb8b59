//! # Memo Store
//!
//! The memo holds the search space as **groups** of logically equivalent **expressions**.
//! An expression is an operator plus an ordered list of child *groups*, so a single
//! memo expression stands for every plan obtainable by picking any variant of each child.
//!
//! This is the collaborator the matchers read from. It is deliberately small: arenas
//! indexed by dense ids, plus a structural index that deduplicates `(operator, children)`
//! pairs so that a rule re-deriving an existing expression does not grow the memo.
//!
//! Matching only ever borrows the memo immutably. Whoever inserts new variants (the
//! rule scheduler) needs `&mut Memo`, so a match attempt cannot observe a group changing
//! underneath it.

use crate::expr::Operator;
use std::collections::HashMap;

pub type GroupId = usize;
pub type ExprId = usize;

/// One expression variant: an operator over child groups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoExpr {
    pub id: ExprId,
    pub op: Operator,
    pub children: Vec<GroupId>,
    /// The group this expression is a variant of.
    pub group: GroupId,
}

/// An equivalence class of expressions.
#[derive(Debug, Clone, Default)]
pub struct Group {
    pub id: GroupId,
    pub logical_exprs: Vec<ExprId>,
    pub physical_exprs: Vec<ExprId>,
}

impl Group {
    /// All variants in matching order: logical expressions in insertion order, then
    /// physical expressions in insertion order.
    pub fn exprs(&self) -> impl Iterator<Item = ExprId> + '_ {
        self.logical_exprs
            .iter()
            .chain(self.physical_exprs.iter())
            .copied()
    }

    pub fn len(&self) -> usize {
        self.logical_exprs.len() + self.physical_exprs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Default)]
pub struct Memo {
    groups: Vec<Group>,
    exprs: Vec<MemoExpr>,
    index: HashMap<(Operator, Vec<GroupId>), ExprId>,
}

impl Memo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an expression into a fresh group, or return the existing one if an
    /// identical `(op, children)` is already in the memo.
    pub fn add_expr(&mut self, op: Operator, children: Vec<GroupId>) -> (GroupId, ExprId) {
        if let Some(&existing) = self.index.get(&(op.clone(), children.clone())) {
            return (self.exprs[existing].group, existing);
        }
        let group_id = self.groups.len();
        self.groups.push(Group {
            id: group_id,
            ..Group::default()
        });
        let expr_id = self.insert(group_id, op, children);
        (group_id, expr_id)
    }

    /// Add an equivalent variant to an existing group. Deduplicated like `add_expr`;
    /// an identical expression already living in another group is returned as is.
    pub fn add_expr_to_group(
        &mut self,
        group_id: GroupId,
        op: Operator,
        children: Vec<GroupId>,
    ) -> ExprId {
        if let Some(&existing) = self.index.get(&(op.clone(), children.clone())) {
            return existing;
        }
        self.insert(group_id, op, children)
    }

    fn insert(&mut self, group_id: GroupId, op: Operator, children: Vec<GroupId>) -> ExprId {
        let expr_id = self.exprs.len();
        self.index.insert((op.clone(), children.clone()), expr_id);
        let group = &mut self.groups[group_id];
        if op.is_logical() {
            group.logical_exprs.push(expr_id);
        } else {
            group.physical_exprs.push(expr_id);
        }
        self.exprs.push(MemoExpr {
            id: expr_id,
            op,
            children,
            group: group_id,
        });
        expr_id
    }

    pub fn group(&self, id: GroupId) -> &Group {
        &self.groups[id]
    }

    pub fn expr(&self, id: ExprId) -> &MemoExpr {
        &self.exprs[id]
    }

    pub fn num_groups(&self) -> usize {
        self.groups.len()
    }

    pub fn num_exprs(&self) -> usize {
        self.exprs.len()
    }
}
