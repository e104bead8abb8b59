//! # Bindings
//!
//! A [`Bindings`] value records what each matcher of a pattern matched during one
//! successful match: matcher id to memo expression, memo group, or, for matchers that
//! ran once per child under an all-children matcher, an ordered list of those.
//!
//! Bindings are values. They start empty and grow only through [`Bindings::merge`],
//! which returns a new instance. A well-formed pattern never binds one non-collecting
//! matcher to two different things, so merge reports that as a [`MatchError`] instead of
//! picking a side.

use crate::error::MatchError;
use crate::memo::{ExprId, GroupId};
use crate::pattern::MatcherId;
use serde::Serialize;
use std::collections::btree_map::{self, BTreeMap};

/// A matched entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Matched {
    /// A specific expression variant, bound by a type matcher.
    Expr(ExprId),
    /// A whole group, bound by a reference matcher without inspecting its variants.
    Group(GroupId),
}

impl Matched {
    pub fn as_expr(&self) -> Option<ExprId> {
        match self {
            Matched::Expr(id) => Some(*id),
            Matched::Group(_) => None,
        }
    }

    pub fn as_group(&self) -> Option<GroupId> {
        match self {
            Matched::Group(id) => Some(*id),
            Matched::Expr(_) => None,
        }
    }
}

/// What a single matcher id is bound to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Bound {
    One(Matched),
    /// Collected across children, in child order.
    Many(Vec<Matched>),
}

impl Bound {
    pub fn is_collecting(&self) -> bool {
        matches!(self, Bound::Many(_))
    }

    /// The bound values as a slice; a single value reads as one element.
    pub fn values(&self) -> &[Matched] {
        match self {
            Bound::One(v) => std::slice::from_ref(v),
            Bound::Many(vs) => vs,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Bindings {
    entries: BTreeMap<MatcherId, Bound>,
}

impl Bindings {
    /// The identity element of [`Bindings::merge`].
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn single(id: MatcherId, matched: Matched) -> Self {
        let mut entries = BTreeMap::new();
        entries.insert(id, Bound::One(matched));
        Self { entries }
    }

    /// Union of `self` and `other`.
    ///
    /// Identical single bindings collapse, collected lists concatenate with `self`'s
    /// values first. Anything else bound on both sides is a [`MatchError::ConflictingBinding`].
    pub fn merge(&self, other: &Bindings) -> Result<Bindings, MatchError> {
        let mut entries = self.entries.clone();
        for (id, incoming) in &other.entries {
            match entries.entry(*id) {
                btree_map::Entry::Vacant(slot) => {
                    slot.insert(incoming.clone());
                }
                btree_map::Entry::Occupied(mut slot) => match (slot.get_mut(), incoming) {
                    (Bound::One(a), Bound::One(b)) if *a == *b => {}
                    (Bound::Many(acc), Bound::Many(more)) => acc.extend_from_slice(more),
                    (existing, _) => {
                        return Err(MatchError::ConflictingBinding {
                            id: *id,
                            existing: existing.clone(),
                            incoming: incoming.clone(),
                        })
                    }
                },
            }
        }
        Ok(Bindings { entries })
    }

    /// Turn every single binding into a one-element collected list, so that merging the
    /// per-child results of one matcher accumulates instead of conflicting.
    pub fn into_collecting(self) -> Bindings {
        let entries = self
            .entries
            .into_iter()
            .map(|(id, bound)| match bound {
                Bound::One(v) => (id, Bound::Many(vec![v])),
                many => (id, many),
            })
            .collect();
        Bindings { entries }
    }

    pub fn get(&self, id: MatcherId) -> Result<&Bound, MatchError> {
        self.entries.get(&id).ok_or(MatchError::Unbound(id))
    }

    /// The expression a type matcher matched.
    pub fn get_expr(&self, id: MatcherId) -> Result<ExprId, MatchError> {
        match self.get(id)? {
            Bound::One(Matched::Expr(e)) => Ok(*e),
            _ => Err(MatchError::WrongShape {
                id,
                expected: "a single expression",
            }),
        }
    }

    /// The group a reference matcher matched.
    pub fn get_group(&self, id: MatcherId) -> Result<GroupId, MatchError> {
        match self.get(id)? {
            Bound::One(Matched::Group(g)) => Ok(*g),
            _ => Err(MatchError::WrongShape {
                id,
                expected: "a single group",
            }),
        }
    }

    /// Everything bound to `id`, in order. Unbound reads as empty: a collecting matcher
    /// applied to zero children leaves no entry behind.
    pub fn get_all(&self, id: MatcherId) -> &[Matched] {
        self.entries.get(&id).map(Bound::values).unwrap_or(&[])
    }

    pub fn contains(&self, id: MatcherId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (MatcherId, &Bound)> + '_ {
        self.entries.iter().map(|(id, bound)| (*id, bound))
    }
}
