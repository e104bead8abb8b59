//! Any-child-with-rest: inspect one child deeply, bind the others opaquely.
//!
//! Useful for operators with an unbounded number of children (n-ary joins, unions) when
//! a rule cares about exactly one of them. Since the selected matcher may match several
//! children, the matcher explores every position and yields one alternative per
//! position and per match at that position:
//!
//! ```text
//! Join[A, B, C] with selected = Scan(x), rest = ref(y)
//!   position 0: {x -> A, y -> [B, C]}
//!   position 1: {x -> B, y -> [A, C]}
//!   position 2: {x -> C, y -> [A, B]}
//! ```
//!
//! Results are not deduplicated.

use super::{fail, halt_on_error, AllChildrenMatcher, BindingStream, ExpressionMatcher, MatcherId, ReferenceMatcher};
use crate::bindings::Bindings;
use crate::error::MatchError;
use crate::memo::{GroupId, Memo};
use std::rc::Rc;
use tracing::trace;

#[derive(Debug, Clone)]
pub struct AnyChildWithRestMatcher {
    selected: Box<ExpressionMatcher>,
    rest: AllChildrenMatcher,
}

impl AnyChildWithRestMatcher {
    pub fn new(selected: impl Into<ExpressionMatcher>, rest: ReferenceMatcher) -> Self {
        Self::with_rest_matcher(selected, AllChildrenMatcher::new(rest))
    }

    /// Bind the remaining children with an arbitrary all-children matcher.
    ///
    /// The rest matcher must yield exactly one binding set for every position; anything
    /// else is reported as [`MatchError::InvariantViolation`]. A reference matcher always
    /// satisfies this, which is why [`AnyChildWithRestMatcher::new`] takes one.
    pub fn with_rest_matcher(selected: impl Into<ExpressionMatcher>, rest: AllChildrenMatcher) -> Self {
        Self {
            selected: Box::new(selected.into()),
            rest,
        }
    }

    pub fn selected_id(&self) -> MatcherId {
        self.selected.id()
    }

    pub fn rest_id(&self) -> MatcherId {
        self.rest.matcher().id()
    }

    pub fn match_children<'a>(&'a self, memo: &'a Memo, children: &[GroupId]) -> BindingStream<'a> {
        let children: Rc<[GroupId]> = children.into();
        halt_on_error(
            (0..children.len()).flat_map(move |position| self.match_position(memo, &children, position)),
        )
    }

    fn match_position<'a>(&'a self, memo: &'a Memo, children: &[GroupId], position: usize) -> BindingStream<'a> {
        let others: Vec<GroupId> = children[..position]
            .iter()
            .chain(&children[position + 1..])
            .copied()
            .collect();
        let rest_bindings = match self.bind_rest(memo, &others) {
            Ok(b) => b,
            Err(e) => return fail(e),
        };
        trace!(
            position,
            child = children[position],
            others = others.len(),
            "matching distinguished child"
        );
        Box::new(
            self.selected
                .match_group(memo, children[position])
                .map(move |item| item.and_then(|b| b.merge(&rest_bindings))),
        )
    }

    fn bind_rest(&self, memo: &Memo, others: &[GroupId]) -> Result<Bindings, MatchError> {
        let mut stream = self.rest.match_children(memo, others);
        match (stream.next(), stream.next()) {
            (Some(Ok(bindings)), None) => Ok(bindings),
            (Some(Err(e)), _) => Err(e),
            (None, _) => Err(MatchError::InvariantViolation(
                "couldn't match the rest-of-children matcher to the other children".into(),
            )),
            (Some(Ok(_)), Some(_)) => Err(MatchError::InvariantViolation(
                "rest-of-children matcher produced more than one binding set".into(),
            )),
        }
    }
}
