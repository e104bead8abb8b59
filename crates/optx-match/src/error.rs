//! # Matching Errors
//!
//! Matching has two outcomes that are easy to confuse and must not be:
//!
//! - **No match**: an empty binding stream. Expected, frequent, never an error.
//! - **Malformed pattern**: a [`MatchError`]. It surfaces as an `Err` item in the
//!   binding stream (after which the stream ends) or as the `Err` of a merge or lookup.
//!   Retrying cannot fix it; the pattern itself has to change.

use crate::bindings::Bound;
use crate::pattern::MatcherId;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MatchError {
    /// A structural guarantee of a matcher did not hold, e.g. the rest-of-children
    /// matcher of an any-child-with-rest produced other than exactly one binding set.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),
    /// The same matcher was bound twice with different values, or once as a collecting
    /// binding and once as a single one.
    #[error("conflicting bindings for matcher {id}: {existing:?} vs {incoming:?}")]
    ConflictingBinding {
        id: MatcherId,
        existing: Bound,
        incoming: Bound,
    },
    /// Lookup of a matcher that did not take part in the match.
    #[error("matcher {0} is not bound")]
    Unbound(MatcherId),
    /// Typed lookup found a different kind of value than requested.
    #[error("matcher {id} is not bound to {expected}")]
    WrongShape { id: MatcherId, expected: &'static str },
}
