//! # optx-match: Matchers and Bindings for the Cascades Optimizer
//!
//! This crate decides whether an expression stored in the memo has the shape an
//! optimization rule asks for, and if so, in how many ways. Each way is reported as a
//! set of [`Bindings`](bindings::Bindings) from matcher ids to the memo expressions and
//! groups they matched, which the rule then reads to build its rewrite.
//!
//! ## Module Overview
//!
//! - **`expr`**: Operator and scalar expression types carried by memo expressions.
//! - **`memo`**: Groups of equivalent expressions, the structure matchers read.
//! - **`bindings`**: The immutable matcher-id to matched-entity map and its merge.
//! - **`pattern`**: The matcher family and the lazy enumeration over child lists.
//! - **`rule`**: The rule trait, rule registry, and a read-only driver that feeds
//!   bindings to rules.
//! - **`error`**: The malformed-pattern error, kept apart from "no match".

pub mod bindings;
pub mod error;
pub mod expr;
pub mod memo;
pub mod pattern;
pub mod rule;
