//! # Operators and Scalar Expressions
//!
//! This module defines the operator catalog that memo expressions carry. Matchers never
//! look at the data inside an operator directly: they dispatch on its [`OpKind`], a
//! field-free discriminant, and leave the data to the rule that consumes the bindings.
//!
//! ## Layers
//!
//! - **`Expr`**: scalar computations (column references, literals, comparisons, boolean
//!   connectives) that live inside operators as predicates, join conditions and keys.
//! - **`LogicalOp`**: *what* to compute. Transformation rules match and rewrite these.
//! - **`PhysicalOp`**: *how* to compute it. Implementation rules produce these.
//! - **`Operator`**: the union of both, which is what a memo expression stores.
//!
//! ## Arity
//!
//! Operators do not carry their children; the memo expression wrapping them does. The
//! catalog therefore does not enforce arity. `Join` and `Union` are routinely n-ary,
//! which is exactly the shape the any-child matchers exist for.

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Reference to a table in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableRef {
    pub schema: String,
    pub name: String,
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.name)
    }
}

/// Reference to a column, optionally qualified by its table name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnRef {
    pub table: Option<String>,
    pub name: String,
    pub index: u32,
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.table {
            Some(t) => write!(f, "{}.{}", t, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

/// Constant value appearing in a scalar expression.
///
/// `f64` is wrapped in `OrderedFloat` so literals are `Eq + Hash`, which the memo
/// needs to deduplicate structurally identical expressions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScalarValue {
    Null,
    Bool(bool),
    Int64(i64),
    Float64(OrderedFloat<f64>),
    Utf8(String),
    /// Days since 1970-01-01.
    Date(i32),
}

/// Scalar expression tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Expr {
    Column(ColumnRef),
    Literal(ScalarValue),
    BinaryOp {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// Flat conjunction. Kept flat so rules can split and recombine predicates
    /// without walking nested binary ANDs.
    And(Vec<Expr>),
    Or(Vec<Expr>),
}

impl Expr {
    /// All column references in this expression, in traversal order.
    pub fn columns(&self) -> Vec<&ColumnRef> {
        let mut cols = Vec::new();
        self.collect_columns(&mut cols);
        cols
    }

    fn collect_columns<'a>(&'a self, out: &mut Vec<&'a ColumnRef>) {
        match self {
            Expr::Column(c) => out.push(c),
            Expr::Literal(_) => {}
            Expr::BinaryOp { left, right, .. } => {
                left.collect_columns(out);
                right.collect_columns(out);
            }
            Expr::And(exprs) | Expr::Or(exprs) => {
                exprs.iter().for_each(|e| e.collect_columns(out))
            }
        }
    }

    /// Whether any column of this expression is qualified with `table`.
    pub fn references_table(&self, table: &str) -> bool {
        self.columns()
            .iter()
            .any(|c| c.table.as_deref() == Some(table))
    }

    /// Whether this expression has at least one column and every column is
    /// qualified with `table`.
    pub fn references_only(&self, table: &str) -> bool {
        let cols = self.columns();
        !cols.is_empty() && cols.iter().all(|c| c.table.as_deref() == Some(table))
    }

    /// Flatten AND-chains: `(A AND (B AND C))` yields `[A, B, C]`.
    pub fn conjuncts(&self) -> Vec<&Expr> {
        match self {
            Expr::And(exprs) => exprs.iter().flat_map(|e| e.conjuncts()).collect(),
            other => vec![other],
        }
    }

    /// Rebuild a predicate from conjuncts. `None` for an empty list, the
    /// conjunct itself for a singleton, `And` otherwise.
    pub fn conjunction(mut conjuncts: Vec<Expr>) -> Option<Expr> {
        match conjuncts.len() {
            0 => None,
            1 => conjuncts.pop(),
            _ => Some(Expr::And(conjuncts)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

/// SQL join types. Only `Inner` and `Cross` are commutative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JoinType {
    Inner,
    Left,
    Right,
    Full,
    Semi,
    Anti,
    Cross,
}

/// Logical operators.
///
/// Children are group ids held by the enclosing memo expression, never stored here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogicalOp {
    /// Base table read with optional column pruning and pushed-down predicate. Leaf.
    Scan {
        table: TableRef,
        columns: Vec<ColumnRef>,
        predicate: Option<Expr>,
    },
    Filter {
        predicate: Expr,
    },
    /// Join of two or more inputs under one condition. Binary joins are the common
    /// case; flattened inner joins may have any number of inputs.
    Join {
        join_type: JoinType,
        condition: Expr,
    },
    /// Concatenation of any number of inputs. `all == false` removes duplicates.
    Union {
        all: bool,
    },
    Limit {
        offset: u64,
        count: u64,
    },
}

/// Physical operators.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PhysicalOp {
    SeqScan {
        table: TableRef,
        columns: Vec<ColumnRef>,
        predicate: Option<Expr>,
    },
    NestedLoopJoin {
        join_type: JoinType,
        condition: Expr,
    },
    UnionAll,
}

/// Unified operator stored by memo expressions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    Logical(LogicalOp),
    Physical(PhysicalOp),
}

impl Operator {
    pub fn is_logical(&self) -> bool {
        matches!(self, Operator::Logical(_))
    }

    pub fn is_physical(&self) -> bool {
        matches!(self, Operator::Physical(_))
    }

    pub fn kind(&self) -> OpKind {
        match self {
            Operator::Logical(l) => OpKind::Logical(l.kind()),
            Operator::Physical(p) => OpKind::Physical(p.kind()),
        }
    }
}

/// Field-free operator discriminant.
///
/// This is what type matchers dispatch on: "is this a Join" without caring about the
/// join condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OpKind {
    Logical(LogicalOpKind),
    Physical(PhysicalOpKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogicalOpKind {
    Scan,
    Filter,
    Join,
    Union,
    Limit,
}

impl LogicalOp {
    pub fn kind(&self) -> LogicalOpKind {
        match self {
            LogicalOp::Scan { .. } => LogicalOpKind::Scan,
            LogicalOp::Filter { .. } => LogicalOpKind::Filter,
            LogicalOp::Join { .. } => LogicalOpKind::Join,
            LogicalOp::Union { .. } => LogicalOpKind::Union,
            LogicalOp::Limit { .. } => LogicalOpKind::Limit,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PhysicalOpKind {
    SeqScan,
    NestedLoopJoin,
    UnionAll,
}

impl PhysicalOp {
    pub fn kind(&self) -> PhysicalOpKind {
        match self {
            PhysicalOp::SeqScan { .. } => PhysicalOpKind::SeqScan,
            PhysicalOp::NestedLoopJoin { .. } => PhysicalOpKind::NestedLoopJoin,
            PhysicalOp::UnionAll => PhysicalOpKind::UnionAll,
        }
    }
}
