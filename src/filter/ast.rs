//! Filter AST: boolean combinations of field comparisons.

use crate::error::{QuiverDbError, Result};
use crate::metadata::FieldValue;
use std::fmt;

/// Comparison operator in a filter leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Lt,
    Ge,
    Le,
}

impl CompareOp {
    /// The surface-syntax spelling of this operator.
    pub fn as_str(&self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "!=",
            CompareOp::Gt => ">",
            CompareOp::Lt => "<",
            CompareOp::Ge => ">=",
            CompareOp::Le => "<=",
        }
    }

    /// Parse an operator token.
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "=" => Ok(CompareOp::Eq),
            "!=" => Ok(CompareOp::Ne),
            ">" => Ok(CompareOp::Gt),
            "<" => Ok(CompareOp::Lt),
            ">=" => Ok(CompareOp::Ge),
            "<=" => Ok(CompareOp::Le),
            other => Err(QuiverDbError::invalid_filter(format!(
                "unsupported comparison operator: {other}"
            ))),
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Boolean connective joining two filter subtrees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolOp {
    And,
    Or,
}

impl fmt::Display for BoolOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BoolOp::And => "AND",
            BoolOp::Or => "OR",
        })
    }
}

/// A parsed filter expression.
///
/// Both the id-set evaluator and the per-record matcher traverse this type
/// by direct pattern match (see [`crate::metadata::DataStore`]).
#[derive(Debug, Clone, PartialEq)]
pub enum FilterNode {
    /// `field op literal`
    Comparison {
        field: String,
        op: CompareOp,
        value: FieldValue,
    },
    /// `left AND right` / `left OR right`
    Boolean {
        op: BoolOp,
        left: Box<FilterNode>,
        right: Box<FilterNode>,
    },
    /// `NOT child`
    Not(Box<FilterNode>),
}

impl FilterNode {
    /// Build a comparison leaf.
    pub fn comparison(
        field: impl Into<String>,
        op: CompareOp,
        value: impl Into<FieldValue>,
    ) -> Self {
        FilterNode::Comparison {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    /// Combine two filters with AND.
    pub fn and(left: FilterNode, right: FilterNode) -> Self {
        FilterNode::Boolean {
            op: BoolOp::And,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Combine two filters with OR.
    pub fn or(left: FilterNode, right: FilterNode) -> Self {
        FilterNode::Boolean {
            op: BoolOp::Or,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Negate a filter.
    pub fn negate(child: FilterNode) -> Self {
        FilterNode::Not(Box::new(child))
    }
}

/// The printed form is stable (equal ASTs always render identically) and
/// re-parses to an equal AST: string literals keep their quotes, float
/// literals keep a fractional digit, and boolean subtrees that bare
/// printing would reassociate are parenthesized.
impl fmt::Display for FilterNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterNode::Comparison { field, op, value } => match value {
                FieldValue::Str(s) => write!(f, "{field} {op} \"{s}\""),
                other => write!(f, "{field} {op} {other}"),
            },
            FilterNode::Boolean { op, left, right } => {
                // Left-associative grammar: only the right side regroups
                write!(f, "{left} {op} ")?;
                write_grouped(f, right)
            }
            FilterNode::Not(child) => {
                f.write_str("NOT ")?;
                write_grouped(f, child)
            }
        }
    }
}

fn write_grouped(f: &mut fmt::Formatter<'_>, node: &FilterNode) -> fmt::Result {
    if matches!(node, FilterNode::Boolean { .. }) {
        write!(f, "({node})")
    } else {
        write!(f, "{node}")
    }
}
