use crate::ast::{LogicalOp, Operator, Value};
use serde::{Deserialize, Serialize};

/// What a condition compares its field against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operand {
    /// IS NULL / IS NOT NULL
    None,
    /// Single comparison value
    Value(Value),
    /// Membership list for IN / NOT IN
    List(Vec<Value>),
    /// Inclusive bounds for BETWEEN
    Range(Value, Value),
}

/// A single field condition.
///
/// Carries both the logical key (used when mapping results back) and the
/// provider path (used when rendering).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub field_key: String,
    pub field_path: String,
    pub op: Operator,
    pub operand: Operand,
}

impl Condition {
    /// Comparison against one value (eq, ne, gt, gte, lt, lte, like, startsWith, endsWith).
    pub fn compare(
        field_key: impl Into<String>,
        field_path: impl Into<String>,
        op: Operator,
        value: impl Into<Value>,
    ) -> Self {
        Self {
            field_key: field_key.into(),
            field_path: field_path.into(),
            op,
            operand: Operand::Value(value.into()),
        }
    }

    /// Membership check; `negated` selects NOT IN.
    pub fn membership(
        field_key: impl Into<String>,
        field_path: impl Into<String>,
        negated: bool,
        values: Vec<Value>,
    ) -> Self {
        Self {
            field_key: field_key.into(),
            field_path: field_path.into(),
            op: if negated { Operator::NotIn } else { Operator::In },
            operand: Operand::List(values),
        }
    }

    pub fn between(
        field_key: impl Into<String>,
        field_path: impl Into<String>,
        low: impl Into<Value>,
        high: impl Into<Value>,
    ) -> Self {
        Self {
            field_key: field_key.into(),
            field_path: field_path.into(),
            op: Operator::Between,
            operand: Operand::Range(low.into(), high.into()),
        }
    }

    pub fn is_null(field_key: impl Into<String>, field_path: impl Into<String>) -> Self {
        Self {
            field_key: field_key.into(),
            field_path: field_path.into(),
            op: Operator::IsNull,
            operand: Operand::None,
        }
    }

    pub fn is_not_null(field_key: impl Into<String>, field_path: impl Into<String>) -> Self {
        Self {
            field_key: field_key.into(),
            field_path: field_path.into(),
            op: Operator::IsNotNull,
            operand: Operand::None,
        }
    }
}

impl std::fmt::Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}[{}] {}", self.field_key, self.field_path, self.op)?;
        match &self.operand {
            Operand::None => Ok(()),
            Operand::Value(v) => write!(f, " {:?}", v.to_string()),
            Operand::List(values) => {
                write!(f, " [")?;
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{:?}", v.to_string())?;
                }
                write!(f, "]")
            }
            Operand::Range(low, high) => {
                write!(f, " {:?}..={:?}", low.to_string(), high.to_string())
            }
        }
    }
}

/// Normalized boolean filter tree, independent of any query language.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WhereAst {
    And(Vec<WhereAst>),
    Or(Vec<WhereAst>),
    Not(Box<WhereAst>),
    /// Trusted fragment emitted verbatim by every dialect.
    Raw(String),
    Cond(Condition),
}

impl WhereAst {
    /// Combinator of this node, if it is `and`/`or`.
    pub fn logical_op(&self) -> Option<LogicalOp> {
        match self {
            WhereAst::And(_) => Some(LogicalOp::And),
            WhereAst::Or(_) => Some(LogicalOp::Or),
            _ => None,
        }
    }

    /// Visit every condition node, depth first.
    pub fn conditions(&self) -> Vec<&Condition> {
        let mut out = Vec::new();
        self.collect_conditions(&mut out);
        out
    }

    fn collect_conditions<'a>(&'a self, out: &mut Vec<&'a Condition>) {
        match self {
            WhereAst::And(nodes) | WhereAst::Or(nodes) => {
                for node in nodes {
                    node.collect_conditions(out);
                }
            }
            WhereAst::Not(node) => node.collect_conditions(out),
            WhereAst::Raw(_) => {}
            WhereAst::Cond(cond) => out.push(cond),
        }
    }

    /// Indented tree rendering used by `crmql explain`.
    pub fn pretty(&self) -> String {
        let mut out = String::new();
        self.write_pretty(&mut out, 0);
        out
    }

    fn write_pretty(&self, out: &mut String, depth: usize) {
        let indent = "  ".repeat(depth);
        match self {
            WhereAst::And(nodes) | WhereAst::Or(nodes) => {
                let name = if matches!(self, WhereAst::And(_)) { "and" } else { "or" };
                out.push_str(&format!("{}{}\n", indent, name));
                for node in nodes {
                    node.write_pretty(out, depth + 1);
                }
            }
            WhereAst::Not(node) => {
                out.push_str(&format!("{}not\n", indent));
                node.write_pretty(out, depth + 1);
            }
            WhereAst::Raw(fragment) => out.push_str(&format!("{}raw {:?}\n", indent, fragment)),
            WhereAst::Cond(cond) => out.push_str(&format!("{}{}\n", indent, cond)),
        }
    }
}

impl From<Condition> for WhereAst {
    fn from(cond: Condition) -> Self {
        WhereAst::Cond(cond)
    }
}
