use crate::ast::*;

/// Render a condition tree to SOQL.
pub trait ConditionToSoql {
    fn to_soql(&self) -> String;
}

impl ConditionToSoql for WhereAst {
    fn to_soql(&self) -> String {
        match self {
            WhereAst::Raw(fragment) => fragment.clone(),
            WhereAst::Not(node) => format!("(NOT {})", node.to_soql()),
            WhereAst::And(nodes) | WhereAst::Or(nodes) => {
                let joiner = format!(" {} ", self.logical_op().unwrap_or_default().keyword());
                let parts: Vec<String> = nodes.iter().map(|n| n.to_soql()).collect();
                format!("({})", parts.join(&joiner))
            }
            WhereAst::Cond(cond) => cond.to_soql(),
        }
    }
}

impl ConditionToSoql for Condition {
    fn to_soql(&self) -> String {
        let f = &self.field_path;
        match self.op {
            Operator::Eq => format!("{} = {}", f, single(&self.operand)),
            Operator::Ne => format!("{} != {}", f, single(&self.operand)),
            Operator::Gt => format!("{} > {}", f, single(&self.operand)),
            Operator::Gte => format!("{} >= {}", f, single(&self.operand)),
            Operator::Lt => format!("{} < {}", f, single(&self.operand)),
            Operator::Lte => format!("{} <= {}", f, single(&self.operand)),
            Operator::Like => format!("{} LIKE {}", f, pattern(&self.operand, "", "")),
            Operator::StartsWith => format!("{} LIKE {}", f, pattern(&self.operand, "", "%")),
            Operator::EndsWith => format!("{} LIKE {}", f, pattern(&self.operand, "%", "")),
            Operator::Between => {
                let (low, high) = match &self.operand {
                    Operand::Range(low, high) => (escape_value(low), escape_value(high)),
                    _ => ("null".to_string(), "null".to_string()),
                };
                format!("({} >= {} AND {} <= {})", f, low, f, high)
            }
            Operator::IsNull => format!("{} = null", f),
            Operator::IsNotNull => format!("{} != null", f),
            Operator::In | Operator::NotIn => {
                let keyword = if self.op == Operator::In { "IN" } else { "NOT IN" };
                let list: Vec<String> = list(&self.operand).iter().map(escape_value).collect();
                format!("{} {} ({})", f, keyword, list.join(", "))
            }
        }
    }
}

fn single(operand: &Operand) -> String {
    match operand {
        Operand::Value(v) => escape_value(v),
        _ => "null".to_string(),
    }
}

fn pattern(operand: &Operand, prefix: &str, suffix: &str) -> String {
    match operand {
        Operand::Value(v) => escape_string(&format!("{}{}{}", prefix, v, suffix)),
        _ => "null".to_string(),
    }
}

fn list(operand: &Operand) -> &[Value] {
    match operand {
        Operand::List(values) => values.as_slice(),
        Operand::Value(Value::Array(values)) => values.as_slice(),
        Operand::Value(v) => std::slice::from_ref(v),
        _ => &[],
    }
}

/// Quote a string literal. Backslashes and single quotes are escaped.
pub fn escape_string(val: &str) -> String {
    let mut out = String::with_capacity(val.len() + 2);
    out.push('\'');
    for c in val.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}

/// Render a literal in SOQL syntax.
pub fn escape_value(val: &Value) -> String {
    match val {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Int(n) => n.to_string(),
        Value::Float(n) => n.to_string(),
        Value::String(s) => escape_string(s),
        Value::Date(_) | Value::DateTime(_) | Value::Array(_) => escape_string(&val.to_string()),
    }
}
