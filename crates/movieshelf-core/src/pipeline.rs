//! Aggregation pipelines as typed stages.
//!
//! Only the operators the facet queries need are modelled. Each node encodes
//! to the MongoDB pipeline shape via `to_mongo`.

use crate::expr::Expr;
use crate::query::{sort_to_mongo, SortOrder, SortSpec};
use serde_json::{json, Map, Value};

/// Value expression evaluated per document inside a stage.
#[derive(Debug, Clone, PartialEq)]
pub enum AggExpr {
    /// Dotted path into the current document (`"$a.b"`).
    Field(String),
    /// Bound variable plus optional path (`"$$v.a"`).
    Var(String),
    Literal(Value),
    IfNull(Box<AggExpr>, Box<AggExpr>),
    Eq(Box<AggExpr>, Box<AggExpr>),
    Ne(Box<AggExpr>, Box<AggExpr>),
    Cond {
        test: Box<AggExpr>,
        then: Box<AggExpr>,
        otherwise: Box<AggExpr>,
    },
    Filter {
        input: Box<AggExpr>,
        var: String,
        cond: Box<AggExpr>,
    },
    Map {
        input: Box<AggExpr>,
        var: String,
        apply: Box<AggExpr>,
    },
    /// Sum of a numeric array.
    Sum(Box<AggExpr>),
    /// Union of arrays without duplicates.
    SetUnion(Vec<AggExpr>),
    Doc(Vec<(String, AggExpr)>),
}

impl AggExpr {
    pub fn field(path: &str) -> Self {
        AggExpr::Field(path.to_string())
    }

    pub fn var(path: &str) -> Self {
        AggExpr::Var(path.to_string())
    }

    pub fn lit(v: impl Into<Value>) -> Self {
        AggExpr::Literal(v.into())
    }

    pub fn doc<const N: usize>(entries: [(&str, AggExpr); N]) -> Self {
        AggExpr::Doc(entries.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
    }

    pub fn if_null(value: AggExpr, replacement: AggExpr) -> Self {
        AggExpr::IfNull(Box::new(value), Box::new(replacement))
    }

    pub fn eq(a: AggExpr, b: AggExpr) -> Self {
        AggExpr::Eq(Box::new(a), Box::new(b))
    }

    pub fn ne(a: AggExpr, b: AggExpr) -> Self {
        AggExpr::Ne(Box::new(a), Box::new(b))
    }

    pub fn cond(test: AggExpr, then: AggExpr, otherwise: AggExpr) -> Self {
        AggExpr::Cond {
            test: Box::new(test),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        }
    }

    pub fn filter(input: AggExpr, var: &str, cond: AggExpr) -> Self {
        AggExpr::Filter {
            input: Box::new(input),
            var: var.to_string(),
            cond: Box::new(cond),
        }
    }

    pub fn map(input: AggExpr, var: &str, apply: AggExpr) -> Self {
        AggExpr::Map {
            input: Box::new(input),
            var: var.to_string(),
            apply: Box::new(apply),
        }
    }

    pub fn sum(input: AggExpr) -> Self {
        AggExpr::Sum(Box::new(input))
    }

    pub fn to_mongo(&self) -> Value {
        match self {
            AggExpr::Field(p) => Value::String(format!("${p}")),
            AggExpr::Var(v) => Value::String(format!("$${v}")),
            AggExpr::Literal(v) => literal(v),
            AggExpr::IfNull(a, b) => json!({ "$ifNull": [a.to_mongo(), b.to_mongo()] }),
            AggExpr::Eq(a, b) => json!({ "$eq": [a.to_mongo(), b.to_mongo()] }),
            AggExpr::Ne(a, b) => json!({ "$ne": [a.to_mongo(), b.to_mongo()] }),
            AggExpr::Cond {
                test,
                then,
                otherwise,
            } => json!({ "$cond": [test.to_mongo(), then.to_mongo(), otherwise.to_mongo()] }),
            AggExpr::Filter { input, var, cond } => json!({
                "$filter": { "input": input.to_mongo(), "as": var, "cond": cond.to_mongo() }
            }),
            AggExpr::Map { input, var, apply } => json!({
                "$map": { "input": input.to_mongo(), "as": var, "in": apply.to_mongo() }
            }),
            AggExpr::Sum(x) => json!({ "$sum": x.to_mongo() }),
            AggExpr::SetUnion(xs) => {
                json!({ "$setUnion": xs.iter().map(AggExpr::to_mongo).collect::<Vec<_>>() })
            }
            AggExpr::Doc(entries) => {
                let mut m = Map::new();
                for (k, v) in entries {
                    m.insert(k.clone(), v.to_mongo());
                }
                Value::Object(m)
            }
        }
    }
}

// Strings starting with `$` would read as paths and objects/arrays as operators.
fn literal(v: &Value) -> Value {
    match v {
        Value::String(s) if s.starts_with('$') => json!({ "$literal": s }),
        Value::Object(_) | Value::Array(_) => json!({ "$literal": v }),
        other => other.clone(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Accumulator {
    Sum(AggExpr),
    Push(AggExpr),
    First(AggExpr),
    Min(AggExpr),
    Max(AggExpr),
}

impl Accumulator {
    pub fn count() -> Self {
        Accumulator::Sum(AggExpr::lit(1))
    }

    pub fn to_mongo(&self) -> Value {
        let (op, e) = match self {
            Accumulator::Sum(e) => ("$sum", e),
            Accumulator::Push(e) => ("$push", e),
            Accumulator::First(e) => ("$first", e),
            Accumulator::Min(e) => ("$min", e),
            Accumulator::Max(e) => ("$max", e),
        };
        let mut m = Map::new();
        m.insert(op.to_string(), e.to_mongo());
        Value::Object(m)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    Include,
    Exclude,
    Compute(AggExpr),
}

impl Projection {
    fn to_mongo(&self) -> Value {
        match self {
            Projection::Include => Value::from(1),
            Projection::Exclude => Value::from(0),
            // bare numbers and booleans mean include/exclude inside $project
            Projection::Compute(AggExpr::Literal(v)) if !v.is_string() => {
                json!({ "$literal": v })
            }
            Projection::Compute(e) => e.to_mongo(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    Match(Expr),
    Group {
        id: AggExpr,
        fields: Vec<(String, Accumulator)>,
    },
    /// Path of the array to unwind, without the leading `$`.
    Unwind(String),
    Project(Vec<(String, Projection)>),
    Sort(SortSpec),
    Facet(Vec<(String, Vec<Stage>)>),
    Limit(u64),
}

impl Stage {
    pub fn group<const N: usize>(id: AggExpr, fields: [(&str, Accumulator); N]) -> Self {
        Stage::Group {
            id,
            fields: fields.into_iter().map(|(k, a)| (k.to_string(), a)).collect(),
        }
    }

    pub fn project<const N: usize>(fields: [(&str, Projection); N]) -> Self {
        Stage::Project(fields.into_iter().map(|(k, p)| (k.to_string(), p)).collect())
    }

    pub fn sort<const N: usize>(keys: [(&str, SortOrder); N]) -> Self {
        Stage::Sort(keys.into_iter().map(|(k, o)| (k.to_string(), o)).collect())
    }

    pub fn unwind(path: &str) -> Self {
        Stage::Unwind(path.to_string())
    }

    pub fn to_mongo(&self) -> Value {
        match self {
            Stage::Match(e) => json!({ "$match": e.to_mongo() }),
            Stage::Group { id, fields } => {
                let mut m = Map::new();
                m.insert("_id".to_string(), id.to_mongo());
                for (name, acc) in fields {
                    m.insert(name.clone(), acc.to_mongo());
                }
                json!({ "$group": m })
            }
            Stage::Unwind(path) => json!({ "$unwind": format!("${path}") }),
            Stage::Project(fields) => {
                let mut m = Map::new();
                for (name, p) in fields {
                    m.insert(name.clone(), p.to_mongo());
                }
                json!({ "$project": m })
            }
            Stage::Sort(keys) => json!({ "$sort": sort_to_mongo(keys) }),
            Stage::Facet(branches) => {
                let mut m = Map::new();
                for (name, stages) in branches {
                    m.insert(name.clone(), Value::Array(pipeline_to_mongo(stages)));
                }
                json!({ "$facet": m })
            }
            Stage::Limit(n) => json!({ "$limit": n }),
        }
    }
}

pub fn pipeline_to_mongo(stages: &[Stage]) -> Vec<Value> {
    stages.iter().map(Stage::to_mongo).collect()
}
