//! Filter expressions and their MongoDB wire encoding.
//!
//! Condition building produces an [`Expr`] tree; stores either evaluate the
//! tree directly or encode it with [`Expr::to_mongo`].

use serde_json::{json, Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl CmpOp {
    pub fn operator(self) -> &'static str {
        match self {
            CmpOp::Eq => "$eq",
            CmpOp::Ne => "$ne",
            CmpOp::Gt => "$gt",
            CmpOp::Gte => "$gte",
            CmpOp::Lt => "$lt",
            CmpOp::Lte => "$lte",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Matches every document.
    All,
    And(Vec<Expr>),
    Or(Vec<Expr>),
    Cmp {
        field: String,
        op: CmpOp,
        value: Value,
    },
    /// Field (or any element of an array field) is one of `values`.
    In { field: String, values: Vec<Value> },
}

impl Expr {
    pub fn is_in<I, V>(field: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Expr::In {
            field: field.to_string(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn cmp(field: &str, op: CmpOp, value: impl Into<Value>) -> Self {
        Expr::Cmp {
            field: field.to_string(),
            op,
            value: value.into(),
        }
    }

    pub fn eq(field: &str, value: impl Into<Value>) -> Self {
        Self::cmp(field, CmpOp::Eq, value)
    }

    /// `field > low AND field < high`
    pub fn between_exclusive(field: &str, low: i64, high: i64) -> Self {
        Expr::And(vec![
            Self::cmp(field, CmpOp::Gt, low),
            Self::cmp(field, CmpOp::Lt, high),
        ])
    }

    /// Conjunction of `clauses`; no clauses means match-all rather than an
    /// empty `$and`, which the store rejects.
    pub fn all_of(clauses: Vec<Expr>) -> Self {
        if clauses.is_empty() {
            Expr::All
        } else {
            Expr::And(clauses)
        }
    }

    pub fn any_of(clauses: Vec<Expr>) -> Self {
        Expr::Or(clauses)
    }

    pub fn to_mongo(&self) -> Value {
        match self {
            Expr::All => Value::Object(Map::new()),
            Expr::And(xs) if xs.is_empty() => Value::Object(Map::new()),
            Expr::And(xs) => json!({ "$and": xs.iter().map(Expr::to_mongo).collect::<Vec<_>>() }),
            Expr::Or(xs) => json!({ "$or": xs.iter().map(Expr::to_mongo).collect::<Vec<_>>() }),
            Expr::Cmp { field, op, value } => {
                let mut inner = Map::new();
                inner.insert(op.operator().to_string(), value.clone());
                let mut m = Map::new();
                m.insert(field.clone(), Value::Object(inner));
                Value::Object(m)
            }
            Expr::In { field, values } => {
                let mut m = Map::new();
                m.insert(field.clone(), json!({ "$in": values }));
                Value::Object(m)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_conjunction_is_match_all() {
        assert_eq!(Expr::all_of(vec![]), Expr::All);
        assert_eq!(Expr::All.to_mongo(), json!({}));
        assert_eq!(Expr::And(vec![]).to_mongo(), json!({}));
    }

    #[test]
    fn encodes_membership_and_range() {
        let e = Expr::all_of(vec![
            Expr::is_in("Studio", ["A24"]),
            Expr::between_exclusive("Runtime", 90, 120),
        ]);
        assert_eq!(
            e.to_mongo(),
            json!({"$and": [
                {"Studio": {"$in": ["A24"]}},
                {"$and": [{"Runtime": {"$gt": 90}}, {"Runtime": {"$lt": 120}}]}
            ]})
        );
    }

    #[test]
    fn encodes_disjunction() {
        let e = Expr::any_of(vec![Expr::eq("Genre", "Comedy"), Expr::eq("Genre_2", "Comedy")]);
        assert_eq!(
            e.to_mongo(),
            json!({"$or": [{"Genre": {"$eq": "Comedy"}}, {"Genre_2": {"$eq": "Comedy"}}]})
        );
    }
}
