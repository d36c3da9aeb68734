//! Filter evaluation over JSON documents.
//!
//! Dotted paths descend through objects and fan out across arrays, so
//! `Provider.flatrate.provider_id` reaches the id of every flatrate entry.
//! A path that reaches nothing is *missing*, which is distinct from an
//! explicit `null`.

use movieshelf_core::util::{cmp_values, values_equal};
use movieshelf_core::{CmpOp, Expr, SortOrder};
use serde_json::{Map, Value};
use std::cmp::Ordering;

/// Values reachable at `path`. With `expand_leaf_arrays` a leaf array
/// contributes itself as well as each element, which is how filters see
/// array fields.
pub fn values_at<'a>(doc: &'a Value, path: &str, expand_leaf_arrays: bool) -> Vec<&'a Value> {
    let parts: Vec<&str> = path.split('.').collect();
    let mut out = Vec::new();
    collect(doc, &parts, expand_leaf_arrays, &mut out);
    out
}

fn collect<'a>(v: &'a Value, parts: &[&str], expand: bool, out: &mut Vec<&'a Value>) {
    match parts.split_first() {
        None => match v {
            Value::Array(items) => {
                if expand {
                    out.push(v);
                }
                out.extend(items.iter());
            }
            other => out.push(other),
        },
        Some((head, rest)) => match v {
            Value::Object(m) => {
                if let Some(child) = m.get(*head) {
                    collect(child, rest, expand, out);
                }
            }
            Value::Array(items) => {
                for item in items.iter().filter(|i| i.is_object()) {
                    collect(item, parts, expand, out);
                }
            }
            _ => {}
        },
    }
}

/// Single value at `path`, descending through objects only.
pub fn get_path<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(doc, |cur, key| cur.as_object().and_then(|m| m.get(key)))
}

/// Value at `path` as an aggregation expression sees it: arrays along the
/// way are mapped element-wise, dropping elements where the path is missing.
pub fn resolve(doc: &Value, path: &str) -> Option<Value> {
    let (head, rest) = match path.split_once('.') {
        Some((h, r)) => (h, Some(r)),
        None => (path, None),
    };
    match doc {
        Value::Object(m) => {
            let child = m.get(head)?;
            match rest {
                None => Some(child.clone()),
                Some(r) => resolve(child, r),
            }
        }
        Value::Array(items) => Some(Value::Array(
            items.iter().filter_map(|i| resolve(i, path)).collect(),
        )),
        _ => None,
    }
}

/// Write `value` at `path`, creating intermediate objects as needed.
pub fn set_path(doc: &mut Value, path: &str, value: Value) {
    let mut cur = doc;
    let mut parts = path.split('.').peekable();
    while let Some(key) = parts.next() {
        if !cur.is_object() {
            *cur = Value::Object(Map::new());
        }
        let Value::Object(m) = cur else { return };
        if parts.peek().is_none() {
            m.insert(key.to_string(), value);
            return;
        }
        cur = m
            .entry(key.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }
}

pub fn matches(expr: &Expr, doc: &Value) -> bool {
    match expr {
        Expr::All => true,
        Expr::And(xs) => xs.iter().all(|x| matches(x, doc)),
        Expr::Or(xs) => xs.iter().any(|x| matches(x, doc)),
        Expr::In { field, values } => {
            let found = values_at(doc, field, true);
            values.iter().any(|want| equals_any(&found, want))
        }
        Expr::Cmp { field, op, value } => {
            let found = values_at(doc, field, true);
            match op {
                CmpOp::Eq => equals_any(&found, value),
                CmpOp::Ne => !equals_any(&found, value),
                CmpOp::Gt | CmpOp::Gte | CmpOp::Lt | CmpOp::Lte => found
                    .iter()
                    .filter(|v| comparable(v, value))
                    .any(|v| {
                        let o = cmp_values(Some(v), Some(value));
                        match op {
                            CmpOp::Gt => o == Ordering::Greater,
                            CmpOp::Gte => o != Ordering::Less,
                            CmpOp::Lt => o == Ordering::Less,
                            _ => o != Ordering::Greater,
                        }
                    }),
            }
        }
    }
}

// `null` also matches a missing field.
fn equals_any(found: &[&Value], want: &Value) -> bool {
    if want.is_null() && found.is_empty() {
        return true;
    }
    found.iter().any(|v| values_equal(v, want))
}

// Range operators only compare within a type bracket.
fn comparable(a: &Value, b: &Value) -> bool {
    matches!(
        (a, b),
        (Value::Number(_), Value::Number(_))
            | (Value::String(_), Value::String(_))
            | (Value::Bool(_), Value::Bool(_))
            | (Value::Null, Value::Null)
    )
}

/// Stable multi-key sort.
pub fn sort_documents(docs: &mut [Value], keys: &[(String, SortOrder)]) {
    if keys.is_empty() {
        return;
    }
    docs.sort_by(|a, b| {
        for (field, order) in keys {
            let o = cmp_values(get_path(a, field), get_path(b, field));
            let o = match order {
                SortOrder::Asc => o,
                SortOrder::Desc => o.reverse(),
            };
            if o != Ordering::Equal {
                return o;
            }
        }
        Ordering::Equal
    });
}
