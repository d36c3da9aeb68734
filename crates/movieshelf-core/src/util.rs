use serde_json::Value;
use std::cmp::Ordering;

fn type_rank(v: &Value) -> u8 {
    match v {
        Value::Null => 0,
        Value::Number(_) => 1,
        Value::String(_) => 2,
        Value::Object(_) => 3,
        Value::Array(_) => 4,
        Value::Bool(_) => 5,
    }
}

/// Total order over JSON values following the store's cross-type ordering:
/// missing < null < numbers < strings < objects < arrays < booleans.
pub fn cmp_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => cmp_present(a, b),
    }
}

fn cmp_present(a: &Value, b: &Value) -> Ordering {
    let (ra, rb) = (type_rank(a), type_rank(b));
    if ra != rb {
        return ra.cmp(&rb);
    }
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => cmp_numbers(x, y),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => {
            for (l, r) in x.iter().zip(y.iter()) {
                let o = cmp_present(l, r);
                if o != Ordering::Equal {
                    return o;
                }
            }
            x.len().cmp(&y.len())
        }
        (Value::Object(x), Value::Object(y)) => {
            for ((kl, vl), (kr, vr)) in x.iter().zip(y.iter()) {
                let o = kl.cmp(kr).then_with(|| cmp_present(vl, vr));
                if o != Ordering::Equal {
                    return o;
                }
            }
            x.len().cmp(&y.len())
        }
        _ => Ordering::Equal,
    }
}

fn cmp_numbers(x: &serde_json::Number, y: &serde_json::Number) -> Ordering {
    if let (Some(a), Some(b)) = (x.as_i64(), y.as_i64()) {
        return a.cmp(&b);
    }
    let a = x.as_f64().unwrap_or(f64::NAN);
    let b = y.as_f64().unwrap_or(f64::NAN);
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

/// Equality with numeric coercion (`3 == 3.0`).
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(_), Value::Number(_)) => cmp_present(a, b) == Ordering::Equal,
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn cross_type_order() {
        let mut vals = vec![json!("b"), json!(3), json!(null), json!(1.5), json!("a")];
        vals.sort_by(|a, b| cmp_values(Some(a), Some(b)));
        assert_eq!(vals, vec![json!(null), json!(1.5), json!(3), json!("a"), json!("b")]);
        assert_eq!(cmp_values(None, Some(&json!(null))), Ordering::Less);
    }

    #[test]
    fn numeric_equality_ignores_representation() {
        assert!(values_equal(&json!(120), &json!(120.0)));
        assert!(!values_equal(&json!(120), &json!("120")));
    }
}
