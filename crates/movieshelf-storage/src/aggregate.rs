//! In-memory aggregation pipeline engine.
//!
//! Runs [`Stage`] lists over JSON documents the way the database would for
//! the operators the catalog uses. Expression results use `None` for a
//! missing value so that missing and `null` stay distinguishable.

use crate::eval::{get_path, matches, resolve, set_path, sort_documents};
use movieshelf_core::util::{cmp_values, values_equal};
use movieshelf_core::{Accumulator, AggExpr, CatalogError, Projection, Result, Stage};
use serde_json::{Map, Number, Value};
use std::cmp::Ordering;
use std::collections::HashMap;

type Vars = HashMap<String, Value>;

pub fn run_pipeline(docs: Vec<Value>, stages: &[Stage]) -> Result<Vec<Value>> {
    stages.iter().try_fold(docs, |docs, stage| run_stage(docs, stage))
}

fn run_stage(docs: Vec<Value>, stage: &Stage) -> Result<Vec<Value>> {
    match stage {
        Stage::Match(expr) => Ok(docs.into_iter().filter(|d| matches(expr, d)).collect()),
        Stage::Group { id, fields } => group(docs, id, fields),
        Stage::Unwind(path) => Ok(unwind(docs, path)),
        Stage::Project(fields) => docs.iter().map(|d| project(d, fields)).collect(),
        Stage::Sort(keys) => {
            let mut docs = docs;
            sort_documents(&mut docs, keys);
            Ok(docs)
        }
        Stage::Facet(branches) => {
            let mut out = Map::new();
            for (name, stages) in branches {
                let rows = run_pipeline(docs.clone(), stages)?;
                out.insert(name.clone(), Value::Array(rows));
            }
            Ok(vec![Value::Object(out)])
        }
        Stage::Limit(0) => Err(CatalogError::upstream("the limit must be positive")),
        Stage::Limit(n) => Ok(docs.into_iter().take(*n as usize).collect()),
    }
}

pub(crate) fn eval(expr: &AggExpr, doc: &Value, vars: &Vars) -> Option<Value> {
    match expr {
        AggExpr::Field(path) => resolve(doc, path),
        AggExpr::Var(path) => {
            let (name, rest) = match path.split_once('.') {
                Some((n, r)) => (n, Some(r)),
                None => (path.as_str(), None),
            };
            let bound = vars.get(name)?;
            match rest {
                None => Some(bound.clone()),
                Some(r) => resolve(bound, r),
            }
        }
        AggExpr::Literal(v) => Some(v.clone()),
        AggExpr::IfNull(value, replacement) => match eval(value, doc, vars) {
            None | Some(Value::Null) => eval(replacement, doc, vars),
            found => found,
        },
        AggExpr::Eq(a, b) => Some(Value::Bool(same(a, b, doc, vars))),
        AggExpr::Ne(a, b) => Some(Value::Bool(!same(a, b, doc, vars))),
        AggExpr::Cond {
            test,
            then,
            otherwise,
        } => {
            if truthy(eval(test, doc, vars).as_ref()) {
                eval(then, doc, vars)
            } else {
                eval(otherwise, doc, vars)
            }
        }
        AggExpr::Filter { input, var, cond } => {
            // non-array input yields null
            let Some(items) = array_input(input, doc, vars) else {
                return Some(Value::Null);
            };
            let mut scope = vars.clone();
            let kept = items
                .into_iter()
                .filter(|item| {
                    scope.insert(var.clone(), item.clone());
                    truthy(eval(cond, doc, &scope).as_ref())
                })
                .collect();
            Some(Value::Array(kept))
        }
        AggExpr::Map { input, var, apply } => {
            // non-array input yields null
            let Some(items) = array_input(input, doc, vars) else {
                return Some(Value::Null);
            };
            let mut scope = vars.clone();
            let mapped = items
                .into_iter()
                .map(|item| {
                    scope.insert(var.clone(), item);
                    eval(apply, doc, &scope).unwrap_or(Value::Null)
                })
                .collect();
            Some(Value::Array(mapped))
        }
        AggExpr::Sum(input) => {
            let mut total = NumSum::default();
            match eval(input, doc, vars) {
                Some(Value::Array(items)) => items.iter().for_each(|v| total.add(v)),
                Some(v) => total.add(&v),
                None => {}
            }
            Some(total.into_value())
        }
        AggExpr::SetUnion(inputs) => {
            let mut out: Vec<Value> = Vec::new();
            for input in inputs {
                match eval(input, doc, vars) {
                    Some(Value::Array(items)) => {
                        for item in items {
                            if !out.iter().any(|seen| values_equal(seen, &item)) {
                                out.push(item);
                            }
                        }
                    }
                    None | Some(Value::Null) => return Some(Value::Null),
                    Some(_) => return None,
                }
            }
            Some(Value::Array(out))
        }
        AggExpr::Doc(entries) => {
            let mut m = Map::new();
            for (k, e) in entries {
                if let Some(v) = eval(e, doc, vars) {
                    m.insert(k.clone(), v);
                }
            }
            Some(Value::Object(m))
        }
    }
}

fn same(a: &AggExpr, b: &AggExpr, doc: &Value, vars: &Vars) -> bool {
    let (a, b) = (eval(a, doc, vars), eval(b, doc, vars));
    cmp_values(a.as_ref(), b.as_ref()) == Ordering::Equal
}

fn array_input(input: &AggExpr, doc: &Value, vars: &Vars) -> Option<Vec<Value>> {
    match eval(input, doc, vars) {
        Some(Value::Array(items)) => Some(items),
        _ => None,
    }
}

fn truthy(v: Option<&Value>) -> bool {
    match v {
        None | Some(Value::Null) | Some(Value::Bool(false)) => false,
        Some(Value::Number(n)) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Some(_) => true,
    }
}

/// Running sum that stays integral until a float shows up.
#[derive(Default)]
struct NumSum {
    int: i64,
    float: f64,
    is_float: bool,
}

impl NumSum {
    fn add(&mut self, v: &Value) {
        let Value::Number(n) = v else { return };
        match n.as_i64() {
            Some(i) if !self.is_float => self.int += i,
            _ => {
                if !self.is_float {
                    self.is_float = true;
                    self.float = self.int as f64;
                }
                self.float += n.as_f64().unwrap_or(0.0);
            }
        }
    }

    fn into_value(self) -> Value {
        if self.is_float {
            Number::from_f64(self.float)
                .map(Value::Number)
                .unwrap_or(Value::Null)
        } else {
            Value::from(self.int)
        }
    }
}

enum AccState {
    Sum(NumSum),
    Push(Vec<Value>),
    First(Option<Value>),
    Min(Option<Value>),
    Max(Option<Value>),
}

impl AccState {
    fn new(acc: &Accumulator) -> Self {
        match acc {
            Accumulator::Sum(_) => AccState::Sum(NumSum::default()),
            Accumulator::Push(_) => AccState::Push(Vec::new()),
            Accumulator::First(_) => AccState::First(None),
            Accumulator::Min(_) => AccState::Min(None),
            Accumulator::Max(_) => AccState::Max(None),
        }
    }

    fn feed(&mut self, acc: &Accumulator, doc: &Value) {
        let vars = Vars::new();
        match (self, acc) {
            (AccState::Sum(total), Accumulator::Sum(e)) => {
                // arrays are not summed by the accumulator form
                if let Some(v @ Value::Number(_)) = eval(e, doc, &vars) {
                    total.add(&v);
                }
            }
            (AccState::Push(items), Accumulator::Push(e)) => {
                if let Some(v) = eval(e, doc, &vars) {
                    items.push(v);
                }
            }
            (AccState::First(slot), Accumulator::First(e)) => {
                if slot.is_none() {
                    *slot = Some(eval(e, doc, &vars).unwrap_or(Value::Null));
                }
            }
            (AccState::Min(slot), Accumulator::Min(e)) => {
                keep_extreme(slot, eval(e, doc, &vars), Ordering::Less)
            }
            (AccState::Max(slot), Accumulator::Max(e)) => {
                keep_extreme(slot, eval(e, doc, &vars), Ordering::Greater)
            }
            _ => {}
        }
    }

    fn finish(self) -> Value {
        match self {
            AccState::Sum(total) => total.into_value(),
            AccState::Push(items) => Value::Array(items),
            AccState::First(v) | AccState::Min(v) | AccState::Max(v) => v.unwrap_or(Value::Null),
        }
    }
}

// $min/$max skip null and missing values.
fn keep_extreme(slot: &mut Option<Value>, candidate: Option<Value>, wanted: Ordering) {
    let Some(candidate) = candidate.filter(|v| !v.is_null()) else {
        return;
    };
    let replace = match slot {
        None => true,
        Some(cur) => cmp_values(Some(&candidate), Some(cur)) == wanted,
    };
    if replace {
        *slot = Some(candidate);
    }
}

/// Groups keep first-seen order.
fn group(docs: Vec<Value>, id: &AggExpr, fields: &[(String, Accumulator)]) -> Result<Vec<Value>> {
    let vars = Vars::new();
    let mut groups: Vec<(Value, Vec<AccState>)> = Vec::new();
    for doc in &docs {
        let key = eval(id, doc, &vars).unwrap_or(Value::Null);
        let idx = match groups
            .iter()
            .position(|(k, _)| cmp_values(Some(k), Some(&key)) == Ordering::Equal)
        {
            Some(i) => i,
            None => {
                let states = fields.iter().map(|(_, acc)| AccState::new(acc)).collect();
                groups.push((key, states));
                groups.len() - 1
            }
        };
        for (state, (_, acc)) in groups[idx].1.iter_mut().zip(fields) {
            state.feed(acc, doc);
        }
    }
    Ok(groups
        .into_iter()
        .map(|(key, states)| {
            let mut out = Map::new();
            out.insert("_id".to_string(), key);
            for (state, (name, _)) in states.into_iter().zip(fields) {
                out.insert(name.clone(), state.finish());
            }
            Value::Object(out)
        })
        .collect())
}

/// Missing, null and empty arrays produce no output documents; a scalar is
/// passed through as a one-element array would be.
fn unwind(docs: Vec<Value>, path: &str) -> Vec<Value> {
    let mut out = Vec::new();
    for doc in docs {
        match get_path(&doc, path) {
            None | Some(Value::Null) => {}
            Some(Value::Array(items)) => {
                for item in items.clone() {
                    let mut copy = doc.clone();
                    set_path(&mut copy, path, item);
                    out.push(copy);
                }
            }
            Some(_) => out.push(doc),
        }
    }
    out
}

fn project(doc: &Value, fields: &[(String, Projection)]) -> Result<Value> {
    let inclusion = fields
        .iter()
        .any(|(_, p)| !matches!(p, Projection::Exclude));
    let vars = Vars::new();

    if !inclusion {
        let mut out = doc.clone();
        for (name, _) in fields {
            remove_path(&mut out, name);
        }
        return Ok(out);
    }

    let mut out = Value::Object(Map::new());
    let keep_id = !fields
        .iter()
        .any(|(name, p)| name == "_id" && matches!(p, Projection::Exclude));
    if keep_id {
        if let Some(id) = get_path(doc, "_id") {
            set_path(&mut out, "_id", id.clone());
        }
    }
    for (name, p) in fields {
        match p {
            Projection::Include => {
                if let Some(v) = get_path(doc, name) {
                    set_path(&mut out, name, v.clone());
                }
            }
            Projection::Exclude if name == "_id" => {}
            Projection::Exclude => {
                return Err(CatalogError::upstream(format!(
                    "cannot exclude {name} in an inclusion projection"
                )))
            }
            Projection::Compute(e) => {
                if let Some(v) = eval(e, doc, &vars) {
                    set_path(&mut out, name, v);
                }
            }
        }
    }
    Ok(out)
}

fn remove_path(doc: &mut Value, path: &str) {
    match path.rsplit_once('.') {
        None => {
            if let Value::Object(m) = doc {
                m.shift_remove(path);
            }
        }
        Some((parent, leaf)) => {
            let mut cur = Some(doc);
            for key in parent.split('.') {
                cur = cur.and_then(|v| v.as_object_mut()).and_then(|m| m.get_mut(key));
            }
            if let Some(Value::Object(m)) = cur {
                m.shift_remove(leaf);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use movieshelf_core::{Expr, SortOrder};
    use serde_json::json;

    #[test]
    fn group_counts_and_treats_missing_key_as_null() {
        let docs = vec![json!({"d": "A"}), json!({"d": "A"}), json!({}), json!({"d": null})];
        let out = run_pipeline(
            docs,
            &[Stage::group(AggExpr::field("d"), [("n", Accumulator::count())])],
        )
        .unwrap();
        assert_eq!(out, vec![json!({"_id": "A", "n": 2}), json!({"_id": null, "n": 2})]);
    }

    #[test]
    fn sum_accumulator_ignores_non_numbers() {
        let docs = vec![json!({"v": 2}), json!({"v": "x"}), json!({"v": 1.5}), json!({})];
        let out = run_pipeline(
            docs,
            &[Stage::group(
                AggExpr::lit(Value::Null),
                [("t", Accumulator::Sum(AggExpr::field("v")))],
            )],
        )
        .unwrap();
        assert_eq!(out[0]["t"], json!(3.5));
    }

    #[test]
    fn min_max_skip_nulls() {
        let docs = vec![json!({"r": 120}), json!({"r": null}), json!({}), json!({"r": 88})];
        let out = run_pipeline(
            docs,
            &[Stage::group(
                AggExpr::lit(Value::Null),
                [
                    ("max", Accumulator::Max(AggExpr::field("r"))),
                    ("min", Accumulator::Min(AggExpr::field("r"))),
                ],
            )],
        )
        .unwrap();
        assert_eq!(out, vec![json!({"_id": null, "max": 120, "min": 88})]);
    }

    #[test]
    fn unwind_drops_missing_null_and_empty() {
        let docs = vec![
            json!({"n": 1, "a": {"xs": [1, 2]}}),
            json!({"n": 2, "a": {"xs": []}}),
            json!({"n": 3, "a": {"xs": null}}),
            json!({"n": 4}),
            json!({"n": 5, "a": {"xs": 9}}),
        ];
        let out = run_pipeline(docs, &[Stage::unwind("a.xs")]).unwrap();
        let seen: Vec<_> = out.iter().map(|d| (d["n"].clone(), d["a"]["xs"].clone())).collect();
        assert_eq!(
            seen,
            vec![(json!(1), json!(1)), (json!(1), json!(2)), (json!(5), json!(9))]
        );
    }

    #[test]
    fn projection_modes() {
        let doc = json!({"_id": 7, "a": 1, "b": 2});
        let inc = project(
            &doc,
            &[
                ("a".into(), Projection::Include),
                ("c".into(), Projection::Compute(AggExpr::field("b"))),
                ("gone".into(), Projection::Compute(AggExpr::field("nope"))),
            ],
        )
        .unwrap();
        assert_eq!(inc, json!({"_id": 7, "a": 1, "c": 2}));

        let exc = project(&doc, &[("_id".into(), Projection::Exclude)]).unwrap();
        assert_eq!(exc, json!({"a": 1, "b": 2}));

        let mixed = project(
            &doc,
            &[("a".into(), Projection::Include), ("b".into(), Projection::Exclude)],
        );
        assert!(mixed.is_err());
    }

    #[test]
    fn filter_map_and_set_union() {
        let doc = json!({
            "xs": [{"k": "a", "n": 1}, {"k": "skip", "n": 5}],
            "l": [{"v": 1}], "r": [{"v": 1}, {"v": 2}]
        });
        let vars = Vars::new();
        let kept = eval(
            &AggExpr::filter(
                AggExpr::field("xs"),
                "x",
                AggExpr::ne(AggExpr::var("x.k"), AggExpr::lit("skip")),
            ),
            &doc,
            &vars,
        );
        assert_eq!(kept, Some(json!([{"k": "a", "n": 1}])));

        let skipped = eval(
            &AggExpr::sum(AggExpr::map(
                AggExpr::field("xs"),
                "x",
                AggExpr::cond(
                    AggExpr::eq(AggExpr::var("x.k"), AggExpr::lit("skip")),
                    AggExpr::var("x.n"),
                    AggExpr::lit(0),
                ),
            )),
            &doc,
            &vars,
        );
        assert_eq!(skipped, Some(json!(5)));

        let union = eval(
            &AggExpr::SetUnion(vec![AggExpr::field("l"), AggExpr::field("r")]),
            &doc,
            &vars,
        );
        assert_eq!(union, Some(json!([{"v": 1}, {"v": 2}])));
    }

    #[test]
    fn facet_runs_each_branch_on_the_same_input() {
        let docs = vec![json!({"n": 3}), json!({"n": 1}), json!({"n": 2})];
        let out = run_pipeline(
            docs,
            &[Stage::Facet(vec![
                ("top".into(), vec![Stage::sort([("n", SortOrder::Desc)]), Stage::Limit(1)]),
                ("small".into(), vec![Stage::Match(Expr::cmp("n", movieshelf_core::CmpOp::Lt, 3))]),
            ])],
        )
        .unwrap();
        assert_eq!(out, vec![json!({"top": [{"n": 3}], "small": [{"n": 1}, {"n": 2}]})]);
    }
}
