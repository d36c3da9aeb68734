use crate::aggregate::run_pipeline;
use crate::eval::{matches, sort_documents, values_at};
use crate::traits::DocumentStore;
use movieshelf_core::util::{cmp_values, values_equal};
use movieshelf_core::{Expr, FindOptions, Result, Stage};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use prometheus::{register_histogram_vec, HistogramVec};
use serde_json::Value;
use std::sync::Arc;

static MEM_SCAN_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "movieshelf_mem_scan_seconds",
        "In-memory collection scan latency",
        &["op"]
    )
    .unwrap()
});

/// A single collection held in memory and scanned on every call.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<RwLock<Vec<Value>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_documents(docs: Vec<Value>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(docs)),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    // Clone the matching documents out so the lock is not held across
    // sorting or pipeline stages.
    fn select(&self, filter: &Expr) -> Vec<Value> {
        self.inner
            .read()
            .iter()
            .filter(|d| matches(filter, d))
            .cloned()
            .collect()
    }
}

#[async_trait::async_trait]
impl DocumentStore for InMemoryStore {
    async fn find(&self, filter: &Expr, opts: &FindOptions) -> Result<Vec<Value>> {
        let _timer = MEM_SCAN_SECONDS.with_label_values(&["find"]).start_timer();
        let mut out = self.select(filter);
        sort_documents(&mut out, &opts.sort);
        // limit 0 means no limit
        if let Some(limit) = opts.limit.filter(|l| *l > 0) {
            out.truncate(limit as usize);
        }
        Ok(out)
    }

    async fn aggregate(&self, pipeline: &[Stage]) -> Result<Vec<Value>> {
        let _timer = MEM_SCAN_SECONDS
            .with_label_values(&["aggregate"])
            .start_timer();
        let docs = self.inner.read().clone();
        run_pipeline(docs, pipeline)
    }

    async fn distinct(&self, field: &str, filter: &Expr) -> Result<Vec<Value>> {
        let _timer = MEM_SCAN_SECONDS
            .with_label_values(&["distinct"])
            .start_timer();
        let inner = self.inner.read();
        let mut out: Vec<Value> = Vec::new();
        for doc in inner.iter().filter(|d| matches(filter, d)) {
            for v in values_at(doc, field, false) {
                if !out.iter().any(|seen| values_equal(seen, v)) {
                    out.push(v.clone());
                }
            }
        }
        out.sort_by(|a, b| cmp_values(Some(a), Some(b)));
        Ok(out)
    }

    async fn count(&self, filter: &Expr) -> Result<u64> {
        let inner = self.inner.read();
        Ok(inner.iter().filter(|d| matches(filter, d)).count() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use movieshelf_core::SortOrder;
    use serde_json::json;

    fn store() -> InMemoryStore {
        InMemoryStore::from_documents(vec![
            json!({"Movie": "B", "Ranking": 2, "Year": 1999, "Tags": ["x", "y"]}),
            json!({"Movie": "A", "Ranking": 1, "Year": 2001, "Tags": ["y"]}),
            json!({"Movie": "C", "Ranking": 3, "Year": null}),
            json!({"Movie": "D", "Ranking": 4}),
        ])
    }

    #[tokio::test]
    async fn find_sorts_and_limits() {
        let s = store();
        let opts = FindOptions::sorted_by("Ranking", SortOrder::Asc).with_limit(2);
        let out = s.find(&Expr::All, &opts).await.unwrap();
        let names: Vec<_> = out.iter().map(|d| d["Movie"].clone()).collect();
        assert_eq!(names, vec![json!("A"), json!("B")]);

        let unlimited = FindOptions::default().with_limit(0);
        assert_eq!(s.find(&Expr::All, &unlimited).await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn distinct_flattens_arrays_and_skips_missing() {
        let s = store();
        let years = s.distinct("Year", &Expr::All).await.unwrap();
        assert_eq!(years, vec![json!(null), json!(1999), json!(2001)]);
        let tags = s.distinct("Tags", &Expr::All).await.unwrap();
        assert_eq!(tags, vec![json!("x"), json!("y")]);
    }

    #[tokio::test]
    async fn count_applies_filter() {
        let s = store();
        assert_eq!(s.count(&Expr::All).await.unwrap(), 4);
        assert_eq!(s.count(&Expr::is_in("Year", [1999, 2001])).await.unwrap(), 2);
        assert_eq!(s.count(&Expr::eq("Year", 2001)).await.unwrap(), 1);
        assert_eq!(s.len(), 4);
        assert!(InMemoryStore::new().is_empty());
    }
}
