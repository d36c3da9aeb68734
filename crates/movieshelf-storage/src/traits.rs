use movieshelf_core::{Expr, FindOptions, Result, Stage};
use serde_json::Value;

/// Read-only document store the catalog runs against.
///
/// Every method is fallible; an `Err` is a store failure and never stands in
/// for an empty result.
#[async_trait::async_trait]
pub trait DocumentStore: Send + Sync + 'static {
    async fn find(&self, filter: &Expr, opts: &FindOptions) -> Result<Vec<Value>>;
    async fn aggregate(&self, pipeline: &[Stage]) -> Result<Vec<Value>>;
    async fn distinct(&self, field: &str, filter: &Expr) -> Result<Vec<Value>>;
    async fn count(&self, filter: &Expr) -> Result<u64>;

    // Startup health check
    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
