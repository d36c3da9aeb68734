//! MongoDB-backed [`DocumentStore`].

use crate::traits::DocumentStore;
use futures::TryStreamExt;
use movieshelf_core::pipeline::pipeline_to_mongo;
use movieshelf_core::{CatalogError, Expr, FindOptions, Result, Stage};
use mongodb::bson::{self, doc, Bson, Document};
use mongodb::{Client, Collection, Database};
use serde_json::Value;

#[derive(Clone)]
pub struct MongoStore {
    db: Database,
    collection: Collection<Document>,
}

impl MongoStore {
    pub async fn connect(uri: &str, db: &str, collection: &str) -> Result<Self> {
        let client = Client::with_uri_str(uri)
            .await
            .map_err(CatalogError::upstream)?;
        let db = client.database(db);
        let collection = db.collection::<Document>(collection);
        Ok(Self { db, collection })
    }
}

fn to_document(v: &Value) -> Result<Document> {
    bson::to_document(v).map_err(CatalogError::upstream)
}

fn to_json(doc: Document) -> Value {
    Bson::Document(doc).into_relaxed_extjson()
}

#[async_trait::async_trait]
impl DocumentStore for MongoStore {
    async fn find(&self, filter: &Expr, opts: &FindOptions) -> Result<Vec<Value>> {
        let mut options = mongodb::options::FindOptions::default();
        options.sort = opts.sort_document().as_ref().map(to_document).transpose()?;
        // the driver also treats 0 as no limit
        options.limit = opts.limit.map(|l| l as i64);
        let cursor = self
            .collection
            .find(to_document(&filter.to_mongo())?, options)
            .await
            .map_err(CatalogError::upstream)?;
        let docs: Vec<Document> = cursor.try_collect().await.map_err(CatalogError::upstream)?;
        Ok(docs.into_iter().map(to_json).collect())
    }

    async fn aggregate(&self, pipeline: &[Stage]) -> Result<Vec<Value>> {
        let stages = pipeline_to_mongo(pipeline)
            .iter()
            .map(to_document)
            .collect::<Result<Vec<_>>>()?;
        let cursor = self
            .collection
            .aggregate(stages, None)
            .await
            .map_err(CatalogError::upstream)?;
        let docs: Vec<Document> = cursor.try_collect().await.map_err(CatalogError::upstream)?;
        Ok(docs.into_iter().map(to_json).collect())
    }

    async fn distinct(&self, field: &str, filter: &Expr) -> Result<Vec<Value>> {
        let values = self
            .collection
            .distinct(field, to_document(&filter.to_mongo())?, None)
            .await
            .map_err(CatalogError::upstream)?;
        Ok(values.into_iter().map(Bson::into_relaxed_extjson).collect())
    }

    async fn count(&self, filter: &Expr) -> Result<u64> {
        self.collection
            .count_documents(to_document(&filter.to_mongo())?, None)
            .await
            .map_err(CatalogError::upstream)
    }

    async fn ping(&self) -> Result<()> {
        self.db
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map(|_| ())
            .map_err(CatalogError::upstream)
    }
}
