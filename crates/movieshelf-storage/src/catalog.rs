//! Catalog operations over any [`DocumentStore`].

use crate::traits::DocumentStore;
use movieshelf_core::facets::{
    director_pipeline, genre_pipeline, provider_pipeline, runtime_pipeline, universe_pipeline,
};
use movieshelf_core::{
    fields, CatalogError, Expr, FacetSummary, FilterInput, FindOptions, MovieLookup, MovieRecord,
    QueryParams, RawFacets, RecentRequest, Result, SortOrder, TmdbIds,
};
use serde_json::Value;
use std::sync::Arc;

#[derive(Clone)]
pub struct Catalog {
    store: Arc<dyn DocumentStore>,
}

fn decode_all(docs: Vec<Value>) -> Result<Vec<MovieRecord>> {
    docs.into_iter().map(MovieRecord::from_document).collect()
}

impl Catalog {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn ping(&self) -> Result<()> {
        self.store.ping().await
    }

    /// Validate raw listing parameters, then run the listing.
    pub async fn list_movies(&self, params: &QueryParams) -> Result<Vec<MovieRecord>> {
        let input = FilterInput::from_params(params)?;
        self.list_filtered(&input).await
    }

    /// Movies matching every populated filter, by curation rank.
    pub async fn list_filtered(&self, input: &FilterInput) -> Result<Vec<MovieRecord>> {
        let filter = input.to_expr();
        tracing::debug!(filter = %filter.to_mongo(), "listing movies");
        let opts = FindOptions::sorted_by(fields::RANKING, SortOrder::Asc);
        decode_all(self.store.find(&filter, &opts).await?)
    }

    pub async fn get_movie(&self, lookup: &MovieLookup) -> Result<MovieRecord> {
        let opts = FindOptions::default().with_limit(1);
        let doc = self
            .store
            .find(&lookup.to_expr(), &opts)
            .await?
            .into_iter()
            .next()
            .ok_or(CatalogError::NotFound)?;
        MovieRecord::from_document(doc)
    }

    pub async fn movies_by_ids(&self, ids: &TmdbIds) -> Result<Vec<MovieRecord>> {
        decode_all(
            self.store
                .find(&ids.to_expr(), &FindOptions::default())
                .await?,
        )
    }

    /// Runs every facet query concurrently; the first failure aborts the rest.
    pub async fn facets(&self) -> Result<FacetSummary> {
        let store = self.store.as_ref();
        let (universe, genre, provider, director, runtime) = (
            universe_pipeline(),
            genre_pipeline(),
            provider_pipeline(),
            director_pipeline(),
            runtime_pipeline(),
        );
        let (universes, genre, provider, director, runtime, year, exclusive, holiday, studio) =
            tokio::try_join!(
                store.aggregate(&universe),
                store.aggregate(&genre),
                store.aggregate(&provider),
                store.aggregate(&director),
                store.aggregate(&runtime),
                store.distinct(fields::YEAR, &Expr::All),
                store.distinct(fields::EXCLUSIVE, &Expr::All),
                store.distinct(fields::HOLIDAY, &Expr::All),
                store.distinct(fields::STUDIO, &Expr::All),
            )?;
        FacetSummary::assemble(RawFacets {
            provider,
            genre,
            year,
            exclusive,
            holiday,
            studio,
            director,
            universes,
            runtime,
        })
    }

    pub async fn count(&self) -> Result<u64> {
        self.store.count(&Expr::All).await
    }

    pub async fn most_recent(&self, req: RecentRequest) -> Result<Vec<MovieRecord>> {
        decode_all(self.store.find(&Expr::All, &req.find_options()).await?)
    }
}
