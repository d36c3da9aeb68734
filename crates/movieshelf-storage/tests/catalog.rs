use movieshelf_core::{CatalogError, ErrorKind, MovieLookup, QueryParams, RecentRequest, TmdbIds};
use movieshelf_storage::{Catalog, DocumentStore, InMemoryStore};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn params(pairs: &[(&str, &str)]) -> QueryParams {
    pairs.iter().copied().collect()
}

fn provider(id: i64, name: &str, priority: i64) -> Value {
    json!({
        "logo_path": format!("/{}.png", name.to_lowercase()),
        "provider_id": id,
        "provider_name": name,
        "display_priority": priority
    })
}

fn fixture() -> Vec<Value> {
    vec![
        json!({
            "Movie": "Iron Man", "TMDBId": 1726, "Ranking": 3, "Year": 2008,
            "Universe": "MCU", "Sub_Universe": "Avengers", "Genre": "Action", "Genre_2": "Sci-Fi",
            "Director": "Favreau", "Runtime": 126, "Studio": "Marvel", "ms_added": 300,
            "Provider": {"flatrate": [provider(337, "Disney Plus", 1)]}
        }),
        json!({
            "Movie": "Iron Man 2", "TMDBId": 10138, "Ranking": 1, "Year": 2010,
            "Universe": "MCU", "Sub_Universe": null, "Genre": "Action",
            "Director": "Favreau", "Runtime": 124, "Studio": "Marvel", "ms_added": 100,
            "Provider": {"flatrate": [provider(337, "Disney Plus", 1), provider(8, "Netflix", 0)]}
        }),
        json!({
            "Movie": "Chef", "TMDBId": 212778, "Ranking": 2, "Year": 2014,
            "Universe": "Standalone", "Genre": "Comedy", "Genre_2": "Action",
            "Director": "Favreau", "Runtime": 114, "Holiday": null, "ms_added": 500
        }),
        json!({
            "Movie": "Elf", "TMDBId": 10719, "Ranking": 5, "Year": 2003,
            "Genre": "Comedy", "Director": "Favreau", "Runtime": 97,
            "Holiday": "Christmas", "Exclusive": "Max", "ms_added": 200
        }),
        json!({
            "Movie": "Heat", "TMDBId": 949, "Ranking": 4, "Year": 1995,
            "Genre": "Crime", "Director": "Mann", "Runtime": 170, "ms_added": 400,
            "Provider": {"flatrate": []}
        }),
        json!({
            "Movie": "Collateral", "TMDBId": 1538, "Ranking": 6, "Year": 2004,
            "Genre": "Crime", "Genre_2": "Crime", "Director": "Mann", "Runtime": 120
        }),
    ]
}

fn catalog_over(docs: Vec<Value>) -> Catalog {
    Catalog::new(Arc::new(InMemoryStore::from_documents(docs)))
}

fn titles(records: &[movieshelf_core::MovieRecord]) -> Vec<&str> {
    records.iter().filter_map(|m| m.movie.as_deref()).collect()
}

#[tokio::test]
async fn empty_filter_returns_everything_by_rank() {
    let catalog = catalog_over(fixture());
    let all = catalog.list_movies(&QueryParams::new()).await.unwrap();
    assert_eq!(all.len(), 6);
    assert_eq!(
        titles(&all),
        vec!["Iron Man 2", "Chef", "Iron Man", "Heat", "Elf", "Collateral"]
    );
}

#[tokio::test]
async fn genre_filter_checks_both_genre_fields() {
    let catalog = catalog_over(fixture());
    let out = catalog.list_movies(&params(&[("genre", "Action")])).await.unwrap();
    assert_eq!(titles(&out), vec!["Iron Man 2", "Chef", "Iron Man"]);
}

#[tokio::test]
async fn universe_filter_checks_sub_universe_too() {
    let catalog = catalog_over(fixture());
    let out = catalog
        .list_movies(&params(&[("universe", "Avengers")]))
        .await
        .unwrap();
    assert_eq!(titles(&out), vec!["Iron Man"]);
}

#[tokio::test]
async fn filters_combine_with_and() {
    let catalog = catalog_over(fixture());
    let out = catalog
        .list_movies(&params(&[
            ("director", "Favreau"),
            ("decade", "2000-2009"),
            ("runtime", "130"),
            ("runtime", "97"),
        ]))
        .await
        .unwrap();
    // 97 itself is excluded
    assert_eq!(titles(&out), vec!["Iron Man"]);
}

#[tokio::test]
async fn provider_filter_matches_any_flatrate_entry() {
    let catalog = catalog_over(fixture());
    let out = catalog.list_movies(&params(&[("provider", "8")])).await.unwrap();
    assert_eq!(titles(&out), vec!["Iron Man 2"]);
}

/// Delegates to an in-memory store and counts every call that reaches it.
#[derive(Default)]
struct CountingStore {
    inner: InMemoryStore,
    calls: AtomicUsize,
}

impl CountingStore {
    fn hit(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl DocumentStore for CountingStore {
    async fn find(
        &self,
        filter: &movieshelf_core::Expr,
        opts: &movieshelf_core::FindOptions,
    ) -> movieshelf_core::Result<Vec<Value>> {
        self.hit();
        self.inner.find(filter, opts).await
    }
    async fn aggregate(&self, stages: &[movieshelf_core::Stage]) -> movieshelf_core::Result<Vec<Value>> {
        self.hit();
        self.inner.aggregate(stages).await
    }
    async fn distinct(
        &self,
        field: &str,
        filter: &movieshelf_core::Expr,
    ) -> movieshelf_core::Result<Vec<Value>> {
        self.hit();
        self.inner.distinct(field, filter).await
    }
    async fn count(&self, filter: &movieshelf_core::Expr) -> movieshelf_core::Result<u64> {
        self.hit();
        self.inner.count(filter).await
    }
}

#[tokio::test]
async fn invalid_parameters_never_reach_the_store() {
    let store = Arc::new(CountingStore::default());
    let catalog = Catalog::new(store.clone());
    for bad in [
        params(&[("runtime", "90")]),
        params(&[("decade", "1990-1999"), ("decade", "0-30000000")]),
        params(&[("year", "nineteen")]),
    ] {
        let err = catalog.list_movies(&bad).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }
    assert_eq!(store.calls.load(Ordering::SeqCst), 0);

    catalog.list_movies(&QueryParams::new()).await.unwrap();
    assert_eq!(store.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn get_movie_by_id_and_by_title_year() {
    let catalog = catalog_over(fixture());
    let heat = catalog.get_movie(&MovieLookup::TmdbId(949)).await.unwrap();
    assert_eq!(heat.movie.as_deref(), Some("Heat"));

    let lookup = MovieLookup::from_params(&params(&[("title", "Elf"), ("year", "2003")])).unwrap();
    let elf = catalog.get_movie(&lookup).await.unwrap();
    assert_eq!(elf.tmdb_id, Some(10719));
}

#[tokio::test]
async fn unmatched_id_is_not_found() {
    let catalog = catalog_over(fixture());
    let err = catalog.get_movie(&MovieLookup::TmdbId(1)).await.unwrap_err();
    assert!(matches!(err, CatalogError::NotFound));
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn title_only_lookup_is_a_validation_error() {
    let err = MovieLookup::from_params(&params(&[("title", "Heat")])).unwrap_err();
    assert_eq!(CatalogError::from(err).kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn movies_by_ids_returns_only_matches() {
    let catalog = catalog_over(fixture());
    let ids = TmdbIds::new([949, 1538, 42]).unwrap();
    let mut out = titles(&catalog.movies_by_ids(&ids).await.unwrap())
        .into_iter()
        .map(str::to_string)
        .collect::<Vec<_>>();
    out.sort();
    assert_eq!(out, vec!["Collateral", "Heat"]);
}

#[tokio::test]
async fn count_and_most_recent() {
    let catalog = catalog_over(fixture());
    assert_eq!(catalog.count().await.unwrap(), 6);

    let recent = catalog
        .most_recent(RecentRequest { count: 3 })
        .await
        .unwrap();
    assert_eq!(titles(&recent), vec!["Chef", "Heat", "Iron Man"]);

    let everything = catalog
        .most_recent(RecentRequest { count: 0 })
        .await
        .unwrap();
    assert_eq!(everything.len(), 6);
}

#[tokio::test]
async fn universe_facet_counts_children_and_sentinel() {
    let catalog = catalog_over(vec![
        json!({"Universe": "A", "Sub_Universe": null}),
        json!({"Universe": "A", "Sub_Universe": "X"}),
        json!({"Universe": "B"}),
    ]);
    let summary = catalog.facets().await.unwrap();
    let universes = serde_json::to_value(&summary.universes).unwrap();
    assert_eq!(
        universes,
        json!([
            {"fieldValue": "A", "totalCount": 2, "subUniverses": [{"fieldValue": "X", "totalCount": 1}], "noSubUniverseCount": 1},
            {"fieldValue": "B", "totalCount": 1, "subUniverses": [], "noSubUniverseCount": 1}
        ])
    );
}

#[tokio::test]
async fn director_facet_keeps_three_or_more() {
    let catalog = catalog_over(
        ["D1", "D1", "D1", "D2", "D2"]
            .iter()
            .map(|d| json!({"Director": d}))
            .collect(),
    );
    let summary = catalog.facets().await.unwrap();
    assert_eq!(summary.director.len(), 1);
    assert_eq!(summary.director[0].field_value.as_deref(), Some("D1"));
    assert_eq!(summary.director[0].total_count, 3);
}

#[tokio::test]
async fn genre_facet_merges_both_columns() {
    let summary = catalog_over(fixture()).facets().await.unwrap();
    let genres: Vec<(String, i64)> = summary
        .genre
        .iter()
        .map(|g| (g.field_value.clone().unwrap_or_default(), g.total_count))
        .collect();
    // Crime: twice as Genre plus once as Genre_2
    assert_eq!(
        genres,
        vec![
            ("Action".to_string(), 3),
            ("Crime".to_string(), 3),
            ("Comedy".to_string(), 2),
            ("Sci-Fi".to_string(), 1),
        ]
    );
}

#[tokio::test]
async fn genre_facet_unions_identical_column_counts_once() {
    // (Drama, 1) comes out of both columns and the union keeps one copy
    let summary = catalog_over(vec![
        json!({"Genre": "Drama", "Genre_2": "War"}),
        json!({"Genre": "War", "Genre_2": "Drama"}),
    ])
    .facets()
    .await
    .unwrap();
    let genres: Vec<_> = summary
        .genre
        .iter()
        .map(|g| (g.field_value.as_deref().unwrap_or(""), g.total_count))
        .collect();
    assert_eq!(genres, vec![("Drama", 1), ("War", 1)]);
}

#[tokio::test]
async fn provider_facet_orders_by_priority() {
    let summary = catalog_over(fixture()).facets().await.unwrap();
    let names: Vec<_> = summary
        .provider
        .iter()
        .filter_map(|p| p.provider_name.as_deref())
        .collect();
    assert_eq!(names, vec!["Netflix", "Disney Plus"]);
    assert_eq!(summary.provider[0].logo_path.as_deref(), Some("/netflix.png"));
}

#[tokio::test]
async fn distinct_facets_and_runtime_bounds() {
    let summary = catalog_over(fixture()).facets().await.unwrap();
    assert_eq!(
        summary.year,
        vec![json!(1995), json!(2003), json!(2004), json!(2008), json!(2010), json!(2014)]
    );
    assert_eq!(summary.holiday, vec![json!(null), json!("Christmas")]);
    assert_eq!(summary.studio, vec![json!("Marvel")]);
    let runtime = summary.runtime.unwrap();
    assert_eq!((runtime.min, runtime.max), (Some(97), Some(170)));
}

#[tokio::test]
async fn empty_collection_has_empty_facets() {
    let summary = catalog_over(vec![]).facets().await.unwrap();
    assert!(summary.universes.is_empty());
    assert!(summary.genre.is_empty());
    assert_eq!(summary.runtime, None);
}

#[tokio::test]
async fn concurrent_facet_calls_agree() {
    let catalog = catalog_over(fixture());
    let calls = (0..8).map(|_| {
        let c = catalog.clone();
        tokio::spawn(async move { c.facets().await.unwrap() })
    });
    let results = futures::future::join_all(calls).await;
    let first = results[0].as_ref().unwrap();
    for r in &results {
        assert_eq!(r.as_ref().unwrap(), first);
    }
}

struct FailingStore;

#[async_trait::async_trait]
impl DocumentStore for FailingStore {
    async fn find(
        &self,
        _: &movieshelf_core::Expr,
        _: &movieshelf_core::FindOptions,
    ) -> movieshelf_core::Result<Vec<Value>> {
        Err(CatalogError::upstream("connection reset"))
    }
    async fn aggregate(&self, _: &[movieshelf_core::Stage]) -> movieshelf_core::Result<Vec<Value>> {
        Ok(vec![])
    }
    async fn distinct(
        &self,
        field: &str,
        _: &movieshelf_core::Expr,
    ) -> movieshelf_core::Result<Vec<Value>> {
        if field == "Studio" {
            return Err(CatalogError::upstream("distinct failed"));
        }
        Ok(vec![])
    }
    async fn count(&self, _: &movieshelf_core::Expr) -> movieshelf_core::Result<u64> {
        Ok(0)
    }
}

#[tokio::test]
async fn store_failures_are_upstream_not_empty() {
    let catalog = Catalog::new(Arc::new(FailingStore));
    let err = catalog.list_movies(&QueryParams::new()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Upstream);
    let err = catalog.get_movie(&MovieLookup::TmdbId(1)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Upstream);
    // one failing sub-query fails the whole summary
    let err = catalog.facets().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Upstream);
}

#[tokio::test]
async fn undecodable_record_is_upstream() {
    let catalog = catalog_over(vec![json!({"Movie": "Bad", "Year": "nineteen", "Ranking": 1})]);
    let err = catalog.list_movies(&QueryParams::new()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Upstream);
}
