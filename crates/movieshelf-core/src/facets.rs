//! Facet summaries used to populate the front-end filter controls.
//!
//! The pipelines here are fixed; the storage layer runs them (concurrently)
//! and hands the raw rows back to [`FacetSummary::assemble`].

use crate::expr::{CmpOp, Expr};
use crate::model::{fields, ProviderInfo};
use crate::pipeline::{Accumulator, AggExpr, Projection, Stage};
use crate::query::SortOrder;
use crate::util::cmp_values;
use crate::{CatalogError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Stands in for a missing sub-universe while grouping.
pub const NO_SUB_UNIVERSE: &str = "__NO_SUB_UNIVERSE__";

/// Directors credited on fewer movies than this are left out of the facet.
pub const MIN_DIRECTOR_COUNT: i64 = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacetCount {
    pub field_value: Option<String>,
    pub total_count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UniverseFacet {
    pub field_value: Option<String>,
    pub total_count: i64,
    #[serde(default)]
    pub sub_universes: Vec<FacetCount>,
    #[serde(default)]
    pub no_sub_universe_count: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeBounds {
    pub min: Option<i64>,
    pub max: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacetSummary {
    pub provider: Vec<ProviderInfo>,
    pub genre: Vec<FacetCount>,
    pub year: Vec<Value>,
    pub exclusive: Vec<Value>,
    pub holiday: Vec<Value>,
    pub studio: Vec<Value>,
    pub director: Vec<FacetCount>,
    pub universes: Vec<UniverseFacet>,
    pub runtime: Option<RuntimeBounds>,
}

/// Rows returned by each facet query, before decoding.
#[derive(Debug, Clone, Default)]
pub struct RawFacets {
    pub provider: Vec<Value>,
    pub genre: Vec<Value>,
    pub year: Vec<Value>,
    pub exclusive: Vec<Value>,
    pub holiday: Vec<Value>,
    pub studio: Vec<Value>,
    pub director: Vec<Value>,
    pub universes: Vec<Value>,
    pub runtime: Vec<Value>,
}

/// Universe counts with their sub-universes. Films without a sub-universe
/// are grouped under [`NO_SUB_UNIVERSE`], reported as `noSubUniverseCount`
/// and dropped from the child list.
pub fn universe_pipeline() -> Vec<Stage> {
    let sentinel = || AggExpr::lit(NO_SUB_UNIVERSE);
    vec![
        Stage::group(
            AggExpr::doc([
                ("Universe", AggExpr::field(fields::UNIVERSE)),
                (
                    "Sub_Universe",
                    AggExpr::if_null(AggExpr::field(fields::SUB_UNIVERSE), sentinel()),
                ),
            ]),
            [("subUniverseCount", Accumulator::count())],
        ),
        Stage::group(
            AggExpr::field("_id.Universe"),
            [
                (
                    "totalCount",
                    Accumulator::Sum(AggExpr::field("subUniverseCount")),
                ),
                (
                    "subUniverses",
                    Accumulator::Push(AggExpr::doc([
                        ("fieldValue", AggExpr::field("_id.Sub_Universe")),
                        ("totalCount", AggExpr::field("subUniverseCount")),
                    ])),
                ),
            ],
        ),
        Stage::project([
            ("_id", Projection::Exclude),
            ("fieldValue", Projection::Compute(AggExpr::field("_id"))),
            ("totalCount", Projection::Include),
            (
                "subUniverses",
                Projection::Compute(AggExpr::filter(
                    AggExpr::field("subUniverses"),
                    "subUniverse",
                    AggExpr::ne(AggExpr::var("subUniverse.fieldValue"), sentinel()),
                )),
            ),
            (
                "noSubUniverseCount",
                Projection::Compute(AggExpr::sum(AggExpr::map(
                    AggExpr::field("subUniverses"),
                    "subUniverse",
                    AggExpr::cond(
                        AggExpr::eq(AggExpr::var("subUniverse.fieldValue"), sentinel()),
                        AggExpr::var("subUniverse.totalCount"),
                        AggExpr::lit(0),
                    ),
                ))),
            ),
        ]),
        Stage::sort([("fieldValue", SortOrder::Asc)]),
    ]
}

/// Both genre columns counted as one distribution. The two per-column
/// groupings are merged with a set union before being summed.
pub fn genre_pipeline() -> Vec<Stage> {
    let count_by = |field: &str| {
        vec![Stage::group(
            AggExpr::field(field),
            [("totalCount", Accumulator::count())],
        )]
    };
    vec![
        Stage::project([
            (fields::GENRE, Projection::Compute(AggExpr::field(fields::GENRE))),
            (
                fields::GENRE_2,
                Projection::Compute(AggExpr::field(fields::GENRE_2)),
            ),
        ]),
        Stage::Facet(vec![
            ("genre1".to_string(), count_by(fields::GENRE)),
            ("genre2".to_string(), count_by(fields::GENRE_2)),
        ]),
        Stage::project([(
            "allGenres",
            Projection::Compute(AggExpr::SetUnion(vec![
                AggExpr::field("genre1"),
                AggExpr::field("genre2"),
            ])),
        )]),
        Stage::unwind("allGenres"),
        Stage::group(
            AggExpr::field("allGenres._id"),
            [(
                "totalCount",
                Accumulator::Sum(AggExpr::field("allGenres.totalCount")),
            )],
        ),
        Stage::Match(Expr::cmp("_id", CmpOp::Ne, Value::Null)),
        Stage::project([
            ("fieldValue", Projection::Compute(AggExpr::field("_id"))),
            ("_id", Projection::Exclude),
            ("totalCount", Projection::Include),
        ]),
        Stage::sort([
            ("totalCount", SortOrder::Desc),
            ("fieldValue", SortOrder::Asc),
        ]),
    ]
}

/// Streaming providers, first-seen metadata per provider id.
pub fn provider_pipeline() -> Vec<Stage> {
    let first = |leaf: &str| Accumulator::First(AggExpr::Field(format!("{}.{leaf}", fields::FLATRATE)));
    vec![
        Stage::unwind(fields::FLATRATE),
        Stage::group(
            AggExpr::field(fields::FLATRATE_PROVIDER_ID),
            [
                ("logo_path", first("logo_path")),
                ("provider_id", first("provider_id")),
                ("provider_name", first("provider_name")),
                ("display_priority", first("display_priority")),
            ],
        ),
        Stage::sort([
            ("display_priority", SortOrder::Asc),
            ("provider_id", SortOrder::Asc),
        ]),
        Stage::project([
            ("_id", Projection::Exclude),
            ("logo_path", Projection::Include),
            ("provider_id", Projection::Include),
            ("provider_name", Projection::Include),
            ("display_priority", Projection::Include),
        ]),
    ]
}

pub fn director_pipeline() -> Vec<Stage> {
    vec![
        Stage::group(
            AggExpr::field(fields::DIRECTOR),
            [("totalCount", Accumulator::count())],
        ),
        Stage::Match(Expr::cmp("totalCount", CmpOp::Gte, MIN_DIRECTOR_COUNT)),
        Stage::sort([("totalCount", SortOrder::Desc), ("_id", SortOrder::Asc)]),
        Stage::project([
            ("fieldValue", Projection::Compute(AggExpr::field("_id"))),
            ("totalCount", Projection::Include),
            ("_id", Projection::Exclude),
        ]),
    ]
}

pub fn runtime_pipeline() -> Vec<Stage> {
    vec![Stage::group(
        AggExpr::lit(Value::Null),
        [
            ("max", Accumulator::Max(AggExpr::field(fields::RUNTIME))),
            ("min", Accumulator::Min(AggExpr::field(fields::RUNTIME))),
        ],
    )]
}

fn decode_rows<T: DeserializeOwned>(facet: &str, rows: Vec<Value>) -> Result<Vec<T>> {
    rows.into_iter()
        .map(|row| {
            serde_json::from_value(row).map_err(|e| {
                CatalogError::Upstream(format!("failed to decode {facet} facet: {e}"))
            })
        })
        .collect()
}

fn sort_counts(counts: &mut [FacetCount]) {
    counts.sort_by(|a, b| {
        b.total_count
            .cmp(&a.total_count)
            .then_with(|| a.field_value.cmp(&b.field_value))
    });
}

fn sort_distinct(mut values: Vec<Value>) -> Vec<Value> {
    values.sort_by(|a, b| cmp_values(Some(a), Some(b)));
    values
}

impl FacetSummary {
    /// Decode every facet and put each list in a deterministic order.
    pub fn assemble(raw: RawFacets) -> Result<Self> {
        let mut provider: Vec<ProviderInfo> = decode_rows("provider", raw.provider)?;
        provider.sort_by(|a, b| {
            a.display_priority
                .cmp(&b.display_priority)
                .then_with(|| a.provider_id.cmp(&b.provider_id))
        });

        let mut genre: Vec<FacetCount> = decode_rows("genre", raw.genre)?;
        sort_counts(&mut genre);
        let mut director: Vec<FacetCount> = decode_rows("director", raw.director)?;
        sort_counts(&mut director);

        let mut universes: Vec<UniverseFacet> = decode_rows("universe", raw.universes)?;
        universes.sort_by(|a, b| a.field_value.cmp(&b.field_value));
        for u in universes.iter_mut() {
            u.sub_universes.sort_by(|a, b| a.field_value.cmp(&b.field_value));
        }

        let runtime = decode_rows::<RuntimeBounds>("runtime", raw.runtime)?
            .into_iter()
            .next();

        Ok(Self {
            provider,
            genre,
            year: sort_distinct(raw.year),
            exclusive: sort_distinct(raw.exclusive),
            holiday: sort_distinct(raw.holiday),
            studio: sort_distinct(raw.studio),
            director,
            universes,
            runtime,
        })
    }
}
