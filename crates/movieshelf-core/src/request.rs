use crate::expr::Expr;
use crate::model::fields;
use crate::params::{names, parse_id, parse_int, QueryParams};
use crate::query::{FindOptions, SortOrder};
use crate::ValidationError;
use std::collections::BTreeSet;

pub const DEFAULT_RECENT_COUNT: u64 = 20;

/// How a single movie is addressed. A tmdb id wins over title and year.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MovieLookup {
    TmdbId(i64),
    TitleYear { title: String, year: i64 },
}

impl MovieLookup {
    pub fn from_params(params: &QueryParams) -> Result<Self, ValidationError> {
        if let Some(id) = params.first(names::TMDB_ID) {
            return Ok(MovieLookup::TmdbId(parse_id(names::TMDB_ID, id)?));
        }
        match (params.first(names::TITLE), params.first(names::YEAR)) {
            (Some(title), Some(year)) => Ok(MovieLookup::TitleYear {
                title: title.to_string(),
                year: parse_int(names::YEAR, year)?,
            }),
            _ => Err(ValidationError::Missing("tmdbid, or title and year")),
        }
    }

    pub fn to_expr(&self) -> Expr {
        match self {
            MovieLookup::TmdbId(id) => Expr::eq(fields::TMDB_ID, *id),
            MovieLookup::TitleYear { title, year } => Expr::And(vec![
                Expr::eq(fields::MOVIE, title.as_str()),
                Expr::eq(fields::YEAR, *year),
            ]),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TmdbIds(BTreeSet<i64>);

impl TmdbIds {
    pub fn new(ids: impl IntoIterator<Item = i64>) -> Result<Self, ValidationError> {
        let ids: BTreeSet<i64> = ids.into_iter().collect();
        if ids.is_empty() {
            return Err(ValidationError::Missing("tmdbid"));
        }
        Ok(Self(ids))
    }

    pub fn from_params(params: &QueryParams) -> Result<Self, ValidationError> {
        let ids = params
            .all(names::TMDB_ID)
            .iter()
            .map(|s| parse_id(names::TMDB_ID, s))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(ids)
    }

    pub fn ids(&self) -> impl Iterator<Item = i64> + '_ {
        self.0.iter().copied()
    }

    pub fn to_expr(&self) -> Expr {
        Expr::is_in(fields::TMDB_ID, self.ids())
    }
}

/// Most recently added movies, newest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecentRequest {
    pub count: u64,
}

impl Default for RecentRequest {
    fn default() -> Self {
        Self {
            count: DEFAULT_RECENT_COUNT,
        }
    }
}

impl RecentRequest {
    /// A missing `count` means [`DEFAULT_RECENT_COUNT`]. A present but
    /// non-numeric `count` is rejected rather than replaced by the default.
    pub fn from_params(params: &QueryParams) -> Result<Self, ValidationError> {
        match params.first(names::COUNT) {
            None => Ok(Self::default()),
            Some(raw) => raw
                .parse::<u64>()
                .map(|count| Self { count })
                .map_err(|_| ValidationError::InvalidInteger {
                    param: names::COUNT,
                    value: raw.to_string(),
                }),
        }
    }

    pub fn find_options(&self) -> FindOptions {
        FindOptions::sorted_by(fields::MS_ADDED, SortOrder::Desc).with_limit(self.count)
    }
}
