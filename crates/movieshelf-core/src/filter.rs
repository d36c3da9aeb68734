//! Listing filters: one validation pass from raw parameters into a
//! [`FilterInput`], then a pure translation into an [`Expr`].

use crate::expr::Expr;
use crate::model::fields;
use crate::params::{names, parse_id, parse_int, QueryParams};
use crate::ValidationError;
use std::collections::BTreeSet;
use std::ops::RangeInclusive;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterInput {
    pub genres: BTreeSet<String>,
    pub universes: BTreeSet<String>,
    pub exclusives: BTreeSet<String>,
    pub studios: BTreeSet<String>,
    pub holidays: BTreeSet<String>,
    pub directors: BTreeSet<String>,
    /// Explicit years plus every year covered by a requested decade.
    pub years: BTreeSet<i64>,
    /// Normalized so that `.0 <= .1`.
    pub runtime_range: Option<(i64, i64)>,
    pub provider_ids: BTreeSet<i64>,
}

/// Years a decade range may cover. Keeps the expanded set bounded no matter
/// how many ranges a request carries.
pub const DECADE_YEARS: RangeInclusive<i64> = 0..=9999;

/// Expand `"yyyy-yyyy"` into its inclusive span of years.
pub fn parse_decade(raw: &str) -> Result<RangeInclusive<i64>, ValidationError> {
    let invalid = || ValidationError::InvalidRangeFormat {
        param: names::DECADE,
        value: raw.to_string(),
    };
    let parts: Vec<&str> = raw.split('-').collect();
    if parts.len() != 2 {
        return Err(invalid());
    }
    let start = parts[0].parse::<i64>().map_err(|_| invalid())?;
    let end = parts[1].parse::<i64>().map_err(|_| invalid())?;
    if start > end || !DECADE_YEARS.contains(&start) || !DECADE_YEARS.contains(&end) {
        return Err(invalid());
    }
    Ok(start..=end)
}

fn strings(params: &QueryParams, key: &str) -> BTreeSet<String> {
    params.all(key).iter().cloned().collect()
}

impl FilterInput {
    /// Validate every parameter; the first bad one rejects the whole input.
    pub fn from_params(params: &QueryParams) -> Result<Self, ValidationError> {
        let mut years = BTreeSet::new();
        for y in params.all(names::YEAR) {
            years.insert(parse_int(names::YEAR, y)?);
        }
        for d in params.all(names::DECADE) {
            years.extend(parse_decade(d)?);
        }

        let runtime = params.all(names::RUNTIME);
        let runtime_range = match runtime.len() {
            0 => None,
            2 => {
                let a = parse_int(names::RUNTIME, &runtime[0])?;
                let b = parse_int(names::RUNTIME, &runtime[1])?;
                Some((a.min(b), a.max(b)))
            }
            got => {
                return Err(ValidationError::InvalidArity {
                    param: names::RUNTIME,
                    expected: 2,
                    got,
                })
            }
        };

        let mut provider_ids = BTreeSet::new();
        for p in params.all(names::PROVIDER) {
            provider_ids.insert(parse_id(names::PROVIDER, p)?);
        }

        Ok(Self {
            genres: strings(params, names::GENRE),
            universes: strings(params, names::UNIVERSE),
            exclusives: strings(params, names::EXCLUSIVE),
            studios: strings(params, names::STUDIO),
            holidays: strings(params, names::HOLIDAY),
            directors: strings(params, names::DIRECTOR),
            years,
            runtime_range,
            provider_ids,
        })
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// One clause per populated filter, joined with AND.
    pub fn to_expr(&self) -> Expr {
        let mut clauses = Vec::new();
        if !self.genres.is_empty() {
            clauses.push(either_field(fields::GENRE, fields::GENRE_2, &self.genres));
        }
        if !self.universes.is_empty() {
            clauses.push(either_field(
                fields::UNIVERSE,
                fields::SUB_UNIVERSE,
                &self.universes,
            ));
        }
        for (field, set) in [
            (fields::EXCLUSIVE, &self.exclusives),
            (fields::STUDIO, &self.studios),
            (fields::HOLIDAY, &self.holidays),
        ] {
            if !set.is_empty() {
                clauses.push(Expr::is_in(field, set.iter().cloned()));
            }
        }
        if !self.years.is_empty() {
            clauses.push(Expr::is_in(fields::YEAR, self.years.iter().copied()));
        }
        if !self.directors.is_empty() {
            clauses.push(Expr::is_in(fields::DIRECTOR, self.directors.iter().cloned()));
        }
        if let Some((low, high)) = self.runtime_range {
            // endpoints excluded: runtime=90&runtime=120 skips exactly 90 and 120
            clauses.push(Expr::between_exclusive(fields::RUNTIME, low, high));
        }
        if !self.provider_ids.is_empty() {
            clauses.push(Expr::is_in(
                fields::FLATRATE_PROVIDER_ID,
                self.provider_ids.iter().copied(),
            ));
        }
        Expr::all_of(clauses)
    }
}

fn either_field(a: &str, b: &str, values: &BTreeSet<String>) -> Expr {
    Expr::any_of(vec![
        Expr::is_in(a, values.iter().cloned()),
        Expr::is_in(b, values.iter().cloned()),
    ])
}
