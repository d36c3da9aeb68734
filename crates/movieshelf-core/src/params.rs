use crate::ValidationError;
use std::collections::BTreeMap;

/// Parameter names accepted by the catalog operations.
pub mod names {
    pub const GENRE: &str = "genre";
    pub const UNIVERSE: &str = "universe";
    pub const EXCLUSIVE: &str = "exclusive";
    pub const STUDIO: &str = "studio";
    pub const HOLIDAY: &str = "holiday";
    pub const YEAR: &str = "year";
    pub const DECADE: &str = "decade";
    pub const DIRECTOR: &str = "director";
    pub const RUNTIME: &str = "runtime";
    pub const PROVIDER: &str = "provider";
    pub const TMDB_ID: &str = "tmdbid";
    pub const TITLE: &str = "title";
    pub const COUNT: &str = "count";
}

/// Raw repeatable query parameters, in arrival order per key.
/// Empty values (`?genre=`) are treated as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams(BTreeMap<String, Vec<String>>);

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let value = value.into();
        if value.is_empty() {
            return;
        }
        self.0.entry(key.into()).or_default().push(value);
    }

    pub fn all(&self, key: &str) -> &[String] {
        self.0.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn first(&self, key: &str) -> Option<&str> {
        self.all(key).first().map(String::as_str)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for QueryParams {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut params = QueryParams::new();
        for (k, v) in iter {
            params.push(k, v);
        }
        params
    }
}

pub(crate) fn parse_int(param: &'static str, value: &str) -> Result<i64, ValidationError> {
    value
        .parse::<i64>()
        .map_err(|_| ValidationError::InvalidInteger {
            param,
            value: value.to_string(),
        })
}

pub(crate) fn parse_id(param: &'static str, value: &str) -> Result<i64, ValidationError> {
    value.parse::<i64>().map_err(|_| ValidationError::InvalidId {
        param,
        value: value.to_string(),
    })
}
