use serde::{Deserialize, Serialize};

/// Field names as stored in the movies collection.
pub mod fields {
    pub const MOVIE: &str = "Movie";
    pub const UNIVERSE: &str = "Universe";
    pub const SUB_UNIVERSE: &str = "Sub_Universe";
    pub const GENRE: &str = "Genre";
    pub const GENRE_2: &str = "Genre_2";
    pub const HOLIDAY: &str = "Holiday";
    pub const EXCLUSIVE: &str = "Exclusive";
    pub const STUDIO: &str = "Studio";
    pub const YEAR: &str = "Year";
    pub const RANKING: &str = "Ranking";
    pub const DIRECTOR: &str = "Director";
    pub const RUNTIME: &str = "Runtime";
    pub const TMDB_ID: &str = "TMDBId";
    pub const MS_ADDED: &str = "ms_added";
    pub const FLATRATE: &str = "Provider.flatrate";
    pub const FLATRATE_PROVIDER_ID: &str = "Provider.flatrate.provider_id";
}

// Store documents use `Genre_2`-style keys; the API emits the lowercase names.
// Every field is optional since documents are sparse.

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ProviderInfo {
    #[serde(alias = "Logo_path")]
    pub logo_path: Option<String>,
    #[serde(alias = "Provider_id")]
    pub provider_id: Option<i64>,
    #[serde(alias = "Provider_name")]
    pub provider_name: Option<String>,
    #[serde(alias = "Display_priority")]
    pub display_priority: Option<i64>,
}

/// Where a movie can be watched, split by availability kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Providers {
    #[serde(alias = "Link")]
    pub link: Option<String>,
    #[serde(alias = "Rent")]
    pub rent: Option<Vec<ProviderInfo>>,
    #[serde(alias = "Flatrate")]
    pub flatrate: Option<Vec<ProviderInfo>>,
    #[serde(alias = "Buy")]
    pub buy: Option<Vec<ProviderInfo>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Rating {
    #[serde(alias = "Source")]
    pub source: Option<String>,
    #[serde(alias = "Value")]
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct MovieRecord {
    #[serde(alias = "Movie")]
    pub movie: Option<String>,
    #[serde(alias = "JH_Score")]
    pub jh_score: Option<i64>,
    #[serde(alias = "Universe")]
    pub universe: Option<String>,
    #[serde(alias = "Sub_Universe")]
    pub sub_universe: Option<String>,
    #[serde(alias = "Genre")]
    pub genre: Option<String>,
    #[serde(alias = "Genre_2")]
    pub genre_2: Option<String>,
    #[serde(alias = "Holiday")]
    pub holiday: Option<String>,
    #[serde(alias = "Exclusive")]
    pub exclusive: Option<String>,
    #[serde(alias = "Studio")]
    pub studio: Option<String>,
    #[serde(alias = "Year")]
    pub year: Option<i64>,
    #[serde(alias = "Review")]
    pub review: Option<String>,
    #[serde(alias = "Ranking")]
    pub ranking: Option<i64>,
    #[serde(alias = "Dani_Approved")]
    pub dani_approved: Option<bool>,
    #[serde(alias = "Plot")]
    pub plot: Option<String>,
    #[serde(alias = "Poster")]
    pub poster: Option<String>,
    #[serde(alias = "Actors")]
    pub actors: Option<String>,
    #[serde(alias = "Director")]
    pub director: Option<String>,
    #[serde(alias = "Ratings")]
    pub ratings: Option<Vec<Rating>>,
    #[serde(rename = "boxoffice", alias = "BoxOffice")]
    pub box_office: Option<String>,
    #[serde(alias = "Rated")]
    pub rated: Option<String>,
    #[serde(alias = "Runtime")]
    pub runtime: Option<i64>,
    #[serde(alias = "Provider")]
    pub provider: Option<Providers>,
    #[serde(alias = "Budget")]
    pub budget: Option<String>,
    #[serde(rename = "tmdbid", alias = "TMDBId")]
    pub tmdb_id: Option<i64>,
    #[serde(alias = "Recommendations")]
    pub recommendations: Option<Vec<i64>>,
    #[serde(rename = "rottentomatoes", alias = "RottenTomatoes")]
    pub rotten_tomatoes: Option<String>,
    #[serde(alias = "IMDB")]
    pub imdb: Option<String>,
    #[serde(alias = "Metacritic")]
    pub metacritic: Option<String>,
    #[serde(alias = "Trailer")]
    pub trailer: Option<String>,
    pub ms_added: Option<i64>,
}

impl MovieRecord {
    /// Decode a raw store document. Unknown keys (including `_id`) are ignored.
    pub fn from_document(doc: serde_json::Value) -> crate::Result<Self> {
        serde_json::from_value(doc)
            .map_err(|e| crate::CatalogError::Upstream(format!("failed to decode movie: {e}")))
    }
}
