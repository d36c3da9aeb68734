pub mod errors;
pub mod expr;
pub mod facets;
pub mod filter;
pub mod model;
pub mod params;
pub mod pipeline;
pub mod query;
pub mod request;
pub mod util;

pub use errors::*;
pub use expr::{CmpOp, Expr};
pub use facets::{FacetCount, FacetSummary, RawFacets, RuntimeBounds, UniverseFacet};
pub use filter::FilterInput;
pub use model::*;
pub use params::QueryParams;
pub use pipeline::{Accumulator, AggExpr, Projection, Stage};
pub use query::*;
pub use request::{MovieLookup, RecentRequest, TmdbIds};
