pub mod aggregate;
pub mod catalog;
pub mod eval;
pub mod mem;
#[cfg(feature = "mongo")]
pub mod mongo;
pub mod snapshot;
pub mod traits;

pub use catalog::Catalog;
pub use mem::InMemoryStore;
#[cfg(feature = "mongo")]
pub use mongo::MongoStore;
pub use traits::*;
