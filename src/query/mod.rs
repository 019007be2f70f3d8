pub mod builder;
pub mod error;
pub mod order;
pub mod pagination;
pub mod params;
pub mod predicate;
pub mod types;

pub use builder::{project, Populate, QueryBuilder, QueryOutcome, QueryPlan};
pub use error::QueryError;
pub use order::{QueryOrder, QuerySelect};
pub use pagination::{PageRef, PageWindow, Pagination};
pub use params::FilterRequest;
pub use types::*;
