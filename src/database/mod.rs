pub mod document;
pub mod memory;
pub mod models;
pub mod postgres;
pub mod sql;
pub mod store;

pub use document::Document;
pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use store::{DocumentStore, StoreError};
