pub mod bootcamp;
pub mod course;
pub mod schema;

pub use schema::{CollectionSchema, FieldSpec, FieldType, ValidationError, ValidationMode};
