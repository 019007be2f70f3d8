use thiserror::Error;

use crate::database::StoreError;

#[derive(Error, Debug)]
pub enum QueryError {
    #[error("Invalid field name: {0}")]
    InvalidField(String),

    #[error("Unsupported operator '{operator}' on field '{field}'")]
    UnsupportedOperator { field: String, operator: String },

    #[error("Invalid value '{value}' for field '{field}': expected {expected}")]
    InvalidValue { field: String, value: String, expected: &'static str },

    #[error("Invalid select: {0}")]
    InvalidProjection(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}
