use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CardFinanceError {
    #[error("Invalid input: {field} — {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Out of range: {field} = {value} (allowed {min}..={max})")]
    OutOfRange {
        field: String,
        value: Decimal,
        min: Decimal,
        max: Decimal,
    },

    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    #[error("Version conflict on {id}: expected {expected}, found {actual}")]
    VersionConflict {
        id: String,
        expected: u64,
        actual: u64,
    },

    #[error("Date error: {0}")]
    DateError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for CardFinanceError {
    fn from(e: serde_json::Error) -> Self {
        CardFinanceError::SerializationError(e.to_string())
    }
}
