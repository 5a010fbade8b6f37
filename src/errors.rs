use rust_decimal::Decimal;
use sea_orm::error::DbErr;
use serde::Serialize;
use uuid::Uuid;

/// Error taxonomy for the inventory core.
///
/// Every variant is a local, recoverable condition surfaced synchronously to
/// the caller; none crashes the process. Any failure raised inside one of the
/// ledger transactions rolls back every mutation attempted in that call.
#[derive(Debug, thiserror::Error, Serialize)]
pub enum InventoryError {
    #[error("Database error: {0}")]
    Database(
        #[from]
        #[serde(skip)]
        DbErr,
    ),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Insufficient stock: requested {requested}, available {available} (short {shortfall})")]
    InsufficientStock {
        requested: Decimal,
        available: Decimal,
        shortfall: Decimal,
    },

    #[error("Stale allocation for lot {lot_id}: planned {planned}, only {available} remaining")]
    StaleAllocation {
        lot_id: Uuid,
        planned: Decimal,
        available: Decimal,
    },

    #[error("Invalid adjustment: {0}")]
    InvalidAdjustment(String),

    #[error("Event error: {0}")]
    Event(String),

    #[error("Other error: {0}")]
    Other(
        #[from]
        #[serde(skip)]
        anyhow::Error,
    ),
}

pub trait IntoDbErr {
    fn into_db_err(self) -> DbErr;
}

impl IntoDbErr for DbErr {
    fn into_db_err(self) -> DbErr {
        self
    }
}

impl IntoDbErr for String {
    fn into_db_err(self) -> DbErr {
        DbErr::Custom(self)
    }
}

impl IntoDbErr for &str {
    fn into_db_err(self) -> DbErr {
        DbErr::Custom(self.to_string())
    }
}

impl InventoryError {
    /// Generic constructor that normalizes any supported database error input.
    pub fn db_error<E: IntoDbErr>(error: E) -> Self {
        InventoryError::Database(error.into_db_err())
    }

    /// True for errors the caller can resolve by re-planning and retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, InventoryError::StaleAllocation { .. })
    }
}

impl From<validator::ValidationErrors> for InventoryError {
    fn from(err: validator::ValidationErrors) -> Self {
        InventoryError::Validation(err.to_string())
    }
}
