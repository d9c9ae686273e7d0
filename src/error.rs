use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ShopError {
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Cart is empty")]
    CartEmpty,
    #[error("Cart has items that are no longer available")]
    UnavailableItems,
    #[error("Submitted total {submitted} does not match computed total {expected}")]
    TotalMismatch { expected: Decimal, submitted: Decimal },
    #[error("Payment gateway error: {0}")]
    GatewayError(String),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("Password hashing error: {0}")]
    PasswordError(#[from] bcrypt::BcryptError),
    #[cfg(feature = "storage-rocksdb")]
    #[error("RocksDB error: {0}")]
    RocksDbError(#[from] rocksdb::Error),
    #[error("Internal error: {0}")]
    InternalError(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl From<reqwest::Error> for ShopError {
    fn from(err: reqwest::Error) -> Self {
        ShopError::GatewayError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ShopError>;
