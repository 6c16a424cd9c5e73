use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimulatorError {
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Missing dependency: {0}")]
    DependencyMissingError(String),
    #[error("Wallet not connected: {0}")]
    ConnectivityError(String),
    #[error("Persistence error: {0}")]
    PersistenceError(String),
    #[error("Wallet operation failed: {0}")]
    CollaboratorError(String),
    #[error("Busy: {0}")]
    BusyError(String),
    #[error("Not found: {0}")]
    NotFoundError(String),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[cfg(feature = "storage-rocksdb")]
    #[error("RocksDB error: {0}")]
    RocksDbError(#[from] rocksdb::Error),
}

pub type Result<T> = std::result::Result<T, SimulatorError>;
