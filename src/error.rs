use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid settings: {0}")]
    InvalidSettings(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown catalog: {0}")]
    UnknownCatalog(String),

    #[error("Table {table} has no column {column}")]
    MissingColumn { table: String, column: String },

    #[error("Invalid record in {table}: {reason}")]
    InvalidRecord { table: String, reason: String },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "rocksdb")]
    #[error("RocksDB error: {0}")]
    RocksDb(#[from] rocksdb::Error),

    #[cfg(feature = "rocksdb")]
    #[error("Row encoding error: {0}")]
    Encoding(#[from] bincode::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
