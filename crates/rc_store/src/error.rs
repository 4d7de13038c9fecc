use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Store is not initialised (closed or never opened)")]
    NotInitialised,

    #[error("Serialisation error: {0}")]
    Serialisation(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid profile: {0}")]
    InvalidProfile(String),

    #[error("Invalid store configuration: {0}")]
    InvalidConfig(String),

    #[error("Migration error: {0}")]
    Migration(String),
}
