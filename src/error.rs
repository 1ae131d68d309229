use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("immutable field: {0}")]
    ImmutableField(String),

    #[error("constraint violation: {0}")]
    Constraint(String),

    #[error("storage engine error: {0}")]
    Engine(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("internal store failure: {0}")]
    Internal(String),
}

impl StoreError {
    /// Returns whether this error is retryable (e.g., pool timeout or connection loss)
    pub fn is_retryable(&self) -> bool {
        match self {
            StoreError::Engine(err) => matches!(
                err,
                sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_)
            ),
            StoreError::Internal(_) => true,
            _ => false,
        }
    }

    pub(crate) fn not_found(entity: &str, key: &str) -> Self {
        StoreError::NotFound(format!("{entity} with key {key:?}"))
    }
}
