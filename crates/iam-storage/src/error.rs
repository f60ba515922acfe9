use thiserror::Error;

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("database connection error: {0}")]
    Connection(#[from] sqlx::Error),

    #[error("connection failed")]
    ConnectionFailed,

    #[error("not found")]
    NotFound,

    #[error("duplicate entry")]
    DuplicateEntry,

    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    Other(String),
}

impl DatabaseError {
    pub fn not_found() -> Self {
        DatabaseError::NotFound
    }

    pub fn duplicate() -> Self {
        DatabaseError::DuplicateEntry
    }
}

pub type Result<T> = std::result::Result<T, DatabaseError>;
