use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Db(rusqlite::Error),
    Pool(r2d2::Error),
    Json(serde_json::Error),
    /// Caller input error with a field-level message. Never retried.
    Validation { field: String, message: String },
    /// Aggregate or member does not exist (or is soft-deleted).
    NotFound(&'static str),
    /// Access resolution denied, or the resolved level is insufficient
    /// for the requested operation.
    Forbidden(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn validation(field: &str, message: &str) -> Self {
        AppError::Validation {
            field: field.to_string(),
            message: message.to_string(),
        }
    }

    pub fn forbidden(reason: &str) -> Self {
        AppError::Forbidden(reason.to_string())
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Db(e) => write!(f, "Database error: {e}"),
            AppError::Pool(e) => write!(f, "Pool error: {e}"),
            AppError::Json(e) => write!(f, "JSON error: {e}"),
            AppError::Validation { field, message } => {
                write!(f, "Validation error ({field}): {message}")
            }
            AppError::NotFound(what) => write!(f, "{what} was not found"),
            AppError::Forbidden(reason) => write!(f, "Forbidden: {reason}"),
        }
    }
}

impl std::error::Error for AppError {}

impl From<rusqlite::Error> for AppError {
    fn from(e: rusqlite::Error) -> Self {
        AppError::Db(e)
    }
}

impl From<r2d2::Error> for AppError {
    fn from(e: r2d2::Error) -> Self {
        AppError::Pool(e)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::Json(e)
    }
}
