use serde::Serialize;

use printpdf::image_crate::ImageError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{}", sqlite_error_string(.0))]
    Storage(#[from] rusqlite::Error),
    #[error("migration {table}.{column} failed: {}", sqlite_error_string(.source))]
    Migration {
        table: &'static str,
        column: &'static str,
        source: rusqlite::Error,
    },
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("image: {0}")]
    Image(#[from] ImageError),
    #[error("json: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("pdf: {0}")]
    Pdf(String),
    #[error("dialog: {0}")]
    Dialog(String),
    #[error("background task failed: {0}")]
    Task(String),
    #[error("{0}")]
    NotFound(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl AppError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::NotFound(_))
    }
}

/// Engine error and message of a failure raised by SQLite itself.
///
/// Statement-compile failures ("no such column", "duplicate column name")
/// arrive as `SqlInputError` on modern SQLite and as `SqliteFailure` on
/// older builds; both carry the same information.
pub(crate) fn sqlite_failure(err: &rusqlite::Error) -> Option<(&rusqlite::ffi::Error, Option<&str>)> {
    match err {
        rusqlite::Error::SqliteFailure(code, msg) => Some((code, msg.as_deref())),
        rusqlite::Error::SqlInputError { error, msg, .. } => Some((error, Some(msg.as_str()))),
        _ => None,
    }
}

pub fn sqlite_error_string(err: &rusqlite::Error) -> String {
    match sqlite_failure(err) {
        Some((code, msg)) => format!(
            "sqlite {:?} [{}]: {}",
            code.code,
            code.extended_code,
            msg.unwrap_or("no message")
        ),
        None => err.to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvelopeStatus {
    Ok,
    Error,
    NotFound,
}

/// Outcome handed back to the frontend by every bridge command.
///
/// The webview never sees a rejected promise: failures travel as
/// `{"status": "error", "message": ...}` and missing quotes as
/// `{"status": "not_found", ...}`.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub status: EnvelopeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            status: EnvelopeStatus::Ok,
            message: None,
            data: Some(data),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: EnvelopeStatus::Error,
            message: Some(message.into()),
            data: None,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == EnvelopeStatus::Ok
    }
}

impl<T> From<Result<T, AppError>> for Envelope<T> {
    fn from(res: Result<T, AppError>) -> Self {
        match res {
            Ok(data) => Envelope::ok(data),
            Err(err) => {
                let status = if err.is_not_found() {
                    EnvelopeStatus::NotFound
                } else {
                    EnvelopeStatus::Error
                };
                Envelope {
                    status,
                    message: Some(err.to_string()),
                    data: None,
                }
            }
        }
    }
}
