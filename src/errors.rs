//! Unified error type for the enrollment desk.
//!
//! Every failure in the service funnels into [`Error`]. Variants are named for the
//! domain condition that caused them so callers can match precisely; [`Error::kind`]
//! collapses them into the coarse categories the HTTP layer turns into status codes.

use sea_orm::{DbErr, SqlErr};
use thiserror::Error;

/// Coarse classification of an [`Error`], used to pick a response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The caller sent something the service cannot act on.
    BadRequest,
    /// A referenced record does not exist.
    NotFound,
    /// The write collided with existing data.
    Conflict,
    /// Anything else; not the caller's fault.
    Internal,
}

/// All errors produced by the service.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Database error: {0}")]
    Database(DbErr),

    #[error("Conflicting write: {message}")]
    Conflict { message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    #[error("{message}")]
    InvalidInput { message: String },

    #[error("Order id is required")]
    MissingOrderId,

    #[error("Order {order_id} not found")]
    OrderNotFound { order_id: String },

    #[error("Order {order_id} is not awaiting payment (status: {status})")]
    OrderNotPending { order_id: String, status: String },

    #[error("Order {order_id} has no enrollable classes")]
    EmptyOrder { order_id: String },

    #[error("Order item {item_key} is invalid: {reason}")]
    InvalidOrderItem { item_key: String, reason: String },

    #[error(
        "Credits must be a finite number from 0 to {} (got {credits})",
        crate::fulfillment::items::MAX_ENTRY_CREDITS
    )]
    InvalidCredits { credits: f64 },

    #[error("Class {class_id} not found")]
    ClassNotFound { class_id: String },

    #[error("Class {class_id} is inactive")]
    ClassInactive { class_id: String },

    #[error("Class {class_id} has no start time, cannot create sessions")]
    MissingSessionSeed { class_id: String },

    #[error("Unable to allocate {requested} sessions for class {class_id}")]
    InsufficientSessions { class_id: String, requested: u32 },

    #[error("Session {session_id} not found")]
    SessionNotFound { session_id: String },

    #[error("No attendance record for student {student_id} in session {session_id}")]
    AttendanceNotFound {
        student_id: String,
        session_id: String,
    },

    #[error("Leave must be requested at least {cutoff_hours} hours before the session starts")]
    LeaveCutoffPassed { cutoff_hours: i64 },

    #[error("Enrollment {enrollment_id} not found")]
    EnrollmentNotFound { enrollment_id: String },
}

impl Error {
    /// Classifies the error for status-code mapping.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput { .. }
            | Self::MissingOrderId
            | Self::OrderNotPending { .. }
            | Self::EmptyOrder { .. }
            | Self::InvalidOrderItem { .. }
            | Self::InvalidCredits { .. }
            | Self::ClassInactive { .. }
            | Self::MissingSessionSeed { .. }
            | Self::InsufficientSessions { .. }
            | Self::LeaveCutoffPassed { .. } => ErrorKind::BadRequest,
            Self::OrderNotFound { .. }
            | Self::ClassNotFound { .. }
            | Self::SessionNotFound { .. }
            | Self::AttendanceNotFound { .. }
            | Self::EnrollmentNotFound { .. } => ErrorKind::NotFound,
            Self::Conflict { .. } => ErrorKind::Conflict,
            Self::Config { .. } | Self::Database(_) | Self::Io(_) | Self::EnvVar(_) => {
                ErrorKind::Internal
            }
        }
    }

    /// Shorthand for an [`Error::InvalidInput`] with the given message.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }
}

impl From<DbErr> for Error {
    fn from(err: DbErr) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(message)) => Self::Conflict { message },
            _ => Self::Database(err),
        }
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
