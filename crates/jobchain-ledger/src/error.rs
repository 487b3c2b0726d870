//! Ledger error types
//!
//! Every rejected operation reports one of these synchronously and leaves the
//! ledger state untouched.

use crate::types::{Address, ApplicationStatus, JobId, Role};
use thiserror::Error;

/// Coarse error taxonomy exposed to transports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Role or ownership check failed
    Unauthorized,
    /// Referenced job or application does not exist
    NotFound,
    /// Duplicate application
    AlreadyApplied,
    /// Apply attempted on a closed job
    JobClosed,
    /// Argument outside the allowed set (role or status target)
    InvalidArgument,
    /// Journal or encoding failure
    Storage,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::NotFound => "not_found",
            ErrorKind::AlreadyApplied => "already_applied",
            ErrorKind::JobClosed => "job_closed",
            ErrorKind::InvalidArgument => "invalid_argument",
            ErrorKind::Storage => "storage",
        };
        f.write_str(name)
    }
}

/// Errors from ledger operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// Caller lacks the role or ownership the operation requires.
    #[error("unauthorized: {reason}")]
    Unauthorized {
        /// Which check failed
        reason: String,
    },

    /// Job id is outside `[0, count)`.
    #[error("{0} not found")]
    JobNotFound(JobId),

    /// No application exists for the pair.
    #[error("no application from {applicant} for {job_id}")]
    ApplicationNotFound {
        /// Job in question
        job_id: JobId,
        /// Applicant in question
        applicant: Address,
    },

    /// The applicant already applied to this job.
    #[error("{applicant} already applied to {job_id}")]
    AlreadyApplied {
        /// Job in question
        job_id: JobId,
        /// Applicant in question
        applicant: Address,
    },

    /// The job no longer accepts applications.
    #[error("{0} is closed")]
    JobClosed(JobId),

    /// The role cannot be registered explicitly.
    #[error("role {0} cannot be registered")]
    InvalidRole(Role),

    /// The status is not an allowed review outcome.
    #[error("status {0} is not a valid review outcome")]
    InvalidStatus(ApplicationStatus),

    /// Journal I/O failed.
    #[error("journal error: {0}")]
    Journal(String),

    /// Encoding or parsing failed.
    #[error("codec error: {0}")]
    Codec(String),

    /// Journal contents are inconsistent with the ledger.
    #[error("replay error: {0}")]
    Replay(String),

    /// A failed append may have left the journal ahead of memory; the
    /// service refuses mutations until it is reopened from the journal.
    #[error("ledger is read-only until reopened: journal diverged after a failed append")]
    Poisoned,
}

impl LedgerError {
    /// Create an unauthorized error.
    pub fn unauthorized(reason: impl Into<String>) -> Self {
        Self::Unauthorized {
            reason: reason.into(),
        }
    }

    /// Create a journal error.
    pub fn journal(message: impl Into<String>) -> Self {
        Self::Journal(message.into())
    }

    /// Create a codec error.
    pub fn codec(message: impl Into<String>) -> Self {
        Self::Codec(message.into())
    }

    /// Create a replay error.
    pub fn replay(message: impl Into<String>) -> Self {
        Self::Replay(message.into())
    }

    /// Map onto the transport-facing taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::Unauthorized { .. } => ErrorKind::Unauthorized,
            LedgerError::JobNotFound(_) | LedgerError::ApplicationNotFound { .. } => {
                ErrorKind::NotFound
            }
            LedgerError::AlreadyApplied { .. } => ErrorKind::AlreadyApplied,
            LedgerError::JobClosed(_) => ErrorKind::JobClosed,
            LedgerError::InvalidRole(_) | LedgerError::InvalidStatus(_) => {
                ErrorKind::InvalidArgument
            }
            LedgerError::Journal(_)
            | LedgerError::Codec(_)
            | LedgerError::Replay(_)
            | LedgerError::Poisoned => ErrorKind::Storage,
        }
    }
}

impl From<std::io::Error> for LedgerError {
    fn from(err: std::io::Error) -> Self {
        Self::Journal(err.to_string())
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(err: serde_json::Error) -> Self {
        Self::Codec(err.to_string())
    }
}
