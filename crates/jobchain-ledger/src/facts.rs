//! Ledger facts
//!
//! Every accepted mutation is expressed as a [`LedgerFact`]. Facts are what
//! the journal persists and what [`JobLedger::reduce`](crate::JobLedger::reduce)
//! folds into state, so a live ledger and a replayed one go through the same
//! code path.
//!
//! On disk each fact is wrapped in a [`FactEnvelope`] carrying the schema
//! version and the fact's sequence number in the journal.

use crate::error::LedgerError;
use crate::types::{Address, ApplicationStatus, JobId, JobListing, PhysicalTime, Role};
use serde::{Deserialize, Serialize};

/// Type identifier for ledger facts
pub const LEDGER_FACT_TYPE_ID: &str = "jobchain-ledger";
/// Schema version for ledger fact serialization
pub const LEDGER_FACT_SCHEMA_VERSION: u32 = 1;

/// A state change accepted by the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LedgerFact {
    /// Account (re-)registered a role
    RoleRegistered {
        /// Registering account
        account: Address,
        /// Role now held
        role: Role,
        /// When the registration happened
        registered_at: PhysicalTime,
    },
    /// Employer posted a job
    JobPosted {
        /// Allocated job id
        job_id: JobId,
        /// Owning employer
        employer: Address,
        /// Posting fields
        listing: JobListing,
        /// When the job was posted
        created_at: PhysicalTime,
    },
    /// Job seeker applied to a job
    ApplicationSubmitted {
        /// Target job
        job_id: JobId,
        /// Applying account
        applicant: Address,
        /// Content address of the resume
        resume_cid: String,
        /// When the application was submitted
        submitted_at: PhysicalTime,
    },
    /// Employer set an application's review status
    ApplicationStatusUpdated {
        /// Job owning the application
        job_id: JobId,
        /// Applicant whose application changed
        applicant: Address,
        /// New status
        status: ApplicationStatus,
        /// When the status changed
        updated_at: PhysicalTime,
    },
    /// Employer opened or closed a job
    JobOpenUpdated {
        /// Job in question
        job_id: JobId,
        /// New open flag
        is_open: bool,
        /// When the flag changed
        updated_at: PhysicalTime,
    },
}

impl LedgerFact {
    /// Stable sub-type name, used in logs.
    pub fn sub_type(&self) -> &'static str {
        match self {
            LedgerFact::RoleRegistered { .. } => "role-registered",
            LedgerFact::JobPosted { .. } => "job-posted",
            LedgerFact::ApplicationSubmitted { .. } => "application-submitted",
            LedgerFact::ApplicationStatusUpdated { .. } => "application-status-updated",
            LedgerFact::JobOpenUpdated { .. } => "job-open-updated",
        }
    }

    /// Get the timestamp in milliseconds
    pub fn timestamp_ms(&self) -> u64 {
        match self {
            LedgerFact::RoleRegistered { registered_at, .. } => registered_at.ts_ms,
            LedgerFact::JobPosted { created_at, .. } => created_at.ts_ms,
            LedgerFact::ApplicationSubmitted { submitted_at, .. } => submitted_at.ts_ms,
            LedgerFact::ApplicationStatusUpdated { updated_at, .. } => updated_at.ts_ms,
            LedgerFact::JobOpenUpdated { updated_at, .. } => updated_at.ts_ms,
        }
    }

    /// Job this fact touches, if any.
    pub fn job_id(&self) -> Option<JobId> {
        match self {
            LedgerFact::RoleRegistered { .. } => None,
            LedgerFact::JobPosted { job_id, .. }
            | LedgerFact::ApplicationSubmitted { job_id, .. }
            | LedgerFact::ApplicationStatusUpdated { job_id, .. }
            | LedgerFact::JobOpenUpdated { job_id, .. } => Some(*job_id),
        }
    }
}

/// Versioned on-disk wrapper for a fact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactEnvelope {
    /// Schema version of `fact`
    pub schema_version: u32,
    /// Zero-based position in the journal
    pub seq: u64,
    /// The fact itself
    pub fact: LedgerFact,
}

impl FactEnvelope {
    /// Wrap a fact at the current schema version.
    pub fn new(seq: u64, fact: LedgerFact) -> Self {
        Self {
            schema_version: LEDGER_FACT_SCHEMA_VERSION,
            seq,
            fact,
        }
    }

    /// Encode as a single JSON line (no trailing newline).
    pub fn to_line(&self) -> Result<String, LedgerError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode one JSON line, rejecting unknown schema versions.
    pub fn from_line(line: &str) -> Result<Self, LedgerError> {
        let envelope: FactEnvelope = serde_json::from_str(line)?;
        if envelope.schema_version != LEDGER_FACT_SCHEMA_VERSION {
            return Err(LedgerError::codec(format!(
                "unsupported {LEDGER_FACT_TYPE_ID} schema version {} at seq {}",
                envelope.schema_version, envelope.seq
            )));
        }
        Ok(envelope)
    }
}
