//! Ledger domain types
//!
//! Accounts are identified by a fixed-length [`Address`]. Each account holds a
//! single [`Role`]; jobs are identified by dense [`JobId`]s and applications
//! are keyed by `(JobId, Address)`.

use crate::error::LedgerError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Length of an account address in bytes.
pub const ADDRESS_LEN: usize = 20;

/// Opaque account identifier supplied by the identity/transport layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(pub [u8; ADDRESS_LEN]);

impl Address {
    /// Create an address from raw bytes.
    pub const fn from_bytes(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }

    /// Raw address bytes.
    pub fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.as_bytes()))
    }
}

impl FromStr for Address {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);
        let bytes = hex::decode(digits)
            .map_err(|e| LedgerError::codec(format!("invalid address {s:?}: {e}")))?;
        let bytes: [u8; ADDRESS_LEN] = bytes.try_into().map_err(|_| {
            LedgerError::codec(format!(
                "invalid address {s:?}: expected {ADDRESS_LEN} bytes"
            ))
        })?;
        Ok(Self(bytes))
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Sequential, zero-based job identifier.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct JobId(pub u64);

impl JobId {
    /// Create a job id.
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the inner value.
    pub fn value(&self) -> u64 {
        self.0
    }

    /// Index into the dense job list.
    pub(crate) fn index(self) -> Option<usize> {
        usize::try_from(self.0).ok()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "job-{}", self.0)
    }
}

impl From<u64> for JobId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Wall-clock timestamp in Unix milliseconds.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct PhysicalTime {
    /// Milliseconds since the Unix epoch
    pub ts_ms: u64,
}

impl PhysicalTime {
    /// Create a timestamp from Unix milliseconds.
    pub const fn from_ms(ts_ms: u64) -> Self {
        Self { ts_ms }
    }
}

/// Access-control tag held by an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Role {
    /// Never registered
    #[default]
    None = 0,
    /// May apply to open jobs
    JobSeeker = 1,
    /// May post jobs and manage applications to their own jobs
    Employer = 2,
    /// Registered validator; carries no ledger permissions of its own
    Validator = 3,
}

impl Role {
    /// Numeric wire code.
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Whether an account may explicitly register into this role.
    pub fn is_registrable(self) -> bool {
        !matches!(self, Role::None)
    }
}

impl TryFrom<u8> for Role {
    type Error = LedgerError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Role::None),
            1 => Ok(Role::JobSeeker),
            2 => Ok(Role::Employer),
            3 => Ok(Role::Validator),
            other => Err(LedgerError::codec(format!("unknown role code {other}"))),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::None => "none",
            Role::JobSeeker => "job-seeker",
            Role::Employer => "employer",
            Role::Validator => "validator",
        };
        f.write_str(name)
    }
}

impl FromStr for Role {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "none" => Ok(Role::None),
            "job-seeker" | "jobseeker" | "seeker" => Ok(Role::JobSeeker),
            "employer" => Ok(Role::Employer),
            "validator" => Ok(Role::Validator),
            other => other
                .parse::<u8>()
                .map_err(|_| LedgerError::codec(format!("unknown role {s:?}")))
                .and_then(Role::try_from),
        }
    }
}

/// Lifecycle status of an application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum ApplicationStatus {
    /// No application exists for the pair
    #[default]
    None = 0,
    /// Submitted by the job seeker
    Applied = 1,
    /// Shortlisted by the employer
    Shortlisted = 2,
    /// Accepted by the employer
    Accepted = 3,
    /// Rejected by the employer
    Rejected = 4,
}

impl ApplicationStatus {
    /// Numeric wire code.
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Whether an employer may move an application into this status.
    ///
    /// Employers pick freely among the review outcomes; `None` and `Applied`
    /// are never targets once an application exists.
    pub fn is_review_outcome(self) -> bool {
        matches!(
            self,
            ApplicationStatus::Shortlisted
                | ApplicationStatus::Accepted
                | ApplicationStatus::Rejected
        )
    }
}

impl TryFrom<u8> for ApplicationStatus {
    type Error = LedgerError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(ApplicationStatus::None),
            1 => Ok(ApplicationStatus::Applied),
            2 => Ok(ApplicationStatus::Shortlisted),
            3 => Ok(ApplicationStatus::Accepted),
            4 => Ok(ApplicationStatus::Rejected),
            other => Err(LedgerError::codec(format!(
                "unknown application status code {other}"
            ))),
        }
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ApplicationStatus::None => "none",
            ApplicationStatus::Applied => "applied",
            ApplicationStatus::Shortlisted => "shortlisted",
            ApplicationStatus::Accepted => "accepted",
            ApplicationStatus::Rejected => "rejected",
        };
        f.write_str(name)
    }
}

impl FromStr for ApplicationStatus {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(ApplicationStatus::None),
            "applied" => Ok(ApplicationStatus::Applied),
            "shortlisted" => Ok(ApplicationStatus::Shortlisted),
            "accepted" => Ok(ApplicationStatus::Accepted),
            "rejected" => Ok(ApplicationStatus::Rejected),
            other => other
                .parse::<u8>()
                .map_err(|_| LedgerError::codec(format!("unknown application status {s:?}")))
                .and_then(ApplicationStatus::try_from),
        }
    }
}

/// Employer-supplied fields of a job posting.
///
/// Strings are stored verbatim; empty values are accepted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobListing {
    /// Job title
    pub title: String,
    /// Hiring company
    pub company: String,
    /// Free-text location
    pub location: String,
    /// Free-text employment type (e.g. "Full-time")
    pub job_type: String,
    /// Content address of the externally stored description
    pub description_cid: String,
}

impl JobListing {
    /// Build a listing from its parts.
    pub fn new(
        title: impl Into<String>,
        company: impl Into<String>,
        location: impl Into<String>,
        job_type: impl Into<String>,
        description_cid: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            company: company.into(),
            location: location.into(),
            job_type: job_type.into(),
            description_cid: description_cid.into(),
        }
    }
}

/// A job posting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    /// Dense sequential identifier
    pub id: JobId,
    /// Owning employer, fixed at creation
    pub employer: Address,
    /// Job title
    pub title: String,
    /// Hiring company
    pub company: String,
    /// Free-text location
    pub location: String,
    /// Free-text employment type
    pub job_type: String,
    /// Content address of the externally stored description
    pub description_cid: String,
    /// When the job was posted
    pub created_at: PhysicalTime,
    /// Whether the job accepts applications
    pub is_open: bool,
}

impl Job {
    pub(crate) fn from_listing(
        id: JobId,
        employer: Address,
        listing: JobListing,
        created_at: PhysicalTime,
    ) -> Self {
        Self {
            id,
            employer,
            title: listing.title,
            company: listing.company,
            location: listing.location,
            job_type: listing.job_type,
            description_cid: listing.description_cid,
            created_at,
            is_open: true,
        }
    }

    /// Whether `address` owns this job.
    pub fn is_owned_by(&self, address: &Address) -> bool {
        self.employer == *address
    }
}

/// A job seeker's application to a job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    /// Content address of the applicant's resume
    pub resume_cid: String,
    /// Current review status
    pub status: ApplicationStatus,
    /// When the application was submitted (zero when absent)
    pub applied_at: PhysicalTime,
    /// When the status last changed (zero when absent)
    pub updated_at: PhysicalTime,
}

impl Application {
    pub(crate) fn submitted(resume_cid: String, at: PhysicalTime) -> Self {
        Self {
            resume_cid,
            status: ApplicationStatus::Applied,
            applied_at: at,
            updated_at: at,
        }
    }

    /// The "unset" application returned for pairs with no record.
    pub fn absent() -> Self {
        Self::default()
    }

    /// Whether this value describes a submitted application.
    pub fn exists(&self) -> bool {
        self.status != ApplicationStatus::None
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn test_address_display_and_parse() {
        let address = Address::from_bytes([0xab; ADDRESS_LEN]);
        let rendered = address.to_string();
        assert!(rendered.starts_with("0x"));
        assert_eq!(rendered.len(), 2 + ADDRESS_LEN * 2);

        assert_eq!(rendered.parse::<Address>().unwrap(), address);
        let shouted = rendered.to_uppercase().replacen("0X", "0x", 1);
        assert_eq!(shouted.parse::<Address>().unwrap(), address);
        let bare = rendered.trim_start_matches("0x");
        assert_eq!(bare.parse::<Address>().unwrap(), address);
    }

    #[test]
    fn test_address_rejects_wrong_length() {
        assert!("0x1234".parse::<Address>().is_err());
        assert!("not-hex".parse::<Address>().is_err());
    }

    #[test]
    fn test_role_codes_and_names() {
        assert_eq!(Role::JobSeeker.code(), 1);
        assert_eq!(Role::Employer.code(), 2);
        assert_eq!(Role::try_from(3).unwrap(), Role::Validator);
        assert!(Role::try_from(9).is_err());

        assert_eq!("job-seeker".parse::<Role>().unwrap(), Role::JobSeeker);
        assert_eq!("JOB_SEEKER".parse::<Role>().unwrap(), Role::JobSeeker);
        assert_eq!("2".parse::<Role>().unwrap(), Role::Employer);
        assert!("recruiter".parse::<Role>().is_err());
        assert!(!Role::None.is_registrable());
    }

    #[test]
    fn test_status_review_outcomes() {
        assert!(ApplicationStatus::Shortlisted.is_review_outcome());
        assert!(ApplicationStatus::Accepted.is_review_outcome());
        assert!(ApplicationStatus::Rejected.is_review_outcome());
        assert!(!ApplicationStatus::Applied.is_review_outcome());
        assert!(!ApplicationStatus::None.is_review_outcome());
        assert_eq!("4".parse::<ApplicationStatus>().unwrap(), ApplicationStatus::Rejected);
    }

    #[test]
    fn test_absent_application() {
        let absent = Application::absent();
        assert!(!absent.exists());
        assert_eq!(absent.status, ApplicationStatus::None);
        assert!(absent.resume_cid.is_empty());
    }
}
