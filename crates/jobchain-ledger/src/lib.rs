//! Job Chain Ledger
//!
//! Authoritative ledger of account roles, job postings and job applications,
//! together with the rules for who may create, read or change each record.
//!
//! - Accounts hold one [`Role`]; registering again overwrites it.
//! - Only employers post jobs; the posting employer owns the job forever.
//! - Only job seekers apply, at most once per job, and only to open jobs.
//! - Only the owning employer opens/closes a job or reviews its applications.
//!
//! # Layout
//!
//! - [`ledger`]: the pure state machine ([`JobLedger`])
//! - [`facts`]: accepted mutations as [`LedgerFact`]s
//! - [`journal`]: append-only fact persistence
//! - [`service`]: [`LedgerService`], the lock-guarded, journaled store
//! - [`clock`]: injected physical time
//! - [`config`]: TOML/env configuration
//!
//! # Example
//!
//! ```ignore
//! use jobchain_ledger::{JobListing, LedgerService, Role};
//!
//! let service = LedgerService::in_memory();
//! service.register(employer, Role::Employer).await?;
//! let listing = JobListing::new(
//!     "Frontend Developer",
//!     "Job Chain Labs",
//!     "Remote",
//!     "Full-time",
//!     cid,
//! );
//! let job_id = service.create_job(employer, listing).await?;
//! ```

pub mod clock;
pub mod config;
pub mod error;
pub mod facts;
pub mod journal;
pub mod ledger;
pub mod service;
pub mod types;

pub use clock::{FixedClock, PhysicalClock, SystemClock};
pub use config::{ConfigError, LedgerConfig};
pub use error::{ErrorKind, LedgerError};
pub use facts::{FactEnvelope, LedgerFact, LEDGER_FACT_SCHEMA_VERSION};
pub use journal::{FactJournal, FileJournal, MemoryJournal};
pub use ledger::{JobLedger, MAX_PAGE_SIZE};
pub use service::LedgerService;
pub use types::{
    Address, Application, ApplicationStatus, Job, JobId, JobListing, PhysicalTime, Role,
    ADDRESS_LEN,
};
