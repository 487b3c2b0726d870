//! Ledger service
//!
//! [`LedgerService`] is the store instance transports talk to. It owns the
//! [`JobLedger`] behind a single `RwLock` and applies every mutation as one
//! indivisible step:
//!
//! 1. take the write lock
//! 2. read the clock and plan the fact (validation)
//! 3. append the fact to the journal
//! 4. reduce the fact into memory
//!
//! A failure at step 2 or 3 returns before state is touched. Reads take the
//! read lock, so they never observe a half-applied mutation.
//!
//! If an append fails, the journal is reloaded to confirm it still matches
//! memory. When it does not (the entry may have reached disk anyway), the
//! service is poisoned: reads keep working and every mutation fails with
//! [`LedgerError::Poisoned`] until the ledger is reopened from the journal.
//!
//! The service is cheap to clone; clones share the same state.

use crate::clock::{PhysicalClock, SystemClock};
use crate::error::LedgerError;
use crate::facts::{FactEnvelope, LedgerFact};
use crate::journal::{FactJournal, MemoryJournal};
use crate::ledger::JobLedger;
use crate::types::{
    Address, Application, ApplicationStatus, Job, JobId, JobListing, PhysicalTime, Role,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Shared, journaled ledger.
#[derive(Clone)]
pub struct LedgerService {
    state: Arc<RwLock<JobLedger>>,
    journal: Arc<dyn FactJournal>,
    clock: Arc<dyn PhysicalClock>,
    poisoned: Arc<AtomicBool>,
}

impl std::fmt::Debug for LedgerService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerService").finish_non_exhaustive()
    }
}

impl LedgerService {
    /// Replay `journal` and serve the resulting ledger.
    ///
    /// Fails with [`LedgerError::Replay`] if sequence numbers are not dense
    /// from zero or a fact does not reduce cleanly.
    pub async fn open(
        journal: Arc<dyn FactJournal>,
        clock: Arc<dyn PhysicalClock>,
    ) -> Result<Self, LedgerError> {
        let envelopes = journal.load().await?;
        let mut ledger = JobLedger::new();
        for (expected, envelope) in envelopes.iter().enumerate() {
            if envelope.seq != expected as u64 {
                return Err(LedgerError::replay(format!(
                    "expected seq {expected}, found {}",
                    envelope.seq
                )));
            }
            ledger.reduce(&envelope.fact).map_err(|e| {
                LedgerError::replay(format!("fact {} does not apply: {e}", envelope.seq))
            })?;
        }

        tracing::info!(
            facts = ledger.facts_applied(),
            jobs = ledger.jobs_count(),
            "Ledger replayed from journal"
        );

        Ok(Self {
            state: Arc::new(RwLock::new(ledger)),
            journal,
            clock,
            poisoned: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Empty ledger backed by an in-memory journal and the system clock.
    pub fn in_memory() -> Self {
        Self {
            state: Arc::new(RwLock::new(JobLedger::new())),
            journal: Arc::new(MemoryJournal::new()),
            clock: Arc::new(SystemClock),
            poisoned: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Plan, journal and reduce one mutation under the write lock.
    async fn commit<F>(
        &self,
        operation: &'static str,
        caller: Address,
        plan: F,
    ) -> Result<LedgerFact, LedgerError>
    where
        F: FnOnce(&JobLedger, PhysicalTime) -> Result<LedgerFact, LedgerError>,
    {
        let mut ledger = self.state.write().await;
        if self.poisoned.load(Ordering::SeqCst) {
            return Err(LedgerError::Poisoned);
        }
        let now = self.clock.physical_time().await;

        let fact = match plan(&ledger, now) {
            Ok(fact) => fact,
            Err(e) => {
                tracing::warn!(
                    operation,
                    caller = %caller,
                    error = %e,
                    "Ledger operation rejected"
                );
                return Err(e);
            }
        };

        let envelope = FactEnvelope::new(ledger.facts_applied(), fact);
        if let Err(e) = self.journal.append(&envelope).await {
            tracing::error!(
                operation,
                caller = %caller,
                error = %e,
                "Journal append failed"
            );
            self.check_journal_after_failed_append(ledger.facts_applied())
                .await;
            return Err(e);
        }
        ledger.reduce(&envelope.fact)?;

        tracing::info!(
            operation,
            caller = %caller,
            seq = envelope.seq,
            job_id = ?envelope.fact.job_id(),
            at_ms = envelope.fact.timestamp_ms(),
            "Ledger operation applied"
        );
        Ok(envelope.fact)
    }

    /// Poison the service unless the journal still holds exactly the facts
    /// in memory. Called with the write lock held.
    async fn check_journal_after_failed_append(&self, in_memory: u64) {
        let found = match self.journal.load().await {
            Ok(envelopes) if envelopes.len() as u64 == in_memory => return,
            Ok(envelopes) => envelopes.len().to_string(),
            Err(e) => e.to_string(),
        };
        self.poisoned.store(true, Ordering::SeqCst);
        tracing::error!(
            expected = in_memory,
            found = %found,
            "Journal diverged from memory, refusing further mutations"
        );
    }

    /// Whether a failed append left the service read-only.
    pub fn is_poisoned(&self) -> bool {
        self.poisoned.load(Ordering::SeqCst)
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    /// Set the caller's role, overwriting any previous one.
    pub async fn register(&self, caller: Address, role: Role) -> Result<(), LedgerError> {
        self.commit("register", caller, |ledger, now| {
            ledger.plan_register(caller, role, now)
        })
        .await
        .map(|_| ())
    }

    /// Post a job as the caller and return its id.
    pub async fn create_job(
        &self,
        caller: Address,
        listing: JobListing,
    ) -> Result<JobId, LedgerError> {
        let fact = self
            .commit("create_job", caller, |ledger, now| {
                ledger.plan_create_job(caller, listing, now)
            })
            .await?;
        match fact {
            LedgerFact::JobPosted { job_id, .. } => Ok(job_id),
            other => Err(LedgerError::replay(format!(
                "create_job produced {}",
                other.sub_type()
            ))),
        }
    }

    /// Apply to a job as the caller.
    pub async fn apply_to_job(
        &self,
        caller: Address,
        job_id: JobId,
        resume_cid: impl Into<String>,
    ) -> Result<(), LedgerError> {
        let resume_cid = resume_cid.into();
        self.commit("apply_to_job", caller, |ledger, now| {
            ledger.plan_apply(caller, job_id, resume_cid, now)
        })
        .await
        .map(|_| ())
    }

    /// Set an application's review status as the job's employer.
    pub async fn set_application_status(
        &self,
        caller: Address,
        job_id: JobId,
        applicant: Address,
        status: ApplicationStatus,
    ) -> Result<(), LedgerError> {
        self.commit("set_application_status", caller, |ledger, now| {
            ledger.plan_set_application_status(caller, job_id, applicant, status, now)
        })
        .await
        .map(|_| ())
    }

    /// Open or close a job as its employer.
    pub async fn set_job_open(
        &self,
        caller: Address,
        job_id: JobId,
        is_open: bool,
    ) -> Result<(), LedgerError> {
        self.commit("set_job_open", caller, |ledger, now| {
            ledger.plan_set_job_open(caller, job_id, is_open, now)
        })
        .await
        .map(|_| ())
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// Role held by `address`; `Role::None` if unregistered.
    pub async fn get_role(&self, address: &Address) -> Role {
        self.state.read().await.role(address)
    }

    /// Look up a job.
    pub async fn get_job(&self, job_id: JobId) -> Result<Job, LedgerError> {
        let ledger = self.state.read().await;
        let job = ledger.job(job_id).cloned();
        tracing::debug!(job_id = %job_id, found = job.is_ok(), "Job lookup");
        job
    }

    /// Number of jobs ever created.
    pub async fn get_jobs_count(&self) -> u64 {
        self.state.read().await.jobs_count()
    }

    /// Application for the pair; an absent pair yields status `None`.
    pub async fn get_application(&self, job_id: JobId, applicant: &Address) -> Application {
        self.state.read().await.application(job_id, applicant)
    }

    /// Page of jobs in id order.
    pub async fn list_jobs(&self, offset: u64, limit: usize) -> Vec<Job> {
        self.state.read().await.list_jobs(offset, limit).to_vec()
    }

    /// Jobs owned by `employer`.
    pub async fn jobs_by_employer(&self, employer: &Address) -> Vec<Job> {
        self.state
            .read()
            .await
            .jobs_by_employer(employer)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Applications to a job in submission order.
    pub async fn applicants(
        &self,
        job_id: JobId,
    ) -> Result<Vec<(Address, Application)>, LedgerError> {
        self.state.read().await.applicants(job_id)
    }

    /// Applications submitted by `applicant`.
    pub async fn applications_by_applicant(
        &self,
        applicant: &Address,
    ) -> Vec<(JobId, Application)> {
        self.state.read().await.applications_by_applicant(applicant)
    }

    /// Number of facts committed so far.
    pub async fn facts_applied(&self) -> u64 {
        self.state.read().await.facts_applied()
    }
}
