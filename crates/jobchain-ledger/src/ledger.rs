//! Ledger state machine
//!
//! [`JobLedger`] holds the authoritative state and splits every mutation in
//! two steps:
//!
//! 1. `plan_*` validates the caller against current state and returns the
//!    [`LedgerFact`] describing the change, without touching state.
//! 2. [`JobLedger::reduce`] folds an accepted fact into state.
//!
//! Because validation never mutates, a rejected operation leaves the ledger
//! exactly as it was. The convenience methods (`register`, `create_job`, ...)
//! run both steps for callers that do not need a journal in between.

use crate::error::LedgerError;
use crate::facts::LedgerFact;
use crate::types::{
    Address, Application, ApplicationStatus, Job, JobId, JobListing, PhysicalTime, Role,
};
use std::collections::{BTreeMap, HashMap};

/// Largest page returned by [`JobLedger::list_jobs`].
pub const MAX_PAGE_SIZE: usize = 100;

/// In-memory ledger of roles, jobs and applications.
#[derive(Debug, Clone, Default)]
pub struct JobLedger {
    roles: HashMap<Address, Role>,
    jobs: Vec<Job>,
    applications: BTreeMap<(JobId, Address), Application>,
    /// Applicants per job in submission order
    applicants: HashMap<JobId, Vec<Address>>,
    facts_applied: u64,
}

impl JobLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a ledger by reducing facts in order.
    pub fn from_facts<'a>(
        facts: impl IntoIterator<Item = &'a LedgerFact>,
    ) -> Result<Self, LedgerError> {
        let mut ledger = Self::new();
        for fact in facts {
            ledger.reduce(fact)?;
        }
        Ok(ledger)
    }

    /// Number of facts reduced into this ledger.
    pub fn facts_applied(&self) -> u64 {
        self.facts_applied
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// Role held by `address`; `Role::None` if it never registered.
    pub fn role(&self, address: &Address) -> Role {
        self.roles.get(address).copied().unwrap_or_default()
    }

    /// Number of jobs ever created.
    pub fn jobs_count(&self) -> u64 {
        self.jobs.len() as u64
    }

    /// Look up a job.
    pub fn job(&self, job_id: JobId) -> Result<&Job, LedgerError> {
        job_id
            .index()
            .and_then(|index| self.jobs.get(index))
            .ok_or(LedgerError::JobNotFound(job_id))
    }

    /// Application for the pair, or [`Application::absent`] if none exists.
    pub fn application(&self, job_id: JobId, applicant: &Address) -> Application {
        self.applications
            .get(&(job_id, *applicant))
            .cloned()
            .unwrap_or_else(Application::absent)
    }

    /// Page of jobs in id order. `limit` is clamped to [`MAX_PAGE_SIZE`].
    pub fn list_jobs(&self, offset: u64, limit: usize) -> &[Job] {
        let start = usize::try_from(offset)
            .unwrap_or(usize::MAX)
            .min(self.jobs.len());
        let end = start
            .saturating_add(limit.min(MAX_PAGE_SIZE))
            .min(self.jobs.len());
        &self.jobs[start..end]
    }

    /// Jobs owned by `employer`, in id order.
    pub fn jobs_by_employer(&self, employer: &Address) -> Vec<&Job> {
        self.jobs
            .iter()
            .filter(|job| job.is_owned_by(employer))
            .collect()
    }

    /// Applications to a job in submission order.
    pub fn applicants(&self, job_id: JobId) -> Result<Vec<(Address, Application)>, LedgerError> {
        self.job(job_id)?;
        let applicants = self
            .applicants
            .get(&job_id)
            .map(Vec::as_slice)
            .unwrap_or_default();
        Ok(applicants
            .iter()
            .map(|applicant| (*applicant, self.application(job_id, applicant)))
            .collect())
    }

    /// Applications submitted by `applicant`, in job id order.
    pub fn applications_by_applicant(&self, applicant: &Address) -> Vec<(JobId, Application)> {
        self.applications
            .iter()
            .filter(|((_, who), _)| who == applicant)
            .map(|((job_id, _), application)| (*job_id, application.clone()))
            .collect()
    }

    // ------------------------------------------------------------------
    // Validation
    // ------------------------------------------------------------------

    /// Validate a role registration.
    pub fn plan_register(
        &self,
        caller: Address,
        role: Role,
        now: PhysicalTime,
    ) -> Result<LedgerFact, LedgerError> {
        if !role.is_registrable() {
            return Err(LedgerError::InvalidRole(role));
        }
        Ok(LedgerFact::RoleRegistered {
            account: caller,
            role,
            registered_at: now,
        })
    }

    /// Validate a job posting. Only employers may post.
    pub fn plan_create_job(
        &self,
        caller: Address,
        listing: JobListing,
        now: PhysicalTime,
    ) -> Result<LedgerFact, LedgerError> {
        if self.role(&caller) != Role::Employer {
            return Err(LedgerError::unauthorized("only employers can post jobs"));
        }
        Ok(LedgerFact::JobPosted {
            job_id: JobId::new(self.jobs_count()),
            employer: caller,
            listing,
            created_at: now,
        })
    }

    /// Validate an application.
    ///
    /// Checks run in order: role, job existence, open flag, duplicate.
    pub fn plan_apply(
        &self,
        caller: Address,
        job_id: JobId,
        resume_cid: String,
        now: PhysicalTime,
    ) -> Result<LedgerFact, LedgerError> {
        if self.role(&caller) != Role::JobSeeker {
            return Err(LedgerError::unauthorized("only job seekers can apply"));
        }
        let job = self.job(job_id)?;
        if !job.is_open {
            return Err(LedgerError::JobClosed(job_id));
        }
        if self.applications.contains_key(&(job_id, caller)) {
            return Err(LedgerError::AlreadyApplied {
                job_id,
                applicant: caller,
            });
        }
        Ok(LedgerFact::ApplicationSubmitted {
            job_id,
            applicant: caller,
            resume_cid,
            submitted_at: now,
        })
    }

    /// Validate a status update.
    ///
    /// Checks run in order: job existence, ownership, target status,
    /// application existence. Any review outcome may follow any other.
    pub fn plan_set_application_status(
        &self,
        caller: Address,
        job_id: JobId,
        applicant: Address,
        status: ApplicationStatus,
        now: PhysicalTime,
    ) -> Result<LedgerFact, LedgerError> {
        let job = self.job(job_id)?;
        if !job.is_owned_by(&caller) {
            return Err(LedgerError::unauthorized(
                "only the job's employer can update applications",
            ));
        }
        if !status.is_review_outcome() {
            return Err(LedgerError::InvalidStatus(status));
        }
        if !self.applications.contains_key(&(job_id, applicant)) {
            return Err(LedgerError::ApplicationNotFound { job_id, applicant });
        }
        Ok(LedgerFact::ApplicationStatusUpdated {
            job_id,
            applicant,
            status,
            updated_at: now,
        })
    }

    /// Validate an open/close toggle. Only the owning employer may toggle.
    pub fn plan_set_job_open(
        &self,
        caller: Address,
        job_id: JobId,
        is_open: bool,
        now: PhysicalTime,
    ) -> Result<LedgerFact, LedgerError> {
        let job = self.job(job_id)?;
        if !job.is_owned_by(&caller) {
            return Err(LedgerError::unauthorized(
                "only the job's employer can open or close it",
            ));
        }
        Ok(LedgerFact::JobOpenUpdated {
            job_id,
            is_open,
            updated_at: now,
        })
    }

    // ------------------------------------------------------------------
    // Reduction
    // ------------------------------------------------------------------

    /// Fold an accepted fact into state.
    ///
    /// Only structural consistency is checked here (dense job ids, referenced
    /// records exist, no duplicate application); authorization was settled
    /// when the fact was planned. On error the state is unchanged.
    pub fn reduce(&mut self, fact: &LedgerFact) -> Result<(), LedgerError> {
        match fact {
            LedgerFact::RoleRegistered { account, role, .. } => {
                self.roles.insert(*account, *role);
            }
            LedgerFact::JobPosted {
                job_id,
                employer,
                listing,
                created_at,
            } => {
                if job_id.value() != self.jobs_count() {
                    return Err(LedgerError::replay(format!(
                        "{job_id} posted out of order (next id is {})",
                        self.jobs_count()
                    )));
                }
                self.jobs.push(Job::from_listing(
                    *job_id,
                    *employer,
                    listing.clone(),
                    *created_at,
                ));
            }
            LedgerFact::ApplicationSubmitted {
                job_id,
                applicant,
                resume_cid,
                submitted_at,
            } => {
                self.job(*job_id)?;
                let key = (*job_id, *applicant);
                if self.applications.contains_key(&key) {
                    return Err(LedgerError::AlreadyApplied {
                        job_id: *job_id,
                        applicant: *applicant,
                    });
                }
                self.applications
                    .insert(key, Application::submitted(resume_cid.clone(), *submitted_at));
                self.applicants.entry(*job_id).or_default().push(*applicant);
            }
            LedgerFact::ApplicationStatusUpdated {
                job_id,
                applicant,
                status,
                updated_at,
            } => {
                let application = self
                    .applications
                    .get_mut(&(*job_id, *applicant))
                    .ok_or(LedgerError::ApplicationNotFound {
                        job_id: *job_id,
                        applicant: *applicant,
                    })?;
                application.status = *status;
                application.updated_at = *updated_at;
            }
            LedgerFact::JobOpenUpdated {
                job_id, is_open, ..
            } => {
                let job = job_id
                    .index()
                    .and_then(|index| self.jobs.get_mut(index))
                    .ok_or(LedgerError::JobNotFound(*job_id))?;
                job.is_open = *is_open;
            }
        }
        self.facts_applied += 1;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Direct mutations
    // ------------------------------------------------------------------

    /// Set the caller's role, overwriting any previous one.
    pub fn register(
        &mut self,
        caller: Address,
        role: Role,
        now: PhysicalTime,
    ) -> Result<(), LedgerError> {
        let fact = self.plan_register(caller, role, now)?;
        self.reduce(&fact)
    }

    /// Post a job owned by the caller and return its id.
    pub fn create_job(
        &mut self,
        caller: Address,
        listing: JobListing,
        now: PhysicalTime,
    ) -> Result<JobId, LedgerError> {
        let fact = self.plan_create_job(caller, listing, now)?;
        self.reduce(&fact)?;
        Ok(JobId::new(self.jobs_count() - 1))
    }

    /// Apply to a job as the caller.
    pub fn apply_to_job(
        &mut self,
        caller: Address,
        job_id: JobId,
        resume_cid: impl Into<String>,
        now: PhysicalTime,
    ) -> Result<(), LedgerError> {
        let fact = self.plan_apply(caller, job_id, resume_cid.into(), now)?;
        self.reduce(&fact)
    }

    /// Set an application's review status as the job's employer.
    pub fn set_application_status(
        &mut self,
        caller: Address,
        job_id: JobId,
        applicant: Address,
        status: ApplicationStatus,
        now: PhysicalTime,
    ) -> Result<(), LedgerError> {
        let fact = self.plan_set_application_status(caller, job_id, applicant, status, now)?;
        self.reduce(&fact)
    }

    /// Open or close a job as its employer.
    pub fn set_job_open(
        &mut self,
        caller: Address,
        job_id: JobId,
        is_open: bool,
        now: PhysicalTime,
    ) -> Result<(), LedgerError> {
        let fact = self.plan_set_job_open(caller, job_id, is_open, now)?;
        self.reduce(&fact)
    }
}
