//! Command handlers
//!
//! Every handler opens the ledger from the configured journal, performs a
//! single operation and returns a JSON value for the caller to print.

use anyhow::{Context, Result};
use clap::Subcommand;
use jobchain_ledger::{
    Address, ApplicationStatus, FileJournal, JobId, JobListing, LedgerConfig, LedgerService,
    Role, SystemClock,
};
use serde_json::{json, Value};
use std::sync::Arc;

/// Ledger operations exposed on the command line.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Register (or re-register) the caller's role
    Register {
        /// Acting account address
        #[arg(long)]
        caller: Address,
        /// job-seeker, employer or validator (or numeric code)
        #[arg(long)]
        role: Role,
    },

    /// Post a job as an employer
    PostJob {
        /// Acting account address
        #[arg(long)]
        caller: Address,
        /// Job title
        #[arg(long)]
        title: String,
        /// Hiring company
        #[arg(long, default_value = "")]
        company: String,
        /// Location
        #[arg(long, default_value = "")]
        location: String,
        /// Employment type, e.g. Full-time
        #[arg(long, default_value = "")]
        job_type: String,
        /// Content address of the job description
        #[arg(long, default_value = "")]
        description_cid: String,
    },

    /// Apply to a job as a job seeker
    Apply {
        /// Acting account address
        #[arg(long)]
        caller: Address,
        /// Job id
        #[arg(long)]
        job: u64,
        /// Content address of the resume
        #[arg(long)]
        resume_cid: String,
    },

    /// Set an application's review status as the job's employer
    SetStatus {
        /// Acting account address
        #[arg(long)]
        caller: Address,
        /// Job id
        #[arg(long)]
        job: u64,
        /// Applicant address
        #[arg(long)]
        applicant: Address,
        /// shortlisted, accepted or rejected (or numeric code)
        #[arg(long)]
        status: ApplicationStatus,
    },

    /// Open or close a job as its employer
    SetOpen {
        /// Acting account address
        #[arg(long)]
        caller: Address,
        /// Job id
        #[arg(long)]
        job: u64,
        /// true to open, false to close
        #[arg(long, action = clap::ArgAction::Set)]
        open: bool,
    },

    /// Show an account's role
    Role {
        /// Account address
        address: Address,
    },

    /// Show one job
    Job {
        /// Job id
        id: u64,
    },

    /// List jobs in id order
    Jobs {
        /// First job id to return
        #[arg(long, default_value = "0")]
        offset: u64,
        /// Page size
        #[arg(long, default_value = "20")]
        limit: usize,
    },

    /// Show the number of jobs ever posted
    Count,

    /// Show an application
    Application {
        /// Job id
        #[arg(long)]
        job: u64,
        /// Applicant address
        #[arg(long)]
        applicant: Address,
    },

    /// List applications to a job
    Applicants {
        /// Job id
        job: u64,
    },

    /// List jobs posted by an employer
    EmployerJobs {
        /// Employer address
        employer: Address,
    },

    /// List applications submitted by an applicant
    MyApplications {
        /// Applicant address
        applicant: Address,
    },
}

/// Replay the configured journal into a service.
pub async fn open_service(config: &LedgerConfig) -> Result<LedgerService> {
    let journal = Arc::new(FileJournal::new(config.journal_path()));
    tracing::debug!(journal = %journal.path().display(), "Opening ledger");
    LedgerService::open(journal, Arc::new(SystemClock))
        .await
        .with_context(|| format!("opening journal {}", config.journal_path().display()))
}

/// Execute one command and return its JSON result.
pub async fn run(command: Command, config: &LedgerConfig) -> Result<Value> {
    let service = open_service(config).await?;
    execute(&service, command).await
}

async fn execute(service: &LedgerService, command: Command) -> Result<Value> {
    let output = match command {
        Command::Register { caller, role } => {
            service.register(caller, role).await?;
            json!({ "address": caller, "role": role })
        }
        Command::PostJob {
            caller,
            title,
            company,
            location,
            job_type,
            description_cid,
        } => {
            let listing = JobListing::new(title, company, location, job_type, description_cid);
            let job_id = service.create_job(caller, listing).await?;
            json!({ "job_id": job_id })
        }
        Command::Apply {
            caller,
            job,
            resume_cid,
        } => {
            let job_id = JobId::new(job);
            service.apply_to_job(caller, job_id, resume_cid).await?;
            json!({
                "job_id": job_id,
                "applicant": caller,
                "application": service.get_application(job_id, &caller).await,
            })
        }
        Command::SetStatus {
            caller,
            job,
            applicant,
            status,
        } => {
            let job_id = JobId::new(job);
            service
                .set_application_status(caller, job_id, applicant, status)
                .await?;
            json!({
                "job_id": job_id,
                "applicant": applicant,
                "application": service.get_application(job_id, &applicant).await,
            })
        }
        Command::SetOpen { caller, job, open } => {
            let job_id = JobId::new(job);
            service.set_job_open(caller, job_id, open).await?;
            serde_json::to_value(service.get_job(job_id).await?)?
        }
        Command::Role { address } => {
            json!({ "address": address, "role": service.get_role(&address).await })
        }
        Command::Job { id } => serde_json::to_value(service.get_job(JobId::new(id)).await?)?,
        Command::Jobs { offset, limit } => {
            json!({
                "count": service.get_jobs_count().await,
                "jobs": service.list_jobs(offset, limit).await,
            })
        }
        Command::Count => json!({ "count": service.get_jobs_count().await }),
        Command::Application { job, applicant } => {
            let job_id = JobId::new(job);
            let application = service.get_application(job_id, &applicant).await;
            json!({
                "job_id": job_id,
                "applicant": applicant,
                "submitted": application.exists(),
                "application": application,
            })
        }
        Command::Applicants { job } => {
            let applicants = service.applicants(JobId::new(job)).await?;
            let entries: Vec<Value> = applicants
                .into_iter()
                .map(|(applicant, application)| {
                    json!({ "applicant": applicant, "application": application })
                })
                .collect();
            json!({ "job_id": job, "applicants": entries })
        }
        Command::EmployerJobs { employer } => {
            json!({ "employer": employer, "jobs": service.jobs_by_employer(&employer).await })
        }
        Command::MyApplications { applicant } => {
            let entries: Vec<Value> = service
                .applications_by_applicant(&applicant)
                .await
                .into_iter()
                .map(|(job_id, application)| {
                    json!({ "job_id": job_id, "application": application })
                })
                .collect();
            json!({ "applicant": applicant, "applications": entries })
        }
    };
    Ok(output)
}
