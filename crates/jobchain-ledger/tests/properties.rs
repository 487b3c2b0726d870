//! Property tests for ledger invariants
//!
//! Random operation sequences are run against a [`JobLedger`]; after every
//! step the invariants are checked against a shadow model.

#![allow(clippy::unwrap_used, clippy::expect_used, missing_docs)]

use jobchain_ledger::{
    Address, ApplicationStatus, JobId, JobLedger, JobListing, LedgerError, PhysicalTime, Role,
};
use proptest::prelude::*;
use std::collections::HashMap;

const ACCOUNTS: u8 = 5;

#[derive(Debug, Clone)]
enum Op {
    Register(u8, Role),
    CreateJob(u8),
    Apply(u8, u64),
    SetStatus(u8, u64, u8, ApplicationStatus),
    SetOpen(u8, u64, bool),
}

fn account(seed: u8) -> Address {
    Address::from_bytes([seed; 20])
}

fn role_strategy() -> impl Strategy<Value = Role> {
    prop_oneof![
        Just(Role::None),
        Just(Role::JobSeeker),
        Just(Role::Employer),
        Just(Role::Validator),
    ]
}

fn status_strategy() -> impl Strategy<Value = ApplicationStatus> {
    prop_oneof![
        Just(ApplicationStatus::None),
        Just(ApplicationStatus::Applied),
        Just(ApplicationStatus::Shortlisted),
        Just(ApplicationStatus::Accepted),
        Just(ApplicationStatus::Rejected),
    ]
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..ACCOUNTS, role_strategy()).prop_map(|(a, r)| Op::Register(a, r)),
        (0..ACCOUNTS).prop_map(Op::CreateJob),
        (0..ACCOUNTS, 0..6u64).prop_map(|(a, j)| Op::Apply(a, j)),
        (0..ACCOUNTS, 0..6u64, 0..ACCOUNTS, status_strategy())
            .prop_map(|(a, j, s, st)| Op::SetStatus(a, j, s, st)),
        (0..ACCOUNTS, 0..6u64, any::<bool>()).prop_map(|(a, j, o)| Op::SetOpen(a, j, o)),
    ]
}

/// Snapshot of everything observable, for comparing before/after a rejection.
fn observe(ledger: &JobLedger) -> (Vec<Role>, u64, Vec<(bool, Address)>, Vec<String>) {
    let roles = (0..ACCOUNTS).map(|a| ledger.role(&account(a))).collect();
    let jobs = ledger
        .list_jobs(0, usize::MAX)
        .iter()
        .map(|job| (job.is_open, job.employer))
        .collect();
    let mut applications = Vec::new();
    for job in 0..ledger.jobs_count() {
        for a in 0..ACCOUNTS {
            let app = ledger.application(JobId::new(job), &account(a));
            applications.push(format!("{job}/{a}/{}/{}", app.status, app.resume_cid));
        }
    }
    (roles, ledger.jobs_count(), jobs, applications)
}

proptest! {
    #[test]
    fn invariants_hold_under_random_operations(ops in prop::collection::vec(op_strategy(), 1..60)) {
        let mut ledger = JobLedger::new();
        let mut last_role: HashMap<u8, Role> = HashMap::new();
        let mut owners: Vec<Address> = Vec::new();
        let mut first_resume: HashMap<(u64, u8), String> = HashMap::new();
        let now = PhysicalTime::from_ms(1);

        for (step, op) in ops.into_iter().enumerate() {
            let before = observe(&ledger);
            let result = match op.clone() {
                Op::Register(a, role) => ledger.register(account(a), role, now),
                Op::CreateJob(a) => {
                    let listing = JobListing::new(format!("job {step}"), "", "", "", "");
                    ledger.create_job(account(a), listing, now).map(|_| ())
                }
                Op::Apply(a, j) => {
                    let resume = format!("resume {step}");
                    ledger.apply_to_job(account(a), JobId::new(j), resume, now)
                }
                Op::SetStatus(a, j, s, status) => {
                    let (job, applicant) = (JobId::new(j), account(s));
                    ledger.set_application_status(account(a), job, applicant, status, now)
                }
                Op::SetOpen(a, j, open) => {
                    ledger.set_job_open(account(a), JobId::new(j), open, now)
                }
            };

            match (&op, &result) {
                (Op::Register(a, role), Ok(())) => {
                    last_role.insert(*a, *role);
                }
                (Op::CreateJob(a), Ok(())) => {
                    prop_assert_eq!(last_role.get(a).copied(), Some(Role::Employer));
                    owners.push(account(*a));
                }
                (Op::Apply(a, j), Ok(())) => {
                    prop_assert_eq!(last_role.get(a).copied(), Some(Role::JobSeeker));
                    let resume = format!("resume {step}");
                    prop_assert!(first_resume.insert((*j, *a), resume).is_none());
                }
                (Op::SetStatus(a, j, _, status), Ok(())) => {
                    prop_assert_eq!(owners[*j as usize], account(*a));
                    prop_assert!(status.is_review_outcome());
                }
                (Op::SetOpen(a, j, _), Ok(())) => {
                    prop_assert_eq!(owners[*j as usize], account(*a));
                }
                (_, Err(e)) => {
                    // Rejections never change anything observable.
                    prop_assert_eq!(&before, &observe(&ledger));
                    prop_assert!(!matches!(e, LedgerError::Journal(_) | LedgerError::Replay(_)));
                }
            }

            // Roles are last-write-wins, unregistered accounts read as None.
            for a in 0..ACCOUNTS {
                prop_assert_eq!(
                    ledger.role(&account(a)),
                    last_role.get(&a).copied().unwrap_or(Role::None)
                );
            }
            // Job ownership never changes and ids stay dense.
            prop_assert_eq!(ledger.jobs_count(), owners.len() as u64);
            for (id, owner) in owners.iter().enumerate() {
                prop_assert_eq!(ledger.job(JobId::new(id as u64)).unwrap().employer, *owner);
            }
            // Resumes are fixed by the first successful application.
            for ((j, a), resume) in &first_resume {
                let app = ledger.application(JobId::new(*j), &account(*a));
                prop_assert_eq!(&app.resume_cid, resume);
                prop_assert_ne!(app.status, ApplicationStatus::None);
            }
        }
    }

    #[test]
    fn replaying_planned_facts_reproduces_ledger(
        ops in prop::collection::vec(op_strategy(), 1..40)
    ) {
        let mut ledger = JobLedger::new();
        let mut facts = Vec::new();
        let now = PhysicalTime::from_ms(7);

        for op in ops {
            let planned = match op {
                Op::Register(a, role) => ledger.plan_register(account(a), role, now),
                Op::CreateJob(a) => ledger.plan_create_job(account(a), JobListing::default(), now),
                Op::Apply(a, j) => ledger.plan_apply(account(a), JobId::new(j), "cid".into(), now),
                Op::SetStatus(a, j, s, status) => {
                    let (job, applicant) = (JobId::new(j), account(s));
                    ledger.plan_set_application_status(account(a), job, applicant, status, now)
                }
                Op::SetOpen(a, j, open) => {
                    ledger.plan_set_job_open(account(a), JobId::new(j), open, now)
                }
            };
            if let Ok(fact) = planned {
                ledger.reduce(&fact).unwrap();
                facts.push(fact);
            }
        }

        let replayed = JobLedger::from_facts(&facts).unwrap();
        prop_assert_eq!(observe(&replayed), observe(&ledger));
        prop_assert_eq!(replayed.facts_applied(), facts.len() as u64);
    }
}
