//! Shared in-memory fakes for unit tests.
//!
//! [`FakeStore`] stands in for the `SQLite` database, [`RecordingQueue`] for
//! the job runner, and [`FakeIssuer`] for a certificate authority.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::issuer::{CertificateIssuer, IssueError, IssuedCertificate};
use crate::jobqueue::{ActionQueue, Job, QueueError};
use crate::storage::{
    Certificate, CertificateAuthority, CertificateStatus, CertificateStore, CertificateType,
    DatabaseError, DnsProvider, ListQuery,
};

/// A ready, automatable record with a certificate authority.
pub fn ready_certificate(id: i64, name: &str) -> Certificate {
    let mut cert = Certificate::new(
        CertificateType::Http,
        name,
        vec![format!("{name}.example.com")],
    );
    cert.id = id;
    cert.certificate_authority_id = 1;
    cert.status = CertificateStatus::Ready;
    cert
}

#[derive(Default)]
pub struct FakeStore {
    pub certificates: Mutex<Vec<Certificate>>,
    pub unavailable: AtomicBool,
    pub calls: AtomicUsize,
    pub claims: Mutex<Vec<i64>>,
    /// Makes `mark_certificate_valid` fail while other writes succeed.
    pub fail_mark_valid: AtomicBool,
}

impl FakeStore {
    pub fn with_certificates(certificates: Vec<Certificate>) -> Self {
        Self {
            certificates: Mutex::new(certificates),
            ..Self::default()
        }
    }

    pub fn unavailable() -> Self {
        let store = Self::default();
        store.unavailable.store(true, Ordering::SeqCst);
        store
    }

    pub fn failing_mark_valid(certificates: Vec<Certificate>) -> Self {
        let store = Self::with_certificates(certificates);
        store.fail_mark_valid.store(true, Ordering::SeqCst);
        store
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn certificate(&self, id: i64) -> Option<Certificate> {
        self.certificates
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.id == id)
            .cloned()
    }

    fn enter(&self) -> Result<(), DatabaseError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(DatabaseError::Unavailable("fake store is offline".into()));
        }
        Ok(())
    }

    fn with_record<T>(
        &self,
        id: i64,
        f: impl FnOnce(&mut Certificate) -> T,
    ) -> Result<T, DatabaseError> {
        let mut certificates = self.certificates.lock().unwrap();
        certificates
            .iter_mut()
            .find(|c| c.id == id)
            .map(f)
            .ok_or_else(|| DatabaseError::NotFound(format!("Certificate {id}")))
    }
}

#[async_trait]
impl CertificateStore for FakeStore {
    async fn insert_certificate(&self, cert: &Certificate) -> Result<i64, DatabaseError> {
        self.enter()?;
        let mut certificates = self.certificates.lock().unwrap();
        let id = certificates.iter().map(|c| c.id).max().unwrap_or(0) + 1;
        let mut stored = cert.clone();
        stored.id = id;
        certificates.push(stored);
        Ok(id)
    }

    async fn update_certificate(&self, cert: &Certificate) -> Result<(), DatabaseError> {
        self.enter()?;
        self.with_record(cert.id, |stored| *stored = cert.clone())
    }

    async fn get_certificate(&self, id: i64) -> Result<Certificate, DatabaseError> {
        self.enter()?;
        self.with_record(id, |stored| stored.clone())
    }

    async fn soft_delete_certificate(&self, id: i64) -> Result<bool, DatabaseError> {
        self.enter()?;
        self.with_record(id, |stored| !std::mem::replace(&mut stored.is_deleted, true))
    }

    async fn count_certificates(&self, _query: &ListQuery) -> Result<i64, DatabaseError> {
        self.enter()?;
        let certificates = self.certificates.lock().unwrap();
        Ok(i64::try_from(certificates.iter().filter(|c| !c.is_deleted).count()).unwrap())
    }

    async fn list_certificates(&self, _query: &ListQuery) -> Result<Vec<Certificate>, DatabaseError> {
        self.enter()?;
        let certificates = self.certificates.lock().unwrap();
        Ok(certificates.iter().filter(|c| !c.is_deleted).cloned().collect())
    }

    async fn select_certificates_by_status(
        &self,
        status: CertificateStatus,
        types: &[CertificateType],
    ) -> Result<Vec<Certificate>, DatabaseError> {
        self.enter()?;
        let certificates = self.certificates.lock().unwrap();
        Ok(certificates
            .iter()
            .filter(|c| c.is_eligible(status, types))
            .cloned()
            .collect())
    }

    async fn claim_certificate(
        &self,
        id: i64,
        from: CertificateStatus,
        to: CertificateStatus,
    ) -> Result<bool, DatabaseError> {
        self.enter()?;
        let claimed = self
            .with_record(id, |stored| {
                if stored.status == from && !stored.is_deleted {
                    stored.status = to;
                    true
                } else {
                    false
                }
            })
            .unwrap_or(false);
        if claimed {
            self.claims.lock().unwrap().push(id);
        }
        Ok(claimed)
    }

    async fn mark_certificate_valid(&self, id: i64, expires_on: i64) -> Result<bool, DatabaseError> {
        self.enter()?;
        if self.fail_mark_valid.load(Ordering::SeqCst) {
            return Err(DatabaseError::Unavailable("fake store lost the write".into()));
        }
        self.with_record(id, |stored| {
            if stored.status != CertificateStatus::Provisioning || stored.is_deleted {
                return false;
            }
            stored.status = CertificateStatus::Valid;
            stored.expires_on = Some(expires_on);
            stored.error_message.clear();
            true
        })
    }

    async fn mark_certificate_error(&self, id: i64, message: &str) -> Result<bool, DatabaseError> {
        self.enter()?;
        self.with_record(id, |stored| {
            if stored.status != CertificateStatus::Provisioning || stored.is_deleted {
                return false;
            }
            stored.status = CertificateStatus::Error;
            stored.error_message = message.to_string();
            true
        })
    }

    async fn get_certificate_authority(
        &self,
        id: i64,
    ) -> Result<CertificateAuthority, DatabaseError> {
        self.enter()?;
        Err(DatabaseError::NotFound(format!("Certificate authority {id}")))
    }

    async fn get_dns_provider(&self, id: i64) -> Result<DnsProvider, DatabaseError> {
        self.enter()?;
        Err(DatabaseError::NotFound(format!("DNS provider {id}")))
    }
}

/// Keeps every accepted job so tests can inspect and run them.
#[derive(Default)]
pub struct RecordingQueue {
    pub jobs: Mutex<Vec<Job>>,
    /// Zero-based enqueue attempts that fail with `QueueError::Full`.
    pub fail_attempts: HashSet<usize>,
    pub attempts: AtomicUsize,
}

impl RecordingQueue {
    pub fn failing_on(attempts: &[usize]) -> Self {
        Self {
            fail_attempts: attempts.iter().copied().collect(),
            ..Self::default()
        }
    }

    pub fn attempt_count(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn job_names(&self) -> Vec<String> {
        self.jobs.lock().unwrap().iter().map(|j| j.name.clone()).collect()
    }

    /// Run every recorded job in order, returning their results.
    pub async fn run_all(&self) -> Vec<anyhow::Result<()>> {
        let jobs = std::mem::take(&mut *self.jobs.lock().unwrap());
        let mut results = Vec::with_capacity(jobs.len());
        for job in jobs {
            results.push((job.action)().await);
        }
        results
    }
}

impl ActionQueue for RecordingQueue {
    fn enqueue(&self, job: Job) -> Result<(), QueueError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail_attempts.contains(&attempt) {
            return Err(QueueError::Full(job.name));
        }
        self.jobs.lock().unwrap().push(job);
        Ok(())
    }
}

/// Issuer that succeeds with a fixed expiry or fails with a fixed message.
pub struct FakeIssuer {
    pub outcome: Result<i64, String>,
    pub issued: Mutex<Vec<i64>>,
}

impl FakeIssuer {
    pub fn succeeding(expires_on: i64) -> Self {
        Self {
            outcome: Ok(expires_on),
            issued: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            outcome: Err(message.to_string()),
            issued: Mutex::new(Vec::new()),
        }
    }

    pub fn issued_ids(&self) -> Vec<i64> {
        self.issued.lock().unwrap().clone()
    }
}

#[async_trait]
impl CertificateIssuer for FakeIssuer {
    async fn issue(&self, cert: &Certificate) -> Result<IssuedCertificate, IssueError> {
        self.issued.lock().unwrap().push(cert.id);
        match &self.outcome {
            Ok(expires_on) => Ok(IssuedCertificate {
                expires_on: *expires_on,
            }),
            Err(message) => Err(IssueError::Generation(message.clone())),
        }
    }
}
