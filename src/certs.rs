//! Certificate provisioning
//!
//! Issuance itself lives behind [`CertProvisioner`]. Request handlers go
//! through [`CertCoordinator`], which
//!
//! - coalesces concurrent requests for the same hostname set into one attempt,
//! - runs at most one attempt at a time against the issuer,
//! - runs every attempt on its own task under a hard deadline, so a handler
//!   that is dropped mid-wait neither cancels nor duplicates the attempt.

use async_trait::async_trait;
use futures_util::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

/// Default wait for certificates to converge
pub const DEFAULT_CERT_WAIT: Duration = Duration::from_secs(60);

/// Provisioning errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CertError {
    #[error("no hostnames to provision")]
    NoHosts,

    #[error("certificate provisioning timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("certificate provisioning is not configured")]
    NotConfigured,

    #[error("{0}")]
    Failed(String),

    #[error("provisioning task aborted: {0}")]
    Aborted(String),
}

/// External issuer contract
#[async_trait]
pub trait CertProvisioner: Send + Sync {
    /// Ensure `hosts` have valid certificates, waiting up to `wait`
    async fn ensure_managed(&self, hosts: &[String], wait: Duration) -> Result<(), CertError>;
}

/// Issuer used when no provisioning backend is configured
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledProvisioner;

#[async_trait]
impl CertProvisioner for DisabledProvisioner {
    async fn ensure_managed(&self, _hosts: &[String], _wait: Duration) -> Result<(), CertError> {
        Err(CertError::NotConfigured)
    }
}

/// Delegates issuance to an external command
///
/// The hostnames are appended as arguments. A zero exit status means the
/// certificates are in place; otherwise stderr becomes the error message.
#[derive(Debug, Clone)]
pub struct CommandProvisioner {
    program: String,
    args: Vec<String>,
}

impl CommandProvisioner {
    /// Parse a whitespace-separated command line
    pub fn from_command_line(line: &str) -> Option<Self> {
        let mut parts = line.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self {
            program,
            args: parts.collect(),
        })
    }
}

#[async_trait]
impl CertProvisioner for CommandProvisioner {
    async fn ensure_managed(&self, hosts: &[String], wait: Duration) -> Result<(), CertError> {
        let child = Command::new(&self.program)
            .args(&self.args)
            .args(hosts)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| CertError::Failed(format!("failed to run {}: {}", self.program, e)))?;

        let output = tokio::time::timeout(wait, child.wait_with_output())
            .await
            .map_err(|_| CertError::Timeout(wait))?
            .map_err(|e| CertError::Failed(e.to_string()))?;

        if output.status.success() {
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        Err(CertError::Failed(if stderr.is_empty() {
            format!("{} exited with {}", self.program, output.status)
        } else {
            stderr
        }))
    }
}

type Attempt = Shared<BoxFuture<'static, Result<(), CertError>>>;

/// Single-flight front for a [`CertProvisioner`]
pub struct CertCoordinator {
    provisioner: Arc<dyn CertProvisioner>,
    deadline: Duration,
    issuer: Arc<Semaphore>,
    inflight: Arc<Mutex<HashMap<Vec<String>, Attempt>>>,
}

impl CertCoordinator {
    /// `deadline` bounds queueing plus issuance for each attempt
    pub fn new(provisioner: Arc<dyn CertProvisioner>, deadline: Duration) -> Self {
        Self {
            provisioner,
            deadline,
            issuer: Arc::new(Semaphore::new(1)),
            inflight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    /// Number of distinct hostname sets currently being provisioned
    pub fn in_flight(&self) -> usize {
        self.inflight.lock().len()
    }

    /// Provision `hosts`, joining an identical attempt if one is running
    pub async fn provision(&self, hosts: Vec<String>) -> Result<(), CertError> {
        let key = hostname_key(hosts);
        if key.is_empty() {
            return Err(CertError::NoHosts);
        }

        let attempt = {
            let mut inflight = self.inflight.lock();
            match inflight.get(&key) {
                Some(attempt) => {
                    debug!(hosts = ?key, "Joining in-flight certificate attempt");
                    attempt.clone()
                }
                None => {
                    let attempt = self.launch(key.clone());
                    inflight.insert(key, attempt.clone());
                    attempt
                }
            }
        };

        attempt.await
    }

    fn launch(&self, key: Vec<String>) -> Attempt {
        let provisioner = self.provisioner.clone();
        let issuer = self.issuer.clone();
        let inflight = self.inflight.clone();
        let deadline = self.deadline;

        let task = tokio::spawn(async move {
            info!(hosts = ?key, "Provisioning certificates");
            let run = async {
                let _permit = issuer
                    .acquire_owned()
                    .await
                    .map_err(|e| CertError::Aborted(e.to_string()))?;
                provisioner.ensure_managed(&key, deadline).await
            };
            let result = match tokio::time::timeout(deadline, run).await {
                Ok(result) => result,
                Err(_) => Err(CertError::Timeout(deadline)),
            };
            if let Err(e) = &result {
                warn!(hosts = ?key, "Certificate attempt failed: {}", e);
            }
            inflight.lock().remove(&key);
            result
        });

        async move {
            match task.await {
                Ok(result) => result,
                Err(e) => Err(CertError::Aborted(e.to_string())),
            }
        }
        .boxed()
        .shared()
    }
}

/// Sorted, de-duplicated, lower-cased hostname set
fn hostname_key(hosts: Vec<String>) -> Vec<String> {
    let mut key: Vec<String> = hosts
        .into_iter()
        .map(|h| h.trim().to_lowercase())
        .filter(|h| !h.is_empty())
        .collect();
    key.sort();
    key.dedup();
    key
}
