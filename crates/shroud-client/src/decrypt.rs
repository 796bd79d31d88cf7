//! Decryption request and poll cycle
//!
//! A request is created locally, then driven to exactly one terminal outcome
//! by polling the gateway at a fixed (optionally growing) interval until the
//! plaintext appears, the gateway rejects the request, or the deadline passes.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant, SystemTime};

use alloy_primitives::{Address, Bytes};
use serde::Serialize;
use tracing::{debug, info, warn};

use shroud_core::{Plaintext, TypeTag, DEFAULT_DECRYPT_TIMEOUT_MS, DEFAULT_POLL_INTERVAL_MS};

use crate::error::{ClientError, Result};
use crate::gateway::{GatewayClient, PollStatus};
use crate::metrics;

/// Produces request identifiers
///
/// Identifiers only need to be unique among the requests outstanding on one
/// client. Deployments that learn the identifier from an on-chain event can
/// bypass this entirely with `Client::request_decryption_with_id`.
pub trait RequestIdSource: Send + Sync {
    fn next_id(&self) -> String;
}

/// Random per-source prefix plus a monotonic counter
pub struct LocalRequestIds {
    prefix: u64,
    counter: AtomicU64,
}

impl LocalRequestIds {
    pub fn new() -> Self {
        Self {
            prefix: rand::random(),
            counter: AtomicU64::new(0),
        }
    }
}

impl Default for LocalRequestIds {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestIdSource for LocalRequestIds {
    fn next_id(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        format!("{:016x}-{}", self.prefix, n)
    }
}

/// A pending decryption, consumed by the poll phase
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecryptionRequest {
    pub request_id: String,
    /// Handle or ciphertext the plaintext belongs to
    pub ciphertext: Bytes,
    pub contract: Address,
    /// Type of the ciphertext, used to shape the plaintext
    pub tag: Option<TypeTag>,
    pub created_at: SystemTime,
}

impl DecryptionRequest {
    pub fn new(
        request_id: impl Into<String>,
        ciphertext: impl Into<Bytes>,
        contract: Address,
        tag: Option<TypeTag>,
    ) -> Self {
        Self {
            request_id: request_id.into(),
            ciphertext: ciphertext.into(),
            contract,
            tag,
            created_at: SystemTime::now(),
        }
    }
}

/// Timing for the poll loop
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PollOptions {
    /// Give up once this much time has passed since the first attempt
    pub timeout: Duration,
    /// Delay before the second attempt
    pub poll_interval: Duration,
    /// Interval multiplier per attempt; 1.0 keeps the interval fixed
    pub backoff_factor: f64,
    /// Upper bound on the interval when backing off
    pub max_interval: Duration,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(DEFAULT_DECRYPT_TIMEOUT_MS),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            backoff_factor: 1.0,
            max_interval: Duration::from_millis(DEFAULT_DECRYPT_TIMEOUT_MS),
        }
    }
}

impl PollOptions {
    pub fn new(timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            timeout,
            poll_interval,
            ..Self::default()
        }
    }

    /// Grow the interval by `factor` per attempt, up to `max_interval`
    ///
    /// Factors below 1.0 and NaN keep the interval fixed.
    pub fn with_backoff(mut self, factor: f64, max_interval: Duration) -> Self {
        self.backoff_factor = if factor.is_nan() { 1.0 } else { factor.max(1.0) };
        self.max_interval = max_interval;
        self
    }

    fn next_interval(&self, current: Duration) -> Duration {
        if self.backoff_factor.is_nan() || self.backoff_factor <= 1.0 {
            return current;
        }
        Duration::try_from_secs_f64(current.as_secs_f64() * self.backoff_factor)
            .unwrap_or(self.max_interval)
            .min(self.max_interval)
    }
}

/// Why a request ended in the failed state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// Gateway explicitly refused the request
    Rejected(String),
    /// Gateway answered with a value that does not fit the ciphertext type
    InvalidPlaintext(String),
}

/// Terminal state of one decryption request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecryptionOutcome {
    Resolved(Plaintext),
    TimedOut { elapsed: Duration, attempts: u32 },
    Failed(FailureReason),
}

impl DecryptionOutcome {
    pub fn is_resolved(&self) -> bool {
        matches!(self, DecryptionOutcome::Resolved(_))
    }

    /// Convert into the caller-facing result for `request_id`
    pub fn into_result(self, request_id: &str) -> Result<Plaintext> {
        match self {
            DecryptionOutcome::Resolved(plain) => Ok(plain),
            DecryptionOutcome::TimedOut { elapsed, .. } => Err(ClientError::DecryptionTimeout {
                request_id: request_id.to_string(),
                elapsed_ms: elapsed.as_millis() as u64,
            }),
            DecryptionOutcome::Failed(FailureReason::Rejected(reason)) => {
                Err(ClientError::DecryptionRejected {
                    request_id: request_id.to_string(),
                    reason,
                })
            }
            DecryptionOutcome::Failed(FailureReason::InvalidPlaintext(reason)) => {
                Err(ClientError::InvalidPlaintext {
                    request_id: request_id.to_string(),
                    reason,
                })
            }
        }
    }
}

/// Poll the gateway until `request` reaches a terminal state
///
/// Transient failures of a single attempt are logged and retried at the next
/// interval; they never end the loop on their own. Each attempt is also
/// bounded by the remaining time so a hung connection cannot outlive the
/// deadline.
pub async fn drive_decryption(
    gateway: &GatewayClient,
    request: &DecryptionRequest,
    opts: PollOptions,
) -> DecryptionOutcome {
    let request_id = request.request_id.as_str();
    let started = Instant::now();
    // A timeout too large to represent polls without a deadline
    let deadline = started.checked_add(opts.timeout);
    let mut interval = opts.poll_interval;
    let mut attempts: u32 = 0;

    debug!(
        request_id,
        timeout_ms = opts.timeout.as_millis() as u64,
        interval_ms = opts.poll_interval.as_millis() as u64,
        "Polling for decryption"
    );

    let outcome = loop {
        attempts = attempts.saturating_add(1);
        let attempt = gateway.poll_decryption(request_id);
        let polled = match deadline {
            Some(deadline) => {
                let remaining = deadline.saturating_duration_since(Instant::now());
                tokio::time::timeout(remaining, attempt).await
            }
            None => Ok(attempt.await),
        };

        match polled {
            Ok(Ok(PollStatus::Ready(value))) => {
                metrics::record_poll_attempt(false);
                break match Plaintext::from_json(&value, request.tag) {
                    Ok(plain) => DecryptionOutcome::Resolved(plain),
                    Err(e) => DecryptionOutcome::Failed(FailureReason::InvalidPlaintext(e.to_string())),
                };
            }
            Ok(Ok(PollStatus::Rejected(reason))) => {
                metrics::record_poll_attempt(false);
                break DecryptionOutcome::Failed(FailureReason::Rejected(reason));
            }
            Ok(Ok(PollStatus::Pending)) => {
                metrics::record_poll_attempt(false);
                debug!(request_id, attempt = attempts, "Decryption pending");
            }
            Ok(Err(e)) => {
                metrics::record_poll_attempt(true);
                warn!(request_id, attempt = attempts, error = %e, "Decryption poll failed, will retry");
            }
            Err(_) => {
                metrics::record_poll_attempt(true);
                warn!(request_id, attempt = attempts, "Decryption poll hit the deadline");
            }
        }

        let now = Instant::now();
        let wait = match deadline {
            Some(deadline) if now >= deadline => {
                break DecryptionOutcome::TimedOut {
                    elapsed: now - started,
                    attempts,
                };
            }
            Some(deadline) => interval.min(deadline - now),
            None => interval,
        };

        tokio::time::sleep(wait).await;
        interval = opts.next_interval(interval);
    };

    let elapsed = started.elapsed();
    match &outcome {
        DecryptionOutcome::Resolved(_) => {
            info!(request_id, attempts, elapsed_ms = elapsed.as_millis() as u64, "Decryption resolved");
            metrics::record_decryption(metrics::OUTCOME_RESOLVED, elapsed);
        }
        DecryptionOutcome::TimedOut { .. } => {
            info!(request_id, attempts, elapsed_ms = elapsed.as_millis() as u64, "Decryption timed out");
            metrics::record_decryption(metrics::OUTCOME_TIMED_OUT, elapsed);
        }
        DecryptionOutcome::Failed(FailureReason::Rejected(reason)) => {
            info!(request_id, attempts, reason = %reason, "Decryption rejected");
            metrics::record_decryption(metrics::OUTCOME_REJECTED, elapsed);
        }
        DecryptionOutcome::Failed(FailureReason::InvalidPlaintext(reason)) => {
            warn!(request_id, attempts, reason = %reason, "Gateway returned unusable plaintext");
            metrics::record_decryption(metrics::OUTCOME_INVALID, elapsed);
        }
    }

    outcome
}

/// Poll until terminal and surface the outcome as a result
pub async fn await_decryption(
    gateway: &GatewayClient,
    request: &DecryptionRequest,
    opts: PollOptions,
) -> Result<Plaintext> {
    drive_decryption(gateway, request, opts)
        .await
        .into_result(&request.request_id)
}
