//! Resumable upload driver: send chunks until the server hands back an id,
//! retrying transient failures with jittered exponential backoff.

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::control::{CancelToken, Delay};
use crate::retry::{ChunkError, RetryDecision, RetryPolicy};

use super::error::UploadError;

/// Result of one successful "send next chunk" call.
#[derive(Debug, Clone, PartialEq)]
pub enum ChunkOutcome {
    /// Server confirmed `bytes_sent` of `total_bytes`; no final response yet.
    Progress { bytes_sent: u64, total_bytes: u64 },
    /// Final response body of the upload.
    Complete(serde_json::Value),
}

/// Anything that can push the next piece of an upload to the server.
pub trait ChunkSender {
    fn next_chunk(&mut self) -> Result<ChunkOutcome, ChunkError>;
}

impl<F> ChunkSender for F
where
    F: FnMut() -> Result<ChunkOutcome, ChunkError>,
{
    fn next_chunk(&mut self) -> Result<ChunkOutcome, ChunkError> {
        self()
    }
}

/// Per-run bookkeeping; discarded once the run reaches a terminal state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UploadAttempt {
    /// Retriable failures seen so far.
    pub attempt_number: u32,
    pub last_error: Option<ChunkError>,
    /// Resource id, set only on success.
    pub response: Option<String>,
}

enum State {
    Sending,
    Retrying(ChunkError),
    Succeeded(String),
    Failed(UploadError),
}

/// Drives a [`ChunkSender`] to a terminal outcome.
///
/// One chunk is in flight at a time. The only suspension point is the
/// injected [`Delay`] between retries.
pub struct ResumableUploadDriver<D: Delay> {
    policy: RetryPolicy,
    delay: D,
    cancel: CancelToken,
    rng: StdRng,
    last_attempt: Option<UploadAttempt>,
}

impl<D: Delay> ResumableUploadDriver<D> {
    pub fn new(policy: RetryPolicy, delay: D) -> Self {
        Self {
            policy,
            delay,
            cancel: CancelToken::new(),
            rng: StdRng::from_entropy(),
            last_attempt: None,
        }
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Fix the jitter sequence (tests, reproducible runs).
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Bookkeeping of the most recent finished [`run`](Self::run).
    pub fn last_attempt(&self) -> Option<&UploadAttempt> {
        self.last_attempt.as_ref()
    }

    /// Run until success, a fatal error, exhausted retries or cancellation.
    pub fn run<S: ChunkSender + ?Sized>(&mut self, sender: &mut S) -> Result<String, UploadError> {
        self.last_attempt = None;
        let mut attempt = UploadAttempt::default();
        let mut state = State::Sending;
        loop {
            state = match state {
                State::Sending => self.send(sender, &mut attempt),
                State::Retrying(e) => self.retry(e, &mut attempt),
                State::Succeeded(id) => {
                    attempt.response = Some(id.clone());
                    tracing::info!(video_id = %id, retries = attempt.attempt_number, "upload complete");
                    self.last_attempt = Some(attempt);
                    return Ok(id);
                }
                State::Failed(e) => {
                    tracing::error!(retries = attempt.attempt_number, "upload failed: {}", e);
                    self.last_attempt = Some(attempt);
                    return Err(e);
                }
            };
        }
    }

    fn send<S: ChunkSender + ?Sized>(&mut self, sender: &mut S, attempt: &mut UploadAttempt) -> State {
        if self.cancel.is_cancelled() {
            return State::Failed(UploadError::Cancelled);
        }
        tracing::info!(attempt = attempt.attempt_number, "uploading file...");
        match sender.next_chunk() {
            Ok(ChunkOutcome::Progress {
                bytes_sent,
                total_bytes,
            }) => {
                attempt.last_error = None;
                let pct = if total_bytes > 0 {
                    bytes_sent as f64 / total_bytes as f64 * 100.0
                } else {
                    100.0
                };
                tracing::info!(bytes_sent, total_bytes, "uploaded {:.1}%", pct);
                State::Sending
            }
            Ok(ChunkOutcome::Complete(response)) => {
                attempt.last_error = None;
                match response.get("id").and_then(|v| v.as_str()) {
                    Some(id) => State::Succeeded(id.to_string()),
                    None => State::Failed(UploadError::UnexpectedResponse(response)),
                }
            }
            Err(e) => State::Retrying(e),
        }
    }

    fn retry(&mut self, error: ChunkError, attempt: &mut UploadAttempt) -> State {
        let next = attempt.attempt_number + 1;
        match self.policy.decide(next, &error, &mut self.rng) {
            RetryDecision::NoRetry => {
                attempt.last_error = Some(error.clone());
                State::Failed(UploadError::Fatal(error))
            }
            RetryDecision::Exhausted => {
                attempt.attempt_number = next;
                tracing::warn!("a retriable error occurred: {}", error);
                attempt.last_error = Some(error.clone());
                State::Failed(UploadError::RetriesExhausted {
                    retries: self.policy.max_retries,
                    last_error: error,
                })
            }
            RetryDecision::RetryAfter(delay) => {
                attempt.attempt_number = next;
                tracing::warn!("a retriable error occurred: {}", error);
                tracing::info!(
                    attempt = next,
                    "sleeping {:.6} seconds and then retrying...",
                    delay.as_secs_f64()
                );
                attempt.last_error = Some(error);
                if self.cancel.is_cancelled() {
                    return State::Failed(UploadError::Cancelled);
                }
                self.delay.sleep(delay);
                State::Sending
            }
        }
    }
}
