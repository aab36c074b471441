use rand::Rng;
use std::time::Duration;

use super::classify;
use super::error::ChunkError;

/// Default number of retries after the initial attempt.
pub const MAX_RETRIES: u32 = 10;

/// HTTP statuses retried by default.
pub const RETRIABLE_STATUS_CODES: [u16; 4] = [500, 502, 503, 504];

/// Exponents above this are clamped so `2^n` stays finite in a `Duration`.
const MAX_BACKOFF_EXPONENT: u32 = 30;

/// Outcome of classifying a chunk error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Retriable,
    Fatal,
}

/// Decision returned by the retry policy for one failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Do not retry this error.
    NoRetry,
    /// Retries are used up; the error was retriable but the budget is spent.
    Exhausted,
    /// Retry after the given delay.
    RetryAfter(Duration),
}

/// Exponential backoff with full jitter and a retry cap.
///
/// Immutable once built; pass a modified copy to override per call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of retries (not counting the first attempt).
    pub max_retries: u32,
    /// HTTP statuses that count as transient server errors.
    pub retriable_status_codes: Vec<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: MAX_RETRIES,
            retriable_status_codes: RETRIABLE_STATUS_CODES.to_vec(),
        }
    }
}

impl RetryPolicy {
    /// Classify a chunk error against this policy's status set.
    pub fn classify(&self, e: &ChunkError) -> Classification {
        classify::classify(e, &self.retriable_status_codes)
    }

    /// `uniform(0,1) * 2^attempt` seconds, so always in `[0, 2^attempt)`.
    pub fn backoff_delay<R: Rng + ?Sized>(&self, attempt: u32, rng: &mut R) -> Duration {
        let max_sleep = 2f64.powi(attempt.min(MAX_BACKOFF_EXPONENT) as i32);
        let factor: f64 = rng.gen_range(0.0..1.0);
        Duration::from_secs_f64(factor * max_sleep)
    }

    /// Decide what to do after `attempt` retriable failures (1-based).
    pub fn decide<R: Rng + ?Sized>(
        &self,
        attempt: u32,
        error: &ChunkError,
        rng: &mut R,
    ) -> RetryDecision {
        match self.classify(error) {
            Classification::Fatal => RetryDecision::NoRetry,
            Classification::Retriable if attempt > self.max_retries => RetryDecision::Exhausted,
            Classification::Retriable => RetryDecision::RetryAfter(self.backoff_delay(attempt, rng)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::TransportKind;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn defaults_match_upload_constants() {
        let p = RetryPolicy::default();
        assert_eq!(p.max_retries, 10);
        assert_eq!(p.retriable_status_codes, vec![500, 502, 503, 504]);
    }

    #[test]
    fn backoff_stays_below_power_of_two() {
        let p = RetryPolicy::default();
        let mut rng = StdRng::seed_from_u64(7);
        for n in 1..=10u32 {
            for _ in 0..200 {
                let d = p.backoff_delay(n, &mut rng);
                assert!(d < Duration::from_secs(1u64 << n), "attempt {n}: {d:?}");
            }
        }
    }

    #[test]
    fn no_retry_for_fatal() {
        let p = RetryPolicy::default();
        let mut rng = StdRng::seed_from_u64(1);
        let e = ChunkError::http(403, "forbidden");
        assert_eq!(p.decide(1, &e, &mut rng), RetryDecision::NoRetry);
    }

    #[test]
    fn respects_max_retries() {
        let p = RetryPolicy {
            max_retries: 2,
            ..RetryPolicy::default()
        };
        let mut rng = StdRng::seed_from_u64(3);
        let e = ChunkError::transport(TransportKind::ConnectionReset, "reset by peer");
        assert!(matches!(p.decide(1, &e, &mut rng), RetryDecision::RetryAfter(_)));
        assert!(matches!(p.decide(2, &e, &mut rng), RetryDecision::RetryAfter(_)));
        assert_eq!(p.decide(3, &e, &mut rng), RetryDecision::Exhausted);
    }

    #[test]
    fn custom_status_set_is_honoured() {
        let p = RetryPolicy {
            retriable_status_codes: vec![429],
            ..RetryPolicy::default()
        };
        assert_eq!(p.classify(&ChunkError::http(429, "")), Classification::Retriable);
        assert_eq!(p.classify(&ChunkError::http(503, "")), Classification::Fatal);
    }
}
