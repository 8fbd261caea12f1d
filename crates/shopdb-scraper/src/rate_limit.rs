//! Retry policy shared by the fetcher and the importer.
//!
//! [`with_retry`] owns the retry loop; callers supply a back-off function
//! that decides, per failed attempt, whether to retry and how long to wait.
//! [`fetch_backoff`] is the policy used for HTTP requests: exponential
//! `2^(attempt+1)` units plus random jitter, transient errors only.

use std::future::Future;
use std::time::Duration;

use crate::error::ScraperError;

/// Executes `operation`, retrying failed attempts up to `max_retries` times.
///
/// After each failure `backoff(retry_index, &err)` is consulted. `None` means
/// the error is not worth retrying and it is returned immediately; `Some(d)`
/// sleeps for `d` and tries again. `retry_index` is 0 for the first retry.
///
/// With `max_retries = 3` the operation runs at most 4 times. When retries
/// are exhausted the last error is returned.
pub async fn with_retry<T, E, F, Fut, B>(
    max_retries: u32,
    mut backoff: B,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    B: FnMut(u32, &E) -> Option<Duration>,
    E: std::fmt::Display,
{
    let mut attempt = 0u32;

    loop {
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        if attempt >= max_retries {
            return Err(err);
        }
        let Some(delay) = backoff(attempt, &err) else {
            return Err(err);
        };

        tracing::warn!(
            attempt = attempt + 1,
            max_retries,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            error = %err,
            "transient error, retrying after backoff"
        );
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        attempt += 1;
    }
}

/// Exponential delay for retry `attempt`: `unit * 2^(attempt+1) + jitter`.
///
/// The exponent is capped so extreme attempt counts cannot overflow.
#[must_use]
pub fn backoff_delay(attempt: u32, unit: Duration, jitter: Duration) -> Duration {
    let factor = 1u32 << (attempt + 1).min(16);
    unit.saturating_mul(factor).saturating_add(jitter)
}

/// Longest `Retry-After` honoured, in back-off units.
const MAX_RETRY_AFTER_UNITS: u32 = 60;

/// Back-off policy for HTTP requests.
///
/// Non-transient errors return `None`. Transient errors (429, timeouts,
/// network failures, 5xx) wait `unit * 2^(attempt+1)` plus a random jitter
/// strictly below one `unit`, so consecutive waits are strictly increasing.
/// A 429 carrying `Retry-After` waits that long on top, capped at
/// `MAX_RETRY_AFTER_UNITS` units.
#[must_use]
pub fn fetch_backoff(attempt: u32, err: &ScraperError, unit: Duration) -> Option<Duration> {
    if !err.is_transient() {
        return None;
    }
    let floor = match err {
        ScraperError::RateLimited {
            retry_after_secs, ..
        } => {
            let cap = unit.saturating_mul(MAX_RETRY_AFTER_UNITS);
            Duration::from_secs(*retry_after_secs).min(cap)
        }
        _ => Duration::ZERO,
    };
    Some(floor.saturating_add(backoff_delay(attempt, unit, random_below(unit))))
}

/// Uniform random duration in `[0, max)`, or zero when `max` is zero.
pub(crate) fn random_below(max: Duration) -> Duration {
    use rand::Rng;

    let max_ms = u64::try_from(max.as_millis()).unwrap_or(u64::MAX);
    if max_ms == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rand::rng().random_range(0..max_ms))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn rate_limited() -> ScraperError {
        ScraperError::RateLimited {
            domain: "shop.example.com".to_owned(),
            retry_after_secs: 0,
        }
    }

    fn no_wait(_attempt: u32, err: &ScraperError) -> Option<Duration> {
        err.is_transient().then_some(Duration::ZERO)
    }

    #[tokio::test]
    async fn succeeds_immediately_on_first_try() {
        let call_count = Arc::new(AtomicU32::new(0));
        let cc = Arc::clone(&call_count);
        let result = with_retry(3, no_wait, || {
            let cc = Arc::clone(&cc);
            async move {
                cc.fetch_add(1, Ordering::SeqCst);
                Ok::<u32, ScraperError>(42)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_on_rate_limited_then_succeeds() {
        let call_count = Arc::new(AtomicU32::new(0));
        let cc = Arc::clone(&call_count);
        let result = with_retry(3, no_wait, || {
            let cc = Arc::clone(&cc);
            async move {
                let n = cc.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err(rate_limited())
                } else {
                    Ok::<u32, ScraperError>(99)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 99);
        assert_eq!(call_count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn does_not_retry_non_transient_error() {
        let call_count = Arc::new(AtomicU32::new(0));
        let cc = Arc::clone(&call_count);
        let result = with_retry(3, no_wait, || {
            let cc = Arc::clone(&cc);
            async move {
                cc.fetch_add(1, Ordering::SeqCst);
                Err::<u32, ScraperError>(ScraperError::NotFound {
                    url: "https://shop.example.com/products/gone.json".to_owned(),
                })
            }
        })
        .await;
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
        assert!(matches!(result, Err(ScraperError::NotFound { .. })));
    }

    #[tokio::test]
    async fn repeated_rate_limits_wait_longer_each_time_then_give_up() {
        let call_count = Arc::new(AtomicU32::new(0));
        let cc = Arc::clone(&call_count);
        let mut waits: Vec<Duration> = Vec::new();

        let result = with_retry(
            3,
            |attempt, err| {
                let delay = fetch_backoff(attempt, err, Duration::from_secs(1))?;
                waits.push(delay);
                Some(Duration::ZERO)
            },
            || {
                let cc = Arc::clone(&cc);
                async move {
                    cc.fetch_add(1, Ordering::SeqCst);
                    Err::<u32, ScraperError>(rate_limited())
                }
            },
        )
        .await;

        assert!(matches!(result, Err(ScraperError::RateLimited { .. })));
        // one initial attempt plus three retries
        assert_eq!(call_count.load(Ordering::SeqCst), 4);
        assert_eq!(waits.len(), 3);
        assert!(waits[0] < waits[1] && waits[1] < waits[2], "waits: {waits:?}");
        assert!(waits[0] >= Duration::from_secs(2) && waits[0] < Duration::from_secs(3));
        assert!(waits[2] >= Duration::from_secs(8) && waits[2] < Duration::from_secs(9));
    }

    #[test]
    fn backoff_delay_doubles_per_attempt() {
        let unit = Duration::from_secs(1);
        assert_eq!(backoff_delay(0, unit, Duration::ZERO), Duration::from_secs(2));
        assert_eq!(backoff_delay(1, unit, Duration::ZERO), Duration::from_secs(4));
        assert_eq!(backoff_delay(2, unit, Duration::ZERO), Duration::from_secs(8));
        assert_eq!(
            backoff_delay(0, unit, Duration::from_millis(250)),
            Duration::from_millis(2250)
        );
    }

    #[test]
    fn retry_after_is_waited_on_top_of_the_backoff() {
        let unit = Duration::from_secs(1);
        let err = ScraperError::RateLimited {
            domain: "shop.example.com".to_owned(),
            retry_after_secs: 10,
        };
        let waits: Vec<Duration> = (0..3)
            .map(|attempt| fetch_backoff(attempt, &err, unit).unwrap())
            .collect();
        assert!(waits[0] >= Duration::from_secs(12) && waits[0] < Duration::from_secs(13));
        assert!(waits[0] < waits[1] && waits[1] < waits[2], "waits: {waits:?}");
    }

    #[test]
    fn retry_after_is_capped() {
        let err = ScraperError::RateLimited {
            domain: "shop.example.com".to_owned(),
            retry_after_secs: 3600,
        };
        let wait = fetch_backoff(0, &err, Duration::from_secs(1)).unwrap();
        assert!(wait >= Duration::from_secs(62) && wait < Duration::from_secs(63));
        assert_eq!(fetch_backoff(0, &err, Duration::ZERO), Some(Duration::ZERO));
    }

    #[test]
    fn fetch_backoff_skips_non_transient_errors() {
        let err = ScraperError::UnexpectedStatus {
            status: 403,
            url: "https://shop.example.com".to_owned(),
        };
        assert!(fetch_backoff(0, &err, Duration::from_secs(1)).is_none());
    }

    #[test]
    fn server_errors_are_transient() {
        let err = ScraperError::UnexpectedStatus {
            status: 503,
            url: "https://shop.example.com".to_owned(),
        };
        assert!(err.is_transient());
    }

    #[test]
    fn random_below_zero_is_zero() {
        assert_eq!(random_below(Duration::ZERO), Duration::ZERO);
        assert!(random_below(Duration::from_millis(10)) < Duration::from_millis(10));
    }
}
