//! Retry logic and backoff calculations for fetches

use super::config::{FetchConfig, RetryConfig};
use pinst_errors::{Error, NetworkError, UserFacingError};
use pinst_events::{AppEvent, DownloadEvent, EventEmitter, FailureContext};
use std::future::Future;
use std::time::Duration;

/// Calculate exponential backoff delay with jitter
pub(crate) fn calculate_backoff_delay(retry_config: &RetryConfig, attempt: u32) -> Duration {
    let base_delay = {
        // Precision loss acceptable for backoff calculations - we don't need nanosecond precision
        #[allow(clippy::cast_precision_loss)]
        {
            retry_config
                .initial_delay
                .as_millis()
                .min(u128::from(u64::MAX)) as f64
        }
    };
    let multiplier = retry_config.backoff_multiplier;
    let max_delay = {
        #[allow(clippy::cast_precision_loss)]
        {
            retry_config.max_delay.as_millis().min(u128::from(u64::MAX)) as f64
        }
    };

    let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
    let delay = (base_delay * multiplier.powi(exponent)).min(max_delay);

    // Add jitter
    let jitter = delay * retry_config.jitter_factor * (rand::random::<f64>() - 0.5);
    let final_delay = {
        // Safe cast: max(0.0) ensures non-negative, round() handles fractional part
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        {
            (delay + jitter).max(0.0).round() as u64
        }
    };

    Duration::from_millis(final_delay)
}

/// Only transient network failures are worth another attempt
fn should_retry(error: &Error) -> bool {
    matches!(error, Error::Network(err) if err.is_retryable())
}

/// Run `attempt_fn` until it succeeds, fails permanently, or retries run out.
///
/// Every attempt is bounded by `attempt_timeout`. Attempts are numbered from 1.
pub(crate) async fn with_retry<T, F, Fut, E>(
    config: &FetchConfig,
    url: &str,
    events: &E,
    mut attempt_fn: F,
) -> Result<T, Error>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, Error>>,
    E: EventEmitter,
{
    let max_attempts = config.retry.max_retries.saturating_add(1);
    let mut attempt = 1;

    loop {
        let result = match tokio::time::timeout(config.attempt_timeout, attempt_fn(attempt)).await
        {
            Ok(result) => result,
            Err(_) => Err(NetworkError::Timeout {
                url: url.to_string(),
            }
            .into()),
        };

        let error = match result {
            Ok(value) => return Ok(value),
            Err(error) => error,
        };

        if attempt >= max_attempts || !should_retry(&error) {
            tracing::debug!(%url, attempt, error = %error, "giving up");
            events.emit(AppEvent::Download(DownloadEvent::Failed {
                url: url.to_string(),
                failure: FailureContext::from_error(&error),
                attempts: attempt,
            }));
            return Err(error);
        }

        let delay = calculate_backoff_delay(&config.retry, attempt);
        tracing::debug!(%url, attempt, ?delay, error = %error, "retrying");
        events.emit(AppEvent::Download(DownloadEvent::Retrying {
            url: url.to_string(),
            attempt,
            max_attempts,
            reason: error.user_message().into_owned(),
            backoff_delay: delay,
        }));

        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}
