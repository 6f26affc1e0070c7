//! Configuration structures for archive fetches

use pinst_config::NetworkConfig;
use std::time::Duration;

/// Configuration for archive fetches
#[derive(Clone, Debug)]
pub struct FetchConfig {
    /// Upper bound for one attempt, request and body included (default: 30s)
    pub attempt_timeout: Duration,
    /// Timeout for individual body chunks (default: 30s)
    pub chunk_timeout: Duration,
    /// Maximum archive size allowed (default: 512MB)
    pub max_file_size: u64,
    /// Retry configuration
    pub retry: RetryConfig,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            attempt_timeout: Duration::from_secs(30),
            chunk_timeout: Duration::from_secs(30),
            max_file_size: 512 * 1024 * 1024, // 512MB
            retry: RetryConfig::default(),
        }
    }
}

impl From<&NetworkConfig> for FetchConfig {
    fn from(network: &NetworkConfig) -> Self {
        Self {
            attempt_timeout: network.timeout_duration(),
            chunk_timeout: network.chunk_timeout_duration(),
            max_file_size: network.max_file_size,
            retry: RetryConfig {
                max_retries: network.retries,
                initial_delay: network.retry_delay_duration(),
                max_delay: network.max_retry_delay_duration(),
                ..RetryConfig::default()
            },
        }
    }
}

/// Retry configuration for fetches
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retries after the first attempt
    pub max_retries: u32,
    /// Initial backoff delay
    pub initial_delay: Duration,
    /// Maximum backoff delay
    pub max_delay: Duration,
    /// Backoff multiplier
    pub backoff_multiplier: f64,
    /// Jitter factor (0.0 to 1.0)
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            jitter_factor: 0.1,
        }
    }
}
