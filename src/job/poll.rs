//! Job polling backoff
//!
//! Exponential backoff between status polls, capped at a maximum delay.

use std::time::Duration;

/// Polling configuration
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Maximum number of status polls
    pub max_attempts: usize,

    /// Delay after the first poll
    pub initial_delay: Duration,

    /// Backoff multiplier for each poll
    pub backoff_multiplier: f64,

    /// Maximum delay between polls
    pub max_delay: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            max_attempts: 60,
            initial_delay: Duration::from_secs(5),
            backoff_multiplier: 1.5,
            max_delay: Duration::from_secs(60),
        }
    }
}

impl PollConfig {
    pub fn new(max_attempts: usize) -> Self {
        Self {
            max_attempts,
            ..Default::default()
        }
    }

    /// Set custom backoff parameters
    pub fn with_backoff(mut self, initial: Duration, multiplier: f64, max: Duration) -> Self {
        self.initial_delay = initial;
        self.backoff_multiplier = multiplier;
        self.max_delay = max;
        self
    }
}

/// Delay before poll `attempt + 1`
pub fn calculate_backoff(attempt: usize, config: &PollConfig) -> Duration {
    let delay_secs = (config.initial_delay.as_secs_f64()
        * config.backoff_multiplier.powi(attempt as i32))
    .min(config.max_delay.as_secs_f64());

    Duration::try_from_secs_f64(delay_secs.max(0.0)).unwrap_or(config.max_delay)
}
