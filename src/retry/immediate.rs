use super::RetryPolicy;
use crate::error::GatewayError;
use std::time::Duration;

/// 立即重试策略（不退避）
pub struct ImmediateRetryPolicy {
    max_attempts: usize,
}

impl ImmediateRetryPolicy {
    pub fn new(max_attempts: usize) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }
}

impl Default for ImmediateRetryPolicy {
    fn default() -> Self {
        Self::new(3)
    }
}

impl RetryPolicy for ImmediateRetryPolicy {
    fn should_retry(&self, attempt: usize, error: &GatewayError) -> bool {
        attempt < self.max_attempts && error.is_retryable()
    }

    fn backoff_duration(&self, _attempt: usize) -> Duration {
        Duration::ZERO
    }

    fn max_attempts(&self) -> usize {
        self.max_attempts
    }
}
