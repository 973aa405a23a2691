//! 重试策略模块
//!
//! 代理路由器在两次尝试之间询问策略是否继续以及等待多久。
//! 默认策略是立即重试（不退避）；固定延迟与指数退避可通过配置启用。

pub mod exponential;
pub mod fixed;
pub mod immediate;

pub use exponential::ExponentialBackoffPolicy;
pub use fixed::FixedRetryPolicy;
pub use immediate::ImmediateRetryPolicy;

use std::sync::Arc;
use std::time::Duration;

use crate::config::{BackoffKind, ProxyConfig};
use crate::error::GatewayError;

/// 重试策略 trait
///
/// `attempt` 为已经完成的尝试次数（从 1 开始）。
pub trait RetryPolicy: Send + Sync {
    fn should_retry(&self, attempt: usize, error: &GatewayError) -> bool;
    fn backoff_duration(&self, attempt: usize) -> Duration;
    fn max_attempts(&self) -> usize;
}

/// 根据代理配置创建重试策略
pub fn policy_from_config(config: &ProxyConfig) -> Arc<dyn RetryPolicy> {
    let base = Duration::from_millis(config.backoff_base_ms);
    match config.backoff {
        BackoffKind::None => Arc::new(ImmediateRetryPolicy::new(config.max_attempts)),
        BackoffKind::Fixed => Arc::new(FixedRetryPolicy::new(config.max_attempts, base)),
        BackoffKind::Exponential => Arc::new(ExponentialBackoffPolicy::new(
            config.max_attempts,
            base,
            Duration::from_millis(config.backoff_max_ms),
        )),
    }
}
