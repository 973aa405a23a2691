//! 注册中心后端实现

pub mod consul;

use std::sync::Arc;

use crate::config::RegistryConfig;
use crate::discovery::registry::{RegistryClient, StaticRegistry};
use crate::error::{GatewayError, Result};

pub use consul::ConsulRegistry;

/// 根据配置创建注册中心客户端
pub fn create_registry(config: &RegistryConfig) -> Result<Arc<dyn RegistryClient>> {
    match config.registry_type.to_lowercase().as_str() {
        "consul" => Ok(Arc::new(ConsulRegistry::new(config)?)),
        "static" => Ok(Arc::new(StaticRegistry::from_config(&config.instances))),
        other => Err(GatewayError::Config(format!(
            "Unknown registry type: {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(registry_type: &str) -> RegistryConfig {
        RegistryConfig {
            registry_type: registry_type.to_string(),
            endpoints: vec!["http://127.0.0.1:8500".to_string()],
            passing_only: false,
            timeout_ms: 1000,
            instances: Default::default(),
        }
    }

    #[test]
    fn creates_known_backends() {
        assert!(create_registry(&config("consul")).is_ok());
        assert!(create_registry(&config("Static")).is_ok());
    }

    #[test]
    fn rejects_unknown_backend() {
        assert!(matches!(
            create_registry(&config("etcd")),
            Err(GatewayError::Config(_))
        ));
    }
}
