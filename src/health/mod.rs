//! 健康检查模块
//!
//! 对单个候选端点发起 HTTP 探测。约定：目标服务在其健康检查路径上返回
//! 200，且响应体包含字面量 `UP` 时视为健康。任何失败都折叠为 `false`。

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

use crate::config::GatewayConfig;
use crate::error::{GatewayError, Result};

/// 健康状态标记
pub const UP_MARKER: &str = "UP";

/// 健康探测 trait
#[async_trait]
pub trait HealthProbe: Send + Sync {
    /// 端点是否可以为该服务提供流量；从不返回错误
    async fn check_health(&self, service_name: &str, host: &str, port: u16) -> bool;
}

/// 各服务的健康检查路径
#[derive(Debug, Clone)]
pub struct HealthPaths {
    default_path: String,
    per_service: HashMap<String, String>,
}

impl HealthPaths {
    pub fn new(default_path: impl Into<String>) -> Self {
        Self {
            default_path: default_path.into(),
            per_service: HashMap::new(),
        }
    }

    pub fn with_service(mut self, service_name: impl Into<String>, path: impl Into<String>) -> Self {
        self.per_service.insert(service_name.into(), path.into());
        self
    }

    pub fn from_config(config: &GatewayConfig) -> Self {
        let mut paths = Self::new(config.discovery.default_health_path.clone());
        for (name, service) in &config.services {
            if let Some(path) = &service.health_path {
                paths.per_service.insert(name.clone(), path.clone());
            }
        }
        paths
    }

    pub fn path_for(&self, service_name: &str) -> &str {
        self.per_service
            .get(service_name)
            .map(String::as_str)
            .unwrap_or(&self.default_path)
    }
}

impl Default for HealthPaths {
    fn default() -> Self {
        Self::new("/health")
    }
}

/// 基于 reqwest 的 HTTP 健康探测
pub struct HttpHealthProber {
    client: reqwest::Client,
    paths: HealthPaths,
}

impl HttpHealthProber {
    /// 创建探测器，`timeout` 覆盖连接、请求与读取响应体的全过程
    pub fn new(paths: HealthPaths, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Config(format!("failed to build health client: {}", e)))?;
        Ok(Self { client, paths })
    }

    pub fn health_url(&self, service_name: &str, host: &str, port: u16) -> String {
        format!("http://{}:{}{}", host, port, self.paths.path_for(service_name))
    }

    async fn probe(&self, service_name: &str, host: &str, port: u16) -> Result<()> {
        let url = self.health_url(service_name, host, port);

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| GatewayError::unhealthy(host, port, e.to_string()))?;

        if resp.status() != reqwest::StatusCode::OK {
            return Err(GatewayError::unhealthy(
                host,
                port,
                format!("status {}", resp.status()),
            ));
        }

        let body = resp
            .text()
            .await
            .map_err(|e| GatewayError::unhealthy(host, port, e.to_string()))?;

        if !body.contains(UP_MARKER) {
            return Err(GatewayError::unhealthy(host, port, "status marker missing"));
        }

        Ok(())
    }
}

#[async_trait]
impl HealthProbe for HttpHealthProber {
    async fn check_health(&self, service_name: &str, host: &str, port: u16) -> bool {
        match self.probe(service_name, host, port).await {
            Ok(()) => true,
            Err(e) => {
                debug!(service = %service_name, error = %e, "Health probe failed");
                false
            }
        }
    }
}
