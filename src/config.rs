use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::error::{GatewayError, InfraResult, Result};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub server: ServerConfig,
    pub registry: Option<RegistryConfig>,
    pub discovery: DiscoveryConfig,
    /// 按服务名声明的后端，键即为路径前缀中的服务名
    pub services: HashMap<String, ServiceConfig>,
    pub proxy: ProxyConfig,
    pub auth: AuthConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub address: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RegistryConfig {
    #[serde(default = "default_registry_type")]
    pub registry_type: String, // consul, static
    #[serde(default)]
    pub endpoints: Vec<String>,
    /// 只返回通过 Consul 自身健康检查的实例
    #[serde(default)]
    pub passing_only: bool,
    #[serde(default = "default_registry_timeout_ms")]
    pub timeout_ms: u64,
    /// registry_type = "static" 时使用的实例表
    #[serde(default)]
    pub instances: HashMap<String, Vec<StaticInstanceConfig>>,
}

fn default_registry_type() -> String {
    "consul".to_string()
}

fn default_registry_timeout_ms() -> u64 {
    2000
}

impl RegistryConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StaticInstanceConfig {
    pub host: String,
    pub port: u16,
    pub instance_id: Option<String>,
}

/// 端口区间，`start..=end`，步长 `step`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct PortRange {
    pub start: u16,
    pub end: u16,
    #[serde(default = "default_step")]
    pub step: u16,
}

fn default_step() -> u16 {
    1
}

impl PortRange {
    pub fn new(start: u16, end: u16, step: u16) -> Self {
        Self { start, end, step }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// 端口扫描与端口缓存探测使用的主机
    pub fallback_host: String,
    pub default_health_path: String,
    /// 注册中心实例与缓存端口的探测超时
    pub probe_timeout_ms: u64,
    /// 全量扫描时单个端口的探测超时
    pub scan_timeout_ms: u64,
    /// 同时在途的扫描探测数，1 表示严格顺序扫描
    pub scan_concurrency: usize,
    pub well_known_ports: Vec<u16>,
    pub port_ranges: Vec<PortRange>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            fallback_host: "localhost".to_string(),
            default_health_path: "/health".to_string(),
            probe_timeout_ms: 1000,
            scan_timeout_ms: 150,
            scan_concurrency: 1,
            well_known_ports: vec![
                8081, 8082, 8083, 8084, 8085, 8086, 8087, 8088, 8089, 8090, 9000, 9090,
            ],
            port_ranges: vec![
                PortRange::new(49152, 49160, 1),
                PortRange::new(49664, 49672, 1),
                PortRange::new(50000, 51000, 100),
                PortRange::new(55000, 57900, 100),
                PortRange::new(60000, 61900, 100),
            ],
        }
    }
}

impl DiscoveryConfig {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn scan_timeout(&self) -> Duration {
        Duration::from_millis(self.scan_timeout_ms)
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// 健康检查路径，未设置时使用 discovery.default_health_path
    pub health_path: Option<String>,
}

/// 重试之间的等待策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffKind {
    #[default]
    None,
    Fixed,
    Exponential,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProxyConfig {
    pub max_attempts: usize,
    pub backoff: BackoffKind,
    pub backoff_base_ms: u64,
    pub backoff_max_ms: u64,
    pub upstream_timeout_ms: u64,
    pub debug_headers: bool,
    pub max_body_bytes: usize,
    /// 只路由 `[services]` 中声明过的服务
    pub strict_services: bool,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: BackoffKind::None,
            backoff_base_ms: 50,
            backoff_max_ms: 1000,
            upstream_timeout_ms: 30_000,
            debug_headers: true,
            max_body_bytes: 10 * 1024 * 1024,
            strict_services: true,
        }
    }
}

impl ProxyConfig {
    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_millis(self.upstream_timeout_ms)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    pub enabled: bool,
    pub secret: String,
    pub issuer: String,
    pub ttl_seconds: u64,
    pub public_paths: Vec<String>,
    pub users: Vec<UserConfig>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            secret: String::new(),
            issuer: "flare-gateway".to_string(),
            ttl_seconds: 3600,
            public_paths: vec![
                "/".to_string(),
                "/auth/login".to_string(),
                "/auth/validate".to_string(),
                "/actuator/health*".to_string(),
                "/actuator/info*".to_string(),
            ],
            users: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UserConfig {
    pub username: String,
    pub password: String,
    #[serde(default = "default_role")]
    pub role: String,
}

fn default_role() -> String {
    "USER".to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

impl GatewayConfig {
    pub fn load_from_file(path: &str) -> InfraResult<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {path}"))?;
        Self::from_toml(&content).with_context(|| format!("invalid config file {path}"))
    }

    pub fn from_toml(content: &str) -> InfraResult<Self> {
        let config: GatewayConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// 校验配置中明显不合理的取值
    pub fn validate(&self) -> Result<()> {
        if self.proxy.max_attempts == 0 {
            return Err(GatewayError::Config(
                "proxy.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.discovery.scan_concurrency == 0 {
            return Err(GatewayError::Config(
                "discovery.scan_concurrency must be at least 1".to_string(),
            ));
        }
        if let Some(range) = self.discovery.port_ranges.iter().find(|r| r.step == 0 || r.start > r.end) {
            return Err(GatewayError::Config(format!(
                "invalid port range {}..={} step {}",
                range.start, range.end, range.step
            )));
        }
        if self.auth.enabled && self.auth.secret.is_empty() {
            return Err(GatewayError::Config(
                "auth.secret is required when auth is enabled".to_string(),
            ));
        }
        if let Some(registry) = &self.registry {
            if registry.registry_type.eq_ignore_ascii_case("consul")
                && registry.endpoints.is_empty()
            {
                return Err(GatewayError::Config(
                    "registry.endpoints must not be empty for consul".to_string(),
                ));
            }
        }
        Ok(())
    }

    pub fn is_known_service(&self, service_name: &str) -> bool {
        self.services.contains_key(service_name)
    }
}
