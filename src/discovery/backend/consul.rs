//! Consul 注册中心客户端

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::Deserialize;

use crate::config::RegistryConfig;
use crate::discovery::instance::Endpoint;
use crate::discovery::registry::RegistryClient;
use crate::error::{GatewayError, Result};

/// Consul 注册中心客户端
pub struct ConsulRegistry {
    http_client: HttpClient,
    consul_url: String,
    /// 只查询通过 Consul 健康检查的实例
    passing_only: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct HealthEntry {
    #[serde(default)]
    node: Option<ConsulNode>,
    service: ConsulService,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ConsulNode {
    #[serde(default)]
    address: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ConsulService {
    #[serde(rename = "ID", default)]
    id: String,
    #[serde(default)]
    address: String,
    port: u16,
}

impl ConsulRegistry {
    /// 创建新的 Consul 客户端
    pub fn new(config: &RegistryConfig) -> Result<Self> {
        let consul_url = config
            .endpoints
            .first()
            .ok_or_else(|| GatewayError::Config("No Consul endpoint provided".to_string()))?
            .trim_end_matches('/')
            .to_string();

        let http_client = HttpClient::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| GatewayError::Config(format!("failed to build consul client: {}", e)))?;

        Ok(Self {
            http_client,
            consul_url,
            passing_only: config.passing_only,
        })
    }

    fn to_endpoint(service_name: &str, entry: HealthEntry) -> Endpoint {
        // 服务地址为空时 Consul 约定使用节点地址
        let host = if entry.service.address.is_empty() {
            entry.node.map(|n| n.address).unwrap_or_default()
        } else {
            entry.service.address
        };

        let instance_id = if entry.service.id.is_empty() {
            format!("{}-{}-{}", service_name, host, entry.service.port)
        } else {
            entry.service.id
        };

        Endpoint::new(host, entry.service.port, instance_id)
    }
}

#[async_trait]
impl RegistryClient for ConsulRegistry {
    async fn list_instances(&self, service_name: &str) -> Result<Vec<Endpoint>> {
        let url = format!("{}/v1/health/service/{}", self.consul_url, service_name);
        let mut query_params = vec![];
        if self.passing_only {
            query_params.push(("passing", "true"));
        }

        let resp = self
            .http_client
            .get(&url)
            .query(&query_params)
            .send()
            .await
            .map_err(|e| GatewayError::DiscoveryUnavailable(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(GatewayError::DiscoveryUnavailable(format!(
                "consul returned status {}",
                resp.status()
            )));
        }

        let entries: Vec<HealthEntry> = resp
            .json()
            .await
            .map_err(|e| GatewayError::DiscoveryUnavailable(format!("invalid consul response: {}", e)))?;

        Ok(entries
            .into_iter()
            .map(|entry| Self::to_endpoint(service_name, entry))
            .filter(|endpoint| !endpoint.host().is_empty())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Json, Router, extract::Path, routing::get};
    use serde_json::json;
    use std::net::SocketAddr;

    async fn start_fake_consul() -> SocketAddr {
        async fn health(Path(service): Path<String>) -> Json<serde_json::Value> {
            if service != "ms-kotlin" {
                return Json(json!([]));
            }
            Json(json!([
                {
                    "Node": { "Address": "10.0.0.9" },
                    "Service": { "ID": "ms-kotlin-1", "Address": "10.0.0.1", "Port": 8081 }
                },
                {
                    "Node": { "Address": "10.0.0.9" },
                    "Service": { "ID": "", "Address": "", "Port": 8082 }
                }
            ]))
        }

        let app = Router::new().route("/v1/health/service/{service}", get(health));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    fn config_for(url: String) -> RegistryConfig {
        RegistryConfig {
            registry_type: "consul".into(),
            endpoints: vec![url],
            passing_only: true,
            timeout_ms: 500,
            instances: Default::default(),
        }
    }

    #[tokio::test]
    async fn maps_health_entries_to_endpoints() {
        let addr = start_fake_consul().await;
        let registry = ConsulRegistry::new(&config_for(format!("http://{}/", addr))).unwrap();

        let instances = registry.list_instances("ms-kotlin").await.unwrap();
        assert_eq!(instances.len(), 2);
        assert_eq!(instances[0], Endpoint::new("10.0.0.1", 8081, "x"));
        assert_eq!(instances[0].instance_id(), "ms-kotlin-1");
        // 服务地址为空时回落到节点地址
        assert_eq!(instances[1].host(), "10.0.0.9");
        assert_eq!(instances[1].instance_id(), "ms-kotlin-10.0.0.9-8082");
    }

    #[tokio::test]
    async fn unknown_service_is_empty() {
        let addr = start_fake_consul().await;
        let registry = ConsulRegistry::new(&config_for(format!("http://{}", addr))).unwrap();
        assert!(registry.list_instances("ms-python").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unreachable_consul_is_discovery_unavailable() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let registry = ConsulRegistry::new(&config_for(format!("http://{}", addr))).unwrap();
        let err = registry.list_instances("ms-kotlin").await.unwrap_err();
        assert!(matches!(err, GatewayError::DiscoveryUnavailable(_)));
    }

    #[test]
    fn requires_an_endpoint() {
        let mut config = config_for(String::new());
        config.endpoints.clear();
        assert!(matches!(
            ConsulRegistry::new(&config),
            Err(GatewayError::Config(_))
        ));
    }
}
