//! 注册中心客户端抽象

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::config::StaticInstanceConfig;
use crate::discovery::instance::Endpoint;
use crate::error::Result;

/// 注册中心客户端 trait
///
/// 注册中心是可选能力；返回的错误会被负载均衡器吞掉并视为“没有实例”。
/// 注意：由于需要动态分发（dyn），使用 async-trait
#[async_trait]
pub trait RegistryClient: Send + Sync {
    /// 列出服务的实例（可能为空）
    async fn list_instances(&self, service_name: &str) -> Result<Vec<Endpoint>>;
}

/// 内存注册中心
///
/// 用于固定部署（`registry_type = "static"`）以及测试，实例表可在运行时整体替换。
#[derive(Default)]
pub struct StaticRegistry {
    instances: RwLock<HashMap<String, Vec<Endpoint>>>,
}

impl StaticRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 从配置构建
    pub fn from_config(instances: &HashMap<String, Vec<StaticInstanceConfig>>) -> Self {
        let registry = Self::new();
        for (service, list) in instances {
            let endpoints = list
                .iter()
                .map(|inst| {
                    let id = inst
                        .instance_id
                        .clone()
                        .unwrap_or_else(|| format!("{}-{}-{}", service, inst.host, inst.port));
                    Endpoint::new(inst.host.clone(), inst.port, id)
                })
                .collect();
            registry.set_instances(service.clone(), endpoints);
        }
        registry
    }

    /// 替换服务的实例列表
    pub fn set_instances(&self, service_name: impl Into<String>, endpoints: Vec<Endpoint>) {
        let mut instances = self
            .instances
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        instances.insert(service_name.into(), endpoints);
    }
}

#[async_trait]
impl RegistryClient for StaticRegistry {
    async fn list_instances(&self, service_name: &str) -> Result<Vec<Endpoint>> {
        let instances = self
            .instances
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(instances.get(service_name).cloned().unwrap_or_default())
    }
}
