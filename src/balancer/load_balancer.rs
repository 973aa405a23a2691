//! 负载均衡模块
//!
//! 每个服务维护一份经过健康探测的端点列表和一个轮询游标。
//! 刷新按以下优先级进行，遇到第一个得到健康端点的步骤即停止：
//!
//! 1. 注册中心返回的实例，逐个健康探测
//! 2. 之前扫描发现并缓存的端口
//! 3. 对候选端口目录做全量扫描，并缓存结果
//!
//! 刷新结果为空时保留旧列表（宁可过期也要可用）。

use futures::future::join_all;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::state::{DiscoveryStore, ServiceSlot};
use crate::config::{DiscoveryConfig, GatewayConfig};
use crate::discovery::{
    Endpoint, PortCatalog, PortScanner, RegistryClient, create_registry,
};
use crate::error::Result;
use crate::health::{HealthPaths, HealthProbe, HttpHealthProber};

struct BalancerInner {
    registry: Option<Arc<dyn RegistryClient>>,
    prober: Arc<dyn HealthProbe>,
    scanner: PortScanner,
    catalog: PortCatalog,
    fallback_host: String,
    store: DiscoveryStore,
}

/// 轮询负载均衡器
///
/// 克隆代价很低，所有克隆共享同一份状态。
#[derive(Clone)]
pub struct LoadBalancer {
    inner: Arc<BalancerInner>,
}

/// 负载均衡器构建器
pub struct LoadBalancerBuilder {
    registry: Option<Arc<dyn RegistryClient>>,
    prober: Arc<dyn HealthProbe>,
    scan_prober: Option<Arc<dyn HealthProbe>>,
    scan_concurrency: usize,
    catalog: PortCatalog,
    fallback_host: String,
}

impl LoadBalancerBuilder {
    /// 设置注册中心（不设置即为“无注册中心”模式）
    pub fn with_registry(mut self, registry: Arc<dyn RegistryClient>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// 扫描使用的探测器，通常超时更短；默认与常规探测器相同
    pub fn with_scan_prober(mut self, prober: Arc<dyn HealthProbe>) -> Self {
        self.scan_prober = Some(prober);
        self
    }

    pub fn with_scan_concurrency(mut self, concurrency: usize) -> Self {
        self.scan_concurrency = concurrency;
        self
    }

    pub fn with_catalog(mut self, catalog: PortCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn with_fallback_host(mut self, host: impl Into<String>) -> Self {
        self.fallback_host = host.into();
        self
    }

    pub fn build(self) -> LoadBalancer {
        let scan_prober = self.scan_prober.unwrap_or_else(|| self.prober.clone());
        LoadBalancer {
            inner: Arc::new(BalancerInner {
                registry: self.registry,
                prober: self.prober,
                scanner: PortScanner::new(scan_prober, self.scan_concurrency),
                catalog: self.catalog,
                fallback_host: self.fallback_host,
                store: DiscoveryStore::new(),
            }),
        }
    }
}

impl LoadBalancer {
    /// 创建构建器
    pub fn builder(prober: Arc<dyn HealthProbe>) -> LoadBalancerBuilder {
        let defaults = DiscoveryConfig::default();
        LoadBalancerBuilder {
            registry: None,
            prober,
            scan_prober: None,
            scan_concurrency: defaults.scan_concurrency,
            catalog: PortCatalog::from_config(&defaults),
            fallback_host: defaults.fallback_host,
        }
    }

    /// 根据网关配置创建：HTTP 健康探测、可选注册中心、配置的端口目录
    pub fn from_config(config: &GatewayConfig) -> Result<Self> {
        let paths = HealthPaths::from_config(config);
        let prober = HttpHealthProber::new(paths.clone(), config.discovery.probe_timeout())?;
        let scan_prober = HttpHealthProber::new(paths, config.discovery.scan_timeout())?;

        let mut builder = Self::builder(Arc::new(prober))
            .with_scan_prober(Arc::new(scan_prober))
            .with_scan_concurrency(config.discovery.scan_concurrency)
            .with_catalog(PortCatalog::from_config(&config.discovery))
            .with_fallback_host(config.discovery.fallback_host.clone());

        if let Some(registry_config) = &config.registry {
            builder = builder.with_registry(create_registry(registry_config)?);
        }

        Ok(builder.build())
    }

    /// 刷新后按轮询返回下一个端点；没有健康端点时返回 `None`
    pub async fn get_next(&self, service_name: &str) -> Option<Endpoint> {
        self.refresh(service_name).await;
        self.inner.store.slot(service_name).select().await
    }

    /// 刷新后的端点列表快照
    pub async fn list_all(&self, service_name: &str) -> Vec<Endpoint> {
        self.refresh(service_name).await;
        self.snapshot(service_name).await
    }

    /// 不触发刷新的端点列表快照
    pub async fn snapshot(&self, service_name: &str) -> Vec<Endpoint> {
        self.inner
            .store
            .slot(service_name)
            .snapshot()
            .await
            .as_ref()
            .clone()
    }

    /// 已被引用过的服务名
    pub fn known_services(&self) -> Vec<String> {
        self.inner.store.service_names()
    }

    /// 重新发现服务的端点
    ///
    /// 发现工作在独立任务中执行：即使触发它的请求被取消，刷新也会完成。
    pub async fn refresh(&self, service_name: &str) {
        let inner = self.inner.clone();
        let slot = inner.store.slot(service_name);
        let name = service_name.to_string();

        let task = tokio::spawn(async move { inner.refresh_slot(&name, &slot).await });
        if let Err(e) = task.await {
            warn!(service = %service_name, error = %e, "Refresh task failed");
        }
    }
}

impl BalancerInner {
    async fn refresh_slot(&self, service_name: &str, slot: &ServiceSlot) {
        let Some(_refresh) = slot.begin_refresh().await else {
            debug!(service = %service_name, "Refresh coalesced with a concurrent one");
            return;
        };

        let endpoints = self.discover(service_name, slot).await;
        let count = endpoints.len();

        if slot.replace_if_non_empty(endpoints).await {
            info!(service = %service_name, count, "Updated instances");
        } else {
            let retained = slot.snapshot().await.len();
            warn!(
                service = %service_name,
                retained,
                "No healthy instances discovered, keeping previous list"
            );
        }
    }

    async fn discover(&self, service_name: &str, slot: &ServiceSlot) -> Vec<Endpoint> {
        let from_registry = self.discover_from_registry(service_name).await;
        if !from_registry.is_empty() {
            return from_registry;
        }

        let cached = slot.cached_ports().await;
        if !cached.is_empty() {
            let candidates = cached
                .into_iter()
                .map(|port| Endpoint::scanned(self.fallback_host.clone(), port))
                .collect();
            let from_cache = self.probe_all(service_name, candidates).await;
            if !from_cache.is_empty() {
                return from_cache;
            }
            debug!(service = %service_name, "All cached ports failed, rescanning");
        }

        let ports = self
            .scanner
            .discover(service_name, &self.fallback_host, self.catalog.ports())
            .await;
        let endpoints = ports
            .iter()
            .map(|port| Endpoint::scanned(self.fallback_host.clone(), *port))
            .collect();
        slot.set_cached_ports(ports).await;
        endpoints
    }

    async fn discover_from_registry(&self, service_name: &str) -> Vec<Endpoint> {
        let Some(registry) = &self.registry else {
            return Vec::new();
        };

        match registry.list_instances(service_name).await {
            Ok(instances) => self.probe_all(service_name, instances).await,
            Err(e) => {
                warn!(service = %service_name, error = %e, "Failed to get instances from registry");
                Vec::new()
            }
        }
    }

    /// 并发探测，保持原有顺序并按 (host, port) 去重
    async fn probe_all(&self, service_name: &str, candidates: Vec<Endpoint>) -> Vec<Endpoint> {
        let mut seen = HashSet::new();
        let candidates: Vec<Endpoint> = candidates
            .into_iter()
            .filter(|endpoint| seen.insert(endpoint.clone()))
            .collect();

        let checks = candidates.iter().map(|endpoint| {
            self.prober
                .check_health(service_name, endpoint.host(), endpoint.port())
        });
        let results = join_all(checks).await;

        candidates
            .into_iter()
            .zip(results)
            .filter_map(|(endpoint, healthy)| healthy.then_some(endpoint))
            .collect()
    }
}
