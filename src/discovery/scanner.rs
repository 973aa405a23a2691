//! 端口扫描（注册中心不可用时的兜底发现）
//!
//! 按固定顺序探测一组候选端口：先是常用/默认端口，再是配置的数值区间。
//! 这是昂贵操作（可能数百次探测），只在注册中心为空且缓存端口全部失效时才执行。

use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::{DiscoveryConfig, PortRange};
use crate::health::HealthProbe;

/// 候选端口目录：去重且保持顺序
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortCatalog {
    ports: Vec<u16>,
}

impl PortCatalog {
    pub fn new(well_known: &[u16], ranges: &[PortRange]) -> Self {
        let mut seen = HashSet::new();
        let mut ports = Vec::new();

        let expanded = ranges.iter().flat_map(|range| {
            (range.start..=range.end).step_by(usize::from(range.step.max(1)))
        });

        for port in well_known.iter().copied().chain(expanded) {
            if port != 0 && seen.insert(port) {
                ports.push(port);
            }
        }

        Self { ports }
    }

    pub fn from_config(config: &DiscoveryConfig) -> Self {
        Self::new(&config.well_known_ports, &config.port_ranges)
    }

    pub fn ports(&self) -> &[u16] {
        &self.ports
    }

    pub fn len(&self) -> usize {
        self.ports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }
}

/// 端口扫描器
pub struct PortScanner {
    prober: Arc<dyn HealthProbe>,
    concurrency: usize,
}

impl PortScanner {
    /// `prober` 应当配置较短的超时；`concurrency` 为 1 时严格顺序扫描
    pub fn new(prober: Arc<dyn HealthProbe>, concurrency: usize) -> Self {
        Self {
            prober,
            concurrency: concurrency.max(1),
        }
    }

    /// 探测 `candidate_ports`，按候选顺序返回通过健康检查的端口（去重）
    pub async fn discover(
        &self,
        service_name: &str,
        host: &str,
        candidate_ports: &[u16],
    ) -> Vec<u16> {
        debug!(
            service = %service_name,
            host = %host,
            candidates = candidate_ports.len(),
            "Starting port scan"
        );

        let mut seen = HashSet::new();
        let candidates: Vec<u16> = candidate_ports
            .iter()
            .copied()
            .filter(|port| seen.insert(*port))
            .collect();

        let prober = &self.prober;
        let results: Vec<(u16, bool)> = stream::iter(candidates)
            .map(move |port| async move {
                (port, prober.check_health(service_name, host, port).await)
            })
            .buffered(self.concurrency)
            .collect()
            .await;

        let found: Vec<u16> = results
            .into_iter()
            .filter(|(_, healthy)| *healthy)
            .map(|(port, _)| port)
            .collect();

        for port in &found {
            info!(service = %service_name, port, "Discovered instance by port scan");
        }

        found
    }
}
