//! 按服务名划分的发现状态
//!
//! 每个服务一个独立的 `ServiceSlot`，不同服务之间不共享锁。

use dashmap::DashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use tokio::sync::{Mutex, MutexGuard, RwLock};

use crate::discovery::Endpoint;

/// 单个服务的状态：端点列表、轮询游标、已发现端口
#[derive(Default)]
pub struct ServiceSlot {
    /// 整体替换，读者只会看到完整的旧列表或新列表
    endpoints: RwLock<Arc<Vec<Endpoint>>>,
    /// 只增不减，选择时再对当前长度取模
    cursor: AtomicUsize,
    /// 按发现顺序保存
    discovered_ports: Mutex<Vec<u16>>,
    refresh_lock: Mutex<()>,
    /// 每完成一次刷新加一，用于合并并发刷新
    refresh_epoch: AtomicU64,
}

impl ServiceSlot {
    /// 当前端点列表快照
    pub async fn snapshot(&self) -> Arc<Vec<Endpoint>> {
        self.endpoints.read().await.clone()
    }

    /// 仅当新列表非空时替换，返回是否替换
    pub async fn replace_if_non_empty(&self, endpoints: Vec<Endpoint>) -> bool {
        if endpoints.is_empty() {
            return false;
        }
        *self.endpoints.write().await = Arc::new(endpoints);
        true
    }

    /// 轮询选择下一个端点；列表为空时不推进游标
    pub async fn select(&self) -> Option<Endpoint> {
        let endpoints = self.snapshot().await;
        if endpoints.is_empty() {
            return None;
        }
        let index = self.cursor.fetch_add(1, Ordering::Relaxed) % endpoints.len();
        endpoints.get(index).cloned()
    }

    pub async fn cached_ports(&self) -> Vec<u16> {
        self.discovered_ports.lock().await.clone()
    }

    pub async fn set_cached_ports(&self, ports: Vec<u16>) {
        *self.discovered_ports.lock().await = ports;
    }

    /// 进入刷新临界区
    ///
    /// 等待期间若已有其他刷新完成，返回 `None`，调用方直接复用那次的结果。
    pub async fn begin_refresh(&self) -> Option<RefreshGuard<'_>> {
        let observed = self.refresh_epoch.load(Ordering::Acquire);
        let guard = self.refresh_lock.lock().await;
        if self.refresh_epoch.load(Ordering::Acquire) != observed {
            return None;
        }
        Some(RefreshGuard {
            slot: self,
            _guard: guard,
        })
    }
}

/// 持有期间独占该服务的刷新；释放时推进 epoch
pub struct RefreshGuard<'a> {
    slot: &'a ServiceSlot,
    _guard: MutexGuard<'a, ()>,
}

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        self.slot.refresh_epoch.fetch_add(1, Ordering::Release);
    }
}

/// 所有服务的状态表，按需惰性创建，进程生命周期内不删除
#[derive(Default)]
pub struct DiscoveryStore {
    slots: DashMap<String, Arc<ServiceSlot>>,
}

impl DiscoveryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取（必要时创建）服务的状态
    pub fn slot(&self, service_name: &str) -> Arc<ServiceSlot> {
        if let Some(slot) = self.slots.get(service_name) {
            return slot.clone();
        }
        self.slots
            .entry(service_name.to_string())
            .or_default()
            .clone()
    }

    /// 已见过的服务名
    pub fn service_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.slots.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoints(ports: &[u16]) -> Vec<Endpoint> {
        ports
            .iter()
            .map(|p| Endpoint::new("localhost", *p, format!("i-{}", p)))
            .collect()
    }

    #[tokio::test]
    async fn empty_slot_selects_nothing() {
        let slot = ServiceSlot::default();
        assert!(slot.select().await.is_none());
        assert_eq!(slot.cursor.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn empty_replacement_is_ignored() {
        let slot = ServiceSlot::default();
        assert!(slot.replace_if_non_empty(endpoints(&[1, 2])).await);
        assert!(!slot.replace_if_non_empty(Vec::new()).await);
        assert_eq!(slot.snapshot().await.len(), 2);
    }

    #[tokio::test]
    async fn cursor_survives_replacement() {
        let slot = ServiceSlot::default();
        slot.replace_if_non_empty(endpoints(&[1, 2, 3])).await;
        assert_eq!(slot.select().await.unwrap().port(), 1);

        slot.replace_if_non_empty(endpoints(&[1, 2, 3, 4])).await;
        assert_eq!(slot.select().await.unwrap().port(), 2);
        assert_eq!(slot.select().await.unwrap().port(), 3);
        assert_eq!(slot.select().await.unwrap().port(), 4);
        assert_eq!(slot.select().await.unwrap().port(), 1);
    }

    #[tokio::test]
    async fn refresh_waiting_behind_another_is_coalesced() {
        let slot = Arc::new(ServiceSlot::default());

        let first = slot.begin_refresh().await.expect("first refresh runs");

        let waiter = {
            let slot = slot.clone();
            tokio::spawn(async move { slot.begin_refresh().await.is_some() })
        };
        tokio::task::yield_now().await;
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        drop(first);

        assert!(!waiter.await.unwrap(), "waiter should reuse the finished refresh");

        // 之后的刷新照常执行
        assert!(slot.begin_refresh().await.is_some());
    }

    #[test]
    fn store_creates_slots_lazily() {
        let store = DiscoveryStore::new();
        assert!(store.service_names().is_empty());

        let a = store.slot("ms-kotlin");
        let b = store.slot("ms-kotlin");
        assert!(Arc::ptr_eq(&a, &b));

        store.slot("ms-python");
        assert_eq!(store.service_names(), vec!["ms-kotlin", "ms-python"]);
    }
}
