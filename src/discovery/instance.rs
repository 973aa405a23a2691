//! 服务端点定义

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// 服务端点
///
/// 一旦创建即不可变；相等性只由 `(host, port)` 决定，`instance_id` 仅用于展示与调试。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    host: String,
    port: u16,
    instance_id: String,
}

impl Endpoint {
    /// 创建新的端点
    pub fn new(host: impl Into<String>, port: u16, instance_id: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            instance_id: instance_id.into(),
        }
    }

    /// 由端口扫描发现的端点
    pub fn scanned(host: impl Into<String>, port: u16) -> Self {
        Self::new(host, port, format!("manual-{}", port))
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    /// 转换为 HTTP 基础 URL
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

impl PartialEq for Endpoint {
    fn eq(&self, other: &Self) -> bool {
        self.host == other.host && self.port == other.port
    }
}

impl Eq for Endpoint {}

impl Hash for Endpoint {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.host.hash(state);
        self.port.hash(state);
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{} ({})", self.host, self.port, self.instance_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn equality_ignores_instance_id() {
        let a = Endpoint::new("localhost", 8081, "a");
        let b = Endpoint::new("localhost", 8081, "b");
        assert_eq!(a, b);

        let set: HashSet<_> = [a, b].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn different_port_is_a_different_endpoint() {
        assert_ne!(
            Endpoint::new("localhost", 8081, "a"),
            Endpoint::new("localhost", 8082, "a")
        );
    }

    #[test]
    fn base_url_and_scanned_id() {
        let endpoint = Endpoint::scanned("127.0.0.1", 9000);
        assert_eq!(endpoint.base_url(), "http://127.0.0.1:9000");
        assert_eq!(endpoint.instance_id(), "manual-9000");
    }
}
