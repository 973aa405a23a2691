//! 端点缓存与轮询负载均衡

pub mod load_balancer;
pub mod state;

pub use load_balancer::{LoadBalancer, LoadBalancerBuilder};
pub use state::{DiscoveryStore, ServiceSlot};
