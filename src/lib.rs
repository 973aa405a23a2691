//! Flare Gateway
//!
//! Service-discovery-backed HTTP gateway: health-checked round robin load balancing,
//! port-scan fallback discovery when no registry knows a service, and a retrying
//! reverse proxy in front of it all.

pub mod auth;
pub mod balancer;
pub mod config;
pub mod discovery;
pub mod error;
pub mod health;
pub mod logging;
pub mod proxy;
pub mod retry;
pub mod server;

// Re-exports
pub use auth::{AuthFilter, AuthService, CredentialVerifier, StaticCredentials, TokenClaims, TokenService};
pub use balancer::{LoadBalancer, LoadBalancerBuilder};
pub use config::GatewayConfig;
pub use discovery::{ConsulRegistry, Endpoint, PortCatalog, PortScanner, RegistryClient, StaticRegistry};
pub use error::{ErrorBody, ErrorCode, GatewayError, InfraResult, Result};
pub use health::{HealthPaths, HealthProbe, HttpHealthProber};
pub use proxy::{ProxyRouter, ReqwestUpstream, UpstreamClient, UpstreamRequest};
pub use retry::{ExponentialBackoffPolicy, FixedRetryPolicy, ImmediateRetryPolicy, RetryPolicy};
pub use server::{GatewayServer, GatewayState, build_app};
