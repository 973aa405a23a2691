//! HTTP 服务端模块
//!
//! 组装网关路由：内置端点、认证接口，其余路径全部交给代理路由器。

use axum::body::Body;
use axum::extract::{Path, Request, State};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use crate::auth::{AuthFilter, AuthService, StaticCredentials, TokenService, auth_middleware};
use crate::balancer::LoadBalancer;
use crate::config::GatewayConfig;
use crate::discovery::Endpoint;
use crate::error::{GatewayError, InfraResult, Result};
use crate::health::UP_MARKER;
use crate::proxy::ProxyRouter;

/// 请求处理共享的状态
#[derive(Clone)]
pub struct GatewayState {
    config: Arc<GatewayConfig>,
    router: Arc<ProxyRouter>,
    auth: Arc<AuthService>,
    filter: Arc<AuthFilter>,
}

impl GatewayState {
    /// 按配置创建负载均衡器、代理路由器与认证组件
    pub fn from_config(config: GatewayConfig) -> Result<Self> {
        let balancer = LoadBalancer::from_config(&config)?;
        let router = ProxyRouter::from_config(&config.proxy, balancer)?;
        Ok(Self::with_router(config, router))
    }

    /// 使用已构建好的路由器，认证组件仍来自配置
    pub fn with_router(config: GatewayConfig, router: ProxyRouter) -> Self {
        let tokens = Arc::new(TokenService::from_config(&config.auth));
        let credentials = Arc::new(StaticCredentials::from_config(&config.auth.users));
        let auth = Arc::new(AuthService::new(tokens.clone(), credentials));
        let filter = Arc::new(AuthFilter::from_config(&config.auth, tokens));

        Self {
            config: Arc::new(config),
            router: Arc::new(router),
            auth,
            filter,
        }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn balancer(&self) -> &LoadBalancer {
        self.router.balancer()
    }

    /// 严格模式下只有 `[services]` 中声明的服务可以触发发现
    pub fn is_routable(&self, service_name: &str) -> bool {
        !service_name.is_empty()
            && (!self.config.proxy.strict_services || self.config.is_known_service(service_name))
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InstancesResponse {
    pub service: String,
    pub instances: Vec<Endpoint>,
    pub count: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

/// 构建网关的 axum 路由
pub fn build_app(state: GatewayState) -> Router {
    let auth_routes = state.auth.clone().routes::<GatewayState>();
    let filter = state.filter.clone();

    Router::new()
        .route("/", get(root))
        .route("/actuator/health", get(health))
        .route("/loadbalancer/instances/{service}", get(instances))
        .merge(auth_routes)
        .fallback(proxy)
        .with_state(state)
        .layer(axum::middleware::from_fn_with_state(filter, auth_middleware))
        .layer(TraceLayer::new_for_http())
}

async fn root() -> &'static str {
    "Flare Gateway is running"
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: UP_MARKER.to_string(),
    })
}

async fn instances(State(state): State<GatewayState>, Path(service): Path<String>) -> Response {
    if !state.is_routable(&service) {
        debug!(service = %service, "Instance listing for unknown service");
        return GatewayError::RouteNotFound { service }.into_response();
    }

    let instances = state.balancer().list_all(&service).await;
    Json(InstancesResponse {
        count: instances.len(),
        service,
        instances,
    })
    .into_response()
}

async fn proxy(State(state): State<GatewayState>, request: Request) -> Response {
    let service = service_from_path(request.uri().path()).to_string();

    if !state.is_routable(&service) {
        debug!(service = %service, path = %request.uri().path(), "No route for request");
        return GatewayError::RouteNotFound { service }.into_response();
    }

    let proxy_config = &state.config.proxy;

    let (parts, body) = request.into_parts();
    let limit = proxy_config.max_body_bytes;
    let body = match axum::body::to_bytes(body, limit).await {
        Ok(body) => body,
        Err(_) => return GatewayError::PayloadTooLarge { limit }.into_response(),
    };

    state
        .router
        .route(&service, http::Request::from_parts(parts, body))
        .await
        .map(Body::from)
}

/// 路径第一段即服务名
pub fn service_from_path(path: &str) -> &str {
    path.trim_start_matches('/')
        .split('/')
        .next()
        .unwrap_or_default()
}

/// 网关 HTTP 服务器
pub struct GatewayServer {
    state: GatewayState,
}

impl GatewayServer {
    pub fn new(state: GatewayState) -> Self {
        Self { state }
    }

    pub fn from_config(config: GatewayConfig) -> Result<Self> {
        Ok(Self::new(GatewayState::from_config(config)?))
    }

    /// 监听配置的地址，直到收到 Ctrl+C
    pub async fn run(self) -> InfraResult<()> {
        let server = &self.state.config().server;
        let addr = format!("{}:{}", server.address, server.port);
        let listener = TcpListener::bind(&addr).await?;
        self.serve(listener).await
    }

    /// 在给定的监听器上服务，直到收到 Ctrl+C
    pub async fn serve(self, listener: TcpListener) -> InfraResult<()> {
        let local_addr = listener.local_addr()?;
        info!(
            address = %local_addr,
            services = self.state.config().services.len(),
            auth_enabled = self.state.config().auth.enabled,
            "Gateway listening"
        );

        axum::serve(listener, build_app(self.state))
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("Gateway stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown signal received (Ctrl+C)");
    }
}
