//! 带重试的反向代理路由器
//!
//! 每次尝试都重新经过负载均衡器选择端点；尝试失败后立即触发一次发现刷新，
//! 下一次尝试因此能避开刚刚失效的实例。

use bytes::Bytes;
use http::header::{CONTENT_LENGTH, HOST};
use http::{HeaderMap, HeaderValue};
use std::sync::Arc;
use tracing::{debug, error, warn};

use super::upstream::{ReqwestUpstream, UpstreamClient, UpstreamRequest};
use crate::balancer::LoadBalancer;
use crate::config::ProxyConfig;
use crate::discovery::Endpoint;
use crate::error::{GatewayError, Result};
use crate::retry::{RetryPolicy, policy_from_config};

/// 调试响应头：处理本次请求的实例 ID
pub const INSTANCE_HEADER: &str = "x-load-balanced-instance";
/// 调试响应头：处理本次请求的实例端口
pub const PORT_HEADER: &str = "x-load-balanced-port";

/// 反向代理路由器
pub struct ProxyRouter {
    balancer: LoadBalancer,
    upstream: Arc<dyn UpstreamClient>,
    retry: Arc<dyn RetryPolicy>,
    debug_headers: bool,
}

impl ProxyRouter {
    pub fn new(
        balancer: LoadBalancer,
        upstream: Arc<dyn UpstreamClient>,
        retry: Arc<dyn RetryPolicy>,
    ) -> Self {
        Self {
            balancer,
            upstream,
            retry,
            debug_headers: true,
        }
    }

    /// 是否在成功响应上附加调试头
    pub fn with_debug_headers(mut self, enabled: bool) -> Self {
        self.debug_headers = enabled;
        self
    }

    pub fn from_config(config: &ProxyConfig, balancer: LoadBalancer) -> Result<Self> {
        let upstream = ReqwestUpstream::new(config.upstream_timeout())?;
        Ok(Self::new(balancer, Arc::new(upstream), policy_from_config(config))
            .with_debug_headers(config.debug_headers))
    }

    pub fn balancer(&self) -> &LoadBalancer {
        &self.balancer
    }

    /// 把 `/{service}/rest?query` 转发到 `service` 的某个健康实例的 `/rest?query`
    ///
    /// 从不返回错误：失败会被转换成 JSON 错误响应。
    /// 上游返回的 4xx/5xx 原样透传，不触发重试。
    pub async fn route(&self, service_name: &str, request: http::Request<Bytes>) -> http::Response<Bytes> {
        let (parts, body) = request.into_parts();
        let path = strip_service_prefix(parts.uri.path(), service_name);
        let query = parts.uri.query();
        let headers = forward_headers(&parts.headers);

        let mut attempt = 0;
        let mut last_error = None;

        loop {
            attempt += 1;

            let Some(endpoint) = self.balancer.get_next(service_name).await else {
                warn!(service = %service_name, attempt, "No healthy instance available");
                return GatewayError::NoHealthyEndpoints {
                    service: service_name.to_string(),
                }
                .to_http_response();
            };

            let url = build_target_url(&endpoint, path, query);
            debug!(service = %service_name, attempt, url = %url, "Forwarding request");

            let upstream_request = UpstreamRequest {
                service_name: service_name.to_string(),
                method: parts.method.clone(),
                url,
                headers: headers.clone(),
                body: body.clone(),
            };

            match self.upstream.send(upstream_request).await {
                Ok(response) => return self.relay(response, &endpoint),
                Err(e) => {
                    warn!(
                        service = %service_name,
                        attempt,
                        endpoint = %endpoint,
                        error = %e,
                        "Routing attempt failed"
                    );
                    self.balancer.refresh(service_name).await;

                    let retry = self.retry.should_retry(attempt, &e);
                    let delay = self.retry.backoff_duration(attempt);
                    last_error = Some(e);
                    if !retry {
                        break;
                    }
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        let err = last_error
            .unwrap_or_else(|| GatewayError::upstream(service_name, "no attempt was made"));
        error!(service = %service_name, attempts = attempt, error = %err, "All routing attempts failed");
        err.to_http_response()
    }

    fn relay(&self, mut response: http::Response<Bytes>, endpoint: &Endpoint) -> http::Response<Bytes> {
        if self.debug_headers {
            let headers = response.headers_mut();
            if let Ok(value) = HeaderValue::from_str(endpoint.instance_id()) {
                headers.insert(INSTANCE_HEADER, value);
            }
            headers.insert(PORT_HEADER, HeaderValue::from(endpoint.port()));
        }
        response
    }
}

/// 去掉路径开头的 `/{service}` 段；剩余为空时返回 `/`
///
/// 只在段边界上匹配，`/svc` 不会从 `/svcx/a` 中剥离。
pub fn strip_service_prefix<'a>(path: &'a str, service_name: &str) -> &'a str {
    let rest = path
        .strip_prefix('/')
        .and_then(|p| p.strip_prefix(service_name));

    match rest {
        Some("") => "/",
        Some(rest) if rest.starts_with('/') => rest,
        _ => path,
    }
}

/// 拼接目标 URL，路径和查询串保持原样
pub fn build_target_url(endpoint: &Endpoint, path: &str, query: Option<&str>) -> String {
    match query {
        Some(query) => format!("{}{}?{}", endpoint.base_url(), path, query),
        None => format!("{}{}", endpoint.base_url(), path),
    }
}

/// 复制请求头，去掉 `Host` 和 `Content-Length`（由 HTTP 客户端重新生成）
pub fn forward_headers(headers: &HeaderMap) -> HeaderMap {
    let mut forwarded = headers.clone();
    forwarded.remove(HOST);
    forwarded.remove(CONTENT_LENGTH);
    forwarded
}
