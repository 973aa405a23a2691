//! 上游 HTTP 调用

use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderMap, Method};
use std::time::Duration;

use crate::error::{GatewayError, Result};

/// 发往上游实例的请求
#[derive(Debug, Clone)]
pub struct UpstreamRequest {
    pub service_name: String,
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// 上游调用 trait
///
/// 只有网络 / 协议层面的失败返回错误；上游返回的任何状态码都算成功。
#[async_trait]
pub trait UpstreamClient: Send + Sync {
    async fn send(&self, request: UpstreamRequest) -> Result<http::Response<Bytes>>;
}

/// 基于 reqwest 的上游客户端
pub struct ReqwestUpstream {
    client: reqwest::Client,
}

impl ReqwestUpstream {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            // 重定向原样交给调用方
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| GatewayError::Config(format!("failed to build upstream client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl UpstreamClient for ReqwestUpstream {
    async fn send(&self, request: UpstreamRequest) -> Result<http::Response<Bytes>> {
        let service_name = request.service_name;

        let resp = self
            .client
            .request(request.method, &request.url)
            .headers(request.headers)
            .body(request.body)
            .send()
            .await
            .map_err(|e| GatewayError::upstream(&service_name, e.to_string()))?;

        let status = resp.status();
        let headers = resp.headers().clone();
        let body = resp
            .bytes()
            .await
            .map_err(|e| GatewayError::upstream(&service_name, e.to_string()))?;

        let mut response = http::Response::new(body);
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Router, extract::Request, http::StatusCode, response::IntoResponse};
    use std::net::SocketAddr;

    /// 把收到的方法、路径、请求头和请求体回显出来
    async fn echo(request: Request) -> impl IntoResponse {
        let method = request.method().to_string();
        let uri = request.uri().to_string();
        let custom = request
            .headers()
            .get("x-custom")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        let body = axum::body::to_bytes(request.into_body(), 1024).await.unwrap();

        (
            StatusCode::ACCEPTED,
            [("x-echo-method", method)],
            format!("{} {} {}", uri, custom, String::from_utf8_lossy(&body)),
        )
    }

    async fn start_echo() -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, Router::new().fallback(echo)).await.unwrap();
        });
        addr
    }

    #[tokio::test]
    async fn relays_status_headers_and_body() {
        let addr = start_echo().await;
        let client = ReqwestUpstream::new(Duration::from_secs(2)).unwrap();

        let mut headers = HeaderMap::new();
        headers.insert("x-custom", "abc".parse().unwrap());

        let response = client
            .send(UpstreamRequest {
                service_name: "echo".into(),
                method: Method::PUT,
                url: format!("http://{}/items/1?verbose=true", addr),
                headers,
                body: Bytes::from_static(b"payload"),
            })
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(response.headers().get("x-echo-method").unwrap(), "PUT");
        assert_eq!(
            response.body().as_ref(),
            b"/items/1?verbose=true abc payload"
        );
    }

    #[tokio::test]
    async fn refused_connection_is_upstream_failure() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = ReqwestUpstream::new(Duration::from_secs(1)).unwrap();
        let err = client
            .send(UpstreamRequest {
                service_name: "ms-kotlin".into(),
                method: Method::GET,
                url: format!("http://{}/", addr),
                headers: HeaderMap::new(),
                body: Bytes::new(),
            })
            .await
            .unwrap_err();

        match err {
            GatewayError::UpstreamCallFailed { service, .. } => assert_eq!(service, "ms-kotlin"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
