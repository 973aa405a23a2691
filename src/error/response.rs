//! 错误到 HTTP 响应的转换
//!
//! 所有对外错误都是 `{"error", "message", "code"}` 形式的 JSON 对象。

use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::HeaderValue;
use serde::{Deserialize, Serialize};

use super::GatewayError;

/// JSON 错误体
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
    pub code: String,
}

impl From<&GatewayError> for ErrorBody {
    fn from(err: &GatewayError) -> Self {
        Self {
            error: err.summary(),
            message: err.to_string(),
            code: err.code().as_str().to_string(),
        }
    }
}

impl GatewayError {
    /// 转换为与框架无关的 HTTP 响应
    pub fn to_http_response(&self) -> http::Response<Bytes> {
        let body = serde_json::to_vec(&ErrorBody::from(self)).unwrap_or_else(|_| {
            br#"{"error":"internal error","message":"failed to encode error","code":"INTERNAL_ERROR"}"#
                .to_vec()
        });

        let mut response = http::Response::new(Bytes::from(body));
        *response.status_mut() = self.code().http_status();
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        response
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        self.to_http_response().map(axum::body::Body::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;

    #[test]
    fn unavailable_renders_503_json() {
        let err = GatewayError::NoHealthyEndpoints {
            service: "ms-kotlin".into(),
        };
        let response = err.to_http_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            "application/json"
        );

        let body: ErrorBody = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(body.error, "service ms-kotlin not available");
        assert_eq!(body.code, "SERVICE_UNAVAILABLE");
    }

    #[test]
    fn auth_missing_renders_401() {
        let response = GatewayError::AuthMissing.to_http_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
