//! 错误代码定义
//!
//! 每个代码对应一个稳定的英文标识符和一个 HTTP 状态码，
//! 网关对外返回的 JSON 错误体中的 `code` 字段即来自这里。

use http::StatusCode;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 错误代码枚举
///
/// 错误代码按类别分组：
/// - 2000-2999: 认证相关错误
/// - 6000-6999: 系统相关错误
/// - 7000-7999: 网络 / 上游相关错误
/// - 9000-9999: 通用错误
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u32)]
pub enum ErrorCode {
    // ============================================================
    // 认证相关错误 (2000-2999)
    // ============================================================
    AuthenticationFailed = 2000,
    AuthenticationRequired = 2003,
    TokenInvalid = 2005,

    // ============================================================
    // 系统相关错误 (6000-6999)
    // ============================================================
    InternalError = 6000,
    ServiceUnavailable = 6001,
    ConfigurationError = 6003,
    DiscoveryUnavailable = 6005,
    EndpointUnhealthy = 6006,

    // ============================================================
    // 网络相关错误 (7000-7999)
    // ============================================================
    UpstreamCallFailed = 7000,

    // ============================================================
    // 通用错误 (9000-9999)
    // ============================================================
    RouteNotFound = 9001,
    PayloadTooLarge = 9002,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl ErrorCode {
    /// 获取错误代码的数字值
    #[inline]
    pub fn as_u32(&self) -> u32 {
        *self as u32
    }

    /// 获取错误代码的英文标识符
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::AuthenticationFailed => "AUTHENTICATION_FAILED",
            ErrorCode::AuthenticationRequired => "AUTHENTICATION_REQUIRED",
            ErrorCode::TokenInvalid => "TOKEN_INVALID",
            ErrorCode::InternalError => "INTERNAL_ERROR",
            ErrorCode::ServiceUnavailable => "SERVICE_UNAVAILABLE",
            ErrorCode::ConfigurationError => "CONFIGURATION_ERROR",
            ErrorCode::DiscoveryUnavailable => "DISCOVERY_UNAVAILABLE",
            ErrorCode::EndpointUnhealthy => "ENDPOINT_UNHEALTHY",
            ErrorCode::UpstreamCallFailed => "UPSTREAM_CALL_FAILED",
            ErrorCode::RouteNotFound => "ROUTE_NOT_FOUND",
            ErrorCode::PayloadTooLarge => "PAYLOAD_TOO_LARGE",
        }
    }

    /// 对外暴露时使用的 HTTP 状态码
    pub fn http_status(&self) -> StatusCode {
        match self {
            ErrorCode::AuthenticationFailed
            | ErrorCode::AuthenticationRequired
            | ErrorCode::TokenInvalid => StatusCode::UNAUTHORIZED,
            ErrorCode::ServiceUnavailable
            | ErrorCode::DiscoveryUnavailable
            | ErrorCode::EndpointUnhealthy => StatusCode::SERVICE_UNAVAILABLE,
            ErrorCode::RouteNotFound => StatusCode::NOT_FOUND,
            ErrorCode::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ErrorCode::InternalError
            | ErrorCode::ConfigurationError
            | ErrorCode::UpstreamCallFailed => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 判断调用方是否可以原样重试整个请求
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorCode::ServiceUnavailable
                | ErrorCode::DiscoveryUnavailable
                | ErrorCode::EndpointUnhealthy
                | ErrorCode::UpstreamCallFailed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_codes_are_not_retryable() {
        for code in [
            ErrorCode::AuthenticationFailed,
            ErrorCode::AuthenticationRequired,
            ErrorCode::TokenInvalid,
        ] {
            assert_eq!(code.http_status(), StatusCode::UNAUTHORIZED);
            assert!(!code.is_retryable());
        }
    }

    #[test]
    fn transient_codes_are_retryable() {
        assert!(ErrorCode::ServiceUnavailable.is_retryable());
        assert!(ErrorCode::UpstreamCallFailed.is_retryable());
        assert_eq!(
            ErrorCode::ServiceUnavailable.http_status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ErrorCode::UpstreamCallFailed.http_status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn serializes_as_screaming_snake_case() {
        let json = serde_json::to_string(&ErrorCode::RouteNotFound).unwrap();
        assert_eq!(json, "\"ROUTE_NOT_FOUND\"");
        assert_eq!(ErrorCode::RouteNotFound.to_string(), "ROUTE_NOT_FOUND");
    }
}
