//! 网关统一错误类型

use super::code::ErrorCode;
use thiserror::Error;

/// 网关统一错误类型
///
/// 发现层的错误（`DiscoveryUnavailable`、`EndpointUnhealthy`）只在内部流转，
/// 在产生处就被降级为“没有可用实例”；只有路由器会把累计的失败转换成调用方可见的错误。
#[derive(Error, Debug, Clone)]
pub enum GatewayError {
    /// 注册中心不可达或返回了无法解析的数据
    #[error("registry unavailable: {0}")]
    DiscoveryUnavailable(String),

    /// 单次健康探测失败
    #[error("endpoint {host}:{port} unhealthy: {reason}")]
    EndpointUnhealthy {
        host: String,
        port: u16,
        reason: String,
    },

    /// 所有发现途径都没有得到健康实例
    #[error("No healthy instances found")]
    NoHealthyEndpoints { service: String },

    /// 代理上游调用失败（网络或协议错误）
    #[error("{reason}")]
    UpstreamCallFailed { service: String, reason: String },

    /// 请求未携带 token
    #[error("missing token, use the header: Authorization: Bearer <token>")]
    AuthMissing,

    /// token 无效或已过期
    #[error("invalid or expired token: {0}")]
    AuthInvalid(String),

    /// 登录凭据错误
    #[error("invalid credentials")]
    InvalidCredentials,

    /// 未声明的服务
    #[error("no route for service {service}")]
    RouteNotFound { service: String },

    /// 请求体超过上限
    #[error("request body exceeds {limit} bytes")]
    PayloadTooLarge { limit: usize },

    /// 配置错误
    #[error("configuration error: {0}")]
    Config(String),

    /// 内部错误
    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// 创建上游调用失败错误
    pub fn upstream(service: impl Into<String>, reason: impl Into<String>) -> Self {
        GatewayError::UpstreamCallFailed {
            service: service.into(),
            reason: reason.into(),
        }
    }

    /// 创建健康探测失败错误
    pub fn unhealthy(host: impl Into<String>, port: u16, reason: impl Into<String>) -> Self {
        GatewayError::EndpointUnhealthy {
            host: host.into(),
            port,
            reason: reason.into(),
        }
    }

    /// 获取错误代码
    pub fn code(&self) -> ErrorCode {
        match self {
            GatewayError::DiscoveryUnavailable(_) => ErrorCode::DiscoveryUnavailable,
            GatewayError::EndpointUnhealthy { .. } => ErrorCode::EndpointUnhealthy,
            GatewayError::NoHealthyEndpoints { .. } => ErrorCode::ServiceUnavailable,
            GatewayError::UpstreamCallFailed { .. } => ErrorCode::UpstreamCallFailed,
            GatewayError::AuthMissing => ErrorCode::AuthenticationRequired,
            GatewayError::AuthInvalid(_) => ErrorCode::TokenInvalid,
            GatewayError::InvalidCredentials => ErrorCode::AuthenticationFailed,
            GatewayError::RouteNotFound { .. } => ErrorCode::RouteNotFound,
            GatewayError::PayloadTooLarge { .. } => ErrorCode::PayloadTooLarge,
            GatewayError::Config(_) => ErrorCode::ConfigurationError,
            GatewayError::Internal(_) => ErrorCode::InternalError,
        }
    }

    /// 错误摘要，对应 JSON 错误体中的 `error` 字段
    pub fn summary(&self) -> String {
        match self {
            GatewayError::NoHealthyEndpoints { service } => {
                format!("service {} not available", service)
            }
            GatewayError::UpstreamCallFailed { service, .. } => {
                format!("error routing to {}", service)
            }
            GatewayError::AuthMissing | GatewayError::AuthInvalid(_) => "Unauthorized".to_string(),
            GatewayError::InvalidCredentials => "invalid credentials".to_string(),
            other => other.to_string(),
        }
    }

    /// 判断调用方是否可以重试整个请求
    pub fn is_retryable(&self) -> bool {
        self.code().is_retryable()
    }
}

/// 结果类型别名
pub type Result<T> = std::result::Result<T, GatewayError>;
