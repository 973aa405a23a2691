//! Flare Gateway 错误处理模块
//!
//! 提供统一的错误类型、错误代码分类以及到 JSON 响应的转换

pub mod code;
pub mod gateway_error;
pub mod response;

pub use code::ErrorCode;
pub use gateway_error::{GatewayError, Result};
pub use response::ErrorBody;

/// 启动与配置路径默认使用的结果类型
pub type InfraResult<T> = anyhow::Result<T>;
