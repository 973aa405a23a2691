//! 认证模块：JWT 签发与校验、登录接口、请求过滤器

pub mod credentials;
pub mod filter;
pub mod handlers;
pub mod token;

pub use credentials::{CredentialVerifier, StaticCredentials};
pub use filter::{AuthFilter, AuthenticatedUser, PublicPaths, auth_middleware, bearer_token};
pub use handlers::{AuthService, LoginRequest, LoginResponse, ValidateRequest, ValidateResponse};
pub use token::{TokenClaims, TokenService};
