//! 认证过滤器
//!
//! 公开路径直接放行；其他路径要求 `Authorization: Bearer <token>`。

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use http::HeaderMap;
use http::header::AUTHORIZATION;
use std::sync::Arc;
use tracing::{debug, warn};

use super::token::{TokenClaims, TokenService};
use crate::config::AuthConfig;
use crate::error::{GatewayError, Result};

/// 公开路径白名单
///
/// 以 `*` 结尾的条目按前缀匹配，其余条目精确匹配。
#[derive(Debug, Clone, Default)]
pub struct PublicPaths {
    exact: Vec<String>,
    prefixes: Vec<String>,
}

impl PublicPaths {
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut paths = Self::default();
        for pattern in patterns {
            let pattern = pattern.as_ref();
            match pattern.strip_suffix('*') {
                Some(prefix) => paths.prefixes.push(prefix.to_string()),
                None => paths.exact.push(pattern.to_string()),
            }
        }
        paths
    }

    pub fn is_public(&self, path: &str) -> bool {
        self.exact.iter().any(|p| p == path)
            || self.prefixes.iter().any(|p| path.starts_with(p.as_str()))
    }
}

/// 已认证的调用方，写入请求扩展供后续处理使用
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub username: String,
    pub role: String,
}

impl From<TokenClaims> for AuthenticatedUser {
    fn from(claims: TokenClaims) -> Self {
        Self {
            username: claims.sub,
            role: claims.role,
        }
    }
}

/// 认证过滤器
pub struct AuthFilter {
    enabled: bool,
    public_paths: PublicPaths,
    token_service: Arc<TokenService>,
}

impl AuthFilter {
    pub fn new(enabled: bool, public_paths: PublicPaths, token_service: Arc<TokenService>) -> Self {
        Self {
            enabled,
            public_paths,
            token_service,
        }
    }

    pub fn from_config(config: &AuthConfig, token_service: Arc<TokenService>) -> Self {
        Self::new(
            config.enabled,
            PublicPaths::new(&config.public_paths),
            token_service,
        )
    }

    /// 校验请求；放行时返回已认证用户（公开路径或未启用认证时为 `None`）
    pub fn intercept(&self, path: &str, headers: &HeaderMap) -> Result<Option<AuthenticatedUser>> {
        if !self.enabled || self.public_paths.is_public(path) {
            return Ok(None);
        }

        let token = bearer_token(headers).ok_or(GatewayError::AuthMissing)?;

        let claims = self.token_service.validate_token(token).inspect_err(|err| {
            warn!(path = %path, error = %err, "Invalid token");
        })?;

        debug!(subject = %claims.sub, path = %path, "Request authenticated");
        Ok(Some(claims.into()))
    }
}

/// 从 `Authorization` 头中取出 Bearer token
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// axum 中间件：`axum::middleware::from_fn_with_state(filter, auth_middleware)`
pub async fn auth_middleware(
    State(filter): State<Arc<AuthFilter>>,
    mut request: Request,
    next: Next,
) -> Response {
    match filter.intercept(request.uri().path(), request.headers()) {
        Ok(user) => {
            if let Some(user) = user {
                request.extensions_mut().insert(user);
            }
            next.run(request).await
        }
        Err(err) => err.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter() -> (AuthFilter, Arc<TokenService>) {
        let tokens = Arc::new(TokenService::new("secret", "flare-gateway", 3600));
        let filter = AuthFilter::from_config(
            &AuthConfig {
                enabled: true,
                secret: "secret".into(),
                ..AuthConfig::default()
            },
            tokens.clone(),
        );
        (filter, tokens)
    }

    fn with_auth(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, value.parse().unwrap());
        headers
    }

    #[test]
    fn public_paths_match_exact_or_by_prefix() {
        let paths = PublicPaths::new(["/", "/auth/login", "/actuator/health*"]);

        assert!(paths.is_public("/"));
        assert!(paths.is_public("/auth/login"));
        assert!(paths.is_public("/actuator/health"));
        assert!(paths.is_public("/actuator/health/liveness"));

        assert!(!paths.is_public("/ms-kotlin/api"));
        assert!(!paths.is_public("/auth/login/extra"));
    }

    #[test]
    fn bearer_prefix_is_required() {
        assert_eq!(bearer_token(&with_auth("Bearer abc")), Some("abc"));
        assert_eq!(bearer_token(&with_auth("abc")), None);
        assert_eq!(bearer_token(&with_auth("Bearer ")), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }

    #[test]
    fn protected_path_without_token_is_rejected() {
        let (filter, _) = filter();
        let err = filter.intercept("/ms-kotlin/api", &HeaderMap::new()).unwrap_err();
        assert!(matches!(err, GatewayError::AuthMissing));
    }

    #[test]
    fn protected_path_with_bad_token_is_rejected() {
        let (filter, _) = filter();
        let err = filter
            .intercept("/ms-kotlin/api", &with_auth("Bearer nope"))
            .unwrap_err();
        assert!(matches!(err, GatewayError::AuthInvalid(_)));
    }

    #[test]
    fn valid_token_yields_the_user() {
        let (filter, tokens) = filter();
        let token = tokens.generate_token("manager", "MANAGER").unwrap();

        let user = filter
            .intercept("/ms-kotlin/api", &with_auth(&format!("Bearer {token}")))
            .unwrap();
        assert_eq!(
            user,
            Some(AuthenticatedUser {
                username: "manager".into(),
                role: "MANAGER".into(),
            })
        );
    }

    #[test]
    fn public_path_and_disabled_filter_pass_without_token() {
        let (filter, tokens) = filter();
        assert!(filter.intercept("/auth/login", &HeaderMap::new()).unwrap().is_none());

        let disabled = AuthFilter::new(false, PublicPaths::default(), tokens);
        assert!(disabled.intercept("/ms-kotlin/api", &HeaderMap::new()).unwrap().is_none());
    }
}
