//! `/auth/login` 与 `/auth/validate`

use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::{Json, Router, routing::post};
use http::StatusCode;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use super::credentials::CredentialVerifier;
use super::token::TokenService;
use crate::error::GatewayError;

/// 登录与 token 校验服务
pub struct AuthService {
    tokens: Arc<TokenService>,
    credentials: Arc<dyn CredentialVerifier>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub token_type: String,
    pub username: String,
    pub role: String,
    pub expires_in: u64,
}

#[derive(Debug, Deserialize)]
pub struct ValidateRequest {
    pub token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ValidateResponse {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AuthService {
    pub fn new(tokens: Arc<TokenService>, credentials: Arc<dyn CredentialVerifier>) -> Self {
        Self {
            tokens,
            credentials,
        }
    }

    pub fn login(&self, request: &LoginRequest) -> Result<LoginResponse, GatewayError> {
        let Some(role) = self.credentials.verify(&request.username, &request.password) else {
            warn!(username = %request.username, "Login rejected");
            return Err(GatewayError::InvalidCredentials);
        };

        let token = self.tokens.generate_token(&request.username, &role)?;
        info!(username = %request.username, role = %role, "Token issued");

        Ok(LoginResponse {
            token,
            token_type: "Bearer".to_string(),
            username: request.username.clone(),
            role,
            expires_in: self.tokens.ttl().as_secs(),
        })
    }

    pub fn validate(&self, token: &str) -> ValidateResponse {
        match self.tokens.validate_token(token) {
            Ok(claims) => ValidateResponse {
                valid: true,
                username: Some(claims.sub),
                role: Some(claims.role),
                error: None,
            },
            Err(err) => ValidateResponse {
                valid: false,
                username: None,
                role: None,
                error: Some(err.to_string()),
            },
        }
    }

    /// 认证路由，可直接 merge 到网关路由中
    pub fn routes<S>(self: Arc<Self>) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        Router::new()
            .route("/auth/login", post(login))
            .route("/auth/validate", post(validate))
            .with_state(self)
    }
}

async fn login(State(auth): State<Arc<AuthService>>, Json(request): Json<LoginRequest>) -> Response {
    match auth.login(&request) {
        Ok(response) => Json(response).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn validate(
    State(auth): State<Arc<AuthService>>,
    Json(request): Json<ValidateRequest>,
) -> Response {
    let response = auth.validate(&request.token);
    let status = if response.valid {
        StatusCode::OK
    } else {
        StatusCode::UNAUTHORIZED
    };
    (status, Json(response)).into_response()
}
