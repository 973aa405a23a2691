use std::time::{Duration, SystemTime, UNIX_EPOCH};

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::error::{GatewayError, Result};

/// JWT claims used for access tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    pub sub: String,
    pub role: String,
    pub iss: String,
    pub exp: usize,
    pub iat: usize,
    pub jti: String,
}

/// Stateless token service backed by HMAC (HS256)
pub struct TokenService {
    issuer: String,
    ttl: Duration,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl TokenService {
    /// Creates a new token service
    pub fn new(secret: impl AsRef<[u8]>, issuer: impl Into<String>, ttl_seconds: u64) -> Self {
        let secret = secret.as_ref();
        Self {
            issuer: issuer.into(),
            ttl: Duration::from_secs(ttl_seconds.max(60)),
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(&config.secret, config.issuer.clone(), config.ttl_seconds)
    }

    /// Issues a token for the given user and role
    pub fn generate_token(&self, username: &str, role: &str) -> Result<String> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|err| GatewayError::Internal(format!("system time error: {err}")))?;
        let iat = now.as_secs() as usize;
        let exp = (now + self.ttl).as_secs() as usize;

        let claims = TokenClaims {
            sub: username.to_string(),
            role: role.to_string(),
            iss: self.issuer.clone(),
            exp,
            iat,
            jti: Uuid::new_v4().to_string(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|err| GatewayError::Internal(format!("failed to encode token: {err}")))
    }

    /// Validates the token and returns the decoded claims
    pub fn validate_token(&self, token: &str) -> Result<TokenClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[self.issuer.as_str()]);

        decode::<TokenClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|err| GatewayError::AuthInvalid(err.to_string()))
    }

    /// Returns token TTL
    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_token_validates_with_role() {
        let service = TokenService::new("secret", "flare-gateway", 3600);
        let token = service.generate_token("admin", "ADMIN").unwrap();

        let claims = service.validate_token(&token).unwrap();
        assert_eq!(claims.sub, "admin");
        assert_eq!(claims.role, "ADMIN");
        assert_eq!(claims.iss, "flare-gateway");
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn token_from_another_secret_is_rejected() {
        let ours = TokenService::new("secret", "flare-gateway", 3600);
        let theirs = TokenService::new("other", "flare-gateway", 3600);
        let token = theirs.generate_token("admin", "ADMIN").unwrap();

        assert!(matches!(
            ours.validate_token(&token),
            Err(GatewayError::AuthInvalid(_))
        ));
    }

    #[test]
    fn token_from_another_issuer_is_rejected() {
        let ours = TokenService::new("secret", "flare-gateway", 3600);
        let theirs = TokenService::new("secret", "someone-else", 3600);
        let token = theirs.generate_token("admin", "ADMIN").unwrap();

        assert!(ours.validate_token(&token).is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let service = TokenService::new("secret", "flare-gateway", 3600);
        let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs() as usize;
        let claims = TokenClaims {
            sub: "user".into(),
            role: "USER".into(),
            iss: "flare-gateway".into(),
            exp: now - 3600,
            iat: now - 7200,
            jti: "t-1".into(),
        };
        let token = encode(&Header::default(), &claims, &EncodingKey::from_secret(b"secret")).unwrap();

        assert!(service.validate_token(&token).is_err());
    }

    #[test]
    fn garbage_is_rejected() {
        let service = TokenService::new("secret", "flare-gateway", 3600);
        assert!(service.validate_token("not-a-jwt").is_err());
    }

    #[test]
    fn ttl_has_a_floor() {
        let service = TokenService::new("secret", "flare-gateway", 1);
        assert_eq!(service.ttl(), Duration::from_secs(60));
    }
}
