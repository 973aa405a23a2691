//! 登录凭据校验

use std::collections::HashMap;

use crate::config::UserConfig;

/// 凭据校验 trait，成功时返回用户角色
pub trait CredentialVerifier: Send + Sync {
    fn verify(&self, username: &str, password: &str) -> Option<String>;
}

/// 配置文件中的静态用户表
#[derive(Debug, Default, Clone)]
pub struct StaticCredentials {
    // username -> (password, role)
    users: HashMap<String, (String, String)>,
}

impl StaticCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
        role: impl Into<String>,
    ) -> Self {
        self.users
            .insert(username.into(), (password.into(), role.into()));
        self
    }

    pub fn from_config(users: &[UserConfig]) -> Self {
        users.iter().fold(Self::new(), |creds, user| {
            creds.with_user(&user.username, &user.password, &user.role)
        })
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

impl CredentialVerifier for StaticCredentials {
    fn verify(&self, username: &str, password: &str) -> Option<String> {
        self.users
            .get(username)
            .filter(|(expected, _)| expected == password)
            .map(|(_, role)| role.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verifies_configured_users() {
        let creds = StaticCredentials::from_config(&[
            UserConfig {
                username: "admin".into(),
                password: "admin123".into(),
                role: "ADMIN".into(),
            },
            UserConfig {
                username: "user".into(),
                password: "user123".into(),
                role: "USER".into(),
            },
        ]);

        assert_eq!(creds.len(), 2);
        assert_eq!(creds.verify("admin", "admin123").as_deref(), Some("ADMIN"));
        assert_eq!(creds.verify("user", "user123").as_deref(), Some("USER"));
        assert!(creds.verify("admin", "wrong").is_none());
        assert!(creds.verify("nobody", "admin123").is_none());
    }
}
