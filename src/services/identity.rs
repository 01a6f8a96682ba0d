use std::path::PathBuf;

use async_trait::async_trait;

use crate::config::{Config, IdentityConfig};
use crate::error::{AppError, Result};

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_in(&self) -> Result<String>;
}

/// Identity handed in through configuration (a token-derived user id).
pub struct ConfiguredIdentity {
    user_id: String,
}

impl ConfiguredIdentity {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
        }
    }
}

#[async_trait]
impl IdentityProvider for ConfiguredIdentity {
    async fn sign_in(&self) -> Result<String> {
        let user_id = self.user_id.trim();
        if user_id.is_empty() {
            return Err(AppError::AuthFailure(
                "configured user id is empty".to_string(),
            ));
        }
        Ok(user_id.to_string())
    }
}

/// Anonymous identity, generated once and kept in a file for later runs.
pub struct AnonymousIdentity {
    path: PathBuf,
}

impl AnonymousIdentity {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn default_path() -> PathBuf {
        Config::config_dir().join("identity")
    }
}

#[async_trait]
impl IdentityProvider for AnonymousIdentity {
    async fn sign_in(&self) -> Result<String> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(existing) if !existing.trim().is_empty() => return Ok(existing.trim().to_string()),
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(AppError::AuthFailure(e.to_string())),
        }

        let user_id = uuid::Uuid::new_v4().to_string();
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::AuthFailure(e.to_string()))?;
        }
        tokio::fs::write(&self.path, &user_id)
            .await
            .map_err(|e| AppError::AuthFailure(e.to_string()))?;

        tracing::info!("Created anonymous identity");
        Ok(user_id)
    }
}

pub fn provider_from_config(config: &IdentityConfig) -> Box<dyn IdentityProvider> {
    match &config.user_id {
        Some(user_id) => Box::new(ConfiguredIdentity::new(user_id.clone())),
        None => Box::new(AnonymousIdentity::new(AnonymousIdentity::default_path())),
    }
}

/// Signs in, falling back to a throwaway random id so the app stays usable.
///
/// The second value is a banner message when the fallback was taken.
pub async fn resolve_identity(provider: &dyn IdentityProvider) -> (String, Option<String>) {
    match provider.sign_in().await {
        Ok(user_id) => (user_id, None),
        Err(e) => {
            tracing::error!(error = %e, "Sign-in failed, using a temporary identity");
            (
                uuid::Uuid::new_v4().to_string(),
                Some(format!("User authentication failed. ({e})")),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn configured_identity_is_used_verbatim() {
        let (user_id, notice) = resolve_identity(&ConfiguredIdentity::new(" user-42 ")).await;
        assert_eq!(user_id, "user-42");
        assert!(notice.is_none());
    }

    #[tokio::test]
    async fn empty_identity_falls_back_to_random_id() {
        let (first, notice) = resolve_identity(&ConfiguredIdentity::new("")).await;
        let (second, _) = resolve_identity(&ConfiguredIdentity::new("")).await;

        assert!(notice.unwrap().contains("authentication failed"));
        assert!(!first.is_empty());
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn anonymous_identity_is_stable_across_runs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("identity");

        let first = AnonymousIdentity::new(path.clone()).sign_in().await.unwrap();
        let second = AnonymousIdentity::new(path.clone()).sign_in().await.unwrap();

        assert_eq!(first, second);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), first);
    }
}
