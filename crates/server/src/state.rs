//! Application state shared across handlers.

use crate::session::{SessionError, SessionGate};
use menuboard_core::LocaleSet;
use menuboard_core::config::AppConfig;
use menuboard_storage::{AssetStore, Gallery};
use std::sync::Arc;

/// Errors building the application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// Image backends and the admin image lifecycle.
    pub gallery: Arc<Gallery>,
    /// Credential check and session tokens.
    pub sessions: Arc<SessionGate>,
    /// Supported page locales.
    pub locales: Arc<LocaleSet>,
    mounts: Arc<Vec<String>>,
}

impl AppState {
    /// Create the state, validating the configuration first.
    pub fn new(config: AppConfig, gallery: Gallery) -> Result<Self, StateError> {
        config.validate().map_err(StateError::Config)?;
        let locales = config
            .site
            .locale_set()
            .map_err(|e| StateError::Config(e.to_string()))?;
        let sessions = SessionGate::from_config(&config.auth)?;
        let mounts = gallery
            .backends()
            .iter()
            .filter_map(|backend| backend.mount_path().map(str::to_string))
            .collect();

        Ok(Self {
            config: Arc::new(config),
            gallery: Arc::new(gallery),
            sessions: Arc::new(sessions),
            locales: Arc::new(locales),
            mounts: Arc::new(mounts),
        })
    }

    /// URL paths under which local backends are served.
    pub fn mount_paths(&self) -> &[String] {
        &self.mounts
    }

    /// Backends served by this process, with their mount path.
    pub fn mounted_backends(&self) -> Vec<(String, Arc<dyn AssetStore>)> {
        self.gallery
            .backends()
            .iter()
            .filter_map(|backend| {
                backend
                    .mount_path()
                    .map(|mount| (mount.to_string(), backend.clone()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use menuboard_storage::FilesystemBackend;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_state_collects_mounts() {
        let temp = tempdir().unwrap();
        let backend = FilesystemBackend::new(temp.path(), "/menu").await.unwrap();
        let gallery = Gallery::new(vec![Arc::new(backend)], 0).unwrap();

        let state = AppState::new(AppConfig::for_testing(), gallery).unwrap();
        assert_eq!(state.mount_paths(), ["/menu".to_string()]);
        assert_eq!(state.mounted_backends().len(), 1);
        assert_eq!(state.locales.default_locale(), "cs");
    }

    #[tokio::test]
    async fn test_state_rejects_invalid_config() {
        let temp = tempdir().unwrap();
        let backend = FilesystemBackend::new(temp.path(), "/menu").await.unwrap();
        let gallery = Gallery::new(vec![Arc::new(backend)], 0).unwrap();

        let mut config = AppConfig::for_testing();
        config.auth.password.clear();
        assert!(matches!(
            AppState::new(config, gallery),
            Err(StateError::Config(_))
        ));
    }
}
