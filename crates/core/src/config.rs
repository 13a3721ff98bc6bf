//! Configuration types shared across crates.

use crate::locale::LocaleSet;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Server configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Enable the /metrics endpoint for Prometheus scraping (default: true).
    #[serde(default = "default_metrics_enabled")]
    pub metrics_enabled: bool,
    /// Maximum accepted upload request body in bytes.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: u64,
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_metrics_enabled() -> bool {
    true
}

fn default_max_upload_bytes() -> u64 {
    crate::DEFAULT_MAX_UPLOAD_BYTES
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            metrics_enabled: default_metrics_enabled(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

impl ServerConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.max_upload_bytes == 0 {
            return Err("server.max_upload_bytes cannot be 0".to_string());
        }
        if usize::try_from(self.max_upload_bytes).is_err() {
            return Err(format!(
                "server.max_upload_bytes {} exceeds the addressable size",
                self.max_upload_bytes
            ));
        }
        Ok(())
    }
}

/// A single asset backend.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BackendConfig {
    /// Local directory, served by this process.
    Filesystem {
        /// Directory holding the images.
        path: PathBuf,
        /// URL path the directory is served under (default: "/menu").
        #[serde(default = "default_public_path")]
        public_path: String,
        /// Receives admin uploads and deletes.
        #[serde(default)]
        writable: bool,
    },
    /// S3-compatible object store.
    S3 {
        /// Bucket name.
        bucket: String,
        /// Optional endpoint URL (for MinIO, etc.).
        endpoint: Option<String>,
        /// AWS region.
        region: Option<String>,
        /// Key prefix the images live under (default: "menu").
        #[serde(default = "default_s3_prefix")]
        prefix: Option<String>,
        /// AWS access key ID. Falls back to AWS_ACCESS_KEY_ID env var if not set.
        /// WARNING: Prefer env vars or IAM roles over storing secrets in config files.
        access_key_id: Option<String>,
        /// AWS secret access key. Falls back to AWS_SECRET_ACCESS_KEY env var if not set.
        /// WARNING: Prefer env vars or IAM roles over storing secrets in config files.
        secret_access_key: Option<String>,
        /// Force path-style URLs (e.g., `endpoint/bucket/key` instead of `bucket.endpoint/key`).
        /// Required for MinIO and some S3-compatible services.
        #[serde(default)]
        force_path_style: bool,
        /// Public base URL images are linked under (CDN or bucket website).
        /// Derived from endpoint and bucket when unset.
        public_base_url: Option<String>,
        /// Receives admin uploads and deletes.
        #[serde(default)]
        writable: bool,
    },
}

fn default_public_path() -> String {
    "/menu".to_string()
}

fn default_s3_prefix() -> Option<String> {
    Some("menu".to_string())
}

impl BackendConfig {
    pub fn is_writable(&self) -> bool {
        match self {
            BackendConfig::Filesystem { writable, .. } | BackendConfig::S3 { writable, .. } => {
                *writable
            }
        }
    }

    /// Validate backend configuration invariants.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            BackendConfig::Filesystem { public_path, .. } => {
                if !public_path.starts_with('/') || public_path.len() < 2 {
                    return Err(format!(
                        "filesystem public_path '{public_path}' must start with '/' and name a directory"
                    ));
                }
                if public_path.starts_with("/api") {
                    return Err(format!(
                        "filesystem public_path '{public_path}' collides with the API routes"
                    ));
                }
                if public_path.ends_with('/') {
                    return Err(format!(
                        "filesystem public_path '{public_path}' must not end with '/'"
                    ));
                }
                Ok(())
            }
            BackendConfig::S3 {
                bucket,
                access_key_id,
                secret_access_key,
                ..
            } => {
                if bucket.is_empty() {
                    return Err("s3 config requires a bucket".to_string());
                }
                match (access_key_id.as_ref(), secret_access_key.as_ref()) {
                    (Some(_), Some(_)) | (None, None) => Ok(()),
                    _ => Err(
                        "s3 config requires both access_key_id and secret_access_key when either is set"
                            .to_string(),
                    ),
                }
            }
        }
    }
}

/// Storage configuration: backends in priority order.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StorageConfig {
    pub backends: Vec<BackendConfig>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backends: vec![BackendConfig::Filesystem {
                path: PathBuf::from("./data/menu"),
                public_path: default_public_path(),
                writable: true,
            }],
        }
    }
}

impl StorageConfig {
    /// Index of the backend that receives writes.
    ///
    /// The backend flagged `writable`, else the first one.
    pub fn writer_index(&self) -> Option<usize> {
        if self.backends.is_empty() {
            return None;
        }
        Some(
            self.backends
                .iter()
                .position(BackendConfig::is_writable)
                .unwrap_or(0),
        )
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.backends.is_empty() {
            return Err("storage.backends must list at least one backend".to_string());
        }
        let writers = self.backends.iter().filter(|b| b.is_writable()).count();
        if writers > 1 {
            return Err(format!(
                "storage.backends flags {writers} backends as writable; at most one is allowed"
            ));
        }

        let mut mounts = Vec::new();
        for (idx, backend) in self.backends.iter().enumerate() {
            backend
                .validate()
                .map_err(|e| format!("storage.backends[{idx}]: {e}"))?;
            if let BackendConfig::Filesystem { public_path, .. } = backend {
                if mounts.contains(&public_path) {
                    return Err(format!(
                        "storage.backends[{idx}]: public_path '{public_path}' is already mounted"
                    ));
                }
                mounts.push(public_path);
            }
        }
        Ok(())
    }
}

/// Admin session configuration.
///
/// A single credential pair guards the admin surface.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuthConfig {
    pub username: String,
    /// WARNING: Prefer MENUBOARD_AUTH__PASSWORD env var over storing in config.
    pub password: String,
    /// Hex-encoded HMAC secret for session tokens (at least 32 bytes).
    /// A random secret is generated at startup when unset, which invalidates
    /// sessions on restart.
    pub token_secret: Option<String>,
    /// Session lifetime in seconds (default: 7200).
    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: u64,
    /// Mark the session cookie `Secure` (enable behind HTTPS).
    #[serde(default)]
    pub secure_cookies: bool,
}

fn default_session_ttl_secs() -> u64 {
    crate::DEFAULT_SESSION_TTL_SECS
}

impl AuthConfig {
    /// Create a test configuration with the site's stock credentials.
    ///
    /// **For testing only.**
    pub fn for_testing() -> Self {
        Self {
            username: "nonla".to_string(),
            password: "1582".to_string(),
            token_secret: None,
            session_ttl_secs: default_session_ttl_secs(),
            secure_cookies: false,
        }
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.username.is_empty() {
            return Err("auth.username cannot be empty".to_string());
        }
        if self.password.is_empty() {
            return Err("auth.password cannot be empty".to_string());
        }
        if self.session_ttl_secs == 0 {
            return Err("auth.session_ttl_secs cannot be 0".to_string());
        }
        if let Some(secret) = &self.token_secret {
            if secret.len() < 64 || !secret.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Err(
                    "auth.token_secret must be at least 32 bytes of hex (64 characters)"
                        .to_string(),
                );
            }
            if secret.len() % 2 != 0 {
                return Err("auth.token_secret must have an even number of hex digits".to_string());
            }
        }
        Ok(())
    }
}

/// Site-wide routing configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SiteConfig {
    #[serde(default = "default_locales")]
    pub locales: Vec<String>,
    #[serde(default = "default_locale")]
    pub default_locale: String,
}

fn default_locales() -> Vec<String> {
    LocaleSet::default().locales().to_vec()
}

fn default_locale() -> String {
    LocaleSet::default().default_locale().to_string()
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            locales: default_locales(),
            default_locale: default_locale(),
        }
    }
}

impl SiteConfig {
    pub fn locale_set(&self) -> crate::Result<LocaleSet> {
        LocaleSet::new(self.locales.clone(), self.default_locale.clone())
    }

    pub fn validate(&self) -> Result<(), String> {
        self.locale_set().map(|_| ()).map_err(|e| format!("site: {e}"))
    }
}

/// Complete application configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    /// Admin credentials (required).
    pub auth: AuthConfig,
    #[serde(default)]
    pub site: SiteConfig,
}

impl AppConfig {
    /// Create a test configuration with sensible defaults.
    ///
    /// **For testing only.** Uses filesystem storage under `./data/menu`
    /// and the stock credentials.
    pub fn for_testing() -> Self {
        Self {
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            auth: AuthConfig::for_testing(),
            site: SiteConfig::default(),
        }
    }

    /// Validate every section.
    pub fn validate(&self) -> Result<(), String> {
        self.server.validate()?;
        self.storage.validate()?;
        self.auth.validate()?;
        self.site.validate()?;
        Ok(())
    }
}
