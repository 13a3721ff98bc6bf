//! Locale-prefixed page routing rules.

use crate::error::{Error, Result};

/// Supported locales and the default one.
///
/// Every page lives under a locale prefix (`/cs/...`, `/en/...`). API routes,
/// framework assets and anything that looks like a file are not pages.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LocaleSet {
    locales: Vec<String>,
    default: String,
}

impl LocaleSet {
    pub fn new(locales: Vec<String>, default: impl Into<String>) -> Result<Self> {
        let default = default.into();
        if locales.is_empty() {
            return Err(Error::Config("at least one locale is required".to_string()));
        }
        if let Some(bad) = locales
            .iter()
            .find(|l| l.is_empty() || l.contains('/') || l.contains('.'))
        {
            return Err(Error::Config(format!("invalid locale '{bad}'")));
        }
        if !locales.contains(&default) {
            return Err(Error::UnknownLocale(default));
        }
        Ok(Self { locales, default })
    }

    pub fn default_locale(&self) -> &str {
        &self.default
    }

    pub fn locales(&self) -> &[String] {
        &self.locales
    }

    pub fn is_supported(&self, locale: &str) -> bool {
        self.locales.iter().any(|l| l == locale)
    }

    /// Locale named by the first path segment, if it is a supported one.
    pub fn locale_of<'a>(&self, path: &'a str) -> Option<&'a str> {
        let first = path.trim_start_matches('/').split('/').next()?;
        self.is_supported(first).then_some(first)
    }

    /// Login page for a request path: the path's own locale, else the default.
    pub fn login_path(&self, path: &str) -> String {
        let locale = self.locale_of(path).unwrap_or(&self.default);
        format!("/{locale}/login")
    }

    /// Where a page path without a locale prefix should be redirected.
    ///
    /// Returns `None` for non-page paths and for paths that already carry a
    /// supported locale.
    pub fn localize(&self, path: &str) -> Option<String> {
        if !is_page_path(path) || self.locale_of(path).is_some() {
            return None;
        }
        if path == "/" || path.is_empty() {
            return Some(format!("/{}", self.default));
        }
        Some(format!("/{}{}", self.default, path))
    }
}

impl Default for LocaleSet {
    fn default() -> Self {
        Self {
            locales: ["cs", "en", "de", "pl"].map(String::from).to_vec(),
            default: "cs".to_string(),
        }
    }
}

/// Whether a path addresses a page rather than the API, framework assets or a
/// file.
pub fn is_page_path(path: &str) -> bool {
    let rest = path.strip_prefix('/').unwrap_or(path);
    !(rest.starts_with("api") || rest.starts_with("_next") || rest.contains('.'))
}

/// Whether a page path belongs to the admin surface.
pub fn is_admin_path(path: &str) -> bool {
    is_page_path(path) && path.contains("/admin")
}
