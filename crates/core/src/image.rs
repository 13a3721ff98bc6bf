//! Menu image identities.
//!
//! Every backend names its objects differently: the local directory holds
//! `menu2.jpg`, the object store holds `menu/menu2` or `menu/menu2.webp`.
//! The identity is the origin-agnostic short name derived from such a key and
//! is the deduplication key of the gallery.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Identity of the single admin-managed image.
pub const ADMIN_IMAGE_NAME: &str = "admin-menu";

/// Prefix of the numbered gallery images (`menu1`, `menu2`, ...).
pub const NUMBERED_PREFIX: &str = "menu";

/// File extensions recognized as images. `img` is what uploads of an
/// unrecognized image subtype are stored under.
pub const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "webp", "gif", "avif", "svg", "bmp", "img",
];

/// Where a resolved image came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    /// The admin-uploaded image, wherever it is stored.
    Admin,
    /// A numbered image from a local directory.
    Local,
    /// A numbered image from a remote object store.
    Remote,
}

impl Origin {
    pub fn as_str(&self) -> &'static str {
        match self {
            Origin::Admin => "admin",
            Origin::Local => "local",
            Origin::Remote => "remote",
        }
    }
}

impl std::fmt::Display for Origin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One resolved gallery entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRecord {
    /// Canonical short name (`menu3`, `admin-menu`).
    pub identity: String,
    /// Absolute remote URL or root-relative local path.
    pub url: String,
    pub origin: Origin,
    /// Numeric suffix of `menu<N>`; `0` for the admin image.
    pub ordinal: u32,
}

impl ImageRecord {
    /// Build a record from a classified key and the URL its backend serves it at.
    ///
    /// `backend_origin` is used for numbered images; admin images always get
    /// [`Origin::Admin`].
    pub fn new(classified: Classified, url: String, backend_origin: Origin) -> Self {
        match classified {
            Classified::Admin => Self {
                identity: ADMIN_IMAGE_NAME.to_string(),
                url,
                origin: Origin::Admin,
                ordinal: 0,
            },
            Classified::Numbered { ordinal } => Self {
                identity: format!("{NUMBERED_PREFIX}{ordinal}"),
                url,
                origin: backend_origin,
                ordinal,
            },
        }
    }

    pub fn is_admin(&self) -> bool {
        self.origin == Origin::Admin
    }
}

/// Result of classifying a storage key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Classified {
    /// The admin sentinel image.
    Admin,
    /// A numbered gallery image `menu<ordinal>`.
    Numbered { ordinal: u32 },
}

impl Classified {
    pub fn identity(&self) -> String {
        match self {
            Classified::Admin => ADMIN_IMAGE_NAME.to_string(),
            Classified::Numbered { ordinal } => format!("{NUMBERED_PREFIX}{ordinal}"),
        }
    }
}

/// Reduce a key, path or URL to its lowercase stem.
///
/// Returns `None` when the last segment is empty or carries a non-image
/// extension. Extensionless names are accepted.
pub fn image_stem(key: &str) -> Option<String> {
    let key = key.split(['?', '#']).next().unwrap_or_default();
    let segment = key.rsplit('/').next().unwrap_or_default();
    if segment.is_empty() {
        return None;
    }

    let stem = match segment.rsplit_once('.') {
        Some((stem, ext)) => {
            let ext = ext.to_ascii_lowercase();
            if !IMAGE_EXTENSIONS.contains(&ext.as_str()) {
                return None;
            }
            stem
        }
        None => segment,
    };

    if stem.is_empty() {
        return None;
    }
    Some(stem.to_ascii_lowercase())
}

/// Classify a storage key as the admin image, a numbered image, or neither.
pub fn classify_key(key: &str) -> Option<Classified> {
    let stem = image_stem(key)?;

    if stem.ends_with(ADMIN_IMAGE_NAME) {
        return Some(Classified::Admin);
    }

    let digits = stem.strip_prefix(NUMBERED_PREFIX)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    // Overlong ordinals are not gallery images.
    let ordinal = digits.parse::<u32>().ok()?;
    Some(Classified::Numbered { ordinal })
}

/// Whether a file name, key or URL names the admin image.
pub fn is_admin_name(name: &str) -> bool {
    matches!(classify_key(name), Some(Classified::Admin))
}

/// File extension to store an upload of the given MIME type under.
pub fn extension_for_mime(mime: &str) -> Result<&'static str> {
    let essence = mime.split(';').next().unwrap_or_default().trim();
    let subtype = essence
        .strip_prefix("image/")
        .ok_or_else(|| Error::UnsupportedMediaType(mime.to_string()))?;

    Ok(match subtype.to_ascii_lowercase().as_str() {
        "jpeg" | "jpg" | "pjpeg" => "jpg",
        "png" => "png",
        "webp" => "webp",
        "gif" => "gif",
        "avif" => "avif",
        "svg+xml" => "svg",
        "bmp" => "bmp",
        _ => "img",
    })
}

/// Content type to serve a stored image with, derived from its extension.
pub fn content_type_for(name: &str) -> &'static str {
    let ext = name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "avif" => "image/avif",
        "svg" => "image/svg+xml",
        "bmp" => "image/bmp",
        _ => "application/octet-stream",
    }
}

/// Storage key of the admin image for a given extension.
pub fn admin_key(extension: &str) -> String {
    format!("{ADMIN_IMAGE_NAME}.{extension}")
}
