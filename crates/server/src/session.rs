//! Admin session tokens.
//!
//! A session is a signed, self-contained token: `base64url(payload).hex(mac)`
//! where the payload is `<username>-<issued unix ms>` and the MAC is
//! HMAC-SHA256 under a process secret. Nothing is stored server-side; a token
//! is valid while its signature checks out and it is younger than the TTL.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use hmac::{Hmac, Mac};
use menuboard_core::config::AuthConfig;
use rand::Rng;
use sha2::Sha256;
use std::time::Duration;
use time::OffsetDateTime;

type HmacSha256 = Hmac<Sha256>;

/// Cookie carrying the session token.
pub const SESSION_COOKIE: &str = "auth-token";

/// Length of a generated token secret.
const SECRET_LEN: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("malformed session token")]
    Malformed,

    #[error("session signature mismatch")]
    BadSignature,

    #[error("session expired")]
    Expired,

    #[error("invalid token secret: {0}")]
    Secret(String),
}

/// An issued session token.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("SessionToken").field(&"<redacted>").finish()
    }
}

/// A verified session, inserted into request extensions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    pub username: String,
    pub issued_at_ms: i64,
}

/// Credential check, token minting and verification.
pub struct SessionGate {
    username: String,
    password: String,
    secret: Vec<u8>,
    ttl: Duration,
    secure_cookies: bool,
}

impl std::fmt::Debug for SessionGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionGate")
            .field("username", &self.username)
            .field("ttl", &self.ttl)
            .field("secure_cookies", &self.secure_cookies)
            .finish_non_exhaustive()
    }
}

fn now_ms() -> i64 {
    let millis = OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;
    i64::try_from(millis).unwrap_or(i64::MAX)
}

impl SessionGate {
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        secret: Vec<u8>,
        ttl: Duration,
        secure_cookies: bool,
    ) -> Result<Self, SessionError> {
        if secret.len() < SECRET_LEN {
            return Err(SessionError::Secret(format!(
                "secret must be at least {SECRET_LEN} bytes"
            )));
        }
        Ok(Self {
            username: username.into(),
            password: password.into(),
            secret,
            ttl,
            secure_cookies,
        })
    }

    /// Build the gate from configuration, generating a random secret when
    /// none is configured.
    pub fn from_config(config: &AuthConfig) -> Result<Self, SessionError> {
        let secret = match &config.token_secret {
            Some(encoded) => {
                hex::decode(encoded).map_err(|e| SessionError::Secret(e.to_string()))?
            }
            None => {
                let mut secret = vec![0u8; SECRET_LEN];
                rand::rng().fill(&mut secret[..]);
                secret
            }
        };
        Self::new(
            config.username.clone(),
            config.password.clone(),
            secret,
            config.session_ttl(),
            config.secure_cookies,
        )
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn mac(&self) -> Result<HmacSha256, SessionError> {
        HmacSha256::new_from_slice(&self.secret).map_err(|e| SessionError::Secret(e.to_string()))
    }

    /// Constant-time comparison: both sides go through the MAC and the tags
    /// are compared with `verify_slice`.
    fn credentials_match(&self, username: &str, password: &str) -> Result<bool, SessionError> {
        let mut expected = self.mac()?;
        expected.update(self.username.as_bytes());
        expected.update(&[0]);
        expected.update(self.password.as_bytes());
        let expected = expected.finalize().into_bytes();

        let mut candidate = self.mac()?;
        candidate.update(username.as_bytes());
        candidate.update(&[0]);
        candidate.update(password.as_bytes());
        Ok(candidate.verify_slice(&expected).is_ok())
    }

    /// Check credentials and mint a token.
    pub fn login(&self, username: &str, password: &str) -> Result<SessionToken, SessionError> {
        self.login_at(username, password, now_ms())
    }

    pub fn login_at(
        &self,
        username: &str,
        password: &str,
        now_ms: i64,
    ) -> Result<SessionToken, SessionError> {
        if !self.credentials_match(username, password)? {
            return Err(SessionError::InvalidCredentials);
        }

        let payload = format!("{}-{}", self.username, now_ms);
        let mut mac = self.mac()?;
        mac.update(payload.as_bytes());
        let signature = hex::encode(mac.finalize().into_bytes());

        Ok(SessionToken(format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(payload.as_bytes()),
            signature
        )))
    }

    /// Verify a token's signature and age.
    pub fn verify(&self, token: &str) -> Result<Session, SessionError> {
        self.verify_at(token, now_ms())
    }

    pub fn verify_at(&self, token: &str, now_ms: i64) -> Result<Session, SessionError> {
        let (encoded, signature) = token.split_once('.').ok_or(SessionError::Malformed)?;
        let payload = URL_SAFE_NO_PAD
            .decode(encoded)
            .map_err(|_| SessionError::Malformed)?;
        let signature = hex::decode(signature).map_err(|_| SessionError::Malformed)?;

        let mut mac = self.mac()?;
        mac.update(&payload);
        mac.verify_slice(&signature)
            .map_err(|_| SessionError::BadSignature)?;

        let payload = String::from_utf8(payload).map_err(|_| SessionError::Malformed)?;
        let (username, issued) = payload.rsplit_once('-').ok_or(SessionError::Malformed)?;
        let issued_at_ms: i64 = issued.parse().map_err(|_| SessionError::Malformed)?;

        // Tokens minted for a previous username no longer grant access.
        if username != self.username {
            return Err(SessionError::BadSignature);
        }

        let ttl_ms = i64::try_from(self.ttl.as_millis()).unwrap_or(i64::MAX);
        if now_ms.saturating_sub(issued_at_ms) >= ttl_ms {
            return Err(SessionError::Expired);
        }

        Ok(Session {
            username: username.to_string(),
            issued_at_ms,
        })
    }

    /// `Set-Cookie` value for a freshly issued token.
    pub fn session_cookie(&self, token: &SessionToken) -> String {
        let mut cookie = format!(
            "{SESSION_COOKIE}={}; Path=/; HttpOnly; SameSite=Strict; Max-Age={}",
            token.as_str(),
            self.ttl.as_secs()
        );
        if self.secure_cookies {
            cookie.push_str("; Secure");
        }
        cookie
    }

    /// `Set-Cookie` value that clears the session.
    pub fn cleared_cookie(&self) -> String {
        let mut cookie = format!(
            "{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Strict; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT"
        );
        if self.secure_cookies {
            cookie.push_str("; Secure");
        }
        cookie
    }
}
