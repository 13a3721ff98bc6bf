//! Front-line request interceptor and session extraction.

use crate::error::ApiError;
use crate::session::{SESSION_COOKIE, Session};
use crate::state::AppState;
use axum::extract::{FromRequestParts, Request, State};
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::CookieJar;
use menuboard_core::locale::{is_admin_path, is_page_path};
use tracing::Instrument;
use uuid::Uuid;

/// Maximum length for trace IDs.
/// Longer trace IDs are truncated to prevent log bloat and potential log injection.
const MAX_TRACE_ID_LEN: usize = 128;

/// Trace ID for request correlation.
#[derive(Clone, Debug)]
pub struct TraceId(pub String);

impl TraceId {
    /// Generate a new random trace ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create a trace ID from a client-provided value, keeping at most
    /// `MAX_TRACE_ID_LEN` printable ASCII characters.
    pub fn from_client(value: &str) -> Self {
        let sanitized: String = value
            .chars()
            .take(MAX_TRACE_ID_LEN)
            .filter(|c| c.is_ascii_graphic() || *c == ' ')
            .collect();

        if sanitized.is_empty() {
            Self::new()
        } else {
            Self(sanitized)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TraceId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TraceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn extract_or_generate_trace_id(req: &Request) -> TraceId {
    req.headers()
        .get("x-trace-id")
        .and_then(|v| v.to_str().ok())
        .map(TraceId::from_client)
        .unwrap_or_else(TraceId::new)
}

/// Verify the session cookie, if any.
fn session_from_cookie(state: &AppState, req: &Request) -> Option<Session> {
    let jar = CookieJar::from_headers(req.headers());
    let token = jar.get(SESSION_COOKIE)?.value();
    if token.is_empty() {
        return None;
    }
    match state.sessions.verify(token) {
        Ok(session) => Some(session),
        Err(e) => {
            tracing::debug!(error = %e, "Ignoring invalid session cookie");
            None
        }
    }
}

/// Whether the locale and admin rules apply to this path.
///
/// Asset mounts and the metrics endpoint look like page paths but are
/// served directly.
fn is_routed_page(state: &AppState, path: &str) -> bool {
    if !is_page_path(path) || path == "/metrics" {
        return false;
    }
    !state.mount_paths().iter().any(|mount| {
        path == mount.as_str()
            || path
                .strip_prefix(mount.as_str())
                .is_some_and(|rest| rest.starts_with('/'))
    })
}

fn with_query(target: String, req: &Request) -> String {
    match req.uri().query() {
        Some(query) if !query.is_empty() => format!("{target}?{query}"),
        _ => target,
    }
}

/// Request interceptor.
///
/// Attaches a trace ID and the verified [`Session`] (if any) to the request,
/// redirects page paths without a locale prefix to the default locale, and
/// sends anonymous visitors of admin pages to the login page.
pub async fn request_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    let trace_id = extract_or_generate_trace_id(&req);
    let span = tracing::info_span!("request", trace_id = %trace_id);
    req.extensions_mut().insert(trace_id);

    let session = session_from_cookie(&state, &req);
    let path = req.uri().path().to_string();

    if is_routed_page(&state, &path) {
        if let Some(target) = state.locales.localize(&path) {
            let target = with_query(target, &req);
            span.in_scope(|| tracing::debug!(from = %path, to = %target, "Locale redirect"));
            return Redirect::temporary(&target).into_response();
        }

        if is_admin_path(&path) && session.is_none() {
            let target = state.locales.login_path(&path);
            span.in_scope(|| tracing::info!(path = %path, "Anonymous admin request redirected to login"));
            return Redirect::temporary(&target).into_response();
        }
    }

    if let Some(session) = session {
        req.extensions_mut().insert(session);
    }

    next.run(req).instrument(span).await
}

/// Extractor for handlers that require a logged-in admin.
#[derive(Clone, Debug)]
pub struct AdminSession(pub Session);

impl<S> FromRequestParts<S> for AdminSession
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Session>()
            .cloned()
            .map(AdminSession)
            .ok_or_else(|| ApiError::Unauthorized("authentication required".to_string()))
    }
}
