use anyhow::{Context, Result};
use reqwest::Url;
use reqwest::header::{COOKIE, SET_COOKIE};
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

/// Cookie the server keeps the session in.
pub const SESSION_COOKIE: &str = "auth-token";

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    session: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url).context("invalid server URL")?;
        Ok(Self {
            http: reqwest::Client::new(),
            base_url,
            session: None,
        })
    }

    /// Reuse a session token from an earlier login.
    pub fn with_session(mut self, token: impl Into<String>) -> Self {
        self.session = Some(token.into());
        self
    }

    pub fn session(&self) -> Option<&str> {
        self.session.as_deref()
    }

    fn url(&self, path: &str) -> Result<Url> {
        self.base_url.join(path).context("failed to build API URL")
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.session {
            Some(token) => req.header(COOKIE, format!("{SESSION_COOKIE}={token}")),
            None => req,
        }
    }

    async fn send(&self, req: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        let response = self.authorize(req).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error)
                .unwrap_or(body);
            anyhow::bail!("API error ({}): {}", status, message);
        }
        Ok(response)
    }

    async fn send_json<T: DeserializeOwned>(&self, req: reqwest::RequestBuilder) -> Result<T> {
        let response = self.send(req).await?;
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    pub async fn health(&self) -> Result<HealthResponse> {
        let url = self.url("/api/health")?;
        self.send_json(self.http.get(url)).await
    }

    /// Display URLs, admin image first.
    pub async fn list_images(&self) -> Result<Vec<String>> {
        let url = self.url("/api/menu-images")?;
        let response: MenuImagesResponse = self.send_json(self.http.get(url)).await?;
        Ok(response.images)
    }

    /// Log in and keep the session token for later calls.
    pub async fn login(&mut self, username: &str, password: &str) -> Result<String> {
        let url = self.url("/api/login")?;
        let req = self.http.post(url).json(&LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        });
        let response = self.send(req).await?;

        let token = response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .find_map(session_from_set_cookie)
            .ok_or_else(|| anyhow::anyhow!("login response did not set a session cookie"))?;

        self.session = Some(token.clone());
        Ok(token)
    }

    /// Replace the admin image.
    pub async fn upload(
        &self,
        file_name: &str,
        content_type: &str,
        data: Vec<u8>,
    ) -> Result<UploadResponse> {
        let url = self.url("/api/upload")?;
        let part = Part::bytes(data)
            .file_name(file_name.to_string())
            .mime_str(content_type)
            .context("invalid content type")?;
        let form = Form::new().part("file", part);
        self.send_json(self.http.post(url).multipart(form)).await
    }

    pub async fn delete_image(&self, filename: &str) -> Result<DeleteImageResponse> {
        let url = self.url("/api/delete-image")?;
        let req = self.http.post(url).json(&DeleteImageRequest {
            filename: filename.to_string(),
        });
        self.send_json(req).await
    }

    /// Ask the server to clear the session cookie and forget the local token.
    pub async fn logout(&mut self) -> Result<()> {
        let url = self.url("/api/logout")?;
        self.send(self.http.post(url)).await?;
        self.session = None;
        Ok(())
    }
}

/// Token value of an `auth-token=...` Set-Cookie header, if non-empty.
pub fn session_from_set_cookie(header: &str) -> Option<String> {
    let pair = header.split(';').next()?.trim();
    let (name, value) = pair.split_once('=')?;
    (name == SESSION_COOKIE && !value.is_empty()).then(|| value.to_string())
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug, Serialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct DeleteImageRequest {
    pub filename: String,
}

#[derive(Debug, Deserialize)]
pub struct MenuImagesResponse {
    pub images: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct UploadResponse {
    pub success: bool,
    pub filename: String,
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct DeleteImageResponse {
    pub success: bool,
    #[serde(default)]
    pub deleted: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub backends: usize,
    #[serde(default)]
    pub version: Option<String>,
}
