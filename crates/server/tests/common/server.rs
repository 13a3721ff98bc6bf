//! Server test utilities.

use axum::body::Body;
use axum::http::header::{CONTENT_TYPE, COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, Request, StatusCode};
use menuboard_core::config::{AppConfig, BackendConfig, StorageConfig};
use menuboard_server::{AppState, create_router};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tower::ServiceExt;

pub const USERNAME: &str = "nonla";
pub const PASSWORD: &str = "1582";

/// A test server backed by a temporary image directory.
/// Note: #[allow(dead_code)] because each test file compiles common/ separately.
#[allow(dead_code)]
pub struct TestServer {
    pub router: axum::Router,
    pub state: AppState,
    pub image_dir: PathBuf,
    _temp_dir: TempDir,
}

/// A collected response.
#[allow(dead_code)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

#[allow(dead_code)]
impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap_or(Value::Null)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn location(&self) -> Option<&str> {
        self.header("location")
    }

    pub fn set_cookie(&self) -> Option<&str> {
        self.headers
            .get(SET_COOKIE)
            .and_then(|v| v.to_str().ok())
    }

    /// `name=value` part of the Set-Cookie header.
    pub fn cookie_pair(&self) -> Option<String> {
        self.set_cookie()
            .and_then(|c| c.split(';').next())
            .map(str::to_string)
    }
}

#[allow(dead_code)]
impl TestServer {
    /// Create a new test server with one writable filesystem backend.
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Create a test server with custom config modifications.
    pub async fn with_config<F>(modifier: F) -> Self
    where
        F: FnOnce(&mut AppConfig),
    {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
        let image_dir = temp_dir.path().join("menu");
        std::fs::create_dir_all(&image_dir).expect("Failed to create image directory");

        let mut config = AppConfig::for_testing();
        config.storage = StorageConfig {
            backends: vec![BackendConfig::Filesystem {
                path: image_dir.clone(),
                public_path: "/menu".to_string(),
                writable: true,
            }],
        };
        modifier(&mut config);

        let gallery = menuboard_storage::from_config(&config.storage)
            .await
            .expect("Failed to create gallery");
        let state = AppState::new(config, gallery).expect("Failed to create state");
        let router = create_router(state.clone());

        Self {
            router,
            state,
            image_dir,
            _temp_dir: temp_dir,
        }
    }

    /// Drop a file into the image directory.
    pub fn seed(&self, name: &str, data: &[u8]) {
        std::fs::write(self.image_dir.join(name), data).expect("Failed to seed image");
    }

    pub fn has_file(&self, name: &str) -> bool {
        Path::new(&self.image_dir).join(name).exists()
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec();
        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> TestResponse {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(COOKIE, cookie);
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    pub async fn post_json(&self, uri: &str, body: Value, cookie: Option<&str>) -> TestResponse {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(CONTENT_TYPE, "application/json");
        if let Some(cookie) = cookie {
            builder = builder.header(COOKIE, cookie);
        }
        self.send(
            builder
                .body(Body::from(serde_json::to_vec(&body).unwrap()))
                .unwrap(),
        )
        .await
    }

    /// POST an arbitrary body, optionally without a content type.
    pub async fn post_raw(
        &self,
        uri: &str,
        content_type: Option<&str>,
        body: &str,
        cookie: Option<&str>,
    ) -> TestResponse {
        let mut builder = Request::builder().method("POST").uri(uri);
        if let Some(content_type) = content_type {
            builder = builder.header(CONTENT_TYPE, content_type);
        }
        if let Some(cookie) = cookie {
            builder = builder.header(COOKIE, cookie);
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap()).await
    }

    /// POST a single-file multipart body to /api/upload.
    pub async fn upload(
        &self,
        field: &str,
        file_name: &str,
        content_type: &str,
        data: &[u8],
        cookie: Option<&str>,
    ) -> TestResponse {
        let boundary = "menuboard-test-boundary";
        let mut body = Vec::new();
        body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

        let mut builder = Request::builder()
            .method("POST")
            .uri("/api/upload")
            .header(
                CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            );
        if let Some(cookie) = cookie {
            builder = builder.header(COOKIE, cookie);
        }
        self.send(builder.body(Body::from(body)).unwrap()).await
    }

    /// Log in with the stock credentials and return the `auth-token=...` pair.
    pub async fn login(&self) -> String {
        let response = self
            .post_json(
                "/api/login",
                serde_json::json!({ "username": USERNAME, "password": PASSWORD }),
                None,
            )
            .await;
        assert_eq!(response.status, StatusCode::OK);
        response.cookie_pair().expect("login sets a cookie")
    }
}
