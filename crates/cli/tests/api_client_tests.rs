#[path = "../src/api_client.rs"]
#[allow(dead_code)] // Some items are used by the binary but not by tests
mod api_client;

use api_client::{ApiClient, session_from_set_cookie};
use httpmock::Method::{GET, POST};
use httpmock::MockServer;
use serde_json::json;
use std::net::TcpListener;

const TOKEN: &str = "bm9ubGEtMTcwMDAwMDAwMDAwMA.abcdef";

fn can_bind_localhost() -> bool {
    TcpListener::bind("127.0.0.1:0").is_ok()
}

#[tokio::test]
async fn list_images_returns_urls_in_order() {
    if !can_bind_localhost() {
        eprintln!("Skipping httpmock tests: cannot bind to localhost");
        return;
    }

    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET).path("/api/menu-images");
        then.status(200).json_body(json!({
            "images": ["/menu/admin-menu.png", "/menu/menu1.jpg", "https://cdn.test/menu/menu3"]
        }));
    });

    let client = ApiClient::new(&server.base_url()).unwrap();
    let images = client.list_images().await.unwrap();

    mock.assert();
    assert_eq!(
        images,
        vec![
            "/menu/admin-menu.png",
            "/menu/menu1.jpg",
            "https://cdn.test/menu/menu3"
        ]
    );
}

#[tokio::test]
async fn login_captures_session_cookie() {
    if !can_bind_localhost() {
        eprintln!("Skipping httpmock tests: cannot bind to localhost");
        return;
    }

    let server = MockServer::start();
    let login = server.mock(|when, then| {
        when.method(POST)
            .path("/api/login")
            .json_body(json!({ "username": "nonla", "password": "1582" }));
        then.status(200)
            .header(
                "set-cookie",
                format!("auth-token={TOKEN}; Path=/; HttpOnly; SameSite=Strict; Max-Age=7200"),
            )
            .json_body(json!({ "success": true }));
    });
    let delete = server.mock(|when, then| {
        when.method(POST)
            .path("/api/delete-image")
            .header("cookie", format!("auth-token={TOKEN}"))
            .json_body(json!({ "filename": "admin-menu.png" }));
        then.status(200)
            .json_body(json!({ "success": true, "deleted": ["admin-menu.png"] }));
    });

    let mut client = ApiClient::new(&server.base_url()).unwrap();
    let token = client.login("nonla", "1582").await.unwrap();
    assert_eq!(token, TOKEN);
    assert_eq!(client.session(), Some(TOKEN));

    let response = client.delete_image("admin-menu.png").await.unwrap();
    assert!(response.success);
    assert_eq!(response.deleted, vec!["admin-menu.png"]);

    login.assert();
    delete.assert();
}

#[tokio::test]
async fn login_failure_reports_server_message() {
    if !can_bind_localhost() {
        eprintln!("Skipping httpmock tests: cannot bind to localhost");
        return;
    }

    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/api/login");
        then.status(401).json_body(json!({
            "success": false,
            "code": "unauthorized",
            "error": "invalid credentials"
        }));
    });

    let mut client = ApiClient::new(&server.base_url()).unwrap();
    let err = client.login("nonla", "wrong").await.unwrap_err();

    let message = err.to_string();
    assert!(message.contains("401"), "{message}");
    assert!(message.contains("invalid credentials"), "{message}");
    assert!(client.session().is_none());
}

#[tokio::test]
async fn login_without_cookie_is_an_error() {
    if !can_bind_localhost() {
        eprintln!("Skipping httpmock tests: cannot bind to localhost");
        return;
    }

    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/api/login");
        then.status(200).json_body(json!({ "success": true }));
    });

    let mut client = ApiClient::new(&server.base_url()).unwrap();
    assert!(client.login("nonla", "1582").await.is_err());
}

#[tokio::test]
async fn upload_sends_multipart_with_session() {
    if !can_bind_localhost() {
        eprintln!("Skipping httpmock tests: cannot bind to localhost");
        return;
    }

    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/api/upload")
            .header("cookie", format!("auth-token={TOKEN}"))
            .header_exists("content-type")
            .body_contains("name=\"file\"")
            .body_contains("filename=\"daily.png\"")
            .body_contains("image/png");
        then.status(200).json_body(json!({
            "success": true,
            "filename": "admin-menu.png",
            "url": "/menu/admin-menu.png"
        }));
    });

    let client = ApiClient::new(&server.base_url())
        .unwrap()
        .with_session(TOKEN);
    let stored = client
        .upload("daily.png", "image/png", b"png-bytes".to_vec())
        .await
        .unwrap();

    mock.assert();
    assert_eq!(stored.filename, "admin-menu.png");
    assert_eq!(stored.url, "/menu/admin-menu.png");
}

#[tokio::test]
async fn upload_rejection_is_an_error() {
    if !can_bind_localhost() {
        eprintln!("Skipping httpmock tests: cannot bind to localhost");
        return;
    }

    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/api/upload");
        then.status(400).json_body(json!({
            "success": false,
            "code": "invalid_input",
            "error": "only image uploads are accepted (got 'text/plain')"
        }));
    });

    let client = ApiClient::new(&server.base_url())
        .unwrap()
        .with_session(TOKEN);
    let err = client
        .upload("notes.txt", "text/plain", b"hello".to_vec())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("only image uploads"));
}

#[tokio::test]
async fn logout_forgets_session() {
    if !can_bind_localhost() {
        eprintln!("Skipping httpmock tests: cannot bind to localhost");
        return;
    }

    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST).path("/api/logout");
        then.status(200)
            .header(
                "set-cookie",
                "auth-token=; Path=/; HttpOnly; SameSite=Strict; Max-Age=0",
            )
            .json_body(json!({ "success": true }));
    });

    let mut client = ApiClient::new(&server.base_url())
        .unwrap()
        .with_session(TOKEN);
    client.logout().await.unwrap();

    mock.assert();
    assert!(client.session().is_none());
}

#[tokio::test]
async fn health_parses_backend_count() {
    if !can_bind_localhost() {
        eprintln!("Skipping httpmock tests: cannot bind to localhost");
        return;
    }

    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/api/health");
        then.status(200)
            .json_body(json!({ "status": "ok", "backends": 2, "version": "0.1.0" }));
    });

    let client = ApiClient::new(&server.base_url()).unwrap();
    let health = client.health().await.unwrap();
    assert_eq!(health.status, "ok");
    assert_eq!(health.backends, 2);
}

#[test]
fn set_cookie_parsing() {
    assert_eq!(
        session_from_set_cookie("auth-token=abc.def; Path=/; HttpOnly").as_deref(),
        Some("abc.def")
    );
    assert_eq!(session_from_set_cookie("auth-token=; Max-Age=0"), None);
    assert_eq!(session_from_set_cookie("other=abc"), None);
    assert_eq!(session_from_set_cookie(""), None);
}
