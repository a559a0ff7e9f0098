//! End-to-end tests for the gallery HTTP API (memory store + temp directory)

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use gallery_server::db::MemoryImageStore;
use gallery_server::storage::LocalImageStorage;
use gallery_server::{Config, GalleryService, JwtService, ServerState};
use http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

const BOUNDARY: &str = "gallery-test-boundary";

struct TestApp {
    router: Router,
    state: ServerState,
    _dir: TempDir,
}

impl TestApp {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let work_dir = dir.path().to_string_lossy().to_string();
        let env: HashMap<&str, String> = HashMap::from([
            ("STORE_BACKEND", "memory".to_string()),
            ("WORK_DIR", work_dir),
            ("JWT_SECRET", "integration-test-secret".to_string()),
        ]);
        let config = Config::from_lookup(|name| env.get(name).cloned()).unwrap();

        let gallery = GalleryService::new(
            Arc::new(MemoryImageStore::new()),
            Arc::new(LocalImageStorage::new(config.images_dir())),
        );
        let jwt = JwtService::with_config(config.jwt.clone());
        let state = ServerState::new(config, gallery, jwt);
        let router = gallery_server::api::build_router(state.clone());

        Self {
            router,
            state,
            _dir: dir,
        }
    }

    fn token(&self, user_id: &str) -> String {
        self.state.jwt_service().generate_token(user_id).unwrap()
    }

    async fn send(&self, req: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        let req = Request::get(uri)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap();
        self.send(req).await
    }

    async fn multipart(
        &self,
        method: &str,
        uri: &str,
        token: &str,
        form: MultipartBody,
    ) -> (StatusCode, Value) {
        let req = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(form.finish()))
            .unwrap();
        self.send(req).await
    }

    async fn reorder(&self, token: &str, body: Value) -> (StatusCode, Value) {
        let req = Request::patch("/api/images/reorder")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(req).await
    }

    /// Upload PNGs titled `titles` and return the created images
    async fn upload(&self, token: &str, titles: &[&str]) -> Vec<Value> {
        let mut form = MultipartBody::default();
        for (i, title) in titles.iter().enumerate() {
            let png = png(i as u32 + 1);
            let name = format!("{title}.png");
            form = form
                .file("files", &name, "image/png", &png)
                .text("titles", title)
                .text("originalFileNames", &name)
                .text("mimeTypes", "image/png")
                .text("fileSizes", &png.len().to_string());
        }
        let (status, body) = self.multipart("POST", "/api/images", token, form).await;
        assert_eq!(status, StatusCode::OK, "upload failed: {body}");
        body["data"].as_array().unwrap().clone()
    }

    async fn list_titles(&self, token: &str) -> Vec<String> {
        let (status, body) = self.get("/api/images", token).await;
        assert_eq!(status, StatusCode::OK);
        body["data"]["images"]
            .as_array()
            .unwrap()
            .iter()
            .map(|img| img["title"].as_str().unwrap().to_string())
            .collect()
    }
}

#[derive(Default)]
struct MultipartBody {
    body: Vec<u8>,
}

impl MultipartBody {
    fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
        self
    }

    fn file(mut self, name: &str, file_name: &str, content_type: &str, bytes: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(bytes);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    fn finish(mut self) -> Vec<u8> {
        self.body
            .extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        self.body
    }
}

/// A distinct PNG per width so uploads do not share files
fn png(width: u32) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(width, 1, image::Rgb([120, 40, 200]));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

#[tokio::test]
async fn test_health_is_public() {
    let app = TestApp::new();
    let req = Request::get("/health").body(Body::empty()).unwrap();
    let (status, body) = app.send(req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_images_require_token() {
    let app = TestApp::new();

    let req = Request::get("/api/images").body(Body::empty()).unwrap();
    let (status, body) = app.send(req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], 1001);

    let (status, _) = app.get("/api/images", "not-a-jwt").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_upload_appends_in_order() {
    let app = TestApp::new();
    let token = app.token("user-1");

    let first = app.upload(&token, &["sunset"]).await;
    assert_eq!(first[0]["order"], 1000.0);

    let more = app.upload(&token, &["beach", "forest"]).await;
    let orders: Vec<f64> = more.iter().map(|i| i["order"].as_f64().unwrap()).collect();
    assert_eq!(orders, vec![2000.0, 3000.0]);

    let (status, body) = app.get("/api/images", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 3);
    assert_eq!(app.list_titles(&token).await, vec!["forest", "beach", "sunset"]);

    let (_, body) = app.get("/api/images?sortOrder=asc&limit=2", &token).await;
    let titles: Vec<&str> = body["data"]["images"]
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["sunset", "beach"]);
    assert_eq!(body["data"]["total"], 3);
}

#[tokio::test]
async fn test_upload_rejects_mismatched_arrays() {
    let app = TestApp::new();
    let token = app.token("user-1");
    let png = png(1);

    let form = MultipartBody::default()
        .file("files", "a.png", "image/png", &png)
        .text("titles", "a")
        .text("originalFileNames", "a.png")
        .text("mimeTypes", "image/png");
    let (status, _) = app.multipart("POST", "/api/images", &token, form).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(app.list_titles(&token).await.is_empty());
}

#[tokio::test]
async fn test_upload_rejects_unsupported_format() {
    let app = TestApp::new();
    let token = app.token("user-1");

    let form = MultipartBody::default()
        .file("files", "notes.txt", "text/plain", b"hello")
        .text("titles", "notes")
        .text("originalFileNames", "notes.txt")
        .text("mimeTypes", "text/plain")
        .text("fileSizes", "5");
    let (status, body) = app.multipart("POST", "/api/images", &token, form).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 6502);
    assert!(app.list_titles(&token).await.is_empty());
}

#[tokio::test]
async fn test_reorder_between_neighbors() {
    let app = TestApp::new();
    let token = app.token("user-1");
    let images = app.upload(&token, &["a", "b", "c"]).await;

    // Drag "a" (1000) between "c" (3000) and "b" (2000)
    let (status, body) = app
        .reorder(
            &token,
            json!({
                "imageId": images[0]["id"],
                "previousOrder": 3000.0,
                "nextOrder": 2000.0,
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["order"], 2500.0);
    assert_eq!(app.list_titles(&token).await, vec!["c", "a", "b"]);

    // Move "b" to the top
    let (status, body) = app
        .reorder(
            &token,
            json!({ "imageId": images[1]["id"], "previousOrder": null, "nextOrder": 3000.0 }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert!(body["data"]["order"].as_f64().unwrap() > 3000.0);
    assert_eq!(app.list_titles(&token).await, vec!["b", "c", "a"]);
}

#[tokio::test]
async fn test_reorder_errors() {
    let app = TestApp::new();
    let token = app.token("user-1");
    let images = app.upload(&token, &["a"]).await;

    let (status, body) = app
        .reorder(&token, json!({ "imageId": images[0]["id"] }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 6002);

    let other = app.token("user-2");
    let (status, body) = app
        .reorder(
            &other,
            json!({ "imageId": images[0]["id"], "previousOrder": 5000.0 }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], 6001);

    let (status, _) = app
        .reorder(&token, json!({ "imageId": "not-a-uuid" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_edit_title_keeps_order() {
    let app = TestApp::new();
    let token = app.token("user-1");
    let images = app.upload(&token, &["draft", "other"]).await;
    let id = images[0]["id"].as_str().unwrap();

    let form = MultipartBody::default().text("title", "  Final  ");
    let (status, body) = app
        .multipart("PATCH", &format!("/api/images/{id}"), &token, form)
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["title"], "Final");
    assert_eq!(body["data"]["order"], 1000.0);
    assert_eq!(body["data"]["url"], images[0]["url"]);

    let form = MultipartBody::default().text("title", "x");
    let (status, _) = app
        .multipart("PATCH", "/api/images/not-a-uuid", &token, form)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_files_are_public_and_deleted_with_image() {
    let app = TestApp::new();
    let token = app.token("user-1");
    let images = app.upload(&token, &["photo"]).await;
    let url = images[0]["url"].as_str().unwrap().to_string();
    let id = images[0]["id"].as_str().unwrap().to_string();
    assert!(url.starts_with("/api/files/user-1/"));

    let response = app
        .router
        .clone()
        .oneshot(Request::get(&url).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(bytes.as_ref(), png(1).as_slice());

    // Other users cannot delete it
    let other = app.token("user-2");
    let req = Request::delete(format!("/api/images/{id}"))
        .header(header::AUTHORIZATION, format!("Bearer {other}"))
        .body(Body::empty())
        .unwrap();
    let (status, _) = app.send(req).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let req = Request::delete(format!("/api/images/{id}"))
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    let (status, body) = app.send(req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], id.as_str());

    let response = app
        .router
        .clone()
        .oneshot(Request::get(&url).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(app.list_titles(&token).await.is_empty());
}

#[tokio::test]
async fn test_galleries_are_isolated_per_owner() {
    let app = TestApp::new();
    let alice = app.token("alice");
    let bob = app.token("bob");

    app.upload(&alice, &["a1", "a2"]).await;
    let bobs = app.upload(&bob, &["b1"]).await;

    // Each owner's keys start from the base independently
    assert_eq!(bobs[0]["order"], 1000.0);
    assert_eq!(app.list_titles(&alice).await, vec!["a2", "a1"]);
    assert_eq!(app.list_titles(&bob).await, vec!["b1"]);
}
