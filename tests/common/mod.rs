#![allow(dead_code)]

use std::path::PathBuf;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

use coursehub_backend::{app::create_router, app_state::AppState, config::Config, db::Database};

pub const PASSWORD: &str = "Passw0rdOk";
const BOUNDARY: &str = "coursehub-test-boundary";

pub struct TestApp {
    pub router: Router,
    pub upload_dir: PathBuf,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: axum::http::HeaderMap,
    pub body: Value,
}

impl TestApp {
    /// In-memory store, throwaway upload dir, rate limiting off.
    pub fn new() -> Self {
        Self::with_config(|_| {})
    }

    pub fn with_config(customize: impl FnOnce(&mut Config)) -> Self {
        let mut config = Config::default();
        config.rate_limit.enabled = false;
        config.uploads.dir = std::env::temp_dir().join(format!("coursehub-test-{}", Uuid::now_v7()));
        customize(&mut config);

        let upload_dir = config.uploads.dir.clone();
        let state = AppState::new(Database::in_memory(), config);
        TestApp {
            router: create_router(state),
            upload_dir,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let body = match body {
            Some(value) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };
        self.send(builder.body(body).unwrap()).await
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.request(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> TestResponse {
        self.request(Method::POST, uri, token, Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: Option<&str>, body: Value) -> TestResponse {
        self.request(Method::PUT, uri, token, Some(body)).await
    }

    pub async fn patch(&self, uri: &str, token: Option<&str>, body: Value) -> TestResponse {
        self.request(Method::PATCH, uri, token, Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.request(Method::DELETE, uri, token, None).await
    }

    pub async fn upload(
        &self,
        uri: &str,
        token: Option<&str>,
        field: &str,
        file_name: &str,
        mime_type: &str,
        bytes: &[u8],
    ) -> TestResponse {
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\nContent-Type: {mime_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        let mut builder = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            );
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        self.send(builder.body(Body::from(body)).unwrap()).await
    }

    /// Registers a fresh account with the given role and logs it in.
    /// Returns `(token, user_id)`.
    pub async fn signup(&self, role: &str) -> (String, String) {
        let email = format!("{}-{}@example.com", role, Uuid::now_v7());
        let registered = self
            .post(
                "/auth/register",
                None,
                json!({ "name": "Test User", "email": email, "password": PASSWORD, "role": role }),
            )
            .await;
        assert_eq!(registered.status, StatusCode::CREATED, "{}", registered.body);

        let token = self.login(&email, PASSWORD).await;
        let user_id = registered.body["id"].as_str().unwrap().to_string();
        (token, user_id)
    }

    pub async fn login(&self, email: &str, password: &str) -> String {
        let response = self
            .post("/auth/login", None, json!({ "email": email, "password": password }))
            .await;
        assert_eq!(response.status, StatusCode::OK, "{}", response.body);
        response.body["token"].as_str().unwrap().to_string()
    }

    /// Creates a course as `token` and returns its id.
    pub async fn create_course(&self, token: &str, title: &str, published: bool) -> String {
        let response = self
            .post(
                "/courses",
                Some(token),
                json!({
                    "title": title,
                    "description": "A course used in integration tests",
                    "price": 0,
                    "published": published,
                    "content": [],
                }),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
        response.body["id"].as_str().unwrap().to_string()
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        std::fs::remove_dir_all(&self.upload_dir).ok();
    }
}
