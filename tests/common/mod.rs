#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use campusbuddy::{app, db, AppState, Config};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt; // for oneshot

pub const BOUNDARY: &str = "campusbuddy-test-boundary";

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub uploads: TempDir,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
    pub cookie: Option<String>,
}

pub async fn test_app() -> TestApp {
    let uploads = tempfile::tempdir().unwrap();
    let config = Config {
        database_url: "sqlite::memory:".to_owned(),
        upload_dir: uploads.path().to_path_buf(),
        initial_messages: 10,
        ..Config::default()
    };
    let db_pool = db::connect(&config.database_url).await.unwrap();
    let state = AppState::new(db_pool, config);

    TestApp {
        router: app(state.clone()),
        state,
        uploads,
    }
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .map(str::to_owned);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        TestResponse { status, body, cookie }
    }

    pub async fn json(&self, method: Method, uri: &str, body: Option<Value>, cookie: Option<&str>) -> TestResponse {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            request = request.header(header::COOKIE, cookie);
        }
        let request = match body {
            Some(body) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        };
        self.send(request.unwrap()).await
    }

    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> TestResponse {
        self.json(Method::GET, uri, None, cookie).await
    }

    pub async fn new_school(&self, name: &str) -> i64 {
        let res = self.json(Method::POST, "/api/schools", Some(json!({ "name": name })), None).await;
        assert_eq!(res.status, StatusCode::OK, "{}", res.body);
        res.body["id"].as_i64().unwrap()
    }

    /// Signs up `username` at `school` with password `hunter22` and returns the id.
    pub async fn new_student(&self, school: &str, username: &str) -> i64 {
        let res = self
            .json(
                Method::POST,
                "/api/students",
                Some(json!({
                    "schoolName": school,
                    "email": format!("{username}@campus.edu"),
                    "username": username,
                    "name": username.to_uppercase(),
                    "password": "hunter22",
                })),
                None,
            )
            .await;
        assert_eq!(res.status, StatusCode::OK, "{}", res.body);
        res.body["id"].as_i64().unwrap()
    }

    /// Session cookie for a student created by [`TestApp::new_student`].
    pub async fn login(&self, username: &str) -> String {
        let res = self
            .json(
                Method::POST,
                "/auth/login",
                Some(json!({ "email": format!("{username}@campus.edu"), "password": "hunter22" })),
                None,
            )
            .await;
        assert_eq!(res.status, StatusCode::OK, "{}", res.body);
        res.cookie.expect("login sets a session cookie")
    }

    pub async fn new_organization(&self, cookie: &str, name: &str) -> i64 {
        let res = self
            .json(Method::POST, "/api/organizations", Some(json!({ "name": name })), Some(cookie))
            .await;
        assert_eq!(res.status, StatusCode::OK, "{}", res.body);
        res.body["id"].as_i64().unwrap()
    }
}

pub fn multipart_body(data: Option<&Value>, image: Option<(&str, &str, &[u8])>) -> Body {
    let mut body: Vec<u8> = Vec::new();
    if let Some(data) = data {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"data\"\r\n\r\n{data}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((file_name, content_type, bytes)) = image {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    Body::from(body)
}
