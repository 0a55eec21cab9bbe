//! Common test utilities for integration tests
//!
//! Builds the full router over a seeded [`MemoryRepo`] and the real templates, and
//! drives it like a browser: the session cookie from each response is sent with the
//! next request. Sessions live in a `MemoryStore`; queued mail stays in the context's
//! outbox instead of reaching a listener.

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header, Request, Response, StatusCode};
use hearth_shared::models::ADMIN_ACCESS_LEVEL;
use hearth_shared::repository::MemoryRepo;
use hearth_web::app::{build_router, AppState};
use hearth_web::config::Config;
use hearth_web::mail::{MailData, MailQueue};
use hearth_web::render::Renderer;
use hearth_web::session::SESSION_COOKIE;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tower::ServiceExt;
use tower_sessions::MemoryStore;

pub const ADMIN_EMAIL: &str = "admin@hearth.test";
pub const ADMIN_PASSWORD: &str = "Correct-Horse-9";

pub fn template_dir() -> &'static str {
    concat!(env!("CARGO_MANIFEST_DIR"), "/../templates")
}

/// Test context with an in-memory store and a cookie jar holding one session
pub struct TestContext {
    pub repo: Arc<MemoryRepo>,
    pub app: axum::Router,
    pub state: AppState,
    cookie: Mutex<Option<String>>,
    outbox: Mutex<mpsc::Receiver<MailData>>,
}

/// Status, headers and body text of a response
pub struct TestResponse {
    pub status: StatusCode,
    pub location: Option<String>,
    pub body: String,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_repo(MemoryRepo::seeded())
    }

    pub fn with_repo(repo: MemoryRepo) -> Self {
        let repo = Arc::new(repo);
        repo.add_user("Site", "Admin", ADMIN_EMAIL, ADMIN_PASSWORD, ADMIN_ACCESS_LEVEL)
            .unwrap();

        let config = Config::for_templates(template_dir());
        let renderer = Renderer::new(&config.site.template_dir, true).unwrap();
        let (mail, outbox) = MailQueue::new(16);
        let state = AppState::new(repo.clone(), renderer, config, mail);
        let app = build_router(state.clone(), MemoryStore::default());

        Self {
            repo,
            app,
            state,
            cookie: Mutex::new(None),
            outbox: Mutex::new(outbox),
        }
    }

    /// Takes every message queued since the last call
    pub fn sent_mail(&self) -> Vec<MailData> {
        let mut outbox = self.outbox.lock().unwrap();
        let mut sent = Vec::new();
        while let Ok(message) = outbox.try_recv() {
            sent.push(message);
        }
        sent
    }

    /// Forgets the session cookie, like a new browser
    pub fn clear_cookies(&self) {
        *self.cookie.lock().unwrap() = None;
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        let request = Request::builder().method("GET").uri(uri);
        self.send(request, Body::empty()).await
    }

    /// POSTs url-encoded `fields`
    pub async fn post_form(&self, uri: &str, fields: &[(&str, &str)]) -> TestResponse {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        self.send(request, Body::from(encode(fields))).await
    }

    /// POSTs with no body and no content type
    pub async fn post_empty(&self, uri: &str) -> TestResponse {
        let request = Request::builder().method("POST").uri(uri);
        self.send(request, Body::empty()).await
    }

    pub async fn login(&self) -> TestResponse {
        self.post_form(
            "/user/login",
            &[("email", ADMIN_EMAIL), ("password", ADMIN_PASSWORD)],
        )
        .await
    }

    async fn send(&self, mut request: axum::http::request::Builder, body: Body) -> TestResponse {
        if let Some(cookie) = self.cookie.lock().unwrap().clone() {
            request = request.header(header::COOKIE, format!("{}={}", SESSION_COOKIE, cookie));
        }
        let response = self
            .app
            .clone()
            .oneshot(request.body(body).unwrap())
            .await
            .unwrap();
        self.keep_cookie(&response);

        let status = response.status();
        let location = response
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();

        TestResponse {
            status,
            location,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        }
    }

    fn keep_cookie(&self, response: &Response<Body>) {
        let prefix = format!("{}=", SESSION_COOKIE);
        for value in response.headers().get_all(header::SET_COOKIE) {
            let Ok(value) = value.to_str() else { continue };
            let Some(rest) = value.strip_prefix(&prefix) else { continue };
            let token = rest.split(';').next().unwrap_or("").to_string();
            *self.cookie.lock().unwrap() = (!token.is_empty()).then_some(token);
        }
    }
}

fn encode(fields: &[(&str, &str)]) -> String {
    fields
        .iter()
        .map(|(k, v)| format!("{}={}", escape(k), escape(v)))
        .collect::<Vec<_>>()
        .join("&")
}

fn escape(text: &str) -> String {
    let mut out = String::new();
    for byte in text.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            b' ' => out.push('+'),
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}
