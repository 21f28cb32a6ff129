//! Shared fixtures for integration tests: an in-process HTTP server driven
//! by `tiny_http`, routed by a small table of exact-path responses
//! registered up front. Mirrors the teacher's `tests/common` convention of
//! a RAII test-server wrapper that tears itself down on `Drop`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

#[derive(Clone)]
pub struct MockResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub delay: Option<std::time::Duration>,
}

impl MockResponse {
    pub fn json(status: u16, body: impl Into<String>) -> Self {
        MockResponse {
            status,
            headers: vec![("Content-Type".to_string(), "application/json".to_string())],
            body: body.into().into_bytes(),
            delay: None,
        }
    }

    pub fn html(status: u16, body: impl Into<String>) -> Self {
        MockResponse {
            status,
            headers: vec![("Content-Type".to_string(), "text/html".to_string())],
            body: body.into().into_bytes(),
            delay: None,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Block the server thread this long before responding — used to exercise
    /// discovery/executor deadlines deterministically.
    pub fn with_delay(mut self, delay: std::time::Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

type RouteTable = Arc<Mutex<HashMap<(String, String), MockResponse>>>;

/// Requests that required a specific header to be present were matched;
/// tracked per-path so tests can assert an auth-gated route rejected an
/// unauthenticated attempt before succeeding with the right credential.
type GatedRoutes = Arc<Mutex<HashMap<String, (String, String)>>>;

/// An in-process HTTP fixture server. Register routes with [`MockServer::route`]
/// before calling [`MockServer::base_url`]; requests to unregistered paths get 404.
pub struct MockServer {
    addr: std::net::SocketAddr,
    routes: RouteTable,
    gated: GatedRoutes,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl MockServer {
    #[must_use]
    pub fn start() -> Self {
        let server = tiny_http::Server::http("127.0.0.1:0").expect("bind mock server");
        let addr = match server.server_addr() {
            tiny_http::ListenAddr::IP(a) => a,
            _ => panic!("expected an IP listen address"),
        };

        let routes: RouteTable = Arc::new(Mutex::new(HashMap::new()));
        let gated: GatedRoutes = Arc::new(Mutex::new(HashMap::new()));
        let stop = Arc::new(AtomicBool::new(false));

        let routes_bg = Arc::clone(&routes);
        let gated_bg = Arc::clone(&gated);
        let stop_bg = Arc::clone(&stop);

        let handle = std::thread::spawn(move || {
            while !stop_bg.load(Ordering::Relaxed) {
                let Ok(Some(mut request)) = server.recv_timeout(std::time::Duration::from_millis(100))
                else {
                    continue;
                };
                let method = request.method().as_str().to_ascii_uppercase();
                let url = request.url().to_string();
                let path = url.split('?').next().unwrap_or(&url).to_string();

                if let Some((header_name, expected_value)) = gated_bg.lock().unwrap().get(&path).cloned() {
                    let has_header = request.headers().iter().any(|h| {
                        h.field.as_str().as_str().eq_ignore_ascii_case(&header_name)
                            && h.value.as_str() == expected_value
                    });
                    if !has_header {
                        let response = tiny_http::Response::from_string("unauthorized")
                            .with_status_code(401);
                        let _ = request.respond(response);
                        continue;
                    }
                }

                let found = routes_bg.lock().unwrap().get(&(method, path)).cloned();
                match found {
                    Some(mock) => {
                        if let Some(delay) = mock.delay {
                            std::thread::sleep(delay);
                        }
                        let mut response = tiny_http::Response::from_data(mock.body)
                            .with_status_code(mock.status);
                        for (name, value) in mock.headers {
                            if let Ok(header) =
                                tiny_http::Header::from_bytes(name.as_bytes(), value.as_bytes())
                            {
                                response.add_header(header);
                            }
                        }
                        let _ = request.respond(response);
                    }
                    None => {
                        let response = tiny_http::Response::from_string("not found").with_status_code(404);
                        let _ = request.respond(response);
                    }
                }
            }
        });

        MockServer {
            addr,
            routes,
            gated,
            stop,
            handle: Some(handle),
        }
    }

    #[must_use]
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn route(&self, method: &str, path: &str, response: MockResponse) {
        self.routes
            .lock()
            .unwrap()
            .insert((method.to_ascii_uppercase(), path.to_string()), response);
    }

    /// Gate `path` so it only serves its registered response when the
    /// request carries `header_name: expected_value`; otherwise returns 401.
    pub fn require_header(&self, path: &str, header_name: &str, expected_value: &str) {
        self.gated
            .lock()
            .unwrap()
            .insert(path.to_string(), (header_name.to_string(), expected_value.to_string()));
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Minimal valid OpenAPI 3 document with a single `GET /ping` operation,
/// used wherever a test just needs "a spec that parses".
pub const PING_SPEC: &str = r#"{
    "openapi": "3.0.0",
    "info": { "title": "T", "version": "1" },
    "paths": {
        "/ping": {
            "get": { "operationId": "ping", "responses": { "200": { "description": "ok" } } }
        }
    }
}"#;

/// A spec with `/repos/{owner}/{repo}/issues` (list/create) and `/users/{user}`,
/// used for resource-scope and permission-filter scenarios.
pub const GITHUB_LIKE_SPEC: &str = r#"{
    "openapi": "3.0.0",
    "info": { "title": "GitHub-like", "version": "1" },
    "paths": {
        "/repos/{owner}/{repo}/issues": {
            "get": {
                "operationId": "repos_issues_list",
                "tags": ["issues"],
                "parameters": [
                    { "name": "owner", "in": "path", "required": true, "schema": { "type": "string" } },
                    { "name": "repo", "in": "path", "required": true, "schema": { "type": "string" } }
                ],
                "security": [{ "oauth": ["read:issues"] }],
                "responses": { "200": { "description": "ok" } }
            },
            "post": {
                "operationId": "repos_issues_create",
                "tags": ["issues"],
                "parameters": [
                    { "name": "owner", "in": "path", "required": true, "schema": { "type": "string" } },
                    { "name": "repo", "in": "path", "required": true, "schema": { "type": "string" } }
                ],
                "security": [{ "oauth": ["write:issues"] }],
                "responses": { "200": { "description": "ok" } }
            }
        },
        "/users/{user}": {
            "get": {
                "operationId": "users_get",
                "tags": ["users"],
                "parameters": [
                    { "name": "user", "in": "path", "required": true, "schema": { "type": "string" } }
                ],
                "responses": { "200": { "description": "ok" } }
            }
        }
    }
}"#;
