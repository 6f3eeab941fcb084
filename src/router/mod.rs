//! # Sistema de Routing
//! src/router/mod.rs
//!
//! Mapea (método, path) a handlers.
//!
//! ```text
//! Request → Router → Handler → Response
//! ```
//!
//! Los patrones se comparan segmento por segmento; un segmento que
//! empieza con `:` captura cualquier valor no vacío (`/api/jobs/:id`).
//! Si el path coincide pero el método no, se responde 405.

use crate::http::{Method, Request, Response, StatusCode};
use std::collections::HashMap;

/// Segmentos capturados por el patrón (`:id` → "abc")
pub type Params = HashMap<String, String>;

/// Un handler recibe el request y los parámetros de la ruta
pub type Handler = Box<dyn Fn(&Request, &Params) -> Response + Send + Sync>;

struct Route {
    method: Method,
    pattern: String,
    handler: Handler,
}

/// Router que mapea rutas a handlers
#[derive(Default)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    pub fn new() -> Self {
        Self { routes: Vec::new() }
    }

    /// Registra una ruta
    ///
    /// ```
    /// use batch_downloader::http::{Method, Request, Response};
    /// use batch_downloader::router::Router;
    ///
    /// let mut router = Router::new();
    /// router.register(Method::GET, "/api/jobs/:id", |_req, params| {
    ///     Response::json(&serde_json::json!({ "id": params["id"] }))
    /// });
    ///
    /// let request = Request::parse(b"GET /api/jobs/abc HTTP/1.0\r\n\r\n").unwrap();
    /// assert_eq!(router.route(&request).body_json().unwrap()["id"], "abc");
    /// ```
    pub fn register<F>(&mut self, method: Method, pattern: &str, handler: F)
    where
        F: Fn(&Request, &Params) -> Response + Send + Sync + 'static,
    {
        self.routes.push(Route {
            method,
            pattern: pattern.to_string(),
            handler: Box::new(handler),
        });
    }

    /// Ejecuta el handler que corresponde al request
    pub fn route(&self, request: &Request) -> Response {
        let path = request.path();
        let mut path_matched = false;

        for route in &self.routes {
            let Some(params) = match_pattern(&route.pattern, path) else {
                continue;
            };
            path_matched = true;

            // HEAD se atiende como GET
            let method_ok = route.method == request.method()
                || (route.method == Method::GET && request.method() == Method::HEAD);
            if method_ok {
                let mut response = (route.handler)(request, &params);
                add_common_headers(&mut response);
                return response;
            }
        }

        let mut response = if path_matched {
            Response::error(
                StatusCode::MethodNotAllowed,
                &format!("Method not allowed: {} {}", request.method().as_str(), path),
            )
        } else {
            Response::error(StatusCode::NotFound, &format!("Route not found: {}", path))
        };
        add_common_headers(&mut response);
        response
    }

    /// Patrón registrado que coincide con el path (para métricas)
    pub fn route_label(&self, path: &str) -> Option<&str> {
        self.routes
            .iter()
            .find(|route| match_pattern(&route.pattern, path).is_some())
            .map(|route| route.pattern.as_str())
    }
}

fn add_common_headers(response: &mut Response) {
    response.add_header("Server", "batch-downloader/0.1");
    response.add_header("Connection", "close");
}

/// Compara un patrón con un path y retorna los segmentos capturados
fn match_pattern(pattern: &str, path: &str) -> Option<Params> {
    let pattern_segments: Vec<&str> = pattern.trim_matches('/').split('/').collect();
    let path_segments: Vec<&str> = path.trim_matches('/').split('/').collect();

    if pattern_segments.len() != path_segments.len() {
        return None;
    }

    let mut params = Params::new();
    for (expected, actual) in pattern_segments.iter().zip(&path_segments) {
        match expected.strip_prefix(':') {
            Some(name) if !actual.is_empty() => {
                params.insert(name.to_string(), actual.to_string());
            }
            Some(_) => return None,
            None if expected == actual => {}
            None => return None,
        }
    }
    Some(params)
}
