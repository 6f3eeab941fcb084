//! # Construcción de Respuestas HTTP
//! src/http/response.rs
//!
//! ```text
//! HTTP/1.0 200 OK\r\n
//! Content-Type: application/json\r\n
//! Content-Length: 18\r\n
//! \r\n
//! {"job_id":"3f2a"}
//! ```

use super::StatusCode;
use serde::Serialize;
use std::collections::BTreeMap;

/// Respuesta HTTP completa
#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,

    /// Ordenados para que la salida sea estable
    headers: BTreeMap<String, String>,

    body: Vec<u8>,
}

impl Response {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
            body: Vec::new(),
        }
    }

    /// Agrega o reemplaza un header
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.add_header(name, value);
        self
    }

    pub fn add_header(&mut self, name: &str, value: &str) {
        self.headers.insert(name.to_string(), value.to_string());
    }

    /// Establece el body y su `Content-Length`
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        let len = self.body.len().to_string();
        self.add_header("Content-Length", &len);
        self
    }

    /// Respuesta JSON con el estado dado
    pub fn json_with_status<T: Serialize + ?Sized>(status: StatusCode, value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(body) => Self::new(status)
                .with_header("Content-Type", "application/json")
                .with_body(body),
            Err(e) => {
                tracing::error!(error = %e, "failed to serialize response body");
                Self::error(StatusCode::InternalServerError, "Failed to serialize response")
            }
        }
    }

    /// Respuesta JSON 200 OK
    ///
    /// ```
    /// use batch_downloader::http::{Response, StatusCode};
    ///
    /// let response = Response::json(&serde_json::json!({"job_id": "abc"}));
    /// assert_eq!(response.status(), StatusCode::Ok);
    /// ```
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Self {
        Self::json_with_status(StatusCode::Ok, value)
    }

    /// Error con formato `{"error": "mensaje"}`
    pub fn error(status: StatusCode, message: &str) -> Self {
        let body = serde_json::json!({ "error": message }).to_string();
        Self::new(status)
            .with_header("Content-Type", "application/json")
            .with_body(body)
    }

    pub fn html(body: &str) -> Self {
        Self::new(StatusCode::Ok)
            .with_header("Content-Type", "text/html; charset=utf-8")
            .with_body(body)
    }

    /// Bytes listos para enviar por el socket
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut result = format!("HTTP/1.0 {}\r\n", self.status).into_bytes();
        for (name, value) in &self.headers {
            result.extend_from_slice(format!("{}: {}\r\n", name, value).as_bytes());
        }
        result.extend_from_slice(b"\r\n");
        result.extend_from_slice(&self.body);
        result
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(|s| s.as_str())
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Body interpretado como JSON (usado por tests y clientes internos)
    pub fn body_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}
