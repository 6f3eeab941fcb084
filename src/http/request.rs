//! # Parsing de Requests HTTP/1.0
//! src/http/request.rs
//!
//! ## Formato de un Request
//!
//! ```text
//! POST /api/download HTTP/1.0\r\n
//! Content-Type: application/json\r\n
//! Content-Length: 42\r\n
//! \r\n
//! {"urls": ["https://..."], "mode": "audio"}
//! ```
//!
//! El head se parsea como texto; el body se conserva como bytes y se
//! recorta a `Content-Length` si el header existe.

use serde::de::DeserializeOwned;
use std::collections::HashMap;
use thiserror::Error;

/// Métodos HTTP soportados
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    GET,
    HEAD,
    POST,
    DELETE,
}

impl Method {
    fn parse(s: &str) -> Result<Self, ParseError> {
        match s {
            "GET" => Ok(Method::GET),
            "HEAD" => Ok(Method::HEAD),
            "POST" => Ok(Method::POST),
            "DELETE" => Ok(Method::DELETE),
            _ => Err(ParseError::UnsupportedMethod(s.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::GET => "GET",
            Method::HEAD => "HEAD",
            Method::POST => "POST",
            Method::DELETE => "DELETE",
        }
    }
}

/// Errores que pueden ocurrir durante el parsing
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("Incomplete HTTP request")]
    IncompleteRequest,

    #[error("Invalid request line format")]
    InvalidRequestLine,

    #[error("Unsupported HTTP method: {0}")]
    UnsupportedMethod(String),

    #[error("Invalid HTTP version: {0}")]
    InvalidHttpVersion(String),

    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    #[error("Empty request")]
    EmptyRequest,
}

/// Request HTTP parseado
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,

    /// Path sin query string (ej: "/api/jobs/abc")
    path: String,

    /// Query parameters ya decodificados
    query_params: HashMap<String, String>,

    /// Headers con el nombre en minúsculas
    headers: HashMap<String, String>,

    body: Vec<u8>,
}

/// Posición del separador `\r\n\r\n` entre head y body
pub fn find_head_end(buffer: &[u8]) -> Option<usize> {
    buffer.windows(4).position(|w| w == b"\r\n\r\n")
}

impl Request {
    /// Parsea un request HTTP desde bytes
    ///
    /// ```
    /// use batch_downloader::http::Request;
    ///
    /// let raw = b"GET /api/channel?url=%40chan&count=5 HTTP/1.0\r\n\r\n";
    /// let request = Request::parse(raw).unwrap();
    ///
    /// assert_eq!(request.path(), "/api/channel");
    /// assert_eq!(request.query_param("url"), Some("@chan"));
    /// ```
    pub fn parse(buffer: &[u8]) -> Result<Self, ParseError> {
        if buffer.iter().all(|b| b.is_ascii_whitespace()) {
            return Err(ParseError::EmptyRequest);
        }

        let (head, body) = match find_head_end(buffer) {
            Some(pos) => (&buffer[..pos], &buffer[pos + 4..]),
            None => (buffer, &[][..]),
        };

        let head = std::str::from_utf8(head).map_err(|_| ParseError::InvalidRequestLine)?;
        let mut lines = head.split("\r\n");

        // 1. Request line
        let request_line = lines.next().ok_or(ParseError::IncompleteRequest)?;
        let (method, path, query_params) = Self::parse_request_line(request_line)?;

        // 2. Headers
        let headers = Self::parse_headers(lines)?;

        // 3. Body (acotado por Content-Length)
        let body = match headers.get("content-length").and_then(|v| v.parse::<usize>().ok()) {
            Some(len) => body[..len.min(body.len())].to_vec(),
            None => body.to_vec(),
        };

        Ok(Request {
            method,
            path,
            query_params,
            headers,
            body,
        })
    }

    /// Formato: `METHOD /path?query HTTP/1.x`
    fn parse_request_line(line: &str) -> Result<(Method, String, HashMap<String, String>), ParseError> {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() != 3 {
            return Err(ParseError::InvalidRequestLine);
        }

        let method = Method::parse(parts[0])?;

        let (path, query_params) = match parts[1].split_once('?') {
            Some((path, query)) => (path.to_string(), parse_query_string(query)),
            None => (parts[1].to_string(), HashMap::new()),
        };

        let version = parts[2];
        if version != "HTTP/1.0" && version != "HTTP/1.1" {
            return Err(ParseError::InvalidHttpVersion(version.to_string()));
        }

        Ok((method, path, query_params))
    }

    fn parse_headers<'a>(lines: impl Iterator<Item = &'a str>) -> Result<HashMap<String, String>, ParseError> {
        let mut headers = HashMap::new();
        for line in lines {
            if line.trim().is_empty() {
                break;
            }
            let (name, value) = line
                .split_once(':')
                .ok_or_else(|| ParseError::InvalidHeader(line.to_string()))?;
            headers.insert(name.trim().to_ascii_lowercase(), value.trim().to_string());
        }
        Ok(headers)
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query_params(&self) -> &HashMap<String, String> {
        &self.query_params
    }

    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query_params.get(name).map(|s| s.as_str())
    }

    /// Header por nombre, sin distinguir mayúsculas
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(|s| s.as_str())
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Deserializa el body como JSON
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}

/// `a=1&b=hello%20world` → {"a": "1", "b": "hello world"}
fn parse_query_string(query: &str) -> HashMap<String, String> {
    url::form_urlencoded::parse(query.as_bytes())
        .filter(|(key, _)| !key.is_empty())
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect()
}
