//! # Módulo HTTP
//!
//! HTTP/1.0 escrito a mano sobre `TcpStream`:
//!
//! - Parsing de requests (request line, headers, body JSON)
//! - Construcción de responses
//! - Códigos de estado
//!
//! Cada conexión atiende un único request y se cierra (`Connection: close`).

pub mod request;
pub mod response;
pub mod status;

pub use request::{Method, ParseError, Request};
pub use response::Response;
pub use status::StatusCode;
