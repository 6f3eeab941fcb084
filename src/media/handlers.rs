//! # Handler de Catálogos
//! src/media/handlers.rs
//!
//! `GET /api/channel?url=<dirección>&start=0&count=10`

use crate::http::{Request, Response, StatusCode};
use crate::media::catalog::{normalize_catalog_address, CatalogSource};

const DEFAULT_PAGE_SIZE: usize = 10;

/// Parámetro numérico opcional; `Err` si viene pero no es un entero >= 0
fn usize_param(req: &Request, name: &str, default: usize) -> Result<usize, Response> {
    match req.query_param(name).map(str::trim) {
        None | Some("") => Ok(default),
        Some(raw) => raw.parse().map_err(|_| {
            Response::error(
                StatusCode::BadRequest,
                &format!("Invalid parameter '{}': expected a non-negative integer", name),
            )
        }),
    }
}

/// Lista una página del catálogo y responde `{"entries": [{title, url}]}`
pub fn channel_handler(req: &Request, catalog: &dyn CatalogSource) -> Response {
    let address = normalize_catalog_address(req.query_param("url").unwrap_or(""));
    if address.is_empty() {
        return Response::error(StatusCode::BadRequest, "Missing required parameter: url");
    }

    let start = match usize_param(req, "start", 0) {
        Ok(v) => v,
        Err(response) => return response,
    };
    let count = match usize_param(req, "count", DEFAULT_PAGE_SIZE) {
        Ok(v) => v,
        Err(response) => return response,
    };
    if start.checked_add(count).is_none() {
        return Response::error(StatusCode::BadRequest, "Invalid paging: start + count is too large");
    }

    match catalog.list_entries(&address, start, count) {
        Ok(entries) => Response::json(&serde_json::json!({ "entries": entries })),
        Err(e) => {
            tracing::warn!(address = %address, error = %e, "catalog listing failed");
            Response::error(StatusCode::BadRequest, &e.to_string())
        }
    }
}
