//! # Handlers HTTP para Jobs
//! src/jobs/handlers.rs
//!
//! - `POST /api/download`
//! - `GET /api/jobs/<id>`
//! - `DELETE /api/jobs/<id>`

use crate::error::JobError;
use crate::http::{Request, Response, StatusCode};
use crate::jobs::manager::JobManager;
use crate::jobs::types::MediaMode;
use serde::Deserialize;
use serde_json::Value;

/// Body de `POST /api/download`
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DownloadRequest {
    pub urls: Vec<String>,
    pub mode: Option<String>,
    pub format: Option<String>,

    /// Se acepta cualquier valor JSON; lo que no sea entero usa el default
    pub workers: Option<Value>,
}

impl DownloadRequest {
    /// Un body malformado se trata como vacío
    pub fn from_body(body: &[u8]) -> Self {
        serde_json::from_slice(body).unwrap_or_else(|e| {
            tracing::debug!(error = %e, "unreadable download body; treating as empty");
            Self::default()
        })
    }

    pub fn media_mode(&self) -> MediaMode {
        self.mode
            .as_deref()
            .map(MediaMode::from_request_str)
            .unwrap_or_default()
    }

    pub fn format(&self) -> &str {
        match self.format.as_deref().map(str::trim) {
            Some(f) if !f.is_empty() => f,
            _ => "best",
        }
    }

    /// `4`, `"4"` → Some(4); cualquier otra cosa → None
    pub fn requested_workers(&self) -> Option<i64> {
        match self.workers.as_ref()? {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

fn error_response(error: &JobError) -> Response {
    let status = match error {
        JobError::EmptyTargets => StatusCode::BadRequest,
        JobError::NotFound(_) => StatusCode::NotFound,
        JobError::Spawn { .. } => StatusCode::InternalServerError,
    };
    Response::error(status, &error.to_string())
}

/// Handler para `POST /api/download`
///
/// ```json
/// {"urls": ["https://..."], "mode": "audio", "format": "mp3", "workers": 4}
/// ```
///
/// Responde `{"job_id": "..."}` sin esperar a ninguna descarga.
pub fn download_handler(req: &Request, job_manager: &JobManager) -> Response {
    let body = DownloadRequest::from_body(req.body());

    let result = job_manager.create_job(
        body.urls.clone(),
        body.media_mode(),
        body.format(),
        body.requested_workers(),
    );

    match result {
        Ok(job_id) => Response::json(&serde_json::json!({ "job_id": job_id })),
        Err(e) => error_response(&e),
    }
}

/// Handler para `GET /api/jobs/<id>`: snapshot del job
pub fn job_status_handler(job_id: &str, job_manager: &JobManager) -> Response {
    match job_manager.get_job(job_id) {
        Ok(job) => Response::json(&job),
        Err(JobError::NotFound(_)) => Response::error(StatusCode::NotFound, "Job not found"),
        Err(e) => error_response(&e),
    }
}

/// Handler para `DELETE /api/jobs/<id>`
pub fn job_delete_handler(job_id: &str, job_manager: &JobManager) -> Response {
    match job_manager.remove_job(job_id) {
        Ok(job) => Response::json(&serde_json::json!({
            "job_id": job.id,
            "status": job.status,
            "removed": true,
        })),
        Err(JobError::NotFound(_)) => Response::error(StatusCode::NotFound, "Job not found"),
        Err(e) => error_response(&e),
    }
}
