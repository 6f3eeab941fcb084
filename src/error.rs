//! # Errores del Servidor
//! src/error.rs
//!
//! Errores tipados por área. Los errores de un item individual nunca
//! llegan aquí: se convierten en el `message` del item.

use thiserror::Error;

/// Errores del Job Manager
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JobError {
    /// La lista de targets quedó vacía después de limpiar blancos
    #[error("No URLs provided")]
    EmptyTargets,

    #[error("Job not found: {0}")]
    NotFound(String),

    /// No se pudo lanzar el thread de ejecución del job
    #[error("failed to start job {id}: {reason}")]
    Spawn { id: String, reason: String },
}

/// Errores de las herramientas externas (yt-dlp)
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("external tool is missing: {tool}")]
    ToolMissing { tool: String },

    #[error("{tool} could not start: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} failed (code={code:?}): {stderr}")]
    ToolFailed {
        tool: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("invalid listing output: {0}")]
    InvalidOutput(#[from] serde_json::Error),
}

/// Errores de configuración
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Max workers must be >= 1")]
    MaxWorkers,

    #[error("Default workers must be between 1 and {max} (got {value})")]
    DefaultWorkers { value: usize, max: usize },

    #[error("Invalid log level: {0}")]
    LogLevel(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_error_messages() {
        assert_eq!(JobError::EmptyTargets.to_string(), "No URLs provided");
        assert_eq!(
            JobError::NotFound("abc".to_string()).to_string(),
            "Job not found: abc"
        );
    }

    #[test]
    fn test_fetch_error_includes_stderr() {
        let err = FetchError::ToolFailed {
            tool: "yt-dlp".to_string(),
            code: Some(1),
            stderr: "ERROR: Video unavailable".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("yt-dlp"));
        assert!(msg.contains("Video unavailable"));
    }
}
