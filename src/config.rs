//! # Configuración del Servidor
//! src/config.rs
//!
//! Argumentos CLI con variables de entorno como respaldo.
//!
//! ## Ejemplos de uso
//!
//! ### CLI
//! ```bash
//! ./batch_downloader --port 8080 \
//!   --default-workers 4 \
//!   --max-workers 8 \
//!   --output-dir ./downloads
//! ```
//!
//! ### Variables de entorno
//! ```bash
//! HTTP_PORT=8080 DOWNLOAD_DIR=/srv/media ./batch_downloader
//! ```

use crate::error::ConfigError;
use crate::jobs::pool::{WorkerLimits, DEFAULT_WORKERS, MAX_WORKERS};
use crate::media::ytdlp::YtDlpTool;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Configuración del servidor de descargas
#[derive(Debug, Clone, Parser)]
#[command(name = "batch_downloader")]
#[command(about = "Servidor HTTP/1.0 para descargas de medios por lotes")]
#[command(version)]
pub struct Config {
    /// Puerto en el que escucha el servidor
    #[arg(short, long, default_value_t = 8080, env = "HTTP_PORT")]
    pub port: u16,

    /// Host/IP en el que escucha
    #[arg(long, default_value = "127.0.0.1", env = "HTTP_HOST")]
    pub host: String,

    // === Workers ===
    /// Workers por job cuando el request no indica un valor usable
    #[arg(long = "default-workers", default_value_t = DEFAULT_WORKERS, env = "DEFAULT_WORKERS")]
    pub default_workers: usize,

    /// Máximo de workers por job
    #[arg(long = "max-workers", default_value_t = MAX_WORKERS, env = "MAX_WORKERS")]
    pub max_workers: usize,

    // === Herramientas ===
    /// Ejecutable de yt-dlp
    #[arg(long = "yt-dlp", default_value = "yt-dlp", env = "YT_DLP_BIN")]
    pub yt_dlp: String,

    /// Directorio con ffmpeg (si no está en el PATH)
    #[arg(long = "ffmpeg-location", env = "FFMPEG_LOCATION")]
    pub ffmpeg_location: Option<PathBuf>,

    /// Directorio donde se guardan las descargas
    #[arg(long = "output-dir", default_value = "./downloads", env = "DOWNLOAD_DIR")]
    pub output_dir: PathBuf,

    // === Logging ===
    /// Filtro de logs cuando `RUST_LOG` no está definido
    #[arg(long = "log-level", default_value = "info", env = "LOG_LEVEL")]
    pub log_level: String,
}

impl Config {
    /// Parsea argumentos CLI (y variables de entorno)
    pub fn new() -> Self {
        Config::parse()
    }

    /// Dirección completa para bind (host:port)
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Rango de workers por job
    pub fn worker_limits(&self) -> WorkerLimits {
        WorkerLimits::new(self.default_workers, self.max_workers)
    }

    pub fn yt_dlp_tool(&self) -> YtDlpTool {
        YtDlpTool::new(&self.yt_dlp, self.ffmpeg_location.clone())
    }

    /// Valida la configuración
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_workers == 0 {
            return Err(ConfigError::MaxWorkers);
        }
        if self.default_workers == 0 || self.default_workers > self.max_workers {
            return Err(ConfigError::DefaultWorkers {
                value: self.default_workers,
                max: self.max_workers,
            });
        }
        self.log_filter()?;
        Ok(())
    }

    /// Filtro de tracing a partir de `--log-level`
    pub fn log_filter(&self) -> Result<EnvFilter, ConfigError> {
        EnvFilter::try_new(&self.log_level).map_err(|_| ConfigError::LogLevel(self.log_level.clone()))
    }

    /// Registra un resumen de la configuración efectiva
    pub fn print_summary(&self) {
        tracing::info!(
            address = %self.address(),
            default_workers = self.default_workers,
            max_workers = self.max_workers,
            yt_dlp = %self.yt_dlp,
            ffmpeg_location = ?self.ffmpeg_location,
            output_dir = %self.output_dir.display(),
            "configuration loaded"
        );
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            host: "127.0.0.1".to_string(),
            default_workers: DEFAULT_WORKERS,
            max_workers: MAX_WORKERS,
            yt_dlp: "yt-dlp".to_string(),
            ffmpeg_location: None,
            output_dir: PathBuf::from("./downloads"),
            log_level: "info".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.port, 8080);
        assert_eq!(config.address(), "127.0.0.1:8080");
        assert_eq!(config.default_workers, 4);
        assert_eq!(config.max_workers, 8);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_cli_args() {
        let config = Config::try_parse_from([
            "batch_downloader",
            "--port",
            "3000",
            "--host",
            "0.0.0.0",
            "--default-workers",
            "2",
            "--max-workers",
            "3",
            "--output-dir",
            "/srv/media",
        ])
        .unwrap();

        assert_eq!(config.address(), "0.0.0.0:3000");
        assert_eq!(config.worker_limits(), WorkerLimits::new(2, 3));
        assert_eq!(config.output_dir, PathBuf::from("/srv/media"));
    }

    // ==================== Workers Validation ====================

    #[test]
    fn test_validate_zero_max_workers() {
        let config = Config {
            max_workers: 0,
            ..Config::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::MaxWorkers));
    }

    #[test]
    fn test_validate_default_above_max() {
        let config = Config {
            default_workers: 6,
            max_workers: 4,
            ..Config::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::DefaultWorkers { value: 6, max: 4 })
        );
    }

    #[test]
    fn test_validate_zero_default_workers() {
        let config = Config {
            default_workers: 0,
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::DefaultWorkers { .. })));
    }

    // ==================== Logging ====================

    #[test]
    fn test_validate_log_level() {
        let config = Config {
            log_level: "batch_downloader=debug,warn".to_string(),
            ..Config::default()
        };
        assert!(config.validate().is_ok());

        let config = Config {
            log_level: "batch_downloader=loud".to_string(),
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::LogLevel(_))));
    }

    #[test]
    fn test_yt_dlp_tool_from_config() {
        let config = Config {
            yt_dlp: "/opt/bin/yt-dlp".to_string(),
            ffmpeg_location: Some(PathBuf::from("/opt/ffmpeg")),
            ..Config::default()
        };
        let tool = config.yt_dlp_tool();
        assert_eq!(tool.binary, "/opt/bin/yt-dlp");
        assert_eq!(tool.ffmpeg_location, Some(PathBuf::from("/opt/ffmpeg")));
    }
}
