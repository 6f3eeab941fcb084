//! # Descargas con yt-dlp
//! src/media/ytdlp.rs
//!
//! Traduce (modo, formato) a argumentos de `yt-dlp` y ejecuta el proceso.
//!
//! ## Formatos
//!
//! | Modo  | Formato | Selección de yt-dlp                          |
//! |-------|---------|----------------------------------------------|
//! | video | best    | `bestvideo+bestaudio/best`                   |
//! | video | 1080p   | `bestvideo[height<=1080]+bestaudio/best`     |
//! | video | 720p    | `bestvideo[height<=720]+bestaudio/best`      |
//! | audio | mp3/m4a/opus | `bestaudio/best` + extracción a 192 kbps |
//!
//! Formatos desconocidos caen en `best` (video) o `mp3` (audio).

use crate::error::FetchError;
use crate::jobs::types::{MediaMode, Outcome};
use crate::media::MediaFetcher;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

/// Ubicación de las herramientas externas
#[derive(Debug, Clone)]
pub struct YtDlpTool {
    /// Ejecutable de yt-dlp
    pub binary: String,

    /// Directorio con ffmpeg (si no está en el PATH)
    pub ffmpeg_location: Option<PathBuf>,
}

impl Default for YtDlpTool {
    fn default() -> Self {
        Self {
            binary: "yt-dlp".to_string(),
            ffmpeg_location: None,
        }
    }
}

impl YtDlpTool {
    pub fn new(binary: &str, ffmpeg_location: Option<PathBuf>) -> Self {
        Self {
            binary: binary.to_string(),
            ffmpeg_location,
        }
    }

    /// Ejecuta yt-dlp con los argumentos dados y retorna la salida si
    /// terminó con código 0.
    pub fn run(&self, args: &[String]) -> Result<Output, FetchError> {
        let mut cmd = Command::new(&self.binary);
        if let Some(dir) = self.ffmpeg_location.as_deref().filter(|p| p.exists()) {
            cmd.arg("--ffmpeg-location").arg(dir);
        }
        cmd.args(args);

        tracing::debug!(tool = %self.binary, ?args, "running external tool");

        let output = cmd.output().map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                FetchError::ToolMissing {
                    tool: self.binary.clone(),
                }
            } else {
                FetchError::Spawn {
                    tool: self.binary.clone(),
                    source: e,
                }
            }
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(FetchError::ToolFailed {
                tool: self.binary.clone(),
                code: output.status.code(),
                stderr: if stderr.is_empty() {
                    "unknown error".to_string()
                } else {
                    last_error_line(&stderr)
                },
            });
        }

        Ok(output)
    }
}

/// yt-dlp escribe warnings antes del error real; nos quedamos con la
/// última línea `ERROR:` si existe.
fn last_error_line(stderr: &str) -> String {
    stderr
        .lines()
        .rev()
        .find(|line| line.starts_with("ERROR:"))
        .unwrap_or(stderr)
        .trim()
        .to_string()
}

/// Selección de formato de video para yt-dlp
pub fn video_format_selector(format: &str) -> &'static str {
    match format.trim().to_lowercase().as_str() {
        "1080p" => "bestvideo[height<=1080]+bestaudio/best",
        "720p" => "bestvideo[height<=720]+bestaudio/best",
        _ => "bestvideo+bestaudio/best",
    }
}

/// Codec de audio para la extracción
pub fn audio_codec(format: &str) -> &'static str {
    match format.trim().to_lowercase().as_str() {
        "m4a" => "m4a",
        "opus" => "opus",
        _ => "mp3",
    }
}

/// Fetcher que descarga cada target con yt-dlp
#[derive(Debug, Clone)]
pub struct YtDlpFetcher {
    tool: YtDlpTool,

    /// Directorio destino de los archivos descargados
    output_dir: PathBuf,
}

impl YtDlpFetcher {
    pub fn new(tool: YtDlpTool, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            tool,
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Argumentos de yt-dlp para un target
    pub fn build_args(&self, target: &str, mode: MediaMode, format: &str) -> Vec<String> {
        let template = self.output_dir.join("%(title)s.%(ext)s");
        let mut args = vec![
            "--quiet".to_string(),
            "--no-warnings".to_string(),
            "--no-progress".to_string(),
            "-o".to_string(),
            template.to_string_lossy().to_string(),
        ];

        match mode {
            MediaMode::Video => {
                args.push("-f".to_string());
                args.push(video_format_selector(format).to_string());
                args.push("--merge-output-format".to_string());
                args.push("mp4".to_string());
            }
            MediaMode::Audio => {
                args.push("-f".to_string());
                args.push("bestaudio/best".to_string());
                args.push("--extract-audio".to_string());
                args.push("--audio-format".to_string());
                args.push(audio_codec(format).to_string());
                args.push("--audio-quality".to_string());
                args.push("192K".to_string());
            }
        }

        // `--` evita que un target que empiece con '-' se lea como opción
        args.push("--".to_string());
        args.push(target.to_string());
        args
    }

    fn download(&self, target: &str, mode: MediaMode, format: &str) -> Result<(), FetchError> {
        let args = self.build_args(target, mode, format);
        self.tool.run(&args).map(|_| ())
    }
}

impl MediaFetcher for YtDlpFetcher {
    fn fetch(&self, target: &str, mode: MediaMode, format: &str) -> Outcome {
        self.download(target, mode, format).into()
    }
}
