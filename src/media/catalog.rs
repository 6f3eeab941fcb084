//! # Catálogos de Canal
//! src/media/catalog.rs
//!
//! Normaliza direcciones de canal para que apunten a la lista de videos
//! y recorre el listado en páginas (`start`, `count`).

use crate::error::FetchError;
use crate::media::ytdlp::YtDlpTool;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Una entrada del catálogo
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub title: String,

    /// Dirección que se puede encolar como target
    #[serde(rename = "url")]
    pub target: String,
}

/// Direcciones que ya apuntan a una lista concreta
fn list_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)(/videos|/streams|/shorts|/playlist|/watch|list=)").expect("valid catalog pattern")
    })
}

/// Páginas de canal que necesitan `/videos`
fn channel_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)(/channel/|/user/|/c/|/@)").expect("valid catalog pattern")
    })
}

/// Normaliza una dirección de canal.
///
/// - `@handle` → `https://www.youtube.com/@handle`
/// - `youtube.com/...` → `https://youtube.com/...`
/// - listas (`/videos`, `/playlist`, `list=`, ...) quedan igual
/// - páginas de canal reciben `/videos`
///
/// Es idempotente: normalizar dos veces da el mismo resultado.
pub fn normalize_catalog_address(raw: &str) -> String {
    let mut url = raw.trim().to_string();
    if url.is_empty() {
        return url;
    }

    if url.starts_with('@') {
        url = format!("https://www.youtube.com/{}", url);
    }
    if url.starts_with("youtube.com/") {
        url = format!("https://{}", url);
    }

    let lower = url.to_lowercase();
    let lower = lower.trim_end_matches('/');

    if list_pattern().is_match(lower) {
        return url;
    }
    if channel_pattern().is_match(lower) {
        return format!("{}/videos", url.trim_end_matches('/'));
    }
    url
}

/// Fuente paginada de entradas de catálogo
pub trait CatalogSource: Send + Sync {
    /// Hasta `count` entradas a partir de `start` (base 0). Puede
    /// retornar menos cerca del final y ninguna si `start` lo supera.
    fn list_entries(&self, address: &str, start: usize, count: usize) -> Result<Vec<CatalogEntry>, FetchError>;
}

/// Listado plano de yt-dlp (`--flat-playlist --dump-single-json`)
#[derive(Debug, Deserialize)]
struct FlatPlaylist {
    #[serde(default)]
    entries: Option<Vec<FlatEntry>>,
}

#[derive(Debug, Deserialize)]
struct FlatEntry {
    title: Option<String>,
    url: Option<String>,
    webpage_url: Option<String>,
}

impl FlatEntry {
    fn into_entry(self) -> Option<CatalogEntry> {
        let target = self
            .url
            .filter(|u| !u.is_empty())
            .or(self.webpage_url.filter(|u| !u.is_empty()))?;
        Some(CatalogEntry {
            title: self.title.unwrap_or_else(|| "N/A".to_string()),
            target,
        })
    }
}

/// Convierte la salida JSON de yt-dlp en entradas de catálogo.
/// Las entradas sin dirección se descartan.
pub fn parse_flat_playlist(json: &[u8]) -> Result<Vec<CatalogEntry>, FetchError> {
    let playlist: FlatPlaylist = serde_json::from_slice(json)?;
    Ok(playlist
        .entries
        .unwrap_or_default()
        .into_iter()
        .filter_map(FlatEntry::into_entry)
        .collect())
}

/// Catálogo respaldado por yt-dlp
#[derive(Debug, Clone, Default)]
pub struct YtDlpCatalog {
    tool: YtDlpTool,
}

impl YtDlpCatalog {
    pub fn new(tool: YtDlpTool) -> Self {
        Self { tool }
    }

    /// Argumentos para pedir una página del listado
    pub fn build_args(address: &str, start: usize, count: usize) -> Vec<String> {
        vec![
            "--flat-playlist".to_string(),
            "--dump-single-json".to_string(),
            "--skip-download".to_string(),
            "--no-warnings".to_string(),
            "--playlist-start".to_string(),
            start.saturating_add(1).to_string(),
            "--playlist-end".to_string(),
            start.saturating_add(count).to_string(),
            "--".to_string(),
            address.to_string(),
        ]
    }
}

impl CatalogSource for YtDlpCatalog {
    fn list_entries(&self, address: &str, start: usize, count: usize) -> Result<Vec<CatalogEntry>, FetchError> {
        if count == 0 {
            return Ok(Vec::new());
        }
        let output = self.tool.run(&Self::build_args(address, start, count))?;
        let entries = parse_flat_playlist(&output.stdout)?;
        tracing::debug!(address, start, count, found = entries.len(), "catalog page fetched");
        Ok(entries)
    }
}
