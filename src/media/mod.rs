//! # Colaboradores de Medios
//!
//! Lo que el sistema de jobs consume desde afuera:
//!
//! - `catalog`: normalización de direcciones de canal y listado paginado
//! - `ytdlp`: descarga y conversión de un item usando `yt-dlp`
//! - `handlers`: endpoint `/api/channel`
//!
//! El Job Manager solo conoce el trait `MediaFetcher`; cualquier closure
//! con la firma correcta sirve como fetcher (útil en tests).

pub mod catalog;
pub mod handlers;
pub mod ytdlp;

pub use catalog::{normalize_catalog_address, CatalogEntry, CatalogSource, YtDlpCatalog};
pub use ytdlp::{YtDlpFetcher, YtDlpTool};

use crate::jobs::types::{MediaMode, Outcome};

/// Unidad de trabajo de un item: descargar y convertir un target.
///
/// Se ejecuta en un worker del pool y puede bloquear todo lo que dure
/// la descarga.
pub trait MediaFetcher: Send + Sync {
    fn fetch(&self, target: &str, mode: MediaMode, format: &str) -> Outcome;
}

impl<F> MediaFetcher for F
where
    F: Fn(&str, MediaMode, &str) -> Outcome + Send + Sync,
{
    fn fetch(&self, target: &str, mode: MediaMode, format: &str) -> Outcome {
        self(target, mode, format)
    }
}
