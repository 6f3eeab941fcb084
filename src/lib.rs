//! # Batch Downloader
//! src/lib.rs
//!
//! Servidor HTTP/1.0 que recibe lotes de direcciones de medios y los
//! descarga en segundo plano con un pool de workers acotado por lote.
//!
//! ## Arquitectura
//!
//! - `http`: parsing y construcción de mensajes HTTP/1.0
//! - `server`: servidor TCP, un thread por conexión
//! - `router`: enrutamiento por método y patrón de path
//! - `jobs`: jobs, store compartido, pool de workers y Job Manager
//! - `media`: colaboradores externos (yt-dlp, listado de canales)
//! - `metrics`: métricas de requests y contadores de jobs
//! - `config`: argumentos CLI y variables de entorno
//!
//! ## Ejemplo de uso
//!
//! ```no_run
//! use batch_downloader::config::Config;
//! use batch_downloader::server::Server;
//!
//! let config = Config::default();
//! let server = Server::new(config);
//! server.run().expect("Error al iniciar servidor");
//! ```

pub mod config;
pub mod error;
pub mod http;
pub mod jobs;
pub mod media;
pub mod metrics;
pub mod router;
pub mod server;
pub mod ui;
