//! # Módulo del Servidor HTTP
//! src/server/mod.rs
//!
//! Servidor TCP que:
//! 1. Escucha en un puerto
//! 2. Acepta conexiones (un thread por conexión)
//! 3. Lee y parsea el request, incluido el body JSON
//! 4. Enruta a la API de jobs, catálogos, métricas o la página principal

pub mod tcp;

pub use tcp::Server;
