//! # Sistema de Métricas
//! src/metrics/mod.rs
//!
//! Recolección y agregación de métricas del servidor:
//! - Contadores de requests y latencias (p50, p95, p99)
//! - Conexiones activas
//! - Jobs creados/terminados e items descargados/fallidos

pub mod collector;

pub use collector::{JobStats, MetricsCollector, MetricsSnapshot};
