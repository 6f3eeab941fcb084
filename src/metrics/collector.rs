//! # Collector de Métricas
//! src/metrics/collector.rs
//!
//! Recolecta métricas del servidor HTTP y contadores de jobs en tiempo real.

use crate::jobs::types::{ItemStatus, JobStatus};
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Máximo de latencias a guardar (para calcular percentiles)
const MAX_LATENCIES: usize = 10_000;

/// Collector de métricas thread-safe
pub struct MetricsCollector {
    inner: Mutex<MetricsData>,
    start_time: Instant,
}

/// Datos internos de métricas
#[derive(Default)]
struct MetricsData {
    /// Contador total de requests
    total_requests: u64,

    /// Requests por código de estado
    status_codes: HashMap<u16, u64>,

    /// Últimas latencias registradas (en microsegundos)
    latencies: VecDeque<u64>,

    /// Requests por ruta
    requests_per_path: HashMap<String, u64>,

    /// Conexiones en curso
    active_threads: u64,

    jobs: JobStats,
}

/// Contadores del sistema de jobs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct JobStats {
    pub jobs_created: u64,
    pub jobs_done: u64,
    pub jobs_failed: u64,
    pub items_done: u64,
    pub items_failed: u64,
}

/// Snapshot de métricas (para uso externo)
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub total_requests: u64,
    pub active_threads: u64,
    pub uptime_secs: u64,
    pub latency_p50_us: u64,
    pub latency_p95_us: u64,
    pub latency_p99_us: u64,
    pub latency_avg_us: u64,
}

impl MetricsCollector {
    /// Crea un nuevo collector de métricas
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MetricsData {
                latencies: VecDeque::with_capacity(MAX_LATENCIES),
                ..MetricsData::default()
            }),
            start_time: Instant::now(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MetricsData> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Registra un request atendido
    pub fn record_request(&self, path: &str, status_code: u16, latency: Duration) {
        let mut data = self.lock();

        data.total_requests += 1;
        *data.status_codes.entry(status_code).or_insert(0) += 1;

        if data.latencies.len() >= MAX_LATENCIES {
            data.latencies.pop_front();
        }
        data.latencies.push_back(latency.as_micros() as u64);

        *data.requests_per_path.entry(path.to_string()).or_insert(0) += 1;
    }

    pub fn increment_active_threads(&self) {
        self.lock().active_threads += 1;
    }

    pub fn decrement_active_threads(&self) {
        let mut data = self.lock();
        data.active_threads = data.active_threads.saturating_sub(1);
    }

    pub fn active_threads(&self) -> u64 {
        self.lock().active_threads
    }

    // ==================== Jobs ====================

    pub fn record_job_created(&self) {
        self.lock().jobs.jobs_created += 1;
    }

    pub fn record_item_finished(&self, status: ItemStatus) {
        let mut data = self.lock();
        match status {
            ItemStatus::Done => data.jobs.items_done += 1,
            ItemStatus::Error => data.jobs.items_failed += 1,
            ItemStatus::Pending | ItemStatus::Running => {}
        }
    }

    pub fn record_job_finished(&self, status: JobStatus) {
        let mut data = self.lock();
        match status {
            JobStatus::Done => data.jobs.jobs_done += 1,
            JobStatus::Error => data.jobs.jobs_failed += 1,
            JobStatus::Pending | JobStatus::Running => {}
        }
    }

    pub fn job_stats(&self) -> JobStats {
        self.lock().jobs
    }

    // ==================== Export ====================

    /// Métricas actuales en formato JSON (para /metrics)
    pub fn to_json(&self) -> serde_json::Value {
        let data = self.lock();

        let (p50, p95, p99, avg) = percentiles(&data.latencies);
        let stddev = stddev(&data.latencies, avg);

        let status_codes: HashMap<String, u64> = data
            .status_codes
            .iter()
            .map(|(code, count)| (code.to_string(), *count))
            .collect();

        // Top 10 rutas más accedidas
        let mut paths: Vec<_> = data.requests_per_path.iter().collect();
        paths.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        let top_paths: Vec<_> = paths
            .iter()
            .take(10)
            .map(|(path, count)| serde_json::json!({ "path": path, "count": count }))
            .collect();

        serde_json::json!({
            "server": {
                "uptime_seconds": self.start_time.elapsed().as_secs(),
            },
            "requests": {
                "total": data.total_requests,
                "active_threads": data.active_threads,
                "status_codes": status_codes,
                "top_paths": top_paths,
            },
            "latency_us": {
                "p50": p50,
                "p95": p95,
                "p99": p99,
                "avg": avg,
                "stddev": (stddev * 100.0).round() / 100.0,
                "samples": data.latencies.len(),
            },
            "jobs": data.jobs,
        })
    }

    /// Obtiene un snapshot de las métricas HTTP
    pub fn get_snapshot(&self) -> MetricsSnapshot {
        let data = self.lock();
        let (p50, p95, p99, avg) = percentiles(&data.latencies);

        MetricsSnapshot {
            total_requests: data.total_requests,
            active_threads: data.active_threads,
            uptime_secs: self.start_time.elapsed().as_secs(),
            latency_p50_us: p50,
            latency_p95_us: p95,
            latency_p99_us: p99,
            latency_avg_us: avg,
        }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// (p50, p95, p99, promedio)
fn percentiles(latencies: &VecDeque<u64>) -> (u64, u64, u64, u64) {
    if latencies.is_empty() {
        return (0, 0, 0, 0);
    }

    let mut sorted: Vec<u64> = latencies.iter().copied().collect();
    sorted.sort_unstable();

    let len = sorted.len();
    let p50 = sorted[len * 50 / 100];
    let p95 = sorted[len * 95 / 100];
    let p99 = sorted[len * 99 / 100];
    let avg = sorted.iter().sum::<u64>() / len as u64;

    (p50, p95, p99, avg)
}

fn stddev(latencies: &VecDeque<u64>, avg: u64) -> f64 {
    if latencies.is_empty() {
        return 0.0;
    }

    let variance = latencies
        .iter()
        .map(|&x| {
            let diff = x as f64 - avg as f64;
            diff * diff
        })
        .sum::<f64>()
        / latencies.len() as f64;

    variance.sqrt()
}
