//! # Gestor Central de Jobs
//! src/jobs/manager.rs
//!
//! Crea jobs, lanza un thread de ejecución por job y expone su estado.
//!
//! ## Flujo
//!
//! ```text
//! create_job ──► store.insert(pending) ──► spawn thread ──► return id
//!                                              │
//!                                              ▼
//!                      run: running + items ──► WorkerPool ──► finish
//! ```
//!
//! El thread de ejecución solo conoce el ID del job: toda lectura o
//! escritura pasa por el store. Si el job se elimina a mitad de camino,
//! las escrituras restantes se descartan en silencio.

use crate::error::JobError;
use crate::jobs::pool::{PoolEvent, WorkerLimits, WorkerPool};
use crate::jobs::store::JobStore;
use crate::jobs::types::{ItemStatus, Job, JobStatus, MediaMode};
use crate::media::MediaFetcher;
use crate::metrics::MetricsCollector;
use std::sync::Arc;
use std::thread;
use uuid::Uuid;

/// Gestor central de jobs
#[derive(Clone)]
pub struct JobManager {
    /// Registro de jobs (única fuente de verdad)
    store: Arc<dyn JobStore>,

    /// Unidad de trabajo para cada item
    fetcher: Arc<dyn MediaFetcher>,

    /// Rango de workers permitido por job
    limits: WorkerLimits,

    metrics: Arc<MetricsCollector>,
}

impl JobManager {
    /// Crea un nuevo Job Manager sobre un store ya construido
    pub fn new(store: Arc<dyn JobStore>, fetcher: Arc<dyn MediaFetcher>, limits: WorkerLimits) -> Self {
        Self {
            store,
            fetcher,
            limits,
            metrics: Arc::new(MetricsCollector::new()),
        }
    }

    /// Reporta los contadores de jobs en un collector compartido
    pub fn with_metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn limits(&self) -> WorkerLimits {
        self.limits
    }

    pub fn metrics(&self) -> &Arc<MetricsCollector> {
        &self.metrics
    }

    /// Registra un job y arranca su ejecución en segundo plano.
    ///
    /// Los targets se recortan y los vacíos se descartan; los duplicados
    /// se conservan como items distintos. Retorna apenas el job queda
    /// visible en el store, sin esperar a ningún item.
    pub fn create_job(
        &self,
        targets: Vec<String>,
        mode: MediaMode,
        format: &str,
        workers: Option<i64>,
    ) -> Result<String, JobError> {
        let targets: Vec<String> = targets
            .into_iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();

        if targets.is_empty() {
            return Err(JobError::EmptyTargets);
        }

        let workers = self.limits.resolve(workers);
        let job_id = self.register(workers);
        self.metrics.record_job_created();
        let format = format.trim().to_string();

        tracing::info!(
            job_id = %job_id,
            items = targets.len(),
            workers,
            mode = mode.as_str(),
            format = %format,
            "job created"
        );

        let manager = self.clone();
        let id = job_id.clone();
        let spawned = thread::Builder::new()
            .name(format!("job-{}", &job_id[..8]))
            .spawn(move || manager.run(&id, targets, mode, &format, workers));

        if let Err(e) = spawned {
            self.store.remove(&job_id);
            self.metrics.record_job_finished(JobStatus::Error);
            tracing::error!(job_id = %job_id, error = %e, "could not spawn job thread");
            return Err(JobError::Spawn {
                id: job_id,
                reason: e.to_string(),
            });
        }

        Ok(job_id)
    }

    /// Snapshot de un job
    pub fn get_job(&self, job_id: &str) -> Result<Job, JobError> {
        self.store
            .get(job_id)
            .ok_or_else(|| JobError::NotFound(job_id.to_string()))
    }

    /// Elimina un job del registro. Si aún corre, sus items siguen
    /// ejecutándose pero sus resultados ya no se guardan.
    pub fn remove_job(&self, job_id: &str) -> Result<Job, JobError> {
        let removed = self
            .store
            .remove(job_id)
            .ok_or_else(|| JobError::NotFound(job_id.to_string()))?;
        tracing::info!(job_id = %job_id, status = removed.status.as_str(), "job purged");
        Ok(removed)
    }

    /// Número de jobs registrados
    pub fn job_count(&self) -> usize {
        self.store.count()
    }

    /// Inserta un job `pending` con un ID nuevo
    fn register(&self, workers: usize) -> String {
        loop {
            let job_id = Uuid::new_v4().to_string();
            if self.store.insert(Job::new(job_id.clone(), workers)) {
                return job_id;
            }
        }
    }

    /// Ejecución en segundo plano de un job
    fn run(&self, job_id: &str, targets: Vec<String>, mode: MediaMode, format: &str, workers: usize) {
        // 1. running + items pending en orden de envío
        if !self.store.update(job_id, &mut |job| job.start(&targets)) {
            tracing::debug!(job_id = %job_id, "job removed before start");
            return;
        }

        // 2. Una tarea por item, correlacionada por índice
        let pool = WorkerPool::new(workers);
        let fetcher = Arc::clone(&self.fetcher);

        pool.run(
            targets,
            |target: String| fetcher.fetch(&target, mode, format),
            |event| self.apply_event(job_id, event),
        );

        // 3. Todas las escrituras de items ya se aplicaron
        let mut final_job: Option<Job> = None;
        self.store.update(job_id, &mut |job| {
            job.finish();
            self.metrics.record_job_finished(job.status);
            final_job = Some(job.clone());
        });

        match final_job {
            Some(job) => {
                tracing::info!(
                    job_id = %job_id,
                    status = job.status.as_str(),
                    done = job.count(ItemStatus::Done),
                    failed = job.count(ItemStatus::Error),
                    "job finished"
                );
            }
            None => tracing::debug!(job_id = %job_id, "job removed while running; final status discarded"),
        }
    }

    /// Aplica un evento del pool al item correspondiente
    fn apply_event(&self, job_id: &str, event: PoolEvent) {
        let (index, status, message) = match &event {
            PoolEvent::Started(index) => (*index, ItemStatus::Running, ""),
            PoolEvent::Finished(index, outcome) => (*index, outcome.status(), outcome.message()),
        };

        let mut target = String::new();
        let applied = self.store.update(job_id, &mut |job| {
            if let Some(item) = job.items.get_mut(index) {
                if item.advance(status, message) {
                    target = item.target.clone();
                }
            }
        });

        if !applied {
            tracing::debug!(job_id = %job_id, index, "job no longer registered; update discarded");
            return;
        }

        match status {
            ItemStatus::Running => {
                tracing::debug!(job_id = %job_id, index, target = %target, "item started");
            }
            ItemStatus::Done => {
                self.metrics.record_item_finished(status);
                tracing::info!(job_id = %job_id, index, target = %target, "item done");
            }
            ItemStatus::Error => {
                self.metrics.record_item_finished(status);
                tracing::warn!(job_id = %job_id, index, target = %target, error = message, "item failed");
            }
            ItemStatus::Pending => {}
        }
    }
}
