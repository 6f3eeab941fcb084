//! # Registro de Jobs en Memoria
//! src/jobs/store.rs
//!
//! El store es el único dueño del estado de los jobs. El thread de
//! ejecución de un job solo guarda el ID y pasa por aquí para cada
//! escritura; los lectores reciben copias tomadas bajo el mismo lock,
//! así que nunca ven un item a medio actualizar.
//!
//! Vive lo mismo que el proceso: se crea una vez al arrancar el servidor
//! y no persiste nada en disco.

use crate::jobs::types::Job;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// Disciplina de acceso al registro de jobs.
///
/// El Job Manager la recibe en su constructor, lo que permite probarlo
/// con stores falsos.
pub trait JobStore: Send + Sync {
    /// Registra un job nuevo. Retorna false si el ID ya existía.
    fn insert(&self, job: Job) -> bool;

    /// Snapshot de un job
    fn get(&self, job_id: &str) -> Option<Job>;

    /// Aplica `f` al job con acceso exclusivo.
    ///
    /// Retorna false (sin llamar a `f`) si el job ya no está registrado.
    fn update(&self, job_id: &str, f: &mut dyn FnMut(&mut Job)) -> bool;

    /// Elimina un job. Las escrituras posteriores sobre ese ID se descartan.
    fn remove(&self, job_id: &str) -> Option<Job>;

    /// Número de jobs registrados
    fn count(&self) -> usize;
}

/// Store con un único `Mutex` global
#[derive(Default)]
pub struct InMemoryJobStore {
    jobs: Arc<Mutex<HashMap<String, Job>>>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Todos los jobs, en orden indefinido
    pub fn get_all(&self) -> Vec<Job> {
        self.lock().values().cloned().collect()
    }

    /// Un thread que entró en pánico con el lock tomado no invalida el
    /// registro: cada escritura es un overwrite completo de un campo.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, Job>> {
        self.jobs.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl JobStore for InMemoryJobStore {
    fn insert(&self, job: Job) -> bool {
        let mut jobs = self.lock();
        if jobs.contains_key(&job.id) {
            return false;
        }
        jobs.insert(job.id.clone(), job);
        true
    }

    fn get(&self, job_id: &str) -> Option<Job> {
        self.lock().get(job_id).cloned()
    }

    fn update(&self, job_id: &str, f: &mut dyn FnMut(&mut Job)) -> bool {
        let mut jobs = self.lock();
        match jobs.get_mut(job_id) {
            Some(job) => {
                f(job);
                true
            }
            None => false,
        }
    }

    fn remove(&self, job_id: &str) -> Option<Job> {
        self.lock().remove(job_id)
    }

    fn count(&self) -> usize {
        self.lock().len()
    }
}

impl Clone for InMemoryJobStore {
    fn clone(&self) -> Self {
        Self {
            jobs: Arc::clone(&self.jobs),
        }
    }
}
