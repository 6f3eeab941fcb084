//! # Pool de Workers por Job
//! src/jobs/pool.rs
//!
//! Ejecuta N tareas independientes con a lo sumo W threads concurrentes.
//!
//! ## Arquitectura
//!
//! ```text
//!              ┌──────────┐
//!  tareas ───► │  cola    │ ◄── worker-0 ─┐
//!  (índice)    │ (Mutex)  │ ◄── worker-1 ─┼──► canal ──► on_event (thread llamador)
//!              └──────────┘ ◄── worker-W ─┘
//! ```
//!
//! Cada worker toma la siguiente tarea de la cola, avisa que empezó,
//! la ejecuta y envía el resultado. Todos los eventos pasan por un único
//! canal, así que el llamador los aplica en el mismo orden en que
//! ocurrieron: el `Started` de una tarea siempre llega antes que su
//! `Finished`, y nunca hay más de W tareas entre ambos.

use crate::jobs::types::Outcome;
use std::any::Any;
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{mpsc, Mutex};
use std::thread;

/// Paralelismo por defecto cuando el cliente no pide uno válido
pub const DEFAULT_WORKERS: usize = 4;

/// Tope de paralelismo por job
pub const MAX_WORKERS: usize = 8;

/// Rango de workers permitido: `[1, max_workers]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerLimits {
    pub default_workers: usize,
    pub max_workers: usize,
}

impl Default for WorkerLimits {
    fn default() -> Self {
        Self {
            default_workers: DEFAULT_WORKERS,
            max_workers: MAX_WORKERS,
        }
    }
}

impl WorkerLimits {
    /// Crea límites normalizados: `max >= 1` y `default` dentro del rango.
    pub fn new(default_workers: usize, max_workers: usize) -> Self {
        let max_workers = max_workers.max(1);
        Self {
            default_workers: default_workers.clamp(1, max_workers),
            max_workers,
        }
    }

    /// Cero o negativo usa el default; por encima del máximo usa el máximo.
    pub fn clamp(&self, requested: i64) -> usize {
        if requested <= 0 {
            return self.default_workers;
        }
        usize::try_from(requested)
            .map(|n| n.min(self.max_workers))
            .unwrap_or(self.max_workers)
    }

    /// Como `clamp`, pero un valor ausente usa el default
    pub fn resolve(&self, requested: Option<i64>) -> usize {
        requested
            .map(|n| self.clamp(n))
            .unwrap_or(self.default_workers)
    }
}

/// Evento emitido por el pool, identificado por el índice de la tarea
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PoolEvent {
    Started(usize),
    Finished(usize, Outcome),
}

/// Ejecutor con concurrencia acotada
#[derive(Debug, Clone, Copy)]
pub struct WorkerPool {
    workers: usize,
}

impl WorkerPool {
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Ejecuta todas las tareas y bloquea hasta que terminen.
    ///
    /// `on_event` corre en el thread llamador y recibe exactamente un
    /// `Finished` por tarea. Un pánico dentro de `work` se convierte en
    /// `Outcome::Error` para esa tarea; el resto sigue corriendo.
    pub fn run<T, W, H>(&self, tasks: Vec<T>, work: W, mut on_event: H)
    where
        T: Send,
        W: Fn(T) -> Outcome + Sync,
        H: FnMut(PoolEvent),
    {
        if tasks.is_empty() {
            return;
        }

        let threads = self.workers.min(tasks.len());
        let queue: Mutex<VecDeque<(usize, T)>> = Mutex::new(tasks.into_iter().enumerate().collect());

        thread::scope(|scope| {
            let (tx, rx) = mpsc::channel::<PoolEvent>();

            for n in 0..threads {
                let tx = tx.clone();
                let queue = &queue;
                let work = &work;

                let spawned = thread::Builder::new()
                    .name(format!("pool-worker-{}", n))
                    .spawn_scoped(scope, move || {
                        while let Some((index, task)) = next_task(queue) {
                            if tx.send(PoolEvent::Started(index)).is_err() {
                                break;
                            }
                            let outcome = run_guarded(work, task);
                            if tx.send(PoolEvent::Finished(index, outcome)).is_err() {
                                break;
                            }
                        }
                    });

                if let Err(e) = spawned {
                    tracing::warn!(worker = n, error = %e, "could not spawn pool worker");
                }
            }

            // Solo los workers conservan senders; el canal se cierra
            // cuando el último termina.
            drop(tx);

            for event in rx {
                on_event(event);
            }
        });

        // Si no se pudo lanzar ningún worker, lo que quedó en la cola se
        // ejecuta aquí mismo para mantener un resultado por tarea.
        while let Some((index, task)) = next_task(&queue) {
            on_event(PoolEvent::Started(index));
            on_event(PoolEvent::Finished(index, run_guarded(&work, task)));
        }
    }
}

fn next_task<T>(queue: &Mutex<VecDeque<(usize, T)>>) -> Option<(usize, T)> {
    queue
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .pop_front()
}

fn run_guarded<T, W>(work: &W, task: T) -> Outcome
where
    W: Fn(T) -> Outcome,
{
    match panic::catch_unwind(AssertUnwindSafe(|| work(task))) {
        Ok(outcome) => outcome,
        Err(payload) => Outcome::Error(format!("task panicked: {}", panic_message(payload.as_ref()))),
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
