//! # Sistema de Jobs
//!
//! Un job es un lote de targets que se descargan en paralelo con un
//! número acotado de workers. La creación retorna el ID de inmediato y
//! el progreso se consulta por snapshots.
//!
//! - `types`: job, items, estados y resultado de cada unidad de trabajo
//! - `store`: registro compartido de jobs
//! - `pool`: pool de workers acotado por job
//! - `manager`: creación, ejecución en segundo plano y consultas
//! - `handlers`: endpoints HTTP
//!
//! ## Endpoints
//!
//! - `POST /api/download` - Crear job
//! - `GET /api/jobs/<id>` - Snapshot del job
//! - `DELETE /api/jobs/<id>` - Eliminar job del registro

pub mod handlers;
pub mod manager;
pub mod pool;
pub mod store;
pub mod types;

pub use manager::JobManager;
pub use pool::{WorkerLimits, WorkerPool, DEFAULT_WORKERS, MAX_WORKERS};
pub use store::{InMemoryJobStore, JobStore};
pub use types::{Item, ItemStatus, Job, JobStatus, MediaMode, Outcome};
