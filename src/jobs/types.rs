//! # Tipos del Sistema de Jobs
//! src/jobs/types.rs
//!
//! Define los tipos fundamentales de un lote de descargas: el job,
//! sus items, los estados y el resultado de cada unidad de trabajo.

use serde::{Deserialize, Serialize};

/// Estado de un job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Registrado, el thread de ejecución aún no tocó el job
    Pending,

    /// Items en proceso
    Running,

    /// Todos los items terminaron bien
    Done,

    /// Todos los items terminaron y al menos uno falló
    Error,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Done => "done",
            JobStatus::Error => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Error)
    }
}

/// Estado de un item dentro de un job
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Pending,
    Running,
    Done,
    Error,
}

impl ItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Pending => "pending",
            ItemStatus::Running => "running",
            ItemStatus::Done => "done",
            ItemStatus::Error => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ItemStatus::Done | ItemStatus::Error)
    }

    /// Un item solo avanza `pending -> running -> {done|error}`.
    pub fn can_advance_to(&self, next: ItemStatus) -> bool {
        match self {
            ItemStatus::Pending => next != ItemStatus::Pending,
            ItemStatus::Running => next.is_terminal(),
            ItemStatus::Done | ItemStatus::Error => false,
        }
    }
}

/// Tipo de contenido a descargar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaMode {
    Video,
    Audio,
}

impl MediaMode {
    /// Cualquier valor distinto de `video` se interpreta como audio.
    pub fn from_request_str(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("video") {
            MediaMode::Video
        } else {
            MediaMode::Audio
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaMode::Video => "video",
            MediaMode::Audio => "audio",
        }
    }
}

impl Default for MediaMode {
    fn default() -> Self {
        MediaMode::Video
    }
}

/// Resultado de una unidad de trabajo
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Done,
    Error(String),
}

impl Outcome {
    pub fn status(&self) -> ItemStatus {
        match self {
            Outcome::Done => ItemStatus::Done,
            Outcome::Error(_) => ItemStatus::Error,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Outcome::Done => "",
            Outcome::Error(msg) => msg,
        }
    }
}

impl<E: std::fmt::Display> From<Result<(), E>> for Outcome {
    fn from(result: Result<(), E>) -> Self {
        match result {
            Ok(()) => Outcome::Done,
            Err(e) => Outcome::Error(e.to_string()),
        }
    }
}

/// Un target dentro de un job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Dirección a descargar
    #[serde(rename = "url")]
    pub target: String,

    pub status: ItemStatus,

    /// Vacío salvo que `status == error`
    pub message: String,
}

impl Item {
    pub fn new(target: String) -> Self {
        Self {
            target,
            status: ItemStatus::Pending,
            message: String::new(),
        }
    }

    /// Avanza el estado del item. Retorna false si la transición
    /// retrocedería (el item queda como estaba).
    pub fn advance(&mut self, status: ItemStatus, message: &str) -> bool {
        if !self.status.can_advance_to(status) {
            return false;
        }
        self.status = status;
        self.message = if status == ItemStatus::Error {
            if message.trim().is_empty() {
                "unknown error".to_string()
            } else {
                message.to_string()
            }
        } else {
            String::new()
        };
        true
    }
}

/// Un lote de descargas.
///
/// Los valores de este tipo que salen del store son snapshots: copias
/// tomadas bajo el lock, nunca alias del estado compartido.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub status: JobStatus,
    pub items: Vec<Item>,
    pub workers: usize,
}

impl Job {
    pub fn new(id: String, workers: usize) -> Self {
        Self {
            id,
            status: JobStatus::Pending,
            items: Vec::new(),
            workers,
        }
    }

    /// Pasa a `running` y crea un item `pending` por target, en orden.
    pub fn start(&mut self, targets: &[String]) {
        self.status = JobStatus::Running;
        self.items = targets.iter().cloned().map(Item::new).collect();
    }

    /// Estado final: AND lógico sobre los items.
    ///
    /// Solo tiene sentido cuando todos los items son terminales.
    pub fn finish(&mut self) {
        debug_assert!(self.items.iter().all(|i| i.status.is_terminal()));
        self.status = if self.items.iter().all(|i| i.status == ItemStatus::Done) {
            JobStatus::Done
        } else {
            JobStatus::Error
        };
    }

    pub fn count(&self, status: ItemStatus) -> usize {
        self.items.iter().filter(|i| i.status == status).count()
    }

    /// Items en estado terminal
    pub fn completed(&self) -> usize {
        self.items.iter().filter(|i| i.status.is_terminal()).count()
    }
}
