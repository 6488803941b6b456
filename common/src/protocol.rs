use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type WorkerId = String;

/* --------- Rutas HTTP compartidas entre coordinador y workers --------- */

pub const HEALTH_PATH: &str = "/health";
pub const ASSIGN_PATH: &str = "/rpc/assign";
pub const COMPLETE_PATH: &str = "/rpc/complete";
pub const ECHO_PATH: &str = "/rpc/echo";
pub const STATUS_PATH: &str = "/rpc/status";

/* --------- Tareas --------- */

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    Map,
    Reduce,
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskKind::Map => f.write_str("map"),
            TaskKind::Reduce => f.write_str("reduce"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignRequest {
    /// Sólo para logs del coordinador
    pub worker_id: WorkerId,
}

/// Respuesta a una petición de trabajo.
///
/// `Wait` y `Finished` son distintos a propósito: con `Wait` el worker
/// duerme y vuelve a preguntar, sólo con `Finished` sale del loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Assignment {
    Map {
        index: u32,
        epoch: u64,
        /// Archivo de entrada de esta tarea
        source: String,
        /// Cantidad de buckets de reduce (nReduce)
        partitions: u32,
    },
    Reduce {
        index: u32,
        epoch: u64,
        /// Cantidad de tareas map, una partición intermedia por cada una
        map_count: u32,
    },
    Wait,
    Finished,
}

impl Assignment {
    /// (kind, index, epoch) si es una tarea real.
    pub fn task_ref(&self) -> Option<(TaskKind, u32, u64)> {
        match self {
            Assignment::Map { index, epoch, .. } => Some((TaskKind::Map, *index, *epoch)),
            Assignment::Reduce { index, epoch, .. } => Some((TaskKind::Reduce, *index, *epoch)),
            Assignment::Wait | Assignment::Finished => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionReport {
    pub kind: TaskKind,
    pub index: u32,
    pub epoch: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionAck {
    /// false si el reporte llegó tarde o es de un intento viejo
    pub accepted: bool,
}

/* --------- Diagnóstico --------- */

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EchoArgs {
    pub x: i64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EchoReply {
    pub y: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Running,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobProgress {
    pub status: JobStatus,
    pub map_total: u32,
    pub map_remaining: u32,
    pub reduce_total: u32,
    pub reduce_remaining: u32,
    /// Veces que el monitor devolvió una tarea a IDLE
    pub reassignments: u64,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}
