// coordinator/src/state.rs

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use common::{Assignment, CompletionReport, JobProgress, JobStatus, TaskKind};

use crate::config::CoordinatorConfig;
use crate::monitor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Idle,
    InProgress,
    Completed,
    /// Sólo con tope de intentos configurado
    Failed,
}

/// Una tarea map o reduce. El tipo lo da la colección que la contiene y el
/// índice dentro de ella es su id estable.
#[derive(Debug, Clone)]
pub struct TaskRecord {
    pub status: TaskStatus,
    /// Archivo de entrada (sólo map)
    pub source: Option<String>,
    /// Se estampa en cada transición IDLE -> IN_PROGRESS
    pub assigned_at: Option<Instant>,
    /// Sube en cada asignación; identifica el intento vigente
    pub epoch: u64,
    pub attempts: u32,
}

impl TaskRecord {
    fn new(source: Option<String>) -> Self {
        Self {
            status: TaskStatus::Idle,
            source,
            assigned_at: None,
            epoch: 0,
            attempts: 0,
        }
    }
}

#[derive(Debug)]
pub(crate) struct Counters {
    pub map_remaining: u32,
    pub reduce_remaining: u32,
    pub reassignments: u64,
    pub failed: bool,
    pub finished_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("la cantidad de particiones de reduce debe ser > 0")]
    NoPartitions,
    #[error("demasiadas tareas ({0})")]
    TooManyTasks(usize),
}

/// Estado del coordinador. Clonarlo es barato: todo vive detrás de `Arc`.
///
/// Cada tarea tiene su propio lock; los contadores tienen otro. El orden es
/// siempre tarea -> contadores, nunca al revés.
#[derive(Clone)]
pub struct Coordinator {
    pub(crate) map_tasks: Arc<Vec<Mutex<TaskRecord>>>,
    pub(crate) reduce_tasks: Arc<Vec<Mutex<TaskRecord>>>,
    pub(crate) counters: Arc<Mutex<Counters>>,
    pub(crate) config: CoordinatorConfig,
    started_at: DateTime<Utc>,
}

/// Lock que sobrevive a un panic de otro hilo.
pub(crate) fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

struct Claim {
    index: u32,
    epoch: u64,
    source: Option<String>,
}

impl Coordinator {
    /// Una tarea map por archivo y `n_reduce` tareas reduce.
    pub fn new(
        files: Vec<String>,
        n_reduce: u32,
        config: CoordinatorConfig,
    ) -> Result<Self, CoordinatorError> {
        if n_reduce == 0 {
            return Err(CoordinatorError::NoPartitions);
        }
        let map_count =
            u32::try_from(files.len()).map_err(|_| CoordinatorError::TooManyTasks(files.len()))?;

        let map_tasks: Vec<Mutex<TaskRecord>> = files
            .into_iter()
            .map(|f| Mutex::new(TaskRecord::new(Some(f))))
            .collect();
        let reduce_tasks: Vec<Mutex<TaskRecord>> = (0..n_reduce)
            .map(|_| Mutex::new(TaskRecord::new(None)))
            .collect();

        info!(
            "coordinador inicializado: {} tareas map, {} tareas reduce, timeout {:?}",
            map_count, n_reduce, config.task_timeout
        );

        Ok(Self {
            map_tasks: Arc::new(map_tasks),
            reduce_tasks: Arc::new(reduce_tasks),
            counters: Arc::new(Mutex::new(Counters {
                map_remaining: map_count,
                reduce_remaining: n_reduce,
                reassignments: 0,
                failed: false,
                finished_at: None,
            })),
            config,
            started_at: Utc::now(),
        })
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    pub(crate) fn tasks(&self, kind: TaskKind) -> &[Mutex<TaskRecord>] {
        match kind {
            TaskKind::Map => &self.map_tasks,
            TaskKind::Reduce => &self.reduce_tasks,
        }
    }

    /// Copia del estado de una tarea (para diagnóstico y tests).
    pub fn task(&self, kind: TaskKind, index: u32) -> Option<TaskRecord> {
        self.tasks(kind)
            .get(index as usize)
            .map(|slot| lock(slot).clone())
    }

    /// Entrega la primera tarea IDLE de la fase actual.
    ///
    /// Mientras queden maps sólo se reparten maps; los reduce recién salen
    /// cuando existen todas las particiones intermedias.
    pub fn assign_task(&self, worker_id: &str) -> Assignment {
        let (map_remaining, reduce_remaining, failed) = {
            let c = lock(&self.counters);
            (c.map_remaining, c.reduce_remaining, c.failed)
        };

        if failed {
            return Assignment::Finished;
        }

        if map_remaining > 0 {
            return match self.claim_idle(TaskKind::Map) {
                Some(claim) => {
                    let source = claim.source.unwrap_or_default();
                    info!(
                        "asignando map {} (epoch={}, input={}) al worker {}",
                        claim.index, claim.epoch, source, worker_id
                    );
                    Assignment::Map {
                        index: claim.index,
                        epoch: claim.epoch,
                        source,
                        partitions: self.reduce_tasks.len() as u32,
                    }
                }
                None => {
                    debug!("worker {} pidió tarea pero todos los map están en vuelo", worker_id);
                    Assignment::Wait
                }
            };
        }

        if reduce_remaining > 0 {
            return match self.claim_idle(TaskKind::Reduce) {
                Some(claim) => {
                    info!(
                        "asignando reduce {} (epoch={}) al worker {}",
                        claim.index, claim.epoch, worker_id
                    );
                    Assignment::Reduce {
                        index: claim.index,
                        epoch: claim.epoch,
                        map_count: self.map_tasks.len() as u32,
                    }
                }
                None => {
                    debug!("worker {} pidió tarea pero todos los reduce están en vuelo", worker_id);
                    Assignment::Wait
                }
            };
        }

        Assignment::Finished
    }

    /// Recorre las tareas de a una, con un solo lock tomado a la vez.
    fn claim_idle(&self, kind: TaskKind) -> Option<Claim> {
        for (index, slot) in self.tasks(kind).iter().enumerate() {
            let mut record = lock(slot);
            if record.status != TaskStatus::Idle {
                continue;
            }

            record.status = TaskStatus::InProgress;
            record.assigned_at = Some(Instant::now());
            record.epoch += 1;
            record.attempts += 1;

            let claim = Claim {
                index: index as u32,
                epoch: record.epoch,
                source: record.source.clone(),
            };
            drop(record);

            monitor::spawn(self.clone(), kind, claim.index, claim.epoch);
            return Some(claim);
        }
        None
    }

    /// Registra el fin de una tarea. Devuelve `true` si se aceptó.
    ///
    /// Se acepta sólo si la tarea sigue IN_PROGRESS con el mismo epoch y antes
    /// de `assigned_at + timeout`. Cualquier otro reporte se ignora en
    /// silencio: el contador baja una sola vez por tarea.
    pub fn report_completion(&self, report: CompletionReport) -> bool {
        let Some(slot) = self.tasks(report.kind).get(report.index as usize) else {
            warn!(
                "reporte de {} {} fuera de rango, ignorado",
                report.kind, report.index
            );
            return false;
        };

        let mut record = lock(slot);

        if record.status == TaskStatus::Completed {
            debug!(
                "reporte duplicado de {} {} (epoch={}), ya estaba completa",
                report.kind, report.index, report.epoch
            );
            return false;
        }

        if record.status != TaskStatus::InProgress || record.epoch != report.epoch {
            info!(
                "reporte viejo de {} {} (epoch={}, vigente={}, estado={:?}), ignorado",
                report.kind, report.index, report.epoch, record.epoch, record.status
            );
            return false;
        }

        let now = Instant::now();
        let in_time = record
            .assigned_at
            .map(|t| now < t + self.config.task_timeout)
            .unwrap_or(false);
        if !in_time {
            info!(
                "reporte de {} {} llegó después del timeout, ignorado",
                report.kind, report.index
            );
            return false;
        }

        record.status = TaskStatus::Completed;

        let mut counters = lock(&self.counters);
        match report.kind {
            TaskKind::Map => counters.map_remaining = counters.map_remaining.saturating_sub(1),
            TaskKind::Reduce => {
                counters.reduce_remaining = counters.reduce_remaining.saturating_sub(1)
            }
        }
        if counters.map_remaining == 0 && counters.reduce_remaining == 0 {
            counters.finished_at = Some(Utc::now());
            info!("todas las tareas completadas, job terminado");
        }

        info!(
            "{} {} completada (epoch={}); quedan map={} reduce={}",
            report.kind, report.index, report.epoch, counters.map_remaining, counters.reduce_remaining
        );
        true
    }

    /// true cuando no queda ninguna tarea map ni reduce.
    pub fn done(&self) -> bool {
        let c = lock(&self.counters);
        c.map_remaining == 0 && c.reduce_remaining == 0
    }

    /// Alguna tarea agotó sus intentos.
    pub fn failed(&self) -> bool {
        lock(&self.counters).failed
    }

    /// Terminó bien o mal; el bootstrap deja de servir.
    pub fn finished(&self) -> bool {
        let c = lock(&self.counters);
        c.failed || (c.map_remaining == 0 && c.reduce_remaining == 0)
    }

    pub fn progress(&self) -> JobProgress {
        let c = lock(&self.counters);
        let status = if c.failed {
            JobStatus::Failed
        } else if c.map_remaining == 0 && c.reduce_remaining == 0 {
            JobStatus::Succeeded
        } else {
            JobStatus::Running
        };

        JobProgress {
            status,
            map_total: self.map_tasks.len() as u32,
            map_remaining: c.map_remaining,
            reduce_total: self.reduce_tasks.len() as u32,
            reduce_remaining: c.reduce_remaining,
            reassignments: c.reassignments,
            started_at: self.started_at,
            finished_at: c.finished_at,
        }
    }
}
