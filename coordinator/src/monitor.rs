use tokio::time::sleep;
use tracing::{debug, info, warn};

use common::TaskKind;

use crate::state::{lock, Coordinator, TaskStatus};

/// Qué hizo el monitor al despertar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiry {
    /// La tarea ya estaba completa
    Completed,
    /// Otro intento (epoch distinto) ya es el dueño; nada que hacer
    Superseded,
    /// Volvió a IDLE para reasignarse
    Requeued,
    /// Agotó los intentos; el job queda FAILED
    Exhausted,
}

/// Lanza el monitor de una asignación. Duerme el timeout completo y después
/// revisa la tarea una sola vez, identificada por (kind, index, epoch).
pub fn spawn(coordinator: Coordinator, kind: TaskKind, index: u32, epoch: u64) {
    let timeout = coordinator.config.task_timeout;
    tokio::spawn(async move {
        sleep(timeout).await;
        let outcome = coordinator.expire(kind, index, epoch);
        debug!("monitor de {} {} (epoch={}): {:?}", kind, index, epoch, outcome);
    });
}

impl Coordinator {
    pub(crate) fn expire(&self, kind: TaskKind, index: u32, epoch: u64) -> Expiry {
        let Some(slot) = self.tasks(kind).get(index as usize) else {
            return Expiry::Superseded;
        };
        let mut record = lock(slot);

        if record.status == TaskStatus::Completed {
            info!("{} {} completada a tiempo", kind, index);
            return Expiry::Completed;
        }

        if record.epoch != epoch || record.status != TaskStatus::InProgress {
            return Expiry::Superseded;
        }

        let mut counters = lock(&self.counters);

        if let Some(max) = self.config.max_attempts {
            if record.attempts >= max {
                record.status = TaskStatus::Failed;
                counters.failed = true;
                counters.finished_at = Some(chrono::Utc::now());
                warn!(
                    "{} {} superó el máximo de intentos ({}), marcando job como FAILED",
                    kind, index, max
                );
                return Expiry::Exhausted;
            }
        }

        record.status = TaskStatus::Idle;
        counters.reassignments += 1;
        warn!(
            "{} {} sin reporte tras {:?} (epoch={}, intento {}), se reasigna a otro worker",
            kind, index, self.config.task_timeout, epoch, record.attempts
        );
        Expiry::Requeued
    }
}
