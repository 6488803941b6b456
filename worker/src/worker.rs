use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::time::sleep;
use tracing::{info, warn};

use common::{AssignRequest, Assignment, CompletionReport, CoordinatorClient, MapReduceApp};

use crate::config::WorkerConfig;
use crate::executor::{run_map, run_reduce, TaskError};

/// Loop principal del worker, una tarea a la vez:
/// - pide trabajo al coordinador
/// - ejecuta el map o reduce
/// - reporta si salió bien
/// - duerme `poll_interval`
///
/// Devuelve `Ok` sólo cuando el coordinador dice que el job terminó. Si el
/// coordinador no responde, devuelve el error y el proceso debe salir.
pub async fn run<A: MapReduceApp>(app: Arc<A>, config: WorkerConfig) -> Result<()> {
    let client = CoordinatorClient::new(config.endpoint.clone());
    let worker_id = uuid::Uuid::new_v4().to_string();

    info!(
        "worker {} arrancando contra {} (work_dir={})",
        worker_id,
        config.endpoint,
        config.work_dir.display()
    );

    loop {
        let assignment = client
            .assign(&AssignRequest {
                worker_id: worker_id.clone(),
            })
            .await
            .context("coordinador inalcanzable pidiendo tarea")?;

        let Some((kind, index, epoch)) = assignment.task_ref() else {
            if assignment == Assignment::Finished {
                info!("worker {}: el job terminó, saliendo", worker_id);
                return Ok(());
            }
            // Wait: todo en vuelo, volver a preguntar
            sleep(config.poll_interval).await;
            continue;
        };

        info!("worker {}: tengo {} {} (epoch={})", worker_id, kind, index, epoch);

        match execute(app.clone(), &config, assignment).await {
            Ok(()) => {
                let ack = client
                    .report(&CompletionReport { kind, index, epoch })
                    .await
                    .context("coordinador inalcanzable reportando tarea")?;
                if ack.accepted {
                    info!("worker {}: {} {} aceptada", worker_id, kind, index);
                } else {
                    warn!(
                        "worker {}: {} {} llegó tarde, el coordinador la ignoró",
                        worker_id, kind, index
                    );
                }
            }
            Err(e) if e.is_fatal() => {
                return Err(e).with_context(|| format!("{} {} falló sin remedio", kind, index));
            }
            Err(e) => {
                // sin reporte: el monitor del coordinador la reasigna
                warn!("worker {}: {} {} abortada: {}", worker_id, kind, index, e);
            }
        }

        sleep(config.poll_interval).await;
    }
}

/// Corre la tarea en un hilo de bloqueo (I/O de archivos y funciones de usuario).
async fn execute<A: MapReduceApp>(
    app: Arc<A>,
    config: &WorkerConfig,
    assignment: Assignment,
) -> Result<(), TaskError> {
    let work_dir = config.work_dir.clone();

    let handle = tokio::task::spawn_blocking(move || match assignment {
        Assignment::Map {
            index,
            source,
            partitions,
            ..
        } => run_map(app.as_ref(), &work_dir, index, &source, partitions).map(|_| ()),
        Assignment::Reduce {
            index, map_count, ..
        } => run_reduce(app.as_ref(), &work_dir, index, map_count).map(|_| ()),
        Assignment::Wait | Assignment::Finished => Ok(()),
    });

    match handle.await {
        Ok(res) => res,
        Err(e) => {
            // panic en la función de usuario: igual que cualquier falla, sin reporte
            Err(TaskError::Panicked(e.to_string()))
        }
    }
}
