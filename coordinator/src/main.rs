use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use glob::glob;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use common::{Endpoint, JobStatus};
use coordinator::config::shutdown_grace_from_env;
use coordinator::{server, Coordinator, CoordinatorConfig};

/// Cada cuánto se consulta si el job terminó
const DONE_POLL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Parser)]
#[command(name = "coordinator")]
#[command(about = "Coordinador MapReduce: reparte tareas map/reduce a los workers")]
struct Args {
    /// Archivos de entrada (acepta patrones glob, ej: "data/pg-*.txt")
    #[arg(value_name = "INPUT", required = true)]
    inputs: Vec<String>,

    /// Cantidad de particiones de reduce
    #[arg(short = 'r', long = "reduce", default_value_t = 10)]
    n_reduce: u32,

    /// Dirección donde escuchar (unix:/ruta o host:puerto). Default: MR_COORDINATOR o socket del usuario
    #[arg(long)]
    endpoint: Option<Endpoint>,
}

/// Expande los patrones de entrada, en orden y sin repetidos.
fn expand_inputs(patterns: &[String]) -> Result<Vec<String>> {
    let mut files: Vec<String> = Vec::new();
    for pattern in patterns {
        let entries = glob(pattern).with_context(|| format!("patrón inválido: {}", pattern))?;
        let mut matched = false;
        for entry in entries.flatten() {
            if entry.is_file() {
                matched = true;
                let path = entry.to_string_lossy().to_string();
                if !files.contains(&path) {
                    files.push(path);
                }
            }
        }
        if !matched {
            warn!("el patrón {} no matcheó ningún archivo", pattern);
        }
    }
    Ok(files)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("coordinator=info,tower_http=info")),
        )
        .init();

    let args = Args::parse();
    let endpoint = match args.endpoint {
        Some(e) => e,
        None => Endpoint::from_env()?,
    };

    let files = expand_inputs(&args.inputs)?;
    if files.is_empty() {
        bail!("no hay archivos de entrada");
    }

    let config = CoordinatorConfig::from_env();
    let coordinator = Coordinator::new(files, args.n_reduce, config)?;

    let listener = server::bind(&endpoint).await?;

    let grace = shutdown_grace_from_env();
    let waiter = coordinator.clone();
    let shutdown = async move {
        tokio::select! {
            _ = server::linger_after_finished(waiter, DONE_POLL_INTERVAL, grace) => {
                info!("job terminado, apagando el coordinador");
            }
            _ = tokio::signal::ctrl_c() => {
                warn!("ctrl-c recibido, apagando el coordinador");
            }
        }
    };

    listener.serve(coordinator.clone(), shutdown).await?;

    let progress = coordinator.progress();
    info!(
        "estado final: {:?} (map {}/{}, reduce {}/{}, reasignaciones={})",
        progress.status,
        progress.map_total - progress.map_remaining,
        progress.map_total,
        progress.reduce_total - progress.reduce_remaining,
        progress.reduce_total,
        progress.reassignments
    );

    if progress.status == JobStatus::Failed {
        bail!("el job falló: alguna tarea agotó sus intentos");
    }
    Ok(())
}
