use std::{fs, sync::Arc};

use anyhow::{Context, Result};
use tracing::error;
use tracing_subscriber::EnvFilter;

use common::WordCount;
use worker::WorkerConfig;

/// Worker con la aplicación WordCount.
/// - MR_COORDINATOR: dirección del coordinador (default: socket del usuario)
/// - MR_WORK_DIR: directorio de particiones y salidas (default: .)
#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("worker=info")),
        )
        .init();

    let config = WorkerConfig::from_env()?;
    fs::create_dir_all(&config.work_dir)
        .with_context(|| format!("no se pudo crear {}", config.work_dir.display()))?;

    if let Err(e) = worker::run(Arc::new(WordCount), config).await {
        error!("worker terminado: {:#}", e);
        return Err(e);
    }
    Ok(())
}
