use std::{env, path::PathBuf, time::Duration};

use common::{Endpoint, EndpointError};

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub endpoint: Endpoint,
    /// Donde viven las particiones intermedias y las salidas
    pub work_dir: PathBuf,
    /// Pausa entre pedidos al coordinador
    pub poll_interval: Duration,
}

impl WorkerConfig {
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            work_dir: PathBuf::from("."),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// MR_COORDINATOR, MR_WORK_DIR y MR_POLL_INTERVAL_MS.
    pub fn from_env() -> Result<Self, EndpointError> {
        let mut cfg = Self::new(Endpoint::from_env()?);

        if let Ok(dir) = env::var("MR_WORK_DIR") {
            if !dir.trim().is_empty() {
                cfg.work_dir = PathBuf::from(dir);
            }
        }

        cfg.poll_interval = env::var("MR_POLL_INTERVAL_MS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_POLL_INTERVAL);

        Ok(cfg)
    }
}
