use std::{env, time::Duration};

pub const DEFAULT_TASK_TIMEOUT: Duration = Duration::from_secs(10);
/// Mayor que varias veces el poll por defecto del worker (1s)
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(3);

#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Cuánto espera el monitor antes de devolver una tarea a IDLE
    pub task_timeout: Duration,
    /// Tope de intentos por tarea. `None` = reintentar para siempre.
    pub max_attempts: Option<u32>,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            task_timeout: DEFAULT_TASK_TIMEOUT,
            max_attempts: None,
        }
    }
}

impl CoordinatorConfig {
    /// Lee MR_TASK_TIMEOUT_SECS y MR_MAX_TASK_ATTEMPTS; lo que falte o no
    /// se pueda parsear queda en el default.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let task_timeout = env::var("MR_TASK_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(defaults.task_timeout);

        let max_attempts = env::var("MR_MAX_TASK_ATTEMPTS")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .filter(|n| *n > 0);

        Self {
            task_timeout,
            max_attempts,
        }
    }
}

/// MR_SHUTDOWN_GRACE_MS: cuánto sigue sirviendo el coordinador después de
/// terminar el job, para que los workers que están entre pedidos reciban
/// `Finished` en lugar de un error de conexión.
pub fn shutdown_grace_from_env() -> Duration {
    env::var("MR_SHUTDOWN_GRACE_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(DEFAULT_SHUTDOWN_GRACE)
}
