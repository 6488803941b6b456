use std::{future::Future, io, path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use tokio::net::{TcpListener, UnixListener};
use tracing::{info, warn};

use common::Endpoint;

use crate::handlers::build_router;
use crate::state::Coordinator;

/// Listener ya abierto. Separado de `serve` para que quien lo crea sepa que
/// los workers ya pueden conectarse.
pub enum BoundListener {
    Unix { listener: UnixListener, path: PathBuf },
    Tcp(TcpListener),
}

pub async fn bind(endpoint: &Endpoint) -> Result<BoundListener> {
    match endpoint {
        Endpoint::Unix(path) => {
            // socket de una corrida anterior
            match std::fs::remove_file(path) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(e).with_context(|| {
                        format!("no se pudo borrar el socket viejo {}", path.display())
                    })
                }
            }
            let listener = UnixListener::bind(path)
                .with_context(|| format!("no se pudo escuchar en {}", path.display()))?;
            Ok(BoundListener::Unix {
                listener,
                path: path.clone(),
            })
        }
        Endpoint::Tcp(addr) => {
            let listener = TcpListener::bind(addr)
                .await
                .with_context(|| format!("no se pudo escuchar en {}", addr))?;
            Ok(BoundListener::Tcp(listener))
        }
    }
}

impl BoundListener {
    pub fn endpoint(&self) -> Result<Endpoint> {
        match self {
            BoundListener::Unix { path, .. } => Ok(Endpoint::Unix(path.clone())),
            BoundListener::Tcp(l) => Ok(Endpoint::Tcp(l.local_addr()?)),
        }
    }

    /// Sirve hasta que `shutdown` se resuelva.
    pub async fn serve<F>(self, coordinator: Coordinator, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = build_router(coordinator);
        match self {
            BoundListener::Unix { listener, path } => {
                info!("coordinador escuchando en unix:{}", path.display());
                let res = axum::serve(listener, app)
                    .with_graceful_shutdown(shutdown)
                    .await;
                if let Err(e) = std::fs::remove_file(&path) {
                    warn!("no se pudo borrar {}: {:?}", path.display(), e);
                }
                res.context("error sirviendo en el socket unix")
            }
            BoundListener::Tcp(listener) => {
                info!("coordinador escuchando en {}", listener.local_addr()?);
                axum::serve(listener, app)
                    .with_graceful_shutdown(shutdown)
                    .await
                    .context("error sirviendo en TCP")
            }
        }
    }
}

/// Se resuelve cuando el job terminó (bien o mal), consultando cada `every`.
pub async fn wait_until_finished(coordinator: Coordinator, every: Duration) {
    loop {
        if coordinator.finished() {
            return;
        }
        tokio::time::sleep(every).await;
    }
}

/// Como `wait_until_finished`, pero sigue sirviendo `grace` más: los workers
/// que estaban durmiendo entre pedidos alcanzan a recibir `Finished`.
pub async fn linger_after_finished(coordinator: Coordinator, every: Duration, grace: Duration) {
    wait_until_finished(coordinator, every).await;
    info!("job terminado, sirviendo {:?} más para avisar a los workers", grace);
    tokio::time::sleep(grace).await;
}
