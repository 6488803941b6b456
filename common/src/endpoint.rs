use std::{
    env,
    fmt,
    net::{SocketAddr, ToSocketAddrs},
    path::PathBuf,
    str::FromStr,
};

use thiserror::Error;

/// Variable de entorno con la dirección del coordinador (como MASTER_URL).
pub const COORDINATOR_ENV: &str = "MR_COORDINATOR";

/// Dónde escucha el coordinador.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// Socket Unix local, el modo normal
    Unix(PathBuf),
    Tcp(SocketAddr),
}

#[derive(Debug, Error)]
pub enum EndpointError {
    #[error("dirección vacía")]
    Empty,
    #[error("dirección TCP inválida `{0}`")]
    InvalidTcp(String),
}

impl Endpoint {
    /// Socket propio del usuario que lo invoca, para que jobs de distintos
    /// usuarios en la misma máquina no choquen.
    pub fn local_default() -> Self {
        let user = whoami::username();
        Endpoint::Unix(PathBuf::from(format!(
            "/var/tmp/mr-coordinator-{}.sock",
            sanitize(&user)
        )))
    }

    /// `MR_COORDINATOR` si está definida y es válida; si no, el socket por defecto.
    pub fn from_env() -> Result<Self, EndpointError> {
        match env::var(COORDINATOR_ENV) {
            Ok(raw) if !raw.trim().is_empty() => raw.parse(),
            _ => Ok(Self::local_default()),
        }
    }
}

fn sanitize(user: &str) -> String {
    let cleaned: String = user
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || *c == '-')
        .collect();
    if cleaned.is_empty() {
        "anon".to_string()
    } else {
        cleaned
    }
}

impl FromStr for Endpoint {
    type Err = EndpointError;

    /// Acepta `unix:/ruta`, `tcp://host:puerto`, `http://host:puerto` o `host:puerto`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(EndpointError::Empty);
        }

        if let Some(path) = s.strip_prefix("unix:") {
            let path = path.trim_start_matches("//");
            if path.is_empty() {
                return Err(EndpointError::Empty);
            }
            return Ok(Endpoint::Unix(PathBuf::from(path)));
        }

        let hostport = s
            .strip_prefix("tcp://")
            .or_else(|| s.strip_prefix("http://"))
            .unwrap_or(s)
            .trim_end_matches('/');

        if hostport.starts_with('/') || hostport.starts_with('.') {
            // parece una ruta, la tratamos como socket
            return Ok(Endpoint::Unix(PathBuf::from(hostport)));
        }

        hostport
            .to_socket_addrs()
            .ok()
            .and_then(|mut addrs| addrs.next())
            .map(Endpoint::Tcp)
            .ok_or_else(|| EndpointError::InvalidTcp(hostport.to_string()))
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Unix(path) => write!(f, "unix:{}", path.display()),
            Endpoint::Tcp(addr) => write!(f, "tcp://{}", addr),
        }
    }
}
