use std::{path::Path, time::Duration};

use bytes::Bytes;
use http::{header, Method, Request};
use http_body_util::{BodyExt, Full};
use hyper_util::rt::TokioIo;
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tokio::net::UnixStream;
use tracing::debug;

use crate::endpoint::Endpoint;
use crate::protocol::{
    AssignRequest, Assignment, CompletionAck, CompletionReport, EchoArgs, EchoReply, JobProgress,
    ASSIGN_PATH, COMPLETE_PATH, ECHO_PATH, HEALTH_PATH, STATUS_PATH,
};

/// Cualquier falla hablando con el coordinador. Para el worker todas son
/// fatales: sin coordinador no hay forma de avanzar.
#[derive(Debug, Error)]
pub enum RpcError {
    #[error("no se pudo conectar a {endpoint}")]
    Connect {
        endpoint: String,
        #[source]
        source: std::io::Error,
    },
    #[error("error HTTP: {0}")]
    Http(#[from] reqwest::Error),
    #[error("error en la conexión: {0}")]
    Hyper(#[from] hyper::Error),
    #[error("petición mal formada: {0}")]
    Request(#[from] http::Error),
    #[error("el coordinador respondió {0}")]
    Status(u16),
    #[error("cuerpo JSON inválido: {0}")]
    Codec(#[from] serde_json::Error),
}

/// Cliente del coordinador. Abre una conexión por llamada y la cierra al
/// terminar, igual sobre socket Unix o TCP.
#[derive(Debug, Clone)]
pub struct CoordinatorClient {
    endpoint: Endpoint,
    http: reqwest::Client,
}

impl CoordinatorClient {
    pub fn new(endpoint: Endpoint) -> Self {
        // sin pool: cada llamada es su propia conexión
        let http = reqwest::Client::builder()
            .pool_max_idle_per_host(0)
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();
        Self { endpoint, http }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub async fn assign(&self, req: &AssignRequest) -> Result<Assignment, RpcError> {
        self.call(Method::POST, ASSIGN_PATH, Some(req)).await
    }

    pub async fn report(&self, report: &CompletionReport) -> Result<CompletionAck, RpcError> {
        self.call(Method::POST, COMPLETE_PATH, Some(report)).await
    }

    /// Llamada de prueba: devuelve x+1.
    pub async fn echo(&self, x: i64) -> Result<i64, RpcError> {
        let reply: EchoReply = self
            .call(Method::POST, ECHO_PATH, Some(&EchoArgs { x }))
            .await?;
        Ok(reply.y)
    }

    pub async fn status(&self) -> Result<JobProgress, RpcError> {
        self.call::<(), _>(Method::GET, STATUS_PATH, None).await
    }

    pub async fn health(&self) -> Result<String, RpcError> {
        self.call::<(), _>(Method::GET, HEALTH_PATH, None).await
    }

    async fn call<Req, Resp>(
        &self,
        method: Method,
        path: &str,
        body: Option<&Req>,
    ) -> Result<Resp, RpcError>
    where
        Req: Serialize,
        Resp: DeserializeOwned,
    {
        let payload = match body {
            Some(b) => serde_json::to_vec(b)?,
            None => Vec::new(),
        };

        let raw = match &self.endpoint {
            Endpoint::Unix(socket) => unix_call(socket, method, path, payload).await?,
            Endpoint::Tcp(addr) => {
                let url = format!("http://{}{}", addr, path);
                let mut builder = self.http.request(method, &url);
                if body.is_some() {
                    builder = builder
                        .header(header::CONTENT_TYPE, "application/json")
                        .body(payload);
                }
                let resp = builder.send().await?;
                if !resp.status().is_success() {
                    return Err(RpcError::Status(resp.status().as_u16()));
                }
                resp.bytes().await?
            }
        };

        decode_body(&raw)
    }
}

/// `/health` responde texto plano; el resto es JSON.
fn decode_body<Resp: DeserializeOwned>(raw: &[u8]) -> Result<Resp, RpcError> {
    match serde_json::from_slice(raw) {
        Ok(v) => Ok(v),
        Err(e) => {
            let text = String::from_utf8_lossy(raw);
            serde_json::from_value(serde_json::Value::String(text.into_owned())).map_err(|_| e.into())
        }
    }
}

async fn unix_call(
    socket: &Path,
    method: Method,
    path: &str,
    payload: Vec<u8>,
) -> Result<Bytes, RpcError> {
    let stream = UnixStream::connect(socket)
        .await
        .map_err(|source| RpcError::Connect {
            endpoint: format!("unix:{}", socket.display()),
            source,
        })?;

    let (mut sender, conn) = hyper::client::conn::http1::handshake(TokioIo::new(stream)).await?;
    // la conexión vive sólo mientras dura esta llamada
    let conn_task = tokio::spawn(async move {
        if let Err(e) = conn.await {
            debug!("conexión unix cerrada con error: {:?}", e);
        }
    });

    let mut builder = Request::builder()
        .method(method)
        .uri(path)
        .header(header::HOST, "localhost");
    if !payload.is_empty() {
        builder = builder.header(header::CONTENT_TYPE, "application/json");
    }
    let req = builder.body(Full::new(Bytes::from(payload)))?;

    let resp = sender.send_request(req).await?;
    let status = resp.status();
    let body = resp.into_body().collect().await?.to_bytes();

    drop(sender);
    conn_task.abort();

    if !status.is_success() {
        return Err(RpcError::Status(status.as_u16()));
    }
    Ok(body)
}
