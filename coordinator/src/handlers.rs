use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use tower_http::trace::TraceLayer;
use tracing::debug;

use common::protocol::{ASSIGN_PATH, COMPLETE_PATH, ECHO_PATH, HEALTH_PATH, STATUS_PATH};
use common::{
    AssignRequest, Assignment, CompletionAck, CompletionReport, EchoArgs, EchoReply, JobProgress,
};

use crate::state::Coordinator;

pub fn build_router(state: Coordinator) -> Router {
    Router::new()
        .route(HEALTH_PATH, get(health))
        .route(ASSIGN_PATH, post(assign_task))
        .route(COMPLETE_PATH, post(complete_task))
        .route(ECHO_PATH, post(echo))
        .route(STATUS_PATH, get(status))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/* ---------------- handlers HTTP ---------------- */

async fn health() -> &'static str {
    "ok"
}

// Asigna la siguiente tarea IDLE (o Wait / Finished)
async fn assign_task(
    State(state): State<Coordinator>,
    Json(req): Json<AssignRequest>,
) -> Json<Assignment> {
    Json(state.assign_task(&req.worker_id))
}

// Worker reporta que terminó una tarea; los reportes viejos se ignoran
async fn complete_task(
    State(state): State<Coordinator>,
    Json(report): Json<CompletionReport>,
) -> Json<CompletionAck> {
    let accepted = state.report_completion(report);
    Json(CompletionAck { accepted })
}

async fn echo(Json(args): Json<EchoArgs>) -> Json<EchoReply> {
    debug!("echo x={}", args.x);
    Json(EchoReply {
        y: args.x.wrapping_add(1),
    })
}

async fn status(State(state): State<Coordinator>) -> Json<JobProgress> {
    Json(state.progress())
}
