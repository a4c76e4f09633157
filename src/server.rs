use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use log::{error, info};
use std::sync::Arc;

use crate::config::{Settings, SolvePolicy};
use crate::data::{TimetableRequest, TimetableResponse};
use crate::highs::HighsSolver;
use crate::solver;

#[derive(Debug, Clone)]
struct AppState {
    policy: Arc<SolvePolicy>,
}

async fn solve_handler(
    State(state): State<AppState>,
    Json(input): Json<TimetableRequest>,
) -> Result<Json<TimetableResponse>, (StatusCode, String)> {
    info!("Finding a timetable for {} classes", input.period_info.len());
    let policy = Arc::clone(&state.policy);
    // the solve blocks; keep it off the async workers
    let result = tokio::task::spawn_blocking(move || {
        let highs = HighsSolver::with_time_limit(policy.time_limit());
        solver::solve(&input, &policy, &highs)
    })
    .await;

    match result {
        Ok(Ok(output)) => Ok(Json(output)),
        Ok(Err(e)) => Err((StatusCode::BAD_REQUEST, e.to_string())),
        Err(e) => {
            error!("Timetable task failed: {}", e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                "An error occurred when handling the request.".to_string(),
            ))
        }
    }
}

async fn health() -> &'static str {
    "ok"
}

pub fn router(policy: SolvePolicy) -> Router {
    Router::new()
        .route("/v1/timetable/solve", post(solve_handler))
        .route("/health", get(health))
        .with_state(AppState {
            policy: Arc::new(policy),
        })
}

pub async fn run_server(settings: Settings) -> std::io::Result<()> {
    let app = router(settings.policy.clone());

    let listener = tokio::net::TcpListener::bind(settings.bind_address()).await?;

    info!("Autotimetabling server running at http://{}", listener.local_addr()?);

    axum::serve(listener, app).await
}
