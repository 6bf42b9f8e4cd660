//! REST API for surgeon call scheduling.
//!
//! Provides endpoints for:
//! - Demo data retrieval
//! - Schedule job management (create, get, status, delete)
//! - Synchronous solving and call statistics

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use thiserror::Error;
use tower_http::cors::{Any, CorsLayer};
use tracing::error;

use crate::cp::{MilpSolver, SolverConfig};
use crate::demo_data::{self, DemoData};
use crate::dto::{
    ErrorResponse, HealthResponse, InfoResponse, ScheduleJobDto, ScheduleRequestDto, StatsRequest,
    StatsResponse, StatusResponse,
};
use crate::error::SchedulingError;
use crate::solution::CallSchedule;
use crate::solver::{generate_schedule, JobStatus, SolverService};
use crate::stats::call_stats;

/// Application state shared across handlers.
pub struct AppState {
    pub solver: SolverService,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            solver: SolverService::new(),
        }
    }

    pub fn with_config(config: SolverConfig) -> Self {
        Self {
            solver: SolverService::with_config(config),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors returned by handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Scheduling(#[from] SchedulingError),

    #[error("solver task failed: {0}")]
    Worker(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (code, status) = match &self {
            ApiError::Scheduling(SchedulingError::NoFeasibleSchedule) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                JobStatus::NoFeasibleSchedule.as_str(),
            ),
            ApiError::Scheduling(_) => (StatusCode::BAD_REQUEST, "INVALID_INPUT"),
            ApiError::Worker(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };
        let body = ErrorResponse {
            error: self.to_string(),
            status: status.to_string(),
        };
        (code, Json(body)).into_response()
    }
}

/// Creates the API router with CORS enabled.
pub fn create_router() -> Router {
    router(Arc::new(AppState::new()))
}

/// Creates the API router over existing state.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health & Info
        .route("/health", get(health))
        .route("/info", get(info))
        // Demo data
        .route("/demo-data", get(list_demo_data))
        .route("/demo-data/{id}", get(get_demo_data))
        // Schedules
        .route("/schedules", post(create_schedule).get(list_schedules))
        .route("/schedules/solve", post(solve_schedule))
        .route("/schedules/{id}", get(get_schedule).delete(delete_schedule))
        .route("/schedules/{id}/status", get(get_schedule_status))
        // Statistics
        .route("/stats", post(schedule_stats))
        .layer(cors)
        .with_state(state)
}

/// GET /health - Health check endpoint.
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "UP" })
}

/// GET /info - Application info endpoint.
async fn info() -> Json<InfoResponse> {
    Json(InfoResponse {
        name: "Surgeon Call Scheduling",
        version: env!("CARGO_PKG_VERSION"),
        solver_engine: "MilpSolver",
    })
}

/// GET /demo-data - List available demo data sets.
async fn list_demo_data() -> Json<Vec<&'static str>> {
    Json(demo_data::list_demo_data())
}

/// GET /demo-data/{id} - Get a specific demo data set as a request body.
async fn get_demo_data(Path(id): Path<String>) -> Result<Json<ScheduleRequestDto>, StatusCode> {
    let demo = id.parse::<DemoData>().map_err(|_| StatusCode::NOT_FOUND)?;
    let problem = demo_data::generate(demo).map_err(|e| {
        error!("Demo data {} failed: {}", demo.as_str(), e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    Ok(Json(ScheduleRequestDto::from_problem(&problem)))
}

/// POST /schedules - Validate the request and start solving it.
/// Returns the job ID as plain text.
async fn create_schedule(
    State(state): State<Arc<AppState>>,
    Json(dto): Json<ScheduleRequestDto>,
) -> Result<String, ApiError> {
    let problem = dto.to_problem()?;
    Ok(state.solver.submit(problem)?)
}

/// GET /schedules - List all job IDs.
async fn list_schedules(State(state): State<Arc<AppState>>) -> Json<Vec<String>> {
    Json(state.solver.list_jobs())
}

/// GET /schedules/{id} - Get a job with its schedule, if solved.
async fn get_schedule(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ScheduleJobDto>, StatusCode> {
    match state.solver.get_job(&id) {
        Some(job) => Ok(Json(ScheduleJobDto::from(&*job.read()))),
        None => Err(StatusCode::NOT_FOUND),
    }
}

/// GET /schedules/{id}/status - Get a job's status only.
async fn get_schedule_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<StatusResponse>, StatusCode> {
    match state.solver.get_job(&id) {
        Some(job) => {
            let guard = job.read();
            Ok(Json(StatusResponse {
                cost: guard.schedule.as_ref().map(|s| s.cost),
                status: guard.status.as_str().to_string(),
            }))
        }
        None => Err(StatusCode::NOT_FOUND),
    }
}

/// DELETE /schedules/{id} - Forget a job and return its last state.
async fn delete_schedule(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ScheduleJobDto>, StatusCode> {
    match state.solver.remove_job(&id) {
        Some(job) => Ok(Json(ScheduleJobDto::from(&*job.read()))),
        None => Err(StatusCode::NOT_FOUND),
    }
}

/// POST /schedules/solve - Solve synchronously and return the schedule.
async fn solve_schedule(
    State(state): State<Arc<AppState>>,
    Json(dto): Json<ScheduleRequestDto>,
) -> Result<Json<CallSchedule>, ApiError> {
    let problem = dto.to_problem()?;
    let config = *state.solver.config();
    let schedule = tokio::task::spawn_blocking(move || {
        generate_schedule(&problem, &MilpSolver::new(), &config)
    })
    .await
    .map_err(|e| {
        error!("Solver task failed: {}", e);
        ApiError::Worker(e.to_string())
    })??;
    Ok(Json(schedule))
}

/// POST /stats - Aggregate call statistics over stored schedules.
async fn schedule_stats(Json(request): Json<StatsRequest>) -> Json<StatsResponse> {
    Json(StatsResponse {
        rows: call_stats(&request.schedules),
    })
}
