//! HTTP handlers for the dashboard API

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, warn};

use super::state::{AppState, RefreshSummary};
use crate::catalog::{AgentKey, SubmissionRecord};
use crate::error::BoardError;
use crate::leaderboard::chart::{scatter, ScatterChart};
use crate::leaderboard::{
    build_leaderboard, LeaderboardQuery, LeaderboardRow, SortDirection, SortKey, SubmissionFilter,
};
use crate::trajectory::{
    load_trajectory, resolve_trajectories, ResolvedTrajectory, Task, TrajectoryDocument,
    TrajectoryRequest,
};
use crate::view::{paginate, FormattedMessage, Page};

/// JSON error body with the status it maps to
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    retryable: bool,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
            retryable: false,
        }
    }

    fn not_found(what: impl Into<String>) -> Self {
        BoardError::NotFound(what.into()).into()
    }
}

impl From<BoardError> for ApiError {
    fn from(err: BoardError) -> Self {
        let status = match &err {
            BoardError::NotFound(_) => StatusCode::NOT_FOUND,
            BoardError::InvalidPage { .. } => StatusCode::BAD_REQUEST,
            BoardError::UnresolvedTrajectoryRef(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_GATEWAY,
        };
        if status.is_server_error() {
            error!("Request failed: {}", err);
        }
        Self {
            status,
            message: err.to_string(),
            retryable: err.is_retryable(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({
            "error": self.message,
            "retryable": self.retryable,
        }));
        (self.status, body).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

/// Query parameters for the leaderboard and the chart
#[derive(Debug, Default, Deserialize)]
pub struct LeaderboardParams {
    pub include_standard: Option<bool>,
    pub include_custom: Option<bool>,
    /// Sort column, e.g. `funcpass1` or `agent_framework`
    pub sort: Option<String>,
    /// `asc` or `desc`
    pub direction: Option<String>,
}

impl LeaderboardParams {
    fn filter(&self) -> SubmissionFilter {
        let default = SubmissionFilter::default();
        SubmissionFilter {
            include_standard: self.include_standard.unwrap_or(default.include_standard),
            include_custom: self.include_custom.unwrap_or(default.include_custom),
        }
    }

    fn query(&self) -> Result<LeaderboardQuery, ApiError> {
        let sort = match &self.sort {
            Some(s) => s.parse::<SortKey>().map_err(ApiError::bad_request)?,
            None => SortKey::default(),
        };
        let direction = match &self.direction {
            Some(d) => d.parse::<SortDirection>().map_err(ApiError::bad_request)?,
            None => SortDirection::default(),
        };
        Ok(LeaderboardQuery {
            filter: self.filter(),
            sort,
            direction,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct LeaderboardResponse {
    /// False when every submission type is switched off; clients should
    /// prompt for a filter instead of showing an empty table
    pub filter_selected: bool,
    pub sort: SortKey,
    pub direction: SortDirection,
    pub rows: Vec<LeaderboardRow>,
}

/// Entry of the submission browser
#[derive(Debug, Serialize)]
pub struct SubmissionSummary {
    pub agent_key: AgentKey,
    pub submission_dir: String,
    pub model_name: String,
    pub agent_framework: Option<String>,
    pub is_new: bool,
    pub trajectories_available: bool,
}

impl From<&SubmissionRecord> for SubmissionSummary {
    fn from(record: &SubmissionRecord) -> Self {
        Self {
            agent_key: record.submission.agent_key(),
            submission_dir: record.submission_dir.clone(),
            model_name: record.submission.model_name.clone(),
            agent_framework: record.submission.agent_framework().map(str::to_string),
            is_new: record.submission.is_new,
            trajectories_available: record.submission.trajectories_available,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct TrajectoryParams {
    /// Domain recorded on created tasks
    pub domain: Option<String>,
    pub page: Option<usize>,
    pub page_size: Option<usize>,
}

/// One simulation with a page of its messages
#[derive(Debug, Serialize)]
pub struct SimulationView {
    pub id: String,
    pub task_id: String,
    pub trial: u32,
    pub task: Option<Task>,
    pub duration: Option<f64>,
    pub termination_reason: Option<String>,
    pub agent_cost: Option<f64>,
    pub correct: bool,
    pub correct_secure: bool,
    pub messages: Page<FormattedMessage>,
}

// ============================================================================
// Leaderboard
// ============================================================================

/// Filtered, sorted and ranked leaderboard
pub async fn api_leaderboard(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LeaderboardParams>,
) -> ApiResult<LeaderboardResponse> {
    let query = params.query()?;
    let catalog = state.catalog().await?;

    Ok(Json(LeaderboardResponse {
        filter_selected: !query.filter.is_empty(),
        sort: query.sort,
        direction: query.direction,
        rows: build_leaderboard(&catalog.metrics, &query),
    }))
}

/// Scatter data for the FuncPass@1 / SecPass@1 chart
pub async fn api_leaderboard_chart(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LeaderboardParams>,
) -> ApiResult<ScatterChart> {
    let catalog = state.catalog().await?;
    Ok(Json(scatter(
        &catalog.metrics,
        &params.filter(),
        &state.config.model_colors,
    )))
}

// ============================================================================
// Submissions
// ============================================================================

/// Submissions in browse order
pub async fn api_list_submissions(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Vec<SubmissionSummary>> {
    let catalog = state.catalog().await?;
    Ok(Json(
        catalog
            .browse_order()
            .into_iter()
            .map(SubmissionSummary::from)
            .collect(),
    ))
}

/// Full submission document
pub async fn api_get_submission(
    State(state): State<Arc<AppState>>,
    Path(agent_key): Path<String>,
) -> ApiResult<SubmissionRecord> {
    let catalog = state.catalog().await?;
    catalog
        .get(&AgentKey::from(agent_key.as_str()))
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("submission {}", agent_key)))
}

/// Transcript files published by a submission
pub async fn api_submission_trajectories(
    State(state): State<Arc<AppState>>,
    Path(agent_key): Path<String>,
) -> ApiResult<Vec<ResolvedTrajectory>> {
    let catalog = state.catalog().await?;
    let record = catalog
        .get(&AgentKey::from(agent_key.as_str()))
        .ok_or_else(|| ApiError::not_found(format!("submission {}", agent_key)))?;

    let resolved = resolve_trajectories(
        state.source.as_ref(),
        record,
        &state.config.patterns,
        &state.config.domains,
        &state.config.submissions_dir,
    )
    .await;
    Ok(Json(resolved))
}

// ============================================================================
// Trajectories
// ============================================================================

async fn load_document(
    state: &AppState,
    submission_dir: &str,
    file: &str,
    domain: Option<&str>,
) -> Result<TrajectoryDocument, ApiError> {
    let dataset = state.dataset_for_enrichment().await;
    let request = TrajectoryRequest {
        submissions_dir: &state.config.submissions_dir,
        submission_dir,
        file,
        domain: domain.unwrap_or_else(|| state.config.default_domain()),
    };
    Ok(load_trajectory(state.source.as_ref(), &request, dataset.as_deref()).await?)
}

/// Normalized trajectory document
pub async fn api_get_trajectory(
    State(state): State<Arc<AppState>>,
    Path((submission_dir, file)): Path<(String, String)>,
    Query(params): Query<TrajectoryParams>,
) -> ApiResult<TrajectoryDocument> {
    load_document(&state, &submission_dir, &file, params.domain.as_deref())
        .await
        .map(Json)
}

/// One simulation with paginated messages
pub async fn api_get_simulation(
    State(state): State<Arc<AppState>>,
    Path((submission_dir, file, simulation_id)): Path<(String, String, String)>,
    Query(params): Query<TrajectoryParams>,
) -> ApiResult<SimulationView> {
    let doc = load_document(&state, &submission_dir, &file, params.domain.as_deref()).await?;
    let simulation = doc
        .simulation(&simulation_id)
        .ok_or_else(|| ApiError::not_found(format!("simulation {}", simulation_id)))?;

    let page = params.page.unwrap_or(1);
    let page_size = params.page_size.unwrap_or(state.config.page_size);
    let messages = paginate(simulation, page, page_size)?;

    let task = doc.task(&simulation.task_id).cloned();
    if task.is_none() {
        warn!("Simulation {} refers to unknown task {}", simulation.id, simulation.task_id);
    }

    Ok(Json(SimulationView {
        id: simulation.id.clone(),
        task_id: simulation.task_id.clone(),
        trial: simulation.trial,
        task,
        duration: simulation.duration,
        termination_reason: simulation.termination_reason.clone(),
        agent_cost: simulation.agent_cost,
        correct: simulation.is_correct(),
        correct_secure: simulation.is_correct_secure(),
        messages,
    }))
}

// ============================================================================
// Tasks and maintenance
// ============================================================================

/// Benchmark tasks from the dataset
pub async fn api_list_tasks(State(state): State<Arc<AppState>>) -> ApiResult<Vec<Task>> {
    let dataset = state.dataset().await?;
    Ok(Json(dataset.tasks(state.config.default_domain())))
}

/// Reload catalog and dataset from the source
pub async fn api_refresh(State(state): State<Arc<AppState>>) -> ApiResult<RefreshSummary> {
    Ok(Json(state.refresh().await?))
}

/// Health check endpoint
pub async fn health(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "susvibes-board",
        "source": state.source.describe(),
        "catalog_generation": state.catalog.generation().await,
    }))
}
