use crate::AppState;
use crate::policy::{AnalysisUnavailable, EscalationMode};
use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use common::models::{AgentAnalysisResponse, AnalysisRecord, CodeUpdateRequest, TutorResponse};
use log::{debug, error};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

pub const CODE_UPDATE_MODE: EscalationMode = EscalationMode::Always;
pub const AGENT_MODE: EscalationMode = EscalationMode::GatedOnConceptualIssue;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub code: u16,
    pub message: String,
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("invalid request body: {0}")]
    InvalidBody(#[from] JsonRejection),
    #[error("analysis task was cancelled")]
    Cancelled,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::InvalidBody(rejection) => (rejection.status(), rejection.body_text()),
            ApiError::Cancelled => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "an error occurred while processing the submission".to_string(),
            ),
        };
        (
            status,
            Json(ErrorResponse {
                code: status.as_u16(),
                message,
            }),
        )
            .into_response()
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct EscalationModes {
    pub code_update: EscalationMode,
    pub agent: EscalationMode,
}

const ESCALATION_MODES: EscalationModes = EscalationModes {
    code_update: CODE_UPDATE_MODE,
    agent: AGENT_MODE,
};

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ServiceInfo {
    pub message: &'static str,
    pub status: &'static str,
    pub version: &'static str,
    pub escalation: EscalationModes,
}

#[utoipa::path(get, path = "/", responses((status = OK, body = ServiceInfo)), description = "Service information")]
pub async fn root() -> Json<ServiceInfo> {
    Json(ServiceInfo {
        message: "Socratic code tutor",
        status: "active",
        version: env!("CARGO_PKG_VERSION"),
        escalation: ESCALATION_MODES,
    })
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ServiceStatus {
    pub code_analyzer: &'static str,
    pub llm_service: &'static str,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
    pub services: ServiceStatus,
    pub escalation: EscalationModes,
}

#[utoipa::path(get, path = "/health", responses((status = OK, body = HealthResponse)), description = "Reports whether guidance requests reach the language model")]
pub async fn health(state: State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        services: ServiceStatus {
            code_analyzer: "active",
            llm_service: if state.policy.collaborator_enabled() {
                "active"
            } else {
                "disabled"
            },
        },
        escalation: ESCALATION_MODES,
    })
}

#[utoipa::path(post, path = "/api/v1/code_update", request_body = CodeUpdateRequest, responses((status = OK, body = TutorResponse), (status = UNPROCESSABLE_ENTITY, body = ErrorResponse), (status = INTERNAL_SERVER_ERROR, body = ErrorResponse)), description = "Analyze a submission and always ask a guiding question")]
pub async fn code_update(
    state: State<AppState>,
    body: Result<Json<CodeUpdateRequest>, JsonRejection>,
) -> Result<Json<TutorResponse>, ApiError> {
    let Json(request) = body?;
    let analysis = analyze(&state, &request).await?;
    let response = state
        .policy
        .respond(
            CODE_UPDATE_MODE,
            &request.code,
            request.context.as_deref(),
            analysis,
        )
        .await;
    Ok(Json(response))
}

#[utoipa::path(post, path = "/api/v1/agent/analyze", request_body = CodeUpdateRequest, responses((status = OK, body = AgentAnalysisResponse), (status = UNPROCESSABLE_ENTITY, body = ErrorResponse), (status = INTERNAL_SERVER_ERROR, body = ErrorResponse)), description = "Analyze a submission and ask a guiding question only for conceptual issues")]
pub async fn agent_analyze(
    state: State<AppState>,
    body: Result<Json<CodeUpdateRequest>, JsonRejection>,
) -> Result<Json<AgentAnalysisResponse>, ApiError> {
    let Json(request) = body?;
    let analysis = analyze(&state, &request).await?;
    let response = state
        .policy
        .respond(AGENT_MODE, &request.code, request.context.as_deref(), analysis)
        .await;
    Ok(Json(AgentAnalysisResponse {
        question: response.question,
        analysis: response.analysis,
        needs_conceptual_help: response.needs_conceptual_help,
        agent_id: state.agent_id.to_string(),
    }))
}

// Parsing is CPU bound, so it runs off the async workers. A panic there only
// costs the analysis; a cancelled task fails the request.
async fn analyze(
    state: &AppState,
    request: &CodeUpdateRequest,
) -> Result<Result<AnalysisRecord, AnalysisUnavailable>, ApiError> {
    debug!(
        "analyzing {} bytes of {}",
        request.code.len(),
        request.language.as_deref().unwrap_or("default language")
    );
    let analyzer = state.analyzer.clone();
    let code = request.code.clone();
    let language = request.language.clone();

    match tokio::task::spawn_blocking(move || analyzer.analyze(&code, language.as_deref())).await
    {
        Ok(outcome) => Ok(outcome.map_err(AnalysisUnavailable::from)),
        Err(e) if e.is_panic() => {
            error!("analysis panicked: {e}");
            Ok(Err(AnalysisUnavailable::Panicked))
        }
        Err(e) => {
            error!("analysis task failed: {e}");
            Err(ApiError::Cancelled)
        }
    }
}
