//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification.

use crate::web::check_task::{run_check, run_reconcile, CheckError};
use crate::web::state::AppState;
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json},
};
use chrono::{DateTime, Utc};
use redpen_core::domain::{
    CheckSession, Correction, CorrectionStatus, CreditTransaction, TransactionKind,
};
use redpen_core::reconcile::{self, TextSegment};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;
use utoipa::{OpenApi, ToSchema};
use uuid::Uuid;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        check_handler,
        reconcile_handler,
        list_sessions_handler,
        get_session_handler,
        session_view_handler,
        balance_handler,
        purchase_handler,
        renewal_handler,
    ),
    components(
        schemas(
            CheckRequest,
            CheckResponse,
            ReconcileRequest,
            ReconcileResponse,
            SessionResponse,
            SegmentResponse,
            BalanceResponse,
            PurchaseRequest,
            RenewalRequest,
        )
    ),
    tags(
        (name = "redpen API", description = "Span-addressed text correction with credit metering.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Request and Response Structs
//=========================================================================================

/// The payload for a check request.
#[derive(Deserialize, ToSchema)]
pub struct CheckRequest {
    pub text: String,
    /// Target model; defaults to the configured model when omitted.
    pub model: Option<String>,
}

/// The response payload for a completed check.
#[derive(Serialize, ToSchema)]
pub struct CheckResponse {
    pub session_id: Uuid,
    pub original_text: String,
    pub corrected_text: String,
    #[schema(value_type = Vec<Object>)]
    pub corrections: Vec<Correction>,
    /// True when the external service failed and only rule-engine output
    /// was produced.
    pub degraded: bool,
}

/// One accept/reject action against a session's correction.
#[derive(Deserialize, ToSchema)]
pub struct ReconcileRequest {
    pub correction_id: Uuid,
    #[schema(value_type = String)]
    pub status: CorrectionStatus,
}

/// The updated canonical correction state after reconciliation.
#[derive(Serialize, ToSchema)]
pub struct ReconcileResponse {
    #[schema(value_type = Vec<Object>)]
    pub corrections: Vec<Correction>,
    pub corrected_text: String,
}

/// A persisted check session.
#[derive(Serialize, ToSchema)]
pub struct SessionResponse {
    pub session_id: Uuid,
    pub model: String,
    pub original_text: String,
    pub corrected_text: String,
    #[schema(value_type = Vec<Object>)]
    pub corrections: Vec<Correction>,
    pub created_at: DateTime<Utc>,
}

impl From<CheckSession> for SessionResponse {
    fn from(session: CheckSession) -> Self {
        Self {
            session_id: session.id,
            model: session.model,
            original_text: session.original_text,
            corrected_text: session.corrected_text,
            corrections: session.corrections,
            created_at: session.created_at,
        }
    }
}

/// One element of the interactive-view projection: a literal run of text,
/// or a correction marker covering its span.
#[derive(Serialize, ToSchema)]
pub struct SegmentResponse {
    pub kind: String,
    pub text: String,
    #[schema(value_type = Object)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correction: Option<Correction>,
}

/// The caller's current credit pools.
#[derive(Serialize, ToSchema)]
pub struct BalanceResponse {
    pub subscription_credits: i64,
    pub purchased_credits: i64,
    pub available: i64,
    pub last_reset: DateTime<Utc>,
}

/// A one-time credit purchase, already settled by the payment boundary.
#[derive(Deserialize, ToSchema)]
pub struct PurchaseRequest {
    pub amount: i64,
}

/// A subscription renewal event for a plan.
#[derive(Deserialize, ToSchema)]
pub struct RenewalRequest {
    pub plan: String,
}

//=========================================================================================
// Shared Handler Helpers
//=========================================================================================

/// Extracts the caller's account id from the `x-account-id` header. The
/// authentication boundary lives outside this service; the header carries
/// its verdict.
fn account_id_from_headers(headers: &HeaderMap) -> Result<Uuid, (StatusCode, String)> {
    let raw = headers
        .get("x-account-id")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            (
                StatusCode::BAD_REQUEST,
                "x-account-id header is required".to_string(),
            )
        })?;

    Uuid::parse_str(raw).map_err(|_| {
        (
            StatusCode::BAD_REQUEST,
            "Invalid x-account-id format".to_string(),
        )
    })
}

fn error_response(e: CheckError) -> (StatusCode, String) {
    match e {
        CheckError::Validation(message) => (StatusCode::BAD_REQUEST, message),
        CheckError::InsufficientCredits { .. } => (StatusCode::PAYMENT_REQUIRED, e.to_string()),
        CheckError::ModelNotAllowed { .. } => (StatusCode::FORBIDDEN, e.to_string()),
        CheckError::NotFound(message) => (StatusCode::NOT_FOUND, message),
        CheckError::Persistence(message) => {
            error!("request failed on persistence: {}", message);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to process request".to_string(),
            )
        }
    }
}

fn port_error_response(e: redpen_core::ports::PortError) -> (StatusCode, String) {
    error_response(match e {
        redpen_core::ports::PortError::NotFound(what) => CheckError::NotFound(what),
        other => CheckError::Persistence(other.to_string()),
    })
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Run a grammar check over free-form text.
#[utoipa::path(
    post,
    path = "/check",
    request_body = CheckRequest,
    responses(
        (status = 200, description = "Check completed", body = CheckResponse),
        (status = 400, description = "Malformed request"),
        (status = 402, description = "Insufficient credits"),
        (status = 403, description = "Model not allowed on the caller's plan"),
        (status = 500, description = "Failed to persist the session")
    ),
    params(
        ("x-account-id" = Uuid, Header, description = "The unique ID of the calling account.")
    )
)]
pub async fn check_handler(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<CheckRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let account_id = account_id_from_headers(&headers)?;
    let model = request
        .model
        .unwrap_or_else(|| app_state.config.default_model.clone());

    let outcome = run_check(app_state.clone(), account_id, request.text, &model)
        .await
        .map_err(error_response)?;

    let response = CheckResponse {
        session_id: outcome.session.id,
        original_text: outcome.session.original_text,
        corrected_text: outcome.session.corrected_text,
        corrections: outcome.session.corrections,
        degraded: outcome.degraded,
    };
    Ok((StatusCode::OK, Json(response)))
}

/// Accept or reject one correction in a session.
#[utoipa::path(
    patch,
    path = "/sessions/{id}/corrections",
    request_body = ReconcileRequest,
    responses(
        (status = 200, description = "Correction set reconciled", body = ReconcileResponse),
        (status = 400, description = "Malformed request"),
        (status = 404, description = "Session not found"),
        (status = 500, description = "Failed to persist the update")
    ),
    params(
        ("id" = Uuid, Path, description = "The session to reconcile."),
        ("x-account-id" = Uuid, Header, description = "The unique ID of the calling account.")
    )
)]
pub async fn reconcile_handler(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(session_id): Path<Uuid>,
    Json(request): Json<ReconcileRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let account_id = account_id_from_headers(&headers)?;

    let session = run_reconcile(
        app_state,
        account_id,
        session_id,
        request.correction_id,
        request.status,
    )
    .await
    .map_err(error_response)?;

    let response = ReconcileResponse {
        corrections: session.corrections,
        corrected_text: session.corrected_text,
    };
    Ok((StatusCode::OK, Json(response)))
}

/// List the caller's past check sessions, newest first.
#[utoipa::path(
    get,
    path = "/sessions",
    responses(
        (status = 200, description = "The caller's sessions", body = [SessionResponse]),
        (status = 400, description = "Malformed request")
    ),
    params(
        ("x-account-id" = Uuid, Header, description = "The unique ID of the calling account.")
    )
)]
pub async fn list_sessions_handler(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let account_id = account_id_from_headers(&headers)?;

    let sessions = app_state
        .sessions
        .sessions_for_account(account_id)
        .await
        .map_err(port_error_response)?;

    let response: Vec<SessionResponse> = sessions.into_iter().map(SessionResponse::from).collect();
    Ok((StatusCode::OK, Json(response)))
}

/// Fetch one check session.
#[utoipa::path(
    get,
    path = "/sessions/{id}",
    responses(
        (status = 200, description = "The session", body = SessionResponse),
        (status = 404, description = "Session not found")
    ),
    params(
        ("id" = Uuid, Path, description = "The session to fetch."),
        ("x-account-id" = Uuid, Header, description = "The unique ID of the calling account.")
    )
)]
pub async fn get_session_handler(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(session_id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let account_id = account_id_from_headers(&headers)?;
    let session = owned_session(&app_state, account_id, session_id).await?;
    Ok((StatusCode::OK, Json(SessionResponse::from(session))))
}

/// Project a session into alternating literal and correction segments for
/// a presentation layer.
#[utoipa::path(
    get,
    path = "/sessions/{id}/view",
    responses(
        (status = 200, description = "The interactive-view projection", body = [SegmentResponse]),
        (status = 404, description = "Session not found")
    ),
    params(
        ("id" = Uuid, Path, description = "The session to project."),
        ("x-account-id" = Uuid, Header, description = "The unique ID of the calling account.")
    )
)]
pub async fn session_view_handler(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(session_id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let account_id = account_id_from_headers(&headers)?;
    let session = owned_session(&app_state, account_id, session_id).await?;

    let segments: Vec<SegmentResponse> =
        reconcile::segment_view(&session.original_text, &session.corrections)
            .into_iter()
            .map(|segment| match segment {
                TextSegment::Literal(text) => SegmentResponse {
                    kind: "literal".to_string(),
                    text,
                    correction: None,
                },
                TextSegment::Marker { correction, text } => SegmentResponse {
                    kind: "correction".to_string(),
                    text,
                    correction: Some(correction),
                },
            })
            .collect();

    Ok((StatusCode::OK, Json(segments)))
}

async fn owned_session(
    app_state: &AppState,
    account_id: Uuid,
    session_id: Uuid,
) -> Result<CheckSession, (StatusCode, String)> {
    let session = app_state
        .sessions
        .get_session(session_id)
        .await
        .map_err(port_error_response)?;

    if session.account_id != account_id {
        return Err((
            StatusCode::NOT_FOUND,
            format!("Session {} not found", session_id),
        ));
    }
    Ok(session)
}

/// Fetch the caller's current credit balance.
#[utoipa::path(
    get,
    path = "/credits",
    responses(
        (status = 200, description = "The caller's balance", body = BalanceResponse),
        (status = 400, description = "Malformed request")
    ),
    params(
        ("x-account-id" = Uuid, Header, description = "The unique ID of the calling account.")
    )
)]
pub async fn balance_handler(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let account_id = account_id_from_headers(&headers)?;

    app_state
        .credits
        .ensure_account(account_id)
        .await
        .map_err(port_error_response)?;
    let balance = app_state
        .credits
        .get_balance(account_id)
        .await
        .map_err(port_error_response)?;

    Ok((StatusCode::OK, Json(balance_response(balance))))
}

fn balance_response(balance: redpen_core::domain::CreditBalance) -> BalanceResponse {
    BalanceResponse {
        subscription_credits: balance.subscription_credits,
        purchased_credits: balance.purchased_credits,
        available: balance.available(),
        last_reset: balance.last_reset,
    }
}

/// Apply a one-time credit purchase to the caller's purchased pool.
#[utoipa::path(
    post,
    path = "/credits/purchase",
    request_body = PurchaseRequest,
    responses(
        (status = 200, description = "Updated balance", body = BalanceResponse),
        (status = 400, description = "Malformed request")
    ),
    params(
        ("x-account-id" = Uuid, Header, description = "The unique ID of the calling account.")
    )
)]
pub async fn purchase_handler(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<PurchaseRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let account_id = account_id_from_headers(&headers)?;
    if request.amount <= 0 {
        return Err((
            StatusCode::BAD_REQUEST,
            "Purchase amount must be positive".to_string(),
        ));
    }

    app_state
        .credits
        .ensure_account(account_id)
        .await
        .map_err(port_error_response)?;
    app_state
        .credits
        .add_purchased_credits(account_id, request.amount)
        .await
        .map_err(port_error_response)?;

    let transaction = CreditTransaction {
        id: Uuid::new_v4(),
        account_id,
        kind: TransactionKind::Purchase,
        amount: request.amount,
        reason: "One-time credit purchase".to_string(),
        created_at: Utc::now(),
    };
    app_state
        .credits
        .record_transaction(&transaction)
        .await
        .map_err(port_error_response)?;

    let balance = app_state
        .credits
        .get_balance(account_id)
        .await
        .map_err(port_error_response)?;
    Ok((StatusCode::OK, Json(balance_response(balance))))
}

/// Apply a subscription renewal: sets the plan and adds its monthly
/// allotment to the subscription pool.
#[utoipa::path(
    post,
    path = "/credits/renewal",
    request_body = RenewalRequest,
    responses(
        (status = 200, description = "Updated balance", body = BalanceResponse),
        (status = 400, description = "Unknown plan")
    ),
    params(
        ("x-account-id" = Uuid, Header, description = "The unique ID of the calling account.")
    )
)]
pub async fn renewal_handler(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<RenewalRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let account_id = account_id_from_headers(&headers)?;

    let plan = app_state.plans.get(&request.plan).ok_or_else(|| {
        (
            StatusCode::BAD_REQUEST,
            format!("Unknown plan: {}", request.plan),
        )
    })?;

    app_state
        .credits
        .ensure_account(account_id)
        .await
        .map_err(port_error_response)?;
    app_state
        .credits
        .set_plan(account_id, plan.id)
        .await
        .map_err(port_error_response)?;
    app_state
        .credits
        .add_subscription_credits(account_id, plan.monthly_credits)
        .await
        .map_err(port_error_response)?;

    let transaction = CreditTransaction {
        id: Uuid::new_v4(),
        account_id,
        kind: TransactionKind::Subscription,
        amount: plan.monthly_credits,
        reason: format!("Credits granted for {} renewal", plan.id),
        created_at: Utc::now(),
    };
    app_state
        .credits
        .record_transaction(&transaction)
        .await
        .map_err(port_error_response)?;

    let balance = app_state
        .credits
        .get_balance(account_id)
        .await
        .map_err(port_error_response)?;
    Ok((StatusCode::OK, Json(balance_response(balance))))
}
