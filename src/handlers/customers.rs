use axum::{
    extract::{Path, State},
    response::Json,
    routing::{get, post},
    Router,
};
use uuid::Uuid;

use crate::{
    auth::{AuthUser, Role},
    errors::ServiceError,
    services::credit::{CreditSummary, ReconcileOutcome},
    ApiResponse, AppState,
};

pub fn customer_routes() -> Router<AppState> {
    Router::new()
        .route("/:id/credit", get(get_credit_summary))
        .route("/:id/credit/reconcile", post(reconcile_credit))
}

/// Stored versus recomputed available credit
#[utoipa::path(
    get,
    path = "/api/customers/{id}/credit",
    params(("id" = Uuid, Path, description = "Customer id")),
    responses(
        (status = 200, description = "Credit summary", body = ApiResponse<CreditSummary>),
        (status = 404, description = "Customer not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "customers"
)]
pub async fn get_credit_summary(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<CreditSummary>>, ServiceError> {
    let summary = state.services.credit.credit_summary(id).await?;
    Ok(Json(ApiResponse::success(summary)))
}

/// Overwrite the stored available credit with the recomputed value
#[utoipa::path(
    post,
    path = "/api/customers/{id}/credit/reconcile",
    params(("id" = Uuid, Path, description = "Customer id")),
    responses(
        (status = 200, description = "Credit reconciled", body = ApiResponse<ReconcileOutcome>),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Customer not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "customers"
)]
pub async fn reconcile_credit(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<ReconcileOutcome>>, ServiceError> {
    auth_user.require_any(&[Role::Admin])?;
    let outcome = state.services.credit.reconcile(id).await?;
    Ok(Json(ApiResponse::success(outcome)))
}
