use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, put},
    Router,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::{
    auth::{AuthUser, Role},
    entities::{notification, RecipientType},
    errors::ServiceError,
    services::notifications::{DispatchNotificationRequest, DispatchSummary},
    ApiResponse, AppState,
};

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct NotificationListQuery {
    pub recipient_type: RecipientType,
    pub recipient_id: Uuid,
    #[serde(default)]
    pub unread_only: bool,
}

pub fn notification_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_notifications).post(dispatch_notification))
        .route("/:id/read", put(mark_notification_read))
}

/// Fan a notification out to its audience, optionally over WhatsApp
#[utoipa::path(
    post,
    path = "/api/notifications",
    request_body = DispatchNotificationRequest,
    responses(
        (status = 201, description = "Notifications created", body = ApiResponse<DispatchSummary>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Recipient not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "notifications"
)]
pub async fn dispatch_notification(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(request): Json<DispatchNotificationRequest>,
) -> Result<(StatusCode, Json<ApiResponse<DispatchSummary>>), ServiceError> {
    auth_user.require_any(&[Role::Admin, Role::Manager])?;
    let summary = state.services.notifications.dispatch(request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(summary))))
}

#[utoipa::path(
    get,
    path = "/api/notifications",
    params(NotificationListQuery),
    responses(
        (status = 200, description = "Notifications of one recipient", body = ApiResponse<Vec<notification::Model>>),
    ),
    security(("Bearer" = [])),
    tag = "notifications"
)]
pub async fn list_notifications(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Query(query): Query<NotificationListQuery>,
) -> Result<Json<ApiResponse<Vec<notification::Model>>>, ServiceError> {
    let notifications = state
        .services
        .notifications
        .list_for_recipient(query.recipient_type, query.recipient_id, query.unread_only)
        .await?;
    Ok(Json(ApiResponse::success(notifications)))
}

#[utoipa::path(
    put,
    path = "/api/notifications/{id}/read",
    params(("id" = Uuid, Path, description = "Notification id")),
    responses(
        (status = 200, description = "Notification marked read", body = ApiResponse<notification::Model>),
        (status = 404, description = "Notification not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "notifications"
)]
pub async fn mark_notification_read(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<notification::Model>>, ServiceError> {
    let updated = state.services.notifications.mark_read(id).await?;
    Ok(Json(ApiResponse::success(updated)))
}
