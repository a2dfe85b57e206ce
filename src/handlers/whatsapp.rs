use axum::{
    extract::State,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    auth::{AuthUser, Role},
    errors::ServiceError,
    gateways::{WhatsAppDelivery, WhatsAppStatus},
    ApiResponse, AppState,
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SendWhatsAppRequest {
    #[validate(length(min = 8, max = 32))]
    pub phone: String,
    #[validate(length(min = 1, max = 4096))]
    pub message: String,
}

pub fn whatsapp_routes() -> Router<AppState> {
    Router::new()
        .route("/status", get(whatsapp_status))
        .route("/send", post(send_message))
}

/// Configuration and reachability of each WhatsApp provider
#[utoipa::path(
    get,
    path = "/api/whatsapp/status",
    responses(
        (status = 200, description = "Provider status", body = ApiResponse<WhatsAppStatus>),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "whatsapp"
)]
pub async fn whatsapp_status(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<ApiResponse<WhatsAppStatus>>, ServiceError> {
    auth_user.require_any(&[Role::Admin])?;
    let status = state.services.whatsapp.status().await;
    Ok(Json(ApiResponse::success(status)))
}

/// Send one text message through whichever provider is available
#[utoipa::path(
    post,
    path = "/api/whatsapp/send",
    request_body = SendWhatsAppRequest,
    responses(
        (status = 200, description = "Message delivered", body = ApiResponse<WhatsAppDelivery>),
        (status = 400, description = "Invalid phone number", body = crate::errors::ErrorResponse),
        (status = 502, description = "Every provider failed", body = crate::errors::ErrorResponse),
        (status = 503, description = "No provider configured", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "whatsapp"
)]
pub async fn send_message(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(request): Json<SendWhatsAppRequest>,
) -> Result<Json<ApiResponse<WhatsAppDelivery>>, ServiceError> {
    auth_user.require_any(&[Role::Admin])?;
    request.validate()?;
    let delivery = state
        .services
        .whatsapp
        .send_text(&request.phone, &request.message)
        .await?;
    Ok(Json(ApiResponse::success(delivery)))
}
