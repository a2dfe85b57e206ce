use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use uuid::Uuid;

use crate::{
    auth::{AuthUser, Role},
    entities::{boleto, order},
    errors::ServiceError,
    services::{
        boletos::IssueBoletosRequest,
        order_deletion::DeletionSummary,
        order_lifecycle::{OrderUpdateOutcome, UpdateOrderRequest},
        orders::{CreateOrderRequest, ListOrdersQuery, OrderDetails},
    },
    ApiResponse, AppState, PaginatedResponse,
};

const ORDER_WRITERS: &[Role] = &[Role::Admin, Role::Manager, Role::Seller];
const ORDER_MANAGERS: &[Role] = &[Role::Admin, Role::Manager];

pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_order).get(list_orders))
        .route("/:id", get(get_order).put(update_order).delete(delete_order))
        .route("/:id/boletos", post(issue_boletos).get(list_boletos))
}

/// Create an order and reserve its total against the customer's credit
#[utoipa::path(
    post,
    path = "/api/orders",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Order created", body = ApiResponse<OrderDetails>),
        (status = 400, description = "Invalid request or insufficient credit", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Customer or product not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "orders"
)]
pub async fn create_order(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(request): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<ApiResponse<OrderDetails>>), ServiceError> {
    auth_user.require_any(ORDER_WRITERS)?;
    let created = state.services.orders.create_order(request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(created))))
}

/// List orders, newest first
#[utoipa::path(
    get,
    path = "/api/orders",
    params(ListOrdersQuery),
    responses(
        (status = 200, description = "Orders retrieved", body = ApiResponse<PaginatedResponse<order::Model>>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "orders"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Query(query): Query<ListOrdersQuery>,
) -> Result<Json<ApiResponse<PaginatedResponse<order::Model>>>, ServiceError> {
    let limit = query.limit.clamp(1, 100);
    let page = query.page.max(1);
    let (items, total) = state.services.orders.list_orders(query).await?;
    Ok(Json(ApiResponse::success(PaginatedResponse {
        items,
        total,
        page,
        limit,
        total_pages: total.div_ceil(limit),
    })))
}

#[utoipa::path(
    get,
    path = "/api/orders/{id}",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order retrieved", body = ApiResponse<OrderDetails>),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<OrderDetails>>, ServiceError> {
    let details = state.services.orders.get_order(id).await?;
    Ok(Json(ApiResponse::success(details)))
}

/// Change an order's status and/or payment status
#[utoipa::path(
    put,
    path = "/api/orders/{id}",
    params(("id" = Uuid, Path, description = "Order id")),
    request_body = UpdateOrderRequest,
    responses(
        (status = 200, description = "Order updated", body = ApiResponse<OrderUpdateOutcome>),
        (status = 400, description = "Invalid transition or missing bank account", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order or bank account not found", body = crate::errors::ErrorResponse),
        (status = 500, description = "Transition rolled back", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "orders"
)]
pub async fn update_order(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateOrderRequest>,
) -> Result<Json<ApiResponse<OrderUpdateOutcome>>, ServiceError> {
    auth_user.require_any(ORDER_MANAGERS)?;
    let outcome = state.services.lifecycle.update_order(id, request).await?;
    Ok(Json(ApiResponse::success(outcome)))
}

/// Delete an order and revert everything it caused
#[utoipa::path(
    delete,
    path = "/api/orders/{id}",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order deleted", body = ApiResponse<DeletionSummary>),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "orders"
)]
pub async fn delete_order(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<DeletionSummary>>, ServiceError> {
    auth_user.require_any(&[Role::Admin])?;
    let summary = state.services.deletion.delete_order(id).await?;
    Ok(Json(ApiResponse::success(summary)))
}

/// Issue installment boletos for an order
#[utoipa::path(
    post,
    path = "/api/orders/{id}/boletos",
    params(("id" = Uuid, Path, description = "Order id")),
    request_body = IssueBoletosRequest,
    responses(
        (status = 201, description = "Boletos issued", body = ApiResponse<Vec<boleto::Model>>),
        (status = 400, description = "Order cannot receive boletos", body = crate::errors::ErrorResponse),
        (status = 502, description = "Payment provider failed", body = crate::errors::ErrorResponse),
        (status = 503, description = "Payment provider not configured", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "orders"
)]
pub async fn issue_boletos(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    Json(request): Json<IssueBoletosRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Vec<boleto::Model>>>), ServiceError> {
    auth_user.require_any(ORDER_MANAGERS)?;
    let issued = state.services.boletos.issue_boletos(id, request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(issued))))
}

#[utoipa::path(
    get,
    path = "/api/orders/{id}/boletos",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Boletos of the order", body = ApiResponse<Vec<boleto::Model>>),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "orders"
)]
pub async fn list_boletos(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<boleto::Model>>>, ServiceError> {
    let boletos = state.services.boletos.list_boletos(id).await?;
    Ok(Json(ApiResponse::success(boletos)))
}
