use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Back Office API",
        version = "1.0.0",
        description = r#"
# Distributor back office

Orders, credit, boletos and customer notifications for a distributor that
sells on credit to resellers.

## Authentication

Every `/api` endpoint expects an HS256 bearer token:

```
Authorization: Bearer <your-jwt-token>
```

Role requirements are listed per endpoint.

## Error Handling

Errors share one body shape:

```json
{
  "error": "Bad Request",
  "message": "bank account is required to mark an order as paid",
  "request_id": "req-abc123xyz",
  "timestamp": "2024-01-01T00:00:00Z"
}
```

## Pagination

`GET /api/orders` accepts `page` (default 1) and `limit` (default 20, max 100).
        "#
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "orders", description = "Order creation, transitions, deletion and boletos"),
        (name = "customers", description = "Credit ledger"),
        (name = "notifications", description = "In-app and WhatsApp notifications"),
        (name = "whatsapp", description = "WhatsApp providers")
    ),
    paths(
        // Orders
        crate::handlers::orders::create_order,
        crate::handlers::orders::list_orders,
        crate::handlers::orders::get_order,
        crate::handlers::orders::update_order,
        crate::handlers::orders::delete_order,
        crate::handlers::orders::issue_boletos,
        crate::handlers::orders::list_boletos,

        // Credit
        crate::handlers::customers::get_credit_summary,
        crate::handlers::customers::reconcile_credit,

        // Notifications
        crate::handlers::notifications::dispatch_notification,
        crate::handlers::notifications::list_notifications,
        crate::handlers::notifications::mark_notification_read,

        // WhatsApp
        crate::handlers::whatsapp::whatsapp_status,
        crate::handlers::whatsapp::send_message,
    ),
    components(
        schemas(
            crate::ApiResponse<serde_json::Value>,
            crate::PaginatedResponse<serde_json::Value>,

            crate::entities::OrderStatus,
            crate::entities::PaymentStatus,
            crate::entities::BoletoStatus,
            crate::entities::ReceivableStatus,
            crate::entities::NotificationCategory,
            crate::entities::RecipientType,

            crate::services::orders::CreateOrderRequest,
            crate::services::orders::CreateOrderItemRequest,
            crate::services::orders::OrderDetails,
            crate::services::order_lifecycle::UpdateOrderRequest,
            crate::services::order_lifecycle::OrderUpdateOutcome,
            crate::services::order_deletion::DeletionSummary,
            crate::services::boletos::IssueBoletosRequest,
            crate::services::credit::CreditSummary,
            crate::services::credit::ReconcileOutcome,
            crate::services::notifications::DispatchNotificationRequest,
            crate::services::notifications::DispatchSummary,
            crate::handlers::whatsapp::SendWhatsAppRequest,
            crate::gateways::WhatsAppStatus,
            crate::gateways::WhatsAppDelivery,

            crate::errors::ErrorResponse
        )
    ),
    modifiers(&BearerAuth)
)]
pub struct ApiDocV1;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "Bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}
