//! HTTP surface: routing, role checks, response envelopes.

mod common;

use axum::http::{Method, StatusCode};
use backoffice_api::auth::Role;
use common::{response_json, TestApp};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::json;
use std::str::FromStr;

fn decimal(value: &serde_json::Value) -> Decimal {
    match value {
        serde_json::Value::String(s) => Decimal::from_str(s).expect("decimal string"),
        serde_json::Value::Number(n) => Decimal::from_str(&n.to_string()).expect("decimal number"),
        other => panic!("not a decimal: {other}"),
    }
}

#[tokio::test]
async fn health_and_status_need_no_token() {
    let app = TestApp::new().await;

    let health = app.request(Method::GET, "/health", None, None).await;
    assert_eq!(health.status(), StatusCode::OK);
    let body = response_json(health).await;
    assert_eq!(body["data"]["checks"]["database"], "healthy");
    assert_eq!(body["data"]["checks"]["whatsapp"], "disabled");

    let status = app.request(Method::GET, "/status", None, None).await;
    assert_eq!(status.status(), StatusCode::OK);
}

#[tokio::test]
async fn api_routes_require_a_bearer_token() {
    let app = TestApp::new().await;
    let response = app.request(Method::GET, "/api/orders", None, None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .request(Method::GET, "/api/orders", None, Some("not-a-jwt"))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn sellers_create_orders_but_cannot_delete_them() {
    let app = TestApp::new().await;
    let customer = app.seed_customer("Http Customer", dec!(500)).await;
    let product = app.seed_product("SKU-HTTP", dec!(25)).await;
    let seller_token = app.token(&[Role::Seller]);

    let created = app
        .request(
            Method::POST,
            "/api/orders",
            Some(json!({
                "customer_id": customer.id,
                "items": [{ "product_id": product.id, "quantity": 4 }]
            })),
            Some(&seller_token),
        )
        .await;
    assert_eq!(created.status(), StatusCode::CREATED);
    let body = response_json(created).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["order"]["status"], "PENDING");
    assert_eq!(body["data"]["order"]["payment_status"], "UNPAID");
    assert_eq!(decimal(&body["data"]["order"]["total"]), dec!(100));
    let order_id = body["data"]["order"]["id"].as_str().unwrap().to_string();

    let denied = app
        .request(
            Method::DELETE,
            &format!("/api/orders/{order_id}"),
            None,
            Some(&seller_token),
        )
        .await;
    assert_eq!(denied.status(), StatusCode::FORBIDDEN);

    let deleted = app
        .request_as_admin(Method::DELETE, &format!("/api/orders/{order_id}"), None)
        .await;
    assert_eq!(deleted.status(), StatusCode::OK);
    let body = response_json(deleted).await;
    assert_eq!(decimal(&body["data"]["credit_restored"]), dec!(100));
}

#[tokio::test]
async fn insufficient_credit_is_a_bad_request() {
    let app = TestApp::new().await;
    let customer = app.seed_customer("Tight", dec!(50)).await;
    let product = app.seed_product("SKU-TIGHT", dec!(30)).await;

    let response = app
        .request_as_admin(
            Method::POST,
            "/api/orders",
            Some(json!({
                "customer_id": customer.id,
                "items": [{ "product_id": product.id, "quantity": 2 }]
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(app.customer(customer.id).await.available_credit, dec!(50));
}

#[tokio::test]
async fn unknown_order_is_not_found() {
    let app = TestApp::new().await;
    let response = app
        .request_as_admin(
            Method::GET,
            &format!("/api/orders/{}", uuid::Uuid::new_v4()),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = response_json(response).await;
    assert_eq!(body["error"], "Not Found");
}

#[tokio::test]
async fn listing_orders_paginates_newest_first() {
    let app = TestApp::new().await;
    let customer = app.seed_customer("Lister", dec!(1000)).await;
    let product = app.seed_product("SKU-LIST", dec!(5)).await;
    for _ in 0..3 {
        app.create_order(customer.id, product.id, 1).await;
    }

    let response = app
        .request_as_admin(Method::GET, "/api/orders?page=1&limit=2", None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["data"]["total"], 3);
    assert_eq!(body["data"]["total_pages"], 2);
    let items = body["data"]["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["order_number"], 3);
}

#[tokio::test]
async fn managers_cannot_reconcile_credit_but_admins_can() {
    let app = TestApp::new().await;
    let customer = app.seed_customer("Drifted", dec!(1000)).await;
    let product = app.seed_product("SKU-DRIFT", dec!(100)).await;
    app.create_order(customer.id, product.id, 1).await;

    let summary = app
        .request_as_admin(
            Method::GET,
            &format!("/api/customers/{}/credit", customer.id),
            None,
        )
        .await;
    assert_eq!(summary.status(), StatusCode::OK);
    let body = response_json(summary).await;
    assert_eq!(decimal(&body["data"]["drift"]), Decimal::ZERO);

    let manager = app.token(&[Role::Manager]);
    let denied = app
        .request(
            Method::POST,
            &format!("/api/customers/{}/credit/reconcile", customer.id),
            None,
            Some(&manager),
        )
        .await;
    assert_eq!(denied.status(), StatusCode::FORBIDDEN);

    let reconciled = app
        .request_as_admin(
            Method::POST,
            &format!("/api/customers/{}/credit/reconcile", customer.id),
            None,
        )
        .await;
    assert_eq!(reconciled.status(), StatusCode::OK);
}

#[tokio::test]
async fn promotion_reaches_every_active_customer_and_can_be_marked_read() {
    let app = TestApp::new().await;
    let first = app.seed_customer("First", dec!(0)).await;
    app.seed_customer("Second", dec!(0)).await;
    app.seed_seller("Seller").await;

    let response = app
        .request_as_admin(
            Method::POST,
            "/api/notifications",
            Some(json!({
                "category": "PROMOTION",
                "title": "Black Friday",
                "message": "Everything 10% off",
                "send_whatsapp": true
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = response_json(response).await;
    assert_eq!(body["data"]["notifications_created"], 2);
    assert_eq!(body["data"]["whatsapp_sent"], 0);
    assert_eq!(body["data"]["whatsapp_skipped"], 2);

    let listed = app
        .request_as_admin(
            Method::GET,
            &format!(
                "/api/notifications?recipient_type=CUSTOMER&recipient_id={}&unread_only=true",
                first.id
            ),
            None,
        )
        .await;
    assert_eq!(listed.status(), StatusCode::OK);
    let body = response_json(listed).await;
    let items = body["data"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    let id = items[0]["id"].as_str().unwrap().to_string();

    let read = app
        .request_as_admin(Method::PUT, &format!("/api/notifications/{id}/read"), None)
        .await;
    assert_eq!(read.status(), StatusCode::OK);
    assert_eq!(response_json(read).await["data"]["is_read"], true);
}

#[tokio::test]
async fn order_update_notification_without_target_is_rejected() {
    let app = TestApp::new().await;
    let response = app
        .request_as_admin(
            Method::POST,
            "/api/notifications",
            Some(json!({
                "category": "ORDER_UPDATE",
                "title": "Update",
                "message": "Your order moved"
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn whatsapp_status_is_admin_only() {
    let app = TestApp::new().await;
    let manager = app.token(&[Role::Manager]);
    let denied = app
        .request(Method::GET, "/api/whatsapp/status", None, Some(&manager))
        .await;
    assert_eq!(denied.status(), StatusCode::FORBIDDEN);

    let response = app
        .request_as_admin(Method::GET, "/api/whatsapp/status", None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["data"]["self_hosted"]["configured"], false);
    assert_eq!(body["data"]["saas"]["configured"], false);
}

#[tokio::test]
async fn boleto_issuance_over_http_splits_the_total_and_refuses_a_second_batch() {
    let app = TestApp::new().await;
    let customer = app.seed_customer("Installments", dec!(1000)).await;
    let product = app.seed_product("SKU-BOL", dec!(90)).await;
    let order = app.create_order(customer.id, product.id, 1).await.order;

    let response = app
        .request_as_admin(
            Method::POST,
            &format!("/api/orders/{}/boletos", order.id),
            Some(json!({ "installments": 3 })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = response_json(response).await;
    let slips = body["data"].as_array().unwrap();
    assert_eq!(slips.len(), 3);
    assert_eq!(decimal(&slips[2]["amount"]), dec!(30));
    assert_eq!(slips[2]["installment_number"], 3);

    let again = app
        .request_as_admin(
            Method::POST,
            &format!("/api/orders/{}/boletos", order.id),
            Some(json!({ "installments": 1 })),
        )
        .await;
    assert_eq!(again.status(), StatusCode::BAD_REQUEST);
}
