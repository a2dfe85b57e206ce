#![allow(dead_code)]

use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc, Mutex,
};

use async_trait::async_trait;
use axum::{
    body::{self, Body},
    http::{Method, Request},
    response::Response,
    Router,
};
use backoffice_api::{
    auth::Role,
    config::AppConfig,
    db,
    entities::{bank_account, customer, product, seller},
    errors::ServiceError,
    gateways::{BoletoIssueRequest, IssuedBoleto, PaymentGateway, WhatsAppService},
    services::orders::{CreateOrderItemRequest, CreateOrderRequest, OrderDetails},
    AppState,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

pub const TEST_JWT_SECRET: &str =
    "integration_test_secret_that_is_comfortably_longer_than_sixty_four_characters_0123456789";

/// Payment gateway double that records calls and can be told to fail.
#[derive(Default)]
pub struct FakeGateway {
    pub fail_issue: AtomicBool,
    pub fail_cancel: AtomicBool,
    pub issued: Mutex<Vec<String>>,
    pub cancelled: Mutex<Vec<String>>,
    counter: AtomicUsize,
}

impl FakeGateway {
    pub fn fail_cancellations(&self) {
        self.fail_cancel.store(true, Ordering::SeqCst);
    }

    pub fn cancel_calls(&self) -> usize {
        self.cancelled.lock().unwrap().len()
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn issue_boleto(&self, request: &BoletoIssueRequest) -> Result<IssuedBoleto, ServiceError> {
        if self.fail_issue.load(Ordering::SeqCst) {
            return Err(ServiceError::ExternalServiceError("psp down".to_string()));
        }
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        let gateway_id = format!("inv_{}_{}", request.code, n);
        self.issued.lock().unwrap().push(gateway_id.clone());
        Ok(IssuedBoleto { gateway_id })
    }

    async fn cancel_boleto(&self, gateway_id: &str) -> Result<(), ServiceError> {
        self.cancelled.lock().unwrap().push(gateway_id.to_string());
        if self.fail_cancel.load(Ordering::SeqCst) {
            return Err(ServiceError::ExternalServiceError("psp down".to_string()));
        }
        Ok(())
    }
}

/// Application over a fresh in-memory SQLite database.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub gateway: Arc<FakeGateway>,
}

impl TestApp {
    pub async fn new() -> Self {
        let mut cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            TEST_JWT_SECRET.to_string(),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        cfg.auto_migrate = true;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let gateway = Arc::new(FakeGateway::default());
        let whatsapp = Arc::new(WhatsAppService::new(None, None, "55"));
        let state = AppState::new(Arc::new(pool), cfg, gateway.clone(), whatsapp);

        let router = backoffice_api::api_routes().with_state(state.clone());

        Self {
            router,
            state,
            gateway,
        }
    }

    pub fn db(&self) -> &sea_orm::DatabaseConnection {
        &self.state.db
    }

    pub fn token(&self, roles: &[Role]) -> String {
        self.state
            .auth
            .issue_token("test-user", roles, chrono::Duration::hours(1))
            .expect("token")
    }

    pub fn admin_token(&self) -> String {
        self.token(&[Role::Admin])
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {}", tok));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(serde_json::to_vec(&json).expect("serialize request body"))
            }
            None => Body::empty(),
        };

        self.router
            .clone()
            .oneshot(builder.body(body).expect("build request"))
            .await
            .expect("router error during test request")
    }

    pub async fn request_as_admin(&self, method: Method, uri: &str, body: Option<Value>) -> Response {
        let token = self.admin_token();
        self.request(method, uri, body, Some(&token)).await
    }

    pub async fn seed_customer(&self, name: &str, credit_limit: Decimal) -> customer::Model {
        customer::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            phone: Set(Some("11987654321".to_string())),
            credit_limit: Set(credit_limit),
            available_credit: Set(credit_limit),
            points_balance: Set(0),
            lifetime_points: Set(0),
            referred_by_id: Set(None),
            active: Set(true),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        }
        .insert(self.db())
        .await
        .expect("seed customer")
    }

    pub async fn seed_referred_customer(
        &self,
        name: &str,
        credit_limit: Decimal,
        referrer: Uuid,
    ) -> customer::Model {
        let seeded = self.seed_customer(name, credit_limit).await;
        let mut active: customer::ActiveModel = seeded.into();
        active.referred_by_id = Set(Some(referrer));
        active.update(self.db()).await.expect("set referrer")
    }

    pub async fn seed_seller(&self, name: &str) -> seller::Model {
        seller::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            phone: Set(None),
            active: Set(true),
            created_at: Set(Utc::now()),
        }
        .insert(self.db())
        .await
        .expect("seed seller")
    }

    pub async fn seed_product(&self, sku: &str, price: Decimal) -> product::Model {
        product::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(format!("Product {}", sku)),
            sku: Set(sku.to_string()),
            price: Set(price),
            cost_price: Set(price),
            created_at: Set(Utc::now()),
        }
        .insert(self.db())
        .await
        .expect("seed product")
    }

    pub async fn seed_bank_account(&self, name: &str, balance: Decimal) -> bank_account::Model {
        bank_account::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            balance: Set(balance),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        }
        .insert(self.db())
        .await
        .expect("seed bank account")
    }

    /// Creates an order through the service with one line.
    pub async fn create_order(
        &self,
        customer_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> OrderDetails {
        self.state
            .services
            .orders
            .create_order(CreateOrderRequest {
                customer_id,
                seller_id: None,
                items: vec![CreateOrderItemRequest {
                    product_id,
                    quantity,
                    unit_price: None,
                }],
                payment_status: None,
                bank_account_id: None,
                notes: None,
            })
            .await
            .expect("create order")
    }

    pub async fn customer(&self, id: Uuid) -> customer::Model {
        customer::Entity::find_by_id(id)
            .one(self.db())
            .await
            .expect("load customer")
            .expect("customer exists")
    }

    pub async fn bank_account(&self, id: Uuid) -> bank_account::Model {
        bank_account::Entity::find_by_id(id)
            .one(self.db())
            .await
            .expect("load bank account")
            .expect("bank account exists")
    }
}

pub async fn response_json(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}
