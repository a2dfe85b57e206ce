use crate::{
    db::DbPool,
    entities::{
        boleto, customer, order, order_item, product, receivable, OrderStatus, PaymentStatus,
    },
    errors::ServiceError,
    services::credit,
};
use chrono::Utc;
use metrics::counter;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateOrderItemRequest {
    pub product_id: Uuid,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,
    /// Overrides the catalogue price when present
    pub unit_price: Option<Decimal>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateOrderRequest {
    pub customer_id: Uuid,
    pub seller_id: Option<Uuid>,
    #[validate(length(min = 1, message = "An order needs at least one item"))]
    pub items: Vec<CreateOrderItemRequest>,
    pub payment_status: Option<PaymentStatus>,
    pub bank_account_id: Option<Uuid>,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct ListOrdersQuery {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
    pub status: Option<OrderStatus>,
    pub customer_id: Option<Uuid>,
}

fn default_page() -> u64 {
    1
}

fn default_limit() -> u64 {
    20
}

impl Default for ListOrdersQuery {
    fn default() -> Self {
        Self {
            page: default_page(),
            limit: default_limit(),
            status: None,
            customer_id: None,
        }
    }
}

/// An order with everything hanging off it.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OrderDetails {
    pub order: order::Model,
    pub items: Vec<order_item::Model>,
    pub receivable: Option<receivable::Model>,
    pub boletos: Vec<boleto::Model>,
}

/// Next sequential order number.
pub async fn next_order_number<C>(conn: &C) -> Result<i64, ServiceError>
where
    C: ConnectionTrait,
{
    let current: Option<Option<i64>> = order::Entity::find()
        .select_only()
        .column_as(order::Column::OrderNumber.max(), "max_number")
        .into_tuple()
        .one(conn)
        .await?;
    Ok(current.flatten().unwrap_or(0) + 1)
}

/// Service for creating and reading orders
#[derive(Clone)]
pub struct OrderService {
    db: Arc<DbPool>,
}

impl OrderService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    /// Creates an order and reserves its total against the customer's credit.
    #[instrument(skip(self, request), fields(customer_id = %request.customer_id))]
    pub async fn create_order(&self, request: CreateOrderRequest) -> Result<OrderDetails, ServiceError> {
        request.validate()?;
        for item in &request.items {
            item.validate()?;
            if item.unit_price.is_some_and(|price| price.is_sign_negative()) {
                return Err(ServiceError::ValidationError(
                    "unit_price must not be negative".to_string(),
                ));
            }
        }

        let payment_status = request.payment_status.unwrap_or(PaymentStatus::Unpaid);
        let txn = self.db.begin().await.map_err(|e| {
            error!(error = %e, "Failed to start transaction for order creation");
            ServiceError::DatabaseError(e)
        })?;

        let customer = customer::Entity::find_by_id(request.customer_id)
            .one(&txn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Customer {} not found", request.customer_id))
            })?;
        if !customer.active {
            return Err(ServiceError::BadRequest(format!(
                "Customer {} is inactive",
                customer.id
            )));
        }

        let mut lines = Vec::with_capacity(request.items.len());
        for item in &request.items {
            let product = product::Entity::find_by_id(item.product_id)
                .one(&txn)
                .await?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!("Product {} not found", item.product_id))
                })?;
            let unit_price = item.unit_price.unwrap_or(product.price);
            let total_price = unit_price * Decimal::from(item.quantity);
            lines.push((product, item.quantity, unit_price, total_price));
        }
        let total: Decimal = lines.iter().map(|(_, _, _, line_total)| *line_total).sum();

        if payment_status != PaymentStatus::Paid && customer.available_credit < total {
            return Err(ServiceError::ValidationError(format!(
                "insufficient available credit: {} available, {} required",
                customer.available_credit, total
            )));
        }

        let now = Utc::now();
        let order_id = Uuid::new_v4();
        let order_number = next_order_number(&txn).await?;

        let created = order::ActiveModel {
            id: Set(order_id),
            order_number: Set(order_number),
            customer_id: Set(customer.id),
            seller_id: Set(request.seller_id),
            status: Set(OrderStatus::Pending),
            payment_status: Set(payment_status),
            total: Set(total),
            bank_account_id: Set(request.bank_account_id),
            notes: Set(request.notes.clone()),
            created_at: Set(now),
            updated_at: Set(Some(now)),
        }
        .insert(&txn)
        .await
        .map_err(|e| {
            error!(error = %e, order_id = %order_id, "Failed to create order in database");
            ServiceError::DatabaseError(e)
        })?;

        let mut items = Vec::with_capacity(lines.len());
        for (product, quantity, unit_price, total_price) in lines {
            let item = order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_id),
                product_id: Set(product.id),
                product_name: Set(product.name),
                quantity: Set(quantity),
                unit_price: Set(unit_price),
                total_price: Set(total_price),
            }
            .insert(&txn)
            .await?;
            items.push(item);
        }

        if payment_status != PaymentStatus::Paid {
            credit::debit(&txn, customer.id, total).await?;
        }

        txn.commit().await.map_err(|e| {
            error!(error = %e, order_id = %order_id, "Failed to commit order creation transaction");
            ServiceError::DatabaseError(e)
        })?;

        counter!("orders.created", 1);
        info!(order_id = %order_id, order_number, total = %total, "Order created");
        Ok(OrderDetails {
            order: created,
            items,
            receivable: None,
            boletos: Vec::new(),
        })
    }

    /// Loads an order with its items, receivable and boletos
    #[instrument(skip(self))]
    pub async fn get_order(&self, order_id: Uuid) -> Result<OrderDetails, ServiceError> {
        let db = &*self.db;
        let order = order::Entity::find_by_id(order_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        let items = order_item::Entity::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .all(db)
            .await?;
        let receivable = receivable::Entity::find()
            .filter(receivable::Column::OrderId.eq(order_id))
            .one(db)
            .await?;
        let boletos = boleto::Entity::find()
            .filter(boleto::Column::OrderId.eq(order_id))
            .order_by_asc(boleto::Column::InstallmentNumber)
            .all(db)
            .await?;

        Ok(OrderDetails {
            order,
            items,
            receivable,
            boletos,
        })
    }

    /// Lists orders newest first; returns the page and the total count
    #[instrument(skip(self))]
    pub async fn list_orders(
        &self,
        query: ListOrdersQuery,
    ) -> Result<(Vec<order::Model>, u64), ServiceError> {
        let limit = query.limit.clamp(1, 100);
        let page = query.page.max(1);

        let mut select = order::Entity::find();
        if let Some(status) = query.status {
            select = select.filter(order::Column::Status.eq(status));
        }
        if let Some(customer_id) = query.customer_id {
            select = select.filter(order::Column::CustomerId.eq(customer_id));
        }

        let paginator = select
            .order_by_desc(order::Column::OrderNumber)
            .paginate(&*self.db, limit);
        let total = paginator.num_items().await?;
        let orders = paginator.fetch_page(page - 1).await?;
        Ok((orders, total))
    }
}
