//! Customer-side mirror of delivered orders.
//!
//! A delivered order becomes a purchase in the customer's own books, bought
//! from the internal factory supplier, and its lines land in the customer's
//! inventory.

use crate::{
    entities::{
        client_inventory, client_inventory_movement, client_product, expense, order, order_item,
        purchase, purchase_item, supplier, MovementKind, PaymentStatus, PurchaseStatus,
    },
    errors::ServiceError,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, IntoActiveModel, QueryFilter, Set,
};
use serde::Serialize;
use tracing::{debug, error, info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DeliveryOutcome {
    pub purchase_id: Uuid,
    /// False when the purchase already existed and stock was left untouched
    pub purchase_created: bool,
    pub lines_mirrored: usize,
    pub units_received: i64,
}

/// Finds the internal supplier by name, creating it on first use.
pub async fn find_or_create_factory_supplier<C>(
    conn: &C,
    name: &str,
) -> Result<supplier::Model, ServiceError>
where
    C: ConnectionTrait,
{
    if let Some(existing) = supplier::Entity::find()
        .filter(supplier::Column::IsInternal.eq(true))
        .filter(supplier::Column::Name.eq(name))
        .one(conn)
        .await?
    {
        return Ok(existing);
    }

    let created = supplier::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        document: Set(None),
        is_internal: Set(true),
        created_at: Set(Utc::now()),
    }
    .insert(conn)
    .await?;
    info!(supplier_id = %created.id, "factory supplier created");
    Ok(created)
}

/// The purchase mirroring `order`, looked up by customer and invoice number.
pub async fn find_mirrored_purchase<C>(
    conn: &C,
    order: &order::Model,
) -> Result<Option<purchase::Model>, ServiceError>
where
    C: ConnectionTrait,
{
    Ok(purchase::Entity::find()
        .filter(purchase::Column::CustomerId.eq(order.customer_id))
        .filter(purchase::Column::InvoiceNumber.eq(order.order_number.to_string()))
        .one(conn)
        .await?)
}

async fn find_or_create_client_product<C>(
    conn: &C,
    customer_id: Uuid,
    item: &order_item::Model,
) -> Result<client_product::Model, ServiceError>
where
    C: ConnectionTrait,
{
    if let Some(existing) = client_product::Entity::find()
        .filter(client_product::Column::CustomerId.eq(customer_id))
        .filter(client_product::Column::SourceProductId.eq(item.product_id))
        .one(conn)
        .await?
    {
        return Ok(existing);
    }

    Ok(client_product::ActiveModel {
        id: Set(Uuid::new_v4()),
        customer_id: Set(customer_id),
        source_product_id: Set(item.product_id),
        name: Set(item.product_name.clone()),
        cost_price: Set(item.unit_price),
        sale_price: Set(item.unit_price),
        created_at: Set(Utc::now()),
    }
    .insert(conn)
    .await?)
}

async fn find_or_create_inventory<C>(
    conn: &C,
    customer_id: Uuid,
    client_product_id: Uuid,
) -> Result<client_inventory::Model, ServiceError>
where
    C: ConnectionTrait,
{
    if let Some(existing) = client_inventory::Entity::find()
        .filter(client_inventory::Column::ClientProductId.eq(client_product_id))
        .one(conn)
        .await?
    {
        return Ok(existing);
    }

    Ok(client_inventory::ActiveModel {
        id: Set(Uuid::new_v4()),
        customer_id: Set(customer_id),
        client_product_id: Set(client_product_id),
        current_stock: Set(0),
        updated_at: Set(Utc::now()),
    }
    .insert(conn)
    .await?)
}

async fn ensure_expense<C>(conn: &C, purchase: &purchase::Model) -> Result<(), ServiceError>
where
    C: ConnectionTrait,
{
    let exists = expense::Entity::find()
        .filter(expense::Column::PurchaseId.eq(purchase.id))
        .one(conn)
        .await?
        .is_some();
    if exists {
        return Ok(());
    }

    expense::ActiveModel {
        id: Set(Uuid::new_v4()),
        customer_id: Set(purchase.customer_id),
        purchase_id: Set(Some(purchase.id)),
        description: Set(format!("Purchase invoice {}", purchase.invoice_number)),
        amount: Set(purchase.total),
        bank_account_id: Set(purchase.bank_account_id),
        paid_at: Set(Utc::now()),
    }
    .insert(conn)
    .await?;
    Ok(())
}

async fn apply_payment<C>(
    conn: &C,
    purchase: purchase::Model,
    payment_status: PaymentStatus,
    bank_account_id: Option<Uuid>,
) -> Result<purchase::Model, ServiceError>
where
    C: ConnectionTrait,
{
    let paid = payment_status == PaymentStatus::Paid;
    let mut active = purchase.into_active_model();
    active.status = Set(if paid {
        PurchaseStatus::Paid
    } else {
        PurchaseStatus::Pending
    });
    active.bank_account_id = Set(if paid { bank_account_id } else { None });
    active.updated_at = Set(Some(Utc::now()));
    let updated = active.update(conn).await?;

    if paid {
        ensure_expense(conn, &updated).await?;
    } else {
        expense::Entity::delete_many()
            .filter(expense::Column::PurchaseId.eq(updated.id))
            .exec(conn)
            .await?;
    }
    Ok(updated)
}

/// Mirrors a delivered order into the customer's purchases and inventory.
///
/// Runs inside the caller's transaction. A purchase that already exists for
/// the order only has its payment state refreshed.
#[instrument(skip(conn, order, items), fields(order_id = %order.id))]
pub async fn mirror_delivery<C>(
    conn: &C,
    order: &order::Model,
    items: &[order_item::Model],
    payment_status: PaymentStatus,
    bank_account_id: Option<Uuid>,
    factory_supplier_name: &str,
) -> Result<DeliveryOutcome, ServiceError>
where
    C: ConnectionTrait,
{
    let supplier = find_or_create_factory_supplier(conn, factory_supplier_name).await?;

    if let Some(existing) = find_mirrored_purchase(conn, order).await? {
        let purchase = apply_payment(conn, existing, payment_status, bank_account_id).await?;
        debug!(purchase_id = %purchase.id, "order already mirrored");
        return Ok(DeliveryOutcome {
            purchase_id: purchase.id,
            purchase_created: false,
            lines_mirrored: 0,
            units_received: 0,
        });
    }

    let now = Utc::now();
    let purchase = purchase::ActiveModel {
        id: Set(Uuid::new_v4()),
        customer_id: Set(order.customer_id),
        supplier_id: Set(supplier.id),
        invoice_number: Set(order.order_number.to_string()),
        order_id: Set(Some(order.id)),
        total: Set(order.total),
        status: Set(PurchaseStatus::Pending),
        bank_account_id: Set(None),
        purchased_at: Set(now),
        created_at: Set(now),
        updated_at: Set(None),
    }
    .insert(conn)
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to create mirrored purchase");
        ServiceError::DatabaseError(e)
    })?;

    let mut units_received = 0i64;
    for item in items {
        let product = find_or_create_client_product(conn, order.customer_id, item).await?;
        let inventory = find_or_create_inventory(conn, order.customer_id, product.id).await?;

        let stock = inventory.current_stock + item.quantity;
        let inventory_id = inventory.id;
        let mut active = inventory.into_active_model();
        active.current_stock = Set(stock);
        active.updated_at = Set(now);
        active.update(conn).await?;

        purchase_item::ActiveModel {
            id: Set(Uuid::new_v4()),
            purchase_id: Set(purchase.id),
            client_product_id: Set(product.id),
            quantity: Set(item.quantity),
            unit_cost: Set(item.unit_price),
            total_cost: Set(item.total_price),
        }
        .insert(conn)
        .await?;

        client_inventory_movement::ActiveModel {
            id: Set(Uuid::new_v4()),
            client_inventory_id: Set(inventory_id),
            kind: Set(MovementKind::Entry),
            quantity: Set(item.quantity),
            reason: Set(format!("Order {} delivered", order.number_tag())),
            reference_id: Set(Some(order.id)),
            created_at: Set(now),
        }
        .insert(conn)
        .await?;

        units_received += i64::from(item.quantity);
    }

    let purchase = apply_payment(conn, purchase, payment_status, bank_account_id).await?;
    info!(
        purchase_id = %purchase.id,
        lines = items.len(),
        units = units_received,
        "delivery mirrored into customer inventory"
    );

    Ok(DeliveryOutcome {
        purchase_id: purchase.id,
        purchase_created: true,
        lines_mirrored: items.len(),
        units_received,
    })
}

/// Mirrors a payment change onto an existing purchase. Returns whether one existed.
pub async fn mirror_payment<C>(
    conn: &C,
    order: &order::Model,
    payment_status: PaymentStatus,
    bank_account_id: Option<Uuid>,
) -> Result<bool, ServiceError>
where
    C: ConnectionTrait,
{
    match find_mirrored_purchase(conn, order).await? {
        Some(existing) => {
            let purchase = apply_payment(conn, existing, payment_status, bank_account_id).await?;
            debug!(purchase_id = %purchase.id, status = %purchase.status, "purchase payment mirrored");
            Ok(true)
        }
        None => Ok(false),
    }
}
