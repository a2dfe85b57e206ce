//! Hard deletion of an order and everything it produced downstream.

use crate::{
    db::DbPool,
    entities::{
        boleto, client_inventory, client_inventory_movement, expense, order, order_item,
        point_transaction, purchase, purchase_item, receivable, transaction, BoletoStatus,
        MovementKind, PaymentStatus, ReferenceType,
    },
    errors::ServiceError,
    gateways::PaymentGateway,
    services::{
        boletos::{cancel_open_at_gateway, mark_cancelled},
        credit,
        ledger::{mentions_order_number, reverse_transaction},
        purchases::find_mirrored_purchase,
        referral::adjust_points,
    },
};
use chrono::Utc;
use metrics::counter;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, IntoActiveModel, QueryFilter, Set,
    TransactionTrait,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error, info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct DeletionSummary {
    pub order_id: Uuid,
    pub order_number: i64,
    pub credit_restored: Decimal,
    pub boletos_cancelled: usize,
    pub boletos_detached: usize,
    pub gateway_cancel_failures: usize,
    pub points_reverted: i64,
    pub purchase_deleted: bool,
    pub inventory_units_reverted: i64,
    pub transactions_reversed: usize,
    pub receivables_deleted: u64,
}

#[derive(Clone)]
pub struct OrderDeletionService {
    db: Arc<DbPool>,
    gateway: Arc<dyn PaymentGateway>,
}

impl OrderDeletionService {
    pub fn new(db: Arc<DbPool>, gateway: Arc<dyn PaymentGateway>) -> Self {
        Self { db, gateway }
    }

    /// Deletes the order, reverting credit, boletos, points, the mirrored
    /// purchase, client stock and bank transactions.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn delete_order(&self, order_id: Uuid) -> Result<DeletionSummary, ServiceError> {
        let db = &*self.db;
        let order = order::Entity::find_by_id(order_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        let boletos = boleto::Entity::find()
            .filter(boleto::Column::OrderId.eq(order_id))
            .all(db)
            .await?;
        let gateway_cancel_failures = cancel_open_at_gateway(self.gateway.as_ref(), &boletos).await;

        let txn = db.begin().await.map_err(|e| {
            error!(error = %e, "Failed to start transaction for order deletion");
            ServiceError::DatabaseError(e)
        })?;

        let mut summary = DeletionSummary {
            order_id,
            order_number: order.order_number,
            gateway_cancel_failures,
            ..Default::default()
        };

        if order.payment_status != PaymentStatus::Paid {
            // Slips cancelled with the order already gave their share back
            let already_released: Decimal = boletos
                .iter()
                .filter(|b| b.status == BoletoStatus::Cancelled)
                .map(|b| b.amount)
                .sum();
            let restore = (order.total - already_released).max(Decimal::ZERO);
            if !restore.is_zero() {
                credit::credit(&txn, order.customer_id, restore).await?;
            }
            summary.credit_restored = restore;
        }

        summary.boletos_cancelled = boletos
            .iter()
            .filter(|b| b.status.is_outstanding())
            .count();
        mark_cancelled(&txn, &boletos).await?;
        summary.boletos_detached = detach_boletos(&txn, order_id).await?;

        summary.points_reverted = revert_points(&txn, order_id).await?;
        summary.purchase_deleted = delete_mirrored_purchase(&txn, &order).await?;
        summary.inventory_units_reverted = revert_inventory(&txn, &order).await?;

        let receivable_ids: Vec<Uuid> = receivable::Entity::find()
            .filter(receivable::Column::OrderId.eq(order_id))
            .all(&txn)
            .await?
            .into_iter()
            .map(|r| r.id)
            .collect();
        summary.transactions_reversed = reverse_order_transactions(&txn, &order, &receivable_ids).await?;

        summary.receivables_deleted = receivable::Entity::delete_many()
            .filter(receivable::Column::OrderId.eq(order_id))
            .exec(&txn)
            .await?
            .rows_affected;
        order_item::Entity::delete_many()
            .filter(order_item::Column::OrderId.eq(order_id))
            .exec(&txn)
            .await?;
        order::Entity::delete_by_id(order_id).exec(&txn).await?;

        txn.commit().await.map_err(|e| {
            error!(error = %e, "Failed to commit order deletion");
            ServiceError::DatabaseError(e)
        })?;

        counter!("orders.deleted", 1);
        info!(
            order_number = order.order_number,
            credit_restored = %summary.credit_restored,
            transactions_reversed = summary.transactions_reversed,
            "order deleted"
        );
        Ok(summary)
    }
}

/// Keeps every slip but unlinks it from the order.
async fn detach_boletos<C>(conn: &C, order_id: Uuid) -> Result<usize, ServiceError>
where
    C: ConnectionTrait,
{
    let slips = boleto::Entity::find()
        .filter(boleto::Column::OrderId.eq(order_id))
        .all(conn)
        .await?;
    let count = slips.len();
    for slip in slips {
        let mut active = slip.into_active_model();
        active.order_id = Set(None);
        active.update(conn).await?;
    }
    Ok(count)
}

async fn revert_points<C>(conn: &C, order_id: Uuid) -> Result<i64, ServiceError>
where
    C: ConnectionTrait,
{
    let awarded = point_transaction::Entity::find()
        .filter(point_transaction::Column::OrderId.eq(order_id))
        .all(conn)
        .await?;

    let mut reverted = 0;
    for entry in awarded {
        adjust_points(conn, entry.customer_id, -entry.points).await?;
        point_transaction::Entity::delete_by_id(entry.id)
            .exec(conn)
            .await?;
        reverted += entry.points;
    }
    Ok(reverted)
}

async fn delete_mirrored_purchase<C>(conn: &C, order: &order::Model) -> Result<bool, ServiceError>
where
    C: ConnectionTrait,
{
    let Some(mirrored) = find_mirrored_purchase(conn, order).await? else {
        return Ok(false);
    };

    purchase_item::Entity::delete_many()
        .filter(purchase_item::Column::PurchaseId.eq(mirrored.id))
        .exec(conn)
        .await?;
    expense::Entity::delete_many()
        .filter(expense::Column::PurchaseId.eq(mirrored.id))
        .exec(conn)
        .await?;
    purchase::Entity::delete_by_id(mirrored.id).exec(conn).await?;
    debug!(purchase_id = %mirrored.id, "mirrored purchase deleted");
    Ok(true)
}

/// Takes back the stock each ENTRY movement added, never below zero.
async fn revert_inventory<C>(conn: &C, order: &order::Model) -> Result<i64, ServiceError>
where
    C: ConnectionTrait,
{
    let entries = client_inventory_movement::Entity::find()
        .filter(client_inventory_movement::Column::ReferenceId.eq(order.id))
        .filter(client_inventory_movement::Column::Kind.eq(MovementKind::Entry))
        .all(conn)
        .await?;

    let now = Utc::now();
    let mut reverted = 0i64;
    for entry in entries {
        let Some(inventory) = client_inventory::Entity::find_by_id(entry.client_inventory_id)
            .one(conn)
            .await?
        else {
            continue;
        };

        let remaining = (inventory.current_stock - entry.quantity).max(0);
        let removed = inventory.current_stock - remaining;
        if removed == 0 {
            continue;
        }

        let mut active = inventory.into_active_model();
        active.current_stock = Set(remaining);
        active.updated_at = Set(now);
        active.update(conn).await?;

        client_inventory_movement::ActiveModel {
            id: Set(Uuid::new_v4()),
            client_inventory_id: Set(entry.client_inventory_id),
            kind: Set(MovementKind::Exit),
            quantity: Set(removed),
            reason: Set(format!("Order {} deleted", order.number_tag())),
            reference_id: Set(Some(order.id)),
            created_at: Set(now),
        }
        .insert(conn)
        .await?;
        reverted += i64::from(removed);
    }
    Ok(reverted)
}

/// Reverses every bank transaction tied to the order, either by its `#N`
/// tag or by reference to the order or its receivables.
async fn reverse_order_transactions<C>(
    conn: &C,
    order: &order::Model,
    receivable_ids: &[Uuid],
) -> Result<usize, ServiceError>
where
    C: ConnectionTrait,
{
    let mut found: BTreeMap<Uuid, transaction::Model> = BTreeMap::new();

    let tagged = transaction::Entity::find()
        .filter(transaction::Column::Description.contains(order.number_tag()))
        .all(conn)
        .await?;
    for tx in tagged
        .into_iter()
        .filter(|tx| mentions_order_number(&tx.description, order.order_number))
    {
        found.insert(tx.id, tx);
    }

    let mut referenced_ids = vec![order.id];
    referenced_ids.extend_from_slice(receivable_ids);
    let referenced = transaction::Entity::find()
        .filter(transaction::Column::ReferenceId.is_in(referenced_ids))
        .filter(
            transaction::Column::ReferenceType
                .is_in([ReferenceType::Order, ReferenceType::Receivable]),
        )
        .all(conn)
        .await?;
    for tx in referenced {
        found.entry(tx.id).or_insert(tx);
    }

    for tx in found.values() {
        reverse_transaction(conn, tx).await?;
    }
    Ok(found.len())
}
