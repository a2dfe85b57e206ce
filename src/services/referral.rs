use crate::{
    db::DbPool,
    entities::{customer, order, point_transaction, PointKind},
    errors::ServiceError,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, IntoActiveModel, QueryFilter, Set,
    TransactionTrait,
};
use tracing::{error, info, instrument};
use uuid::Uuid;

/// Adds `delta` to both point balances, never going below zero.
pub async fn adjust_points<C>(conn: &C, customer_id: Uuid, delta: i64) -> Result<(), ServiceError>
where
    C: ConnectionTrait,
{
    let Some(customer) = customer::Entity::find_by_id(customer_id).one(conn).await? else {
        return Ok(());
    };

    let balance = (customer.points_balance + delta).max(0);
    let lifetime = (customer.lifetime_points + delta).max(0);
    let mut active = customer.into_active_model();
    active.points_balance = Set(balance);
    active.lifetime_points = Set(lifetime);
    active.update(conn).await?;
    Ok(())
}

/// Credits the referrer of the order's customer once per order.
///
/// Returns the point transaction written, or `None` when the customer has no
/// referrer or the bonus was already awarded.
#[instrument(skip(db, order), fields(order_id = %order.id))]
pub async fn award_referral_bonus(
    db: &DbPool,
    order: &order::Model,
    points: i64,
) -> Result<Option<point_transaction::Model>, ServiceError> {
    if points <= 0 {
        return Ok(None);
    }

    let customer = customer::Entity::find_by_id(order.customer_id)
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Customer {} not found", order.customer_id)))?;

    let Some(referrer_id) = customer.referred_by_id else {
        return Ok(None);
    };

    let already_awarded = point_transaction::Entity::find()
        .filter(point_transaction::Column::OrderId.eq(order.id))
        .filter(point_transaction::Column::Kind.eq(PointKind::ReferralBonus))
        .one(db)
        .await?
        .is_some();
    if already_awarded {
        return Ok(None);
    }

    let txn = db.begin().await.map_err(|e| {
        error!(error = %e, "Failed to start transaction for referral bonus");
        ServiceError::DatabaseError(e)
    })?;

    let awarded = point_transaction::ActiveModel {
        id: Set(Uuid::new_v4()),
        customer_id: Set(referrer_id),
        order_id: Set(Some(order.id)),
        kind: Set(PointKind::ReferralBonus),
        points: Set(points),
        description: Set(format!(
            "Referral bonus: {} order {} delivered",
            customer.name,
            order.number_tag()
        )),
        created_at: Set(Utc::now()),
    }
    .insert(&txn)
    .await?;
    adjust_points(&txn, referrer_id, points).await?;

    txn.commit().await.map_err(|e| {
        error!(error = %e, "Failed to commit referral bonus");
        ServiceError::DatabaseError(e)
    })?;

    info!(referrer_id = %referrer_id, points, "referral bonus awarded");
    Ok(Some(awarded))
}
