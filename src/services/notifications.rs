use crate::{
    db::DbPool,
    entities::{customer, notification, order, seller, NotificationCategory, RecipientType},
    errors::ServiceError,
    gateways::WhatsAppService,
};
use chrono::Utc;
use futures::future::join_all;
use metrics::counter;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct DispatchNotificationRequest {
    pub category: NotificationCategory,
    #[validate(length(min = 1, max = 200, message = "Title must be between 1 and 200 characters"))]
    pub title: String,
    #[validate(length(min = 1, max = 4000, message = "Message must be between 1 and 4000 characters"))]
    pub message: String,
    pub customer_id: Option<Uuid>,
    pub seller_id: Option<Uuid>,
    #[serde(default)]
    pub send_whatsapp: bool,
}

#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct DispatchSummary {
    pub notifications_created: usize,
    pub whatsapp_sent: usize,
    pub whatsapp_failed: usize,
    /// Recipients without a phone number
    pub whatsapp_skipped: usize,
}

struct Recipient {
    kind: RecipientType,
    id: Uuid,
    phone: Option<String>,
}

impl From<customer::Model> for Recipient {
    fn from(model: customer::Model) -> Self {
        Self {
            kind: RecipientType::Customer,
            id: model.id,
            phone: model.phone,
        }
    }
}

impl From<seller::Model> for Recipient {
    fn from(model: seller::Model) -> Self {
        Self {
            kind: RecipientType::Seller,
            id: model.id,
            phone: model.phone,
        }
    }
}

/// Fans messages out to customers and sellers.
#[derive(Clone)]
pub struct NotificationService {
    db: Arc<DbPool>,
    whatsapp: Option<Arc<WhatsAppService>>,
}

impl NotificationService {
    pub fn new(db: Arc<DbPool>, whatsapp: Option<Arc<WhatsAppService>>) -> Self {
        Self { db, whatsapp }
    }

    async fn resolve_recipients(
        &self,
        request: &DispatchNotificationRequest,
    ) -> Result<Vec<Recipient>, ServiceError> {
        let db = &*self.db;
        let mut recipients = Vec::new();

        match request.category {
            NotificationCategory::OrderUpdate | NotificationCategory::Payment => {
                if request.customer_id.is_none() && request.seller_id.is_none() {
                    return Err(ServiceError::ValidationError(format!(
                        "{} notifications need a customer_id or seller_id",
                        request.category
                    )));
                }
                if let Some(customer_id) = request.customer_id {
                    let customer = customer::Entity::find_by_id(customer_id)
                        .one(db)
                        .await?
                        .ok_or_else(|| {
                            ServiceError::NotFound(format!("Customer {} not found", customer_id))
                        })?;
                    recipients.push(customer.into());
                }
                if let Some(seller_id) = request.seller_id {
                    let seller = seller::Entity::find_by_id(seller_id)
                        .one(db)
                        .await?
                        .ok_or_else(|| {
                            ServiceError::NotFound(format!("Seller {} not found", seller_id))
                        })?;
                    recipients.push(seller.into());
                }
            }
            NotificationCategory::Promotion => {
                recipients.extend(self.active_customers().await?);
            }
            NotificationCategory::SellerNotice => {
                recipients.extend(self.active_sellers().await?);
            }
            NotificationCategory::Announcement => {
                recipients.extend(self.active_customers().await?);
                recipients.extend(self.active_sellers().await?);
            }
        }

        Ok(recipients)
    }

    async fn active_customers(&self) -> Result<Vec<Recipient>, ServiceError> {
        Ok(customer::Entity::find()
            .filter(customer::Column::Active.eq(true))
            .all(&*self.db)
            .await?
            .into_iter()
            .map(Recipient::from)
            .collect())
    }

    async fn active_sellers(&self) -> Result<Vec<Recipient>, ServiceError> {
        Ok(seller::Entity::find()
            .filter(seller::Column::Active.eq(true))
            .all(&*self.db)
            .await?
            .into_iter()
            .map(Recipient::from)
            .collect())
    }

    /// Writes one notification per recipient, then optionally sends WhatsApp
    /// messages. WhatsApp failures are counted, never raised.
    #[instrument(skip(self, request), fields(category = %request.category))]
    pub async fn dispatch(
        &self,
        request: DispatchNotificationRequest,
    ) -> Result<DispatchSummary, ServiceError> {
        request.validate()?;
        let recipients = self.resolve_recipients(&request).await?;

        let txn = self.db.begin().await.map_err(|e| {
            error!(error = %e, "Failed to start transaction for notification dispatch");
            ServiceError::DatabaseError(e)
        })?;
        let now = Utc::now();
        for recipient in &recipients {
            notification::ActiveModel {
                id: Set(Uuid::new_v4()),
                recipient_type: Set(recipient.kind),
                recipient_id: Set(recipient.id),
                category: Set(request.category),
                title: Set(request.title.clone()),
                message: Set(request.message.clone()),
                is_read: Set(false),
                created_at: Set(now),
            }
            .insert(&txn)
            .await?;
        }
        txn.commit().await.map_err(|e| {
            error!(error = %e, "Failed to commit notifications");
            ServiceError::DatabaseError(e)
        })?;

        let mut summary = DispatchSummary {
            notifications_created: recipients.len(),
            ..Default::default()
        };

        if request.send_whatsapp {
            self.send_whatsapp(&recipients, &request, &mut summary).await;
        }

        info!(
            created = summary.notifications_created,
            whatsapp_sent = summary.whatsapp_sent,
            whatsapp_failed = summary.whatsapp_failed,
            "notifications dispatched"
        );
        Ok(summary)
    }

    async fn send_whatsapp(
        &self,
        recipients: &[Recipient],
        request: &DispatchNotificationRequest,
        summary: &mut DispatchSummary,
    ) {
        let Some(whatsapp) = self.whatsapp.as_ref().filter(|w| w.is_configured()) else {
            summary.whatsapp_skipped = recipients.len();
            return;
        };

        let text = format!("*{}*\n{}", request.title, request.message);
        let sends = recipients
            .iter()
            .filter_map(|r| r.phone.as_deref().map(|phone| (r.id, phone)))
            .map(|(id, phone)| {
                let text = &text;
                async move { (id, whatsapp.send_text(phone, text).await) }
            });
        let results = join_all(sends).await;

        summary.whatsapp_skipped = recipients.len() - results.len();
        for (recipient_id, result) in results {
            match result {
                Ok(_) => summary.whatsapp_sent += 1,
                Err(e) => {
                    summary.whatsapp_failed += 1;
                    counter!("notifications.whatsapp_failures", 1);
                    warn!(recipient_id = %recipient_id, error = %e, "whatsapp notification failed");
                }
            }
        }
    }

    /// Best-effort status notice to the order's customer.
    pub async fn notify_order_update(&self, order: &order::Model) {
        let request = DispatchNotificationRequest {
            category: NotificationCategory::OrderUpdate,
            title: format!("Order {} updated", order.number_tag()),
            message: format!(
                "Your order {} is now {}. Payment: {}.",
                order.number_tag(),
                order.status,
                order.payment_status
            ),
            customer_id: Some(order.customer_id),
            seller_id: None,
            send_whatsapp: self
                .whatsapp
                .as_ref()
                .map(|w| w.is_configured())
                .unwrap_or(false),
        };

        if let Err(e) = self.dispatch(request).await {
            counter!("notifications.order_update_failures", 1);
            warn!(order_id = %order.id, error = %e, "order update notification failed");
        }
    }

    #[instrument(skip(self))]
    pub async fn list_for_recipient(
        &self,
        recipient_type: RecipientType,
        recipient_id: Uuid,
        unread_only: bool,
    ) -> Result<Vec<notification::Model>, ServiceError> {
        let mut query = notification::Entity::find()
            .filter(notification::Column::RecipientType.eq(recipient_type))
            .filter(notification::Column::RecipientId.eq(recipient_id));
        if unread_only {
            query = query.filter(notification::Column::IsRead.eq(false));
        }
        Ok(query
            .order_by_desc(notification::Column::CreatedAt)
            .all(&*self.db)
            .await?)
    }

    #[instrument(skip(self))]
    pub async fn mark_read(&self, id: Uuid) -> Result<notification::Model, ServiceError> {
        let existing = notification::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Notification {} not found", id)))?;
        if existing.is_read {
            return Ok(existing);
        }
        let mut active = existing.into_active_model();
        active.is_read = Set(true);
        Ok(active.update(&*self.db).await?)
    }
}
