use crate::{
    entities::{
        order, order_item, order_refund, order_status_history, Order, OrderItem, OrderItemModel,
        OrderModel, OrderRefund, OrderRefundModel, OrderStatus, OrderStatusHistory,
        OrderStatusHistoryModel, PaymentStatus, Product, RefundKind, RefundStatus, StockEntryKind,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::inventory::{InventoryService, RecordStockInput},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveEnum, ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

const DEFAULT_PAGE_SIZE: u64 = 20;
const MAX_PAGE_SIZE: u64 = 100;

/// Order lifecycle after checkout: customer views and cancellation, admin
/// transitions and batches, refunds.
///
/// Every status change is validated against the lifecycle graph on the
/// order entity. Customer lookups are scoped by owner and miss as
/// not-found, never as forbidden.
#[derive(Clone)]
pub struct OrderService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    inventory: Arc<InventoryService>,
}

impl OrderService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        inventory: Arc<InventoryService>,
    ) -> Self {
        Self {
            db,
            event_sender,
            inventory,
        }
    }

    #[instrument(skip(self))]
    pub async fn list_orders_for_user(
        &self,
        user_id: Uuid,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<OrderModel>, u64), ServiceError> {
        let page = page.max(1);
        let per_page = if per_page == 0 {
            DEFAULT_PAGE_SIZE
        } else {
            per_page.min(MAX_PAGE_SIZE)
        };

        let paginator = Order::find()
            .filter(order::Column::UserId.eq(user_id))
            .order_by_desc(order::Column::CreatedAt)
            .paginate(&*self.db, per_page);
        let total = paginator.num_items().await?;
        let orders = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((orders, total))
    }

    #[instrument(skip(self))]
    pub async fn get_order_for_user(
        &self,
        user_id: Uuid,
        order_number: &str,
    ) -> Result<OrderDetail, ServiceError> {
        let order = Order::find()
            .filter(order::Column::OrderNumber.eq(order_number))
            .filter(order::Column::UserId.eq(user_id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Order not found".to_string()))?;

        let items = OrderItem::find()
            .filter(order_item::Column::OrderId.eq(order.id))
            .all(&*self.db)
            .await?;
        let history = self.history_for(order.id).await?;

        Ok(OrderDetail {
            order,
            items,
            history,
        })
    }

    /// Public tracking by order number. When the caller is authenticated
    /// the order must be theirs; a mismatch reads as not-found so order
    /// numbers cannot be probed.
    #[instrument(skip(self))]
    pub async fn track_order(
        &self,
        order_number: &str,
        viewer: Option<Uuid>,
    ) -> Result<OrderTracking, ServiceError> {
        let order = Order::find()
            .filter(order::Column::OrderNumber.eq(order_number))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Order not found".to_string()))?;

        if let Some(viewer) = viewer {
            if order.user_id != viewer {
                return Err(ServiceError::NotFound("Order not found".to_string()));
            }
        }

        let history = self.history_for(order.id).await?;
        let timeline = history
            .into_iter()
            .map(|entry| TrackingStep {
                status: entry.to_status,
                note: entry.note,
                happened_at: entry.created_at,
            })
            .collect();

        Ok(OrderTracking {
            order_number: order.order_number,
            status: order.status,
            payment_status: order.payment_status,
            estimated_delivery: order.estimated_delivery,
            actual_delivery: order.actual_delivery,
            timeline,
        })
    }

    /// Customer cancellation. Allowed while the order is PENDING or
    /// CONFIRMED and unpaid; restores stock for tracked products in the
    /// same transaction.
    #[instrument(skip(self))]
    pub async fn cancel_order(
        &self,
        user_id: Uuid,
        order_number: &str,
    ) -> Result<OrderModel, ServiceError> {
        let order = Order::find()
            .filter(order::Column::OrderNumber.eq(order_number))
            .filter(order::Column::UserId.eq(user_id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Order not found".to_string()))?;

        if !order.can_be_cancelled() {
            return Err(ServiceError::InvalidOperation(
                "This order cannot be cancelled".to_string(),
            ));
        }

        let items = OrderItem::find()
            .filter(order_item::Column::OrderId.eq(order.id))
            .all(&*self.db)
            .await?;

        let txn = self.db.begin().await?;
        let now = Utc::now();
        let from_status = order.status;
        let order_id = order.id;
        let reference = order.order_number.clone();

        let mut active: order::ActiveModel = order.into();
        active.status = Set(OrderStatus::Cancelled);
        active.updated_at = Set(now);
        let cancelled = active.update(&txn).await?;

        let history = order_status_history::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(order_id),
            from_status: Set(Some(from_status)),
            to_status: Set(OrderStatus::Cancelled),
            note: Set(Some("Cancelled by customer".to_string())),
            changed_by: Set(Some(user_id)),
            created_at: Set(now),
        };
        history.insert(&txn).await?;

        for item in &items {
            let Some(product) = Product::find_by_id(item.product_id).one(&txn).await? else {
                continue;
            };
            if !product.track_inventory {
                continue;
            }
            self.inventory
                .record_movement_on(
                    &txn,
                    product.id,
                    RecordStockInput {
                        kind: StockEntryKind::Return,
                        quantity: item.quantity,
                        reference: Some(reference.clone()),
                    },
                    Some(user_id),
                )
                .await?;
        }

        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::OrderCancelled(order_id))
            .await;

        info!("Order {} cancelled by customer {}", reference, user_id);
        Ok(cancelled)
    }

    #[instrument(skip(self))]
    pub async fn list_orders_admin(
        &self,
        query: AdminOrderListQuery,
    ) -> Result<(Vec<OrderModel>, u64), ServiceError> {
        let page = query.page();
        let per_page = query.per_page();

        let mut select = Order::find();
        if let Some(status) = query.status {
            select = select.filter(order::Column::Status.eq(status));
        }

        let paginator = select
            .order_by_desc(order::Column::CreatedAt)
            .paginate(&*self.db, per_page);
        let total = paginator.num_items().await?;
        let orders = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((orders, total))
    }

    /// Admin single-order transition, validated against the lifecycle
    /// graph. Appends a history row and stamps the processing admin.
    #[instrument(skip(self))]
    pub async fn update_order_status(
        &self,
        admin_id: Uuid,
        order_id: Uuid,
        input: UpdateOrderStatusInput,
    ) -> Result<OrderModel, ServiceError> {
        let order = Order::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Order not found".to_string()))?;

        let from_status = order.status;
        if !from_status.can_transition_to(input.status) {
            return Err(ServiceError::InvalidOperation(format!(
                "Invalid status transition from {} to {}",
                from_status.to_value(),
                input.status.to_value()
            )));
        }

        let txn = self.db.begin().await?;
        let now = Utc::now();

        let mut active: order::ActiveModel = order.into();
        active.status = Set(input.status);
        active.processed_by = Set(Some(admin_id));
        active.processed_at = Set(Some(now));
        if input.status == OrderStatus::Delivered {
            active.actual_delivery = Set(Some(now));
        }
        active.updated_at = Set(now);
        let updated = active.update(&txn).await?;

        let history = order_status_history::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(order_id),
            from_status: Set(Some(from_status)),
            to_status: Set(input.status),
            note: Set(input.note),
            changed_by: Set(Some(admin_id)),
            created_at: Set(now),
        };
        history.insert(&txn).await?;

        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::OrderStatusChanged {
                order_id,
                old_status: from_status.to_value(),
                new_status: input.status.to_value(),
            })
            .await;
        if input.status == OrderStatus::Delivered {
            self.event_sender
                .send_or_log(Event::OrderDelivered(order_id))
                .await;
        }

        info!(
            "Order {} moved {} -> {} by admin {}",
            order_id,
            from_status.to_value(),
            input.status.to_value(),
            admin_id
        );
        Ok(updated)
    }

    /// Confirms every listed order still in PENDING; others are skipped.
    /// Returns how many were confirmed.
    #[instrument(skip(self))]
    pub async fn batch_confirm(
        &self,
        admin_id: Uuid,
        order_ids: Vec<Uuid>,
    ) -> Result<u64, ServiceError> {
        let mut updated = 0u64;
        for order_id in order_ids {
            let Some(order) = Order::find_by_id(order_id).one(&*self.db).await? else {
                continue;
            };
            if order.status != OrderStatus::Pending {
                continue;
            }

            let txn = self.db.begin().await?;
            let now = Utc::now();

            let mut active: order::ActiveModel = order.into();
            active.status = Set(OrderStatus::Confirmed);
            active.processed_by = Set(Some(admin_id));
            active.processed_at = Set(Some(now));
            active.updated_at = Set(now);
            active.update(&txn).await?;

            let history = order_status_history::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_id),
                from_status: Set(Some(OrderStatus::Pending)),
                to_status: Set(OrderStatus::Confirmed),
                note: Set(Some("Order confirmed".to_string())),
                changed_by: Set(Some(admin_id)),
                created_at: Set(now),
            };
            history.insert(&txn).await?;

            txn.commit().await?;

            self.event_sender
                .send_or_log(Event::OrderStatusChanged {
                    order_id,
                    old_status: OrderStatus::Pending.to_value(),
                    new_status: OrderStatus::Confirmed.to_value(),
                })
                .await;
            updated += 1;
        }

        info!("Batch confirmed {} orders", updated);
        Ok(updated)
    }

    /// Ships every listed order in CONFIRMED or PROCESSING. Writes no
    /// history rows.
    #[instrument(skip(self))]
    pub async fn batch_ship(
        &self,
        admin_id: Uuid,
        order_ids: Vec<Uuid>,
    ) -> Result<u64, ServiceError> {
        let mut updated = 0u64;
        for order_id in order_ids {
            let Some(order) = Order::find_by_id(order_id).one(&*self.db).await? else {
                continue;
            };
            if !matches!(
                order.status,
                OrderStatus::Confirmed | OrderStatus::Processing
            ) {
                continue;
            }
            let from_status = order.status;
            let now = Utc::now();

            let mut active: order::ActiveModel = order.into();
            active.status = Set(OrderStatus::Shipped);
            active.processed_by = Set(Some(admin_id));
            active.processed_at = Set(Some(now));
            active.updated_at = Set(now);
            active.update(&*self.db).await?;

            self.event_sender
                .send_or_log(Event::OrderStatusChanged {
                    order_id,
                    old_status: from_status.to_value(),
                    new_status: OrderStatus::Shipped.to_value(),
                })
                .await;
            updated += 1;
        }

        info!("Batch shipped {} orders", updated);
        Ok(updated)
    }

    /// Marks every listed order in OUT_FOR_DELIVERY as delivered, stamping
    /// the actual delivery time. Writes no history rows.
    #[instrument(skip(self))]
    pub async fn batch_deliver(
        &self,
        admin_id: Uuid,
        order_ids: Vec<Uuid>,
    ) -> Result<u64, ServiceError> {
        let mut updated = 0u64;
        for order_id in order_ids {
            let Some(order) = Order::find_by_id(order_id).one(&*self.db).await? else {
                continue;
            };
            if order.status != OrderStatus::OutForDelivery {
                continue;
            }
            let now = Utc::now();

            let mut active: order::ActiveModel = order.into();
            active.status = Set(OrderStatus::Delivered);
            active.processed_by = Set(Some(admin_id));
            active.processed_at = Set(Some(now));
            active.actual_delivery = Set(Some(now));
            active.updated_at = Set(now);
            active.update(&*self.db).await?;

            self.event_sender
                .send_or_log(Event::OrderStatusChanged {
                    order_id,
                    old_status: OrderStatus::OutForDelivery.to_value(),
                    new_status: OrderStatus::Delivered.to_value(),
                })
                .await;
            self.event_sender
                .send_or_log(Event::OrderDelivered(order_id))
                .await;
            updated += 1;
        }

        info!("Batch delivered {} orders", updated);
        Ok(updated)
    }

    /// Customer refund request on a paid, delivered or returned order.
    /// The amount defaults to the order total and must not exceed it.
    #[instrument(skip(self, input))]
    pub async fn request_refund(
        &self,
        user_id: Uuid,
        order_number: &str,
        input: RequestRefundInput,
    ) -> Result<OrderRefundModel, ServiceError> {
        input.validate()?;

        let order = Order::find()
            .filter(order::Column::OrderNumber.eq(order_number))
            .filter(order::Column::UserId.eq(user_id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Order not found".to_string()))?;

        let eligible = order.payment_status == PaymentStatus::Paid
            && matches!(
                order.status,
                OrderStatus::Delivered | OrderStatus::Returned
            );
        if !eligible {
            return Err(ServiceError::InvalidOperation(
                "This order is not eligible for a refund".to_string(),
            ));
        }

        let amount = input.amount.unwrap_or(order.total_amount);
        if amount <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Refund amount must be positive".to_string(),
            ));
        }
        if amount > order.total_amount {
            return Err(ServiceError::ValidationError(
                "Refund amount cannot exceed the order total".to_string(),
            ));
        }

        let open = OrderRefund::find()
            .filter(order_refund::Column::OrderId.eq(order.id))
            .filter(
                order_refund::Column::Status
                    .is_in([RefundStatus::Requested, RefundStatus::Approved]),
            )
            .one(&*self.db)
            .await?;
        if open.is_some() {
            return Err(ServiceError::Conflict(
                "A refund is already in progress for this order".to_string(),
            ));
        }

        let kind = if amount == order.total_amount {
            RefundKind::Full
        } else {
            RefundKind::Partial
        };

        let now = Utc::now();
        let refund = order_refund::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            status: Set(RefundStatus::Requested),
            kind: Set(kind),
            amount: Set(amount),
            reason: Set(input.reason),
            decided_by: Set(None),
            decided_at: Set(None),
            decision_note: Set(None),
            reference: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let refund = refund.insert(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::RefundRequested(refund.id))
            .await;

        info!(
            "Refund of {} requested for order {} by user {}",
            amount, order.order_number, user_id
        );
        Ok(refund)
    }

    /// Approves or rejects a requested refund.
    #[instrument(skip(self))]
    pub async fn decide_refund(
        &self,
        admin_id: Uuid,
        refund_id: Uuid,
        approve: bool,
        note: Option<String>,
    ) -> Result<OrderRefundModel, ServiceError> {
        let refund = OrderRefund::find_by_id(refund_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Refund not found".to_string()))?;

        if refund.status != RefundStatus::Requested {
            return Err(ServiceError::InvalidOperation(
                "Refund has already been decided".to_string(),
            ));
        }

        let status = if approve {
            RefundStatus::Approved
        } else {
            RefundStatus::Rejected
        };
        let now = Utc::now();

        let mut active: order_refund::ActiveModel = refund.into();
        active.status = Set(status);
        active.decided_by = Set(Some(admin_id));
        active.decided_at = Set(Some(now));
        active.decision_note = Set(note);
        active.updated_at = Set(now);
        let refund = active.update(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::RefundDecided {
                refund_id,
                status: status.to_value(),
            })
            .await;

        info!(
            "Refund {} {} by admin {}",
            refund_id,
            status.to_value(),
            admin_id
        );
        Ok(refund)
    }

    /// Processes an approved refund: stamps the gateway reference and
    /// flips the order's payment status. Refund state lives on the refund
    /// row, so no order history is written.
    #[instrument(skip(self))]
    pub async fn process_refund(
        &self,
        admin_id: Uuid,
        refund_id: Uuid,
        reference: Option<String>,
    ) -> Result<OrderRefundModel, ServiceError> {
        let refund = OrderRefund::find_by_id(refund_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Refund not found".to_string()))?;

        if refund.status != RefundStatus::Approved {
            return Err(ServiceError::InvalidOperation(
                "Only approved refunds can be processed".to_string(),
            ));
        }

        let order = Order::find_by_id(refund.order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Order not found".to_string()))?;

        let txn = self.db.begin().await?;
        let now = Utc::now();
        let kind = refund.kind;

        let mut active: order_refund::ActiveModel = refund.into();
        active.status = Set(RefundStatus::Processed);
        active.reference = Set(reference);
        active.updated_at = Set(now);
        let refund = active.update(&txn).await?;

        let payment_status = match kind {
            RefundKind::Full => PaymentStatus::Refunded,
            RefundKind::Partial => PaymentStatus::PartiallyRefunded,
        };
        let mut order_active: order::ActiveModel = order.into();
        order_active.payment_status = Set(payment_status);
        order_active.updated_at = Set(now);
        order_active.update(&txn).await?;

        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::RefundDecided {
                refund_id,
                status: RefundStatus::Processed.to_value(),
            })
            .await;

        info!("Refund {} processed by admin {}", refund_id, admin_id);
        Ok(refund)
    }

    #[instrument(skip(self))]
    pub async fn list_refunds_admin(
        &self,
        query: AdminRefundListQuery,
    ) -> Result<(Vec<OrderRefundModel>, u64), ServiceError> {
        let page = query.page();
        let per_page = query.per_page();

        let mut select = OrderRefund::find();
        if let Some(status) = query.status {
            select = select.filter(order_refund::Column::Status.eq(status));
        }

        let paginator = select
            .order_by_desc(order_refund::Column::CreatedAt)
            .paginate(&*self.db, per_page);
        let total = paginator.num_items().await?;
        let refunds = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((refunds, total))
    }

    async fn history_for(
        &self,
        order_id: Uuid,
    ) -> Result<Vec<OrderStatusHistoryModel>, ServiceError> {
        OrderStatusHistory::find()
            .filter(order_status_history::Column::OrderId.eq(order_id))
            .order_by_asc(order_status_history::Column::CreatedAt)
            .all(&*self.db)
            .await
            .map_err(Into::into)
    }
}

/// Filters for the admin order listing
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AdminOrderListQuery {
    pub page: u64,
    pub per_page: u64,
    pub status: Option<OrderStatus>,
}

impl AdminOrderListQuery {
    pub fn page(&self) -> u64 {
        self.page.max(1)
    }

    pub fn per_page(&self) -> u64 {
        if self.per_page == 0 {
            DEFAULT_PAGE_SIZE
        } else {
            self.per_page.min(MAX_PAGE_SIZE)
        }
    }
}

/// Filters for the admin refund listing
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AdminRefundListQuery {
    pub page: u64,
    pub per_page: u64,
    pub status: Option<RefundStatus>,
}

impl AdminRefundListQuery {
    pub fn page(&self) -> u64 {
        self.page.max(1)
    }

    pub fn per_page(&self) -> u64 {
        if self.per_page == 0 {
            DEFAULT_PAGE_SIZE
        } else {
            self.per_page.min(MAX_PAGE_SIZE)
        }
    }
}

/// Input for an admin status transition
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateOrderStatusInput {
    pub status: OrderStatus,
    pub note: Option<String>,
}

/// Input for a customer refund request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RequestRefundInput {
    /// Defaults to the full order total when omitted.
    pub amount: Option<Decimal>,
    #[validate(length(min = 1, max = 1000))]
    pub reason: String,
}

/// Order with items and status history
#[derive(Debug, Serialize)]
pub struct OrderDetail {
    pub order: OrderModel,
    pub items: Vec<OrderItemModel>,
    pub history: Vec<OrderStatusHistoryModel>,
}

/// Public tracking payload
#[derive(Debug, Serialize)]
pub struct OrderTracking {
    pub order_number: String,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub estimated_delivery: Option<DateTime<Utc>>,
    pub actual_delivery: Option<DateTime<Utc>>,
    pub timeline: Vec<TrackingStep>,
}

#[derive(Debug, Serialize)]
pub struct TrackingStep {
    pub status: OrderStatus,
    pub note: Option<String>,
    pub happened_at: DateTime<Utc>,
}
