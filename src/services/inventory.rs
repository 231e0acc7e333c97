use crate::{
    entities::{product, stock_entry, Product, StockEntryKind},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

/// Stock ledger service.
///
/// Every quantity change is an append-only `stock_entries` row with a
/// signed quantity; the product's `stock_quantity` is a cache recomputed
/// from the ledger sum inside the same transaction as the insert, so the
/// two can never drift.
#[derive(Clone)]
pub struct InventoryService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl InventoryService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Records a movement in its own transaction and publishes stock
    /// events. This is the admin entry point; checkout and cancellation
    /// call [`record_movement_on`](Self::record_movement_on) inside their
    /// own transactions instead.
    #[instrument(skip(self))]
    pub async fn adjust_stock(
        &self,
        product_id: Uuid,
        input: RecordStockInput,
        recorded_by: Option<Uuid>,
    ) -> Result<StockMovement, ServiceError> {
        let txn = self.db.begin().await?;
        let movement = self
            .record_movement_on(&txn, product_id, input, recorded_by)
            .await?;
        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::StockAdjusted {
                product_id,
                quantity: movement.entry.quantity,
                new_total: movement.new_total,
            })
            .await;
        if movement.low_stock {
            self.event_sender
                .send_or_log(Event::LowStockDetected {
                    product_id,
                    remaining: movement.new_total,
                    threshold: movement.low_stock_threshold,
                })
                .await;
        }

        info!(
            "Recorded {:?} movement of {} for product {}, stock now {}",
            movement.entry.kind, movement.entry.quantity, product_id, movement.new_total
        );
        Ok(movement)
    }

    /// Inserts a ledger row and refreshes the cached quantity on the
    /// caller's connection. OUT movements larger than the current stock are
    /// rejected, which rolls back the surrounding transaction.
    pub async fn record_movement_on(
        &self,
        conn: &impl ConnectionTrait,
        product_id: Uuid,
        input: RecordStockInput,
        recorded_by: Option<Uuid>,
    ) -> Result<StockMovement, ServiceError> {
        let product = Product::find_by_id(product_id)
            .one(conn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))?;

        let signed = signed_quantity(input.kind, input.quantity)?;

        if input.kind == StockEntryKind::Out && input.quantity > product.stock_quantity {
            return Err(ServiceError::InsufficientStock(format!(
                "Insufficient stock for {}",
                product.name
            )));
        }

        let now = Utc::now();
        let entry = stock_entry::ActiveModel {
            id: Set(Uuid::new_v4()),
            product_id: Set(product_id),
            kind: Set(input.kind),
            quantity: Set(signed),
            reference: Set(input.reference),
            recorded_by: Set(recorded_by),
            created_at: Set(now),
        };
        let entry = entry.insert(conn).await?;

        let new_total = self.ledger_total_on(conn, product_id).await? as i32;

        let low_stock_threshold = product.low_stock_threshold;
        let low_stock = product.track_inventory && new_total <= low_stock_threshold;

        let mut active: product::ActiveModel = product.into();
        active.stock_quantity = Set(new_total);
        active.updated_at = Set(now);
        active.update(conn).await?;

        Ok(StockMovement {
            entry,
            new_total,
            low_stock,
            low_stock_threshold,
        })
    }

    /// Signed sum of all ledger rows for a product.
    pub async fn ledger_total(&self, product_id: Uuid) -> Result<i64, ServiceError> {
        self.ledger_total_on(&*self.db, product_id).await
    }

    async fn ledger_total_on(
        &self,
        conn: &impl ConnectionTrait,
        product_id: Uuid,
    ) -> Result<i64, ServiceError> {
        let total: Option<Option<i64>> = stock_entry::Entity::find()
            .select_only()
            .column_as(stock_entry::Column::Quantity.sum(), "total")
            .filter(stock_entry::Column::ProductId.eq(product_id))
            .into_tuple()
            .one(conn)
            .await?;

        Ok(total.flatten().unwrap_or(0))
    }
}

/// Maps a movement kind plus magnitude to the signed ledger delta.
/// IN and RETURN add stock, OUT subtracts, ADJUSTMENT is taken as given.
fn signed_quantity(kind: StockEntryKind, quantity: i32) -> Result<i32, ServiceError> {
    match kind {
        StockEntryKind::In | StockEntryKind::Return => {
            if quantity <= 0 {
                return Err(ServiceError::ValidationError(
                    "Stock movement quantity must be positive".to_string(),
                ));
            }
            Ok(quantity)
        }
        StockEntryKind::Out => {
            if quantity <= 0 {
                return Err(ServiceError::ValidationError(
                    "Stock movement quantity must be positive".to_string(),
                ));
            }
            Ok(-quantity)
        }
        StockEntryKind::Adjustment => {
            if quantity == 0 {
                return Err(ServiceError::ValidationError(
                    "Stock adjustment cannot be zero".to_string(),
                ));
            }
            Ok(quantity)
        }
    }
}

/// Input for recording a stock movement
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct RecordStockInput {
    pub kind: StockEntryKind,
    /// Magnitude for IN/OUT/RETURN movements, signed delta for ADJUSTMENT.
    pub quantity: i32,
    pub reference: Option<String>,
}

/// A recorded movement together with the refreshed stock level.
#[derive(Debug, Serialize)]
pub struct StockMovement {
    pub entry: stock_entry::Model,
    pub new_total: i32,
    pub low_stock: bool,
    #[serde(skip)]
    pub low_stock_threshold: i32,
}
