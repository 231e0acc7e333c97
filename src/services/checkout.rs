use crate::{
    entities::{
        address, cart, cart_item, order, order_item, order_status_history, Address, Cart,
        CartItem, OrderItemModel, OrderModel, OrderStatus, PaymentMethod, PaymentStatus, Product,
        StockEntryKind,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::{delivery::DeliveryService, inventory::InventoryService, inventory::RecordStockInput},
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::Utc;
use rand::Rng;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Turns a cart into an order inside one transaction.
///
/// The transaction covers the address snapshot, the order row, its items,
/// the OUT stock movements and the initial history row, so an insufficient
/// stock failure on any line rolls the whole order back. The cart itself is
/// left alone; the checkout handler clears it once the order is committed.
#[derive(Clone)]
pub struct CheckoutService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    delivery: Arc<DeliveryService>,
    inventory: Arc<InventoryService>,
}

impl CheckoutService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        delivery: Arc<DeliveryService>,
        inventory: Arc<InventoryService>,
    ) -> Self {
        Self {
            db,
            event_sender,
            delivery,
            inventory,
        }
    }

    #[instrument(skip(self, input))]
    pub async fn place_order(
        &self,
        user_id: Uuid,
        input: PlaceOrderInput,
    ) -> Result<PlacedOrder, ServiceError> {
        input.validate()?;

        if let Some(image) = &input.prescription_image {
            if BASE64.decode(image).is_err() {
                return Err(ServiceError::ValidationError(
                    "Invalid prescription image".to_string(),
                ));
            }
        }

        let cart = Cart::find()
            .filter(cart::Column::UserId.eq(user_id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::InvalidOperation("Your cart is empty".to_string()))?;

        let lines = CartItem::find()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .find_also_related(Product)
            .order_by_asc(cart_item::Column::CreatedAt)
            .all(&*self.db)
            .await?;
        let lines: Vec<_> = lines
            .into_iter()
            .filter_map(|(item, product)| product.map(|p| (item, p)))
            .collect();
        if lines.is_empty() {
            return Err(ServiceError::InvalidOperation(
                "Your cart is empty".to_string(),
            ));
        }

        let txn = self.db.begin().await?;

        let shipping = Address::find_by_id(input.address_id)
            .filter(address::Column::UserId.eq(user_id))
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Address not found".to_string()))?;
        let address_snapshot = serde_json::json!({
            "recipient_name": shipping.recipient_name,
            "phone": shipping.phone,
            "line1": shipping.line1,
            "line2": shipping.line2,
            "city": shipping.city,
            "state": shipping.state,
            "pincode": shipping.pincode,
            "landmark": shipping.landmark,
        });

        let subtotal: Decimal = lines.iter().map(|(item, _)| item.line_total()).sum();
        let delivery_charge = self
            .delivery
            .delivery_charge_on(&txn, subtotal, Some(&shipping.pincode))
            .await?;
        let tax_amount = Decimal::ZERO;
        let discount_amount = Decimal::ZERO;
        let total_amount = subtotal + delivery_charge + tax_amount - discount_amount;

        let prescription_required = lines.iter().any(|(_, p)| p.prescription_required);
        let order_number = generate_order_number();
        let now = Utc::now();

        let placed = order::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_number: Set(order_number.clone()),
            user_id: Set(user_id),
            status: Set(OrderStatus::Pending),
            payment_status: Set(PaymentStatus::Pending),
            payment_method: Set(input.payment_method),
            subtotal: Set(subtotal),
            delivery_charge: Set(delivery_charge),
            tax_amount: Set(tax_amount),
            discount_amount: Set(discount_amount),
            total_amount: Set(total_amount),
            delivery_address: Set(address_snapshot),
            prescription_required: Set(prescription_required),
            prescription_image: Set(input.prescription_image),
            notes: Set(input.notes),
            processed_by: Set(None),
            processed_at: Set(None),
            estimated_delivery: Set(Some(self.delivery.estimated_delivery())),
            actual_delivery: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let placed = placed.insert(&txn).await?;

        let mut items = Vec::with_capacity(lines.len());
        let mut low_stock_events = Vec::new();
        for (line, product) in &lines {
            let item = order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(placed.id),
                product_id: Set(product.id),
                product_name: Set(product.name.clone()),
                quantity: Set(line.quantity),
                unit_price: Set(line.unit_price),
                total_price: Set(line.line_total()),
                prescription_required: Set(product.prescription_required),
                created_at: Set(now),
            };
            items.push(item.insert(&txn).await?);

            if product.track_inventory {
                let movement = self
                    .inventory
                    .record_movement_on(
                        &txn,
                        product.id,
                        RecordStockInput {
                            kind: StockEntryKind::Out,
                            quantity: line.quantity,
                            reference: Some(order_number.clone()),
                        },
                        Some(user_id),
                    )
                    .await?;
                if movement.low_stock {
                    low_stock_events.push(Event::LowStockDetected {
                        product_id: product.id,
                        remaining: movement.new_total,
                        threshold: movement.low_stock_threshold,
                    });
                }
            }
        }

        let history = order_status_history::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(placed.id),
            from_status: Set(None),
            to_status: Set(OrderStatus::Pending),
            note: Set(Some("Order placed successfully".to_string())),
            changed_by: Set(Some(user_id)),
            created_at: Set(now),
        };
        history.insert(&txn).await?;

        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::OrderCreated(placed.id))
            .await;
        for event in low_stock_events {
            self.event_sender.send_or_log(event).await;
        }

        info!(
            "Placed order {} for user {}: {} items, total {}",
            placed.order_number,
            user_id,
            items.len(),
            placed.total_amount
        );
        Ok(PlacedOrder {
            order: placed,
            items,
        })
    }
}

/// `ORD-YYYYMMDD-` plus six random digits. Uniqueness is probabilistic;
/// the unique index on `order_number` catches the rare collision.
fn generate_order_number() -> String {
    let suffix = rand::thread_rng().gen_range(100_000..=999_999);
    format!("ORD-{}-{}", Utc::now().format("%Y%m%d"), suffix)
}

/// Input for placing an order
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct PlaceOrderInput {
    pub address_id: Uuid,
    pub payment_method: PaymentMethod,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
    /// Base64-encoded prescription upload.
    pub prescription_image: Option<String>,
}

/// Created order with its line items
#[derive(Debug, Serialize)]
pub struct PlacedOrder {
    pub order: OrderModel,
    pub items: Vec<OrderItemModel>,
}
