use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends an event, logging instead of failing when the receiver is gone.
    /// Event delivery is best-effort; the triggering operation has already
    /// committed by the time an event is emitted.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            warn!("Event dropped: {}", e);
        }
    }
}

// Define the various events that can occur in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Account events
    UserRegistered(Uuid),
    UserLoggedIn(Uuid),

    // Cart events
    CartItemAdded { cart_id: Uuid, product_id: Uuid },
    CartItemUpdated { cart_id: Uuid, item_id: Uuid },
    CartItemRemoved { cart_id: Uuid, item_id: Uuid },
    CartCleared(Uuid),
    CartsMerged {
        session_cart_id: Uuid,
        user_cart_id: Uuid,
    },

    // Wishlist events
    WishlistItemAdded { user_id: Uuid, product_id: Uuid },
    WishlistItemRemoved { user_id: Uuid, product_id: Uuid },

    // Catalog events
    ProductCreated(Uuid),
    ProductUpdated(Uuid),
    ReviewSubmitted { product_id: Uuid, user_id: Uuid },

    // Order events
    OrderCreated(Uuid),
    OrderStatusChanged {
        order_id: Uuid,
        old_status: String,
        new_status: String,
    },
    OrderCancelled(Uuid),
    OrderDelivered(Uuid),

    // Inventory events
    StockAdjusted {
        product_id: Uuid,
        quantity: i32,
        new_total: i32,
    },
    LowStockDetected {
        product_id: Uuid,
        remaining: i32,
        threshold: i32,
    },

    // Refund events
    RefundRequested(Uuid),
    RefundDecided { refund_id: Uuid, status: String },

    // Generic event for custom messages
    Generic {
        message: String,
        timestamp: DateTime<Utc>,
        metadata: serde_json::Value,
    },
}

// Function to process incoming events and distribute them to registered event handlers.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        info!("Received event: {:?}", event);

        match event {
            Event::UserRegistered(user_id) => {
                crate::metrics::USERS_REGISTERED.inc();
                info!("New account registered: {}", user_id);
            }
            Event::OrderCreated(order_id) => {
                crate::metrics::ORDERS_PLACED.inc();
                if let Err(e) = handle_order_created(order_id).await {
                    error!(
                        "Failed to handle order created event: order_id={}, error={}",
                        order_id, e
                    );
                }
            }
            Event::OrderStatusChanged {
                order_id,
                old_status,
                new_status,
            } => {
                info!(
                    "Order {} moved from {} to {}",
                    order_id, old_status, new_status
                );
            }
            Event::OrderCancelled(order_id) => {
                crate::metrics::ORDERS_CANCELLED.inc();
                info!("Order cancelled: {}", order_id);
            }
            Event::OrderDelivered(order_id) => {
                crate::metrics::ORDERS_DELIVERED.inc();
                info!("Order delivered: {}", order_id);
            }
            Event::LowStockDetected {
                product_id,
                remaining,
                threshold,
            } => {
                crate::metrics::LOW_STOCK_ALERTS.inc();
                warn!(
                    "Low stock alert: product {} has {} units remaining (threshold {})",
                    product_id, remaining, threshold
                );
            }
            Event::StockAdjusted {
                product_id,
                quantity,
                new_total,
            } => {
                info!(
                    "Stock adjusted: product={}, delta={}, new_total={}",
                    product_id, quantity, new_total
                );
            }
            Event::RefundRequested(refund_id) => {
                info!("Refund requested: {}", refund_id);
            }
            Event::RefundDecided { refund_id, status } => {
                info!("Refund {} decided: {}", refund_id, status);
            }
            _ => {
                info!("No specific handler for event: {:?}", event);
            }
        }
    }

    warn!("Event processing loop has ended");
}

// Handler functions for specific events
async fn handle_order_created(order_id: Uuid) -> Result<(), String> {
    // Placement side effects (stock ledger, cart clearing) are handled by the
    // checkout transaction itself; this hook covers notification fan-out.
    info!("Processing order created event for order {}", order_id);

    Ok(())
}
