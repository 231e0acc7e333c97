pub mod admin;
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod common;
pub mod orders;
pub mod wishlist;

use crate::config::AppConfig;
use crate::events::EventSender;
use crate::services::{
    AccountService, CartService, CatalogService, CheckoutService, CouponService, DeliveryService,
    InventoryService, OrderService, WishlistService,
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub accounts: Arc<AccountService>,
    pub catalog: Arc<CatalogService>,
    pub cart: Arc<CartService>,
    pub wishlist: Arc<WishlistService>,
    pub coupons: Arc<CouponService>,
    pub checkout: Arc<CheckoutService>,
    pub orders: Arc<OrderService>,
    pub delivery: Arc<DeliveryService>,
    pub inventory: Arc<InventoryService>,
}

impl AppServices {
    /// Wire every service against one connection and event channel. Order
    /// matters: delivery and inventory are shared by the later services.
    pub fn new(
        db: Arc<DatabaseConnection>,
        config: Arc<AppConfig>,
        event_sender: Arc<EventSender>,
    ) -> Self {
        let delivery = Arc::new(DeliveryService::new(db.clone(), config.clone()));
        let inventory = Arc::new(InventoryService::new(db.clone(), event_sender.clone()));

        let accounts = Arc::new(AccountService::new(
            db.clone(),
            event_sender.clone(),
            config,
        ));
        let catalog = Arc::new(CatalogService::new(db.clone(), event_sender.clone()));
        let cart = Arc::new(CartService::new(db.clone(), event_sender.clone()));
        let coupons = Arc::new(CouponService::new(db.clone(), delivery.clone()));
        let checkout = Arc::new(CheckoutService::new(
            db.clone(),
            event_sender.clone(),
            delivery.clone(),
            inventory.clone(),
        ));
        let orders = Arc::new(OrderService::new(
            db.clone(),
            event_sender.clone(),
            inventory.clone(),
        ));
        let wishlist = Arc::new(WishlistService::new(db, event_sender, cart.clone()));

        Self {
            accounts,
            catalog,
            cart,
            wishlist,
            coupons,
            checkout,
            orders,
            delivery,
            inventory,
        }
    }
}
