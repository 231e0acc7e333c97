//! Business logic. Each service owns one slice of the domain, holds its
//! handles behind `Arc` and is cloned freely into handlers.

pub mod accounts;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod coupons;
pub mod delivery;
pub mod inventory;
pub mod orders;
pub mod wishlist;

pub use accounts::AccountService;
pub use cart::{CartOwner, CartService};
pub use catalog::CatalogService;
pub use checkout::CheckoutService;
pub use coupons::CouponService;
pub use delivery::DeliveryService;
pub use inventory::InventoryService;
pub use orders::OrderService;
pub use wishlist::WishlistService;

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Indian postal codes: exactly six digits.
    pub static ref PINCODE_RE: Regex = Regex::new(r"^\d{6}$").unwrap();
}
