//! Database entities for the storefront.

pub mod address;
pub mod cart;
pub mod cart_item;
pub mod category;
pub mod coupon;
pub mod coupon_usage;
pub mod delivery_zone;
pub mod manufacturer;
pub mod order;
pub mod order_item;
pub mod order_refund;
pub mod order_status_history;
pub mod patient_profile;
pub mod pharmacy_profile;
pub mod product;
pub mod product_image;
pub mod product_review;
pub mod stock_entry;
pub mod user;
pub mod wishlist_item;

// Re-export entities
pub use address::{AddressLabel, Entity as Address, Model as AddressModel};
pub use cart::{Entity as Cart, Model as CartModel};
pub use cart_item::{Entity as CartItem, Model as CartItemModel};
pub use category::{Entity as Category, Model as CategoryModel};
pub use coupon::{CouponKind, Entity as Coupon, Model as CouponModel};
pub use coupon_usage::{Entity as CouponUsage, Model as CouponUsageModel};
pub use delivery_zone::{Entity as DeliveryZone, Model as DeliveryZoneModel};
pub use manufacturer::{Entity as Manufacturer, Model as ManufacturerModel};
pub use order::{Entity as Order, Model as OrderModel, OrderStatus, PaymentMethod, PaymentStatus};
pub use order_item::{Entity as OrderItem, Model as OrderItemModel};
pub use order_refund::{Entity as OrderRefund, Model as OrderRefundModel, RefundKind, RefundStatus};
pub use order_status_history::{Entity as OrderStatusHistory, Model as OrderStatusHistoryModel};
pub use patient_profile::{Entity as PatientProfile, Model as PatientProfileModel};
pub use pharmacy_profile::{Entity as PharmacyProfile, Model as PharmacyProfileModel};
pub use product::{Entity as Product, Model as ProductModel};
pub use product_image::{Entity as ProductImage, Model as ProductImageModel};
pub use product_review::{Entity as ProductReview, Model as ProductReviewModel};
pub use stock_entry::{Entity as StockEntry, Model as StockEntryModel, StockEntryKind};
pub use user::{Entity as User, Model as UserModel, UserKind};
pub use wishlist_item::{Entity as WishlistItem, Model as WishlistItemModel};
