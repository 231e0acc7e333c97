use crate::{
    entities::{
        product, product_image, wishlist_item, Product, ProductImage, UserKind, WishlistItem,
        WishlistItemModel,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::{
        cart::{AddToCartInput, CartActionResponse, CartOwner, CartService},
        catalog::{discount_percentage, ProductImagePayload},
    },
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Per-user wishlist. Adding is an idempotent upsert; moving to cart goes
/// through the cart service so stock rules apply unchanged.
#[derive(Clone)]
pub struct WishlistService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    cart: Arc<CartService>,
}

impl WishlistService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        cart: Arc<CartService>,
    ) -> Self {
        Self {
            db,
            event_sender,
            cart,
        }
    }

    #[instrument(skip(self))]
    pub async fn add(
        &self,
        user_id: Uuid,
        product_id: Uuid,
    ) -> Result<WishlistItemModel, ServiceError> {
        Product::find_by_id(product_id)
            .filter(product::Column::IsActive.eq(true))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Product not found".to_string()))?;

        if let Some(existing) = WishlistItem::find()
            .filter(wishlist_item::Column::UserId.eq(user_id))
            .filter(wishlist_item::Column::ProductId.eq(product_id))
            .one(&*self.db)
            .await?
        {
            return Ok(existing);
        }

        let item = wishlist_item::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            product_id: Set(product_id),
            created_at: Set(Utc::now()),
        };
        let item = item.insert(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::WishlistItemAdded {
                user_id,
                product_id,
            })
            .await;

        info!("Added product {} to wishlist of {}", product_id, user_id);
        Ok(item)
    }

    #[instrument(skip(self))]
    pub async fn remove(&self, user_id: Uuid, product_id: Uuid) -> Result<(), ServiceError> {
        let deleted = WishlistItem::delete_many()
            .filter(wishlist_item::Column::UserId.eq(user_id))
            .filter(wishlist_item::Column::ProductId.eq(product_id))
            .exec(&*self.db)
            .await?;
        if deleted.rows_affected == 0 {
            return Err(ServiceError::NotFound(
                "Wishlist item not found".to_string(),
            ));
        }

        self.event_sender
            .send_or_log(Event::WishlistItemRemoved {
                user_id,
                product_id,
            })
            .await;

        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        user_id: Uuid,
        shopper: Option<UserKind>,
    ) -> Result<Vec<WishlistEntry>, ServiceError> {
        let rows = WishlistItem::find()
            .filter(wishlist_item::Column::UserId.eq(user_id))
            .find_also_related(Product)
            .order_by_desc(wishlist_item::Column::CreatedAt)
            .all(&*self.db)
            .await?;

        let product_ids: Vec<Uuid> = rows
            .iter()
            .filter_map(|(_, p)| p.as_ref().map(|p| p.id))
            .collect();
        let mut images: HashMap<Uuid, ProductImagePayload> = if product_ids.is_empty() {
            HashMap::new()
        } else {
            ProductImage::find()
                .filter(product_image::Column::ProductId.is_in(product_ids))
                .filter(product_image::Column::IsPrimary.eq(true))
                .all(&*self.db)
                .await?
                .into_iter()
                .map(|img| (img.product_id, ProductImagePayload::from(img)))
                .collect()
        };

        Ok(rows
            .into_iter()
            .filter_map(|(item, product)| {
                let product = product?;
                let price = product.price_for(shopper);
                let in_stock = product.in_stock();
                Some(WishlistEntry {
                    id: item.id,
                    product_id: product.id,
                    name: product.name,
                    slug: product.slug,
                    mrp_price: product.mrp_price,
                    price,
                    discount_percentage: discount_percentage(product.mrp_price, price),
                    prescription_required: product.prescription_required,
                    in_stock,
                    image: images.remove(&product.id),
                    added_at: item.created_at,
                })
            })
            .collect())
    }

    /// Adds one unit to the cart, then removes the wishlist row only when
    /// the add actually succeeded. A stock failure leaves the wish in
    /// place and returns the cart's failure payload.
    #[instrument(skip(self))]
    pub async fn move_to_cart(
        &self,
        user_id: Uuid,
        kind: UserKind,
        product_id: Uuid,
    ) -> Result<CartActionResponse, ServiceError> {
        let owner = CartOwner::User { id: user_id, kind };
        let outcome = self
            .cart
            .add_item(
                &owner,
                AddToCartInput {
                    product_id,
                    quantity: 1,
                },
            )
            .await?;

        if outcome.success {
            WishlistItem::delete_many()
                .filter(wishlist_item::Column::UserId.eq(user_id))
                .filter(wishlist_item::Column::ProductId.eq(product_id))
                .exec(&*self.db)
                .await?;
            info!(
                "Moved product {} from wishlist to cart for {}",
                product_id, user_id
            );
        }

        Ok(outcome)
    }
}

/// Wishlist row joined with its product at the shopper's price
#[derive(Debug, Serialize)]
pub struct WishlistEntry {
    pub id: Uuid,
    pub product_id: Uuid,
    pub name: String,
    pub slug: String,
    pub mrp_price: Decimal,
    pub price: Decimal,
    pub discount_percentage: f64,
    pub prescription_required: bool,
    pub in_stock: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<ProductImagePayload>,
    pub added_at: DateTime<Utc>,
}
