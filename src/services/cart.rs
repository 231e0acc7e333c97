use crate::{
    entities::{
        cart, cart_item, product, Cart, CartItem, CartModel, Product, ProductImage, UserKind,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::catalog::ProductImagePayload,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Shopping cart service shared by guests and signed-in users.
///
/// Guests own a cart through their session key, users through their user
/// id. Mutations return the flat `{success, message, ...}` payloads the
/// storefront renders directly; stock shortfalls are reported in that
/// payload, not as errors.
#[derive(Clone)]
pub struct CartService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

/// Who a cart belongs to. Pricing snapshots depend on the user kind, so
/// the user variant carries it.
#[derive(Debug, Clone)]
pub enum CartOwner {
    User { id: Uuid, kind: UserKind },
    Guest { session_key: String },
}

impl CartOwner {
    pub fn user_kind(&self) -> Option<UserKind> {
        match self {
            CartOwner::User { kind, .. } => Some(*kind),
            CartOwner::Guest { .. } => None,
        }
    }
}

impl CartService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Adds a product to the owner's cart, accumulating quantity when the
    /// product is already present. Stock is checked against the cached
    /// quantity for tracked products.
    #[instrument(skip(self))]
    pub async fn add_item(
        &self,
        owner: &CartOwner,
        input: AddToCartInput,
    ) -> Result<CartActionResponse, ServiceError> {
        input.validate()?;

        let product = Product::find_by_id(input.product_id)
            .filter(product::Column::IsActive.eq(true))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Product not found".to_string()))?;

        let cart = self.get_or_create_cart_on(&*self.db, owner).await?;

        if product.track_inventory && input.quantity > product.stock_quantity {
            return Ok(CartActionResponse::insufficient_stock(
                product.stock_quantity,
            ));
        }

        let existing = CartItem::find()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .filter(cart_item::Column::ProductId.eq(product.id))
            .one(&*self.db)
            .await?;

        let item_quantity = if let Some(item) = existing {
            let current_quantity = item.quantity;
            let new_total = current_quantity + input.quantity;
            if product.track_inventory && new_total > product.stock_quantity {
                return Ok(CartActionResponse::limited_stock(
                    product.stock_quantity,
                    current_quantity,
                ));
            }

            let mut active: cart_item::ActiveModel = item.into();
            active.quantity = Set(new_total);
            active.updated_at = Set(Utc::now());
            active.update(&*self.db).await?;
            new_total
        } else {
            let now = Utc::now();
            let item = cart_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                cart_id: Set(cart.id),
                product_id: Set(product.id),
                quantity: Set(input.quantity),
                unit_price: Set(product.price_for(owner.user_kind())),
                created_at: Set(now),
                updated_at: Set(now),
            };
            item.insert(&*self.db).await?;
            input.quantity
        };

        let (items_count, subtotal) = self.totals_on(&*self.db, cart.id).await?;

        self.event_sender
            .send_or_log(Event::CartItemAdded {
                cart_id: cart.id,
                product_id: product.id,
            })
            .await;

        info!(
            "Added product {} x{} to cart {}",
            product.id, input.quantity, cart.id
        );
        Ok(CartActionResponse::added(
            &product.name,
            items_count,
            subtotal,
            item_quantity,
        ))
    }

    /// Sets an item's quantity; zero or less removes the item instead of
    /// failing.
    #[instrument(skip(self))]
    pub async fn update_item_quantity(
        &self,
        owner: &CartOwner,
        item_id: Uuid,
        quantity: i32,
    ) -> Result<CartActionResponse, ServiceError> {
        if quantity <= 0 {
            return self.remove_item(owner, item_id).await;
        }

        let cart = self
            .find_cart_on(&*self.db, owner)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Cart item not found".to_string()))?;

        let item = CartItem::find_by_id(item_id)
            .filter(cart_item::Column::CartId.eq(cart.id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Cart item not found".to_string()))?;

        let product = Product::find_by_id(item.product_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Product not found".to_string()))?;

        if product.track_inventory && quantity > product.stock_quantity {
            return Ok(CartActionResponse::limited_stock(
                product.stock_quantity,
                item.quantity,
            ));
        }

        let mut active: cart_item::ActiveModel = item.into();
        active.quantity = Set(quantity);
        active.updated_at = Set(Utc::now());
        active.update(&*self.db).await?;

        let (items_count, subtotal) = self.totals_on(&*self.db, cart.id).await?;

        self.event_sender
            .send_or_log(Event::CartItemUpdated {
                cart_id: cart.id,
                item_id,
            })
            .await;

        Ok(CartActionResponse::updated(
            "Cart updated",
            items_count,
            subtotal,
            Some(quantity),
        ))
    }

    #[instrument(skip(self))]
    pub async fn remove_item(
        &self,
        owner: &CartOwner,
        item_id: Uuid,
    ) -> Result<CartActionResponse, ServiceError> {
        let cart = self
            .find_cart_on(&*self.db, owner)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Cart item not found".to_string()))?;

        let deleted = CartItem::delete_many()
            .filter(cart_item::Column::Id.eq(item_id))
            .filter(cart_item::Column::CartId.eq(cart.id))
            .exec(&*self.db)
            .await?;
        if deleted.rows_affected == 0 {
            return Err(ServiceError::NotFound("Cart item not found".to_string()));
        }

        let (items_count, subtotal) = self.totals_on(&*self.db, cart.id).await?;

        self.event_sender
            .send_or_log(Event::CartItemRemoved {
                cart_id: cart.id,
                item_id,
            })
            .await;

        Ok(CartActionResponse::updated(
            "Item removed from cart",
            items_count,
            subtotal,
            None,
        ))
    }

    #[instrument(skip(self))]
    pub async fn clear_cart(&self, owner: &CartOwner) -> Result<CartActionResponse, ServiceError> {
        let Some(cart) = self.find_cart_on(&*self.db, owner).await? else {
            return Ok(CartActionResponse::updated(
                "Cart cleared",
                0,
                Decimal::ZERO,
                None,
            ));
        };

        CartItem::delete_many()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .exec(&*self.db)
            .await?;

        self.event_sender.send_or_log(Event::CartCleared(cart.id)).await;

        info!("Cleared cart {}", cart.id);
        Ok(CartActionResponse::updated(
            "Cart cleared",
            0,
            Decimal::ZERO,
            None,
        ))
    }

    /// Cart contents with line totals, resolved product details and the
    /// primary image per line.
    #[instrument(skip(self))]
    pub async fn summary(&self, owner: &CartOwner) -> Result<CartSummary, ServiceError> {
        let cart = self.get_or_create_cart_on(&*self.db, owner).await?;

        let rows = CartItem::find()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .find_also_related(Product)
            .order_by_asc(cart_item::Column::CreatedAt)
            .all(&*self.db)
            .await?;

        let product_ids: Vec<Uuid> = rows
            .iter()
            .filter_map(|(_, p)| p.as_ref().map(|p| p.id))
            .collect();
        let mut primary_images = self.primary_images_for(&product_ids).await?;

        let mut items = Vec::with_capacity(rows.len());
        let mut subtotal = Decimal::ZERO;
        let mut items_count: i64 = 0;
        for (item, product) in rows {
            let product = match product {
                Some(p) => p,
                None => continue,
            };
            let line_total = item.line_total();
            subtotal += line_total;
            items_count += i64::from(item.quantity);
            items.push(CartLine {
                id: item.id,
                product_id: product.id,
                name: product.name,
                slug: product.slug,
                prescription_required: product.prescription_required,
                unit_price: item.unit_price,
                quantity: item.quantity,
                line_total,
                image: primary_images.remove(&product.id),
            });
        }

        Ok(CartSummary {
            cart_id: cart.id,
            items,
            items_count,
            subtotal,
        })
    }

    /// Folds a guest's session cart into the user cart after login.
    ///
    /// Quantities are summed for shared products, other rows are re-pointed
    /// at the user cart unchanged, then the session cart is deleted. The
    /// loop runs item by item without a wrapping transaction, so a failure
    /// midway leaves a partially merged cart.
    #[instrument(skip(self))]
    pub async fn merge_session_cart(
        &self,
        session_key: &str,
        user_id: Uuid,
    ) -> Result<(), ServiceError> {
        let Some(session_cart) = self.find_session_cart(&*self.db, session_key).await? else {
            return Ok(());
        };

        let user_cart = match self.find_user_cart(&*self.db, user_id).await? {
            Some(cart) => cart,
            None => self.create_user_cart(&*self.db, user_id).await?,
        };

        let session_items = CartItem::find()
            .filter(cart_item::Column::CartId.eq(session_cart.id))
            .all(&*self.db)
            .await?;

        for item in session_items {
            let existing = CartItem::find()
                .filter(cart_item::Column::CartId.eq(user_cart.id))
                .filter(cart_item::Column::ProductId.eq(item.product_id))
                .one(&*self.db)
                .await?;

            match existing {
                Some(user_item) => {
                    let merged = user_item.quantity + item.quantity;
                    let mut active: cart_item::ActiveModel = user_item.into();
                    active.quantity = Set(merged);
                    active.updated_at = Set(Utc::now());
                    active.update(&*self.db).await?;
                }
                None => {
                    let mut active: cart_item::ActiveModel = item.into();
                    active.cart_id = Set(user_cart.id);
                    active.updated_at = Set(Utc::now());
                    active.update(&*self.db).await?;
                }
            }
        }

        // Leftover rows are the ones whose quantities were summed into the
        // user cart.
        CartItem::delete_many()
            .filter(cart_item::Column::CartId.eq(session_cart.id))
            .exec(&*self.db)
            .await?;
        Cart::delete_by_id(session_cart.id).exec(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::CartsMerged {
                session_cart_id: session_cart.id,
                user_cart_id: user_cart.id,
            })
            .await;

        info!(
            "Merged session cart {} into user cart {}",
            session_cart.id, user_cart.id
        );
        Ok(())
    }

    async fn find_cart_on(
        &self,
        conn: &impl ConnectionTrait,
        owner: &CartOwner,
    ) -> Result<Option<CartModel>, ServiceError> {
        match owner {
            CartOwner::User { id, .. } => self.find_user_cart(conn, *id).await,
            CartOwner::Guest { session_key } => self.find_session_cart(conn, session_key).await,
        }
    }

    async fn get_or_create_cart_on(
        &self,
        conn: &impl ConnectionTrait,
        owner: &CartOwner,
    ) -> Result<CartModel, ServiceError> {
        if let Some(cart) = self.find_cart_on(conn, owner).await? {
            return Ok(cart);
        }

        let now = Utc::now();
        let (user_id, session_key) = match owner {
            CartOwner::User { id, .. } => (Some(*id), None),
            CartOwner::Guest { session_key } => (None, Some(session_key.clone())),
        };
        let cart = cart::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            session_key: Set(session_key),
            created_at: Set(now),
            updated_at: Set(now),
        };
        Ok(cart.insert(conn).await?)
    }

    async fn find_user_cart(
        &self,
        conn: &impl ConnectionTrait,
        user_id: Uuid,
    ) -> Result<Option<CartModel>, ServiceError> {
        Cart::find()
            .filter(cart::Column::UserId.eq(user_id))
            .one(conn)
            .await
            .map_err(Into::into)
    }

    async fn find_session_cart(
        &self,
        conn: &impl ConnectionTrait,
        session_key: &str,
    ) -> Result<Option<CartModel>, ServiceError> {
        Cart::find()
            .filter(cart::Column::SessionKey.eq(session_key))
            .one(conn)
            .await
            .map_err(Into::into)
    }

    async fn create_user_cart(
        &self,
        conn: &impl ConnectionTrait,
        user_id: Uuid,
    ) -> Result<CartModel, ServiceError> {
        let now = Utc::now();
        let cart = cart::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(Some(user_id)),
            session_key: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        };
        Ok(cart.insert(conn).await?)
    }

    async fn totals_on(
        &self,
        conn: &impl ConnectionTrait,
        cart_id: Uuid,
    ) -> Result<(i64, Decimal), ServiceError> {
        let items = CartItem::find()
            .filter(cart_item::Column::CartId.eq(cart_id))
            .all(conn)
            .await?;

        let items_count = items.iter().map(|i| i64::from(i.quantity)).sum();
        let subtotal = items.iter().map(cart_item::Model::line_total).sum();
        Ok((items_count, subtotal))
    }

    async fn primary_images_for(
        &self,
        product_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, ProductImagePayload>, ServiceError> {
        if product_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let images = ProductImage::find()
            .filter(crate::entities::product_image::Column::ProductId.is_in(product_ids.to_vec()))
            .filter(crate::entities::product_image::Column::IsPrimary.eq(true))
            .all(&*self.db)
            .await?;

        Ok(images
            .into_iter()
            .map(|img| (img.product_id, ProductImagePayload::from(img)))
            .collect())
    }
}

/// Input for adding a product to the cart
#[derive(Debug, Deserialize, Serialize, Validate, ToSchema)]
pub struct AddToCartInput {
    pub product_id: Uuid,
    #[validate(range(min = 1))]
    pub quantity: i32,
}

/// Flat payload returned by cart mutations. Stock shortfalls come back as
/// `success: false` with the quantity fields the storefront needs to
/// adjust its controls.
#[derive(Debug, Serialize)]
pub struct CartActionResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cart_items_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cart_subtotal: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_quantity: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stock_available: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_quantity: Option<i32>,
}

impl CartActionResponse {
    fn added(name: &str, items_count: i64, subtotal: Decimal, item_quantity: i32) -> Self {
        Self {
            success: true,
            message: format!("{} added to cart", name),
            cart_items_count: Some(items_count),
            cart_subtotal: Some(subtotal),
            item_quantity: Some(item_quantity),
            stock_available: None,
            current_quantity: None,
        }
    }

    fn updated(
        message: &str,
        items_count: i64,
        subtotal: Decimal,
        item_quantity: Option<i32>,
    ) -> Self {
        Self {
            success: true,
            message: message.to_string(),
            cart_items_count: Some(items_count),
            cart_subtotal: Some(subtotal),
            item_quantity,
            stock_available: None,
            current_quantity: None,
        }
    }

    fn insufficient_stock(stock_available: i32) -> Self {
        Self {
            success: false,
            message: "Insufficient stock available".to_string(),
            cart_items_count: None,
            cart_subtotal: None,
            item_quantity: None,
            stock_available: Some(stock_available),
            current_quantity: None,
        }
    }

    fn limited_stock(stock_available: i32, current_quantity: i32) -> Self {
        Self {
            success: false,
            message: format!("Only {} items available", stock_available),
            cart_items_count: None,
            cart_subtotal: None,
            item_quantity: None,
            stock_available: None,
            current_quantity: Some(current_quantity),
        }
    }
}

/// One cart line joined with its product
#[derive(Debug, Serialize)]
pub struct CartLine {
    pub id: Uuid,
    pub product_id: Uuid,
    pub name: String,
    pub slug: String,
    pub prescription_required: bool,
    pub unit_price: Decimal,
    pub quantity: i32,
    pub line_total: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<ProductImagePayload>,
}

/// Cart contents plus totals
#[derive(Debug, Serialize)]
pub struct CartSummary {
    pub cart_id: Uuid,
    pub items: Vec<CartLine>,
    pub items_count: i64,
    pub subtotal: Decimal,
}
