use crate::handlers::common::{map_service_error, success_response};
use crate::{
    auth::Shopper,
    errors::ApiError,
    services::{cart::AddToCartInput, CartOwner},
    ApiResponse, AppState,
};
use axum::{
    extract::{Json, Path, State},
    response::IntoResponse,
    routing::{delete, get, post, put},
    Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

/// Cart routes. Every endpoint works for both signed-in shoppers and
/// guests carrying an `X-Session-Key` header.
pub fn cart_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/cart", get(cart_summary).delete(clear_cart))
        .route("/cart/items", post(add_item))
        .route(
            "/cart/items/:item_id",
            put(update_item).delete(remove_item),
        )
        .route("/cart/apply-coupon", post(apply_coupon))
}

fn cart_owner(shopper: &Shopper) -> CartOwner {
    match shopper {
        Shopper::User(user) => CartOwner::User {
            id: user.user_id,
            kind: user.kind,
        },
        Shopper::Guest { session_key } => CartOwner::Guest {
            session_key: session_key.clone(),
        },
    }
}

#[derive(Debug, Deserialize, ToSchema)]
struct UpdateCartItemInput {
    quantity: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
struct ApplyCouponInput {
    coupon_code: String,
    pincode: Option<String>,
}

/// Current cart with lines priced for the caller
#[utoipa::path(
    get,
    path = "/api/v1/cart",
    responses(
        (status = 200, description = "Cart summary with priced lines"),
        (status = 401, description = "Neither bearer token nor session key supplied", body = crate::errors::ErrorResponse)
    ),
    tag = "cart"
)]
pub async fn cart_summary(
    State(state): State<Arc<AppState>>,
    shopper: Shopper,
) -> Result<impl IntoResponse, ApiError> {
    let owner = cart_owner(&shopper);
    let summary = state
        .services
        .cart
        .summary(&owner)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(ApiResponse::success(summary)))
}

/// Add a product to the cart. Stock shortfalls come back as a
/// `success: false` payload rather than an error status.
#[utoipa::path(
    post,
    path = "/api/v1/cart/items",
    responses(
        (status = 200, description = "Flat cart payload, `success` false on a stock shortfall"),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    tag = "cart"
)]
pub async fn add_item(
    State(state): State<Arc<AppState>>,
    shopper: Shopper,
    Json(payload): Json<AddToCartInput>,
) -> Result<impl IntoResponse, ApiError> {
    let owner = cart_owner(&shopper);
    let outcome = state
        .services
        .cart
        .add_item(&owner, payload)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(outcome))
}

/// Change a line's quantity; zero or below removes the line
#[utoipa::path(
    put,
    path = "/api/v1/cart/items/{item_id}",
    params(("item_id" = Uuid, Path, description = "Cart item id")),
    responses(
        (status = 200, description = "Flat cart payload"),
        (status = 404, description = "Cart item not found", body = crate::errors::ErrorResponse)
    ),
    tag = "cart"
)]
pub async fn update_item(
    State(state): State<Arc<AppState>>,
    shopper: Shopper,
    Path(item_id): Path<Uuid>,
    Json(payload): Json<UpdateCartItemInput>,
) -> Result<impl IntoResponse, ApiError> {
    let owner = cart_owner(&shopper);
    let outcome = state
        .services
        .cart
        .update_item_quantity(&owner, item_id, payload.quantity)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(outcome))
}

/// Remove a line from the cart
#[utoipa::path(
    delete,
    path = "/api/v1/cart/items/{item_id}",
    params(("item_id" = Uuid, Path, description = "Cart item id")),
    responses(
        (status = 200, description = "Flat cart payload with refreshed totals"),
        (status = 404, description = "Cart item not found", body = crate::errors::ErrorResponse)
    ),
    tag = "cart"
)]
pub async fn remove_item(
    State(state): State<Arc<AppState>>,
    shopper: Shopper,
    Path(item_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let owner = cart_owner(&shopper);
    let outcome = state
        .services
        .cart
        .remove_item(&owner, item_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(outcome))
}

/// Empty the cart
#[utoipa::path(
    delete,
    path = "/api/v1/cart",
    responses((status = 200, description = "Cart emptied")),
    tag = "cart"
)]
pub async fn clear_cart(
    State(state): State<Arc<AppState>>,
    shopper: Shopper,
) -> Result<impl IntoResponse, ApiError> {
    let owner = cart_owner(&shopper);
    let outcome = state
        .services
        .cart
        .clear_cart(&owner)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(outcome))
}

/// Price a coupon against the current cart. Rejections are reported as a
/// `success: false` payload with the reason, never as an error status.
#[utoipa::path(
    post,
    path = "/api/v1/cart/apply-coupon",
    responses(
        (status = 200, description = "Quote with discount, delivery charge and total, or a flat rejection")
    ),
    tag = "cart"
)]
pub async fn apply_coupon(
    State(state): State<Arc<AppState>>,
    shopper: Shopper,
    Json(payload): Json<ApplyCouponInput>,
) -> Result<impl IntoResponse, ApiError> {
    let owner = cart_owner(&shopper);
    let summary = state
        .services
        .cart
        .summary(&owner)
        .await
        .map_err(map_service_error)?;
    if summary.items.is_empty() {
        return Ok(success_response(json!({
            "success": false,
            "message": "Your cart is empty",
        })));
    }

    let user_id = match &shopper {
        Shopper::User(user) => Some(user.user_id),
        Shopper::Guest { .. } => None,
    };
    let quote = state
        .services
        .coupons
        .quote(
            &payload.coupon_code,
            payload.pincode.as_deref(),
            summary.subtotal,
            user_id,
        )
        .await
        .map_err(map_service_error)?;

    Ok(success_response(quote))
}
