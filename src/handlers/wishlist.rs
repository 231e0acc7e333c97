use crate::handlers::common::{
    created_response, map_service_error, no_content_response, success_response,
};
use crate::{auth::CurrentUser, errors::ApiError, ApiResponse, AppState};
use axum::{
    extract::{Json, Path, State},
    response::IntoResponse,
    routing::{delete, get, post},
    Router,
};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

/// Wishlist routes. Wishlists belong to accounts, so everything here
/// requires a bearer token.
pub fn wishlist_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/wishlist", get(list_wishlist).post(add_to_wishlist))
        .route("/wishlist/:product_id", delete(remove_from_wishlist))
        .route("/wishlist/:product_id/move-to-cart", post(move_to_cart))
}

#[derive(Debug, Deserialize, ToSchema)]
struct AddWishlistInput {
    product_id: Uuid,
}

/// Saved products, newest first
#[utoipa::path(
    get,
    path = "/api/v1/wishlist",
    responses(
        (status = 200, description = "Saved products priced for the caller"),
        (status = 401, description = "Authentication required", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "wishlist"
)]
pub async fn list_wishlist(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
) -> Result<impl IntoResponse, ApiError> {
    let entries = state
        .services
        .wishlist
        .list(user.user_id, Some(user.kind))
        .await
        .map_err(map_service_error)?;

    Ok(success_response(ApiResponse::success(entries)))
}

/// Save a product. Saving one that is already on the list is a no-op.
#[utoipa::path(
    post,
    path = "/api/v1/wishlist",
    responses(
        (status = 201, description = "Product saved"),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "wishlist"
)]
pub async fn add_to_wishlist(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Json(payload): Json<AddWishlistInput>,
) -> Result<impl IntoResponse, ApiError> {
    let item = state
        .services
        .wishlist
        .add(user.user_id, payload.product_id)
        .await
        .map_err(map_service_error)?;

    Ok(created_response(ApiResponse::success(item)))
}

/// Drop a product from the wishlist
#[utoipa::path(
    delete,
    path = "/api/v1/wishlist/{product_id}",
    params(("product_id" = Uuid, Path, description = "Product id")),
    responses(
        (status = 204, description = "Removed"),
        (status = 404, description = "Wishlist item not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "wishlist"
)]
pub async fn remove_from_wishlist(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(product_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .services
        .wishlist
        .remove(user.user_id, product_id)
        .await
        .map_err(map_service_error)?;

    Ok(no_content_response())
}

/// Move a saved product into the cart. The wishlist row is only removed
/// when the cart accepted the item.
#[utoipa::path(
    post,
    path = "/api/v1/wishlist/{product_id}/move-to-cart",
    params(("product_id" = Uuid, Path, description = "Product id")),
    responses(
        (status = 200, description = "Flat cart payload, `success` false on a stock shortfall"),
        (status = 404, description = "Wishlist item not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "wishlist"
)]
pub async fn move_to_cart(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(product_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = state
        .services
        .wishlist
        .move_to_cart(user.user_id, user.kind, product_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(outcome))
}
