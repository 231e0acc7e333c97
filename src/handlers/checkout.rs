use crate::handlers::common::{created_response, map_service_error, validate_input};
use crate::{
    auth::CurrentUser,
    errors::ApiError,
    services::{checkout::PlaceOrderInput, CartOwner},
    ApiResponse, AppState,
};
use axum::{
    extract::{Json, State},
    response::IntoResponse,
    routing::post,
    Router,
};
use std::sync::Arc;

pub fn checkout_routes() -> Router<Arc<AppState>> {
    Router::new().route("/checkout", post(place_order))
}

/// Turn the cart into an order. The cart is emptied once the order has
/// committed, so a failed checkout leaves it intact.
#[utoipa::path(
    post,
    path = "/api/v1/checkout",
    responses(
        (status = 201, description = "Order created with delivery address snapshot and line items"),
        (status = 400, description = "Empty cart or invalid input", body = crate::errors::ErrorResponse),
        (status = 404, description = "Address not found", body = crate::errors::ErrorResponse),
        (status = 422, description = "Insufficient stock", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "checkout"
)]
pub async fn place_order(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Json(payload): Json<PlaceOrderInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let placed = state
        .services
        .checkout
        .place_order(user.user_id, payload)
        .await
        .map_err(map_service_error)?;

    let owner = CartOwner::User {
        id: user.user_id,
        kind: user.kind,
    };
    state
        .services
        .cart
        .clear_cart(&owner)
        .await
        .map_err(map_service_error)?;

    Ok(created_response(ApiResponse::success(placed)))
}
