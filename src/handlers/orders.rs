use crate::handlers::common::{
    created_response, map_service_error, success_response, validate_input, PaginationParams,
};
use crate::{
    auth::{CurrentUser, OptionalUser},
    errors::ApiError,
    services::orders::RequestRefundInput,
    ApiResponse, AppState, PaginatedResponse,
};
use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

/// Customer order routes. Tracking is public; everything else is scoped
/// to the signed-in account.
pub fn order_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/orders", get(list_orders))
        .route("/orders/track/:order_number", get(track_order))
        .route("/orders/:order_number", get(order_detail))
        .route("/orders/:order_number/cancel", post(cancel_order))
        .route("/orders/:order_number/refund", post(request_refund))
}

/// The account's orders, newest first
#[utoipa::path(
    get,
    path = "/api/v1/orders",
    params(PaginationParams),
    responses(
        (status = 200, description = "Paginated orders, newest first"),
        (status = 401, description = "Authentication required", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "orders"
)]
pub async fn list_orders(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Query(params): Query<PaginationParams>,
) -> Result<impl IntoResponse, ApiError> {
    let (page, per_page) = params.clamped(&state.config);
    let (orders, total) = state
        .services
        .orders
        .list_orders_for_user(user.user_id, page, per_page)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(ApiResponse::success(
        PaginatedResponse::new(orders, page, per_page, total),
    )))
}

/// One order with line items and status history
#[utoipa::path(
    get,
    path = "/api/v1/orders/{order_number}",
    params(("order_number" = String, Path, description = "Order number")),
    responses(
        (status = 200, description = "Order with items and status history"),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "orders"
)]
pub async fn order_detail(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(order_number): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let detail = state
        .services
        .orders
        .get_order_for_user(user.user_id, &order_number)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(ApiResponse::success(detail)))
}

/// Public tracking timeline. When a bearer token is attached the order
/// must belong to that account; a mismatch reads as not-found.
#[utoipa::path(
    get,
    path = "/api/v1/orders/track/{order_number}",
    params(("order_number" = String, Path, description = "Order number")),
    responses(
        (status = 200, description = "Status timeline with delivery estimates"),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse)
    ),
    tag = "orders"
)]
pub async fn track_order(
    State(state): State<Arc<AppState>>,
    OptionalUser(user): OptionalUser,
    Path(order_number): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let viewer = user.map(|u| u.user_id);
    let tracking = state
        .services
        .orders
        .track_order(&order_number, viewer)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(ApiResponse::success(tracking)))
}

/// Cancel an order that has not shipped yet
#[utoipa::path(
    post,
    path = "/api/v1/orders/{order_number}/cancel",
    params(("order_number" = String, Path, description = "Order number")),
    responses(
        (status = 200, description = "Order cancelled and tracked stock returned"),
        (status = 400, description = "Order can no longer be cancelled", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "orders"
)]
pub async fn cancel_order(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(order_number): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let order = state
        .services
        .orders
        .cancel_order(user.user_id, &order_number)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(ApiResponse::success(order)))
}

/// Ask for a refund on a delivered, paid order
#[utoipa::path(
    post,
    path = "/api/v1/orders/{order_number}/refund",
    params(("order_number" = String, Path, description = "Order number")),
    responses(
        (status = 201, description = "Refund request recorded"),
        (status = 400, description = "Order not eligible or amount invalid", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "A refund is already in progress", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "orders"
)]
pub async fn request_refund(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(order_number): Path<String>,
    Json(payload): Json<RequestRefundInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let refund = state
        .services
        .orders
        .request_refund(user.user_id, &order_number, payload)
        .await
        .map_err(map_service_error)?;

    Ok(created_response(ApiResponse::success(refund)))
}
