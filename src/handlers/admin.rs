use crate::handlers::common::{
    created_response, map_service_error, success_response, validate_input,
};
use crate::{
    auth::AdminUser,
    errors::ApiError,
    services::{
        catalog::{AddProductImageInput, CreateProductInput, UpdateProductInput},
        coupons::CreateCouponInput,
        delivery::CreateDeliveryZoneInput,
        inventory::RecordStockInput,
        orders::{AdminOrderListQuery, AdminRefundListQuery, UpdateOrderStatusInput},
    },
    ApiResponse, AppState, PaginatedResponse,
};
use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::{get, post, put},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

/// Back-office routes. Every handler takes the [`AdminUser`] extractor,
/// so a non-admin token is rejected before any work happens.
pub fn admin_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/admin/products", post(create_product))
        .route("/admin/products/:id", put(update_product))
        .route("/admin/products/:id/images", post(add_product_image))
        .route("/admin/products/:id/stock", post(adjust_stock))
        .route("/admin/coupons", get(list_coupons).post(create_coupon))
        .route("/admin/coupons/:id/deactivate", post(deactivate_coupon))
        .route(
            "/admin/delivery-zones",
            get(list_delivery_zones).post(create_delivery_zone),
        )
        .route("/admin/orders", get(list_orders))
        .route("/admin/orders/:id/status", put(update_order_status))
        .route("/admin/orders/batch/confirm", post(batch_confirm))
        .route("/admin/orders/batch/ship", post(batch_ship))
        .route("/admin/orders/batch/deliver", post(batch_deliver))
        .route("/admin/refunds", get(list_refunds))
        .route("/admin/refunds/:id/approve", post(approve_refund))
        .route("/admin/refunds/:id/reject", post(reject_refund))
        .route("/admin/refunds/:id/process", post(process_refund))
}

#[derive(Debug, Deserialize, ToSchema)]
struct BatchOrdersInput {
    order_ids: Vec<Uuid>,
}

#[derive(Debug, Serialize)]
struct BatchOutcome {
    updated: u64,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
struct RefundDecisionInput {
    note: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
struct ProcessRefundInput {
    reference: Option<String>,
}

/// Create a product
#[utoipa::path(
    post,
    path = "/api/v1/admin/products",
    responses(
        (status = 201, description = "Product created"),
        (status = 400, description = "Validation failed", body = crate::errors::ErrorResponse),
        (status = 404, description = "Category or manufacturer not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Slug already taken", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn create_product(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Json(payload): Json<CreateProductInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let product = state
        .services
        .catalog
        .create_product(payload)
        .await
        .map_err(map_service_error)?;

    Ok(created_response(ApiResponse::success(product)))
}

/// Update a product; absent fields are left unchanged
#[utoipa::path(
    put,
    path = "/api/v1/admin/products/{id}",
    params(("id" = Uuid, Path, description = "Product id")),
    responses(
        (status = 200, description = "Product updated"),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Slug already taken", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn update_product(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProductInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let product = state
        .services
        .catalog
        .update_product(id, payload)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(ApiResponse::success(product)))
}

/// Attach an image. The first image for a product becomes primary.
#[utoipa::path(
    post,
    path = "/api/v1/admin/products/{id}/images",
    params(("id" = Uuid, Path, description = "Product id")),
    responses(
        (status = 201, description = "Image stored"),
        (status = 400, description = "Image data is not valid base64", body = crate::errors::ErrorResponse),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn add_product_image(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<AddProductImageInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let image = state
        .services
        .catalog
        .add_product_image(id, payload)
        .await
        .map_err(map_service_error)?;

    Ok(created_response(ApiResponse::success(image)))
}

/// Record a stock movement and refresh the product's cached quantity
#[utoipa::path(
    post,
    path = "/api/v1/admin/products/{id}/stock",
    params(("id" = Uuid, Path, description = "Product id")),
    responses(
        (status = 200, description = "Movement recorded with the refreshed stock level"),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse),
        (status = 422, description = "Movement would drive stock negative", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn adjust_stock(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<RecordStockInput>,
) -> Result<impl IntoResponse, ApiError> {
    let movement = state
        .services
        .inventory
        .adjust_stock(id, payload, Some(admin.0.user_id))
        .await
        .map_err(map_service_error)?;

    Ok(success_response(ApiResponse::success(movement)))
}

/// Create a coupon
#[utoipa::path(
    post,
    path = "/api/v1/admin/coupons",
    responses(
        (status = 201, description = "Coupon created"),
        (status = 400, description = "Validation failed", body = crate::errors::ErrorResponse),
        (status = 409, description = "Code already exists", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn create_coupon(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Json(payload): Json<CreateCouponInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let coupon = state
        .services
        .coupons
        .create_coupon(payload)
        .await
        .map_err(map_service_error)?;

    Ok(created_response(ApiResponse::success(coupon)))
}

/// All coupons, newest first
#[utoipa::path(
    get,
    path = "/api/v1/admin/coupons",
    responses((status = 200, description = "All coupons, newest first")),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn list_coupons(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
) -> Result<impl IntoResponse, ApiError> {
    let coupons = state
        .services
        .coupons
        .list_coupons()
        .await
        .map_err(map_service_error)?;

    Ok(success_response(ApiResponse::success(coupons)))
}

/// Retire a coupon without deleting its usage history
#[utoipa::path(
    post,
    path = "/api/v1/admin/coupons/{id}/deactivate",
    params(("id" = Uuid, Path, description = "Coupon id")),
    responses(
        (status = 200, description = "Coupon deactivated"),
        (status = 404, description = "Coupon not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn deactivate_coupon(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let coupon = state
        .services
        .coupons
        .deactivate_coupon(id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(ApiResponse::success(coupon)))
}

/// Create a pincode-range delivery zone
#[utoipa::path(
    post,
    path = "/api/v1/admin/delivery-zones",
    responses(
        (status = 201, description = "Zone created"),
        (status = 400, description = "Invalid pincode range", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn create_delivery_zone(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Json(payload): Json<CreateDeliveryZoneInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let zone = state
        .services
        .delivery
        .create_zone(payload)
        .await
        .map_err(map_service_error)?;

    Ok(created_response(ApiResponse::success(zone)))
}

/// Delivery zones ordered by pincode range
#[utoipa::path(
    get,
    path = "/api/v1/admin/delivery-zones",
    responses((status = 200, description = "Zones ordered by pincode range")),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn list_delivery_zones(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
) -> Result<impl IntoResponse, ApiError> {
    let zones = state
        .services
        .delivery
        .list_zones()
        .await
        .map_err(map_service_error)?;

    Ok(success_response(ApiResponse::success(zones)))
}

/// All orders with an optional status filter
#[utoipa::path(
    get,
    path = "/api/v1/admin/orders",
    params(
        ("page" = Option<u64>, Query, description = "Page number, 1-based"),
        ("per_page" = Option<u64>, Query, description = "Page size, capped at 100"),
        ("status" = Option<String>, Query, description = "Filter by order status")
    ),
    responses((status = 200, description = "Paginated orders, newest first")),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn list_orders(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Query(query): Query<AdminOrderListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = query.page();
    let per_page = query.per_page();
    let (orders, total) = state
        .services
        .orders
        .list_orders_admin(query)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(ApiResponse::success(
        PaginatedResponse::new(orders, page, per_page, total),
    )))
}

/// Move an order along its lifecycle
#[utoipa::path(
    put,
    path = "/api/v1/admin/orders/{id}/status",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order transitioned"),
        (status = 400, description = "Transition not allowed from the current status", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn update_order_status(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateOrderStatusInput>,
) -> Result<impl IntoResponse, ApiError> {
    let order = state
        .services
        .orders
        .update_order_status(admin.0.user_id, id, payload)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(ApiResponse::success(order)))
}

/// Confirm every pending order in the batch; others are skipped
#[utoipa::path(
    post,
    path = "/api/v1/admin/orders/batch/confirm",
    responses((status = 200, description = "Count of orders confirmed")),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn batch_confirm(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
    Json(payload): Json<BatchOrdersInput>,
) -> Result<impl IntoResponse, ApiError> {
    let updated = state
        .services
        .orders
        .batch_confirm(admin.0.user_id, payload.order_ids)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(ApiResponse::success(BatchOutcome {
        updated,
    })))
}

/// Ship every confirmed or processing order in the batch
#[utoipa::path(
    post,
    path = "/api/v1/admin/orders/batch/ship",
    responses((status = 200, description = "Count of orders shipped")),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn batch_ship(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
    Json(payload): Json<BatchOrdersInput>,
) -> Result<impl IntoResponse, ApiError> {
    let updated = state
        .services
        .orders
        .batch_ship(admin.0.user_id, payload.order_ids)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(ApiResponse::success(BatchOutcome {
        updated,
    })))
}

/// Mark every out-for-delivery order in the batch as delivered
#[utoipa::path(
    post,
    path = "/api/v1/admin/orders/batch/deliver",
    responses((status = 200, description = "Count of orders delivered")),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn batch_deliver(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
    Json(payload): Json<BatchOrdersInput>,
) -> Result<impl IntoResponse, ApiError> {
    let updated = state
        .services
        .orders
        .batch_deliver(admin.0.user_id, payload.order_ids)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(ApiResponse::success(BatchOutcome {
        updated,
    })))
}

/// Refund requests with an optional status filter
#[utoipa::path(
    get,
    path = "/api/v1/admin/refunds",
    params(
        ("page" = Option<u64>, Query, description = "Page number, 1-based"),
        ("per_page" = Option<u64>, Query, description = "Page size, capped at 100"),
        ("status" = Option<String>, Query, description = "Filter by refund status")
    ),
    responses((status = 200, description = "Paginated refund requests, newest first")),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn list_refunds(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Query(query): Query<AdminRefundListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = query.page();
    let per_page = query.per_page();
    let (refunds, total) = state
        .services
        .orders
        .list_refunds_admin(query)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(ApiResponse::success(
        PaginatedResponse::new(refunds, page, per_page, total),
    )))
}

/// Approve a requested refund
#[utoipa::path(
    post,
    path = "/api/v1/admin/refunds/{id}/approve",
    params(("id" = Uuid, Path, description = "Refund id")),
    responses(
        (status = 200, description = "Refund approved"),
        (status = 400, description = "Refund already decided", body = crate::errors::ErrorResponse),
        (status = 404, description = "Refund not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn approve_refund(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<RefundDecisionInput>,
) -> Result<impl IntoResponse, ApiError> {
    let refund = state
        .services
        .orders
        .decide_refund(admin.0.user_id, id, true, payload.note)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(ApiResponse::success(refund)))
}

/// Reject a requested refund
#[utoipa::path(
    post,
    path = "/api/v1/admin/refunds/{id}/reject",
    params(("id" = Uuid, Path, description = "Refund id")),
    responses(
        (status = 200, description = "Refund rejected"),
        (status = 400, description = "Refund already decided", body = crate::errors::ErrorResponse),
        (status = 404, description = "Refund not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn reject_refund(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<RefundDecisionInput>,
) -> Result<impl IntoResponse, ApiError> {
    let refund = state
        .services
        .orders
        .decide_refund(admin.0.user_id, id, false, payload.note)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(ApiResponse::success(refund)))
}

/// Pay out an approved refund and flip the order's payment status
#[utoipa::path(
    post,
    path = "/api/v1/admin/refunds/{id}/process",
    params(("id" = Uuid, Path, description = "Refund id")),
    responses(
        (status = 200, description = "Refund processed"),
        (status = 400, description = "Refund is not approved", body = crate::errors::ErrorResponse),
        (status = 404, description = "Refund not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn process_refund(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<ProcessRefundInput>,
) -> Result<impl IntoResponse, ApiError> {
    let refund = state
        .services
        .orders
        .process_refund(admin.0.user_id, id, payload.reference)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(ApiResponse::success(refund)))
}
