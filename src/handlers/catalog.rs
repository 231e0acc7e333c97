use crate::handlers::common::{
    created_response, map_service_error, success_response, validate_input,
};
use crate::{
    auth::{CurrentUser, OptionalUser},
    errors::{ApiError, ServiceError},
    services::catalog::{ProductListQuery, SubmitReviewInput},
    ApiResponse, AppState, PaginatedResponse,
};
use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

/// Public catalog routes. Sibling routes under `/products` must share one
/// path-parameter name, so the id-based endpoints reuse `:slug` and parse
/// the segment as a UUID.
pub fn catalog_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/products", get(list_products))
        .route("/products/search-suggestions", get(search_suggestions))
        .route("/products/:slug", get(product_detail))
        .route("/products/:slug/quick-view", get(quick_view))
        .route(
            "/products/:slug/reviews",
            get(list_reviews).post(submit_review),
        )
        .route("/categories", get(list_categories))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SuggestQuery {
    q: String,
}

/// Browse the catalog with optional category, search and featured filters
#[utoipa::path(
    get,
    path = "/api/v1/products",
    params(
        ("page" = Option<u64>, Query, description = "Page number, 1-based"),
        ("per_page" = Option<u64>, Query, description = "Page size, capped at 100"),
        ("category" = Option<String>, Query, description = "Category slug"),
        ("q" = Option<String>, Query, description = "Name search"),
        ("featured" = Option<bool>, Query, description = "Only featured products")
    ),
    responses(
        (status = 200, description = "Paginated product cards priced for the caller")
    ),
    tag = "catalog"
)]
pub async fn list_products(
    State(state): State<Arc<AppState>>,
    OptionalUser(user): OptionalUser,
    Query(query): Query<ProductListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = query.page();
    let per_page = query.per_page();
    let shopper = user.map(|u| u.kind);

    let (products, total) = state
        .services
        .catalog
        .list_products(query, shopper)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(ApiResponse::success(
        PaginatedResponse::new(products, page, per_page, total),
    )))
}

/// Full product page by slug
#[utoipa::path(
    get,
    path = "/api/v1/products/{slug}",
    params(("slug" = String, Path, description = "Product slug")),
    responses(
        (status = 200, description = "Product detail with images, rating and reviews"),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    tag = "catalog"
)]
pub async fn product_detail(
    State(state): State<Arc<AppState>>,
    OptionalUser(user): OptionalUser,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let shopper = user.map(|u| u.kind);
    let detail = state
        .services
        .catalog
        .get_product_by_slug(&slug, shopper)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(ApiResponse::success(detail)))
}

/// Flat quick-view payload for the storefront's hover card. An unknown
/// product answers with the legacy `{"error": ...}` shape the storefront
/// script expects.
#[utoipa::path(
    get,
    path = "/api/v1/products/{id}/quick-view",
    params(("id" = Uuid, Path, description = "Product id")),
    responses(
        (status = 200, description = "Flat product summary priced for the caller"),
        (status = 404, description = "Unknown product: `{\"error\": \"Product not found\"}`")
    ),
    tag = "catalog"
)]
pub async fn quick_view(
    State(state): State<Arc<AppState>>,
    OptionalUser(user): OptionalUser,
    Path(product_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let shopper = user.map(|u| u.kind);
    match state.services.catalog.quick_view(product_id, shopper).await {
        Ok(view) => Ok(success_response(view)),
        Err(ServiceError::NotFound(_)) => Ok((
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Product not found" })),
        )
            .into_response()),
        Err(err) => Err(map_service_error(err)),
    }
}

/// Typeahead suggestions for the search box
#[utoipa::path(
    get,
    path = "/api/v1/products/search-suggestions",
    params(("q" = Option<String>, Query, description = "Partial product or category name")),
    responses(
        (status = 200, description = "Up to five products and three categories")
    ),
    tag = "catalog"
)]
pub async fn search_suggestions(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SuggestQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let suggestions = state
        .services
        .catalog
        .search_suggestions(&query.q)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(ApiResponse::success(suggestions)))
}

/// Active categories in display order
#[utoipa::path(
    get,
    path = "/api/v1/categories",
    responses((status = 200, description = "Active categories in display order")),
    tag = "catalog"
)]
pub async fn list_categories(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let categories = state
        .services
        .catalog
        .list_categories()
        .await
        .map_err(map_service_error)?;

    Ok(success_response(ApiResponse::success(categories)))
}

/// Reviews for a product, newest first
#[utoipa::path(
    get,
    path = "/api/v1/products/{id}/reviews",
    params(("id" = Uuid, Path, description = "Product id")),
    responses(
        (status = 200, description = "Reviews with reviewer names, newest first"),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    tag = "catalog"
)]
pub async fn list_reviews(
    State(state): State<Arc<AppState>>,
    Path(product_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let reviews = state
        .services
        .catalog
        .list_reviews(product_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(ApiResponse::success(reviews)))
}

/// Rate a product. One review per account; resubmitting replaces it.
#[utoipa::path(
    post,
    path = "/api/v1/products/{id}/reviews",
    params(("id" = Uuid, Path, description = "Product id")),
    responses(
        (status = 201, description = "Review recorded"),
        (status = 400, description = "Rating out of range", body = crate::errors::ErrorResponse),
        (status = 401, description = "Authentication required", body = crate::errors::ErrorResponse),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "catalog"
)]
pub async fn submit_review(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(product_id): Path<Uuid>,
    Json(payload): Json<SubmitReviewInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let review = state
        .services
        .catalog
        .submit_review(user.user_id, product_id, payload)
        .await
        .map_err(map_service_error)?;

    Ok(created_response(ApiResponse::success(review)))
}
