use crate::handlers::common::{
    created_response, map_service_error, no_content_response, success_response, validate_input,
};
use crate::{
    auth::{CurrentUser, SESSION_KEY_HEADER},
    errors::ApiError,
    services::accounts::{AddressInput, LoginInput, RegisterInput},
    ApiResponse, AppState,
};
use axum::{
    extract::{Json, Path, State},
    http::HeaderMap,
    response::IntoResponse,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use uuid::Uuid;

/// Routes for registration, login and the signed-in account area.
pub fn auth_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/me", get(me))
        .route("/me/addresses", get(list_addresses).post(create_address))
        .route(
            "/me/addresses/:id",
            put(update_address).delete(delete_address),
        )
        .route("/me/addresses/:id/default", post(set_default_address))
}

/// Register a patient or pharmacy account
#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    responses(
        (status = 201, description = "Account created"),
        (status = 400, description = "Validation failed", body = crate::errors::ErrorResponse),
        (status = 409, description = "Email or license already registered", body = crate::errors::ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let user = state
        .services
        .accounts
        .register(payload)
        .await
        .map_err(map_service_error)?;

    Ok(created_response(ApiResponse::success(user)))
}

/// Log in and receive an access token. When an `X-Session-Key` header is
/// present the guest cart is folded into the user's cart.
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    responses(
        (status = 200, description = "Access token issued"),
        (status = 401, description = "Invalid email or password", body = crate::errors::ErrorResponse),
        (status = 403, description = "Account is disabled", body = crate::errors::ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<LoginInput>,
) -> Result<impl IntoResponse, ApiError> {
    let output = state
        .services
        .accounts
        .login(payload)
        .await
        .map_err(map_service_error)?;

    let session_key = headers
        .get(&SESSION_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|key| !key.is_empty());
    if let Some(session_key) = session_key {
        state
            .services
            .cart
            .merge_session_cart(session_key, output.user.id)
            .await
            .map_err(map_service_error)?;
    }

    Ok(success_response(output))
}

/// Current account with its patient or pharmacy profile
#[utoipa::path(
    get,
    path = "/api/v1/me",
    responses(
        (status = 200, description = "Account profile"),
        (status = 401, description = "Authentication required", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "auth"
)]
pub async fn me(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
) -> Result<impl IntoResponse, ApiError> {
    let profile = state
        .services
        .accounts
        .profile(user.user_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(ApiResponse::success(profile)))
}

/// List the account's saved addresses
#[utoipa::path(
    get,
    path = "/api/v1/me/addresses",
    responses(
        (status = 200, description = "Addresses, default first"),
        (status = 401, description = "Authentication required", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "auth"
)]
pub async fn list_addresses(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
) -> Result<impl IntoResponse, ApiError> {
    let addresses = state
        .services
        .accounts
        .list_addresses(user.user_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(ApiResponse::success(addresses)))
}

/// Save a new address
#[utoipa::path(
    post,
    path = "/api/v1/me/addresses",
    responses(
        (status = 201, description = "Address saved"),
        (status = 400, description = "Validation failed", body = crate::errors::ErrorResponse),
        (status = 401, description = "Authentication required", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "auth"
)]
pub async fn create_address(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Json(payload): Json<AddressInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let address = state
        .services
        .accounts
        .create_address(user.user_id, payload)
        .await
        .map_err(map_service_error)?;

    Ok(created_response(ApiResponse::success(address)))
}

/// Replace a saved address
#[utoipa::path(
    put,
    path = "/api/v1/me/addresses/{id}",
    params(("id" = Uuid, Path, description = "Address id")),
    responses(
        (status = 200, description = "Address updated"),
        (status = 404, description = "Address not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "auth"
)]
pub async fn update_address(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<AddressInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;

    let address = state
        .services
        .accounts
        .update_address(user.user_id, id, payload)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(ApiResponse::success(address)))
}

/// Delete a saved address
#[utoipa::path(
    delete,
    path = "/api/v1/me/addresses/{id}",
    params(("id" = Uuid, Path, description = "Address id")),
    responses(
        (status = 204, description = "Address deleted"),
        (status = 404, description = "Address not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "auth"
)]
pub async fn delete_address(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .services
        .accounts
        .delete_address(user.user_id, id)
        .await
        .map_err(map_service_error)?;

    Ok(no_content_response())
}

/// Make an address the default
#[utoipa::path(
    post,
    path = "/api/v1/me/addresses/{id}/default",
    params(("id" = Uuid, Path, description = "Address id")),
    responses(
        (status = 200, description = "Default address changed"),
        (status = 404, description = "Address not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "auth"
)]
pub async fn set_default_address(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let address = state
        .services
        .accounts
        .set_default_address(user.user_id, id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(ApiResponse::success(address)))
}
