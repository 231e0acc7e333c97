use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "MediCart API",
        version = "1.0.0",
        description = r#"
# MediCart Pharmacy Storefront API

The HTTP API behind the MediCart online pharmacy: catalog browsing, carts for
guests and signed-in shoppers, coupon pricing, checkout, order tracking and
refunds, plus the administrative surface used by store staff.

## Features

- **Catalog**: Products with pack variants, prescription flags, categories and reviews
- **Carts**: Guest carts keyed by an opaque session header, merged into the account on login
- **Coupons**: Percentage and flat discounts with usage caps and pincode restrictions
- **Checkout**: Address validation, delivery-zone pricing and stock reservation in one transaction
- **Orders**: Status tracking, cancellation and refund requests
- **Admin**: Product, stock, coupon, delivery-zone, order and refund management

## Authentication

Authenticated endpoints accept a JWT in the Authorization header:

```
Authorization: Bearer <your-jwt-token>
```

Guest carts instead identify themselves with the `x-session-key` header. Admin
endpoints require a token whose account carries the admin role.

## Rate Limiting

Requests are rate-limited per session or client address. Check the response
headers for the current window:
- `X-RateLimit-Limit`: Maximum requests per window
- `X-RateLimit-Remaining`: Remaining requests in the current window
- `X-RateLimit-Reset`: Seconds until the window resets

## Error Handling

Failing endpoints return a consistent payload with an appropriate status code:

```json
{
  "error": "Not Found",
  "message": "Product not found",
  "request_id": "4f2b...",
  "timestamp": "2025-01-01T00:00:00Z"
}
```

## Pagination

List endpoints accept `page` and `per_page` query parameters and answer with a
`pagination` block carrying `page`, `per_page`, `total` and `total_pages`.
        "#,
        contact(
            name = "MediCart Engineering",
            email = "engineering@medicart.example"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "auth", description = "Registration, login and address book"),
        (name = "catalog", description = "Product and category browsing"),
        (name = "cart", description = "Cart contents and coupon application"),
        (name = "wishlist", description = "Saved products"),
        (name = "checkout", description = "Order placement"),
        (name = "orders", description = "Order history, tracking and refunds"),
        (name = "admin", description = "Store management endpoints")
    ),
    paths(
        // Auth and account
        crate::handlers::auth::register,
        crate::handlers::auth::login,
        crate::handlers::auth::me,
        crate::handlers::auth::list_addresses,
        crate::handlers::auth::create_address,
        crate::handlers::auth::update_address,
        crate::handlers::auth::delete_address,
        crate::handlers::auth::set_default_address,

        // Catalog
        crate::handlers::catalog::list_products,
        crate::handlers::catalog::product_detail,
        crate::handlers::catalog::quick_view,
        crate::handlers::catalog::search_suggestions,
        crate::handlers::catalog::list_categories,
        crate::handlers::catalog::list_reviews,
        crate::handlers::catalog::submit_review,

        // Cart
        crate::handlers::cart::cart_summary,
        crate::handlers::cart::add_item,
        crate::handlers::cart::update_item,
        crate::handlers::cart::remove_item,
        crate::handlers::cart::clear_cart,
        crate::handlers::cart::apply_coupon,

        // Wishlist
        crate::handlers::wishlist::list_wishlist,
        crate::handlers::wishlist::add_to_wishlist,
        crate::handlers::wishlist::remove_from_wishlist,
        crate::handlers::wishlist::move_to_cart,

        // Checkout and orders
        crate::handlers::checkout::place_order,
        crate::handlers::orders::list_orders,
        crate::handlers::orders::order_detail,
        crate::handlers::orders::track_order,
        crate::handlers::orders::cancel_order,
        crate::handlers::orders::request_refund,

        // Admin
        crate::handlers::admin::create_product,
        crate::handlers::admin::update_product,
        crate::handlers::admin::add_product_image,
        crate::handlers::admin::adjust_stock,
        crate::handlers::admin::create_coupon,
        crate::handlers::admin::list_coupons,
        crate::handlers::admin::deactivate_coupon,
        crate::handlers::admin::create_delivery_zone,
        crate::handlers::admin::list_delivery_zones,
        crate::handlers::admin::list_orders,
        crate::handlers::admin::update_order_status,
        crate::handlers::admin::batch_confirm,
        crate::handlers::admin::batch_ship,
        crate::handlers::admin::batch_deliver,
        crate::handlers::admin::list_refunds,
        crate::handlers::admin::approve_refund,
        crate::handlers::admin::reject_refund,
        crate::handlers::admin::process_refund,
    ),
    components(
        schemas(
            crate::ApiResponse<serde_json::Value>,
            crate::PaginatedResponse<serde_json::Value>,
            crate::handlers::common::PaginationMeta,
            crate::errors::ErrorResponse
        )
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDocV1;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/docs")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}
