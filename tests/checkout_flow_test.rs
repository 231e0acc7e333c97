//! End-to-end checkout tests: register, save an address, fill the cart
//! and place an order.
//!
//! Tests cover:
//! - The happy path with stock decrement and cart clearing
//! - Delivery charge pricing around the free-delivery threshold
//! - Zone-based charges and the unserviceable-zone fallback
//! - Empty-cart, foreign-address and stock-shortfall rejections
//! - Prescription image validation

mod common;

use axum::{body, http::Method, response::Response};
use common::TestApp;
use medicart_api::entities::{product, Product};
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, EntityTrait, IntoActiveModel, Set};
use serde_json::{json, Value};

async fn response_json(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}

fn money(value: &Value) -> f64 {
    value
        .as_str()
        .and_then(|s| s.parse::<f64>().ok())
        .unwrap_or_else(|| panic!("expected a decimal string, got {value}"))
}

/// Register a patient account and return its bearer token.
async fn signed_in_shopper(app: &TestApp, email: &str) -> String {
    let response = app
        .request(
            Method::POST,
            "/api/v1/auth/register",
            Some(json!({
                "email": email,
                "password": "checkout-pass-1",
                "full_name": "Checkout Shopper",
                "phone": "9876540001",
                "kind": "patient"
            })),
            None,
        )
        .await;
    assert_eq!(response.status(), 201, "registration should succeed");

    let response = app
        .request(
            Method::POST,
            "/api/v1/auth/login",
            Some(json!({ "email": email, "password": "checkout-pass-1" })),
            None,
        )
        .await;
    assert_eq!(response.status(), 200, "login should succeed");
    response_json(response).await["access_token"]
        .as_str()
        .unwrap()
        .to_string()
}

/// Save a Bengaluru address for the account and return its id.
async fn saved_address(app: &TestApp, token: &str) -> String {
    let response = app
        .request(
            Method::POST,
            "/api/v1/me/addresses",
            Some(json!({
                "label": "home",
                "recipient_name": "Asha Rao",
                "phone": "9876501234",
                "line1": "12 MG Road",
                "city": "Bengaluru",
                "state": "Karnataka",
                "pincode": "560001",
                "is_default": true
            })),
            Some(token),
        )
        .await;
    assert_eq!(response.status(), 201, "address creation should succeed");
    response_json(response).await["data"]["id"]
        .as_str()
        .unwrap()
        .to_string()
}

async fn add_to_cart(app: &TestApp, token: &str, product_id: &str, quantity: i32) {
    let response = app
        .request(
            Method::POST,
            "/api/v1/cart/items",
            Some(json!({ "product_id": product_id, "quantity": quantity })),
            Some(token),
        )
        .await;
    let body = response_json(response).await;
    assert!(body["success"].as_bool().unwrap(), "add to cart: {body}");
}

// ==================== Happy Path ====================

#[tokio::test]
async fn checkout_places_the_order_and_empties_the_cart() {
    let app = TestApp::new().await;
    let product = app.seed_product("Metformin 500mg", dec!(250), 10).await;
    let token = signed_in_shopper(&app, "order.placer@example.com").await;
    let address_id = saved_address(&app, &token).await;

    add_to_cart(&app, &token, &product.id.to_string(), 2).await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/checkout",
            Some(json!({ "address_id": address_id, "payment_method": "cod" })),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), 201);

    let body = response_json(response).await;
    assert!(body["success"].as_bool().unwrap());
    let order = &body["data"]["order"];
    assert!(order["order_number"].as_str().unwrap().starts_with("ORD-"));
    assert_eq!(order["status"], "pending");
    assert_eq!(order["payment_status"], "pending");
    assert_eq!(order["payment_method"], "cod");
    assert_eq!(money(&order["subtotal"]), 500.0);
    // ₹500 hits the free-delivery threshold.
    assert_eq!(money(&order["delivery_charge"]), 0.0);
    assert_eq!(money(&order["total_amount"]), 500.0);
    assert_eq!(order["delivery_address"]["pincode"], "560001");
    assert_eq!(order["delivery_address"]["recipient_name"], "Asha Rao");

    let items = body["data"]["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["product_name"], "Metformin 500mg");
    assert_eq!(items[0]["quantity"], 2);
    assert_eq!(money(&items[0]["total_price"]), 500.0);

    // The cart is cleared once the order commits.
    let response = app
        .request(Method::GET, "/api/v1/cart", None, Some(&token))
        .await;
    let cart = response_json(response).await;
    assert!(cart["data"]["items"].as_array().unwrap().is_empty());

    // Two units left the shelf.
    let stored = Product::find_by_id(product.id)
        .one(&*app.state.db)
        .await
        .expect("product lookup")
        .expect("product still exists");
    assert_eq!(stored.stock_quantity, 8);
}

#[tokio::test]
async fn orders_below_the_threshold_carry_the_delivery_charge() {
    let app = TestApp::new().await;
    let product = app.seed_product("Azithromycin 250mg", dec!(180), 10).await;
    let token = signed_in_shopper(&app, "charged.order@example.com").await;
    let address_id = saved_address(&app, &token).await;

    add_to_cart(&app, &token, &product.id.to_string(), 1).await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/checkout",
            Some(json!({ "address_id": address_id, "payment_method": "online" })),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), 201);

    let order = &response_json(response).await["data"]["order"];
    assert_eq!(money(&order["subtotal"]), 180.0);
    assert_eq!(money(&order["delivery_charge"]), 50.0);
    assert_eq!(money(&order["total_amount"]), 230.0);
    assert_eq!(order["payment_method"], "online");
}

// ==================== Rejection Tests ====================

#[tokio::test]
async fn checkout_with_an_empty_cart_is_rejected() {
    let app = TestApp::new().await;
    let token = signed_in_shopper(&app, "empty.cart@example.com").await;
    let address_id = saved_address(&app, &token).await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/checkout",
            Some(json!({ "address_id": address_id, "payment_method": "cod" })),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), 400);

    let body = response_json(response).await;
    assert_eq!(body["message"], "Your cart is empty");
}

#[tokio::test]
async fn checkout_rejects_an_address_belonging_to_someone_else() {
    let app = TestApp::new().await;
    let product = app.seed_product("Ibuprofen 400mg", dec!(60), 10).await;

    let owner_token = signed_in_shopper(&app, "address.owner@example.com").await;
    let foreign_address = saved_address(&app, &owner_token).await;

    let token = signed_in_shopper(&app, "address.borrower@example.com").await;
    add_to_cart(&app, &token, &product.id.to_string(), 1).await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/checkout",
            Some(json!({ "address_id": foreign_address, "payment_method": "cod" })),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), 404);
    assert_eq!(response_json(response).await["message"], "Address not found");
}

#[tokio::test]
async fn checkout_rejects_a_malformed_prescription_image() {
    let app = TestApp::new().await;
    let product = app.seed_product("Tramadol 50mg", dec!(95), 10).await;
    let token = signed_in_shopper(&app, "rx.upload@example.com").await;
    let address_id = saved_address(&app, &token).await;

    add_to_cart(&app, &token, &product.id.to_string(), 1).await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/checkout",
            Some(json!({
                "address_id": address_id,
                "payment_method": "cod",
                "prescription_image": "not//valid??base64!!"
            })),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), 400);

    let body = response_json(response).await;
    assert_eq!(body["message"], "Invalid prescription image");

    // The rejection left the cart untouched.
    let response = app
        .request(Method::GET, "/api/v1/cart", None, Some(&token))
        .await;
    let cart = response_json(response).await;
    assert_eq!(cart["data"]["items"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn checkout_fails_when_stock_ran_out_after_the_cart_was_filled() {
    let app = TestApp::new().await;
    let product = app.seed_product("Thyroxine 100mcg", dec!(140), 2).await;
    let token = signed_in_shopper(&app, "stale.cart@example.com").await;
    let address_id = saved_address(&app, &token).await;

    add_to_cart(&app, &token, &product.id.to_string(), 2).await;

    // Stock shrinks between carting and checkout.
    let stored = Product::find_by_id(product.id)
        .one(&*app.state.db)
        .await
        .expect("product lookup")
        .expect("product exists");
    let mut active: product::ActiveModel = stored.into_active_model();
    active.stock_quantity = Set(1);
    active.update(&*app.state.db).await.expect("stock shrink");

    let response = app
        .request(
            Method::POST,
            "/api/v1/checkout",
            Some(json!({ "address_id": address_id, "payment_method": "cod" })),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), 422);

    let body = response_json(response).await;
    assert!(
        body["message"]
            .as_str()
            .unwrap()
            .starts_with("Insufficient stock"),
        "unexpected message: {body}"
    );

    // The rolled-back order must not have consumed the remaining unit.
    let stored = Product::find_by_id(product.id)
        .one(&*app.state.db)
        .await
        .expect("product lookup")
        .expect("product exists");
    assert_eq!(stored.stock_quantity, 1);
}

// ==================== Delivery Zone Tests ====================

#[tokio::test]
async fn zone_charges_apply_below_the_threshold() {
    let app = TestApp::new().await;
    let admin = app.seed_admin().await;
    let admin_token = app.token_for(&admin);

    let response = app
        .request(
            Method::POST,
            "/api/v1/admin/delivery-zones",
            Some(json!({
                "name": "Bengaluru Core",
                "pincode_start": "560000",
                "pincode_end": "560099",
                "delivery_charge": 30,
                "estimated_days": 2
            })),
            Some(&admin_token),
        )
        .await;
    assert_eq!(response.status(), 201);
    let body = response_json(response).await;
    assert_eq!(body["data"]["name"], "Bengaluru Core");
    assert_eq!(body["data"]["is_serviceable"], true);
    assert_eq!(body["data"]["estimated_days"], 2);

    let response = app
        .request(
            Method::GET,
            "/api/v1/admin/delivery-zones",
            None,
            Some(&admin_token),
        )
        .await;
    let zones = response_json(response).await["data"]
        .as_array()
        .unwrap()
        .len();
    assert_eq!(zones, 1);

    // ₹450 sits below the threshold, and 560001 falls inside the zone.
    let product = app.seed_product("Protein Powder", dec!(450), 10).await;
    let token = signed_in_shopper(&app, "zone.shopper@example.com").await;
    let address_id = saved_address(&app, &token).await;
    add_to_cart(&app, &token, &product.id.to_string(), 1).await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/checkout",
            Some(json!({ "address_id": address_id, "payment_method": "cod" })),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), 201);

    let order = &response_json(response).await["data"]["order"];
    assert_eq!(money(&order["subtotal"]), 450.0);
    assert_eq!(money(&order["delivery_charge"]), 30.0);
    assert_eq!(money(&order["total_amount"]), 480.0);
}

#[tokio::test]
async fn unserviceable_zones_fall_back_to_the_flat_charge() {
    let app = TestApp::new().await;
    let admin = app.seed_admin().await;
    let admin_token = app.token_for(&admin);

    let response = app
        .request(
            Method::POST,
            "/api/v1/admin/delivery-zones",
            Some(json!({
                "name": "Bengaluru Core (suspended)",
                "pincode_start": "560000",
                "pincode_end": "560099",
                "delivery_charge": 30,
                "is_serviceable": false
            })),
            Some(&admin_token),
        )
        .await;
    assert_eq!(response.status(), 201);

    let product = app.seed_product("Protein Powder", dec!(450), 10).await;
    let token = signed_in_shopper(&app, "fallback.shopper@example.com").await;
    let address_id = saved_address(&app, &token).await;
    add_to_cart(&app, &token, &product.id.to_string(), 1).await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/checkout",
            Some(json!({ "address_id": address_id, "payment_method": "cod" })),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), 201);

    // The suspended zone is skipped, so the flat ₹50 default applies.
    let order = &response_json(response).await["data"]["order"];
    assert_eq!(money(&order["delivery_charge"]), 50.0);
    assert_eq!(money(&order["total_amount"]), 500.0);
}

#[tokio::test]
async fn zone_ranges_must_be_ordered_six_digit_pincodes() {
    let app = TestApp::new().await;
    let admin = app.seed_admin().await;
    let admin_token = app.token_for(&admin);

    let response = app
        .request(
            Method::POST,
            "/api/v1/admin/delivery-zones",
            Some(json!({
                "name": "Inverted Range",
                "pincode_start": "560099",
                "pincode_end": "560000",
                "delivery_charge": 30
            })),
            Some(&admin_token),
        )
        .await;
    assert_eq!(response.status(), 400);
    assert_eq!(
        response_json(response).await["message"],
        "Pincode range start must not exceed its end"
    );

    let response = app
        .request(
            Method::POST,
            "/api/v1/admin/delivery-zones",
            Some(json!({
                "name": "Short Pincode",
                "pincode_start": "56",
                "pincode_end": "560099",
                "delivery_charge": 30
            })),
            Some(&admin_token),
        )
        .await;
    assert_eq!(response.status(), 400);
}
