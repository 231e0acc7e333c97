//! Integration tests for the shared guest/user cart.
//!
//! Tests cover:
//! - Guest carts keyed by the `X-Session-Key` header
//! - Quantity updates, removal and clearing with recalculated totals
//! - Stock shortfalls reported as flat `success: false` payloads
//! - Folding a guest cart into the account cart at login

mod common;

use axum::{body, http::Method, response::Response};
use common::TestApp;
use rust_decimal_macros::dec;
use serde_json::{json, Value};

async fn response_json(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}

/// Decimal fields serialize as strings; parse them so assertions do not
/// depend on the stored scale.
fn money(value: &Value) -> f64 {
    value
        .as_str()
        .and_then(|s| s.parse::<f64>().ok())
        .unwrap_or_else(|| panic!("expected a decimal string, got {value}"))
}

// ==================== Guest Cart Tests ====================

#[tokio::test]
async fn guest_adds_an_item_and_reads_the_summary_back() {
    let app = TestApp::new().await;
    let product = app.seed_product("Paracetamol 500mg", dec!(100), 10).await;

    let response = app
        .request_with_session(
            Method::POST,
            "/api/v1/cart/items",
            Some(json!({ "product_id": product.id, "quantity": 2 })),
            "guest-session-1",
        )
        .await;
    assert_eq!(response.status(), 200);

    let body = response_json(response).await;
    assert!(body["success"].as_bool().unwrap());
    assert_eq!(body["message"], "Paracetamol 500mg added to cart");
    assert_eq!(body["cart_items_count"], 2);
    assert_eq!(body["item_quantity"], 2);
    assert_eq!(money(&body["cart_subtotal"]), 200.0);

    let response = app
        .request_with_session(Method::GET, "/api/v1/cart", None, "guest-session-1")
        .await;
    assert_eq!(response.status(), 200);

    let body = response_json(response).await;
    assert!(body["success"].as_bool().unwrap());
    let summary = &body["data"];
    assert_eq!(summary["items"].as_array().unwrap().len(), 1);
    assert_eq!(summary["items"][0]["product_id"], product.id.to_string());
    assert_eq!(summary["items"][0]["quantity"], 2);
    assert_eq!(money(&summary["items"][0]["line_total"]), 200.0);
    assert_eq!(summary["items_count"], 2);
    assert_eq!(money(&summary["subtotal"]), 200.0);
}

#[tokio::test]
async fn adding_the_same_product_twice_merges_the_line() {
    let app = TestApp::new().await;
    let product = app.seed_product("Ibuprofen 400mg", dec!(60), 10).await;

    let response = app
        .request_with_session(
            Method::POST,
            "/api/v1/cart/items",
            Some(json!({ "product_id": product.id, "quantity": 2 })),
            "guest-repeat",
        )
        .await;
    assert!(response_json(response).await["success"].as_bool().unwrap());

    let response = app
        .request_with_session(
            Method::POST,
            "/api/v1/cart/items",
            Some(json!({ "product_id": product.id, "quantity": 3 })),
            "guest-repeat",
        )
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert!(body["success"].as_bool().unwrap());
    assert_eq!(body["item_quantity"], 5);
    assert_eq!(body["cart_items_count"], 5);

    let response = app
        .request_with_session(Method::GET, "/api/v1/cart", None, "guest-repeat")
        .await;
    let body = response_json(response).await;
    let items = body["data"]["items"].as_array().unwrap();
    assert_eq!(items.len(), 1, "repeat adds merge into one line");
    assert_eq!(items[0]["quantity"], 5);
    assert_eq!(money(&items[0]["line_total"]), 300.0);
}

#[tokio::test]
async fn session_keys_isolate_guest_carts() {
    let app = TestApp::new().await;
    let product = app.seed_product("Cetirizine 10mg", dec!(45), 20).await;

    let response = app
        .request_with_session(
            Method::POST,
            "/api/v1/cart/items",
            Some(json!({ "product_id": product.id, "quantity": 1 })),
            "guest-a",
        )
        .await;
    assert_eq!(response.status(), 200);

    let response = app
        .request_with_session(Method::GET, "/api/v1/cart", None, "guest-b")
        .await;
    let body = response_json(response).await;
    assert!(
        body["data"]["items"].as_array().unwrap().is_empty(),
        "a different session key must see an empty cart"
    );
}

// ==================== Stock Shortfall Tests ====================

#[tokio::test]
async fn adding_beyond_stock_reports_the_shortfall() {
    let app = TestApp::new().await;
    let product = app.seed_product("Insulin Pen", dec!(450), 3).await;

    let response = app
        .request_with_session(
            Method::POST,
            "/api/v1/cart/items",
            Some(json!({ "product_id": product.id, "quantity": 5 })),
            "guest-short",
        )
        .await;
    assert_eq!(response.status(), 200, "shortfalls are not error statuses");

    let body = response_json(response).await;
    assert!(!body["success"].as_bool().unwrap());
    assert_eq!(body["message"], "Insufficient stock available");
    assert_eq!(body["stock_available"], 3);

    // Nothing was added.
    let response = app
        .request_with_session(Method::GET, "/api/v1/cart", None, "guest-short")
        .await;
    let body = response_json(response).await;
    assert!(body["data"]["items"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn topping_up_past_stock_reports_the_held_quantity() {
    let app = TestApp::new().await;
    let product = app.seed_product("Vitamin D3", dec!(120), 4).await;

    let response = app
        .request_with_session(
            Method::POST,
            "/api/v1/cart/items",
            Some(json!({ "product_id": product.id, "quantity": 3 })),
            "guest-topup",
        )
        .await;
    assert!(response_json(response).await["success"].as_bool().unwrap());

    let response = app
        .request_with_session(
            Method::POST,
            "/api/v1/cart/items",
            Some(json!({ "product_id": product.id, "quantity": 2 })),
            "guest-topup",
        )
        .await;
    assert_eq!(response.status(), 200);

    let body = response_json(response).await;
    assert!(!body["success"].as_bool().unwrap());
    assert_eq!(body["message"], "Only 4 items available");
    assert_eq!(body["current_quantity"], 3);
}

// ==================== Quantity Update Tests ====================

#[tokio::test]
async fn quantity_updates_and_removal_recalculate_totals() {
    let app = TestApp::new().await;
    let product = app.seed_product("Amoxicillin 250mg", dec!(80), 50).await;

    let register = app
        .request(
            Method::POST,
            "/api/v1/auth/register",
            Some(json!({
                "email": "cart.shopper@example.com",
                "password": "secret-pass-1",
                "full_name": "Cart Shopper",
                "phone": "9876500011",
                "kind": "patient"
            })),
            None,
        )
        .await;
    assert_eq!(register.status(), 201);

    let login = app
        .request(
            Method::POST,
            "/api/v1/auth/login",
            Some(json!({
                "email": "cart.shopper@example.com",
                "password": "secret-pass-1"
            })),
            None,
        )
        .await;
    assert_eq!(login.status(), 200);
    let login_body = response_json(login).await;
    let token = login_body["access_token"].as_str().unwrap().to_string();

    let response = app
        .request(
            Method::POST,
            "/api/v1/cart/items",
            Some(json!({ "product_id": product.id, "quantity": 1 })),
            Some(&token),
        )
        .await;
    assert!(response_json(response).await["success"].as_bool().unwrap());

    let response = app
        .request(Method::GET, "/api/v1/cart", None, Some(&token))
        .await;
    let summary = response_json(response).await;
    let item_id = summary["data"]["items"][0]["id"].as_str().unwrap().to_string();

    let response = app
        .request(
            Method::PUT,
            &format!("/api/v1/cart/items/{item_id}"),
            Some(json!({ "quantity": 3 })),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert!(body["success"].as_bool().unwrap());
    assert_eq!(body["item_quantity"], 3);
    assert_eq!(money(&body["cart_subtotal"]), 240.0);

    let response = app
        .request(
            Method::DELETE,
            &format!("/api/v1/cart/items/{item_id}"),
            None,
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert!(body["success"].as_bool().unwrap());
    assert_eq!(body["cart_items_count"], 0);
    assert_eq!(money(&body["cart_subtotal"]), 0.0);
}

#[tokio::test]
async fn setting_quantity_to_zero_removes_the_line() {
    let app = TestApp::new().await;
    let product = app.seed_product("ORS Sachet", dec!(20), 30).await;

    let response = app
        .request_with_session(
            Method::POST,
            "/api/v1/cart/items",
            Some(json!({ "product_id": product.id, "quantity": 2 })),
            "guest-zero",
        )
        .await;
    assert!(response_json(response).await["success"].as_bool().unwrap());

    let response = app
        .request_with_session(Method::GET, "/api/v1/cart", None, "guest-zero")
        .await;
    let summary = response_json(response).await;
    let item_id = summary["data"]["items"][0]["id"].as_str().unwrap().to_string();

    let response = app
        .request_with_session(
            Method::PUT,
            &format!("/api/v1/cart/items/{item_id}"),
            Some(json!({ "quantity": 0 })),
            "guest-zero",
        )
        .await;
    assert_eq!(response.status(), 200);
    assert_eq!(response_json(response).await["cart_items_count"], 0);
}

#[tokio::test]
async fn clearing_the_cart_empties_every_line() {
    let app = TestApp::new().await;
    let first = app.seed_product("Band-Aid Pack", dec!(35), 15).await;
    let second = app.seed_product("Antiseptic Liquid", dec!(90), 15).await;

    for product in [&first, &second] {
        let response = app
            .request_with_session(
                Method::POST,
                "/api/v1/cart/items",
                Some(json!({ "product_id": product.id, "quantity": 1 })),
                "guest-clear",
            )
            .await;
        assert!(response_json(response).await["success"].as_bool().unwrap());
    }

    let response = app
        .request_with_session(Method::DELETE, "/api/v1/cart", None, "guest-clear")
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert!(body["success"].as_bool().unwrap());
    assert_eq!(body["cart_items_count"], 0);

    let response = app
        .request_with_session(Method::GET, "/api/v1/cart", None, "guest-clear")
        .await;
    let body = response_json(response).await;
    assert!(body["data"]["items"].as_array().unwrap().is_empty());
}

// ==================== Identity Tests ====================

#[tokio::test]
async fn cart_requires_a_bearer_token_or_session_key() {
    let app = TestApp::new().await;

    let response = app.request(Method::GET, "/api/v1/cart", None, None).await;
    assert_eq!(response.status(), 401);

    let body = response_json(response).await;
    assert_eq!(body["error"], "Unauthorized");
    assert_eq!(body["message"], "Authentication required");
}

#[tokio::test]
async fn login_folds_the_guest_cart_into_the_account() {
    let app = TestApp::new().await;
    let product = app.seed_product("Cough Syrup 100ml", dec!(110), 25).await;

    let response = app
        .request_with_session(
            Method::POST,
            "/api/v1/cart/items",
            Some(json!({ "product_id": product.id, "quantity": 2 })),
            "guest-merge",
        )
        .await;
    assert!(response_json(response).await["success"].as_bool().unwrap());

    let register = app
        .request(
            Method::POST,
            "/api/v1/auth/register",
            Some(json!({
                "email": "merge.shopper@example.com",
                "password": "secret-pass-2",
                "full_name": "Merge Shopper",
                "phone": "9876500022",
                "kind": "patient"
            })),
            None,
        )
        .await;
    assert_eq!(register.status(), 201);

    // Logging in with the session key attached folds the guest cart in.
    let login = app
        .request_with_session(
            Method::POST,
            "/api/v1/auth/login",
            Some(json!({
                "email": "merge.shopper@example.com",
                "password": "secret-pass-2"
            })),
            "guest-merge",
        )
        .await;
    assert_eq!(login.status(), 200);
    let token = response_json(login).await["access_token"]
        .as_str()
        .unwrap()
        .to_string();

    let response = app
        .request(Method::GET, "/api/v1/cart", None, Some(&token))
        .await;
    let body = response_json(response).await;
    let items = body["data"]["items"].as_array().unwrap();
    assert_eq!(items.len(), 1, "guest line should now belong to the account");
    assert_eq!(items[0]["product_id"], product.id.to_string());
    assert_eq!(items[0]["quantity"], 2);
}

#[tokio::test]
async fn merging_sums_quantities_and_drops_the_session_cart() {
    let app = TestApp::new().await;
    let product = app.seed_product("Losartan 50mg", dec!(85), 20).await;

    let register = app
        .request(
            Method::POST,
            "/api/v1/auth/register",
            Some(json!({
                "email": "sum.shopper@example.com",
                "password": "secret-pass-3",
                "full_name": "Sum Shopper",
                "phone": "9876500033",
                "kind": "patient"
            })),
            None,
        )
        .await;
    assert_eq!(register.status(), 201);

    // The account cart already holds one unit.
    let login = app
        .request(
            Method::POST,
            "/api/v1/auth/login",
            Some(json!({
                "email": "sum.shopper@example.com",
                "password": "secret-pass-3"
            })),
            None,
        )
        .await;
    let token = response_json(login).await["access_token"]
        .as_str()
        .unwrap()
        .to_string();
    let response = app
        .request(
            Method::POST,
            "/api/v1/cart/items",
            Some(json!({ "product_id": product.id, "quantity": 1 })),
            Some(&token),
        )
        .await;
    assert!(response_json(response).await["success"].as_bool().unwrap());

    // A guest session holds two more of the same product.
    let response = app
        .request_with_session(
            Method::POST,
            "/api/v1/cart/items",
            Some(json!({ "product_id": product.id, "quantity": 2 })),
            "guest-sum",
        )
        .await;
    assert!(response_json(response).await["success"].as_bool().unwrap());

    let login = app
        .request_with_session(
            Method::POST,
            "/api/v1/auth/login",
            Some(json!({
                "email": "sum.shopper@example.com",
                "password": "secret-pass-3"
            })),
            "guest-sum",
        )
        .await;
    assert_eq!(login.status(), 200);
    let token = response_json(login).await["access_token"]
        .as_str()
        .unwrap()
        .to_string();

    let response = app
        .request(Method::GET, "/api/v1/cart", None, Some(&token))
        .await;
    let body = response_json(response).await;
    let items = body["data"]["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["quantity"], 3, "quantities sum on merge");
    assert_eq!(money(&body["data"]["subtotal"]), 255.0);

    // The session cart is gone.
    let response = app
        .request_with_session(Method::GET, "/api/v1/cart", None, "guest-sum")
        .await;
    let body = response_json(response).await;
    assert!(body["data"]["items"].as_array().unwrap().is_empty());
}
