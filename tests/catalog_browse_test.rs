//! Catalog tests: browsing, search, reviews and the admin product surface.
//!
//! Tests cover:
//! - Listing prices resolved per caller kind with pagination and filters
//! - Product detail, quick-view and typeahead suggestion shapes
//! - One-review-per-shopper semantics feeding the rating summary
//! - Admin product creation guards, image primary handling and the
//!   stock ledger endpoint

mod common;

use axum::{body, http::Method, response::Response};
use common::TestApp;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use uuid::Uuid;

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

async fn admin_token(app: &TestApp) -> String {
    let admin = app.seed_admin().await;
    app.token_for(&admin)
}

async fn patient_token(app: &TestApp, email: &str) -> String {
    let response = app
        .request(
            Method::POST,
            "/api/v1/auth/register",
            Some(json!({
                "email": email,
                "password": "browse-pass-1",
                "full_name": "Catalog Shopper",
                "phone": "9876500031",
                "kind": "patient"
            })),
            None,
        )
        .await;
    assert_eq!(response.status(), 201);
    login(app, email).await
}

async fn pharmacy_token(app: &TestApp, email: &str, license: &str) -> String {
    let response = app
        .request(
            Method::POST,
            "/api/v1/auth/register",
            Some(json!({
                "email": email,
                "password": "browse-pass-1",
                "full_name": "Pharmacy Buyer",
                "phone": "9876500032",
                "kind": "pharmacy",
                "business_name": "City Chemists",
                "license_number": license
            })),
            None,
        )
        .await;
    assert_eq!(response.status(), 201);
    login(app, email).await
}

async fn login(app: &TestApp, email: &str) -> String {
    let response = app
        .request(
            Method::POST,
            "/api/v1/auth/login",
            Some(json!({ "email": email, "password": "browse-pass-1" })),
            None,
        )
        .await;
    assert_eq!(response.status(), 200);
    response_json(response).await["access_token"]
        .as_str()
        .unwrap()
        .to_string()
}

// ==================== Listing Tests ====================

#[tokio::test]
async fn listing_prices_follow_the_caller_kind() {
    let app = TestApp::new().await;
    app.seed_product("Dolo 650", dec!(100), 10).await;

    // Guests pay the patient price.
    let response = app.request(Method::GET, "/api/v1/products", None, None).await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    let card = &body["data"]["data"][0];
    assert_eq!(card["name"], "Dolo 650");
    assert_eq!(money(&card["price"]), 100.0);
    assert_eq!(money(&card["mrp_price"]), 120.0);
    assert_eq!(card["discount_percentage"].as_f64().unwrap(), 16.7);
    assert_eq!(card["in_stock"], true);
    assert_eq!(card["rating_count"], 0);
    assert!(card.get("image").is_none());

    let patient = patient_token(&app, "price.patient@example.com").await;
    let response = app
        .request(Method::GET, "/api/v1/products", None, Some(&patient))
        .await;
    let body = response_json(response).await;
    assert_eq!(money(&body["data"]["data"][0]["price"]), 100.0);

    let pharmacy =
        pharmacy_token(&app, "price.pharmacy@example.com", "KA-B01-778899").await;
    let response = app
        .request(Method::GET, "/api/v1/products", None, Some(&pharmacy))
        .await;
    let body = response_json(response).await;
    let card = &body["data"]["data"][0];
    assert_eq!(money(&card["price"]), 95.0);
    assert_eq!(card["discount_percentage"].as_f64().unwrap(), 20.8);
}

#[tokio::test]
async fn listing_paginates_and_filters_by_category() {
    let app = TestApp::new().await;
    let token = admin_token(&app).await;
    let ayurveda = app.seed_category("Ayurveda").await;

    for (name, slug) in [
        ("Ashwagandha Tablets", "ashwagandha-tablets"),
        ("Chyawanprash 500g", "chyawanprash-500g"),
    ] {
        let response = app
            .request(
                Method::POST,
                "/api/v1/admin/products",
                Some(json!({
                    "name": name,
                    "slug": slug,
                    "category_id": ayurveda.id,
                    "mrp_price": 260,
                    "patient_price": 220,
                    "pharmacy_price": 200,
                    "stock_quantity": 5
                })),
                Some(&token),
            )
            .await;
        assert_eq!(response.status(), 201);
    }
    // A product outside the filtered category.
    app.seed_product("Dolo 650", dec!(100), 10).await;

    let uri = format!("/api/v1/products?category={}&per_page=1&page=1", ayurveda.slug);
    let response = app.request(Method::GET, &uri, None, None).await;
    let body = response_json(response).await;
    let first_page = body["data"]["data"].as_array().unwrap();
    assert_eq!(first_page.len(), 1);
    let meta = &body["data"]["pagination"];
    assert_eq!(meta["page"], 1);
    assert_eq!(meta["per_page"], 1);
    assert_eq!(meta["total"], 2);
    assert_eq!(meta["total_pages"], 2);
    let first_id = first_page[0]["id"].as_str().unwrap().to_string();

    let uri = format!("/api/v1/products?category={}&per_page=1&page=2", ayurveda.slug);
    let response = app.request(Method::GET, &uri, None, None).await;
    let body = response_json(response).await;
    let second_page = body["data"]["data"].as_array().unwrap();
    assert_eq!(second_page.len(), 1);
    assert_ne!(second_page[0]["id"].as_str().unwrap(), first_id);

    let response = app
        .request(
            Method::GET,
            "/api/v1/products?category=no-such-category",
            None,
            None,
        )
        .await;
    let body = response_json(response).await;
    assert!(body["data"]["data"].as_array().unwrap().is_empty());
    assert_eq!(body["data"]["pagination"]["total"], 0);

    let response = app.request(Method::GET, "/api/v1/products", None, None).await;
    assert_eq!(response_json(response).await["data"]["pagination"]["total"], 3);
}

#[tokio::test]
async fn search_and_featured_filters_narrow_the_listing() {
    let app = TestApp::new().await;
    app.seed_product("Dolo 650", dec!(100), 5).await;
    app.seed_product("Dolo 500", dec!(80), 5).await;
    app.seed_product("Crocin Advance", dec!(50), 5).await;

    let token = admin_token(&app).await;
    let supplements = app.seed_category("Supplements").await;
    let response = app
        .request(
            Method::POST,
            "/api/v1/admin/products",
            Some(json!({
                "name": "Shelcal 500",
                "category_id": supplements.id,
                "mrp_price": 110,
                "patient_price": 95,
                "pharmacy_price": 88,
                "stock_quantity": 20,
                "is_featured": true
            })),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), 201);

    let response = app
        .request(Method::GET, "/api/v1/products?q=Dolo", None, None)
        .await;
    let body = response_json(response).await;
    assert_eq!(body["data"]["pagination"]["total"], 2);
    for card in body["data"]["data"].as_array().unwrap() {
        assert!(card["name"].as_str().unwrap().contains("Dolo"));
    }

    let response = app
        .request(Method::GET, "/api/v1/products?featured=true", None, None)
        .await;
    let body = response_json(response).await;
    let cards = body["data"]["data"].as_array().unwrap();
    assert_eq!(cards.len(), 1);
    assert_eq!(cards[0]["name"], "Shelcal 500");
}

// ==================== Detail and Quick-View Tests ====================

#[tokio::test]
async fn product_detail_resolves_by_slug() {
    let app = TestApp::new().await;
    let product = app.seed_product("Azithromycin 500", dec!(150), 7).await;

    let uri = format!("/api/v1/products/{}", product.slug);
    let response = app.request(Method::GET, &uri, None, None).await;
    assert_eq!(response.status(), 200);

    let body = response_json(response).await;
    let detail = &body["data"];
    assert_eq!(detail["name"], "Azithromycin 500");
    assert_eq!(detail["category"], "General Medicines");
    assert_eq!(money(&detail["price"]), 150.0);
    assert_eq!(money(&detail["mrp_price"]), 170.0);
    assert_eq!(detail["stock_quantity"], 7);
    assert_eq!(detail["in_stock"], true);
    assert_eq!(detail["rating_count"], 0);
    assert!(detail["images"].as_array().unwrap().is_empty());
    assert!(detail["reviews"].as_array().unwrap().is_empty());

    let response = app
        .request(Method::GET, "/api/v1/products/not-a-slug", None, None)
        .await;
    assert_eq!(response.status(), 404);
    let body = response_json(response).await;
    assert_eq!(body["error"], "Not Found");
    assert_eq!(body["message"], "Product not found");
}

#[tokio::test]
async fn quick_view_prices_for_the_caller_and_answers_flat() {
    let app = TestApp::new().await;
    let product = app.seed_product("Metformin 500", dec!(62), 12).await;

    let uri = format!("/api/v1/products/{}/quick-view", product.id);
    let response = app.request(Method::GET, &uri, None, None).await;
    assert_eq!(response.status(), 200);

    // Flat payload, no envelope.
    let body = response_json(response).await;
    assert!(body.get("success").is_none());
    assert_eq!(body["name"], "Metformin 500");
    assert_eq!(money(&body["user_price"]), 62.0);
    assert_eq!(money(&body["mrp_price"]), 82.0);
    assert_eq!(body["discount_percentage"].as_f64().unwrap(), 24.4);
    assert_eq!(body["stock_quantity"], 12);
    assert_eq!(body["prescription_required"], false);
    assert!(body["image"].is_null());

    let pharmacy =
        pharmacy_token(&app, "quickview.pharmacy@example.com", "KA-B01-123321").await;
    let response = app.request(Method::GET, &uri, None, Some(&pharmacy)).await;
    let body = response_json(response).await;
    assert_eq!(money(&body["user_price"]), 57.0);
    assert_eq!(body["discount_percentage"].as_f64().unwrap(), 30.5);

    let uri = format!("/api/v1/products/{}/quick-view", Uuid::new_v4());
    let response = app.request(Method::GET, &uri, None, None).await;
    assert_eq!(response.status(), 404);
    let body = response_json(response).await;
    assert_eq!(body, json!({ "error": "Product not found" }));
}

#[tokio::test]
async fn search_suggestions_cap_results_and_ignore_short_queries() {
    let app = TestApp::new().await;
    for suffix in ["Alpha", "Beta", "Gamma", "Delta", "Epsilon", "Zeta"] {
        app.seed_product(&format!("Zincovit Tablet {suffix}"), dec!(95), 5)
            .await;
    }
    for region in ["East", "West", "North", "South"] {
        app.seed_category(&format!("Zinc Supplements {region}")).await;
    }

    let response = app
        .request(
            Method::GET,
            "/api/v1/products/search-suggestions?q=Zinc",
            None,
            None,
        )
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    let products = body["data"]["products"].as_array().unwrap();
    let categories = body["data"]["categories"].as_array().unwrap();
    assert_eq!(products.len(), 5, "product suggestions cap at five");
    assert_eq!(categories.len(), 3, "category suggestions cap at three");
    for suggestion in products {
        assert!(suggestion["name"].as_str().unwrap().starts_with("Zincovit"));
        assert!(suggestion["slug"].as_str().unwrap().starts_with("zincovit"));
    }

    let response = app
        .request(
            Method::GET,
            "/api/v1/products/search-suggestions?q=Z",
            None,
            None,
        )
        .await;
    let body = response_json(response).await;
    assert!(body["data"]["products"].as_array().unwrap().is_empty());
    assert!(body["data"]["categories"].as_array().unwrap().is_empty());
}

// ==================== Review Tests ====================

#[tokio::test]
async fn reviews_stay_one_per_shopper_and_replace_in_place() {
    let app = TestApp::new().await;
    let product = app.seed_product("Omega 3 Capsules", dec!(300), 8).await;
    let first = patient_token(&app, "reviewer.one@example.com").await;
    let second = patient_token(&app, "reviewer.two@example.com").await;
    let reviews_uri = format!("/api/v1/products/{}/reviews", product.id);

    let response = app
        .request(
            Method::POST,
            &reviews_uri,
            Some(json!({ "rating": 5, "comment": "Works great" })),
            Some(&first),
        )
        .await;
    assert_eq!(response.status(), 201);
    let body = response_json(response).await;
    assert_eq!(body["data"]["rating"], 5);
    assert_eq!(body["data"]["reviewer"], "Catalog Shopper");

    // Resubmitting replaces the earlier review instead of adding one.
    let response = app
        .request(
            Method::POST,
            &reviews_uri,
            Some(json!({ "rating": 2, "comment": "Changed my mind" })),
            Some(&first),
        )
        .await;
    assert_eq!(response.status(), 201);

    let response = app.request(Method::GET, &reviews_uri, None, None).await;
    let body = response_json(response).await;
    let reviews = body["data"].as_array().unwrap();
    assert_eq!(reviews.len(), 1);
    assert_eq!(reviews[0]["rating"], 2);
    assert_eq!(reviews[0]["comment"], "Changed my mind");

    let response = app
        .request(
            Method::POST,
            &reviews_uri,
            Some(json!({ "rating": 4 })),
            Some(&second),
        )
        .await;
    assert_eq!(response.status(), 201);

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/products/{}", product.slug),
            None,
            None,
        )
        .await;
    let body = response_json(response).await;
    assert_eq!(body["data"]["rating_count"], 2);
    assert_eq!(body["data"]["rating_average"].as_f64().unwrap(), 3.0);
    assert_eq!(body["data"]["reviews"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn review_submission_needs_a_valid_rating_and_a_token() {
    let app = TestApp::new().await;
    let product = app.seed_product("Calcium Sandoz", dec!(120), 6).await;
    let token = patient_token(&app, "rating.bounds@example.com").await;
    let reviews_uri = format!("/api/v1/products/{}/reviews", product.id);

    let response = app
        .request(Method::POST, &reviews_uri, Some(json!({ "rating": 3 })), None)
        .await;
    assert_eq!(response.status(), 401);

    for out_of_range in [0, 6] {
        let response = app
            .request(
                Method::POST,
                &reviews_uri,
                Some(json!({ "rating": out_of_range })),
                Some(&token),
            )
            .await;
        assert_eq!(response.status(), 400, "rating {out_of_range} must fail");
    }

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/products/{}/reviews", Uuid::new_v4()),
            Some(json!({ "rating": 3 })),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), 404);
    assert_eq!(response_json(response).await["message"], "Product not found");
}

// ==================== Admin Product Tests ====================

#[tokio::test]
async fn admin_product_creation_guards_slug_and_category() {
    let app = TestApp::new().await;
    let token = admin_token(&app).await;
    let antibiotics = app.seed_category("Antibiotics").await;

    let payload = json!({
        "name": "Amoxiclav 625",
        "slug": "amoxiclav-625",
        "category_id": antibiotics.id,
        "mrp_price": 204,
        "patient_price": 182,
        "pharmacy_price": 170,
        "stock_quantity": 6,
        "prescription_required": true
    });
    let response = app
        .request(
            Method::POST,
            "/api/v1/admin/products",
            Some(payload.clone()),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), 201);
    let body = response_json(response).await;
    assert_eq!(body["data"]["slug"], "amoxiclav-625");
    assert_eq!(body["data"]["stock_quantity"], 6);
    assert_eq!(body["data"]["is_active"], true);

    // The opening stock is backed by a ledger row from the start.
    let product_id: Uuid = body["data"]["id"].as_str().unwrap().parse().unwrap();
    let ledger = app
        .state
        .services
        .inventory
        .ledger_total(product_id)
        .await
        .unwrap();
    assert_eq!(ledger, 6);

    let response = app
        .request(
            Method::POST,
            "/api/v1/admin/products",
            Some(payload),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), 409);
    assert_eq!(
        response_json(response).await["message"],
        "Product slug already exists"
    );

    let response = app
        .request(
            Method::POST,
            "/api/v1/admin/products",
            Some(json!({
                "name": "Orphan Product",
                "category_id": Uuid::new_v4(),
                "mrp_price": 50,
                "patient_price": 40,
                "pharmacy_price": 35
            })),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), 404);
    assert_eq!(response_json(response).await["message"], "Category not found");

    let response = app
        .request(
            Method::POST,
            "/api/v1/admin/products",
            Some(json!({
                "name": "Negative Stock",
                "category_id": antibiotics.id,
                "mrp_price": 50,
                "patient_price": 40,
                "pharmacy_price": 35,
                "stock_quantity": -1
            })),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn admin_routes_reject_non_admin_callers() {
    let app = TestApp::new().await;
    let patient = patient_token(&app, "not.an.admin@example.com").await;

    let response = app
        .request(Method::GET, "/api/v1/admin/orders", None, Some(&patient))
        .await;
    assert_eq!(response.status(), 403);
    assert_eq!(
        response_json(response).await["message"],
        "Admin access required"
    );

    let response = app.request(Method::GET, "/api/v1/admin/orders", None, None).await;
    assert_eq!(response.status(), 401);
    assert_eq!(
        response_json(response).await["message"],
        "Authentication required"
    );
}

#[tokio::test]
async fn deactivated_products_leave_the_storefront() {
    let app = TestApp::new().await;
    let product = app.seed_product("Old Stock Syrup", dec!(70), 3).await;
    let token = admin_token(&app).await;

    let response = app
        .request(
            Method::PUT,
            &format!("/api/v1/admin/products/{}", product.id),
            Some(json!({ "is_active": false })),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), 200);
    assert_eq!(response_json(response).await["data"]["is_active"], false);

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/products/{}", product.slug),
            None,
            None,
        )
        .await;
    assert_eq!(response.status(), 404);

    let response = app.request(Method::GET, "/api/v1/products", None, None).await;
    assert_eq!(response_json(response).await["data"]["pagination"]["total"], 0);

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/products/{}/quick-view", product.id),
            None,
            None,
        )
        .await;
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn product_images_keep_a_single_primary() {
    let app = TestApp::new().await;
    let product = app.seed_product("Thermometer Digital", dec!(250), 4).await;
    let token = admin_token(&app).await;
    let images_uri = format!("/api/v1/admin/products/{}/images", product.id);

    // base64("front view")
    let response = app
        .request(
            Method::POST,
            &images_uri,
            Some(json!({
                "data": "ZnJvbnQgdmlldw==",
                "content_type": "image/png",
                "alt_text": "Front"
            })),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), 201);
    let body = response_json(response).await;
    assert_eq!(body["data"]["is_primary"], true, "first image is primary");
    assert_eq!(body["data"]["sort_order"], 0);

    // base64("side view"), explicitly promoted.
    let response = app
        .request(
            Method::POST,
            &images_uri,
            Some(json!({
                "data": "c2lkZSB2aWV3",
                "content_type": "image/png",
                "is_primary": true
            })),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), 201);
    assert_eq!(response_json(response).await["data"]["is_primary"], true);

    // The quick-view image is the current primary, so the first image
    // must have been demoted.
    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/products/{}/quick-view", product.id),
            None,
            None,
        )
        .await;
    let body = response_json(response).await;
    assert_eq!(body["image"]["data"], "c2lkZSB2aWV3");
    assert_eq!(body["image"]["content_type"], "image/png");

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/products/{}", product.slug),
            None,
            None,
        )
        .await;
    let body = response_json(response).await;
    assert_eq!(body["data"]["images"].as_array().unwrap().len(), 2);

    let response = app
        .request(
            Method::POST,
            &images_uri,
            Some(json!({
                "data": "!!!not-base64!!!",
                "content_type": "image/png"
            })),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), 400);
    assert_eq!(response_json(response).await["message"], "Invalid image data");
}

// ==================== Stock Ledger Tests ====================

#[tokio::test]
async fn stock_movements_roll_the_ledger_forward() {
    let app = TestApp::new().await;
    let product = app.seed_product("Glucometer Strips", dec!(550), 10).await;
    let token = admin_token(&app).await;
    let stock_uri = format!("/api/v1/admin/products/{}/stock", product.id);

    let response = app
        .request(
            Method::POST,
            &stock_uri,
            Some(json!({ "kind": "in", "quantity": 5, "reference": "GRN-7" })),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["data"]["entry"]["quantity"], 5);
    assert_eq!(body["data"]["entry"]["reference"], "GRN-7");
    assert_eq!(body["data"]["new_total"], 15);
    assert_eq!(body["data"]["low_stock"], false);

    let response = app
        .request(
            Method::POST,
            &stock_uri,
            Some(json!({ "kind": "adjustment", "quantity": -3 })),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["data"]["entry"]["quantity"], -3);
    assert_eq!(body["data"]["new_total"], 12);

    // An OUT larger than the cached stock is refused.
    let response = app
        .request(
            Method::POST,
            &stock_uri,
            Some(json!({ "kind": "out", "quantity": 20 })),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), 422);
    assert!(response_json(response).await["message"]
        .as_str()
        .unwrap()
        .starts_with("Insufficient stock"));

    let response = app
        .request(
            Method::POST,
            &stock_uri,
            Some(json!({ "kind": "out", "quantity": 9 })),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["data"]["entry"]["quantity"], -9);
    assert_eq!(body["data"]["new_total"], 3);
    assert_eq!(body["data"]["low_stock"], true, "3 is at or below the threshold of 5");

    let response = app
        .request(
            Method::POST,
            &stock_uri,
            Some(json!({ "kind": "in", "quantity": 0 })),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), 400);
    assert_eq!(
        response_json(response).await["message"],
        "Stock movement quantity must be positive"
    );

    // Ledger and cache agree after the whole sequence.
    let ledger = app
        .state
        .services
        .inventory
        .ledger_total(product.id)
        .await
        .unwrap();
    assert_eq!(ledger, 3);

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/products/{}/quick-view", product.id),
            None,
            None,
        )
        .await;
    let body = response_json(response).await;
    assert_eq!(body["stock_quantity"], 3);
    assert_eq!(body["in_stock"], true);

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/admin/products/{}/stock", Uuid::new_v4()),
            Some(json!({ "kind": "in", "quantity": 1 })),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), 404);
}
