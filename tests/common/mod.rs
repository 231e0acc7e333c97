use std::sync::Arc;

use axum::{
    body::Body,
    http::{Method, Request},
    Router,
};
use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, Set};
use serde_json::Value;
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

use medicart_api::{
    auth::{hash_password, issue_token},
    config::AppConfig,
    db,
    entities::{category, product, user, user::UserKind},
    events::{self, EventSender},
    handlers::AppServices,
    services::catalog::CreateProductInput,
    AppState,
};

const TEST_JWT_SECRET: &str =
    "integration_test_signing_secret_with_plenty_of_entropy_0123456789ab";

/// Helper harness for spinning up the full router backed by a throwaway
/// SQLite database. Every instance gets its own database file so test
/// binaries can run in parallel.
pub struct TestApp {
    router: Router,
    pub state: Arc<AppState>,
    db_file: String,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    /// Construct a new test application with fresh database state.
    pub async fn new() -> Self {
        let db_file = format!("medicart_test_{}.db", Uuid::new_v4().simple());

        let mut cfg = AppConfig::new(
            format!("sqlite://{db_file}?mode=rwc"),
            "redis://127.0.0.1:6379".to_string(),
            TEST_JWT_SECRET.to_string(),
            3600,
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        cfg.auto_migrate = true;
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let db_arc = Arc::new(pool);
        let config = Arc::new(cfg);

        let (event_tx, event_rx) = mpsc::channel(256);
        let event_sender = Arc::new(EventSender::new(event_tx));
        let event_task = tokio::spawn(events::process_events(event_rx));

        let services = AppServices::new(db_arc.clone(), config.clone(), event_sender.clone());

        let state = Arc::new(AppState {
            db: db_arc,
            config,
            event_sender,
            services,
        });

        let router = Router::new()
            .nest("/api/v1", medicart_api::api_v1_routes())
            .with_state(state.clone());

        Self {
            router,
            state,
            db_file,
            _event_task: event_task,
        }
    }

    /// Send a request against the router with an optional bearer token.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> axum::response::Response {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {}", tok));
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Send a guest request identifying itself with a session key.
    pub async fn request_with_session(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        session_key: &str,
    ) -> axum::response::Response {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("x-session-key", session_key);

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Issue a bearer token for an existing user.
    pub fn token_for(&self, user: &user::Model) -> String {
        issue_token(
            user.id,
            &user.email,
            user.kind,
            &self.state.config.jwt_secret,
            3600,
        )
        .expect("issue test token")
    }

    /// Insert an admin account directly; registration only produces
    /// patient and pharmacy accounts.
    pub async fn seed_admin(&self) -> user::Model {
        let now = Utc::now();
        user::ActiveModel {
            id: Set(Uuid::new_v4()),
            email: Set(format!("admin-{}@medicart.test", Uuid::new_v4().simple())),
            password_hash: Set(hash_password("Adm1n!pass").expect("hash admin password")),
            full_name: Set("Store Admin".to_string()),
            phone: Set("9876543210".to_string()),
            kind: Set(UserKind::Admin),
            is_verified: Set(true),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.state.db)
        .await
        .expect("seed admin user")
    }

    pub async fn seed_category(&self, name: &str) -> category::Model {
        let now = Utc::now();
        category::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            slug: Set(format!(
                "{}-{}",
                name.to_lowercase().replace(' ', "-"),
                Uuid::new_v4().simple()
            )),
            parent_id: Set(None),
            description: Set(None),
            sort_order: Set(0),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.state.db)
        .await
        .expect("seed category")
    }

    /// Seed an over-the-counter product with stock, creating a category
    /// for it along the way.
    pub async fn seed_product(
        &self,
        name: &str,
        patient_price: Decimal,
        stock: i32,
    ) -> product::Model {
        let cat = self.seed_category("General Medicines").await;
        self.state
            .services
            .catalog
            .create_product(CreateProductInput {
                name: name.to_string(),
                slug: Some(format!(
                    "{}-{}",
                    name.to_lowercase().replace(' ', "-"),
                    Uuid::new_v4().simple()
                )),
                category_id: cat.id,
                manufacturer_id: None,
                composition: None,
                description: Some("Seeded for integration tests".to_string()),
                prescription_required: false,
                mrp_price: patient_price + dec!(20),
                patient_price,
                pharmacy_price: patient_price - dec!(5),
                stock_quantity: stock,
                low_stock_threshold: Some(5),
                track_inventory: true,
                is_featured: false,
            })
            .await
            .expect("seed product")
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self._event_task.abort();
        for suffix in ["", "-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{}{}", self.db_file, suffix));
        }
    }
}
