//! Shared helpers for router tests.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use till_core::{Category, Product, Role, User};
use till_db::password::hash_password;
use till_db::repository::category::NewCategory;
use till_db::repository::product::NewProduct;
use till_db::repository::user::NewUser;
use till_db::{Database, DbConfig};

use crate::config::ApiConfig;
use crate::notify::RecordingNotifier;
use crate::{build_router, AppState};

pub const PASSWORD: &str = "correct-horse";

pub struct TestApp {
    pub db: Database,
    pub app: Router,
    pub notifier: Arc<RecordingNotifier>,
    pub admin: User,
    pub category: Category,
    pub product: Product,
}

impl TestApp {
    /// In-memory database with an admin, a category and "Cola 330ml"
    /// (price 1000, stock 10, reorder level 5).
    pub async fn new() -> Self {
        Self::with_config(ApiConfig {
            jwt_secret: "test-secret".to_string(),
            ..ApiConfig::default()
        })
        .await
    }

    pub async fn with_config(config: ApiConfig) -> Self {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let notifier = Arc::new(RecordingNotifier::default());
        let state = AppState::new(db.clone(), config, notifier.clone());
        let app = build_router(state);

        let admin = insert_user(&db, "EMP-0001", "admin@till.local", Role::Admin).await;
        let category = db
            .categories()
            .insert(&NewCategory {
                name: "Beverages".to_string(),
                description: None,
            })
            .await
            .unwrap();
        let product = db
            .products()
            .insert(
                &NewProduct {
                    name: "Cola 330ml".to_string(),
                    description: None,
                    sku: "COLA-330".to_string(),
                    barcode: None,
                    price_cents: 1000,
                    cost_price_cents: 500,
                    stock_quantity: 10,
                    min_stock_level: 5,
                    category_id: category.id,
                    brand: None,
                    weight_grams: None,
                },
                admin.id,
            )
            .await
            .unwrap();

        TestApp {
            db,
            app,
            notifier,
            admin,
            category,
            product,
        }
    }

    pub async fn add_user(&self, employee_id: &str, email: &str, role: Role) -> User {
        insert_user(&self.db, employee_id, email, role).await
    }

    pub async fn login(&self, email: &str) -> String {
        let (status, body) = self
            .send(
                "POST",
                "/api/login",
                None,
                Some(json!({ "email": email, "password": PASSWORD })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {body}");
        body["token"].as_str().unwrap().to_string()
    }

    pub async fn admin_token(&self) -> String {
        self.login("admin@till.local").await
    }

    pub async fn cashier_token(&self) -> String {
        self.add_user("EMP-0100", "cashier@till.local", Role::Cashier).await;
        self.login("cashier@till.local").await
    }

    pub async fn send(&self, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            request = request.header("Authorization", format!("Bearer {token}"));
        }
        let request = match body {
            Some(json) => request
                .header("Content-Type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };

        (status, body)
    }

    pub async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.send("GET", uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.send("POST", uri, Some(token), Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.send("PUT", uri, Some(token), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.send("DELETE", uri, Some(token), None).await
    }

    /// Checkout body buying `quantity` of the seeded product.
    pub fn sale(&self, quantity: i64) -> Value {
        json!({
            "items": [{
                "product_id": self.product.id,
                "quantity": quantity,
                "unit_price_cents": self.product.price_cents,
            }],
            "payment_method": "cash",
            "amount_paid_cents": 100_000,
        })
    }
}

async fn insert_user(db: &Database, employee_id: &str, email: &str, role: Role) -> User {
    db.users()
        .insert(
            &NewUser {
                employee_id: employee_id.to_string(),
                first_name: "Ana".to_string(),
                middle_name: None,
                last_name: "Reyes".to_string(),
                suffix: None,
                email: email.to_string(),
                role,
                phone: None,
                address: None,
                birth_date: None,
                hire_date: None,
                salary_cents: None,
            },
            &hash_password(PASSWORD).unwrap(),
        )
        .await
        .unwrap()
}
