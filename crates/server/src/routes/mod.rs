//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                 - Liveness check
//! GET  /health/ready           - Readiness check (database ping)
//!
//! # Auth
//! POST /auth/signup            - Register a new account
//! POST /auth/login             - Exchange credentials for a bearer token
//! GET  /auth/user              - Current user profile
//! PUT  /auth/user              - Patch name and/or password
//!
//! # Products
//! GET    /products             - Paginated catalog listing
//! GET    /products/categories  - Distinct category names
//! GET    /products/{id}        - Product detail
//! POST   /products             - Create product (admin)
//! PUT    /products/{id}        - Patch product (admin)
//! DELETE /products/{id}        - Delete product (admin)
//!
//! # Cart
//! GET    /cart                 - View own cart
//! POST   /cart/add             - Add quantity of a product
//! PUT    /cart/update          - Set a line's quantity (0 removes)
//! DELETE /cart/{product_id}    - Remove one line
//! DELETE /cart                 - Empty the cart
//!
//! # Orders
//! POST /orders                 - Checkout the cart into an order
//! GET  /orders                 - Own order history
//! GET  /orders/all             - Every order (admin)
//! PUT  /orders/{id}/status     - Transition an order (admin)
//!
//! # Live updates
//! GET  /ws                     - WebSocket upgrade (?token=...)
//! ```

pub mod auth;
pub mod cart;
pub mod orders;
pub mod products;
pub mod ws;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::{delete, get, post, put},
};

use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/signup", post(auth::signup))
        .route("/login", post(auth::login))
        .route("/user", get(auth::profile).put(auth::update_profile))
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index).post(products::create))
        .route("/categories", get(products::categories))
        .route(
            "/{id}",
            get(products::show)
                .put(products::update)
                .delete(products::remove),
        )
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show).delete(cart::clear))
        .route("/add", post(cart::add))
        .route("/update", put(cart::update))
        .route("/{product_id}", delete(cart::remove))
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(orders::checkout).get(orders::index))
        .route("/all", get(orders::index_all))
        .route("/{id}/status", put(orders::set_status))
}

/// Create all application routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(health_ready))
        .nest("/auth", auth_routes())
        .nest("/products", product_routes())
        .nest("/cart", cart_routes())
        .nest("/orders", order_routes())
        .route("/ws", get(ws::upgrade))
}

/// Liveness check.
async fn health() -> &'static str {
    "OK"
}

/// Readiness check: verifies the database answers.
async fn health_ready(State(state): State<AppState>) -> StatusCode {
    match sqlx::query("SELECT 1").execute(state.pool()).await {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
