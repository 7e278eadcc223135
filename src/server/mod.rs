// ==========================================
// Каталог автозапчастей - HTTP сервер
// ==========================================
// Два входа:
//   /exchange/catalog  - протокол обмена с учётной системой
//   /api/sync/products - прямой API (JSON/XML)
// ==========================================

pub mod routes;
pub mod state;

pub use state::AppState;

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

/// Сборка маршрутизатора приложения.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/exchange/catalog",
            get(routes::exchange::exchange).post(routes::exchange::exchange),
        )
        .route("/api/sync/products", post(routes::api_sync::import))
        .route(
            "/api/marketplace/sync",
            post(routes::marketplace_sync::sync),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
