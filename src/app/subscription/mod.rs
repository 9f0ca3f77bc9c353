use axum::{
    routing::{get, post},
    Router,
};

use super::AppState;

pub mod route;
pub mod schema;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/subscriptions/status", get(route::subscription_status))
        .route("/subscriptions/:id/unsubscribe", post(route::unsubscribe))
}
