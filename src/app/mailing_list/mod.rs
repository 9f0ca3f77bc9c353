use axum::{
    routing::{get, post},
    Router,
};

use super::AppState;

pub mod route;
pub mod schema;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/mailing_lists",
            get(route::list_mailing_lists).post(route::create_mailing_list),
        )
        .route(
            "/mailing_lists/:id/subscriptions",
            get(route::list_subscriptions).post(route::subscribe),
        )
        .route("/mailing_lists/:id/unsubscribe", post(route::unsubscribe))
}
