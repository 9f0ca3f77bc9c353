use axum::{
    routing::{get, post, put},
    Router,
};

use super::AppState;

pub mod route;
pub mod schema;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/accounts", post(route::create_account))
        .route(
            "/accounts/:id/mailing_lists",
            get(route::get_mailing_lists).put(route::update_mailing_lists),
        )
        .route("/accounts/:id/email", put(route::change_email))
}
