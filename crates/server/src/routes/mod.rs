use axum::Router;

use crate::AppState;

pub mod admin;
pub mod auth;
pub mod billing;
pub mod feed;
pub mod health;
pub mod notifications;
pub mod offers;
pub mod providers;
pub mod requests;

pub fn router() -> Router<AppState> {
    Router::new().nest(
        "/api",
        Router::new()
            .merge(health::router())
            .merge(auth::router())
            .merge(providers::router())
            .merge(requests::router())
            .merge(offers::router())
            .merge(billing::router())
            .merge(feed::router())
            .merge(notifications::router())
            .merge(admin::router()),
    )
}
