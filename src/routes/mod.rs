use axum::Router;

use crate::state::AppState;

pub mod admin;
pub mod auth;
pub mod bookings;
pub mod combos;
pub mod coupons;
pub mod doc;
pub mod health;
pub mod params;
pub mod payments;
pub mod reviews;
pub mod services;

// Build the API router without binding state; it is provided at the top level.
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/services", services::router())
        .nest("/combos", combos::router())
        .nest("/bookings", bookings::router())
        .nest("/coupons", coupons::router())
        .nest("/reviews", reviews::router())
        .nest("/payments", payments::router())
        .nest("/admin", admin::router())
}
