use std::sync::Arc;

use axum::{routing::get, Router};

use shared_config::AppConfig;

use crate::handlers;

pub fn doctor_routes(state: Arc<AppConfig>) -> Router {
    // Schedules and slots are public so patients can browse before signing in
    let public_routes = Router::new()
        .route("/{doctor_id}/schedule", get(handlers::get_doctor_schedule))
        .route("/{doctor_id}/slots", get(handlers::get_doctor_slots));

    Router::new()
        .merge(public_routes)
        .with_state(state)
}
