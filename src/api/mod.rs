pub mod handlers;
pub mod state;

use axum::{
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    trace::TraceLayer,
};

use crate::{config::Settings, service::ServiceContext};
use state::AppState;

pub fn create_app(service_context: Arc<ServiceContext>, settings: Arc<Settings>) -> Router {
    let app_state = AppState::new(service_context, settings);

    Router::new()
        // Root and health endpoints
        .route("/", get(handlers::root::root))
        .route("/health", get(handlers::root::health_check))

        // Identity-resolver seam
        .route("/students", post(handlers::students::resolve))
        .route("/students", get(handlers::students::list))
        .route("/students/:id/weekly-usage", get(handlers::students::weekly_usage))
        .route("/students/:id/outstanding", get(handlers::students::outstanding))
        .route("/students/:id/reinstatements", post(handlers::students::reinstate))
        .route("/students/:id/plan", post(handlers::students::assign_plan))
        .route("/students/:id/charges", post(handlers::students::charge))
        .route("/students/:id/charges/stored", post(handlers::students::charge_stored_card))

        // Catalog + enrollment
        .route("/classes", post(handlers::classes::create))
        .route("/classes", get(handlers::classes::list))
        .route("/classes/:id", get(handlers::classes::get))
        .route("/classes/:id/sessions", post(handlers::classes::create_session))
        .route("/classes/:id/sessions", get(handlers::classes::list_sessions))
        .route("/classes/:id/capacity", get(handlers::classes::capacity))
        .route("/classes/:id/enroll", post(handlers::classes::enroll))
        .route("/classes/:id/roster", get(handlers::classes::roster))

        .route("/enrollments/:id/status", put(handlers::enrollments::update_status))
        .route("/enrollments/:id/check-in", post(handlers::enrollments::check_in))

        // Plans and weekly-quota bookings
        .route("/plans", post(handlers::plans::create))
        .route("/plans", get(handlers::plans::list))
        .route("/plan-assignments/:id/status", put(handlers::plans::update_assignment_status))
        .route("/sessions/:id/book", post(handlers::sessions::book))
        .route("/bookings/:id/cancel", post(handlers::sessions::cancel_booking))

        // Payment pipeline
        .route("/payments/:id/intent", post(handlers::payments::create_intent))
        .route("/payments/:id/pay", post(handlers::payments::pay_now))
        .route("/intents/:id/session", post(handlers::payments::start_session))
        .route("/webhooks/payment", post(handlers::payments::webhook))
        .route("/payments/sessions/expire", post(handlers::payments::expire_sessions))

        // Add state to the router
        .with_state(app_state)

        // Middleware
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive()) // Configure properly for production
        .layer(TraceLayer::new_for_http())
}
