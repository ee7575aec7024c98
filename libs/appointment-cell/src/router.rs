use axum::{
    Router,
    routing::{get, post},
    middleware,
};

use shared_models::auth::Role;
use shared_utils::guard::{require_role, RoleGuard};

use crate::handlers::{self, AppointmentState};

pub fn patient_routes(state: AppointmentState) -> Router {
    let guard = RoleGuard::new(state.config.clone(), Role::Patient);

    Router::new()
        .route("/dashboard", get(handlers::patient_dashboard))
        .route("/book", get(handlers::booking_form).post(handlers::book_appointment))
        .route("/appointments/{appointment_id}/cancel", post(handlers::cancel_as_patient))
        .route("/search", get(handlers::patient_search_form).post(handlers::patient_search))
        .layer(middleware::from_fn_with_state(guard, require_role))
        .with_state(state)
}

/// Listing routes here run the completion sweep before reading.
pub fn staff_routes(state: AppointmentState) -> Router {
    let guard = RoleGuard::new(state.config.clone(), Role::Staff);

    Router::new()
        .route("/dashboard", get(handlers::staff_dashboard))
        .route("/appointments", get(handlers::staff_appointments).post(handlers::staff_search))
        .route("/appointments/{appointment_id}/cancel", post(handlers::cancel_as_staff))
        .route("/patients/{patient_id}", get(handlers::patient_detail))
        .layer(middleware::from_fn_with_state(guard, require_role))
        .with_state(state)
}
