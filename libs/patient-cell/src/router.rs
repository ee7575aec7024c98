use axum::{
    Router,
    routing::{get, post},
    middleware,
};

use shared_models::auth::Role;
use shared_utils::guard::{require_role, RoleGuard};

use crate::handlers::{self, PatientState};

/// Patient lookup and notes routes, mounted under the staff area.
pub fn staff_patient_routes(state: PatientState) -> Router {
    let guard = RoleGuard::new(state.config.clone(), Role::Staff);

    Router::new()
        .route("/patient-search", get(handlers::patient_search_form).post(handlers::search_patients))
        .route("/patients/{patient_id}/notes", post(handlers::update_patient_notes))
        .layer(middleware::from_fn_with_state(guard, require_role))
        .with_state(state)
}
