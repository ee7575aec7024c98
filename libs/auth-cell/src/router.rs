use axum::{
    Router,
    routing::get,
};

use crate::handlers::{self, AuthState};

pub fn auth_routes(state: AuthState) -> Router {
    Router::new()
        .route("/register", get(handlers::register_form).post(handlers::register))
        .route("/login", get(handlers::login_form).post(handlers::login))
        .route("/logout", get(handlers::logout))
        .with_state(state)
}
