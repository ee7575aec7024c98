use std::sync::Arc;

use axum::{
    extract::State,
    response::{IntoResponse, Redirect},
    Form, Json,
};
use axum_extra::extract::cookie::CookieJar;
use chrono::Utc;
use serde_json::{json, Value};
use tracing::{debug, error};

use patient_cell::services::PatientRepository;
use shared_config::AppConfig;
use shared_models::error::AppError;
use shared_utils::guard::{expired_session_cookie, session_cookie, LOGIN_PATH};
use shared_utils::session::{issue_token, new_claims};
use staff_cell::services::StaffRepository;

use crate::models::{AuthError, LoginForm, RegisterForm};
use crate::services::{AuthService, UserRepository};

#[derive(Clone)]
pub struct AuthState {
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn UserRepository>,
    pub patients: Arc<dyn PatientRepository>,
    pub staff: Arc<dyn StaffRepository>,
}

impl AuthState {
    fn service(&self) -> AuthService {
        AuthService::new(self.users.clone(), self.patients.clone(), self.staff.clone())
    }
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::Validation(msg) => AppError::ValidationError(msg),
            AuthError::UsernameTaken => AppError::Conflict(e.to_string()),
            AuthError::InvalidCredentials => AppError::InvalidCredentials,
            AuthError::ProfileMissing(_) => AppError::ProfileMissing(e.to_string()),
            AuthError::PasswordHash(msg) => AppError::Internal(msg),
            AuthError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}

pub async fn register_form() -> Json<Value> {
    Json(json!({ "error": null }))
}

pub async fn register(
    State(state): State<AuthState>,
    Form(form): Form<RegisterForm>,
) -> Result<Redirect, AppError> {
    debug!("Registration attempt for username {}", form.username);

    state.service()
        .register(&form)
        .await
        .map_err(|e| match e {
            AuthError::Validation(message) => AppError::InvalidForm {
                message,
                input: form.echo(),
            },
            other => other.into(),
        })?;

    Ok(Redirect::to(LOGIN_PATH))
}

pub async fn login_form() -> Json<Value> {
    Json(json!({ "error": null }))
}

pub async fn login(
    State(state): State<AuthState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Result<impl IntoResponse, AppError> {
    let principal = state.service().login(&form).await?;

    let claims = new_claims(&principal, state.config.session_ttl_hours, Utc::now());
    let token = issue_token(&claims, &state.config.session_secret).map_err(|e| {
        error!("Could not issue session for user {}: {}", principal.user_id, e);
        AppError::Internal(e.to_string())
    })?;

    let jar = jar.add(session_cookie(token, state.config.secure_cookies));
    Ok((jar, Redirect::to(principal.role.dashboard_path())))
}

pub async fn logout(jar: CookieJar) -> impl IntoResponse {
    (jar.remove(expired_session_cookie()), Redirect::to("/"))
}
