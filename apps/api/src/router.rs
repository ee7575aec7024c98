use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};
use tracing::{error, info, warn};
use uuid::Uuid;

use appointment_cell::services::{
    AppointmentRepository, InMemoryAppointmentRepository, SupabaseAppointmentRepository,
};
use appointment_cell::{patient_routes, staff_routes, AppointmentState};
use auth_cell::models::User;
use auth_cell::services::password::hash_password;
use auth_cell::services::{InMemoryUserRepository, SupabaseUserRepository, UserRepository};
use auth_cell::{auth_routes, AuthState};
use patient_cell::services::{InMemoryPatientRepository, PatientRepository, SupabasePatientRepository};
use patient_cell::{staff_patient_routes, PatientState};
use shared_config::AppConfig;
use shared_models::auth::Role;
use staff_cell::models::Staff;
use staff_cell::services::{InMemoryStaffRepository, StaffRepository, SupabaseStaffRepository};

#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub patients: Arc<dyn PatientRepository>,
    pub staff: Arc<dyn StaffRepository>,
    pub appointments: Arc<dyn AppointmentRepository>,
}

impl Repositories {
    /// PostgREST-backed when Supabase is configured, in-memory otherwise.
    pub async fn from_config(config: &AppConfig) -> Self {
        if config.is_configured() {
            return Self {
                users: Arc::new(SupabaseUserRepository::new(config)),
                patients: Arc::new(SupabasePatientRepository::new(config)),
                staff: Arc::new(SupabaseStaffRepository::new(config)),
                appointments: Arc::new(SupabaseAppointmentRepository::new(config)),
            };
        }

        warn!("Supabase not configured, using in-memory repositories; data is lost on restart");
        Self::in_memory_seeded(config).await
    }

    /// In-memory stores holding the staff account named by
    /// `SEED_STAFF_USERNAME`/`SEED_STAFF_PASSWORD`, if both are set.
    pub async fn in_memory_seeded(config: &AppConfig) -> Self {
        let users = Arc::new(InMemoryUserRepository::new());
        let staff = Arc::new(InMemoryStaffRepository::new());

        match (&config.seed_staff_username, &config.seed_staff_password) {
            (Some(username), Some(password)) => match hash_password(password) {
                Ok(password_hash) => {
                    let user = User {
                        id: Uuid::new_v4(),
                        username: username.clone(),
                        password_hash,
                        role: Role::Staff,
                    };
                    staff
                        .insert(Staff {
                            id: Uuid::new_v4(),
                            user_id: user.id,
                            first_name: "Clinic".to_string(),
                            last_name: "Staff".to_string(),
                            role_title: None,
                        })
                        .await;
                    users.insert(user).await;
                    info!("Seeded in-memory staff account {}", username);
                }
                Err(e) => error!("Could not hash SEED_STAFF_PASSWORD: {}", e),
            },
            _ => warn!(
                "No staff account seeded: staff cannot log in and patients cannot book until \
                 SEED_STAFF_USERNAME and SEED_STAFF_PASSWORD are set"
            ),
        }

        Self {
            users,
            patients: Arc::new(InMemoryPatientRepository::new()),
            staff,
            appointments: Arc::new(InMemoryAppointmentRepository::new()),
        }
    }
}

pub fn create_router(config: Arc<AppConfig>, repos: Repositories) -> Router {
    let auth_state = AuthState {
        config: config.clone(),
        users: repos.users.clone(),
        patients: repos.patients.clone(),
        staff: repos.staff.clone(),
    };

    let appointment_state = AppointmentState {
        config: config.clone(),
        appointments: repos.appointments.clone(),
        patients: repos.patients.clone(),
        staff: repos.staff.clone(),
    };

    let patient_state = PatientState {
        config,
        patients: repos.patients.clone(),
    };

    Router::new()
        .route("/", get(|| async { "Clinic booking API is running!" }))
        .nest("/auth", auth_routes(auth_state))
        .nest("/patient", patient_routes(appointment_state.clone()))
        .nest(
            "/staff",
            staff_routes(appointment_state).merge(staff_patient_routes(patient_state)),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
    };
    use tower::ServiceExt;

    use shared_utils::test_utils::TestConfig;

    async fn app() -> Router {
        let config = TestConfig::default().to_app_config();
        let repos = Repositories::in_memory_seeded(&config).await;
        create_router(Arc::new(config), repos)
    }

    #[tokio::test]
    async fn test_liveness() {
        let response = app()
            .await
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"Clinic booking API is running!");
    }

    #[tokio::test]
    async fn test_protected_trees_redirect_anonymous_users() {
        for uri in ["/patient/dashboard", "/staff/dashboard", "/staff/patient-search"] {
            let response = app()
                .await
                .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::SEE_OTHER, "{}", uri);
            assert_eq!(response.headers()[header::LOCATION], "/auth/login");
        }
    }

    #[tokio::test]
    async fn test_register_login_and_reach_dashboard() {
        let app = app().await;

        let register = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/auth/register")
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from(
                        "first_name=Ann&last_name=Lee&email=ann%40example.com&username=annlee&password=password123",
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(register.status(), StatusCode::SEE_OTHER);

        let login = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/auth/login")
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from("username=annlee&password=password123"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(login.headers()[header::LOCATION], "/patient/dashboard");

        let cookie = login.headers()[header::SET_COOKIE]
            .to_str()
            .unwrap()
            .split(';')
            .next()
            .unwrap()
            .to_string();

        let dashboard = app
            .oneshot(
                Request::builder()
                    .uri("/patient/dashboard")
                    .header(header::COOKIE, cookie)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(dashboard.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_seeded_staff_can_log_in_without_supabase() {
        let mut config = TestConfig::default().to_app_config();
        config.seed_staff_username = Some("frontdesk".to_string());
        config.seed_staff_password = Some("frontdesk-pass".to_string());

        let repos = Repositories::in_memory_seeded(&config).await;
        assert_eq!(repos.staff.list().await.unwrap().len(), 1);

        let login = create_router(Arc::new(config), repos)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/auth/login")
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from("username=frontdesk&password=frontdesk-pass"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(login.status(), StatusCode::SEE_OTHER);
        assert_eq!(login.headers()[header::LOCATION], "/staff/dashboard");
    }

    #[tokio::test]
    async fn test_unseeded_in_memory_has_no_staff() {
        let repos = Repositories::in_memory_seeded(&TestConfig::default().to_app_config()).await;
        assert!(repos.staff.list().await.unwrap().is_empty());
    }
}
