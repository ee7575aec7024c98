use std::sync::Arc;
use chrono::Utc;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::{Principal, Role};

use crate::session::{issue_token, new_claims, SESSION_COOKIE};

pub struct TestConfig {
    pub session_secret: String,
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_service_key: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            session_secret: "test-secret-key-for-session-signing-must-be-long-enough".to_string(),
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
            supabase_service_key: "test-service-key".to_string(),
        }
    }
}

impl TestConfig {
    pub fn with_supabase_url(url: impl Into<String>) -> Self {
        Self {
            supabase_url: url.into(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_anon_key: self.supabase_anon_key.clone(),
            supabase_service_key: self.supabase_service_key.clone(),
            session_secret: self.session_secret.clone(),
            session_ttl_hours: 8,
            clinic_utc_offset_minutes: 0,
            secure_cookies: false,
            port: 8000,
            seed_staff_username: None,
            seed_staff_password: None,
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TestPrincipal;

impl TestPrincipal {
    pub fn new(username: &str, role: Role, profile_id: Uuid) -> Principal {
        Principal {
            user_id: Uuid::new_v4(),
            username: username.to_string(),
            role,
            profile_id,
        }
    }

    pub fn patient(profile_id: Uuid) -> Principal {
        Self::new("patient", Role::Patient, profile_id)
    }

    pub fn staff(profile_id: Uuid) -> Principal {
        Self::new("staff", Role::Staff, profile_id)
    }

    /// `Cookie` header value carrying a valid session for `principal`.
    pub fn cookie(principal: &Principal, secret: &str) -> String {
        let claims = new_claims(principal, 1, Utc::now());
        let token = issue_token(&claims, secret).expect("test session token");
        format!("{}={}", SESSION_COOKIE, token)
    }
}
