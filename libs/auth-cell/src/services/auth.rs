use std::sync::Arc;

use regex::Regex;
use tracing::{debug, info, warn};

use patient_cell::models::{NewPatient, Patient};
use patient_cell::services::PatientRepository;
use shared_database::SupabaseError;
use shared_models::auth::{Principal, Role};
use staff_cell::services::StaffRepository;

use crate::models::{
    AuthError, LoginForm, NewUser, RegisterForm, User,
    MAX_EMAIL_LENGTH, MAX_NAME_LENGTH, MIN_PASSWORD_LENGTH,
};
use crate::services::password::{hash_password, verify_password};
use crate::services::repository::UserRepository;

const EMAIL_PATTERN: &str = r"^[^\s@]+@[^\s@]+\.[^\s@]+$";
const USERNAME_PATTERN: &str = r"^[A-Za-z0-9_.\-]{3,50}$";

fn matches_pattern(pattern: &str, value: &str) -> bool {
    Regex::new(pattern).map(|re| re.is_match(value)).unwrap_or(false)
}

/// First failing rule wins.
pub fn validate_registration(form: &RegisterForm) -> Result<(), AuthError> {
    let fail = |msg: &str| Err(AuthError::Validation(msg.to_string()));

    let first_name = form.first_name.trim();
    let last_name = form.last_name.trim();
    let email = form.email.trim();

    if first_name.is_empty() {
        return fail("Please enter your first name.");
    }
    if first_name.chars().count() > MAX_NAME_LENGTH {
        return fail("First name must be 50 characters or fewer.");
    }
    if last_name.is_empty() {
        return fail("Please enter your last name.");
    }
    if last_name.chars().count() > MAX_NAME_LENGTH {
        return fail("Last name must be 50 characters or fewer.");
    }
    if email.is_empty() {
        return fail("Please enter your email address.");
    }
    if email.chars().count() > MAX_EMAIL_LENGTH || !matches_pattern(EMAIL_PATTERN, email) {
        return fail("Please enter a valid email address.");
    }
    if !matches_pattern(USERNAME_PATTERN, form.username.trim()) {
        return fail("Username must be 3-50 characters: letters, numbers, '_', '.' or '-'.");
    }
    if form.password.chars().count() < MIN_PASSWORD_LENGTH {
        return fail("Password must be at least 8 characters.");
    }

    Ok(())
}

pub struct AuthService {
    users: Arc<dyn UserRepository>,
    patients: Arc<dyn PatientRepository>,
    staff: Arc<dyn StaffRepository>,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        patients: Arc<dyn PatientRepository>,
        staff: Arc<dyn StaffRepository>,
    ) -> Self {
        Self { users, patients, staff }
    }

    /// Creates a patient account and its profile.
    pub async fn register(&self, form: &RegisterForm) -> Result<Patient, AuthError> {
        validate_registration(form)?;

        let username = form.username.trim().to_string();

        let existing = self.users
            .find_by_username(&username)
            .await
            .map_err(|e| AuthError::DatabaseError(e.to_string()))?;
        if existing.is_some() {
            debug!("Registration rejected: username {} taken", username);
            return Err(AuthError::UsernameTaken);
        }

        let password_hash = hash_password(&form.password)
            .map_err(|e| AuthError::PasswordHash(e.to_string()))?;

        let user = self.users
            .create(NewUser {
                username,
                password_hash,
                role: Role::Patient,
            })
            .await
            .map_err(|e| {
                if SupabaseError::is_conflict(&e) {
                    debug!("Registration rejected: username taken by a concurrent signup");
                    AuthError::UsernameTaken
                } else {
                    AuthError::DatabaseError(e.to_string())
                }
            })?;

        let patient = self.patients
            .create(NewPatient {
                user_id: user.id,
                first_name: form.first_name.trim().to_string(),
                last_name: form.last_name.trim().to_string(),
                email: form.email.trim().to_string(),
                phone: None,
            })
            .await
            .map_err(|e| AuthError::DatabaseError(e.to_string()))?;

        info!("Registered patient {} for user {}", patient.id, user.id);
        Ok(patient)
    }

    /// Verifies credentials and resolves the profile the session will carry.
    pub async fn login(&self, form: &LoginForm) -> Result<Principal, AuthError> {
        let user = self.users
            .find_by_username(form.username.trim())
            .await
            .map_err(|e| AuthError::DatabaseError(e.to_string()))?
            .ok_or(AuthError::InvalidCredentials)?;

        let verified = verify_password(&form.password, &user.password_hash).unwrap_or_else(|e| {
            warn!("Unreadable password hash for user {}: {}", user.id, e);
            false
        });
        if !verified {
            return Err(AuthError::InvalidCredentials);
        }

        let profile_id = self.resolve_profile(&user).await?;

        info!("User {} logged in as {}", user.id, user.role);
        Ok(Principal {
            user_id: user.id,
            username: user.username,
            role: user.role,
            profile_id,
        })
    }

    async fn resolve_profile(&self, user: &User) -> Result<uuid::Uuid, AuthError> {
        let profile_id = match user.role {
            Role::Patient => self.patients
                .find_by_user(user.id)
                .await
                .map_err(|e| AuthError::DatabaseError(e.to_string()))?
                .map(|p| p.id),
            Role::Staff => self.staff
                .find_by_user(user.id)
                .await
                .map_err(|e| AuthError::DatabaseError(e.to_string()))?
                .map(|s| s.id),
        };

        profile_id.ok_or_else(|| {
            warn!("User {} has no {} profile", user.id, user.role);
            AuthError::ProfileMissing(user.role)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use patient_cell::services::InMemoryPatientRepository;
    use staff_cell::models::Staff;
    use staff_cell::services::InMemoryStaffRepository;
    use uuid::Uuid;

    use crate::services::repository::InMemoryUserRepository;

    fn register_form() -> RegisterForm {
        RegisterForm {
            first_name: "Jane".to_string(),
            last_name: "Doe".to_string(),
            email: "jane@example.com".to_string(),
            username: "jane.doe".to_string(),
            password: "s3cret-pass".to_string(),
        }
    }

    struct Fixture {
        service: AuthService,
        users: Arc<InMemoryUserRepository>,
        staff: Arc<InMemoryStaffRepository>,
    }

    fn fixture() -> Fixture {
        let users = Arc::new(InMemoryUserRepository::new());
        let staff = Arc::new(InMemoryStaffRepository::new());
        let service = AuthService::new(
            users.clone(),
            Arc::new(InMemoryPatientRepository::new()),
            staff.clone(),
        );
        Fixture { service, users, staff }
    }

    #[test]
    fn test_validation_first_error_wins() {
        let form = RegisterForm {
            first_name: " ".to_string(),
            email: "nope".to_string(),
            ..register_form()
        };
        assert_matches!(
            validate_registration(&form),
            Err(AuthError::Validation(msg)) if msg == "Please enter your first name."
        );
    }

    #[test]
    fn test_validation_rules() {
        let bad_email = RegisterForm { email: "jane@".to_string(), ..register_form() };
        assert_matches!(validate_registration(&bad_email), Err(AuthError::Validation(_)));

        let bad_username = RegisterForm { username: "j d".to_string(), ..register_form() };
        assert_matches!(validate_registration(&bad_username), Err(AuthError::Validation(_)));

        let short_password = RegisterForm { password: "short".to_string(), ..register_form() };
        assert_matches!(
            validate_registration(&short_password),
            Err(AuthError::Validation(msg)) if msg == "Password must be at least 8 characters."
        );

        assert!(validate_registration(&register_form()).is_ok());
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let f = fixture();

        let patient = f.service.register(&register_form()).await.unwrap();
        let principal = f.service
            .login(&LoginForm {
                username: "jane.doe".to_string(),
                password: "s3cret-pass".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(principal.role, Role::Patient);
        assert_eq!(principal.profile_id, patient.id);
    }

    #[tokio::test]
    async fn test_duplicate_username_conflicts() {
        let f = fixture();
        f.service.register(&register_form()).await.unwrap();

        assert_matches!(
            f.service.register(&register_form()).await,
            Err(AuthError::UsernameTaken)
        );
    }

    #[tokio::test]
    async fn test_wrong_password_and_unknown_user_look_the_same() {
        let f = fixture();
        f.service.register(&register_form()).await.unwrap();

        let wrong = f.service
            .login(&LoginForm { username: "jane.doe".to_string(), password: "nope-nope".to_string() })
            .await;
        let unknown = f.service
            .login(&LoginForm { username: "ghost".to_string(), password: "s3cret-pass".to_string() })
            .await;

        assert_matches!(wrong, Err(AuthError::InvalidCredentials));
        assert_matches!(unknown, Err(AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_staff_without_profile_is_profile_missing() {
        let f = fixture();
        f.users
            .insert(User {
                id: Uuid::new_v4(),
                username: "dr.who".to_string(),
                password_hash: hash_password("tardis-123").unwrap(),
                role: Role::Staff,
            })
            .await;

        let result = f.service
            .login(&LoginForm { username: "dr.who".to_string(), password: "tardis-123".to_string() })
            .await;

        assert_matches!(result, Err(AuthError::ProfileMissing(Role::Staff)));
    }

    #[tokio::test]
    async fn test_staff_login_resolves_staff_id() {
        let f = fixture();
        let user_id = Uuid::new_v4();
        let staff_id = Uuid::new_v4();
        f.users
            .insert(User {
                id: user_id,
                username: "nurse.joy".to_string(),
                password_hash: hash_password("pokemon-center").unwrap(),
                role: Role::Staff,
            })
            .await;
        f.staff
            .insert(Staff {
                id: staff_id,
                user_id,
                first_name: "Joy".to_string(),
                last_name: "Nurse".to_string(),
                role_title: Some("Nurse".to_string()),
            })
            .await;

        let principal = f.service
            .login(&LoginForm { username: "nurse.joy".to_string(), password: "pokemon-center".to_string() })
            .await
            .unwrap();

        assert_eq!(principal.role, Role::Staff);
        assert_eq!(principal.profile_id, staff_id);
    }

    /// Misses the lookup the way a concurrent signup does, so only the
    /// insert sees the existing username.
    struct RacingUsers(InMemoryUserRepository);

    #[async_trait::async_trait]
    impl UserRepository for RacingUsers {
        async fn find_by_username(&self, _username: &str) -> anyhow::Result<Option<User>> {
            Ok(None)
        }

        async fn create(&self, user: NewUser) -> anyhow::Result<User> {
            self.0.create(user).await
        }
    }

    #[tokio::test]
    async fn test_concurrent_signup_conflict_is_username_taken() {
        let users = Arc::new(RacingUsers(InMemoryUserRepository::new()));
        let service = AuthService::new(
            users,
            Arc::new(InMemoryPatientRepository::new()),
            Arc::new(InMemoryStaffRepository::new()),
        );

        service.register(&register_form()).await.unwrap();
        assert_matches!(service.register(&register_form()).await, Err(AuthError::UsernameTaken));
    }
}
