pub mod guard;
pub mod session;
pub mod test_utils;

pub use guard::{authorize, require_role, AccessDenied, RoleGuard};
pub use session::{issue_token, new_claims, validate_token, SessionError, SESSION_COOKIE};
