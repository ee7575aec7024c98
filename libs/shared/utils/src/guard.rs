use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::Utc;
use tracing::{debug, warn};

use shared_config::AppConfig;
use shared_models::auth::{Principal, Role};

use crate::session::{validate_token, SESSION_COOKIE};

pub const LOGIN_PATH: &str = "/auth/login";

/// Why the guard turned a request away. Both cases redirect to the login page
/// so role-restricted routes are indistinguishable from missing ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDenied {
    Unauthenticated,
    Forbidden { required: Role, actual: Role },
}

impl IntoResponse for AccessDenied {
    fn into_response(self) -> Response {
        Redirect::to(LOGIN_PATH).into_response()
    }
}

/// Admits `principal` only if it carries `required`.
pub fn authorize(principal: Option<Principal>, required: Role) -> Result<Principal, AccessDenied> {
    let principal = principal.ok_or(AccessDenied::Unauthenticated)?;

    if principal.role != required {
        return Err(AccessDenied::Forbidden {
            required,
            actual: principal.role,
        });
    }

    Ok(principal)
}

/// Reads and verifies the session cookie. Any defect counts as no session.
pub fn principal_from_headers(headers: &HeaderMap, secret: &str) -> Option<Principal> {
    let jar = CookieJar::from_headers(headers);
    let token = jar.get(SESSION_COOKIE)?.value().to_string();

    match validate_token(&token, secret, Utc::now()) {
        Ok(claims) => Some(claims.into_principal()),
        Err(e) => {
            debug!("Ignoring session cookie: {}", e);
            None
        }
    }
}

#[derive(Clone)]
pub struct RoleGuard {
    pub config: Arc<AppConfig>,
    pub role: Role,
}

impl RoleGuard {
    pub fn new(config: Arc<AppConfig>, role: Role) -> Self {
        Self { config, role }
    }
}

/// Middleware form of [`authorize`]; on admission the principal is inserted
/// into the request extensions for `Extension<Principal>` extractors.
pub async fn require_role(
    State(guard): State<RoleGuard>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let principal = principal_from_headers(request.headers(), &guard.config.session_secret);

    match authorize(principal, guard.role) {
        Ok(principal) => {
            request.extensions_mut().insert(principal);
            next.run(request).await
        }
        Err(denied) => {
            if let AccessDenied::Forbidden { required, actual } = &denied {
                warn!("{} session attempted {} route {}", actual, required, request.uri().path());
            }
            denied.into_response()
        }
    }
}

pub fn session_cookie(token: String, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .build()
}

pub fn expired_session_cookie() -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE).path("/").build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn principal(role: Role) -> Principal {
        Principal {
            user_id: Uuid::new_v4(),
            username: "jdoe".to_string(),
            role,
            profile_id: Uuid::new_v4(),
        }
    }

    #[test]
    fn test_missing_principal_is_unauthenticated() {
        assert_eq!(authorize(None, Role::Patient), Err(AccessDenied::Unauthenticated));
    }

    #[test]
    fn test_role_mismatch_is_forbidden() {
        let result = authorize(Some(principal(Role::Patient)), Role::Staff);
        assert_eq!(
            result,
            Err(AccessDenied::Forbidden { required: Role::Staff, actual: Role::Patient })
        );
    }

    #[test]
    fn test_matching_role_is_admitted() {
        let staff = principal(Role::Staff);
        assert_eq!(authorize(Some(staff.clone()), Role::Staff), Ok(staff));
    }

    #[test]
    fn test_denials_redirect_to_login() {
        for denied in [
            AccessDenied::Unauthenticated,
            AccessDenied::Forbidden { required: Role::Staff, actual: Role::Patient },
        ] {
            let response = denied.into_response();
            assert!(response.status().is_redirection());
            assert_eq!(response.headers()["location"], LOGIN_PATH);
        }
    }

    #[test]
    fn test_garbage_cookie_is_no_principal() {
        let mut headers = HeaderMap::new();
        headers.insert("cookie", format!("{}=not-a-token", SESSION_COOKIE).parse().unwrap());
        assert!(principal_from_headers(&headers, "secret").is_none());
    }
}
