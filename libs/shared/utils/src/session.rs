use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;
use tracing::debug;

use shared_models::auth::{Principal, SessionClaims, SessionHeader};

type HmacSha256 = Hmac<Sha256>;

pub const SESSION_COOKIE: &str = "clinic_session";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("Session secret is not set")]
    MissingSecret,
    #[error("Invalid session format")]
    Malformed,
    #[error("Invalid session signature")]
    BadSignature,
    #[error("Session expired")]
    Expired,
    #[error("Failed to encode session: {0}")]
    Encoding(String),
}

pub fn new_claims(principal: &Principal, ttl_hours: i64, now: DateTime<Utc>) -> SessionClaims {
    SessionClaims {
        sub: principal.user_id,
        username: principal.username.clone(),
        role: principal.role,
        profile_id: principal.profile_id,
        iat: now.timestamp(),
        exp: (now + Duration::hours(ttl_hours)).timestamp(),
    }
}

fn mac_for(secret: &str) -> Result<HmacSha256, SessionError> {
    if secret.is_empty() {
        return Err(SessionError::MissingSecret);
    }
    HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| SessionError::Encoding(e.to_string()))
}

pub fn issue_token(claims: &SessionClaims, secret: &str) -> Result<String, SessionError> {
    let header = SessionHeader {
        alg: "HS256".to_string(),
        typ: "SESSION".to_string(),
    };

    let header_json = serde_json::to_vec(&header).map_err(|e| SessionError::Encoding(e.to_string()))?;
    let claims_json = serde_json::to_vec(claims).map_err(|e| SessionError::Encoding(e.to_string()))?;

    let signing_input = format!(
        "{}.{}",
        URL_SAFE_NO_PAD.encode(header_json),
        URL_SAFE_NO_PAD.encode(claims_json)
    );

    let mut mac = mac_for(secret)?;
    mac.update(signing_input.as_bytes());
    let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

    Ok(format!("{}.{}", signing_input, signature))
}

pub fn validate_token(token: &str, secret: &str, now: DateTime<Utc>) -> Result<SessionClaims, SessionError> {
    let mut mac = mac_for(secret)?;

    let parts: Vec<&str> = token.split('.').collect();
    let [header_b64, claims_b64, signature_b64] = parts.as_slice() else {
        return Err(SessionError::Malformed);
    };

    let signature = URL_SAFE_NO_PAD
        .decode(signature_b64)
        .map_err(|_| SessionError::Malformed)?;

    mac.update(format!("{}.{}", header_b64, claims_b64).as_bytes());
    if mac.verify_slice(&signature).is_err() {
        debug!("Session signature verification failed");
        return Err(SessionError::BadSignature);
    }

    let claims_json = URL_SAFE_NO_PAD
        .decode(claims_b64)
        .map_err(|_| SessionError::Malformed)?;

    let claims: SessionClaims = serde_json::from_slice(&claims_json).map_err(|e| {
        debug!("Failed to parse session claims: {}", e);
        SessionError::Malformed
    })?;

    if claims.exp <= now.timestamp() {
        debug!("Session expired at {} (now: {})", claims.exp, now.timestamp());
        return Err(SessionError::Expired);
    }

    Ok(claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_models::auth::Role;
    use uuid::Uuid;

    fn principal() -> Principal {
        Principal {
            user_id: Uuid::new_v4(),
            username: "mlopez".to_string(),
            role: Role::Staff,
            profile_id: Uuid::new_v4(),
        }
    }

    #[test]
    fn test_issued_token_validates() {
        let now = Utc::now();
        let principal = principal();
        let token = issue_token(&new_claims(&principal, 8, now), "secret").unwrap();

        let claims = validate_token(&token, "secret", now).unwrap();
        assert_eq!(claims.into_principal(), principal);
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let now = Utc::now();
        let token = issue_token(&new_claims(&principal(), 8, now), "secret").unwrap();

        assert_eq!(validate_token(&token, "other", now).unwrap_err(), SessionError::BadSignature);
    }

    #[test]
    fn test_tampered_claims_are_rejected() {
        let now = Utc::now();
        let token = issue_token(&new_claims(&principal(), 8, now), "secret").unwrap();

        let mut forged = new_claims(&principal(), 8, now);
        forged.role = Role::Patient;
        let forged_b64 = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&forged).unwrap());

        let parts: Vec<&str> = token.split('.').collect();
        let tampered = format!("{}.{}.{}", parts[0], forged_b64, parts[2]);

        assert_eq!(validate_token(&tampered, "secret", now).unwrap_err(), SessionError::BadSignature);
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let issued = Utc::now() - Duration::hours(10);
        let token = issue_token(&new_claims(&principal(), 8, issued), "secret").unwrap();

        assert_eq!(validate_token(&token, "secret", Utc::now()).unwrap_err(), SessionError::Expired);
    }

    #[test]
    fn test_malformed_and_secretless() {
        assert_eq!(validate_token("abc", "secret", Utc::now()).unwrap_err(), SessionError::Malformed);
        assert_eq!(validate_token("a.b.c", "", Utc::now()).unwrap_err(), SessionError::MissingSecret);
    }
}
