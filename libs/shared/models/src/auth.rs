use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Patient,
    Staff,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Patient => "patient",
            Role::Staff => "staff",
        }
    }

    /// Landing page after a successful login.
    pub fn dashboard_path(&self) -> &'static str {
        match self {
            Role::Patient => "/patient/dashboard",
            Role::Staff => "/staff/dashboard",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "patient" => Ok(Role::Patient),
            "staff" => Ok(Role::Staff),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

/// The authenticated actor of a request. `profile_id` is the Patient id or the
/// Staff id depending on `role`, resolved once at login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: Uuid,
    pub username: String,
    pub role: Role,
    pub profile_id: Uuid,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionHeader {
    pub alg: String,
    pub typ: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: Uuid,
    pub username: String,
    pub role: Role,
    pub profile_id: Uuid,
    pub iat: i64,
    pub exp: i64,
}

impl SessionClaims {
    pub fn into_principal(self) -> Principal {
        Principal {
            user_id: self.sub,
            username: self.username,
            role: self.role,
            profile_id: self.profile_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trips_through_str() {
        assert_eq!("patient".parse::<Role>(), Ok(Role::Patient));
        assert_eq!("staff".parse::<Role>(), Ok(Role::Staff));
        assert!("admin".parse::<Role>().is_err());
        assert_eq!(Role::Staff.to_string(), "staff");
    }

    #[test]
    fn test_role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Patient).unwrap(), "\"patient\"");
    }
}
