pub mod auth;
pub mod error;

pub use auth::{Principal, Role, SessionClaims};
pub use error::AppError;
