pub mod auth;
pub mod password;
pub mod repository;

pub use auth::AuthService;
pub use repository::{InMemoryUserRepository, SupabaseUserRepository, UserRepository};
