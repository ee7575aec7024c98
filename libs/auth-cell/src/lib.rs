pub mod models;
pub mod handlers;
pub mod router;
pub mod services;

pub use handlers::AuthState;
pub use router::auth_routes;
