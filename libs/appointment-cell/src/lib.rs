pub mod models;
pub mod handlers;
pub mod router;
pub mod services;

pub use handlers::AppointmentState;
pub use router::{patient_routes, staff_routes};
