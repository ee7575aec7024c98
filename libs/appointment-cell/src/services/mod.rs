pub mod dashboard;
pub mod lifecycle;
pub mod query;
pub mod repository;

pub use dashboard::{DashboardService, PatientDashboard, StaffDashboard};
pub use lifecycle::AppointmentLifecycleService;
pub use query::{AppointmentQuery, Scope};
pub use repository::{AppointmentRepository, InMemoryAppointmentRepository, SupabaseAppointmentRepository};
