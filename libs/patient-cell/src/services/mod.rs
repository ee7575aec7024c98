pub mod patient;
pub mod repository;
pub mod search;

pub use patient::PatientService;
pub use repository::{InMemoryPatientRepository, PatientRepository, SupabasePatientRepository};
pub use search::PatientSearch;
