pub mod repository;

pub use repository::{InMemoryStaffRepository, StaffRepository, SupabaseStaffRepository};
