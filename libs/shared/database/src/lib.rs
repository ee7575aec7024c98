pub mod supabase;

pub use supabase::{QueryParams, SupabaseClient, SupabaseError};
