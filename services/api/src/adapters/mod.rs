pub mod db;
pub mod memory;
pub mod supabase;

pub use db::DbAdapter;
pub use memory::{MemoryStore, StaticIdentityProvider};
pub use supabase::SupabaseAuthAdapter;
