pub mod error;
pub mod memory;
pub mod realtime;
pub mod supabase;
pub mod traits;
pub mod types;

pub use error::{BackendError, BackendResult};
pub use memory::MemoryBackend;
pub use supabase::SupabaseClient;
pub use traits::{AuthProvider, ChangeFeed, ListingTable, ObjectStorage};
pub use types::{AdminSession, ChangeEvent, ChangeSubscription, Credentials, ObjectUpload};

use std::sync::Arc;

/// Shared handles to every backend concern
#[derive(Clone)]
pub struct Backend {
    pub table: Arc<dyn ListingTable>,
    pub storage: Arc<dyn ObjectStorage>,
    pub auth: Arc<dyn AuthProvider>,
    pub changes: Arc<dyn ChangeFeed>,
}

impl Backend {
    /// One implementation serving all four concerns
    pub fn from_shared<B>(backend: Arc<B>) -> Self
    where
        B: ListingTable + ObjectStorage + AuthProvider + ChangeFeed + 'static,
    {
        Self {
            table: backend.clone(),
            storage: backend.clone(),
            auth: backend.clone(),
            changes: backend,
        }
    }
}
