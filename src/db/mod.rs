pub mod dbstore;
pub mod memstore;
pub mod store;

pub use dbstore::DbStore;
pub use memstore::MemStore;
pub use store::{AnnotationStore, StoreError, UserRecord, UserStore};
