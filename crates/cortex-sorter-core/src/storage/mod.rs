pub mod models;
pub mod queries;
pub mod sqlite;
pub mod store;

pub use models::FingerprintRecord;
pub use sqlite::Database;
pub use store::FingerprintStore;
