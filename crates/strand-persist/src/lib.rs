pub mod error;
pub mod memory;
pub mod models;
pub mod trait_client;

#[cfg(feature = "mongodb")]
pub mod dbs;

pub use error::{PersistError, Result};
pub use memory::InMemoryRunStore;
pub use models::{RunSummary, RunTokenUsage};
pub use trait_client::RunRecorder;

#[cfg(feature = "mongodb")]
pub use dbs::mongo::MongoRunStore;
