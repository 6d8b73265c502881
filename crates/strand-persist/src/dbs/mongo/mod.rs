mod client;
mod models;

pub use client::MongoRunStore;
pub use models::{MongoRun, MongoTimelineEntry};
