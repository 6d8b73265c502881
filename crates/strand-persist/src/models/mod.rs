mod run;

pub use run::{RunSummary, RunTokenUsage};
