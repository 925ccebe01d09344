pub mod cache;
pub mod codec;
pub mod engine;
pub mod error;
pub mod headers;
pub mod scoring;
pub mod store;

pub use engine::{BoardEngine, ColumnConfig, ReactionOutcome};
pub use error::BoardError;
pub use store::{RowStore, VersionStore};
