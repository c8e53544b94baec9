//! Journal line construction for payment posting.

pub mod builder;

pub use builder::{materialize_batches, JournalLineBuilder, LineSpec, MaterializedBatch};
