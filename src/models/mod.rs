//! Model lifecycle: lazy loading and encoder provisioning.

pub mod lazy;
pub mod provision;

pub use lazy::LazyModel;
pub use provision::EmbeddingSource;
