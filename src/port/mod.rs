//! Trait seams between the engine and its collaborators: exchange adapters
//! and the generation store.

pub mod adapter;
pub mod store;

pub use adapter::ExchangeAdapter;
pub use store::{GenerationStore, RetentionPolicy};
