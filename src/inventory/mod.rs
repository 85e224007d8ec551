//! Recording inventory
//!
//! Persists committed recordings per prompt category and serves listing,
//! lookup, playback and deletion.

mod recording;
mod store;

pub use recording::Recording;
pub use store::Inventory;
