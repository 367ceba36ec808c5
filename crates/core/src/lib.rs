//! Pathway Core — provider connections, container selection, paced syncs and
//! normalized student risk results.

pub mod config;
pub mod connection;
pub mod error;
pub mod events;
pub mod hub;
pub mod models;
pub mod normalize;
pub mod providers;
pub mod selection;
pub mod session;
pub mod store;
pub mod sync;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{PathwayError, Result};
pub use events::HubEvent;
pub use hub::IntegrationHub;
