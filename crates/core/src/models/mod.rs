pub mod connection;
pub mod container;
pub mod credentials;
pub mod provider;
pub mod sync;
