pub mod api;
pub mod channel;
pub mod keyring;
pub mod metrics;
pub mod models;
pub mod store;
