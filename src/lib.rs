pub mod auth;
pub mod config;
pub mod domain;
pub mod error;
pub mod event_sourcing;
pub mod http;
pub mod metrics;
pub mod store;
pub mod utils;
