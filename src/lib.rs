pub mod app;
pub mod config;
pub mod domain;
pub mod membership;
pub mod store;
pub mod telemetry;
