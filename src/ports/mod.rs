//! Port traits between the domain and its adapters.

pub mod config_port;
pub mod history_port;
pub mod metrics_port;
