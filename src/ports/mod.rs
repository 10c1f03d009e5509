//! Port traits implemented by adapters.

pub mod config_port;
pub mod data_port;
pub mod rate_port;
pub mod report_port;
