//! Port traits separating domain logic from persistence, configuration and
//! export.

pub mod config_port;
pub mod export_port;
pub mod store_port;
