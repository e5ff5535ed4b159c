//! Concrete adapter implementations for ports.

pub mod csv_export;
pub mod file_config_adapter;
#[cfg(feature = "sqlite")]
pub mod sqlite_adapter;
pub mod typst_export;
