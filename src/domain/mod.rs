//! Core domain types and logic.

pub mod config_validation;
pub mod error;
pub mod filter;
pub mod ledger;
pub mod service;
pub mod stock_card;
pub mod transaction;
