//! Core domain types and logic.

pub mod capital;
pub mod config_validation;
pub mod dcf;
pub mod error;
pub mod fundamentals;
