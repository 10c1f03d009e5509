//! fairval: discounted-cash-flow fair value estimation.
//!
//! Hexagonal architecture: the valuation engine and capital-cost model live in
//! [`domain`], port traits in [`ports`], concrete implementations in
//! [`adapters`], and command dispatch in [`cli`].

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod cli;
