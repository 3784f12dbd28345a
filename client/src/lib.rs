//! Client for the listing marketplace program.
//!
//! Derives listing addresses, builds and submits listing instructions, caches listing accounts
//! and ties them together into mutations that keep the cache fresh.

pub mod args;
pub mod builder;
pub mod cache;
pub mod cluster;
pub mod context;
pub mod e2e_helpers;
pub mod error;
pub mod ledger;
pub mod logs;
pub mod orchestrator;
pub mod pda;
pub mod pretty;
pub mod session;
pub mod signer;
pub mod transactions;
pub mod views;

pub use logs::LogColor;
