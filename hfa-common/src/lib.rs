//! # HFA Common Library
//!
//! Shared code for the academy membership service:
//! - Error taxonomy
//! - Configuration and data-folder resolution
//! - Member domain model (identity, academy code, age gating, merge rules)
//! - Dues ledger domain model and reconciliation engine
//! - Abstract store interface and the SQLite adapter

pub mod config;
pub mod db;
pub mod error;
pub mod ledger;
pub mod member;
pub mod store;
pub mod time;

pub use error::{Error, Result};
pub use store::Store;
