//! # inventaire-shared
//!
//! Domain types and pure logic shared by the inventory client crates:
//! articles and users as mirrored from the backend tables, the login
//! identifier transform, PIN rules, the search/filter/pagination engine and
//! the statistics aggregator. Nothing in this crate performs I/O.

pub mod constants;
pub mod error;
pub mod identity;
pub mod pin;
pub mod search;
pub mod stats;
pub mod types;

pub use error::ValidationError;
pub use types::*;
