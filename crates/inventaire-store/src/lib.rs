//! # inventaire-store
//!
//! Local client-side storage for the inventory application, backed by
//! SQLite.
//!
//! The backend owns every article and user row; this crate only keeps what
//! must survive a restart on the operator's machine: the remembered CP
//! number and the current backend session. The crate exposes a synchronous
//! `Database` handle wrapping a `rusqlite::Connection` with typed helpers.

pub mod database;
pub mod migrations;
pub mod preferences;
pub mod session;

mod error;

pub use database::Database;
pub use error::StoreError;
