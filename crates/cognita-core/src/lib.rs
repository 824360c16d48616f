//! cognita-core
//!
//! Domain types shared by every Cognita crate, plus the storage key
//! layout. Nothing here performs I/O.

pub mod error;
pub mod keys;
pub mod models;
