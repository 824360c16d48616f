//! cognita-storage
//!
//! Object storage behind a small async trait: S3 in production, an
//! in-memory map for local development and tests. Typed JSON helpers sit
//! on top.

pub mod client;
pub mod error;
pub mod json;
pub mod memory;
pub mod objects;
pub mod s3;

pub use memory::MemoryStore;
pub use objects::{GetObjectOutput, ObjectStore};
pub use s3::S3Store;
