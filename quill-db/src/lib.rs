//! Storage collaborator for quill.
//!
//! [`Store`] lists the repository functions the HTTP layer relies on.
//! [`client::DbClient`] implements them on PostgreSQL and
//! [`memory::MemoryStore`] keeps everything in process memory.

pub mod client;
pub mod memory;
mod record;
mod store;

pub use store::{DbError, PostFilter, Result, Store};
