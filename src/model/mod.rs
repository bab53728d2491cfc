//! Data types and storage.
//!
//! - [`common`]: closed enums and ID aliases shared by every layer.
//! - [`db`]: stored entities.
//! - [`api`]: request and response payloads.
//! - [`store`]: the persistence interface and the in-memory backend.
//! - [`mongodb`]: the MongoDB backend.

pub mod api;
pub mod common;
pub mod db;
pub mod mongodb;
pub mod store;
