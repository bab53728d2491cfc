//! API-compatible types.
//!
//! The types in this module are serialised in an API-friendly way, e.g.:
//!
//! - Field names are camelCase.
//! - Datetimes are RFC 3339 strings.

use serde::{Deserialize, Serialize};

pub mod auth;
pub mod ballot;
pub mod candidate;
pub mod election;
pub mod position;
pub mod results;
pub mod user;
pub mod voter;

/// A bare status message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub message: String,
}

impl Message {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
