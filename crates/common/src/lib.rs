//! Common types for the embed gateway

mod error;
mod redact;
mod secret;

pub use error::{Error, Result};
pub use redact::{body_snippet, truncate_id};
pub use secret::Secret;
