//! Embed-token authorization library
//!
//! Implements the two upstream calls of the embed pipeline: the OAuth
//! client-credentials exchange and the embed-token authorization that
//! spends its result. This crate is a standalone library with no
//! dependency on the gateway binary, so it can be tested and used
//! independently.
//!
//! Token flow:
//! 1. Handler calls `token::exchange_client_credentials()` once per request
//! 2. The resulting `AccessToken` is consumed by `embed::authorize_embed()`
//! 3. The returned `EmbedToken` is interpolated into browser-facing markup
//! 4. Nothing is cached; the next request starts over at step 1

pub mod embed;
pub mod error;
pub mod kinds;
pub mod token;

pub use embed::{EmbedRequest, EmbedToken, authorize_embed};
pub use error::{Error, Result};
pub use kinds::{EmbedKind, KindProfile, Permission};
pub use token::{AccessToken, TOKEN_PATH, exchange_client_credentials};
