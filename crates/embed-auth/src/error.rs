//! Error types for token exchange and embed authorization

/// Errors from the two upstream platform calls.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("token exchange rejected ({status}) for client {client_id_hint}")]
    TokenRejected { status: u16, client_id_hint: String },

    /// 2xx token response whose body parsed but carried no usable token.
    #[error("token response missing access_token for client {client_id_hint}")]
    TokenMissing { client_id_hint: String },

    #[error("embed authorization rejected ({status}) for asset {asset_id}")]
    EmbedRejected { status: u16, asset_id: String },

    /// 2xx authorization response whose body parsed but carried no token.
    #[error("authorization response missing authentication field for asset {asset_id}")]
    EmbedMissing { asset_id: String },

    /// Upstream body that could not be parsed at all.
    #[error("unparseable upstream response: {0}")]
    InvalidResponse(String),
}

impl Error {
    /// Status code reported by the upstream platform, when one exists.
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            Error::TokenRejected { status, .. } | Error::EmbedRejected { status, .. } => {
                Some(*status)
            }
            _ => None,
        }
    }

    /// Asset the failed call was scoped to, when one was named.
    pub fn asset_id(&self) -> Option<&str> {
        match self {
            Error::EmbedRejected { asset_id, .. } | Error::EmbedMissing { asset_id } => {
                Some(asset_id)
            }
            _ => None,
        }
    }
}

/// Result alias for embed auth operations.
pub type Result<T> = std::result::Result<T, Error>;
