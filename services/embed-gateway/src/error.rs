//! Pipeline error taxonomy
//!
//! Every failure maps to one of four categories, each tied to the
//! pipeline stage that produced it. Clients receive a JSON body naming
//! the category, the stage, and a request id to quote when reporting
//! the problem. Upstream rejections carry the upstream status code so
//! callers can distinguish bad credentials from a platform outage
//! without access to our logs.

use axum::http::StatusCode;
use axum::http::header;
use axum::response::{IntoResponse, Response};

use crate::render;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Request entry could not assemble a usable configuration.
    #[error(transparent)]
    Configuration(#[from] common::Error),

    /// The platform rejected the client credentials.
    #[error("authentication failed: {0}")]
    Authentication(embed_auth::Error),

    /// The platform refused to mint an embed token for the asset.
    #[error("embed authorization failed: {0}")]
    EmbedAuthorization(embed_auth::Error),

    /// Transport failures and responses we could not interpret.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<embed_auth::Error> for Error {
    fn from(err: embed_auth::Error) -> Self {
        use embed_auth::Error as Auth;
        match err {
            Auth::TokenRejected { .. } | Auth::TokenMissing { .. } => Self::Authentication(err),
            Auth::EmbedRejected { .. } | Auth::EmbedMissing { .. } => {
                Self::EmbedAuthorization(err)
            }
            Auth::Http(_) | Auth::InvalidResponse(_) => Self::Internal(err.to_string()),
        }
    }
}

impl Error {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Authentication(_) => StatusCode::UNAUTHORIZED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stage label for logs and the pipeline error counter.
    pub fn stage(&self) -> &'static str {
        self.kind().1
    }

    fn kind(&self) -> (&'static str, &'static str) {
        match self {
            Self::Configuration(_) => ("configuration_error", "config_resolution"),
            Self::Authentication(_) => ("authentication_error", "token_exchange"),
            Self::EmbedAuthorization(_) => ("embed_authorization_error", "embed_authorization"),
            Self::Internal(_) => ("internal_error", "pipeline"),
        }
    }

    fn upstream_status(&self) -> Option<u16> {
        match self {
            Self::Authentication(err) | Self::EmbedAuthorization(err) => err.upstream_status(),
            _ => None,
        }
    }

    fn asset_id(&self) -> Option<&str> {
        match self {
            Self::Authentication(err) | Self::EmbedAuthorization(err) => err.asset_id(),
            _ => None,
        }
    }

    /// JSON error response. Optional fields are omitted rather than
    /// sent as null.
    pub fn to_response(&self, request_id: &str) -> Response {
        let (error_type, step) = self.kind();
        let mut detail = serde_json::json!({
            "type": error_type,
            "step": step,
            "message": self.to_string(),
            "request_id": request_id,
        });
        if let Some(status) = self.upstream_status() {
            detail["upstream_status"] = status.into();
        }
        if let Some(asset_id) = self.asset_id() {
            detail["asset_id"] = asset_id.into();
        }
        let body = serde_json::json!({ "error": detail }).to_string();

        (
            self.status(),
            [(header::CONTENT_TYPE, "application/json")],
            render::CORS_HEADERS,
            body,
        )
            .into_response()
    }
}
