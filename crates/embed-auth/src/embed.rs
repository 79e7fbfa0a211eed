//! Embed-token authorization
//!
//! Second upstream call of the pipeline. Spends the access token on a
//! POST to the kind-specific authorization endpoint and returns the
//! short-lived embed token scoped to one asset. Using the wrong
//! endpoint for a kind is an upstream rejection, not a crash; the
//! kind-to-endpoint mapping lives in [`crate::kinds`].

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use common::{Secret, body_snippet};

use crate::error::{Error, Result};
use crate::kinds::{EmbedKind, Permission};
use crate::token::AccessToken;

/// Short-lived embed token, bound to the asset and permission set it
/// was authorized for.
///
/// The token value is redacted in Debug output; its single legitimate
/// read is the markup interpolation step in the response composer. The
/// asset id and permissions are safe to log.
#[derive(Debug)]
pub struct EmbedToken {
    token: Secret<String>,
    asset_id: String,
    permissions: &'static [Permission],
}

impl EmbedToken {
    pub fn new(token: String, asset_id: String, permissions: &'static [Permission]) -> Self {
        Self {
            token: Secret::new(token),
            asset_id,
            permissions,
        }
    }

    /// Raw token value for interpolation into the embed URL or form field.
    pub fn expose(&self) -> &str {
        self.token.expose()
    }

    /// Asset this token authorizes.
    pub fn asset_id(&self) -> &str {
        &self.asset_id
    }

    /// Permissions the token grants.
    pub fn permissions(&self) -> &'static [Permission] {
        self.permissions
    }
}

/// Inputs for one embed authorization.
#[derive(Debug, Clone)]
pub struct EmbedRequest<'a> {
    pub kind: EmbedKind,
    pub asset_id: &'a str,
    /// Requested embed-token validity, in minutes.
    pub session_length: u64,
    /// Row-level filter entries forwarded verbatim when present.
    pub filters: Option<&'a Value>,
}

/// Wire body for the authorization endpoint, camelCase per the platform
/// convention. `filters` is omitted entirely when unset: the endpoint
/// rejects explicit nulls and unexpected empty arrays, so absent must
/// mean absent.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedAuthBody<'a> {
    session_length: u64,
    authorizations: [AuthorizationEntry<'a>; 1],
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AuthorizationEntry<'a> {
    /// The platform names this field `token` although it carries the
    /// asset reference being authorized, not a credential.
    token: &'a str,
    permissions: &'static [Permission],
    #[serde(skip_serializing_if = "Option::is_none")]
    filters: Option<&'a Value>,
}

/// Success shape of the authorization endpoint.
#[derive(Deserialize)]
struct EmbedAuthResponse {
    authentication: Option<String>,
}

/// Trade the access token for an embed token scoped to one asset.
///
/// Consumes the access token: once the embed authorization has been
/// attempted the access token has served its purpose and cannot be
/// reused. A single attempt per request, like the exchange itself.
pub async fn authorize_embed(
    client: &reqwest::Client,
    base_url: &str,
    access: AccessToken,
    request: &EmbedRequest<'_>,
) -> Result<EmbedToken> {
    let profile = request.kind.profile();
    let url = format!("{base_url}{}", profile.auth_path);

    let body = EmbedAuthBody {
        session_length: request.session_length,
        authorizations: [AuthorizationEntry {
            token: request.asset_id,
            permissions: profile.permissions,
            filters: request.filters,
        }],
    };

    let response = client
        .post(&url)
        .bearer_auth(access.expose())
        .json(&body)
        .send()
        .await
        .map_err(|e| Error::Http(format!("embed authorization request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        let text = response
            .text()
            .await
            .unwrap_or_else(|_| String::from("<no body>"));
        debug!(
            status = status.as_u16(),
            body = %body_snippet(&text),
            "embed endpoint rejected authorization"
        );
        return Err(Error::EmbedRejected {
            status: status.as_u16(),
            asset_id: request.asset_id.to_string(),
        });
    }

    let body: EmbedAuthResponse = response
        .json()
        .await
        .map_err(|e| Error::InvalidResponse(format!("authorization response: {e}")))?;

    match body.authentication {
        Some(token) if !token.is_empty() => Ok(EmbedToken::new(
            token,
            request.asset_id.to_string(),
            profile.permissions,
        )),
        _ => Err(Error::EmbedMissing {
            asset_id: request.asset_id.to_string(),
        }),
    }
}
