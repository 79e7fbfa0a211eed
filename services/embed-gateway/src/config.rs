//! Configuration resolution
//!
//! Two layers. `ServerConfig` is read once at startup (listener address,
//! concurrency cap). `EmbedConfig` is resolved fresh at every request
//! entry and passed by reference into the pipeline stages, so no stage
//! reads ambient state. Sources merge as process env over a `.env` file
//! (dotenvy loads the file without overriding real variables), and each
//! field accepts deployment-specific aliases, first non-empty candidate
//! wins.

use std::net::SocketAddr;

use serde_json::Value;

use common::{Error, Result, Secret};
use embed_auth::EmbedKind;

use crate::render::ResponseMode;

const CLIENT_ID_VARS: &[&str] = &["EMBED_CLIENT_ID", "CLIENT_ID"];
const CLIENT_SECRET_VARS: &[&str] = &["EMBED_CLIENT_SECRET", "CLIENT_SECRET"];
const BASE_URL_VARS: &[&str] = &["EMBED_BASE_URL", "BASE_URL"];
const ASSET_ID_VARS: &[&str] = &["EMBED_ID", "CARD_ID", "ASSET_ID"];

const DEFAULT_SESSION_MINUTES: u64 = 240;
const DEFAULT_MAX_CONNECTIONS: usize = 1000;

/// Per-request embed configuration.
///
/// Immutable once resolved; never persisted or cached across requests.
/// The secret is wrapped so accidental Debug/log output stays redacted.
#[derive(Debug)]
pub struct EmbedConfig {
    pub client_id: String,
    pub client_secret: Secret<String>,
    pub base_url: String,
    pub asset_id: String,
    pub kind: EmbedKind,
    pub session_minutes: u64,
    pub response_mode: ResponseMode,
    pub filters: Option<Value>,
}

impl EmbedConfig {
    /// Resolve from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::resolve(|key| std::env::var(key).ok())
    }

    /// Resolve from an arbitrary key-to-value lookup. The indirection
    /// keeps resolution testable without touching process globals.
    pub fn resolve(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let (client_id, _) = require(&lookup, CLIENT_ID_VARS)?;
        let client_secret: Secret<String> = require(&lookup, CLIENT_SECRET_VARS)?.0.into();
        let base_url = normalize_base_url(require(&lookup, BASE_URL_VARS)?.0)?;
        let (asset_id, asset_var) = require(&lookup, ASSET_ID_VARS)?;

        let kind = match first_set(&lookup, &["EMBED_TYPE"]) {
            Some((raw, _)) => raw.parse::<EmbedKind>()?,
            // Deployments that configure CARD_ID mean a card; everything
            // else defaults to a page embed.
            None if asset_var == "CARD_ID" => EmbedKind::Card,
            None => EmbedKind::Page,
        };

        let session_minutes = match first_set(&lookup, &["SESSION_LENGTH"]) {
            Some((raw, _)) => {
                let minutes: u64 = raw.parse().map_err(|_| {
                    Error::Config(format!(
                        "SESSION_LENGTH must be a positive integer, got: {raw}"
                    ))
                })?;
                if minutes == 0 {
                    return Err(Error::Config(
                        "SESSION_LENGTH must be greater than 0".into(),
                    ));
                }
                minutes
            }
            None => DEFAULT_SESSION_MINUTES,
        };

        let response_mode = match first_set(&lookup, &["RESPONSE_MODE"]) {
            Some((raw, _)) => raw.parse::<ResponseMode>()?,
            None => ResponseMode::Page,
        };

        let filters = match first_set(&lookup, &["EMBED_FILTERS"]) {
            Some((raw, _)) => {
                let value: Value = serde_json::from_str(&raw)?;
                if !value.is_array() {
                    return Err(Error::Config("EMBED_FILTERS must be a JSON array".into()));
                }
                Some(value)
            }
            None => None,
        };

        Ok(Self {
            client_id,
            client_secret,
            base_url,
            asset_id,
            kind,
            session_minutes,
            response_mode,
            filters,
        })
    }
}

/// Server-level settings, read once at startup.
#[derive(Debug)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
    pub max_connections: usize,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::resolve(|key| std::env::var(key).ok())
    }

    pub fn resolve(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let listen_addr = match first_set(&lookup, &["LISTEN_ADDR"]) {
            Some((raw, _)) => raw
                .parse()
                .map_err(|e| Error::Config(format!("invalid LISTEN_ADDR '{raw}': {e}")))?,
            None => SocketAddr::from(([0, 0, 0, 0], 8080)),
        };

        let max_connections = match first_set(&lookup, &["MAX_CONNECTIONS"]) {
            Some((raw, _)) => raw.parse().map_err(|_| {
                Error::Config(format!("MAX_CONNECTIONS must be an integer, got: {raw}"))
            })?,
            None => DEFAULT_MAX_CONNECTIONS,
        };
        if max_connections == 0 {
            return Err(Error::Config(
                "MAX_CONNECTIONS must be greater than 0".into(),
            ));
        }

        Ok(Self {
            listen_addr,
            max_connections,
        })
    }
}

/// First candidate variable set to a non-empty value, with the name
/// that matched. Values arrive whitespace-trimmed.
fn first_set(
    lookup: &impl Fn(&str) -> Option<String>,
    candidates: &'static [&'static str],
) -> Option<(String, &'static str)> {
    candidates.iter().find_map(|name| {
        lookup(name)
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty())
            .map(|value| (value, *name))
    })
}

/// Required field: first non-empty candidate, or a configuration error
/// naming every accepted variable.
fn require(
    lookup: &impl Fn(&str) -> Option<String>,
    candidates: &'static [&'static str],
) -> Result<(String, &'static str)> {
    first_set(lookup, candidates).ok_or_else(|| {
        Error::Config(format!(
            "missing required setting ({})",
            candidates.join(" or ")
        ))
    })
}

/// Require an http(s) scheme and drop any trailing slash so path
/// concatenation stays predictable.
fn normalize_base_url(raw: String) -> Result<String> {
    if !raw.starts_with("http://") && !raw.starts_with("https://") {
        return Err(Error::Config(format!(
            "base URL must start with http:// or https://, got: {raw}"
        )));
    }
    Ok(raw.trim_end_matches('/').to_owned())
}
