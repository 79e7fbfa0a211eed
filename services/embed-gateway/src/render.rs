//! HTML delivery
//!
//! Turns an authorized embed token into the response body the browser
//! consumes. Three modes: a full page hosting the iframe, the bare
//! iframe fragment for callers that compose their own page, and a
//! self-submitting form for the platform's private embed flow where
//! the token travels in a POST body instead of the query string.

use std::fmt;
use std::str::FromStr;

use axum::http::HeaderName;
use axum::http::StatusCode;
use axum::http::header;
use axum::response::{IntoResponse, Response};

use common::Error;
use embed_auth::{EmbedKind, EmbedToken};

const IFRAME_SANDBOX: &str =
    "allow-same-origin allow-scripts allow-forms allow-popups allow-top-navigation";

/// Token-bearing HTML is never cacheable.
const HTML_HEADERS: [(HeaderName, &str); 4] = [
    (header::CONTENT_TYPE, "text/html; charset=utf-8"),
    (header::CACHE_CONTROL, "no-cache, no-store, must-revalidate"),
    (header::PRAGMA, "no-cache"),
    (header::EXPIRES, "0"),
];

/// Sent on every response, including errors and preflight.
pub(crate) const CORS_HEADERS: [(HeaderName, &str); 4] = [
    (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
    (header::ACCESS_CONTROL_ALLOW_METHODS, "GET, POST, OPTIONS"),
    (
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        "Content-Type, Authorization",
    ),
    (header::ACCESS_CONTROL_MAX_AGE, "86400"),
];

/// How the embed is delivered to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseMode {
    /// Complete HTML document hosting the iframe.
    Page,
    /// Bare iframe fragment.
    Iframe,
    /// Self-submitting form that POSTs the token to the private embed
    /// endpoint, keeping it out of the URL.
    Form,
}

impl fmt::Display for ResponseMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Page => "page",
            Self::Iframe => "iframe",
            Self::Form => "form",
        };
        f.write_str(name)
    }
}

impl FromStr for ResponseMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("page") {
            Ok(Self::Page)
        } else if s.eq_ignore_ascii_case("iframe") {
            Ok(Self::Iframe)
        } else if s.eq_ignore_ascii_case("form") {
            Ok(Self::Form)
        } else {
            Err(Error::Config(format!(
                "unknown response mode '{s}' (expected page, iframe, or form)"
            )))
        }
    }
}

/// Build the success response for the given mode.
pub fn compose(
    mode: ResponseMode,
    base_url: &str,
    kind: EmbedKind,
    token: &EmbedToken,
) -> Response {
    let body = match mode {
        ResponseMode::Page => render_page(&embed_url(base_url, kind, token)),
        ResponseMode::Iframe => render_iframe(&embed_url(base_url, kind, token)),
        ResponseMode::Form => render_form(&private_embed_url(base_url, kind, token), token),
    };
    (StatusCode::OK, HTML_HEADERS, CORS_HEADERS, body).into_response()
}

/// CORS preflight answer; carries no body and touches no upstream.
pub fn preflight() -> Response {
    (StatusCode::OK, CORS_HEADERS, ()).into_response()
}

/// Public embed URL with the token in the query string.
fn embed_url(base_url: &str, kind: EmbedKind, token: &EmbedToken) -> String {
    format!(
        "{base_url}/embed/{segment}/{asset}?embedToken={token}",
        segment = kind.profile().embed_segment,
        asset = urlencoding::encode(token.asset_id()),
        token = urlencoding::encode(token.expose()),
    )
}

/// Private embed URL; the token is POSTed separately.
fn private_embed_url(base_url: &str, kind: EmbedKind, token: &EmbedToken) -> String {
    format!(
        "{base_url}/embed/{segment}/private/{asset}",
        segment = kind.profile().embed_segment,
        asset = urlencoding::encode(token.asset_id()),
    )
}

fn render_iframe(url: &str) -> String {
    format!(
        "<iframe src=\"{src}\" sandbox=\"{IFRAME_SANDBOX}\" \
         frameborder=\"0\" allowfullscreen width=\"100%\" height=\"100%\"></iframe>",
        src = escape_attr(url),
    )
}

fn render_page(url: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>Embedded Analytics</title>
<style>
  html, body {{ margin: 0; padding: 0; height: 100%; }}
  .embed-container {{ position: absolute; top: 0; left: 0; right: 0; bottom: 0; }}
</style>
</head>
<body>
<div class="embed-container">{iframe}</div>
</body>
</html>
"#,
        iframe = render_iframe(url),
    )
}

fn render_form(action: &str, token: &EmbedToken) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>Embedded Analytics</title>
</head>
<body onload="document.forms[0].submit()">
<form action="{action}" method="post">
<input type="hidden" name="embedToken" value="{token}">
<noscript><button type="submit">Open embed</button></noscript>
</form>
</body>
</html>
"#,
        action = escape_attr(action),
        token = escape_attr(token.expose()),
    )
}

/// Minimal HTML attribute escaping for values interpolated into
/// double- or single-quoted attributes.
fn escape_attr(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
