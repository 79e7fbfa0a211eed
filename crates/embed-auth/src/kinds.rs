//! Asset kinds and their platform-side profiles
//!
//! Everything that differs between page, card, and story embeds lives in
//! one table per kind: the authorization endpoint, the URL segment used
//! by browser-facing embed paths, the OAuth scope requested during the
//! exchange, and the permission set granted to the embed token.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

/// Kind of visual asset an embed token can be scoped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbedKind {
    Page,
    Card,
    Story,
}

/// Capability granted to the holder of an embed token.
///
/// Serialized in the platform's SCREAMING_SNAKE_CASE wire convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Permission {
    Read,
    Filter,
    Export,
}

/// Platform-side profile for one asset kind.
#[derive(Debug)]
pub struct KindProfile {
    /// Path of the embed-token authorization endpoint.
    pub auth_path: &'static str,
    /// Plural segment used in browser-facing embed URLs.
    pub embed_segment: &'static str,
    /// OAuth scope requested during the client-credentials exchange.
    pub scope: &'static str,
    /// Permissions the embed token grants for this kind.
    pub permissions: &'static [Permission],
}

/// Scope string the platform documents for embed flows.
const EMBED_SCOPE: &str = "data audit user dashboard";

/// Pages authorize through the stories endpoint; the platform treats a
/// page as a single-section story.
static PAGE: KindProfile = KindProfile {
    auth_path: "/v1/stories/embed/auth",
    embed_segment: "pages",
    scope: EMBED_SCOPE,
    permissions: &[Permission::Read],
};

static CARD: KindProfile = KindProfile {
    auth_path: "/v1/cards/embed/auth",
    embed_segment: "cards",
    scope: EMBED_SCOPE,
    permissions: &[Permission::Read, Permission::Filter, Permission::Export],
};

static STORY: KindProfile = KindProfile {
    auth_path: "/v1/stories/embed/auth",
    embed_segment: "stories",
    scope: EMBED_SCOPE,
    permissions: &[Permission::Read],
};

impl EmbedKind {
    /// Look up the profile for this kind.
    pub fn profile(self) -> &'static KindProfile {
        match self {
            EmbedKind::Page => &PAGE,
            EmbedKind::Card => &CARD,
            EmbedKind::Story => &STORY,
        }
    }
}

impl fmt::Display for EmbedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EmbedKind::Page => "page",
            EmbedKind::Card => "card",
            EmbedKind::Story => "story",
        };
        write!(f, "{name}")
    }
}

impl FromStr for EmbedKind {
    type Err = common::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("page") {
            Ok(EmbedKind::Page)
        } else if s.eq_ignore_ascii_case("card") {
            Ok(EmbedKind::Card)
        } else if s.eq_ignore_ascii_case("story") {
            Ok(EmbedKind::Story)
        } else {
            Err(common::Error::Config(format!(
                "unknown embed kind '{s}' (expected page, card, or story)"
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_and_story_share_the_stories_endpoint() {
        assert_eq!(EmbedKind::Page.profile().auth_path, "/v1/stories/embed/auth");
        assert_eq!(
            EmbedKind::Story.profile().auth_path,
            "/v1/stories/embed/auth"
        );
        assert_eq!(EmbedKind::Card.profile().auth_path, "/v1/cards/embed/auth");
    }

    #[test]
    fn embed_segments_are_plural() {
        assert_eq!(EmbedKind::Page.profile().embed_segment, "pages");
        assert_eq!(EmbedKind::Card.profile().embed_segment, "cards");
        assert_eq!(EmbedKind::Story.profile().embed_segment, "stories");
    }

    #[test]
    fn cards_grant_interactive_permissions() {
        assert_eq!(
            EmbedKind::Card.profile().permissions,
            &[Permission::Read, Permission::Filter, Permission::Export]
        );
        assert_eq!(EmbedKind::Page.profile().permissions, &[Permission::Read]);
        assert_eq!(EmbedKind::Story.profile().permissions, &[Permission::Read]);
    }

    #[test]
    fn permissions_serialize_screaming_snake_case() {
        assert_eq!(
            serde_json::to_string(&Permission::Read).unwrap(),
            "\"READ\""
        );
        assert_eq!(
            serde_json::to_string(&[Permission::Filter, Permission::Export]).unwrap(),
            "[\"FILTER\",\"EXPORT\"]"
        );
    }

    #[test]
    fn kind_parses_case_insensitively() {
        assert_eq!("page".parse::<EmbedKind>().unwrap(), EmbedKind::Page);
        assert_eq!("Card".parse::<EmbedKind>().unwrap(), EmbedKind::Card);
        assert_eq!("STORY".parse::<EmbedKind>().unwrap(), EmbedKind::Story);
    }

    #[test]
    fn unknown_kind_is_a_config_error() {
        let err = "widget".parse::<EmbedKind>().unwrap_err();
        assert!(err.to_string().contains("widget"), "got: {err}");
    }

    #[test]
    fn display_round_trips_through_parse() {
        for kind in [EmbedKind::Page, EmbedKind::Card, EmbedKind::Story] {
            assert_eq!(kind.to_string().parse::<EmbedKind>().unwrap(), kind);
        }
    }
}
