//! Data models
//!
//! Rust structs representing database entities.
//! All models use ULID for IDs and chrono for timestamps.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

// =============================================================================
// ID Types
// =============================================================================

/// Entity ID wrapper (ULID format, 26 characters)
///
/// Example: "01ARZ3NDEKTSV4RRFFQ69G5FAV"
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub String);

impl EntityId {
    /// Generate a new ULID
    pub fn new() -> Self {
        Self(ulid::Ulid::new().to_string())
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Provider
// =============================================================================

/// Social network an identity belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Provider {
    Twitter,
    Mastodon,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Twitter => "twitter",
            Self::Mastodon => "mastodon",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "twitter" => Ok(Self::Twitter),
            "mastodon" => Ok(Self::Mastodon),
            other => Err(AppError::Validation(format!("unknown provider: {other}"))),
        }
    }
}

// =============================================================================
// Posting preferences
// =============================================================================

/// What to do with Mastodon boosts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BoostOption {
    MastoBoostDoNotPost,
    MastoBoostPostAsLink,
}

/// What to do with Mastodon replies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MastoReplyOption {
    MastoReplyDoNotPost,
}

/// What to do with Mastodon posts that mention other accounts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MastoMentionOption {
    MastoMentionDoNotPost,
}

// =============================================================================
// User
// =============================================================================

/// A local account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: String,
    pub boost_options: Option<BoostOption>,
    pub masto_reply_options: Option<MastoReplyOption>,
    pub masto_mention_options: Option<MastoMentionOption>,
    /// Newest tweet id seen when twitter was linked
    pub last_tweet: Option<String>,
    /// Newest toot id seen when mastodon was linked
    pub last_toot: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Build a user that has not been persisted yet
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: EntityId::new().0,
            boost_options: None,
            masto_reply_options: None,
            masto_mention_options: None,
            last_tweet: None,
            last_toot: None,
            created_at: now,
            updated_at: now,
        }
    }
}

impl Default for User {
    fn default() -> Self {
        Self::new()
    }
}

/// Partial update of posting preferences
///
/// Outer `None` leaves a field untouched, `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserOptionsPatch {
    pub boost_options: Option<Option<BoostOption>>,
    pub masto_reply_options: Option<Option<MastoReplyOption>>,
    pub masto_mention_options: Option<Option<MastoMentionOption>>,
}

impl UserOptionsPatch {
    pub fn is_empty(&self) -> bool {
        self.boost_options.is_none()
            && self.masto_reply_options.is_none()
            && self.masto_mention_options.is_none()
    }

    /// Apply the patch to an in-memory user
    pub fn apply(&self, user: &mut User) {
        if let Some(value) = self.boost_options {
            user.boost_options = value;
        }
        if let Some(value) = self.masto_reply_options {
            user.masto_reply_options = value;
        }
        if let Some(value) = self.masto_mention_options {
            user.masto_mention_options = value;
        }
    }
}

// =============================================================================
// Authorization (identity link)
// =============================================================================

/// An external identity bound to a local user
///
/// At most one row exists per (provider, uid).
#[derive(Clone, PartialEq, sqlx::FromRow)]
pub struct Authorization {
    pub id: String,
    pub provider: Provider,
    /// Provider account id (Mastodon: `localpart@host`)
    pub uid: String,
    pub token: String,
    /// OAuth 1.0a token secret, absent for Mastodon
    pub secret: Option<String>,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Authorization {
    /// Build a link that has not been persisted yet
    pub fn new(provider: Provider, uid: &str, user_id: &str) -> Self {
        let now = Utc::now();
        Self {
            id: EntityId::new().0,
            provider,
            uid: uid.to_string(),
            token: String::new(),
            secret: None,
            user_id: user_id.to_string(),
            created_at: now,
            updated_at: now,
        }
    }
}

impl fmt::Debug for Authorization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Authorization")
            .field("id", &self.id)
            .field("provider", &self.provider)
            .field("uid", &self.uid)
            .field("token", &"[redacted]")
            .field("secret", &self.secret.as_ref().map(|_| "[redacted]"))
            .field("user_id", &self.user_id)
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

// =============================================================================
// OAuth callback input
// =============================================================================

/// Access credentials issued by a completed OAuth handshake
#[derive(Clone, PartialEq, Deserialize)]
pub struct Credentials {
    pub token: String,
    #[serde(default)]
    pub secret: Option<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("token", &"[redacted]")
            .field("secret", &self.secret.as_ref().map(|_| "[redacted]"))
            .finish()
    }
}

/// Result of an OAuth handshake, handed over by the callback handler
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OAuthCallback {
    pub provider: Provider,
    pub uid: String,
    pub credentials: Credentials,
}

impl OAuthCallback {
    pub fn new(provider: Provider, uid: impl Into<String>, token: impl Into<String>, secret: Option<String>) -> Self {
        Self {
            provider,
            uid: uid.into(),
            credentials: Credentials {
                token: token.into(),
                secret,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_parses_known_names() {
        assert_eq!("twitter".parse::<Provider>().unwrap(), Provider::Twitter);
        assert_eq!("mastodon".parse::<Provider>().unwrap(), Provider::Mastodon);
        assert!(matches!(
            "github".parse::<Provider>(),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn options_serialize_as_screaming_snake_case() {
        let json = serde_json::to_string(&BoostOption::MastoBoostPostAsLink).unwrap();
        assert_eq!(json, "\"MASTO_BOOST_POST_AS_LINK\"");
    }

    #[test]
    fn authorization_debug_hides_credentials() {
        let mut link = Authorization::new(Provider::Twitter, "42", "user");
        link.token = "very-secret-token".to_string();
        link.secret = Some("very-secret-secret".to_string());

        let debug = format!("{link:?}");
        assert!(!debug.contains("very-secret"));
        assert!(debug.contains("[redacted]"));
    }

    #[test]
    fn options_patch_distinguishes_clear_from_untouched() {
        let mut user = User::new();
        user.boost_options = Some(BoostOption::MastoBoostDoNotPost);
        user.masto_reply_options = Some(MastoReplyOption::MastoReplyDoNotPost);

        let patch = UserOptionsPatch {
            boost_options: Some(None),
            masto_mention_options: Some(Some(MastoMentionOption::MastoMentionDoNotPost)),
            ..Default::default()
        };
        patch.apply(&mut user);

        assert_eq!(user.boost_options, None);
        assert_eq!(
            user.masto_reply_options,
            Some(MastoReplyOption::MastoReplyDoNotPost)
        );
        assert_eq!(
            user.masto_mention_options,
            Some(MastoMentionOption::MastoMentionDoNotPost)
        );
    }
}
