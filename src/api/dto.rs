//! API request and response DTOs
//!
//! Link credentials are accepted on the way in and never serialized on the
//! way out.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::data::{
    Authorization, BoostOption, Credentials, MastoMentionOption, MastoReplyOption, OAuthCallback,
    Provider, User, UserOptionsPatch,
};
use crate::error::AppError;

/// Body of `POST /api/v1/identities/callback`
#[derive(Debug, Clone, Deserialize)]
pub struct LinkIdentityRequest {
    pub provider: String,
    pub uid: String,
    pub credentials: Credentials,
    #[serde(default)]
    pub current_user_id: Option<String>,
}

impl LinkIdentityRequest {
    /// Validate the request and turn it into a callback for the linker
    pub fn to_callback(&self) -> Result<OAuthCallback, AppError> {
        let provider: Provider = self.provider.parse()?;

        let uid = self.uid.trim();
        if uid.is_empty() {
            return Err(AppError::Validation("uid must not be empty".to_string()));
        }
        if self.credentials.token.is_empty() {
            return Err(AppError::Validation(
                "credentials.token must not be empty".to_string(),
            ));
        }

        Ok(OAuthCallback::new(
            provider,
            uid,
            self.credentials.token.clone(),
            self.credentials.secret.clone(),
        ))
    }
}

/// Body of `PATCH /api/v1/users/:id/options`
///
/// An absent field is left alone; an explicit `null` clears the option.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateOptionsRequest {
    #[serde(default, deserialize_with = "present")]
    pub boost_options: Option<Option<BoostOption>>,
    #[serde(default, deserialize_with = "present")]
    pub masto_reply_options: Option<Option<MastoReplyOption>>,
    #[serde(default, deserialize_with = "present")]
    pub masto_mention_options: Option<Option<MastoMentionOption>>,
}

fn present<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl From<UpdateOptionsRequest> for UserOptionsPatch {
    fn from(request: UpdateOptionsRequest) -> Self {
        Self {
            boost_options: request.boost_options,
            masto_reply_options: request.masto_reply_options,
            masto_mention_options: request.masto_mention_options,
        }
    }
}

/// Linked identity, without credentials
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityResponse {
    pub id: String,
    pub provider: Provider,
    pub uid: String,
    /// Whether this link is used for the user's API calls to its provider
    pub primary: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl IdentityResponse {
    pub fn from_authorization(link: &Authorization, primary: bool) -> Self {
        Self {
            id: link.id.clone(),
            provider: link.provider,
            uid: link.uid.clone(),
            primary,
            created_at: link.created_at,
            updated_at: link.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: String,
    pub boost_options: Option<BoostOption>,
    pub masto_reply_options: Option<MastoReplyOption>,
    pub masto_mention_options: Option<MastoMentionOption>,
    pub last_tweet: Option<String>,
    pub last_toot: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            boost_options: user.boost_options,
            masto_reply_options: user.masto_reply_options,
            masto_mention_options: user.masto_mention_options,
            last_tweet: user.last_tweet.clone(),
            last_toot: user.last_toot.clone(),
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// A user together with its linked identities
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserWithIdentitiesResponse {
    pub user: UserResponse,
    pub identities: Vec<IdentityResponse>,
}
