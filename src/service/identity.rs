//! Identity linking
//!
//! Turns the result of a completed OAuth handshake into a persisted link
//! between an external identity and a local user.

use std::sync::Arc;

use chrono::Utc;

use super::user::UserService;
use crate::config::AppConfig;
use crate::data::{Authorization, Database, OAuthCallback, Provider, User};
use crate::error::AppError;
use crate::metrics::IDENTITY_LINKS_TOTAL;
use crate::social::{SocialClients, mastodon_base_url};

/// Links OAuth identities to local users
#[derive(Clone)]
pub struct IdentityLinker {
    db: Arc<Database>,
    users: UserService,
    config: Arc<AppConfig>,
}

impl IdentityLinker {
    pub fn new(db: Arc<Database>, clients: Arc<dyn SocialClients>, config: Arc<AppConfig>) -> Self {
        Self {
            users: UserService::new(db.clone(), clients),
            db,
            config,
        }
    }

    /// Link the identity from `callback` to a user.
    ///
    /// The target user is `current_user` when given, otherwise the identity's
    /// existing owner, otherwise a new user. Fresh credentials always replace
    /// stored ones, and the link becomes the user's primary identity for its
    /// provider. Afterwards the provider's last-seen post id is bootstrapped
    /// if the user has none.
    ///
    /// # Returns
    /// `None` when the identity is unknown and registration is disabled;
    /// nothing is written in that case.
    ///
    /// # Errors
    /// Database and upstream API failures are returned as-is. A failed
    /// bootstrap leaves the already saved link in place.
    pub async fn link_identity(
        &self,
        callback: &OAuthCallback,
        current_user: Option<&User>,
    ) -> Result<Option<User>, AppError> {
        let allow_new_users = self.config.allow_new_users();
        let provider = callback.provider;

        let existing = self.db.find_authorization(provider, &callback.uid).await?;
        if existing.is_none() && !allow_new_users {
            tracing::info!(
                provider = %provider,
                uid = %callback.uid,
                "Unknown identity turned away: registration is disabled"
            );
            IDENTITY_LINKS_TOTAL
                .with_label_values(&[provider.as_str(), "denied"])
                .inc();
            return Ok(None);
        }

        if provider == Provider::Mastodon {
            mastodon_base_url(&callback.uid)?;
        }

        let (mut user, is_new_user) = match (current_user, &existing) {
            (Some(user), _) => (user.clone(), false),
            (None, Some(link)) => {
                let owner = self.db.get_user(&link.user_id).await?.ok_or_else(|| {
                    AppError::Internal(anyhow::anyhow!(
                        "authorization {} references missing user {}",
                        link.id,
                        link.user_id
                    ))
                })?;
                (owner, false)
            }
            (None, None) => (User::new(), true),
        };

        let outcome = match &existing {
            None => "created",
            Some(link) if link.user_id != user.id => {
                tracing::warn!(
                    provider = %provider,
                    uid = %callback.uid,
                    from_user = %link.user_id,
                    to_user = %user.id,
                    "Moving identity to the current user"
                );
                "reassigned"
            }
            Some(_) => "refreshed",
        };

        let mut link = existing
            .unwrap_or_else(|| Authorization::new(provider, &callback.uid, &user.id));
        link.user_id = user.id.clone();
        link.token = callback.credentials.token.clone();
        link.secret = callback.credentials.secret.clone();
        link.updated_at = Utc::now();

        let stored = self
            .db
            .save_authorization(&link, is_new_user.then_some(&user))
            .await?;

        IDENTITY_LINKS_TOTAL
            .with_label_values(&[provider.as_str(), outcome])
            .inc();
        tracing::info!(
            provider = %provider,
            uid = %stored.uid,
            user_id = %user.id,
            new_user = is_new_user,
            outcome,
            "Identity linked"
        );

        match stored.provider {
            Provider::Twitter => self.users.save_last_tweet_id(&mut user).await?,
            Provider::Mastodon => self.users.save_last_toot_id(&mut user).await?,
        }

        Ok(Some(user))
    }
}
