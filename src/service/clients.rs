//! Per-operation API clients for one user

use std::sync::Arc;

use tokio::sync::OnceCell;

use crate::data::{Authorization, Database, Provider};
use crate::error::AppError;
use crate::social::{MastodonApi, SocialClients, TwitterApi, mastodon_base_url};

/// API clients built from a user's primary identities.
///
/// Clients and the Mastodon account id are resolved on first use and reused
/// until the value is dropped at the end of the operation.
pub struct UserClients<'a> {
    db: &'a Database,
    factory: &'a dyn SocialClients,
    user_id: &'a str,
    twitter: OnceCell<Arc<dyn TwitterApi>>,
    mastodon: OnceCell<Arc<dyn MastodonApi>>,
    mastodon_account_id: OnceCell<String>,
}

impl<'a> UserClients<'a> {
    pub fn new(db: &'a Database, factory: &'a dyn SocialClients, user_id: &'a str) -> Self {
        Self {
            db,
            factory,
            user_id,
            twitter: OnceCell::new(),
            mastodon: OnceCell::new(),
            mastodon_account_id: OnceCell::new(),
        }
    }

    /// Twitter client using the primary twitter identity's credentials
    pub async fn twitter(&self) -> Result<Arc<dyn TwitterApi>, AppError> {
        let client = self
            .twitter
            .get_or_try_init(|| async {
                let link = self.identity(Provider::Twitter).await?;
                Ok::<_, AppError>(
                    self.factory
                        .twitter(&link.token, link.secret.as_deref().unwrap_or_default()),
                )
            })
            .await?;

        Ok(client.clone())
    }

    /// Mastodon client for the primary mastodon identity's instance
    pub async fn mastodon(&self) -> Result<Arc<dyn MastodonApi>, AppError> {
        let client = self
            .mastodon
            .get_or_try_init(|| async {
                let link = self.identity(Provider::Mastodon).await?;
                let base_url = mastodon_base_url(&link.uid)?;
                Ok::<_, AppError>(self.factory.mastodon(&base_url, &link.token))
            })
            .await?;

        Ok(client.clone())
    }

    /// Account id of the primary mastodon identity, as the instance reports it
    pub async fn mastodon_account_id(&self) -> Result<String, AppError> {
        let account_id = self
            .mastodon_account_id
            .get_or_try_init(|| async {
                let account = self.mastodon().await?.verify_credentials().await?;
                tracing::debug!(
                    user_id = %self.user_id,
                    account_id = %account.id,
                    acct = %account.acct,
                    "Verified mastodon credentials"
                );
                Ok::<_, AppError>(account.id)
            })
            .await?;

        Ok(account_id.clone())
    }

    async fn identity(&self, provider: Provider) -> Result<Authorization, AppError> {
        self.db
            .get_primary_authorization(self.user_id, provider)
            .await?
            .ok_or_else(|| {
                AppError::Validation(format!(
                    "user {} has no {} identity",
                    self.user_id, provider
                ))
            })
    }
}
