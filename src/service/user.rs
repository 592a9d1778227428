//! User service
//!
//! Primary identity lookups, posting preferences and the one-time
//! "last seen post" bootstrap.

use std::sync::Arc;

use super::clients::UserClients;
use crate::data::{Authorization, Database, Provider, User, UserOptionsPatch};
use crate::error::AppError;
use crate::metrics::BOOTSTRAPS_TOTAL;
use crate::social::{RemoteStatus, SocialClients};

/// User service
#[derive(Clone)]
pub struct UserService {
    db: Arc<Database>,
    clients: Arc<dyn SocialClients>,
}

impl UserService {
    /// Create new user service
    pub fn new(db: Arc<Database>, clients: Arc<dyn SocialClients>) -> Self {
        Self { db, clients }
    }

    /// Get a user by ID
    pub async fn get_user(&self, id: &str) -> Result<User, AppError> {
        self.db.get_user(id).await?.ok_or(AppError::NotFound)
    }

    /// The link used for the user's Twitter API calls
    pub async fn twitter_identity(&self, user: &User) -> Result<Option<Authorization>, AppError> {
        self.db
            .get_primary_authorization(&user.id, Provider::Twitter)
            .await
    }

    /// The link used for the user's Mastodon API calls
    pub async fn mastodon_identity(&self, user: &User) -> Result<Option<Authorization>, AppError> {
        self.db
            .get_primary_authorization(&user.id, Provider::Mastodon)
            .await
    }

    /// Every link the user owns, oldest first
    pub async fn identities(&self, user: &User) -> Result<Vec<Authorization>, AppError> {
        self.db.get_authorizations_for_user(&user.id).await
    }

    /// Update posting preference options
    ///
    /// An empty patch returns the user unchanged.
    pub async fn update_options(
        &self,
        user_id: &str,
        patch: &UserOptionsPatch,
    ) -> Result<User, AppError> {
        let mut user = self.get_user(user_id).await?;
        if patch.is_empty() {
            return Ok(user);
        }

        let updated_at = chrono::Utc::now();
        if !self
            .db
            .update_user_options(user_id, patch, updated_at)
            .await?
        {
            return Err(AppError::NotFound);
        }

        patch.apply(&mut user);
        user.updated_at = updated_at;
        tracing::info!(user_id = %user.id, "Posting options updated");

        Ok(user)
    }

    /// Record the newest tweet id unless one is already stored.
    ///
    /// An empty timeline stores nothing and is not an error.
    pub async fn save_last_tweet_id(&self, user: &mut User) -> Result<(), AppError> {
        if user.last_tweet.is_some() {
            BOOTSTRAPS_TOTAL
                .with_label_values(&[Provider::Twitter.as_str(), "skipped"])
                .inc();
            return Ok(());
        }

        let clients = UserClients::new(&self.db, self.clients.as_ref(), &user.id);
        let latest = clients.twitter().await?.latest_status().await;
        let latest = self.observe_fetch(Provider::Twitter, latest)?;

        self.record_last_post(user, Provider::Twitter, latest).await
    }

    /// Record the newest toot id unless one is already stored.
    ///
    /// An empty status list stores nothing and is not an error.
    pub async fn save_last_toot_id(&self, user: &mut User) -> Result<(), AppError> {
        if user.last_toot.is_some() {
            BOOTSTRAPS_TOTAL
                .with_label_values(&[Provider::Mastodon.as_str(), "skipped"])
                .inc();
            return Ok(());
        }

        let clients = UserClients::new(&self.db, self.clients.as_ref(), &user.id);
        let latest = async {
            let account_id = clients.mastodon_account_id().await?;
            clients.mastodon().await?.latest_status(&account_id).await
        }
        .await;
        let latest = self.observe_fetch(Provider::Mastodon, latest)?;

        self.record_last_post(user, Provider::Mastodon, latest).await
    }

    fn observe_fetch(
        &self,
        provider: Provider,
        result: Result<Option<RemoteStatus>, AppError>,
    ) -> Result<Option<RemoteStatus>, AppError> {
        if let Err(error) = &result {
            BOOTSTRAPS_TOTAL
                .with_label_values(&[provider.as_str(), "error"])
                .inc();
            tracing::warn!(provider = %provider, %error, "Fetching latest post failed");
        }
        result
    }

    async fn record_last_post(
        &self,
        user: &mut User,
        provider: Provider,
        latest: Option<RemoteStatus>,
    ) -> Result<(), AppError> {
        let Some(status) = latest else {
            BOOTSTRAPS_TOTAL
                .with_label_values(&[provider.as_str(), "empty"])
                .inc();
            tracing::debug!(user_id = %user.id, provider = %provider, "No posts to bootstrap from");
            return Ok(());
        };

        let stored = self
            .db
            .set_last_post_id_if_unset(&user.id, provider, &status.id)
            .await?;

        if stored {
            match provider {
                Provider::Twitter => user.last_tweet = Some(status.id.clone()),
                Provider::Mastodon => user.last_toot = Some(status.id.clone()),
            }
            BOOTSTRAPS_TOTAL
                .with_label_values(&[provider.as_str(), "stored"])
                .inc();
            tracing::info!(
                user_id = %user.id,
                provider = %provider,
                post_id = %status.id,
                "Recorded last seen post"
            );
        } else if let Some(current) = self.db.get_user(&user.id).await? {
            // Another bootstrap won the race; keep its value.
            *user = current;
            BOOTSTRAPS_TOTAL
                .with_label_values(&[provider.as_str(), "skipped"])
                .inc();
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::BoostOption;
    use crate::social::testing::StubClients;
    use crate::social::{MastodonAccount, MockMastodonApi, MockTwitterApi};
    use tempfile::TempDir;

    async fn setup(clients: StubClients) -> (UserService, Arc<Database>, Arc<StubClients>, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db = Arc::new(Database::connect(&temp_dir.path().join("test.db")).await.unwrap());
        let clients = Arc::new(clients);
        let service = UserService::new(db.clone(), clients.clone());
        (service, db, clients, temp_dir)
    }

    async fn user_with_link(db: &Database, provider: Provider, uid: &str) -> User {
        let user = User::new();
        let mut link = Authorization::new(provider, uid, &user.id);
        link.token = "access-token".to_string();
        link.secret = Some("access-secret".to_string());
        db.save_authorization(&link, Some(&user)).await.unwrap();
        user
    }

    #[tokio::test]
    async fn tweet_bootstrap_uses_primary_twitter_credentials() {
        let mut twitter = MockTwitterApi::new();
        twitter.expect_latest_status().times(1).returning(|| {
            Ok(Some(RemoteStatus {
                id: "12345".to_string(),
            }))
        });
        let (service, db, clients, _temp_dir) = setup(StubClients::default().with_twitter(twitter)).await;
        let mut user = user_with_link(&db, Provider::Twitter, "1001").await;

        service.save_last_tweet_id(&mut user).await.unwrap();

        assert_eq!(user.last_tweet.as_deref(), Some("12345"));
        assert_eq!(
            db.get_user(&user.id).await.unwrap().unwrap().last_tweet.as_deref(),
            Some("12345")
        );
        assert_eq!(
            clients.twitter_credentials.lock().unwrap().as_slice(),
            &[("access-token".to_string(), "access-secret".to_string())]
        );
    }

    #[tokio::test]
    async fn toot_bootstrap_verifies_account_on_derived_instance() {
        let mut mastodon = MockMastodonApi::new();
        mastodon.expect_verify_credentials().times(1).returning(|| {
            Ok(MastodonAccount {
                id: "42".to_string(),
                acct: "alice".to_string(),
            })
        });
        mastodon
            .expect_latest_status()
            .times(1)
            .returning(|account_id: &str| {
                assert_eq!(account_id, "42");
                Ok(Some(RemoteStatus {
                    id: "109876".to_string(),
                }))
            });
        let (service, db, clients, _temp_dir) =
            setup(StubClients::default().with_mastodon(mastodon)).await;
        let mut user = user_with_link(&db, Provider::Mastodon, "alice@mastodon.example").await;

        service.save_last_toot_id(&mut user).await.unwrap();

        assert_eq!(user.last_toot.as_deref(), Some("109876"));
        assert_eq!(
            clients.mastodon_instances.lock().unwrap().as_slice(),
            &[(
                "https://mastodon.example".to_string(),
                "access-token".to_string()
            )]
        );
    }

    #[tokio::test]
    async fn bootstrap_is_skipped_when_id_already_known() {
        // No expectations: any upstream call fails the test
        let (service, db, clients, _temp_dir) = setup(StubClients::default()).await;
        let mut user = user_with_link(&db, Provider::Twitter, "1001").await;
        user.last_tweet = Some("1".to_string());

        service.save_last_tweet_id(&mut user).await.unwrap();

        assert_eq!(user.last_tweet.as_deref(), Some("1"));
        assert!(clients.twitter_credentials.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_timeline_stores_nothing() {
        let mut twitter = MockTwitterApi::new();
        twitter.expect_latest_status().times(1).returning(|| Ok(None));
        let (service, db, _clients, _temp_dir) =
            setup(StubClients::default().with_twitter(twitter)).await;
        let mut user = user_with_link(&db, Provider::Twitter, "1001").await;

        service.save_last_tweet_id(&mut user).await.unwrap();

        assert!(user.last_tweet.is_none());
        assert!(db.get_user(&user.id).await.unwrap().unwrap().last_tweet.is_none());
    }

    #[tokio::test]
    async fn stale_in_memory_user_keeps_stored_id() {
        let mut twitter = MockTwitterApi::new();
        twitter.expect_latest_status().times(1).returning(|| {
            Ok(Some(RemoteStatus {
                id: "999".to_string(),
            }))
        });
        let (service, db, _clients, _temp_dir) =
            setup(StubClients::default().with_twitter(twitter)).await;
        let mut user = user_with_link(&db, Provider::Twitter, "1001").await;
        db.set_last_post_id_if_unset(&user.id, Provider::Twitter, "111")
            .await
            .unwrap();

        service.save_last_tweet_id(&mut user).await.unwrap();

        assert_eq!(user.last_tweet.as_deref(), Some("111"));
    }

    #[tokio::test]
    async fn upstream_failure_propagates() {
        let mut twitter = MockTwitterApi::new();
        twitter
            .expect_latest_status()
            .times(1)
            .returning(|| Err(AppError::Upstream("twitter returned 401".to_string())));
        let (service, db, _clients, _temp_dir) =
            setup(StubClients::default().with_twitter(twitter)).await;
        let mut user = user_with_link(&db, Provider::Twitter, "1001").await;

        let error = service.save_last_tweet_id(&mut user).await.unwrap_err();
        assert!(matches!(error, AppError::Upstream(_)));
    }

    #[tokio::test]
    async fn bootstrap_without_identity_is_a_validation_error() {
        let (service, db, _clients, _temp_dir) = setup(StubClients::default()).await;
        let mut user = User::new();
        db.insert_user(&user).await.unwrap();

        let error = service.save_last_toot_id(&mut user).await.unwrap_err();
        assert!(matches!(error, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn update_options_persists_patch() {
        let (service, db, _clients, _temp_dir) = setup(StubClients::default()).await;
        let user = User::new();
        db.insert_user(&user).await.unwrap();

        let patch = UserOptionsPatch {
            boost_options: Some(Some(BoostOption::MastoBoostPostAsLink)),
            ..Default::default()
        };
        let updated = service.update_options(&user.id, &patch).await.unwrap();
        assert_eq!(updated.boost_options, Some(BoostOption::MastoBoostPostAsLink));

        let stored = service.get_user(&user.id).await.unwrap();
        assert_eq!(stored.boost_options, Some(BoostOption::MastoBoostPostAsLink));

        assert!(matches!(
            service.update_options("missing", &patch).await,
            Err(AppError::NotFound)
        ));
    }
}
