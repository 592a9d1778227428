//! Twitter and Mastodon REST collaborators
//!
//! The service only needs three upstream calls: the newest tweet of the
//! authenticated user, the authenticated Mastodon account, and that
//! account's newest status. Each sits behind a trait so the linker can be
//! exercised without the network.

mod mastodon;
pub mod oauth1;
#[cfg(test)]
pub mod testing;
mod twitter;

pub use mastodon::{MastodonClient, mastodon_base_url};
pub use twitter::TwitterClient;

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::config::AppConfig;
use crate::error::AppError;

/// A post as far as this service cares about it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteStatus {
    pub id: String,
}

/// Account returned by Mastodon's `verify_credentials`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MastodonAccount {
    pub id: String,
    #[serde(default)]
    pub acct: String,
}

/// Twitter REST API, bound to one user's access token
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TwitterApi: Send + Sync {
    /// Newest entry of the authenticated user's timeline
    async fn latest_status(&self) -> Result<Option<RemoteStatus>, AppError>;
}

/// Mastodon REST API, bound to one instance and access token
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MastodonApi: Send + Sync {
    /// The account the access token belongs to
    async fn verify_credentials(&self) -> Result<MastodonAccount, AppError>;

    /// Newest status posted by `account_id`
    async fn latest_status(&self, account_id: &str) -> Result<Option<RemoteStatus>, AppError>;
}

/// Builds API clients for one user's credentials
pub trait SocialClients: Send + Sync {
    fn twitter(&self, token: &str, token_secret: &str) -> Arc<dyn TwitterApi>;

    fn mastodon(&self, base_url: &str, token: &str) -> Arc<dyn MastodonApi>;
}

/// `SocialClients` backed by a shared `reqwest` client
#[derive(Clone)]
pub struct HttpSocialClients {
    http: reqwest::Client,
    twitter_consumer_key: String,
    twitter_consumer_secret: String,
    twitter_api_base_url: String,
}

impl HttpSocialClients {
    /// Create the factory from configuration
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be built
    pub fn new(config: &AppConfig) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .user_agent(config.http.user_agent.clone())
            .timeout(std::time::Duration::from_secs(config.http.timeout_seconds))
            .build()
            .map_err(|e| AppError::Internal(e.into()))?;

        Ok(Self {
            http,
            twitter_consumer_key: config.twitter.client_id.clone(),
            twitter_consumer_secret: config.twitter.client_secret.clone(),
            twitter_api_base_url: config.twitter.api_base_url.clone(),
        })
    }
}

impl SocialClients for HttpSocialClients {
    fn twitter(&self, token: &str, token_secret: &str) -> Arc<dyn TwitterApi> {
        Arc::new(TwitterClient::new(
            self.http.clone(),
            &self.twitter_api_base_url,
            &self.twitter_consumer_key,
            &self.twitter_consumer_secret,
            token,
            token_secret,
        ))
    }

    fn mastodon(&self, base_url: &str, token: &str) -> Arc<dyn MastodonApi> {
        Arc::new(MastodonClient::new(self.http.clone(), base_url, token))
    }
}

/// Send a prepared request and decode its JSON body.
///
/// Non-success statuses become `AppError::Upstream`; every call is
/// recorded in the upstream metrics.
async fn fetch_json<T: DeserializeOwned>(
    provider: &'static str,
    endpoint: &'static str,
    request: reqwest::RequestBuilder,
) -> Result<T, AppError> {
    let started = Instant::now();

    let response = match request.send().await {
        Ok(response) => response,
        Err(error) => {
            crate::metrics::observe_upstream(provider, endpoint, "error", started.elapsed());
            tracing::warn!(provider, endpoint, %error, "Upstream request failed");
            return Err(error.into());
        }
    };

    let status = response.status();
    crate::metrics::observe_upstream(provider, endpoint, status.as_str(), started.elapsed());

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        tracing::warn!(provider, endpoint, status = %status, "Upstream returned error status");
        return Err(AppError::Upstream(format!(
            "{provider} {endpoint} returned {status}: {}",
            body.chars().take(200).collect::<String>()
        )));
    }

    Ok(response.json::<T>().await?)
}
