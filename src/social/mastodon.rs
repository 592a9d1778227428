//! Mastodon REST client

use async_trait::async_trait;
use serde::Deserialize;

use super::{MastodonAccount, MastodonApi, RemoteStatus, fetch_json};
use crate::error::AppError;

#[derive(Debug, Deserialize)]
struct Status {
    id: String,
}

/// Instance URL for a Mastodon identity uid.
///
/// Uids have the form `localpart@host`; the instance is `https://{host}`.
///
/// # Errors
/// Returns `AppError::Validation` when the uid has no usable host part
pub fn mastodon_base_url(uid: &str) -> Result<String, AppError> {
    let host = uid
        .rsplit_once('@')
        .map(|(_, host)| host.trim())
        .filter(|host| !host.is_empty())
        .ok_or_else(|| {
            AppError::Validation(format!("mastodon uid must look like user@host: {uid}"))
        })?;

    let base_url = format!("https://{host}");
    let parsed = url::Url::parse(&base_url)
        .map_err(|e| AppError::Validation(format!("invalid mastodon host {host}: {e}")))?;
    if parsed.host_str().is_none()
        || parsed.path() != "/"
        || parsed.query().is_some()
        || parsed.fragment().is_some()
        || !parsed.username().is_empty()
        || parsed.password().is_some()
    {
        return Err(AppError::Validation(format!(
            "invalid mastodon host: {host}"
        )));
    }

    Ok(base_url)
}

/// Client bound to one instance and one bearer token
pub struct MastodonClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl MastodonClient {
    pub fn new(http: reqwest::Client, base_url: &str, token: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }
}

#[async_trait]
impl MastodonApi for MastodonClient {
    async fn verify_credentials(&self) -> Result<MastodonAccount, AppError> {
        let request = self
            .http
            .get(format!(
                "{}/api/v1/accounts/verify_credentials",
                self.base_url
            ))
            .bearer_auth(&self.token);

        fetch_json("mastodon", "verify_credentials", request).await
    }

    async fn latest_status(&self, account_id: &str) -> Result<Option<RemoteStatus>, AppError> {
        let request = self
            .http
            .get(format!(
                "{}/api/v1/accounts/{}/statuses",
                self.base_url,
                urlencoding::encode(account_id)
            ))
            .query(&[("limit", "1")])
            .bearer_auth(&self.token);

        let statuses: Vec<Status> = fetch_json("mastodon", "account_statuses", request).await?;

        Ok(statuses
            .into_iter()
            .next()
            .map(|status| RemoteStatus { id: status.id }))
    }
}
