//! Twitter v1.1 REST client

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use serde::Deserialize;

use super::oauth1::{OAuth1Credentials, OAuth1Nonce, authorization_header};
use super::{RemoteStatus, TwitterApi, fetch_json};
use crate::error::AppError;

const USER_TIMELINE_PATH: &str = "/1.1/statuses/user_timeline.json";

/// Tweet as returned by the timeline endpoints
#[derive(Debug, Deserialize)]
struct Tweet {
    /// Tweet ids exceed what JSON numbers carry safely, so use the string form
    id_str: String,
}

/// Client acting on behalf of one Twitter user
pub struct TwitterClient {
    http: reqwest::Client,
    base_url: String,
    consumer_key: String,
    consumer_secret: String,
    token: String,
    token_secret: String,
}

impl TwitterClient {
    pub fn new(
        http: reqwest::Client,
        base_url: &str,
        consumer_key: &str,
        consumer_secret: &str,
        token: &str,
        token_secret: &str,
    ) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            consumer_key: consumer_key.to_string(),
            consumer_secret: consumer_secret.to_string(),
            token: token.to_string(),
            token_secret: token_secret.to_string(),
        }
    }

    fn credentials(&self) -> OAuth1Credentials<'_> {
        OAuth1Credentials {
            consumer_key: &self.consumer_key,
            consumer_secret: &self.consumer_secret,
            token: &self.token,
            token_secret: &self.token_secret,
        }
    }
}

#[async_trait]
impl TwitterApi for TwitterClient {
    async fn latest_status(&self) -> Result<Option<RemoteStatus>, AppError> {
        let url = format!("{}{}", self.base_url, USER_TIMELINE_PATH);
        let query = [("count", "1")];
        let header = authorization_header(
            "GET",
            &url,
            &query,
            &self.credentials(),
            &OAuth1Nonce::generate(),
        )?;

        let request = self
            .http
            .get(&url)
            .query(&query)
            .header(AUTHORIZATION, header);

        let timeline: Vec<Tweet> = fetch_json("twitter", "user_timeline", request).await?;

        Ok(timeline
            .into_iter()
            .next()
            .map(|tweet| RemoteStatus { id: tweet.id_str }))
    }
}
