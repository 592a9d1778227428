//! Test doubles for the social clients

use std::sync::{Arc, Mutex};

use super::{MastodonApi, MockMastodonApi, MockTwitterApi, SocialClients, TwitterApi};

/// Hands out preconfigured mocks and records how clients were built.
///
/// A provider without a configured mock gets one with no expectations, so
/// any call on it fails the test.
#[derive(Default)]
pub struct StubClients {
    twitter: Option<Arc<dyn TwitterApi>>,
    mastodon: Option<Arc<dyn MastodonApi>>,
    pub twitter_credentials: Mutex<Vec<(String, String)>>,
    pub mastodon_instances: Mutex<Vec<(String, String)>>,
}

impl StubClients {
    pub fn with_twitter(mut self, mock: MockTwitterApi) -> Self {
        self.twitter = Some(Arc::new(mock));
        self
    }

    pub fn with_mastodon(mut self, mock: MockMastodonApi) -> Self {
        self.mastodon = Some(Arc::new(mock));
        self
    }
}

impl SocialClients for StubClients {
    fn twitter(&self, token: &str, token_secret: &str) -> Arc<dyn TwitterApi> {
        self.twitter_credentials
            .lock()
            .unwrap()
            .push((token.to_string(), token_secret.to_string()));
        self.twitter
            .clone()
            .unwrap_or_else(|| Arc::new(MockTwitterApi::new()))
    }

    fn mastodon(&self, base_url: &str, token: &str) -> Arc<dyn MastodonApi> {
        self.mastodon_instances
            .lock()
            .unwrap()
            .push((base_url.to_string(), token.to_string()));
        self.mastodon
            .clone()
            .unwrap_or_else(|| Arc::new(MockMastodonApi::new()))
    }
}
