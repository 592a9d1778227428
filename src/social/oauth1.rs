//! OAuth 1.0a request signing (HMAC-SHA1)
//!
//! Twitter's v1.1 REST API authenticates every request with a signature over
//! the method, URL and parameters, keyed by the consumer and token secrets.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use hmac::{Hmac, Mac};
use rand::Rng;
use rand::distributions::Alphanumeric;
use sha1::Sha1;

use crate::error::AppError;

type HmacSha1 = Hmac<Sha1>;

/// Consumer and access credentials used to sign a request
#[derive(Clone)]
pub struct OAuth1Credentials<'a> {
    pub consumer_key: &'a str,
    pub consumer_secret: &'a str,
    pub token: &'a str,
    pub token_secret: &'a str,
}

/// Per-request values that make a signature unique
#[derive(Debug, Clone)]
pub struct OAuth1Nonce {
    pub nonce: String,
    pub timestamp: i64,
}

impl OAuth1Nonce {
    pub fn generate() -> Self {
        let nonce = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(32)
            .map(char::from)
            .collect();

        Self {
            nonce,
            timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

fn percent_encode(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

/// Compute the base64 HMAC-SHA1 signature of a request.
///
/// `params` holds every query and form parameter of the request together
/// with the `oauth_*` protocol parameters, unencoded.
pub fn sign(
    method: &str,
    base_url: &str,
    params: &[(&str, &str)],
    consumer_secret: &str,
    token_secret: &str,
) -> Result<String, AppError> {
    let mut encoded: Vec<(String, String)> = params
        .iter()
        .map(|(key, value)| (percent_encode(key), percent_encode(value)))
        .collect();
    encoded.sort();

    let parameter_string = encoded
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&");

    let base_string = format!(
        "{}&{}&{}",
        method.to_ascii_uppercase(),
        percent_encode(base_url),
        percent_encode(&parameter_string)
    );
    let signing_key = format!(
        "{}&{}",
        percent_encode(consumer_secret),
        percent_encode(token_secret)
    );

    let mut mac = HmacSha1::new_from_slice(signing_key.as_bytes())
        .map_err(|e| AppError::Internal(anyhow::anyhow!("invalid HMAC key: {e}")))?;
    mac.update(base_string.as_bytes());

    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

/// Build the `Authorization: OAuth ...` header value for a request.
///
/// `query` must contain every query parameter that will be sent, since they
/// are covered by the signature.
pub fn authorization_header(
    method: &str,
    base_url: &str,
    query: &[(&str, &str)],
    credentials: &OAuth1Credentials<'_>,
    nonce: &OAuth1Nonce,
) -> Result<String, AppError> {
    let timestamp = nonce.timestamp.to_string();
    let oauth_params = [
        ("oauth_consumer_key", credentials.consumer_key),
        ("oauth_nonce", nonce.nonce.as_str()),
        ("oauth_signature_method", "HMAC-SHA1"),
        ("oauth_timestamp", timestamp.as_str()),
        ("oauth_token", credentials.token),
        ("oauth_version", "1.0"),
    ];

    let mut all_params: Vec<(&str, &str)> = query.to_vec();
    all_params.extend_from_slice(&oauth_params);

    let signature = sign(
        method,
        base_url,
        &all_params,
        credentials.consumer_secret,
        credentials.token_secret,
    )?;

    let header = oauth_params
        .iter()
        .copied()
        .chain(std::iter::once(("oauth_signature", signature.as_str())))
        .map(|(key, value)| format!("{}=\"{}\"", percent_encode(key), percent_encode(value)))
        .collect::<Vec<_>>()
        .join(", ");

    Ok(format!("OAuth {header}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    // Reference request from Twitter's "Creating a signature" guide.
    const CONSUMER_KEY: &str = "xvz1evFS4wEEPTGEFPHBog";
    const CONSUMER_SECRET: &str = "kAcSOqF21Fu85e7zjz7ZN2U4ZRhfV3WpwPAoE3Z7kBw";
    const TOKEN: &str = "370773112-GmHxMAgYyLbNEtIKZeRNFsMKPR9EyMZeS9weJAEb";
    const TOKEN_SECRET: &str = "LswwdoUaIvS8ltyTt5jkRh4J50vUPVVHtR2YPi5kE";
    const NONCE: &str = "kYjzVBB8Y0ZFabxSWbWovY3uYSQ2pTgmZeNu2VS4cg";
    const TIMESTAMP: &str = "1318622958";

    #[test]
    fn signature_matches_reference_vector() {
        let params = [
            ("status", "Hello Ladies + Gentlemen, a signed OAuth request!"),
            ("include_entities", "true"),
            ("oauth_consumer_key", CONSUMER_KEY),
            ("oauth_nonce", NONCE),
            ("oauth_signature_method", "HMAC-SHA1"),
            ("oauth_timestamp", TIMESTAMP),
            ("oauth_token", TOKEN),
            ("oauth_version", "1.0"),
        ];

        let signature = sign(
            "POST",
            "https://api.twitter.com/1.1/statuses/update.json",
            &params,
            CONSUMER_SECRET,
            TOKEN_SECRET,
        )
        .unwrap();

        assert_eq!(signature, "hCtSmYh+iHYCEqBWrE7C7hYmtUk=");
    }

    #[test]
    fn header_carries_protocol_parameters() {
        let credentials = OAuth1Credentials {
            consumer_key: CONSUMER_KEY,
            consumer_secret: CONSUMER_SECRET,
            token: TOKEN,
            token_secret: TOKEN_SECRET,
        };
        let nonce = OAuth1Nonce {
            nonce: NONCE.to_string(),
            timestamp: 1318622958,
        };

        let header = authorization_header(
            "GET",
            "https://api.twitter.com/1.1/statuses/user_timeline.json",
            &[("count", "1")],
            &credentials,
            &nonce,
        )
        .unwrap();

        assert!(header.starts_with("OAuth "));
        assert!(header.contains(&format!("oauth_consumer_key=\"{CONSUMER_KEY}\"")));
        assert!(header.contains("oauth_signature_method=\"HMAC-SHA1\""));
        assert!(header.contains("oauth_timestamp=\"1318622958\""));
        assert!(header.contains("oauth_signature=\""));
        // Query parameters are signed but not repeated in the header
        assert!(!header.contains("count="));
    }

    #[test]
    fn generated_nonces_differ() {
        let first = OAuth1Nonce::generate();
        let second = OAuth1Nonce::generate();
        assert_eq!(first.nonce.len(), 32);
        assert_ne!(first.nonce, second.nonce);
    }
}
