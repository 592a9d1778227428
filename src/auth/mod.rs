//! API authentication
//!
//! The HTTP API is called by the web front end that runs the OAuth
//! handshakes, never by browsers directly. Requests carry the shared
//! `auth.api_token` as a bearer token.

mod middleware;

pub use middleware::require_api_token;
