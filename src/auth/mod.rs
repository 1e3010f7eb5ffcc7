//! OAuth2 authorization-code flow against the NetSuite token service
//!
//! Performs the interactive authorization leg once at startup (browser
//! redirect to a loopback listener), then hands out bearer tokens on
//! demand, refreshing them transparently when they expire.

pub mod manager;
pub mod redirect;
pub mod token;

pub use manager::{AuthorizationRequest, OAuthConfig, TokenLifecycleManager};
pub use redirect::{RedirectCapture, RedirectListener};
pub use token::TokenRecord;

use thiserror::Error;

/// Errors raised by the authorization flow and token refresh.
///
/// All of these are fatal to the current attempt: nothing here is retried
/// or swallowed, and a failed refresh leaves the manager unauthenticated.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The redirect listener could not bind its pre-registered port.
    #[error("redirect port {port} unavailable: {source}")]
    PortUnavailable {
        port: u16,
        source: std::io::Error,
    },

    /// No qualifying redirect arrived before the deadline.
    #[error("timed out waiting for the authorization redirect")]
    AuthorizationTimeout,

    /// The redirect's `state` did not match the one we issued.
    #[error("state mismatch in authorization redirect (possible CSRF)")]
    CsrfMismatch,

    /// The token endpoint answered non-2xx for a code or refresh grant.
    #[error("token endpoint returned HTTP {status}: {body}")]
    TokenExchange { status: u16, body: String },

    /// A 2xx token response that is not usable (missing `access_token`
    /// or not JSON at all).
    #[error("malformed token response: {0}")]
    MalformedResponse(String),

    /// A configured endpoint or redirect URI failed to parse.
    #[error("invalid URL in OAuth configuration: {0}")]
    InvalidUrl(String),

    /// `get_valid_token` called before the authorization flow completed,
    /// or after a failed refresh discarded the session.
    #[error("not authenticated; run the authorization flow first")]
    NotAuthenticated,

    /// Transport-level failure talking to the token endpoint.
    #[error("token endpoint request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// I/O failure on the redirect socket.
    #[error("redirect listener I/O error: {0}")]
    Io(#[from] std::io::Error),
}
