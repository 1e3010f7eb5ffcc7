//! Token lifecycle: one interactive authorization leg, then refresh on demand
//!
//! The manager owns the only mutable token state in the process. The
//! interactive leg is strictly sequential (nothing else can run without a
//! bearer token); afterwards concurrent chat handlers all go through
//! [`TokenLifecycleManager::get_valid_token`], which serializes refreshes.

use std::time::Duration;

use oauth2::basic::BasicClient;
use oauth2::{AuthUrl, ClientId, ClientSecret, CsrfToken, RedirectUrl, Scope};
use tokio::sync::Mutex;
use url::Url;

use super::redirect::{RedirectCapture, RedirectListener};
use super::token::{unix_now, TokenRecord, TokenResponse};
use super::AuthError;

/// Client credentials and endpoints for the authorization-code flow.
///
/// Every field is required; see `config` for how they are sourced.
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub auth_url: String,
    pub token_url: String,
    pub scope: String,
}

/// Ephemeral value for one authorization attempt.
///
/// Created immediately before the browser is pointed at `url`; the `state`
/// nonce must round-trip unchanged through the redirect, and the whole
/// request is consumed by [`TokenLifecycleManager::complete_authorization`].
pub struct AuthorizationRequest {
    /// Full provider authorization URL to open in a browser.
    pub url: Url,
    state: CsrfToken,
}

impl AuthorizationRequest {
    /// The CSRF state nonce embedded in the authorization URL.
    pub fn state(&self) -> &str {
        self.state.secret()
    }
}

/// Owns the bearer credential used for every ERP call.
pub struct TokenLifecycleManager {
    http: reqwest::Client,
    oauth: OAuthConfig,
    /// Guards the check-expiry/refresh/replace sequence. Held across the
    /// refresh await, which is what makes the refresh single-flight.
    record: Mutex<Option<TokenRecord>>,
}

impl TokenLifecycleManager {
    pub fn new(oauth: OAuthConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            oauth,
            record: Mutex::new(None),
        }
    }

    /// Build the provider authorization URL with a fresh CSRF state nonce.
    pub fn begin_authorization(&self) -> Result<AuthorizationRequest, AuthError> {
        let client = BasicClient::new(
            ClientId::new(self.oauth.client_id.clone()),
            Some(ClientSecret::new(self.oauth.client_secret.clone())),
            AuthUrl::new(self.oauth.auth_url.clone())
                .map_err(|e| AuthError::InvalidUrl(e.to_string()))?,
            None,
        )
        .set_redirect_uri(
            RedirectUrl::new(self.oauth.redirect_uri.clone())
                .map_err(|e| AuthError::InvalidUrl(e.to_string()))?,
        );

        let (url, state) = client
            .authorize_url(CsrfToken::new_random)
            .add_scope(Scope::new(self.oauth.scope.clone()))
            .url();

        Ok(AuthorizationRequest { url, state })
    }

    /// Run the full interactive leg: print the provider URL for the user's
    /// browser, wait for the redirect, exchange the code. Blocks until
    /// resolved or `deadline` elapses. Exactly one redirect listener is
    /// active for the duration.
    pub async fn authorize(
        &self,
        deadline: Option<Duration>,
    ) -> Result<TokenRecord, AuthError> {
        let request = self.begin_authorization()?;
        let port = redirect_port(&self.oauth.redirect_uri)?;
        let listener = RedirectListener::bind(port).await?;

        println!();
        println!("To sign in, visit:");
        println!("  {}", request.url);
        println!();
        tracing::info!("Waiting for authorization redirect on port {}...", port);

        let capture = listener.await_redirect(deadline).await?;
        self.complete_authorization(request, capture).await
    }

    /// Validate the redirect against the originating request, then exchange
    /// the authorization code for the initial token record.
    ///
    /// A state mismatch aborts before any request reaches the token
    /// endpoint.
    pub async fn complete_authorization(
        &self,
        request: AuthorizationRequest,
        capture: RedirectCapture,
    ) -> Result<TokenRecord, AuthError> {
        if capture.state != request.state() {
            return Err(AuthError::CsrfMismatch);
        }

        tracing::info!("Exchanging authorization code...");
        let params = [
            ("grant_type", "authorization_code"),
            ("code", capture.code.as_str()),
            ("redirect_uri", self.oauth.redirect_uri.as_str()),
        ];
        let record = self.token_request(&params, None).await?;
        *self.record.lock().await = Some(record.clone());
        Ok(record)
    }

    /// Return a currently-valid token record, refreshing at most once.
    ///
    /// Unexpired: the stored record is returned as-is, zero network calls.
    /// Expired: a refresh grant replaces it wholesale. The lock is held
    /// across the refresh so concurrent callers that all observe an expired
    /// record converge on a single refresh call and the same replacement
    /// record. A failed refresh discards the stored record; the caller must
    /// restart the authorization flow.
    pub async fn get_valid_token(&self) -> Result<TokenRecord, AuthError> {
        let mut guard = self.record.lock().await;
        let current = guard.clone().ok_or(AuthError::NotAuthenticated)?;
        if !current.is_expired(unix_now()) {
            return Ok(current);
        }

        tracing::info!("Access token expired, refreshing...");
        *guard = None;
        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", current.refresh_token.as_str()),
        ];
        let refreshed = self
            .token_request(&params, Some(&current.refresh_token))
            .await?;
        *guard = Some(refreshed.clone());
        Ok(refreshed)
    }

    /// POST a grant to the token endpoint with HTTP Basic client
    /// credentials and classify the outcome.
    ///
    /// `prior_refresh` is retained when a refresh response does not rotate
    /// the refresh token.
    async fn token_request(
        &self,
        params: &[(&str, &str)],
        prior_refresh: Option<&str>,
    ) -> Result<TokenRecord, AuthError> {
        let response = self
            .http
            .post(&self.oauth.token_url)
            .basic_auth(&self.oauth.client_id, Some(&self.oauth.client_secret))
            .form(params)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(AuthError::TokenExchange {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: TokenResponse = serde_json::from_str(&body)
            .map_err(|_| AuthError::MalformedResponse(body.clone()))?;
        let access_token = parsed
            .access_token
            .ok_or_else(|| AuthError::MalformedResponse(body.clone()))?;
        let refresh_token = parsed
            .refresh_token
            .or_else(|| prior_refresh.map(str::to_string))
            .ok_or_else(|| AuthError::MalformedResponse(body))?;

        Ok(TokenRecord::new(
            access_token,
            refresh_token,
            parsed.expires_in,
            unix_now(),
        ))
    }

    #[cfg(test)]
    pub(crate) async fn install_record(&self, record: TokenRecord) {
        *self.record.lock().await = Some(record);
    }
}

/// Port the redirect URI commits us to listening on.
fn redirect_port(redirect_uri: &str) -> Result<u16, AuthError> {
    let url =
        Url::parse(redirect_uri).map_err(|e| AuthError::InvalidUrl(e.to_string()))?;
    url.port_or_known_default()
        .ok_or_else(|| AuthError::InvalidUrl(format!("no port in {}", redirect_uri)))
}
