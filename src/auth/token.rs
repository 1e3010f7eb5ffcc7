//! Token record and expiry arithmetic

use serde::Deserialize;
use std::time::{SystemTime, UNIX_EPOCH};

/// Validity assumed when the provider omits `expires_in`.
///
/// NetSuite normally returns 3600; the same value is used as a lenient
/// default rather than failing on its absence.
pub const DEFAULT_EXPIRES_IN: u64 = 3600;

/// Wire shape of a 2xx response from the token endpoint.
///
/// `access_token` is optional here only so a 2xx body without one can be
/// reported as a malformed response instead of a bare deserialize error.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub expires_in: Option<u64>,
}

/// Bearer credential owned by the token lifecycle manager.
///
/// Created by a successful code exchange and replaced wholesale by a
/// successful refresh; never partially updated. Callers only ever read
/// `access_token` from whatever record the manager hands out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenRecord {
    pub access_token: String,
    pub refresh_token: String,
    /// Absolute unix timestamp, computed once at the moment the token
    /// response was received.
    pub expires_at: u64,
}

impl TokenRecord {
    /// Build a record from token response fields received at `now`
    /// (unix seconds). `expires_in` defaults to one hour when absent.
    pub fn new(
        access_token: String,
        refresh_token: String,
        expires_in: Option<u64>,
        now: u64,
    ) -> Self {
        Self {
            access_token,
            refresh_token,
            expires_at: now + expires_in.unwrap_or(DEFAULT_EXPIRES_IN),
        }
    }

    /// Strictly past the expiry instant; `now == expires_at` still counts
    /// as valid.
    pub fn is_expired(&self, now: u64) -> bool {
        now > self.expires_at
    }
}

/// Current unix time in whole seconds.
pub(crate) fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expires_at_is_receipt_time_plus_expires_in() {
        let record = TokenRecord::new("A1".into(), "R1".into(), Some(3600), 1000);
        assert_eq!(record.expires_at, 4600);
    }

    #[test]
    fn missing_expires_in_defaults_to_one_hour() {
        let record = TokenRecord::new("A1".into(), "R1".into(), None, 1000);
        assert_eq!(record.expires_at, 1000 + DEFAULT_EXPIRES_IN);
    }

    #[test]
    fn expiry_boundary_is_strict() {
        let record = TokenRecord::new("A1".into(), "R1".into(), Some(1), 1000);
        assert_eq!(record.expires_at, 1001);
        assert!(!record.is_expired(1001));
        assert!(record.is_expired(1002));
    }

    #[test]
    fn token_response_tolerates_absent_fields() {
        let parsed: TokenResponse =
            serde_json::from_str(r#"{"access_token":"A1","token_type":"Bearer"}"#).unwrap();
        assert_eq!(parsed.access_token.as_deref(), Some("A1"));
        assert!(parsed.refresh_token.is_none());
        assert!(parsed.expires_in.is_none());
    }
}
