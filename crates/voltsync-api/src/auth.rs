use chrono::{DateTime, Duration, TimeZone, Utc};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

/// Account credentials for the OAuth password grant.
///
/// The password is wrapped in [`SecretString`] so it never appears in
/// debug output or serialized config dumps.
#[derive(Debug, Clone)]
pub struct AccountCredentials {
    pub email: String,
    pub password: SecretString,
}

/// An OAuth token pair as returned by the vendor token endpoint.
///
/// `created_at` and `expires_in` are epoch seconds / seconds, exactly as
/// the wire format carries them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenSet {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub created_at: i64,
    pub expires_in: i64,
}

impl TokenSet {
    /// The instant this token expires.
    pub fn expires_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.created_at + self.expires_in, 0)
            .single()
            .unwrap_or_else(Utc::now)
    }

    /// Returns `true` if the token expires within `window` of `now`
    /// (or has already expired).
    pub fn expires_within(&self, now: DateTime<Utc>, window: Duration) -> bool {
        now + window > self.expires_at()
    }

    /// Returns `true` if every required field is present and non-empty.
    ///
    /// A token set loaded from durable storage may be truncated or from
    /// an older format; an incomplete set is treated as absent.
    pub fn is_complete(&self) -> bool {
        !self.access_token.is_empty()
            && !self.refresh_token.is_empty()
            && !self.token_type.is_empty()
            && self.created_at > 0
            && self.expires_in > 0
    }
}
