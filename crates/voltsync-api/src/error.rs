use thiserror::Error;

/// Top-level error type for the `voltsync-api` crate.
///
/// Covers every failure mode of the vendor owner API: OAuth flows,
/// transport, vehicle queries, and command dispatch. `voltsync-core`
/// maps these into its own user-facing taxonomy.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// OAuth grant failed (wrong credentials, account locked, etc.)
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// The access token was rejected (HTTP 401). A refresh may resolve it.
    #[error("Unauthorized: access token rejected")]
    Unauthorized,

    // ── Vehicle availability ────────────────────────────────────────
    /// The vehicle is asleep or offline (HTTP 408). Expected and
    /// transient — callers decide whether to wake and retry.
    #[error("Vehicle {vehicle_id} is unreachable (asleep or offline)")]
    VehicleUnreachable { vehicle_id: String },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Rate limited by the vendor API. Includes retry-after in seconds.
    #[error("Rate limited -- retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    // ── API surface ─────────────────────────────────────────────────
    /// The API returned a non-success status outside the mapped set.
    #[error("API error (HTTP {status}): {message}")]
    Api { message: String, status: u16 },

    /// A command was accepted by the transport but the vehicle refused it
    /// (`{ response: { result: false, reason } }`).
    #[error("Command rejected by vehicle: {reason}")]
    CommandRejected { reason: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if the vehicle reported itself asleep/offline.
    pub fn is_unreachable(&self) -> bool {
        matches!(self, Self::VehicleUnreachable { .. })
    }

    /// Returns `true` if the credential was rejected and a token
    /// refresh might resolve it.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }

    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::VehicleUnreachable { .. } | Self::RateLimited { .. } => true,
            _ => false,
        }
    }
}
