// ── Core error types ──
//
// User-facing errors from voltsync-core. These are NOT transport
// errors -- consumers never see HTTP status codes directly. The
// `From<voltsync_api::Error>` impl translates the wire taxonomy into
// domain-appropriate variants.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Availability ─────────────────────────────────────────────────
    /// The vehicle is asleep or offline and the active policy chose not
    /// to (or failed to) wake it. Expected during passive polling.
    #[error("Vehicle {vehicle} is unreachable")]
    Unreachable { vehicle: String },

    /// Credentials rejected even after a forced refresh. Requires
    /// operator action (re-enter account credentials).
    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    // ── Scheduling ───────────────────────────────────────────────────
    /// Another synchronization for the same vehicle is still in flight
    /// and the bounded wait expired. Treated as "skip this tick".
    #[error("Sync already in flight for vehicle {vehicle}")]
    LockTimeout { vehicle: String },

    // ── Data errors ──────────────────────────────────────────────────
    /// The fetched snapshot is missing a sub-object a partition needs.
    /// Partition-local: previous values are preserved.
    #[error("Snapshot missing data for partition '{partition}'")]
    MalformedResponse { partition: &'static str },

    #[error("Vehicle not found: {address}")]
    VehicleNotFound { address: String },

    // ── Command errors ───────────────────────────────────────────────
    /// The command's category is switched off in configuration.
    #[error("Command category '{category}' is disabled")]
    CommandDisabled { category: &'static str },

    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("Command rejected by vehicle: {reason}")]
    CommandRejected { reason: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("API error: {message}")]
    Api {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    // ── Persistence ──────────────────────────────────────────────────
    #[error("Token store error: {message}")]
    TokenStore { message: String },
}

impl CoreError {
    /// Returns `true` if the error means "the vehicle is asleep" rather
    /// than something being broken.
    pub fn is_unreachable(&self) -> bool {
        matches!(self, Self::Unreachable { .. })
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<voltsync_api::Error> for CoreError {
    fn from(err: voltsync_api::Error) -> Self {
        match err {
            voltsync_api::Error::VehicleUnreachable { vehicle_id } => CoreError::Unreachable {
                vehicle: vehicle_id,
            },
            voltsync_api::Error::Unauthorized => CoreError::Unauthorized {
                message: "access token rejected".into(),
            },
            voltsync_api::Error::Authentication { message } => {
                CoreError::Unauthorized { message }
            }
            voltsync_api::Error::CommandRejected { reason } => {
                CoreError::CommandRejected { reason }
            }
            voltsync_api::Error::RateLimited { retry_after_secs } => CoreError::Api {
                message: format!("rate limited -- retry after {retry_after_secs}s"),
                status: Some(429),
            },
            voltsync_api::Error::Transport(e) => CoreError::Api {
                message: e.to_string(),
                status: e.status().map(|status| status.as_u16()),
            },
            voltsync_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("invalid URL: {e}"),
            },
            voltsync_api::Error::Api { message, status } => CoreError::Api {
                message,
                status: Some(status),
            },
            voltsync_api::Error::Deserialization { message, .. } => CoreError::Api {
                message: format!("malformed API response: {message}"),
                status: None,
            },
        }
    }
}
