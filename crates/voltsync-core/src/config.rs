// ── Runtime engine configuration ──
//
// These types describe *how* the engine behaves: poll cadence, lock
// and retry budgets, command gating, and the home geofence. The host
// constructs an `EngineConfig` and hands it in — core never reads
// config files (`voltsync-config` does that translation).

use std::time::Duration;

use secrecy::SecretString;
use voltsync_api::AccountCredentials;

use crate::command::CommandGates;

/// A bounded retry schedule for one call site.
///
/// The original deployment tuned these per call site (the wake-mode
/// poll retries harder than a command re-sync), so there is no single
/// canonical schedule — each site gets its own.
#[derive(Debug, Clone, Copy)]
pub struct RetrySchedule {
    /// Retries after the initial attempt (total attempts = retries + 1).
    pub max_retries: u32,
    /// Constant delay between attempts.
    pub backoff: Duration,
}

/// The configured home coordinate for the geofence partition field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HomeLocation {
    pub latitude: f64,
    pub longitude: f64,
}

/// Configuration for the synchronization engine.
///
/// Built by the host, passed to `Engine::new`. Everything except the
/// account credentials can be swapped at runtime via
/// `Engine::on_config_changed`.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Account credentials for the OAuth password grant.
    pub credentials: AccountCredentials,

    /// Long-poll cadence. Doubles as the wake safety timeout: a vehicle
    /// held awake reverts to let-sleep after this much time without a
    /// fresh wake request.
    pub long_poll_interval: Duration,

    /// Bounded lock wait for passive (short-poll) sync attempts.
    pub short_lock_timeout: Duration,

    /// Bounded lock wait for sync attempts that may wake-and-retry.
    /// Must exceed the worst-case wake/backoff sequence.
    pub long_lock_timeout: Duration,

    /// Retry schedule for long-poll fetches that wake the vehicle.
    pub long_poll_fetch: RetrySchedule,

    /// Retry schedule for the forced re-sync after a command.
    pub command_resync: RetrySchedule,

    /// Settle delay after acquiring/refreshing tokens, before first use.
    pub token_settle_delay: Duration,

    /// Which sensitive command categories are allowed to execute.
    pub gates: CommandGates,

    /// Home coordinate for the security partition's location field.
    /// `None` disables the geofence (location reports Unknown).
    pub home: Option<HomeLocation>,

    /// Geofence radius in meters.
    pub geofence_radius_m: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            credentials: AccountCredentials {
                email: String::new(),
                password: SecretString::from(String::new()),
            },
            long_poll_interval: Duration::from_secs(300),
            short_lock_timeout: Duration::from_secs(2),
            long_lock_timeout: Duration::from_secs(20),
            long_poll_fetch: RetrySchedule {
                max_retries: 2,
                backoff: Duration::from_secs(5),
            },
            command_resync: RetrySchedule {
                max_retries: 1,
                backoff: Duration::from_secs(3),
            },
            token_settle_delay: Duration::from_secs(2),
            gates: CommandGates::default(),
            home: None,
            geofence_radius_m: 50.0,
        }
    }
}

impl EngineConfig {
    /// Minimal config with credentials and defaults for everything else.
    pub fn new(credentials: AccountCredentials) -> Self {
        Self {
            credentials,
            ..Self::default()
        }
    }

    /// Basic sanity checks before the engine starts.
    pub fn validate(&self) -> Result<(), crate::CoreError> {
        if self.credentials.email.is_empty() {
            return Err(crate::CoreError::Config {
                message: "account email is not set".into(),
            });
        }
        if self.long_lock_timeout
            < self.long_poll_fetch.backoff * (self.long_poll_fetch.max_retries + 1)
        {
            return Err(crate::CoreError::Config {
                message: "long_lock_timeout must cover the full wake/retry sequence".into(),
            });
        }
        Ok(())
    }
}
