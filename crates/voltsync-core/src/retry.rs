// ── Wake-and-retry policy ──
//
// A sleeping vehicle answers data requests with "unreachable". When the
// caller is allowed to disturb it, we send a wake request, give the
// firmware a moment to boot its comms stack, and try again a bounded
// number of times. Everything that is not "unreachable" propagates
// immediately; retrying a 401 or a malformed body would only hide it.

use tracing::{debug, warn};

use crate::CoreError;
use crate::config::RetrySchedule;

/// How a fetch is allowed to treat a sleeping vehicle.
#[derive(Debug, Clone, Copy)]
pub struct WakePolicy {
    /// Whether an unreachable result may trigger a wake request.
    pub allow_wake: bool,
    pub schedule: RetrySchedule,
}

impl WakePolicy {
    /// Never wake: a single attempt, unreachable surfaces as-is.
    pub fn passive() -> Self {
        Self {
            allow_wake: false,
            schedule: RetrySchedule {
                max_retries: 0,
                backoff: std::time::Duration::ZERO,
            },
        }
    }

    /// Wake and retry on the given schedule.
    pub fn waking(schedule: RetrySchedule) -> Self {
        Self {
            allow_wake: true,
            schedule,
        }
    }
}

/// Runs `fetch` under the given policy, interleaving `wake` calls when
/// the vehicle is unreachable and waking is allowed.
///
/// Performs at most `max_retries + 1` fetches and `max_retries` wakes.
/// Wake failures other than authorization problems are logged and the
/// retry proceeds anyway; the wake may well have landed even when its
/// acknowledgment did not.
pub async fn fetch_with_wake<T, F, FFut, W, WFut>(
    policy: WakePolicy,
    mut fetch: F,
    mut wake: W,
) -> Result<T, CoreError>
where
    F: FnMut() -> FFut,
    FFut: Future<Output = Result<T, CoreError>>,
    W: FnMut() -> WFut,
    WFut: Future<Output = Result<(), CoreError>>,
{
    let mut attempt: u32 = 0;
    loop {
        match fetch().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_unreachable() => {
                if !policy.allow_wake || attempt >= policy.schedule.max_retries {
                    return Err(err);
                }
                attempt += 1;
                debug!(attempt, "vehicle unreachable, sending wake request");
                match wake().await {
                    Ok(()) => {}
                    Err(wake_err) if wake_err.is_unauthorized() => return Err(wake_err),
                    Err(wake_err) => {
                        warn!(error = %wake_err, "wake request failed, retrying anyway");
                    }
                }
                tokio::time::sleep(policy.schedule.backoff).await;
            }
            Err(err) => return Err(err),
        }
    }
}
