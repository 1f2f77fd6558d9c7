// ── Per-vehicle mutual exclusion ──
//
// All operations that talk to a vehicle (polls, commands, wake checks)
// serialize on one async mutex per vehicle. Waits are bounded: a poll
// tick that cannot get the lock quickly skips the cycle instead of
// queuing behind a long wake sequence.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::CoreError;

/// Acquires `cell`'s lock, waiting at most `wait`.
///
/// Returns an owned guard so it can cross `.await` points and task
/// boundaries. On timeout the caller gets `LockTimeout`, which the
/// scheduler treats as "someone else is already syncing this vehicle".
pub async fn lock_with_timeout<T>(
    cell: &Arc<Mutex<T>>,
    wait: Duration,
    vehicle: &str,
) -> Result<OwnedMutexGuard<T>, CoreError> {
    match tokio::time::timeout(wait, Arc::clone(cell).lock_owned()).await {
        Ok(guard) => Ok(guard),
        Err(_) => Err(CoreError::LockTimeout {
            vehicle: vehicle.to_string(),
        }),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_uncontended_lock_is_immediate() {
        let cell = Arc::new(Mutex::new(0u32));
        let guard = lock_with_timeout(&cell, Duration::from_secs(2), "v1")
            .await
            .unwrap();
        assert_eq!(*guard, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_contended_lock_times_out() {
        let cell = Arc::new(Mutex::new(0u32));
        let held = Arc::clone(&cell).lock_owned().await;

        let err = lock_with_timeout(&cell, Duration::from_secs(2), "v1")
            .await
            .unwrap_err();
        match err {
            CoreError::LockTimeout { vehicle } => assert_eq!(vehicle, "v1"),
            other => panic!("expected LockTimeout, got: {other:?}"),
        }
        drop(held);
    }

    #[tokio::test(start_paused = true)]
    async fn test_lock_acquired_once_released() {
        let cell = Arc::new(Mutex::new(0u32));
        let held = Arc::clone(&cell).lock_owned().await;

        let waiter = tokio::spawn({
            let cell = Arc::clone(&cell);
            async move {
                lock_with_timeout(&cell, Duration::from_secs(10), "v1")
                    .await
                    .is_ok()
            }
        });

        tokio::time::sleep(Duration::from_secs(1)).await;
        drop(held);
        assert!(waiter.await.unwrap());
    }
}
