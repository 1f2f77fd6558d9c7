// ── Wake-mode state machine ──
//
// Each vehicle is either left alone to sleep (`AsleepOk`) or held awake
// because the operator asked for live data (`AwakeForced`). Forced mode
// is a lease, not a latch: it expires after one long-poll interval
// without renewal so a forgotten toggle cannot drain the battery.

use std::time::Duration;

use chrono::{DateTime, Utc};

/// What a scheduler tick is allowed to do to a sleeping vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickKind {
    /// Frequent passive tick. Never wakes a vehicle.
    Short,
    /// Infrequent tick. May wake the vehicle to get fresh data.
    Long,
}

/// Sleep policy for one vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WakeMode {
    /// Let the vehicle sleep; only long polls may wake it.
    #[default]
    AsleepOk,
    /// Keep the vehicle awake; every poll may wake it.
    AwakeForced,
}

/// Per-vehicle wake state. Mutated only under the vehicle's lock.
#[derive(Debug, Clone, Copy, Default)]
pub struct WakeRecord {
    pub mode: WakeMode,
    /// When forced mode was last requested or renewed.
    last_forced: Option<DateTime<Utc>>,
}

impl WakeRecord {
    /// Enters (or renews) forced-awake mode.
    pub fn force_awake(&mut self, now: DateTime<Utc>) {
        self.mode = WakeMode::AwakeForced;
        self.last_forced = Some(now);
    }

    /// Returns to the battery-friendly default.
    pub fn let_sleep(&mut self) {
        self.mode = WakeMode::AsleepOk;
        self.last_forced = None;
    }

    /// Expires a stale forced-awake lease. Returns `true` if the record
    /// flipped back to `AsleepOk` on this call.
    pub fn expire_lease(&mut self, now: DateTime<Utc>, lease: Duration) -> bool {
        if self.mode != WakeMode::AwakeForced {
            return false;
        }
        let expired = match self.last_forced {
            Some(at) => {
                let age = now.signed_duration_since(at);
                age.to_std().map_or(true, |age| age >= lease)
            }
            // Forced with no timestamp should not happen; treat as stale.
            None => true,
        };
        if expired {
            self.let_sleep();
        }
        expired
    }

    /// Whether a tick of this kind may send wake requests right now.
    pub fn allows_wake(&self, tick: TickKind) -> bool {
        match tick {
            TickKind::Long => true,
            TickKind::Short => self.mode == WakeMode::AwakeForced,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000 + secs, 0).unwrap_or_default()
    }

    #[test]
    fn test_default_lets_sleep() {
        let record = WakeRecord::default();
        assert_eq!(record.mode, WakeMode::AsleepOk);
        assert!(!record.allows_wake(TickKind::Short));
        assert!(record.allows_wake(TickKind::Long));
    }

    #[test]
    fn test_forced_allows_short_tick_wakes() {
        let mut record = WakeRecord::default();
        record.force_awake(at(0));
        assert!(record.allows_wake(TickKind::Short));
        assert!(record.allows_wake(TickKind::Long));
    }

    #[test]
    fn test_lease_expires_after_interval() {
        let mut record = WakeRecord::default();
        record.force_awake(at(0));

        let lease = Duration::from_secs(300);
        assert!(!record.expire_lease(at(299), lease));
        assert_eq!(record.mode, WakeMode::AwakeForced);

        assert!(record.expire_lease(at(300), lease));
        assert_eq!(record.mode, WakeMode::AsleepOk);
    }

    #[test]
    fn test_renewal_extends_lease() {
        let mut record = WakeRecord::default();
        record.force_awake(at(0));
        record.force_awake(at(250));

        let lease = Duration::from_secs(300);
        assert!(!record.expire_lease(at(400), lease));
        assert!(record.expire_lease(at(550), lease));
    }

    #[test]
    fn test_expire_is_noop_while_asleep() {
        let mut record = WakeRecord::default();
        assert!(!record.expire_lease(at(1000), Duration::from_secs(300)));
    }
}
