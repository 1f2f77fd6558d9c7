// ── Synchronization engine ──
//
// Owns the vehicle registry and runs the polling protocol: per-vehicle
// mutual exclusion, wake policy, session handling, snapshot ingest, and
// command dispatch. The host drives it with `on_tick` from its own
// scheduler; the engine never spawns its own timers.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use dashmap::DashMap;
use futures_util::future::join_all;
use tokio::sync::{Mutex, broadcast, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use voltsync_api::VehicleData;

use crate::api::VehicleApi;
use crate::command::VehicleCommand;
use crate::config::EngineConfig;
use crate::error::CoreError;
use crate::partition::{FieldChange, Geofence};
use crate::retry::{WakePolicy, fetch_with_wake};
use crate::serializer::lock_with_timeout;
use crate::session::{SessionManager, TokenStore};
use crate::store::VehicleStore;
use crate::wake::{TickKind, WakeRecord};

/// Capacity of the event broadcast channel. Slow consumers lose the
/// oldest events, never block the engine.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// A registered vehicle, as exposed to hosts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VehicleIdentity {
    /// API key used for all endpoint calls.
    pub id: String,
    /// Stable numeric identifier, distinct from `id`.
    pub vehicle_id: u64,
    pub display_name: String,
}

/// State changes published by the engine.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// A sync produced changed fields for a vehicle.
    VehicleUpdated {
        vehicle: String,
        changes: Vec<FieldChange>,
    },
    /// A sleeping vehicle's connectivity changed (summary check).
    VehicleConnectivity { vehicle: String, online: bool },
    /// A vehicle entered or left the durable error state.
    SyncError { vehicle: String, failing: bool },
}

/// Outcome of one tick, aggregated across vehicles.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    pub synced: usize,
    /// Skipped cleanly: lock contention or asleep under passive policy.
    pub skipped: usize,
    pub failed: usize,
}

// Everything mutated during a sync lives behind this lock, so wake
// state and store contents can never tear.
struct VehicleCell {
    wake: WakeRecord,
    store: VehicleStore,
    /// Last connectivity seen (data fetch or summary check).
    online: bool,
}

struct VehicleHandle {
    identity: VehicleIdentity,
    cell: Arc<Mutex<VehicleCell>>,
    /// Durable failure indicator; cleared only by a fully clean sync.
    /// Kept outside the cell so a sync that cannot even get the lock
    /// can still raise it.
    failing: Arc<AtomicBool>,
}

struct EngineInner<C: VehicleApi> {
    client: Arc<C>,
    session: SessionManager<C>,
    config: watch::Sender<EngineConfig>,
    vehicles: DashMap<String, VehicleHandle>,
    events: broadcast::Sender<EngineEvent>,
    /// True while the account needs operator attention (dead refresh
    /// token or rejected password).
    auth_required: watch::Sender<bool>,
    cancel: CancellationToken,
}

/// The synchronization engine. Cheap to clone; all clones share state.
pub struct Engine<C: VehicleApi> {
    inner: Arc<EngineInner<C>>,
}

impl<C: VehicleApi> Clone for Engine<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C: VehicleApi> Engine<C> {
    pub fn new(
        client: Arc<C>,
        config: EngineConfig,
        token_store: Arc<dyn TokenStore>,
    ) -> Result<Self, CoreError> {
        config.validate()?;
        let session = SessionManager::new(
            Arc::clone(&client),
            config.credentials.clone(),
            token_store,
            config.token_settle_delay,
        );
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (config_tx, _) = watch::channel(config);
        let (auth_tx, _) = watch::channel(false);
        Ok(Self {
            inner: Arc::new(EngineInner {
                client,
                session,
                config: config_tx,
                vehicles: DashMap::new(),
                events,
                auth_required: auth_tx,
                cancel: CancellationToken::new(),
            }),
        })
    }

    /// Subscribes to engine events.
    pub fn events(&self) -> broadcast::Receiver<EngineEvent> {
        self.inner.events.subscribe()
    }

    /// Watches the "credentials need attention" flag.
    pub fn auth_required(&self) -> watch::Receiver<bool> {
        self.inner.auth_required.subscribe()
    }

    /// Currently registered vehicles.
    pub fn vehicles(&self) -> Vec<VehicleIdentity> {
        self.inner
            .vehicles
            .iter()
            .map(|entry| entry.identity.clone())
            .collect()
    }

    /// Swaps the runtime configuration. Gates and geofence take effect
    /// on the next sync or command. Credentials are fixed for the
    /// lifetime of the engine; a credential change needs a new engine.
    pub fn on_config_changed(&self, config: EngineConfig) -> Result<(), CoreError> {
        config.validate()?;
        self.inner.config.send_replace(config);
        Ok(())
    }

    /// Stops the engine: in-progress ticks finish their current vehicle
    /// and return; later ticks become no-ops.
    pub fn stop(&self) {
        info!("engine stopping");
        self.inner.cancel.cancel();
    }

    // ── Discovery ───────────────────────────────────────────────────

    /// Fetches the account's vehicle list and registers any new ones.
    /// Vehicles that disappeared from the account are dropped.
    pub async fn discover(&self) -> Result<Vec<VehicleIdentity>, CoreError> {
        let summaries = self
            .with_auth_retry(|token| {
                let client = Arc::clone(&self.inner.client);
                async move { client.list_vehicles(&token).await.map_err(Into::into) }
            })
            .await?;

        let geofence = geofence_of(&self.inner.config.borrow());
        let mut identities = Vec::with_capacity(summaries.len());
        for summary in &summaries {
            let identity = VehicleIdentity {
                id: summary.id.clone(),
                vehicle_id: summary.vehicle_id,
                display_name: summary.display_name.clone(),
            };
            self.inner
                .vehicles
                .entry(summary.id.clone())
                .or_insert_with(|| {
                    info!(vehicle = %identity.display_name, "registered vehicle");
                    VehicleHandle {
                        identity: identity.clone(),
                        cell: Arc::new(Mutex::new(VehicleCell {
                            wake: WakeRecord::default(),
                            store: VehicleStore::new(geofence),
                            online: summary.is_online(),
                        })),
                        failing: Arc::new(AtomicBool::new(false)),
                    }
                });
            identities.push(identity);
        }
        self.inner
            .vehicles
            .retain(|id, _| summaries.iter().any(|s| &s.id == id));
        // The account answered, so any standing credentials notice is
        // stale.
        self.set_auth_required(false);
        Ok(identities)
    }

    // ── Polling ─────────────────────────────────────────────────────

    /// Runs one scheduler tick across all registered vehicles.
    pub async fn on_tick(&self, kind: TickKind) -> TickReport {
        if self.inner.cancel.is_cancelled() {
            return TickReport::default();
        }
        if kind == TickKind::Long {
            // Keep the session warm so per-vehicle fetches rarely pay
            // for a refresh inside their lock window.
            if let Err(err) = self.inner.session.access_token(false).await {
                warn!(error = %err, "session refresh failed on long poll");
                if err.is_unauthorized() {
                    self.set_auth_required(true);
                }
            }
        }

        let ids: Vec<String> = self
            .inner
            .vehicles
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        let results = join_all(ids.iter().map(|id| self.sync_vehicle(id, kind))).await;

        let mut report = TickReport::default();
        for (id, result) in ids.iter().zip(results) {
            match result {
                Ok(()) => report.synced += 1,
                Err(err) if err.is_unreachable() || matches!(err, CoreError::LockTimeout { .. }) => {
                    debug!(vehicle = %id, reason = %err, "sync skipped");
                    report.skipped += 1;
                }
                Err(err) => {
                    warn!(vehicle = %id, error = %err, "sync failed");
                    report.failed += 1;
                }
            }
        }
        report
    }

    /// Synchronizes one vehicle now, waking it if necessary.
    pub async fn sync_now(&self, vehicle: &str) -> Result<(), CoreError> {
        self.sync_vehicle(vehicle, TickKind::Long).await
    }

    async fn sync_vehicle(&self, vehicle: &str, kind: TickKind) -> Result<(), CoreError> {
        let (cell, failing) = self.lookup(vehicle)?;
        let config = self.inner.config.borrow().clone();

        // Passive ticks give up the lock wait quickly; a tick that may
        // run a wake sequence is allowed to queue longer.
        let wait = match kind {
            TickKind::Short => config.short_lock_timeout,
            TickKind::Long => config.long_lock_timeout,
        };
        let mut guard = match lock_with_timeout(&cell, wait, vehicle).await {
            Ok(guard) => guard,
            Err(err) => {
                // The cycle is skipped, but the vehicle still missed a
                // sync; raise the indicator until a clean one lands.
                self.set_failing(vehicle, &failing, true);
                return Err(err);
            }
        };

        // The lease check runs on every tick so a stale forced-awake
        // state cannot keep short polls waking the vehicle past one
        // long-poll interval.
        if guard.wake.expire_lease(Utc::now(), config.long_poll_interval) {
            info!(vehicle, "forced-awake lease expired, letting vehicle sleep");
        }

        // Pick up geofence changes made since the last cycle.
        guard.store.set_geofence(geofence_of(&config));

        let policy = if guard.wake.allows_wake(kind) {
            WakePolicy::waking(config.long_poll_fetch)
        } else {
            WakePolicy::passive()
        };

        match self.fetch_data(vehicle, policy).await {
            Ok(data) => {
                self.ingest_locked(vehicle, &mut guard, &failing, &data);
                Ok(())
            }
            Err(err) => {
                self.set_failing(vehicle, &failing, true);
                if err.is_unreachable() && !policy.allow_wake {
                    // Can't tell asleep from gone without disturbing
                    // it; a summary query answers that without waking
                    // anything.
                    self.check_connectivity(vehicle, &mut guard).await;
                }
                Err(err)
            }
        }
    }

    fn ingest_locked(
        &self,
        vehicle: &str,
        guard: &mut VehicleCell,
        failing: &AtomicBool,
        data: &VehicleData,
    ) {
        let report = guard.store.ingest(data, Utc::now());
        guard.online = data.state == "online";
        self.set_auth_required(false);
        self.set_failing(vehicle, failing, !report.is_clean());

        if !report.changes.is_empty() {
            self.publish(EngineEvent::VehicleUpdated {
                vehicle: vehicle.to_string(),
                changes: report.changes,
            });
        }
    }

    /// Fetches the full data blob under the given wake policy, with one
    /// forced token refresh if the first pass bounces on authorization.
    async fn fetch_data(
        &self,
        vehicle: &str,
        policy: WakePolicy,
    ) -> Result<VehicleData, CoreError> {
        self.with_auth_retry(|token| {
            let client = Arc::clone(&self.inner.client);
            let id = vehicle.to_string();
            async move {
                fetch_with_wake(
                    policy,
                    || {
                        let client = Arc::clone(&client);
                        let token = token.clone();
                        let id = id.clone();
                        async move { client.vehicle_data(&token, &id).await.map_err(Into::into) }
                    },
                    || {
                        let client = Arc::clone(&client);
                        let token = token.clone();
                        let id = id.clone();
                        async move {
                            client.wake(&token, &id).await.map(drop).map_err(Into::into)
                        }
                    },
                )
                .await
            }
        })
        .await
    }

    /// Summary-only connectivity probe for a vehicle we won't wake.
    async fn check_connectivity(&self, vehicle: &str, guard: &mut VehicleCell) {
        let probe = self
            .with_auth_retry(|token| {
                let client = Arc::clone(&self.inner.client);
                let id = vehicle.to_string();
                async move { client.vehicle_summary(&token, &id).await.map_err(Into::into) }
            })
            .await;
        match probe {
            Ok(summary) => {
                let online = summary.is_online();
                if guard.online != online {
                    guard.online = online;
                    self.publish(EngineEvent::VehicleConnectivity {
                        vehicle: vehicle.to_string(),
                        online,
                    });
                }
            }
            Err(err) => debug!(vehicle, error = %err, "connectivity probe failed"),
        }
    }

    // ── Commands and wake control ───────────────────────────────────

    /// Executes a command against a vehicle, then forces a re-sync so
    /// the store reflects the command's effect.
    pub async fn execute(&self, vehicle: &str, command: VehicleCommand) -> Result<(), CoreError> {
        let config = self.inner.config.borrow().clone();
        if let Some(category) = command.category() {
            if !config.gates.permits(category) {
                info!(vehicle, category = category.as_str(), "command category disabled, ignoring");
                return Err(CoreError::CommandDisabled {
                    category: category.as_str(),
                });
            }
        }

        let (cell, failing) = self.lookup(vehicle)?;
        let mut guard = lock_with_timeout(&cell, config.long_lock_timeout, vehicle).await?;

        let request = command.to_request();
        let resync = config.command_resync;
        self.with_auth_retry(|token| {
            let client = Arc::clone(&self.inner.client);
            let id = vehicle.to_string();
            let request = request.clone();
            async move {
                fetch_with_wake(
                    WakePolicy::waking(resync),
                    || {
                        let client = Arc::clone(&client);
                        let token = token.clone();
                        let id = id.clone();
                        let request = request.clone();
                        async move {
                            client.command(&token, &id, &request).await.map_err(Into::into)
                        }
                    },
                    || {
                        let client = Arc::clone(&client);
                        let token = token.clone();
                        let id = id.clone();
                        async move {
                            client.wake(&token, &id).await.map(drop).map_err(Into::into)
                        }
                    },
                )
                .await
            }
        })
        .await?;

        debug!(vehicle, ?command, "command accepted, re-syncing");

        // The command reached the vehicle, so it is awake; re-sync on
        // the short schedule to pick up the new state.
        match self
            .fetch_data(vehicle, WakePolicy::waking(config.command_resync))
            .await
        {
            Ok(data) => self.ingest_locked(vehicle, &mut guard, &failing, &data),
            Err(err) => warn!(vehicle, error = %err, "post-command re-sync failed"),
        }
        Ok(())
    }

    /// Holds the vehicle awake so short polls may wake it. The lease
    /// expires after one long-poll interval without renewal.
    pub async fn force_awake(&self, vehicle: &str) -> Result<(), CoreError> {
        let (cell, _) = self.lookup(vehicle)?;
        let wait = self.inner.config.borrow().short_lock_timeout;
        let mut guard = lock_with_timeout(&cell, wait, vehicle).await?;
        guard.wake.force_awake(Utc::now());
        info!(vehicle, "vehicle held awake");
        Ok(())
    }

    /// Returns the vehicle to the battery-friendly default.
    pub async fn let_sleep(&self, vehicle: &str) -> Result<(), CoreError> {
        let (cell, _) = self.lookup(vehicle)?;
        let wait = self.inner.config.borrow().short_lock_timeout;
        let mut guard = lock_with_timeout(&cell, wait, vehicle).await?;
        guard.wake.let_sleep();
        info!(vehicle, "vehicle allowed to sleep");
        Ok(())
    }

    /// Reads one field from a vehicle's projected state.
    pub async fn field(
        &self,
        vehicle: &str,
        partition: &str,
        field: &str,
    ) -> Result<Option<crate::partition::FieldValue>, CoreError> {
        let (cell, _) = self.lookup(vehicle)?;
        // Reads give up quickly rather than queueing behind a sync.
        let wait = self.inner.config.borrow().short_lock_timeout;
        let guard = lock_with_timeout(&cell, wait, vehicle).await?;
        Ok(guard
            .store
            .partition_fields(partition)
            .and_then(|f| f.get(field).cloned()))
    }

    // ── Internals ───────────────────────────────────────────────────

    fn lookup(&self, vehicle: &str) -> Result<(Arc<Mutex<VehicleCell>>, Arc<AtomicBool>), CoreError> {
        self.inner
            .vehicles
            .get(vehicle)
            .map(|entry| (Arc::clone(&entry.cell), Arc::clone(&entry.failing)))
            .ok_or_else(|| CoreError::VehicleNotFound {
                address: vehicle.to_string(),
            })
    }

    /// Flips the durable per-vehicle failure indicator, publishing an
    /// event only on a transition.
    fn set_failing(&self, vehicle: &str, flag: &AtomicBool, failing: bool) {
        if flag.swap(failing, Ordering::SeqCst) != failing {
            self.publish(EngineEvent::SyncError {
                vehicle: vehicle.to_string(),
                failing,
            });
        }
    }

    /// Sets or clears the standing credentials notice without waking
    /// watchers when nothing changed.
    fn set_auth_required(&self, required: bool) {
        self.inner.auth_required.send_if_modified(|flag| {
            let changed = *flag != required;
            *flag = required;
            changed
        });
    }

    /// Runs `op` with a bearer token; on an authorization bounce, forces
    /// one refresh and tries again. A second bounce raises the
    /// credentials notice and propagates.
    async fn with_auth_retry<T, F, Fut>(&self, mut op: F) -> Result<T, CoreError>
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = Result<T, CoreError>>,
    {
        let token = self.inner.session.access_token(false).await?;
        match op(token).await {
            Err(err) if err.is_unauthorized() => {
                debug!("request bounced on authorization, forcing token refresh");
                let token = match self.inner.session.access_token(true).await {
                    Ok(token) => token,
                    Err(refresh_err) => {
                        self.set_auth_required(true);
                        return Err(refresh_err);
                    }
                };
                match op(token).await {
                    Err(err) if err.is_unauthorized() => {
                        self.set_auth_required(true);
                        Err(err)
                    }
                    other => other,
                }
            }
            other => other,
        }
    }

    fn publish(&self, event: EngineEvent) {
        // Nobody listening is fine.
        let _ = self.inner.events.send(event);
    }
}

fn geofence_of(config: &EngineConfig) -> Option<Geofence> {
    config.home.map(|home| Geofence {
        home,
        radius_m: config.geofence_radius_m,
    })
}
