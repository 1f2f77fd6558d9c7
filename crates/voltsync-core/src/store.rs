// ── Per-vehicle state store ──
//
// Owns the four partitions for one vehicle and drives a snapshot
// through them. Ingest is atomic per partition, not per snapshot: one
// partition failing to find its sub-object never blocks the others.

use chrono::{DateTime, Utc};
use tracing::warn;
use voltsync_api::VehicleData;

use crate::CoreError;
use crate::partition::{
    ChargingPartition, ClimatePartition, ConditioningPartition, FieldChange, FieldSet, Geofence,
    Partition, SecurityPartition, SnapshotContext, Units,
};

/// Outcome of feeding one snapshot through the partitions.
#[derive(Debug, Default)]
pub struct IngestReport {
    /// Fields that changed, across all partitions.
    pub changes: Vec<FieldChange>,
    /// Partitions that could not be updated this cycle.
    pub partition_errors: Vec<CoreError>,
}

impl IngestReport {
    pub fn is_clean(&self) -> bool {
        self.partition_errors.is_empty()
    }
}

/// Projected state for one vehicle.
pub struct VehicleStore {
    charging: ChargingPartition,
    security: SecurityPartition,
    climate: ClimatePartition,
    conditioning: ConditioningPartition,
    /// Last known display units, carried across snapshots that omit
    /// `gui_settings`.
    units: Units,
    geofence: Option<Geofence>,
    last_sync: Option<DateTime<Utc>>,
}

impl VehicleStore {
    pub fn new(geofence: Option<Geofence>) -> Self {
        Self {
            charging: ChargingPartition::default(),
            security: SecurityPartition::default(),
            climate: ClimatePartition::default(),
            conditioning: ConditioningPartition::default(),
            units: Units::default(),
            geofence,
            last_sync: None,
        }
    }

    pub fn set_geofence(&mut self, geofence: Option<Geofence>) {
        self.geofence = geofence;
    }

    /// Feeds a fetched snapshot through every partition.
    pub fn ingest(&mut self, data: &VehicleData, fetched_at: DateTime<Utc>) -> IngestReport {
        if let Some(gui) = data.gui_settings.as_ref() {
            self.units = Units::from_gui(gui);
        }

        let ctx = SnapshotContext {
            data,
            units: self.units,
            fetched_at,
            geofence: self.geofence,
        };

        let mut report = IngestReport::default();
        let partitions: [&mut dyn Partition; 4] = [
            &mut self.charging,
            &mut self.security,
            &mut self.climate,
            &mut self.conditioning,
        ];
        for partition in partitions {
            match partition.apply(&ctx) {
                Ok(mut changes) => report.changes.append(&mut changes),
                Err(err) => {
                    warn!(partition = partition.name(), error = %err, "partition skipped");
                    report.partition_errors.push(err);
                }
            }
        }

        self.last_sync = Some(fetched_at);
        report
    }

    pub fn last_sync(&self) -> Option<DateTime<Utc>> {
        self.last_sync
    }

    pub fn units(&self) -> Units {
        self.units
    }

    /// Read access to one partition's current fields by name.
    pub fn partition_fields(&self, name: &str) -> Option<&FieldSet> {
        match name {
            "charging" => Some(self.charging.fields()),
            "security" => Some(self.security.fields()),
            "climate" => Some(self.climate.fields()),
            "conditioning" => Some(self.conditioning.fields()),
            _ => None,
        }
    }
}

impl std::fmt::Debug for VehicleStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VehicleStore")
            .field("units", &self.units)
            .field("last_sync", &self.last_sync)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use voltsync_api::{ChargeState, ClimateState, GuiSettings, VehicleData, VehicleState};

    use super::*;
    use crate::partition::{DistanceUnit, FieldValue};

    fn full_snapshot() -> VehicleData {
        VehicleData {
            state: "online".into(),
            charge_state: Some(ChargeState {
                battery_level: 80,
                battery_range: 250.0,
                charging_state: "Disconnected".into(),
                ..ChargeState::default()
            }),
            climate_state: Some(ClimateState::default()),
            vehicle_state: Some(VehicleState {
                locked: true,
                ..VehicleState::default()
            }),
            gui_settings: Some(GuiSettings {
                gui_distance_units: "mi/hr".into(),
                gui_temperature_units: "F".into(),
            }),
            ..VehicleData::default()
        }
    }

    #[test]
    fn test_full_snapshot_updates_all_partitions() {
        let mut store = VehicleStore::new(None);
        let report = store.ingest(&full_snapshot(), Utc::now());

        assert!(report.is_clean());
        let partitions: Vec<&str> = report.changes.iter().map(|c| c.partition).collect();
        assert!(partitions.contains(&"charging"));
        assert!(partitions.contains(&"security"));
        assert!(partitions.contains(&"conditioning"));
    }

    #[test]
    fn test_reingest_identical_snapshot_is_silent() {
        let mut store = VehicleStore::new(None);
        let data = full_snapshot();
        store.ingest(&data, Utc::now());
        let report = store.ingest(&data, Utc::now());
        assert!(report.changes.is_empty());
        assert!(report.is_clean());
    }

    #[test]
    fn test_partition_failure_is_isolated() {
        let mut store = VehicleStore::new(None);
        store.ingest(&full_snapshot(), Utc::now());

        // Second snapshot lost its climate section but SOC moved.
        let mut partial = full_snapshot();
        partial.climate_state = None;
        if let Some(charge) = partial.charge_state.as_mut() {
            charge.battery_level = 81;
        }
        let report = store.ingest(&partial, Utc::now());

        // climate + conditioning both depend on climate_state.
        assert_eq!(report.partition_errors.len(), 2);
        assert!(
            report
                .changes
                .iter()
                .any(|c| c.partition == "charging" && c.field == "battery_soc")
        );
    }

    #[test]
    fn test_units_survive_snapshot_without_gui_settings() {
        let mut store = VehicleStore::new(None);
        let mut metric = full_snapshot();
        metric.gui_settings = Some(GuiSettings {
            gui_distance_units: "km/hr".into(),
            gui_temperature_units: "C".into(),
        });
        store.ingest(&metric, Utc::now());
        assert_eq!(store.units().distance, DistanceUnit::Kilometers);

        let mut no_gui = full_snapshot();
        no_gui.gui_settings = None;
        store.ingest(&no_gui, Utc::now());
        assert_eq!(store.units().distance, DistanceUnit::Kilometers);
        // Range still converted with the cached unit.
        assert_eq!(
            store.partition_fields("charging").unwrap().get("battery_range"),
            Some(&FieldValue::Float(402.3))
        );
    }

    #[test]
    fn test_last_sync_advances() {
        let mut store = VehicleStore::new(None);
        assert!(store.last_sync().is_none());
        let now = Utc::now();
        store.ingest(&full_snapshot(), now);
        assert_eq!(store.last_sync(), Some(now));
    }
}
