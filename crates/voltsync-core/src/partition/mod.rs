// ── State partitions ──
//
// A fetched snapshot fans out into four partitions, each projecting the
// slice of vehicle state it cares about into flat named fields. A
// partition reports only fields whose value actually changed since the
// last ingest, so downstream consumers see deltas, not full dumps.
//
// Partitions fail independently: a snapshot missing `climate_state`
// poisons the climate partition for that cycle but charging still
// updates, and the climate fields keep their previous values.

mod charging;
mod climate;
mod conditioning;
mod security;

pub use charging::ChargingPartition;
pub use climate::ClimatePartition;
pub use conditioning::ConditioningPartition;
pub use security::SecurityPartition;

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use voltsync_api::{GuiSettings, VehicleData};

use crate::CoreError;
use crate::config::HomeLocation;

// ── Display units ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DistanceUnit {
    #[default]
    Miles,
    Kilometers,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TemperatureUnit {
    #[default]
    Fahrenheit,
    Celsius,
}

/// The vehicle's configured display units. Distances and temperatures
/// on the wire are always miles and Celsius; partitions convert to
/// these before reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Units {
    pub distance: DistanceUnit,
    pub temperature: TemperatureUnit,
}

impl Units {
    pub fn from_gui(gui: &GuiSettings) -> Self {
        Self {
            distance: if gui.gui_distance_units.starts_with("km") {
                DistanceUnit::Kilometers
            } else {
                DistanceUnit::Miles
            },
            temperature: if gui.gui_temperature_units.eq_ignore_ascii_case("C") {
                TemperatureUnit::Celsius
            } else {
                TemperatureUnit::Fahrenheit
            },
        }
    }

    /// Converts a wire distance (miles) to the display unit, rounded to
    /// one decimal.
    pub fn display_distance(self, miles: f64) -> f64 {
        let value = match self.distance {
            DistanceUnit::Miles => miles,
            DistanceUnit::Kilometers => miles * 1.609_344,
        };
        (value * 10.0).round() / 10.0
    }

    /// Converts a wire temperature (Celsius) to the display unit,
    /// rounded to one decimal.
    pub fn display_temperature(self, celsius: f64) -> f64 {
        let value = match self.temperature {
            TemperatureUnit::Celsius => celsius,
            TemperatureUnit::Fahrenheit => celsius * 9.0 / 5.0 + 32.0,
        };
        (value * 10.0).round() / 10.0
    }
}

// ── Snapshot context ────────────────────────────────────────────────

/// Everything a partition needs to project one snapshot.
#[derive(Debug)]
pub struct SnapshotContext<'a> {
    pub data: &'a VehicleData,
    /// Last known display units; retained across snapshots that omit
    /// `gui_settings`.
    pub units: Units,
    pub fetched_at: DateTime<Utc>,
    /// Home coordinate and radius for the geofence field, if set.
    pub geofence: Option<Geofence>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Geofence {
    pub home: HomeLocation,
    pub radius_m: f64,
}

impl Geofence {
    /// Whether the given position is within the home radius.
    pub fn contains(&self, latitude: f64, longitude: f64) -> bool {
        haversine_m(
            (self.home.latitude, self.home.longitude),
            (latitude, longitude),
        ) <= self.radius_m
    }
}

/// Great-circle distance in meters.
fn haversine_m(from: (f64, f64), to: (f64, f64)) -> f64 {
    const EARTH_RADIUS_M: f64 = 6_371_000.0;
    let (from_lat, from_lon) = (from.0.to_radians(), from.1.to_radians());
    let (to_lat, to_lon) = (to.0.to_radians(), to.1.to_radians());
    let half_dlat = (to_lat - from_lat) / 2.0;
    let half_dlon = (to_lon - from_lon) / 2.0;
    let h = half_dlat.sin().powi(2) + from_lat.cos() * to_lat.cos() * half_dlon.sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().asin()
}

// ── Field reporting ─────────────────────────────────────────────────

/// A single reported field value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}
impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}
impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}
impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

/// One field that changed during an ingest.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldChange {
    pub partition: &'static str,
    pub field: &'static str,
    pub value: FieldValue,
}

/// Cached field values for one partition, with change detection.
#[derive(Debug, Default)]
pub struct FieldSet {
    values: HashMap<&'static str, FieldValue>,
}

impl FieldSet {
    /// Records `value` for `field`; appends to `out` only if it differs
    /// from the cached value.
    pub fn set(
        &mut self,
        partition: &'static str,
        field: &'static str,
        value: impl Into<FieldValue>,
        out: &mut Vec<FieldChange>,
    ) {
        let value = value.into();
        if self.values.get(field) == Some(&value) {
            return;
        }
        self.values.insert(field, value.clone());
        out.push(FieldChange {
            partition,
            field,
            value,
        });
    }

    /// Current value of a field, if one was ever reported.
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.values.get(field)
    }
}

// ── Partition trait ─────────────────────────────────────────────────

/// One projection of vehicle state.
pub trait Partition: Send {
    fn name(&self) -> &'static str;

    /// Projects the snapshot into this partition's fields, returning
    /// the fields that changed. Fails with `MalformedResponse` when the
    /// snapshot lacks the sub-object this partition requires; cached
    /// values are left untouched in that case.
    fn apply(&mut self, ctx: &SnapshotContext<'_>) -> Result<Vec<FieldChange>, CoreError>;

    /// Read access to the current projected values.
    fn fields(&self) -> &FieldSet;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_units_from_gui() {
        let gui = GuiSettings {
            gui_distance_units: "km/hr".into(),
            gui_temperature_units: "C".into(),
        };
        let units = Units::from_gui(&gui);
        assert_eq!(units.distance, DistanceUnit::Kilometers);
        assert_eq!(units.temperature, TemperatureUnit::Celsius);
    }

    #[test]
    fn test_distance_conversion_rounds() {
        let units = Units {
            distance: DistanceUnit::Kilometers,
            temperature: TemperatureUnit::Celsius,
        };
        assert!((units.display_distance(100.0) - 160.9).abs() < f64::EPSILON);
        assert!((Units::default().display_distance(100.04) - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_temperature_conversion() {
        let fahrenheit = Units::default();
        assert!((fahrenheit.display_temperature(21.0) - 69.8).abs() < f64::EPSILON);
    }

    #[test]
    fn test_haversine_known_distance() {
        // Ferry Building to Coit Tower, San Francisco: roughly 1.1 km.
        let d = haversine_m((37.7955, -122.3937), (37.8024, -122.4058));
        assert!((950.0..1350.0).contains(&d), "got {d}");
    }

    #[test]
    fn test_geofence_contains() {
        let fence = Geofence {
            home: HomeLocation {
                latitude: 40.0,
                longitude: -105.0,
            },
            radius_m: 50.0,
        };
        assert!(fence.contains(40.0, -105.0));
        // ~111 m north of home.
        assert!(!fence.contains(40.001, -105.0));
    }

    #[test]
    fn test_field_set_reports_only_changes() {
        let mut fields = FieldSet::default();
        let mut out = Vec::new();

        fields.set("charging", "soc", 80_i64, &mut out);
        fields.set("charging", "soc", 80_i64, &mut out);
        assert_eq!(out.len(), 1);

        fields.set("charging", "soc", 81_i64, &mut out);
        assert_eq!(out.len(), 2);
        assert_eq!(fields.get("soc"), Some(&FieldValue::Int(81)));
    }
}
