// Security partition: locks, closures, sentry, software update, and
// the home geofence.

use super::{FieldChange, FieldSet, Partition, SnapshotContext};
use crate::CoreError;

const NAME: &str = "security";

/// Reported when the vehicle has no panoramic roof.
const SUNROOF_ABSENT: i64 = 101;

/// Sentry field encoding: 0 = off, 1 = on, 2 = unavailable.
const SENTRY_UNAVAILABLE: i64 = 2;

#[derive(Debug, Default)]
pub struct SecurityPartition {
    fields: FieldSet,
}

impl Partition for SecurityPartition {
    fn name(&self) -> &'static str {
        NAME
    }

    fn apply(&mut self, ctx: &SnapshotContext<'_>) -> Result<Vec<FieldChange>, CoreError> {
        let Some(vehicle) = ctx.data.vehicle_state.as_ref() else {
            return Err(CoreError::MalformedResponse { partition: NAME });
        };

        let mut out = Vec::new();
        let f = &mut self.fields;

        f.set(NAME, "locked", vehicle.locked, &mut out);
        f.set(NAME, "frunk_open", vehicle.ft != 0, &mut out);
        f.set(NAME, "trunk_open", vehicle.rt != 0, &mut out);

        let sentry = if vehicle.sentry_mode_available {
            i64::from(vehicle.sentry_mode)
        } else {
            SENTRY_UNAVAILABLE
        };
        f.set(NAME, "sentry", sentry, &mut out);

        f.set(
            NAME,
            "sunroof_percent",
            vehicle.sun_roof_percent_open.unwrap_or(SUNROOF_ABSENT),
            &mut out,
        );

        let update = match vehicle.software_update.status.as_str() {
            "available" => 1,
            "scheduled" => 2,
            "installing" => 3,
            _ => 0,
        };
        f.set(NAME, "software_update", update, &mut out);

        if let Some(charge) = ctx.data.charge_state.as_ref() {
            f.set(NAME, "charge_port_open", charge.charge_port_door_open, &mut out);
            f.set(
                NAME,
                "charge_port_latched",
                charge.charge_port_latch == "Engaged",
                &mut out,
            );
        }

        f.set(NAME, "location", locate(ctx), &mut out);

        Ok(out)
    }

    fn fields(&self) -> &FieldSet {
        &self.fields
    }
}

/// Resolves the geofence field: "Home" inside the configured radius,
/// "Remote" outside it, "Unknown" without a fix or a configured home.
fn locate(ctx: &SnapshotContext<'_>) -> &'static str {
    let Some(fence) = ctx.geofence else {
        return "Unknown";
    };
    let position = ctx
        .data
        .drive_state
        .as_ref()
        .and_then(|d| Some((d.latitude?, d.longitude?)));
    match position {
        Some((lat, lon)) if fence.contains(lat, lon) => "Home",
        Some(_) => "Remote",
        None => "Unknown",
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use voltsync_api::{DriveState, SoftwareUpdate, VehicleData, VehicleState};

    use super::*;
    use crate::config::HomeLocation;
    use crate::partition::{FieldValue, Geofence, Units};

    fn snapshot() -> VehicleData {
        VehicleData {
            state: "online".into(),
            vehicle_state: Some(VehicleState {
                locked: true,
                ft: 0,
                rt: 16,
                sun_roof_percent_open: None,
                sentry_mode: true,
                sentry_mode_available: true,
                software_update: SoftwareUpdate {
                    status: "available".into(),
                },
                ..VehicleState::default()
            }),
            drive_state: Some(DriveState {
                latitude: Some(40.0),
                longitude: Some(-105.0),
            }),
            ..VehicleData::default()
        }
    }

    fn ctx<'a>(data: &'a VehicleData, geofence: Option<Geofence>) -> SnapshotContext<'a> {
        SnapshotContext {
            data,
            units: Units::default(),
            fetched_at: Utc::now(),
            geofence,
        }
    }

    fn home_fence() -> Geofence {
        Geofence {
            home: HomeLocation {
                latitude: 40.0,
                longitude: -105.0,
            },
            radius_m: 50.0,
        }
    }

    #[test]
    fn test_closures_and_sentry() {
        let mut partition = SecurityPartition::default();
        let data = snapshot();
        partition.apply(&ctx(&data, None)).unwrap();

        let f = partition.fields();
        assert_eq!(f.get("locked"), Some(&FieldValue::Bool(true)));
        assert_eq!(f.get("frunk_open"), Some(&FieldValue::Bool(false)));
        assert_eq!(f.get("trunk_open"), Some(&FieldValue::Bool(true)));
        assert_eq!(f.get("sentry"), Some(&FieldValue::Int(1)));
        assert_eq!(f.get("software_update"), Some(&FieldValue::Int(1)));
    }

    #[test]
    fn test_sentry_unavailable_encodes_as_two() {
        let mut partition = SecurityPartition::default();
        let mut data = snapshot();
        if let Some(v) = data.vehicle_state.as_mut() {
            v.sentry_mode_available = false;
        }
        partition.apply(&ctx(&data, None)).unwrap();
        assert_eq!(
            partition.fields().get("sentry"),
            Some(&FieldValue::Int(SENTRY_UNAVAILABLE))
        );
    }

    #[test]
    fn test_missing_sunroof_uses_sentinel() {
        let mut partition = SecurityPartition::default();
        let data = snapshot();
        partition.apply(&ctx(&data, None)).unwrap();
        assert_eq!(
            partition.fields().get("sunroof_percent"),
            Some(&FieldValue::Int(SUNROOF_ABSENT))
        );
    }

    #[test]
    fn test_geofence_home_and_remote() {
        let mut partition = SecurityPartition::default();
        let data = snapshot();
        partition.apply(&ctx(&data, Some(home_fence()))).unwrap();
        assert_eq!(
            partition.fields().get("location"),
            Some(&FieldValue::Text("Home".into()))
        );

        let mut away = snapshot();
        away.drive_state = Some(DriveState {
            latitude: Some(40.1),
            longitude: Some(-105.0),
        });
        let changes = partition.apply(&ctx(&away, Some(home_fence()))).unwrap();
        assert!(changes.iter().any(
            |c| c.field == "location" && c.value == FieldValue::Text("Remote".into())
        ));
    }

    #[test]
    fn test_no_fix_reports_unknown() {
        let mut partition = SecurityPartition::default();
        let mut data = snapshot();
        data.drive_state = None;
        partition.apply(&ctx(&data, Some(home_fence()))).unwrap();
        assert_eq!(
            partition.fields().get("location"),
            Some(&FieldValue::Text("Unknown".into()))
        );
    }

    #[test]
    fn test_missing_vehicle_state_is_malformed() {
        let mut partition = SecurityPartition::default();
        let data = VehicleData::default();
        let err = partition.apply(&ctx(&data, None)).unwrap_err();
        assert!(matches!(
            err,
            CoreError::MalformedResponse {
                partition: "security"
            }
        ));
    }
}
