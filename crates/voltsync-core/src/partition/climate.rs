// Climate partition: seat heaters, setpoints, defrost.
//
// Seat heater fields are per-model: a five-seat car never reports the
// third row. Optional readings that a snapshot omits simply keep their
// previous value rather than flapping to a default.

use super::{FieldChange, FieldSet, Partition, SnapshotContext};
use crate::CoreError;

const NAME: &str = "climate";

#[derive(Debug, Default)]
pub struct ClimatePartition {
    fields: FieldSet,
}

impl Partition for ClimatePartition {
    fn name(&self) -> &'static str {
        NAME
    }

    fn apply(&mut self, ctx: &SnapshotContext<'_>) -> Result<Vec<FieldChange>, CoreError> {
        let Some(climate) = ctx.data.climate_state.as_ref() else {
            return Err(CoreError::MalformedResponse { partition: NAME });
        };

        let mut out = Vec::new();
        let f = &mut self.fields;

        let seats: [(&'static str, Option<i64>); 7] = [
            ("seat_front_left", climate.seat_heater_left),
            ("seat_front_right", climate.seat_heater_right),
            ("seat_rear_left", climate.seat_heater_rear_left),
            ("seat_rear_center", climate.seat_heater_rear_center),
            ("seat_rear_right", climate.seat_heater_rear_right),
            ("seat_third_row_left", climate.seat_heater_third_row_left),
            ("seat_third_row_right", climate.seat_heater_third_row_right),
        ];
        for (field, level) in seats {
            if let Some(level) = level {
                f.set(NAME, field, level, &mut out);
            }
        }

        if let Some(temp) = climate.driver_temp_setting {
            f.set(
                NAME,
                "driver_setpoint",
                ctx.units.display_temperature(temp),
                &mut out,
            );
        }
        if let Some(temp) = climate.passenger_temp_setting {
            f.set(
                NAME,
                "passenger_setpoint",
                ctx.units.display_temperature(temp),
                &mut out,
            );
        }

        if let Some(mode) = climate.defrost_mode {
            f.set(NAME, "max_defrost", mode != 0, &mut out);
        }

        Ok(out)
    }

    fn fields(&self) -> &FieldSet {
        &self.fields
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use voltsync_api::{ClimateState, VehicleData};

    use super::*;
    use crate::partition::{FieldValue, Units};

    fn snapshot(climate: ClimateState) -> VehicleData {
        VehicleData {
            state: "online".into(),
            climate_state: Some(climate),
            ..VehicleData::default()
        }
    }

    fn ctx(data: &VehicleData) -> SnapshotContext<'_> {
        SnapshotContext {
            data,
            units: Units::default(),
            fetched_at: Utc::now(),
            geofence: None,
        }
    }

    #[test]
    fn test_reports_only_present_seats() {
        let mut partition = ClimatePartition::default();
        let data = snapshot(ClimateState {
            seat_heater_left: Some(2),
            seat_heater_right: Some(0),
            ..ClimateState::default()
        });
        partition.apply(&ctx(&data)).unwrap();

        let f = partition.fields();
        assert_eq!(f.get("seat_front_left"), Some(&FieldValue::Int(2)));
        assert_eq!(f.get("seat_third_row_left"), None);
    }

    #[test]
    fn test_omitted_setpoint_keeps_previous_value() {
        let mut partition = ClimatePartition::default();
        let first = snapshot(ClimateState {
            driver_temp_setting: Some(21.0),
            ..ClimateState::default()
        });
        partition.apply(&ctx(&first)).unwrap();

        let second = snapshot(ClimateState::default());
        let changes = partition.apply(&ctx(&second)).unwrap();
        assert!(changes.is_empty());
        // 21 C displayed in the default Fahrenheit unit.
        assert_eq!(
            partition.fields().get("driver_setpoint"),
            Some(&FieldValue::Float(69.8))
        );
    }

    #[test]
    fn test_defrost_mode_maps_to_bool() {
        let mut partition = ClimatePartition::default();
        let data = snapshot(ClimateState {
            defrost_mode: Some(2),
            ..ClimateState::default()
        });
        partition.apply(&ctx(&data)).unwrap();
        assert_eq!(
            partition.fields().get("max_defrost"),
            Some(&FieldValue::Bool(true))
        );
    }

    #[test]
    fn test_missing_climate_state_is_malformed() {
        let mut partition = ClimatePartition::default();
        let data = VehicleData {
            state: "online".into(),
            ..VehicleData::default()
        };
        let err = partition.apply(&ctx(&data)).unwrap_err();
        assert!(matches!(
            err,
            CoreError::MalformedResponse {
                partition: "climate"
            }
        ));
    }
}
