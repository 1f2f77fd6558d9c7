// Charging partition: battery, charger, and odometer fields.

use super::{FieldChange, FieldSet, Partition, SnapshotContext};
use crate::CoreError;

const NAME: &str = "charging";

/// Projects `charge_state` (plus the odometer and connectivity flag)
/// into flat fields.
#[derive(Debug, Default)]
pub struct ChargingPartition {
    fields: FieldSet,
}

impl Partition for ChargingPartition {
    fn name(&self) -> &'static str {
        NAME
    }

    fn apply(&mut self, ctx: &SnapshotContext<'_>) -> Result<Vec<FieldChange>, CoreError> {
        let Some(charge) = ctx.data.charge_state.as_ref() else {
            return Err(CoreError::MalformedResponse { partition: NAME });
        };

        let mut out = Vec::new();
        let f = &mut self.fields;

        f.set(NAME, "online", ctx.data.state == "online", &mut out);
        f.set(NAME, "battery_soc", charge.battery_level, &mut out);
        f.set(
            NAME,
            "battery_range",
            ctx.units.display_distance(charge.battery_range),
            &mut out,
        );
        f.set(
            NAME,
            "charging",
            charge.charging_state == "Charging",
            &mut out,
        );
        f.set(NAME, "charge_state", charge.charging_state.as_str(), &mut out);
        f.set(NAME, "charge_enabled", charge.charge_enable_request, &mut out);
        f.set(NAME, "fast_charger", charge.fast_charger_present, &mut out);
        f.set(NAME, "charge_limit", charge.charge_limit_soc, &mut out);
        f.set(NAME, "charger_current", charge.charger_actual_current, &mut out);
        f.set(NAME, "charger_voltage", charge.charger_voltage, &mut out);
        // Wire reports kilowatts; expose watts.
        f.set(NAME, "charger_power", charge.charger_power * 1000, &mut out);

        if let Some(vehicle) = ctx.data.vehicle_state.as_ref() {
            f.set(
                NAME,
                "odometer",
                ctx.units.display_distance(vehicle.odometer),
                &mut out,
            );
        }

        Ok(out)
    }

    fn fields(&self) -> &FieldSet {
        &self.fields
    }
}
