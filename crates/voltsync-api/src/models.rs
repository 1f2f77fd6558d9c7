// Wire models for the vendor owner API.
//
// Sub-objects of `VehicleData` are all optional: the vendor omits any
// of them when the vehicle did not report that section this cycle.
// Consumers must treat a missing section as "no data", not as zeroes.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Generic envelope wrapping every data response: `{ "response": … }`.
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
    pub response: T,
}

/// Result payload of a command endpoint:
/// `{ "response": { "result": bool, "reason": str } }`.
#[derive(Debug, Deserialize)]
pub struct CommandOutcome {
    pub result: bool,
    #[serde(default)]
    pub reason: String,
}

/// A vehicle as returned by the list/summary endpoints.
///
/// `id` is the key used for all subsequent API calls; `vehicle_id` is a
/// distinct stable identifier used by the mobile apps for addressing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehicleSummary {
    #[serde(alias = "id_s")]
    pub id: String,
    pub vehicle_id: u64,
    pub display_name: String,
    /// Reported connectivity: "online", "asleep", or "offline".
    pub state: String,
}

impl VehicleSummary {
    pub fn is_online(&self) -> bool {
        self.state.eq_ignore_ascii_case("online")
    }
}

/// The full state blob for one vehicle.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct VehicleData {
    #[serde(default)]
    pub state: String,
    pub charge_state: Option<ChargeState>,
    pub climate_state: Option<ClimateState>,
    pub vehicle_state: Option<VehicleState>,
    pub drive_state: Option<DriveState>,
    pub gui_settings: Option<GuiSettings>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ChargeState {
    pub battery_level: i64,
    /// Rated range in miles, regardless of the vehicle's display unit.
    pub battery_range: f64,
    pub charge_enable_request: bool,
    /// "Charging", "Stopped", "Disconnected", "Complete", …
    pub charging_state: String,
    pub fast_charger_present: bool,
    pub charge_limit_soc: i64,
    pub charger_actual_current: i64,
    pub charger_voltage: i64,
    /// Kilowatts on the wire; consumers usually want watts.
    pub charger_power: i64,
    pub charge_port_door_open: bool,
    /// "Engaged" when the cable is latched.
    #[serde(default)]
    pub charge_port_latch: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ClimateState {
    pub is_auto_conditioning_on: bool,
    pub driver_temp_setting: Option<f64>,
    pub passenger_temp_setting: Option<f64>,
    pub seat_heater_left: Option<i64>,
    pub seat_heater_right: Option<i64>,
    pub seat_heater_rear_left: Option<i64>,
    pub seat_heater_rear_center: Option<i64>,
    pub seat_heater_rear_right: Option<i64>,
    pub seat_heater_third_row_left: Option<i64>,
    pub seat_heater_third_row_right: Option<i64>,
    /// Nonzero while max defrost is active.
    pub defrost_mode: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct VehicleState {
    /// Odometer in miles, regardless of the vehicle's display unit.
    pub odometer: f64,
    pub locked: bool,
    /// Front trunk ajar indicator: 0 = closed.
    #[serde(default)]
    pub ft: i64,
    /// Rear trunk ajar indicator: 0 = closed.
    #[serde(default)]
    pub rt: i64,
    /// Absent on vehicles without a panoramic roof.
    pub sun_roof_percent_open: Option<i64>,
    #[serde(default)]
    pub sentry_mode: bool,
    #[serde(default)]
    pub sentry_mode_available: bool,
    #[serde(default)]
    pub software_update: SoftwareUpdate,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SoftwareUpdate {
    /// "", "available", "scheduled", or "installing".
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DriveState {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GuiSettings {
    /// e.g. "mi/hr" or "km/hr".
    #[serde(default)]
    pub gui_distance_units: String,
    /// "F" or "C".
    #[serde(default)]
    pub gui_temperature_units: String,
}

// ── Command wire requests ───────────────────────────────────────────

/// A command as dispatched to `POST /api/1/vehicles/{id}/command/{name}`.
///
/// Each variant knows its endpoint suffix and JSON body. Argument
/// validation happens upstream in `voltsync-core`; this enum carries
/// already-validated wire values.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandRequest {
    ChargeStart,
    ChargeStop,
    SetChargeLimit { percent: u8 },
    ChargePortOpen,
    ChargePortClose,
    DoorLock,
    DoorUnlock,
    HonkHorn,
    FlashLights,
    AutoConditioningStart,
    AutoConditioningStop,
    SetTemps { driver_c: f64, passenger_c: f64 },
    SeatHeater { heater: u8, level: u8 },
    MaxDefrost { on: bool },
    SetSentryMode { on: bool },
    ActuateTrunk { which: TrunkSelector },
    WindowControl { command: CoverAction },
    SunRoofControl { state: CoverAction },
    ScheduleSoftwareUpdate,
}

/// Which trunk to actuate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrunkSelector {
    Front,
    Rear,
}

impl TrunkSelector {
    fn wire(self) -> &'static str {
        match self {
            Self::Front => "front",
            Self::Rear => "rear",
        }
    }
}

/// Valid positions for windows and the panoramic sunroof. The vendor
/// disabled the percentage-based positions server-side years ago; only
/// vent and close remain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoverAction {
    Vent,
    Close,
}

impl CoverAction {
    fn wire(self) -> &'static str {
        match self {
            Self::Vent => "vent",
            Self::Close => "close",
        }
    }
}

impl CommandRequest {
    /// The endpoint suffix under `/command/`.
    pub fn endpoint(&self) -> &'static str {
        match self {
            Self::ChargeStart => "charge_start",
            Self::ChargeStop => "charge_stop",
            Self::SetChargeLimit { .. } => "set_charge_limit",
            Self::ChargePortOpen => "charge_port_door_open",
            Self::ChargePortClose => "charge_port_door_close",
            Self::DoorLock => "door_lock",
            Self::DoorUnlock => "door_unlock",
            Self::HonkHorn => "honk_horn",
            Self::FlashLights => "flash_lights",
            Self::AutoConditioningStart => "auto_conditioning_start",
            Self::AutoConditioningStop => "auto_conditioning_stop",
            Self::SetTemps { .. } => "set_temps",
            Self::SeatHeater { .. } => "remote_seat_heater_request",
            Self::MaxDefrost { .. } => "set_preconditioning_max",
            Self::SetSentryMode { .. } => "set_sentry_mode",
            Self::ActuateTrunk { .. } => "actuate_trunk",
            Self::WindowControl { .. } => "window_control",
            Self::SunRoofControl { .. } => "sun_roof_control",
            Self::ScheduleSoftwareUpdate => "schedule_software_update",
        }
    }

    /// The JSON body, or `None` for bodyless commands.
    pub fn body(&self) -> Option<Value> {
        match self {
            Self::SetChargeLimit { percent } => Some(json!({ "percent": percent })),
            Self::SetTemps {
                driver_c,
                passenger_c,
            } => Some(json!({ "driver_temp": driver_c, "passenger_temp": passenger_c })),
            Self::SeatHeater { heater, level } => {
                Some(json!({ "heater": heater, "level": level }))
            }
            Self::MaxDefrost { on } | Self::SetSentryMode { on } => Some(json!({ "on": on })),
            Self::ActuateTrunk { which } => Some(json!({ "which_trunk": which.wire() })),
            // Window control requires a location pair; zeroes are accepted.
            Self::WindowControl { command } => {
                Some(json!({ "command": command.wire(), "lat": 0, "long": 0 }))
            }
            Self::SunRoofControl { state } => Some(json!({ "state": state.wire() })),
            Self::ScheduleSoftwareUpdate => Some(json!({ "offset_sec": 0 })),
            _ => None,
        }
    }
}
