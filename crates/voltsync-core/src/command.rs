// ── Vehicle commands and gating ──
//
// The public command surface. Arguments are validated here, before
// anything touches the wire; security-sensitive categories can be
// switched off per deployment and are checked by the engine before
// dispatch.

use voltsync_api::{CommandRequest, CoverAction, TrunkSelector};

use crate::CoreError;

/// Security-sensitive command categories that can be individually
/// enabled. Commands outside these categories (charging control, horn,
/// lights, climate) are always allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandCategory {
    Lock,
    Sunroof,
    Windows,
    Trunk,
    Frunk,
    ChargePort,
    Sentry,
    SoftwareUpdate,
}

impl CommandCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lock => "lock",
            Self::Sunroof => "sunroof",
            Self::Windows => "windows",
            Self::Trunk => "trunk",
            Self::Frunk => "frunk",
            Self::ChargePort => "charge_port",
            Self::Sentry => "sentry",
            Self::SoftwareUpdate => "software_update",
        }
    }
}

/// Which sensitive categories a deployment permits.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandGates {
    /// Master switch: allow every category.
    pub allow_all: bool,
    /// Individually enabled categories (ignored when `allow_all`).
    pub enabled: Vec<CommandCategory>,
}

impl CommandGates {
    pub fn permits(&self, category: CommandCategory) -> bool {
        self.allow_all || self.enabled.contains(&category)
    }
}

// ── Validated argument types ────────────────────────────────────────

/// Charge limit as a state-of-charge percentage, 1..=100.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChargeLimit(u8);

impl ChargeLimit {
    pub fn new(percent: u8) -> Result<Self, CoreError> {
        if (1..=100).contains(&percent) {
            Ok(Self(percent))
        } else {
            Err(CoreError::InvalidArgument {
                message: format!("charge limit must be 1-100, got {percent}"),
            })
        }
    }

    pub fn percent(self) -> u8 {
        self.0
    }
}

/// A heated seat position. Wire indexes are not contiguous: 3 and 6 do
/// not exist on any model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Seat {
    FrontLeft,
    FrontRight,
    RearLeft,
    RearCenter,
    RearRight,
    ThirdRowLeft,
    ThirdRowRight,
}

impl Seat {
    pub fn wire_index(self) -> u8 {
        match self {
            Self::FrontLeft => 0,
            Self::FrontRight => 1,
            Self::RearLeft => 2,
            Self::RearCenter => 4,
            Self::RearRight => 5,
            Self::ThirdRowLeft => 7,
            Self::ThirdRowRight => 8,
        }
    }
}

/// Seat heater intensity, 0 (off) to 3 (high).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeatLevel(u8);

impl HeatLevel {
    pub fn new(level: u8) -> Result<Self, CoreError> {
        if level <= 3 {
            Ok(Self(level))
        } else {
            Err(CoreError::InvalidArgument {
                message: format!("seat heater level must be 0-3, got {level}"),
            })
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

// ── Command surface ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ChargeCommand {
    Start,
    Stop,
    SetLimit(ChargeLimit),
    PortOpen,
    PortClose,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SecurityCommand {
    Lock,
    Unlock,
    HonkHorn,
    FlashLights,
    TrunkToggle,
    FrunkToggle,
    SentryMode { on: bool },
    Sunroof(CoverAction),
    Windows(CoverAction),
    ScheduleSoftwareUpdate,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClimateCommand {
    SeatHeater { seat: Seat, level: HeatLevel },
    SetTemps { driver_c: f64, passenger_c: f64 },
    MaxDefrost { on: bool },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConditioningCommand {
    Start,
    Stop,
}

/// A validated vehicle command, grouped by the state partition it
/// primarily affects.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VehicleCommand {
    Charge(ChargeCommand),
    Security(SecurityCommand),
    Climate(ClimateCommand),
    Conditioning(ConditioningCommand),
}

impl VehicleCommand {
    /// The gate category this command falls under, or `None` if it is
    /// always allowed.
    pub fn category(&self) -> Option<CommandCategory> {
        match self {
            Self::Charge(ChargeCommand::PortOpen | ChargeCommand::PortClose) => {
                Some(CommandCategory::ChargePort)
            }
            Self::Charge(_) | Self::Climate(_) | Self::Conditioning(_) => None,
            Self::Security(cmd) => match cmd {
                SecurityCommand::Lock | SecurityCommand::Unlock => Some(CommandCategory::Lock),
                SecurityCommand::TrunkToggle => Some(CommandCategory::Trunk),
                SecurityCommand::FrunkToggle => Some(CommandCategory::Frunk),
                SecurityCommand::SentryMode { .. } => Some(CommandCategory::Sentry),
                SecurityCommand::Sunroof(_) => Some(CommandCategory::Sunroof),
                SecurityCommand::Windows(_) => Some(CommandCategory::Windows),
                SecurityCommand::ScheduleSoftwareUpdate => Some(CommandCategory::SoftwareUpdate),
                SecurityCommand::HonkHorn | SecurityCommand::FlashLights => None,
            },
        }
    }

    /// Lowers the validated command to its wire request.
    pub fn to_request(self) -> CommandRequest {
        match self {
            Self::Charge(cmd) => match cmd {
                ChargeCommand::Start => CommandRequest::ChargeStart,
                ChargeCommand::Stop => CommandRequest::ChargeStop,
                ChargeCommand::SetLimit(limit) => CommandRequest::SetChargeLimit {
                    percent: limit.percent(),
                },
                ChargeCommand::PortOpen => CommandRequest::ChargePortOpen,
                ChargeCommand::PortClose => CommandRequest::ChargePortClose,
            },
            Self::Security(cmd) => match cmd {
                SecurityCommand::Lock => CommandRequest::DoorLock,
                SecurityCommand::Unlock => CommandRequest::DoorUnlock,
                SecurityCommand::HonkHorn => CommandRequest::HonkHorn,
                SecurityCommand::FlashLights => CommandRequest::FlashLights,
                SecurityCommand::TrunkToggle => CommandRequest::ActuateTrunk {
                    which: TrunkSelector::Rear,
                },
                SecurityCommand::FrunkToggle => CommandRequest::ActuateTrunk {
                    which: TrunkSelector::Front,
                },
                SecurityCommand::SentryMode { on } => CommandRequest::SetSentryMode { on },
                SecurityCommand::Sunroof(state) => CommandRequest::SunRoofControl { state },
                SecurityCommand::Windows(command) => CommandRequest::WindowControl { command },
                SecurityCommand::ScheduleSoftwareUpdate => CommandRequest::ScheduleSoftwareUpdate,
            },
            Self::Climate(cmd) => match cmd {
                ClimateCommand::SeatHeater { seat, level } => CommandRequest::SeatHeater {
                    heater: seat.wire_index(),
                    level: level.value(),
                },
                ClimateCommand::SetTemps {
                    driver_c,
                    passenger_c,
                } => CommandRequest::SetTemps {
                    driver_c,
                    passenger_c,
                },
                ClimateCommand::MaxDefrost { on } => CommandRequest::MaxDefrost { on },
            },
            Self::Conditioning(cmd) => match cmd {
                ConditioningCommand::Start => CommandRequest::AutoConditioningStart,
                ConditioningCommand::Stop => CommandRequest::AutoConditioningStop,
            },
        }
    }
}
