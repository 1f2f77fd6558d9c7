//! Synchronization engine for intermittently-reachable electric
//! vehicles.
//!
//! The engine polls a vendor cloud API on a two-speed schedule, keeps
//! one serialized pipeline per vehicle, decides when a sleeping vehicle
//! may be woken, and fans fetched snapshots out into independent state
//! partitions that report only changed fields.
//!
//! Hosts construct an [`Engine`] with a transport client and an
//! [`EngineConfig`], call [`Engine::discover`] once, then drive
//! [`Engine::on_tick`] from their own scheduler.

pub mod api;
pub mod command;
pub mod config;
pub mod engine;
pub mod error;
pub mod partition;
pub mod retry;
pub mod serializer;
pub mod session;
pub mod store;
pub mod wake;

pub use api::VehicleApi;
pub use command::{
    ChargeCommand, ChargeLimit, ClimateCommand, CommandCategory, CommandGates,
    ConditioningCommand, HeatLevel, Seat, SecurityCommand, VehicleCommand,
};
pub use config::{EngineConfig, HomeLocation, RetrySchedule};
pub use engine::{Engine, EngineEvent, TickReport, VehicleIdentity};
pub use error::CoreError;
pub use partition::{FieldChange, FieldValue, Units};
pub use session::{NullTokenStore, SessionManager, TokenStore};
pub use store::{IngestReport, VehicleStore};
pub use wake::{TickKind, WakeMode, WakeRecord};
