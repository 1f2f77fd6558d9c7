//! Async client for the vehicle vendor's owner API.
//!
//! This crate is the transport layer only: OAuth grants, vehicle state
//! queries, wake requests, and command dispatch, with the vendor's
//! status-code conventions mapped to a typed error taxonomy
//! (408 → [`Error::VehicleUnreachable`], 401 → [`Error::Unauthorized`]).
//!
//! Session lifecycle, retry/wake policy, and state fan-out live in
//! `voltsync-core`.

pub mod auth;
pub mod client;
pub mod error;
pub mod models;
pub mod transport;

pub use auth::{AccountCredentials, TokenSet};
pub use client::VehicleClient;
pub use error::Error;
pub use models::{
    ChargeState, ClimateState, CommandOutcome, CommandRequest, CoverAction, DriveState,
    GuiSettings, SoftwareUpdate, TrunkSelector, VehicleData, VehicleState, VehicleSummary,
};
pub use transport::TransportConfig;
