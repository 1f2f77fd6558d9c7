// ── Remote client seam ──
//
// The engine never talks to `VehicleClient` directly; it goes through
// this trait so tests can script vehicle behavior (asleep, waking,
// expired tokens) without a live endpoint. `Send` bounds on the
// returned futures let the engine run inside spawned tasks.

use std::future::Future;

use voltsync_api::{
    AccountCredentials, CommandRequest, Error, TokenSet, VehicleClient, VehicleData,
    VehicleSummary,
};

/// The remote vehicle API as the engine sees it.
///
/// Errors use the transport taxonomy (`voltsync_api::Error`); the
/// engine translates them into [`CoreError`](crate::CoreError) at the
/// boundary.
pub trait VehicleApi: Send + Sync + 'static {
    fn login(
        &self,
        credentials: &AccountCredentials,
    ) -> impl Future<Output = Result<TokenSet, Error>> + Send;

    fn refresh(&self, refresh_token: &str)
    -> impl Future<Output = Result<TokenSet, Error>> + Send;

    fn list_vehicles(
        &self,
        token: &str,
    ) -> impl Future<Output = Result<Vec<VehicleSummary>, Error>> + Send;

    fn vehicle_summary(
        &self,
        token: &str,
        vehicle_id: &str,
    ) -> impl Future<Output = Result<VehicleSummary, Error>> + Send;

    fn vehicle_data(
        &self,
        token: &str,
        vehicle_id: &str,
    ) -> impl Future<Output = Result<VehicleData, Error>> + Send;

    fn wake(
        &self,
        token: &str,
        vehicle_id: &str,
    ) -> impl Future<Output = Result<VehicleSummary, Error>> + Send;

    fn command(
        &self,
        token: &str,
        vehicle_id: &str,
        request: &CommandRequest,
    ) -> impl Future<Output = Result<(), Error>> + Send;
}

impl VehicleApi for VehicleClient {
    async fn login(&self, credentials: &AccountCredentials) -> Result<TokenSet, Error> {
        VehicleClient::login(self, credentials).await
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenSet, Error> {
        VehicleClient::refresh(self, refresh_token).await
    }

    async fn list_vehicles(&self, token: &str) -> Result<Vec<VehicleSummary>, Error> {
        VehicleClient::list_vehicles(self, token).await
    }

    async fn vehicle_summary(&self, token: &str, vehicle_id: &str) -> Result<VehicleSummary, Error> {
        VehicleClient::vehicle_summary(self, token, vehicle_id).await
    }

    async fn vehicle_data(&self, token: &str, vehicle_id: &str) -> Result<VehicleData, Error> {
        VehicleClient::vehicle_data(self, token, vehicle_id).await
    }

    async fn wake(&self, token: &str, vehicle_id: &str) -> Result<VehicleSummary, Error> {
        VehicleClient::wake(self, token, vehicle_id).await
    }

    async fn command(
        &self,
        token: &str,
        vehicle_id: &str,
        request: &CommandRequest,
    ) -> Result<(), Error> {
        VehicleClient::command(self, token, vehicle_id, request).await
    }
}
