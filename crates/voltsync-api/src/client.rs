// Vendor owner-API HTTP client
//
// Wraps `reqwest::Client` with URL construction, `{ "response": … }`
// envelope unwrapping, and status-code mapping. The vendor signals
// "vehicle asleep" with HTTP 408 and an expired/invalid token with 401;
// both are mapped to dedicated error variants so callers can branch on
// them without inspecting status codes.

use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, info};
use url::Url;

use crate::auth::{AccountCredentials, TokenSet};
use crate::error::Error;
use crate::models::{CommandOutcome, CommandRequest, Envelope, VehicleData, VehicleSummary};
use crate::transport::TransportConfig;

// OAuth client pair for the owner API. These are the vendor's published
// first-party app identifiers, not account secrets.
const OAUTH_CLIENT_ID: &str = "81527cff06843c8634fdc09e8ac0abefb46ac849f38fe1e431c2ef2106796384";
const OAUTH_CLIENT_SECRET: &str =
    "c7257eb71a564034f9419ee651c7d0e5f7aa6bfbd18bafb5c5c033b093bb2fa3";

/// Raw HTTP client for the vendor owner API.
///
/// Stateless with respect to credentials: every call takes the bearer
/// token explicitly. Session lifecycle (login, refresh, persistence)
/// lives in `voltsync-core`.
pub struct VehicleClient {
    http: reqwest::Client,
    base_url: Url,
}

impl VehicleClient {
    /// Create a new client against `base_url`
    /// (e.g. `https://owner-api.vendor.example`).
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self { http, base_url })
    }

    /// Create a client with a pre-built `reqwest::Client` (tests).
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self { http, base_url }
    }

    /// The API base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── OAuth flows ──────────────────────────────────────────────────

    /// Exchange account credentials for a token pair (password grant).
    pub async fn login(&self, credentials: &AccountCredentials) -> Result<TokenSet, Error> {
        info!("requesting new tokens (password grant)");
        self.oauth_request(&json!({
            "grant_type": "password",
            "client_id": OAUTH_CLIENT_ID,
            "client_secret": OAUTH_CLIENT_SECRET,
            "email": credentials.email,
            "password": credentials.password.expose_secret(),
        }))
        .await
    }

    /// Exchange a refresh token for a new token pair.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenSet, Error> {
        info!("refreshing tokens");
        self.oauth_request(&json!({
            "grant_type": "refresh_token",
            "client_id": OAUTH_CLIENT_ID,
            "client_secret": OAUTH_CLIENT_SECRET,
            "refresh_token": refresh_token,
        }))
        .await
    }

    async fn oauth_request(&self, body: &serde_json::Value) -> Result<TokenSet, Error> {
        let url = self.base_url.join("/oauth/token")?;
        let resp = self.http.post(url).json(body).send().await?;

        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(Error::Unauthorized);
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Authentication {
                message: format!("token request failed (HTTP {status}): {body}"),
            });
        }

        let body = resp.text().await?;
        serde_json::from_str(&body).map_err(|e| Error::Deserialization {
            message: e.to_string(),
            body,
        })
    }

    // ── Vehicle queries ──────────────────────────────────────────────

    /// List all vehicles on the account.
    pub async fn list_vehicles(&self, token: &str) -> Result<Vec<VehicleSummary>, Error> {
        let url = self.base_url.join("/api/1/vehicles")?;
        self.get(token, url, "").await
    }

    /// Fetch the summary (connectivity state) for one vehicle.
    ///
    /// This endpoint answers even when the vehicle is asleep, so it can
    /// report asleep/offline without waking anything.
    pub async fn vehicle_summary(
        &self,
        token: &str,
        vehicle_id: &str,
    ) -> Result<VehicleSummary, Error> {
        let url = self.base_url.join(&format!("/api/1/vehicles/{vehicle_id}"))?;
        self.get(token, url, vehicle_id).await
    }

    /// Fetch the full state blob for one vehicle.
    ///
    /// Fails with [`Error::VehicleUnreachable`] when the vehicle is
    /// asleep — use [`wake`](Self::wake) first if a response is required.
    pub async fn vehicle_data(&self, token: &str, vehicle_id: &str) -> Result<VehicleData, Error> {
        let url = self
            .base_url
            .join(&format!("/api/1/vehicles/{vehicle_id}/vehicle_data"))?;
        self.get(token, url, vehicle_id).await
    }

    /// Ask the vehicle to wake up. Returns the (possibly still waking)
    /// summary; callers poll afterwards rather than trusting the state
    /// field here.
    pub async fn wake(&self, token: &str, vehicle_id: &str) -> Result<VehicleSummary, Error> {
        let url = self
            .base_url
            .join(&format!("/api/1/vehicles/{vehicle_id}/wake_up"))?;
        debug!(vehicle_id, "POST wake_up");

        let resp = self.http.post(url).bearer_auth(token).send().await?;
        self.parse_envelope(resp, vehicle_id).await
    }

    /// Dispatch a command to the vehicle.
    ///
    /// A transport-level success with `result: false` in the payload is
    /// surfaced as [`Error::CommandRejected`].
    pub async fn command(
        &self,
        token: &str,
        vehicle_id: &str,
        request: &CommandRequest,
    ) -> Result<(), Error> {
        let url = self.base_url.join(&format!(
            "/api/1/vehicles/{vehicle_id}/command/{}",
            request.endpoint()
        ))?;
        debug!(vehicle_id, command = request.endpoint(), "POST command");

        let mut req = self.http.post(url).bearer_auth(token);
        if let Some(body) = request.body() {
            req = req.json(&body);
        }
        let resp = req.send().await?;

        let outcome: CommandOutcome = self.parse_envelope(resp, vehicle_id).await?;
        if outcome.result {
            Ok(())
        } else {
            Err(Error::CommandRejected {
                reason: outcome.reason,
            })
        }
    }

    // ── Request helpers ──────────────────────────────────────────────

    async fn get<T: DeserializeOwned>(
        &self,
        token: &str,
        url: Url,
        vehicle_id: &str,
    ) -> Result<T, Error> {
        debug!("GET {}", url);
        let resp = self.http.get(url).bearer_auth(token).send().await?;
        self.parse_envelope(resp, vehicle_id).await
    }

    /// Map the status code, then unwrap the `{ "response": … }` envelope.
    async fn parse_envelope<T: DeserializeOwned>(
        &self,
        resp: reqwest::Response,
        vehicle_id: &str,
    ) -> Result<T, Error> {
        let status = resp.status();

        match status {
            reqwest::StatusCode::UNAUTHORIZED => return Err(Error::Unauthorized),
            reqwest::StatusCode::REQUEST_TIMEOUT => {
                return Err(Error::VehicleUnreachable {
                    vehicle_id: vehicle_id.to_owned(),
                });
            }
            reqwest::StatusCode::TOO_MANY_REQUESTS => {
                let retry_after_secs = resp
                    .headers()
                    .get(reqwest::header::RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(60);
                return Err(Error::RateLimited { retry_after_secs });
            }
            _ => {}
        }

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Api {
                message: body,
                status: status.as_u16(),
            });
        }

        let body = resp.text().await?;
        let envelope: Envelope<T> =
            serde_json::from_str(&body).map_err(|e| Error::Deserialization {
                message: e.to_string(),
                body,
            })?;
        Ok(envelope.response)
    }
}
