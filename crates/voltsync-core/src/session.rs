// ── Credential and session lifecycle ──
//
// One `SessionManager` per account. It owns the token slot; everything
// else asks it for a bearer token on demand and never caches one.
// Refresh decisions are centralized here so concurrent pollers cannot
// race each other into duplicate grants.

use std::sync::Arc;
use std::time::Duration;

use secrecy::ExposeSecret;
use tracing::{debug, info, warn};
use voltsync_api::{AccountCredentials, TokenSet};

use crate::CoreError;
use crate::api::VehicleApi;

/// Seconds before expiry at which a token is treated as already stale.
const REFRESH_WINDOW_SECS: i64 = 60;

/// Durable storage for the token set, so a restart does not burn a
/// fresh password grant.
pub trait TokenStore: Send + Sync {
    fn load(&self) -> Result<Option<TokenSet>, CoreError>;
    fn save(&self, tokens: &TokenSet) -> Result<(), CoreError>;
    fn clear(&self) -> Result<(), CoreError>;
}

/// A no-op store for hosts that don't persist sessions.
#[derive(Debug, Default)]
pub struct NullTokenStore;

impl TokenStore for NullTokenStore {
    fn load(&self) -> Result<Option<TokenSet>, CoreError> {
        Ok(None)
    }
    fn save(&self, _tokens: &TokenSet) -> Result<(), CoreError> {
        Ok(())
    }
    fn clear(&self) -> Result<(), CoreError> {
        Ok(())
    }
}

/// Manages the OAuth session for one account.
pub struct SessionManager<C: VehicleApi> {
    client: Arc<C>,
    credentials: AccountCredentials,
    store: Arc<dyn TokenStore>,
    tokens: tokio::sync::Mutex<Option<TokenSet>>,
    /// Grace period after a grant before the token is considered usable.
    /// The vendor's auth backend propagates new tokens asynchronously.
    settle_delay: Duration,
}

impl<C: VehicleApi> SessionManager<C> {
    pub fn new(
        client: Arc<C>,
        credentials: AccountCredentials,
        store: Arc<dyn TokenStore>,
        settle_delay: Duration,
    ) -> Self {
        Self {
            client,
            credentials,
            store,
            tokens: tokio::sync::Mutex::new(None),
            settle_delay,
        }
    }

    /// Returns a bearer token, acquiring or refreshing as needed.
    ///
    /// With `force_refresh` the current access token is discarded even
    /// if it looks valid; callers use this after a request bounced with
    /// 401 despite a seemingly-fresh token.
    pub async fn access_token(&self, force_refresh: bool) -> Result<String, CoreError> {
        let mut slot = self.tokens.lock().await;

        // First call after startup: try the durable store before
        // falling back to a password grant.
        if slot.is_none() {
            match self.store.load() {
                Ok(Some(saved)) if saved.is_complete() => {
                    debug!("restored session tokens from store");
                    *slot = Some(saved);
                }
                Ok(_) => {}
                Err(err) => warn!(error = %err, "failed to load saved tokens"),
            }
        }

        match slot.as_ref() {
            None => {
                let fresh = self.login().await?;
                let token = fresh.access_token.clone();
                *slot = Some(fresh);
                Ok(token)
            }
            Some(current) => {
                let stale = force_refresh
                    || current.expires_within(
                        chrono::Utc::now(),
                        chrono::Duration::seconds(REFRESH_WINDOW_SECS),
                    );
                if !stale {
                    return Ok(current.access_token.clone());
                }
                match self.refresh(&current.refresh_token).await {
                    Ok(fresh) => {
                        let token = fresh.access_token.clone();
                        *slot = Some(fresh);
                        Ok(token)
                    }
                    Err(err) if err.is_unauthorized() => {
                        // The refresh token itself is dead. Drop the
                        // whole session so the next attempt starts from
                        // a clean password grant.
                        warn!("refresh token rejected; clearing saved session");
                        *slot = None;
                        if let Err(store_err) = self.store.clear() {
                            warn!(error = %store_err, "failed to clear token store");
                        }
                        Err(err)
                    }
                    Err(err) => Err(err),
                }
            }
        }
    }

    /// Drops the in-memory and persisted session. The next
    /// `access_token` call performs a full login.
    pub async fn invalidate(&self) {
        let mut slot = self.tokens.lock().await;
        *slot = None;
        if let Err(err) = self.store.clear() {
            warn!(error = %err, "failed to clear token store");
        }
    }

    async fn login(&self) -> Result<TokenSet, CoreError> {
        info!(email = %self.credentials.email, "logging in with password grant");
        let tokens = self.client.login(&self.credentials).await?;
        self.persist_and_settle(&tokens).await;
        Ok(tokens)
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenSet, CoreError> {
        debug!("refreshing access token");
        let tokens = self.client.refresh(refresh_token).await?;
        self.persist_and_settle(&tokens).await;
        Ok(tokens)
    }

    async fn persist_and_settle(&self, tokens: &TokenSet) {
        if let Err(err) = self.store.save(tokens) {
            warn!(error = %err, "failed to persist tokens");
        }
        if !self.settle_delay.is_zero() {
            tokio::time::sleep(self.settle_delay).await;
        }
    }
}

impl<C: VehicleApi> std::fmt::Debug for SessionManager<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("email", &self.credentials.email)
            // Never log the password; note only whether one is set.
            .field(
                "has_password",
                &!self.credentials.password.expose_secret().is_empty(),
            )
            .finish_non_exhaustive()
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    use voltsync_api::{CommandRequest, Error, VehicleData, VehicleSummary};

    use super::*;

    fn token_set(access: &str, created_at: i64) -> TokenSet {
        TokenSet {
            access_token: access.into(),
            refresh_token: format!("{access}-refresh"),
            token_type: "bearer".into(),
            created_at,
            expires_in: 3600,
        }
    }

    fn fresh_tokens(access: &str) -> TokenSet {
        token_set(access, chrono::Utc::now().timestamp())
    }

    fn stale_tokens(access: &str) -> TokenSet {
        // Expires 30s from now, inside the refresh window.
        token_set(access, chrono::Utc::now().timestamp() - 3570)
    }

    #[derive(Default)]
    struct FakeApi {
        logins: AtomicU32,
        refreshes: AtomicU32,
        refresh_fails_unauthorized: bool,
    }

    impl VehicleApi for FakeApi {
        async fn login(&self, _c: &AccountCredentials) -> Result<TokenSet, Error> {
            let n = self.logins.fetch_add(1, Ordering::SeqCst);
            Ok(fresh_tokens(&format!("login-{n}")))
        }
        async fn refresh(&self, _rt: &str) -> Result<TokenSet, Error> {
            self.refreshes.fetch_add(1, Ordering::SeqCst);
            if self.refresh_fails_unauthorized {
                return Err(Error::Unauthorized);
            }
            Ok(fresh_tokens("refreshed"))
        }
        async fn list_vehicles(&self, _t: &str) -> Result<Vec<VehicleSummary>, Error> {
            Ok(vec![])
        }
        async fn vehicle_summary(&self, _t: &str, _id: &str) -> Result<VehicleSummary, Error> {
            unimplemented!()
        }
        async fn vehicle_data(&self, _t: &str, _id: &str) -> Result<VehicleData, Error> {
            unimplemented!()
        }
        async fn wake(&self, _t: &str, _id: &str) -> Result<VehicleSummary, Error> {
            unimplemented!()
        }
        async fn command(&self, _t: &str, _id: &str, _r: &CommandRequest) -> Result<(), Error> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct MemoryStore {
        slot: Mutex<Option<TokenSet>>,
        cleared: AtomicU32,
    }

    impl TokenStore for MemoryStore {
        fn load(&self) -> Result<Option<TokenSet>, CoreError> {
            Ok(self.slot.lock().unwrap().clone())
        }
        fn save(&self, tokens: &TokenSet) -> Result<(), CoreError> {
            *self.slot.lock().unwrap() = Some(tokens.clone());
            Ok(())
        }
        fn clear(&self) -> Result<(), CoreError> {
            self.cleared.fetch_add(1, Ordering::SeqCst);
            *self.slot.lock().unwrap() = None;
            Ok(())
        }
    }

    fn manager(api: Arc<FakeApi>, store: Arc<MemoryStore>) -> SessionManager<FakeApi> {
        SessionManager::new(
            api,
            AccountCredentials {
                email: "owner@example.com".into(),
                password: "pw".to_string().into(),
            },
            store,
            Duration::ZERO,
        )
    }

    #[tokio::test]
    async fn test_first_call_logs_in_and_persists() {
        let api = Arc::new(FakeApi::default());
        let store = Arc::new(MemoryStore::default());
        let session = manager(api.clone(), store.clone());

        let token = session.access_token(false).await.unwrap();
        assert_eq!(token, "login-0");
        assert_eq!(api.logins.load(Ordering::SeqCst), 1);
        assert!(store.slot.lock().unwrap().is_some());
    }

    #[tokio::test]
    async fn test_valid_token_is_reused_without_network() {
        let api = Arc::new(FakeApi::default());
        let store = Arc::new(MemoryStore::default());
        store.save(&fresh_tokens("saved")).unwrap();
        let session = manager(api.clone(), store);

        let token = session.access_token(false).await.unwrap();
        assert_eq!(token, "saved");
        assert_eq!(api.logins.load(Ordering::SeqCst), 0);
        assert_eq!(api.refreshes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_near_expiry_token_is_refreshed() {
        let api = Arc::new(FakeApi::default());
        let store = Arc::new(MemoryStore::default());
        store.save(&stale_tokens("old")).unwrap();
        let session = manager(api.clone(), store);

        let token = session.access_token(false).await.unwrap();
        assert_eq!(token, "refreshed");
        assert_eq!(api.refreshes.load(Ordering::SeqCst), 1);
        assert_eq!(api.logins.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_force_refresh_discards_valid_token() {
        let api = Arc::new(FakeApi::default());
        let store = Arc::new(MemoryStore::default());
        store.save(&fresh_tokens("valid")).unwrap();
        let session = manager(api.clone(), store);

        let token = session.access_token(true).await.unwrap();
        assert_eq!(token, "refreshed");
        assert_eq!(api.refreshes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_dead_refresh_token_clears_session() {
        let api = Arc::new(FakeApi {
            refresh_fails_unauthorized: true,
            ..FakeApi::default()
        });
        let store = Arc::new(MemoryStore::default());
        store.save(&stale_tokens("old")).unwrap();
        let session = manager(api.clone(), store.clone());

        let err = session.access_token(false).await.unwrap_err();
        assert!(err.is_unauthorized());
        assert!(store.slot.lock().unwrap().is_none());
        assert!(store.cleared.load(Ordering::SeqCst) >= 1);

        // Next call starts over with a password grant.
        api.refreshes.store(0, Ordering::SeqCst);
        let session2 = manager(
            Arc::new(FakeApi::default()),
            Arc::new(MemoryStore::default()),
        );
        let token = session2.access_token(false).await.unwrap();
        assert_eq!(token, "login-0");
    }

    #[tokio::test]
    async fn test_incomplete_saved_tokens_are_ignored() {
        let api = Arc::new(FakeApi::default());
        let store = Arc::new(MemoryStore::default());
        store
            .save(&TokenSet {
                access_token: String::new(),
                refresh_token: "rt".into(),
                token_type: "bearer".into(),
                created_at: 0,
                expires_in: 0,
            })
            .unwrap();
        let session = manager(api.clone(), store);

        let token = session.access_token(false).await.unwrap();
        assert_eq!(token, "login-0");
    }
}
