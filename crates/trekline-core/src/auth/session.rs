use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use serde_json::{Map, Value};
use tracing::{debug, error, info, warn};

use super::claims::Claims;
use super::credentials::CredentialStore;
use super::error::AuthError;
use super::navigation::NavigationReset;

/// Lifecycle of the process-wide session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Stored credential not inspected yet
    Unchecked,
    Authenticated,
    Unauthenticated,
}

/// Why a session is being torn down
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeardownReason {
    Logout,
    /// Expiration detected on the client before a call was sent
    Expired,
    /// Server rejected the credential
    Rejected,
    /// Stored credential could not be decoded
    Unreadable,
}

impl TeardownReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            TeardownReason::Logout => "logout",
            TeardownReason::Expired => "expired",
            TeardownReason::Rejected => "rejected",
            TeardownReason::Unreadable => "unreadable",
        }
    }
}

/// The authenticated identity.
#[derive(Debug, Clone)]
pub struct Session {
    token: String,
    claims: Claims,
    pub established_at: DateTime<Utc>,
}

impl Session {
    fn new(token: String, claims: Claims) -> Self {
        Self {
            token,
            claims,
            established_at: Utc::now(),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn claims(&self) -> &Claims {
        &self.claims
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.claims.expires_at()
    }

    pub fn is_expired(&self) -> bool {
        self.claims.is_expired()
    }

    /// Time left before the token expires; `None` if it never does
    pub fn time_until_expiry(&self) -> Option<Duration> {
        self.expires_at().map(|exp| exp - Utc::now())
    }

    /// Get minutes remaining until expiry (for display)
    pub fn minutes_until_expiry(&self) -> Option<i64> {
        self.time_until_expiry().map(|d| d.num_minutes().max(0))
    }

    /// Stable identifier of the signed-in user: subject, then email
    pub fn owner_id(&self) -> Option<&str> {
        self.claims.subject().or_else(|| self.claims.email())
    }

    /// Best human-readable identity: name, then email, then subject
    pub fn display_name(&self) -> Option<&str> {
        self.claims
            .get_str("name")
            .or_else(|| self.claims.email())
            .or_else(|| self.claims.subject())
    }
}

struct Inner {
    state: SessionState,
    session: Option<Session>,
    /// Bumped on every transition between authenticated and unauthenticated
    epoch: u64,
}

/// Single authority over the process-wide session.
///
/// State lives behind a synchronous mutex that is never held across an
/// await. Credential writes (login, teardown) are serialized by an async
/// write lock so a teardown can never delete a credential stored by a login
/// that raced it.
pub struct SessionManager {
    credentials: CredentialStore,
    navigator: Arc<dyn NavigationReset>,
    inner: Mutex<Inner>,
    write_lock: tokio::sync::Mutex<()>,
}

impl SessionManager {
    pub fn new(credentials: CredentialStore, navigator: Arc<dyn NavigationReset>) -> Self {
        Self {
            credentials,
            navigator,
            inner: Mutex::new(Inner {
                state: SessionState::Unchecked,
                session: None,
                epoch: 0,
            }),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    fn inner(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn state(&self) -> SessionState {
        self.inner().state
    }

    pub fn session(&self) -> Option<Session> {
        self.inner().session.clone()
    }

    pub fn epoch(&self) -> u64 {
        self.inner().epoch
    }

    pub fn is_authenticated(&self) -> bool {
        self.state() == SessionState::Authenticated
    }

    /// Owner of the current session, if one is established
    pub fn owner(&self) -> Option<String> {
        let inner = self.inner();
        match (&inner.state, &inner.session) {
            (SessionState::Authenticated, Some(session)) => session.owner_id().map(str::to_string),
            _ => None,
        }
    }

    /// Read the persisted credential, as the request pipeline does before
    /// every call.
    pub async fn stored_credential(&self) -> Result<Option<String>> {
        self.credentials.load().await
    }

    /// Resolve the startup state from the stored credential.
    ///
    /// The first call moves out of `Unchecked`. Later calls re-validate the
    /// current session against the clock instead.
    pub async fn check_current_state(&self) -> SessionState {
        let guard = self.write_lock.lock().await;

        if self.state() != SessionState::Unchecked {
            drop(guard);
            return self.validate().await;
        }

        let stored = match self.credentials.load().await {
            Ok(stored) => stored,
            Err(e) => {
                warn!(error = %e, "Failed to read stored credential, starting unauthenticated");
                None
            }
        };

        let Some(token) = stored else {
            self.inner().state = SessionState::Unauthenticated;
            info!("No stored credential");
            return SessionState::Unauthenticated;
        };

        match Claims::decode(&token) {
            Ok(claims) if !claims.is_expired() => {
                let session = Session::new(token, claims);
                debug!(expires_at = ?session.expires_at(), "Restored session from stored credential");
                let mut inner = self.inner();
                inner.state = SessionState::Authenticated;
                inner.session = Some(session);
                inner.epoch += 1;
                SessionState::Authenticated
            }
            Ok(_) => {
                self.teardown_locked(Some(&token), TeardownReason::Expired).await;
                SessionState::Unauthenticated
            }
            Err(e) => {
                warn!(error = %e, "Stored credential is unreadable");
                self.teardown_locked(Some(&token), TeardownReason::Unreadable).await;
                SessionState::Unauthenticated
            }
        }
    }

    /// Establish a session from a freshly issued credential.
    ///
    /// Decoding happens before anything is persisted; on any error the
    /// current state is left untouched.
    pub async fn login(
        &self,
        token: &str,
        supplemental_identity: Map<String, Value>,
    ) -> Result<Session, AuthError> {
        let token = token.trim();
        let mut claims = Claims::decode(token)?;
        if claims.is_expired() {
            return Err(AuthError::InvalidCredential(
                "credential is already expired".to_string(),
            ));
        }
        claims.merge(supplemental_identity);

        let _guard = self.write_lock.lock().await;
        self.credentials.save(token).await?;

        let session = Session::new(token.to_string(), claims);
        {
            let mut inner = self.inner();
            inner.state = SessionState::Authenticated;
            inner.session = Some(session.clone());
            inner.epoch += 1;
        }
        info!(user = ?session.claims().subject(), expires_at = ?session.expires_at(), "Login successful");
        Ok(session)
    }

    /// Idempotent logout. Returns whether a session was actually torn down.
    pub async fn logout(&self) -> bool {
        self.teardown(None, TeardownReason::Logout).await
    }

    /// Tear down whatever session is current, regardless of credential.
    pub async fn force_teardown(&self, reason: TeardownReason) -> bool {
        self.teardown(None, reason).await
    }

    /// Tear down the session that was using `token`.
    ///
    /// Concurrent calls for the same credential collapse into one teardown
    /// and one navigation reset. A failure observed for an older credential
    /// leaves a newer session alone.
    pub async fn invalidate(&self, token: &str, reason: TeardownReason) -> bool {
        self.teardown(Some(token), reason).await
    }

    /// Re-check the current session against the clock, tearing it down if
    /// it has expired since it was established.
    pub async fn validate(&self) -> SessionState {
        let expired = {
            let inner = self.inner();
            match (&inner.state, &inner.session) {
                (SessionState::Authenticated, Some(session)) if session.is_expired() => {
                    Some(session.token.clone())
                }
                _ => None,
            }
        };

        if let Some(token) = expired {
            self.invalidate(&token, TeardownReason::Expired).await;
        }
        self.state()
    }

    async fn teardown(&self, expected: Option<&str>, reason: TeardownReason) -> bool {
        let _guard = self.write_lock.lock().await;
        self.teardown_locked(expected, reason).await
    }

    /// Caller must hold `write_lock`.
    async fn teardown_locked(&self, expected: Option<&str>, reason: TeardownReason) -> bool {
        let won = {
            let mut inner = self.inner();
            let applies = match inner.state {
                SessionState::Unauthenticated => false,
                // Only a credential observed in the store can end an
                // unchecked session; a bare logout leaves the check pending.
                SessionState::Unchecked => expected.is_some(),
                SessionState::Authenticated => match (expected, &inner.session) {
                    (Some(token), Some(session)) => session.token == token,
                    _ => true,
                },
            };
            if applies {
                inner.state = SessionState::Unauthenticated;
                inner.session = None;
                inner.epoch += 1;
            }
            applies
        };

        if won {
            if let Err(e) = self.credentials.clear().await {
                error!(error = %e, "Failed to delete credential during teardown");
            }
            info!(reason = reason.as_str(), "Session torn down");
            self.navigator.reset_to_entry();
            return true;
        }

        // Already unauthenticated, but the expired token may still be on disk
        // if an earlier delete failed.
        if let Some(token) = expected {
            if let Ok(Some(stored)) = self.credentials.load().await {
                if stored == token {
                    if let Err(e) = self.credentials.clear().await {
                        warn!(error = %e, "Failed to delete stale credential");
                    }
                }
            }
        }
        debug!(reason = reason.as_str(), "Teardown skipped, session already closed");
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::claims::unsigned_token;
    use crate::auth::navigation::ResetSignal;
    use crate::storage::MemoryStore;
    use serde_json::json;

    fn manager() -> (SessionManager, CredentialStore, Arc<ResetSignal>) {
        let creds = CredentialStore::new(Arc::new(MemoryStore::new()));
        let signal = Arc::new(ResetSignal::new());
        let mgr = SessionManager::new(creds.clone(), signal.clone());
        (mgr, creds, signal)
    }

    fn token_expiring_in(secs: i64) -> String {
        unsigned_token(&json!({"sub": "u1", "exp": Utc::now().timestamp() + secs}))
    }

    #[tokio::test]
    async fn test_check_without_credential() {
        let (mgr, _, signal) = manager();
        assert_eq!(mgr.state(), SessionState::Unchecked);
        assert_eq!(mgr.check_current_state().await, SessionState::Unauthenticated);
        assert_eq!(signal.count(), 0);
    }

    #[tokio::test]
    async fn test_check_restores_valid_credential() {
        let (mgr, creds, signal) = manager();
        let token = token_expiring_in(3600);
        creds.save(&token).await.unwrap();

        assert_eq!(mgr.check_current_state().await, SessionState::Authenticated);
        assert_eq!(mgr.session().unwrap().token(), token);
        assert_eq!(signal.count(), 0);
    }

    #[tokio::test]
    async fn test_check_with_expired_credential_tears_down_once() {
        let (mgr, creds, signal) = manager();
        creds.save(&token_expiring_in(-1)).await.unwrap();

        assert_eq!(mgr.check_current_state().await, SessionState::Unauthenticated);
        assert_eq!(creds.load().await.unwrap(), None);
        assert_eq!(signal.count(), 1);

        // Checking again does not fire another reset
        assert_eq!(mgr.check_current_state().await, SessionState::Unauthenticated);
        assert_eq!(signal.count(), 1);
    }

    #[tokio::test]
    async fn test_check_with_garbage_credential() {
        let (mgr, creds, signal) = manager();
        creds.save("not-a-token").await.unwrap();

        assert_eq!(mgr.check_current_state().await, SessionState::Unauthenticated);
        assert_eq!(creds.load().await.unwrap(), None);
        assert_eq!(signal.count(), 1);
    }

    #[tokio::test]
    async fn test_login_rejects_malformed_without_state_change() {
        let (mgr, creds, _) = manager();
        mgr.check_current_state().await;

        let err = mgr.login("garbage", Map::new()).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredential(_)));
        assert_eq!(mgr.state(), SessionState::Unauthenticated);
        assert_eq!(creds.load().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_login_rejects_already_expired() {
        let (mgr, creds, _) = manager();
        mgr.check_current_state().await;

        let err = mgr.login(&token_expiring_in(-10), Map::new()).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredential(_)));
        assert_eq!(creds.load().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_login_merges_supplemental_identity() {
        let (mgr, creds, _) = manager();
        mgr.check_current_state().await;

        let token = token_expiring_in(600);
        let mut extra = Map::new();
        extra.insert("name".into(), json!("Asha"));
        let session = mgr.login(&token, extra).await.unwrap();

        assert_eq!(session.display_name(), Some("Asha"));
        assert_eq!(session.claims().subject(), Some("u1"));
        assert_eq!(mgr.state(), SessionState::Authenticated);
        assert_eq!(creds.load().await.unwrap().as_deref(), Some(token.as_str()));
    }

    #[tokio::test]
    async fn test_login_without_exp_never_expires() {
        let (mgr, _, signal) = manager();
        mgr.check_current_state().await;

        let token = unsigned_token(&json!({"sub": "forever"}));
        let session = mgr.login(&token, Map::new()).await.unwrap();
        assert_eq!(session.expires_at(), None);
        assert_eq!(session.minutes_until_expiry(), None);

        assert_eq!(mgr.validate().await, SessionState::Authenticated);
        assert!(mgr.logout().await);
        assert_eq!(signal.count(), 1);
    }

    #[tokio::test]
    async fn test_logout_is_idempotent() {
        let (mgr, _, signal) = manager();
        mgr.check_current_state().await;
        assert!(!mgr.logout().await);
        assert_eq!(signal.count(), 0);

        mgr.login(&token_expiring_in(600), Map::new()).await.unwrap();
        assert!(mgr.logout().await);
        assert!(!mgr.logout().await);
        assert_eq!(signal.count(), 1);
        assert_eq!(mgr.state(), SessionState::Unauthenticated);
    }

    #[tokio::test]
    async fn test_logout_before_check_is_a_no_op() {
        let (mgr, creds, signal) = manager();
        let token = token_expiring_in(600);
        creds.save(&token).await.unwrap();

        assert!(!mgr.logout().await);
        assert!(!mgr.force_teardown(TeardownReason::Rejected).await);
        assert_eq!(mgr.state(), SessionState::Unchecked);
        assert_eq!(signal.count(), 0);

        // The pending check still restores the stored session
        assert_eq!(mgr.check_current_state().await, SessionState::Authenticated);
        assert_eq!(creds.load().await.unwrap().as_deref(), Some(token.as_str()));
    }

    #[tokio::test]
    async fn test_invalidate_before_check_clears_observed_credential() {
        let (mgr, creds, signal) = manager();
        let token = token_expiring_in(-5);
        creds.save(&token).await.unwrap();

        assert!(mgr.invalidate(&token, TeardownReason::Expired).await);
        assert_eq!(mgr.state(), SessionState::Unauthenticated);
        assert_eq!(creds.load().await.unwrap(), None);
        assert_eq!(signal.count(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_invalidation_fires_one_reset() {
        let (mgr, creds, signal) = manager();
        mgr.check_current_state().await;
        let token = token_expiring_in(600);
        mgr.login(&token, Map::new()).await.unwrap();

        let results = futures::future::join_all(vec![
            mgr.invalidate(&token, TeardownReason::Rejected),
            mgr.invalidate(&token, TeardownReason::Expired),
            mgr.invalidate(&token, TeardownReason::Rejected),
        ])
        .await;

        assert_eq!(results.iter().filter(|won| **won).count(), 1);
        assert_eq!(signal.count(), 1);
        assert_eq!(creds.load().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_invalidate_for_old_token_keeps_new_session() {
        let (mgr, creds, signal) = manager();
        mgr.check_current_state().await;

        let old = token_expiring_in(600);
        mgr.login(&old, Map::new()).await.unwrap();
        let new = unsigned_token(&json!({"sub": "u2", "exp": Utc::now().timestamp() + 900}));
        mgr.login(&new, Map::new()).await.unwrap();

        assert!(!mgr.invalidate(&old, TeardownReason::Rejected).await);
        assert_eq!(mgr.state(), SessionState::Authenticated);
        assert_eq!(creds.load().await.unwrap().as_deref(), Some(new.as_str()));
        assert_eq!(signal.count(), 0);
    }

    #[tokio::test]
    async fn test_epoch_tracks_transitions() {
        let (mgr, _, _) = manager();
        mgr.check_current_state().await;
        let start = mgr.epoch();

        mgr.login(&token_expiring_in(600), Map::new()).await.unwrap();
        assert_eq!(mgr.epoch(), start + 1);
        mgr.logout().await;
        assert_eq!(mgr.epoch(), start + 2);
        mgr.logout().await;
        assert_eq!(mgr.epoch(), start + 2);
    }
}
