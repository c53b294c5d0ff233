/**
 * Session State Holder
 *
 * Keeps the application's view of the current session (who is logged in,
 * whether a login or refresh is underway, the last error) and keeps it in
 * step with the gateway's event stream. UI code reads snapshots from here
 * and reacts to `AuthChanged { is_authenticated: false }` by sending the user
 * to the login view.
 */

use std::sync::{Arc, Weak};

use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;

use crate::client::error::ClientError;
use crate::client::gateway::WeakSessionGateway;
use crate::client::identity::IdentityClient;
use crate::client::transport::{ReqwestTransport, Transport};
use crate::shared::event::SessionEvent;
use crate::shared::identity::{RegisterResponse, UserInfo};

/// Authentication state
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthState {
    pub authenticated: bool,
    pub user: Option<UserInfo>,
    pub error: Option<String>,
    pub loading: bool,
    /// A session refresh is in flight (drives a loading indicator)
    pub refreshing: bool,
}

impl AuthState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    pub fn set_error(&mut self, error: String) {
        self.error = Some(error);
    }

    fn sign_in(&mut self, user: UserInfo) {
        self.authenticated = true;
        self.user = Some(user);
        self.error = None;
    }

    fn sign_out(&mut self) {
        self.authenticated = false;
        self.user = None;
    }
}

/// Holder of the current session state
pub struct SessionStore<T: Transport = ReqwestTransport> {
    identity: IdentityClient<T>,
    state: Arc<RwLock<AuthState>>,
}

impl<T: Transport> Clone for SessionStore<T> {
    fn clone(&self) -> Self {
        Self {
            identity: self.identity.clone(),
            state: self.state.clone(),
        }
    }
}

impl<T: Transport> SessionStore<T> {
    pub fn new(identity: IdentityClient<T>) -> Self {
        Self {
            identity,
            state: Arc::new(RwLock::new(AuthState::new())),
        }
    }

    /// Copy of the current state
    pub async fn snapshot(&self) -> AuthState {
        self.state.read().await.clone()
    }

    pub async fn is_authenticated(&self) -> bool {
        self.state.read().await.authenticated
    }

    pub async fn current_user(&self) -> Option<UserInfo> {
        self.state.read().await.user.clone()
    }

    /// Re-check the session against `GET /me`
    ///
    /// An expired session goes through the gateway's refresh first; whatever
    /// failure remains leaves the state unauthenticated.
    pub async fn verify(&self) -> Option<UserInfo> {
        self.state.write().await.loading = true;
        let result = self.identity.me().await;

        let mut state = self.state.write().await;
        state.loading = false;
        match result {
            Ok(user) => {
                state.sign_in(user.clone());
                Some(user)
            }
            Err(err) => {
                if !err.is_unauthorized() {
                    tracing::warn!("[Session] Failed to load profile: {}", err);
                }
                state.sign_out();
                None
            }
        }
    }

    /// Log in and load the profile
    pub async fn login(&self, email: &str, password: &str) -> Result<UserInfo, ClientError> {
        {
            let mut state = self.state.write().await;
            state.loading = true;
            state.clear_error();
        }

        if let Err(err) = self.identity.login(email, password).await {
            let mut state = self.state.write().await;
            state.sign_out();
            state.loading = false;
            state.set_error(err.to_string());
            return Err(err);
        }

        let grace = self.identity.gateway().config().refresh_grace();
        if !grace.is_zero() {
            tokio::time::sleep(grace).await;
        }
        self.identity.gateway().notify_auth_changed(true);

        let profile = self.identity.me().await;
        let mut state = self.state.write().await;
        state.loading = false;
        match profile {
            Ok(user) => {
                tracing::info!("[Session] Logged in as {}", user.email);
                state.sign_in(user.clone());
                Ok(user)
            }
            Err(err) => {
                tracing::error!("[Session] Login succeeded but profile fetch failed: {}", err);
                state.sign_out();
                let err = ClientError::MissingProfile;
                state.set_error(err.to_string());
                Err(err)
            }
        }
    }

    /// Register an account; the user still has to log in afterwards
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<RegisterResponse, ClientError> {
        self.identity.register(name, email, password).await
    }

    /// Log out; local state is cleared even when the server call fails
    ///
    /// When the session had already expired the gateway announces the
    /// sign-out itself, and no second `AuthChanged(false)` is sent.
    pub async fn logout(&self) {
        self.state.write().await.loading = true;
        let mut events = self.identity.gateway().subscribe();
        if let Err(err) = self.identity.logout().await {
            tracing::warn!("[Session] Logout failed on server: {}", err);
        }
        {
            let mut state = self.state.write().await;
            state.sign_out();
            state.loading = false;
        }

        let announced = std::iter::from_fn(|| events.try_recv().ok())
            .any(|event| event.is_authenticated() == Some(false));
        if !announced {
            self.identity.gateway().notify_auth_changed(false);
        }
    }

    /// Apply one gateway event to the state
    pub async fn handle_event(&self, event: &SessionEvent) {
        match event {
            SessionEvent::RefreshStarted => self.state.write().await.refreshing = true,
            SessionEvent::RefreshEnded => self.state.write().await.refreshing = false,
            SessionEvent::AuthChanged {
                is_authenticated: false,
                ..
            } => {
                // Re-verifying here would hit /me, fail, refresh, fail and
                // announce another logout.
                self.state.write().await.sign_out();
            }
            SessionEvent::AuthChanged {
                is_authenticated: true,
                ..
            } => {
                let stale = {
                    let state = self.state.read().await;
                    !state.authenticated && !state.loading
                };
                if stale {
                    self.verify().await;
                }
            }
        }
    }

    /// Follow the gateway's events in a background task
    ///
    /// The task holds no strong handle to the store or the gateway. It ends
    /// when the last gateway handle is dropped (the event channel closes) or
    /// when an event arrives after the last store handle is gone.
    pub fn spawn_listener(&self) -> JoinHandle<()> {
        let gateway = self.identity.gateway();
        let events = gateway.subscribe();
        tokio::spawn(listen(events, gateway.downgrade(), Arc::downgrade(&self.state)))
    }
}

async fn listen<T: Transport>(
    mut events: broadcast::Receiver<SessionEvent>,
    gateway: WeakSessionGateway<T>,
    state: Weak<RwLock<AuthState>>,
) {
    loop {
        match events.recv().await {
            Ok(event) => {
                let (Some(gateway), Some(state)) = (gateway.upgrade(), state.upgrade()) else {
                    break;
                };
                let store = SessionStore {
                    identity: IdentityClient::new(gateway),
                    state,
                };
                store.handle_event(&event).await;
            }
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!("[Session] Listener lagged; skipped {} events", skipped);
            }
            Err(RecvError::Closed) => break,
        }
    }
    tracing::debug!("[Session] Event listener stopped");
}
