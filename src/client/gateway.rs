//! # Session-Aware Request Gateway
//!
//! Every API call in the application goes through a [`SessionGateway`]. The
//! gateway dispatches the request and, when the backend answers 401, runs the
//! session refresh protocol:
//!
//! 1. Exempt requests (login, the refresh call itself) and requests that were
//!    already replayed once get the 401 back untouched.
//! 2. If a refresh is already in flight the request is parked in the queue
//!    and replayed (or rejected) when that refresh settles.
//! 3. Otherwise this request leads a new refresh cycle: it flips the state to
//!    `RefreshInFlight`, broadcasts [`SessionEvent::RefreshStarted`] and calls
//!    the refresh endpoint. On success it waits the configured grace period,
//!    releases the queue and replays itself. On failure it rejects the queue
//!    with the refresh error, broadcasts `AuthChanged { is_authenticated:
//!    false }` and returns the refresh error.
//!
//! Whatever happens, the cycle ends by clearing the state and broadcasting
//! [`SessionEvent::RefreshEnded`]. The cycle is an RAII guard, so this also
//! holds when the leading caller's future is dropped mid-refresh; queued
//! callers then receive [`GatewayError::RefreshAbandoned`].
//!
//! ## Concurrency
//!
//! The refresh state and queue sit behind a `std::sync::Mutex` that is never
//! held across an `.await`. Checking for an in-flight refresh and claiming
//! the slot happen in one critical section, and the queue is drained in the
//! same critical section that clears the flag, so a new cycle never starts
//! before the previous queue is empty.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use docportal::client::{ReqwestTransport, SessionGateway};
//! use docportal::shared::config::GatewayConfig;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = GatewayConfig::from_env()?;
//! let gateway = SessionGateway::new(ReqwestTransport::new(config.clone())?, config);
//!
//! let mut events = gateway.subscribe();
//! let profile = gateway.get("/api/v1/identity/me").await?;
//! # Ok(())
//! # }
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use serde::Serialize;
use tokio::sync::{broadcast, oneshot};

use crate::client::transport::{ApiRequest, ApiResponse, ReqwestTransport, Transport};
use crate::shared::config::GatewayConfig;
use crate::shared::error::GatewayError;
use crate::shared::event::{broadcast_event, SessionEvent, SessionEventBroadcast};

/// Whether a session refresh is currently running
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshState {
    Idle,
    RefreshInFlight,
}

type Waiter = oneshot::Sender<Result<(), GatewayError>>;

#[derive(Debug, Default)]
struct RefreshSlot {
    in_flight: bool,
    waiters: Vec<Waiter>,
}

struct GatewayInner<T> {
    transport: T,
    config: GatewayConfig,
    events: SessionEventBroadcast,
    refresh: Mutex<RefreshSlot>,
}

impl<T> GatewayInner<T> {
    fn slot(&self) -> MutexGuard<'_, RefreshSlot> {
        // Plain data; a poisoned lock is still consistent.
        self.refresh.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Request dispatcher that transparently recovers expired sessions
pub struct SessionGateway<T: Transport = ReqwestTransport> {
    inner: Arc<GatewayInner<T>>,
}

impl<T: Transport> Clone for SessionGateway<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

/// Non-owning gateway handle for background tasks
///
/// Holding one does not keep the event channel open.
pub struct WeakSessionGateway<T: Transport = ReqwestTransport> {
    inner: Weak<GatewayInner<T>>,
}

impl<T: Transport> Clone for WeakSessionGateway<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Transport> WeakSessionGateway<T> {
    /// The gateway, if any strong handle is still alive
    pub fn upgrade(&self) -> Option<SessionGateway<T>> {
        self.inner.upgrade().map(|inner| SessionGateway { inner })
    }
}

enum Admission<'a, T> {
    Leader(RefreshCycle<'a, T>),
    Queued(oneshot::Receiver<Result<(), GatewayError>>),
}

enum CycleOutcome {
    Refreshed,
    Failed(GatewayError),
    Abandoned,
}

/// One refresh cycle, owned by the request that started it
struct RefreshCycle<'a, T> {
    inner: &'a GatewayInner<T>,
    settled: bool,
}

impl<T> RefreshCycle<'_, T> {
    fn settle(mut self, outcome: CycleOutcome) {
        self.finish(outcome);
    }

    fn finish(&mut self, outcome: CycleOutcome) {
        if self.settled {
            return;
        }
        self.settled = true;

        let result = match &outcome {
            CycleOutcome::Refreshed => Ok(()),
            CycleOutcome::Failed(err) => Err(err.clone()),
            CycleOutcome::Abandoned => Err(GatewayError::RefreshAbandoned),
        };

        let released = {
            let mut slot = self.inner.slot();
            let waiters = std::mem::take(&mut slot.waiters);
            let released = waiters.len();
            for waiter in waiters {
                // A waiter whose caller went away has nothing left to resume.
                let _ = waiter.send(result.clone());
            }
            if matches!(outcome, CycleOutcome::Failed(_)) {
                broadcast_event(&self.inner.events, SessionEvent::auth_changed(false));
            }
            slot.in_flight = false;
            released
        };

        match outcome {
            CycleOutcome::Refreshed => {
                tracing::info!("[Gateway] Session refreshed; releasing {} queued requests", released)
            }
            CycleOutcome::Failed(err) => {
                tracing::warn!("[Gateway] Session refresh failed ({}); rejecting {} queued requests", err, released)
            }
            CycleOutcome::Abandoned => {
                tracing::warn!("[Gateway] Session refresh abandoned; rejecting {} queued requests", released)
            }
        }

        broadcast_event(&self.inner.events, SessionEvent::RefreshEnded);
    }
}

impl<T> Drop for RefreshCycle<'_, T> {
    fn drop(&mut self) {
        self.finish(CycleOutcome::Abandoned);
    }
}

impl<T: Transport> SessionGateway<T> {
    pub fn new(transport: T, config: GatewayConfig) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity());
        Self {
            inner: Arc::new(GatewayInner {
                transport,
                config,
                events,
                refresh: Mutex::new(RefreshSlot::default()),
            }),
        }
    }

    pub fn downgrade(&self) -> WeakSessionGateway<T> {
        WeakSessionGateway {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Subscribe to session events
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    /// Broadcast an authentication change observed outside the refresh protocol
    ///
    /// Login and logout flows use this so every listener sees one event stream.
    pub fn notify_auth_changed(&self, is_authenticated: bool) -> usize {
        broadcast_event(&self.inner.events, SessionEvent::auth_changed(is_authenticated))
    }

    pub fn refresh_state(&self) -> RefreshState {
        if self.inner.slot().in_flight {
            RefreshState::RefreshInFlight
        } else {
            RefreshState::Idle
        }
    }

    /// Number of requests parked behind the in-flight refresh
    pub fn queued_requests(&self) -> usize {
        self.inner.slot().waiters.len()
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.inner.config
    }

    pub fn transport(&self) -> &T {
        &self.inner.transport
    }

    /// Dispatch a request, recovering from an expired session at most once
    ///
    /// # Errors
    ///
    /// - [`GatewayError::Transport`] when no response was obtained
    /// - [`GatewayError::Status`] for non-2xx responses that could not be recovered
    /// - the refresh call's own error when the session could not be refreshed
    /// - [`GatewayError::RefreshAbandoned`] when the refresh this request was
    ///   queued behind was dropped before settling
    pub async fn send(&self, mut request: ApiRequest) -> Result<ApiResponse, GatewayError> {
        match self.dispatch(&request).await {
            Err(err) if err.is_unauthorized() && request.refreshable() => {}
            Err(err) if err.is_unauthorized() => {
                tracing::debug!(
                    "[Gateway] {} {} unauthorized (exempt: {}, retried: {}); not refreshing",
                    request.method(),
                    request.path(),
                    request.is_exempt(),
                    request.is_retried()
                );
                return Err(err);
            }
            other => return other,
        }

        request.mark_retried();

        match self.admit() {
            Admission::Queued(waiter) => {
                tracing::debug!(
                    "[Gateway] Request {} ({} {}) queued behind in-flight refresh",
                    request.id(),
                    request.method(),
                    request.path()
                );
                match waiter.await {
                    Ok(Ok(())) => self.dispatch(&request).await,
                    Ok(Err(err)) => Err(err),
                    Err(_) => Err(GatewayError::RefreshAbandoned),
                }
            }
            Admission::Leader(cycle) => {
                tracing::info!(
                    "[Gateway] Session expired on {} {}; refreshing",
                    request.method(),
                    request.path()
                );
                match self.refresh_session().await {
                    Ok(()) => {
                        cycle.settle(CycleOutcome::Refreshed);
                        self.dispatch(&request).await
                    }
                    Err(err) => {
                        cycle.settle(CycleOutcome::Failed(err.clone()));
                        Err(err)
                    }
                }
            }
        }
    }

    pub async fn get(&self, path: &str) -> Result<ApiResponse, GatewayError> {
        self.send(ApiRequest::get(path)).await
    }

    pub async fn post<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<ApiResponse, GatewayError> {
        self.send(ApiRequest::post(path).json(body)?).await
    }

    pub async fn put<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<ApiResponse, GatewayError> {
        self.send(ApiRequest::put(path).json(body)?).await
    }

    pub async fn patch<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<ApiResponse, GatewayError> {
        self.send(ApiRequest::patch(path).json(body)?).await
    }

    pub async fn delete(&self, path: &str) -> Result<ApiResponse, GatewayError> {
        self.send(ApiRequest::delete(path)).await
    }

    /// Single dispatch: non-2xx becomes `GatewayError::Status`
    async fn dispatch(&self, request: &ApiRequest) -> Result<ApiResponse, GatewayError> {
        let response = self.inner.transport.execute(request).await?;
        response.error_for_status()
    }

    /// Claim the refresh slot or join the queue, without yielding in between
    fn admit(&self) -> Admission<'_, T> {
        let mut slot = self.inner.slot();
        if slot.in_flight {
            let (tx, rx) = oneshot::channel();
            slot.waiters.push(tx);
            return Admission::Queued(rx);
        }
        slot.in_flight = true;
        drop(slot);

        broadcast_event(&self.inner.events, SessionEvent::RefreshStarted);
        Admission::Leader(RefreshCycle {
            inner: self.inner.as_ref(),
            settled: false,
        })
    }

    async fn refresh_session(&self) -> Result<(), GatewayError> {
        let request = ApiRequest::post(self.inner.config.refresh_path()).exempt();
        self.dispatch(&request).await?;

        let grace = self.inner.config.refresh_grace();
        if !grace.is_zero() {
            tokio::time::sleep(grace).await;
        }
        Ok(())
    }
}
