// ── Polling engine ──
//
// Full lifecycle management for one authenticated cloud session: login,
// device discovery, one polling task per grill, command submission
// serialized against each grill's poll cycle, and reachability tracking
// through the per-task state machine.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use emberlink_api::CloudClient;
use emberlink_api::auth::TokenManager;
use emberlink_api::codec::{self, GrillMode, Probe};
use emberlink_api::transport::TransportConfig;

use crate::config::ClientConfig;
use crate::error::CoreError;
use crate::model::{GrillCommand, GrillDevice, GrillKey, GrillSnapshot, PollOutcome};
use crate::reachability::ReachabilityTracker;
use crate::store::GrillStore;

// ── SessionState ─────────────────────────────────────────────────────

/// Session lifecycle observable by consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum SessionState {
    Idle,
    Connecting,
    Active,
    /// The refresh token was rejected. Polling is halted until
    /// [`GrillClient::reauthenticate`] succeeds.
    AuthExpired,
    Stopped,
}

// ── GrillClient ──────────────────────────────────────────────────────

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc`. Manages login, discovery, per-grill
/// polling tasks, and command routing. Reads are non-blocking snapshot
/// accessors; writes validate synchronously and return once the cloud
/// acknowledges the submission.
#[derive(Clone)]
pub struct GrillClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    config: ClientConfig,
    api: CloudClient,
    store: GrillStore,
    session_state: watch::Sender<SessionState>,
    /// Replaced wholesale on re-authentication; tasks hold clones.
    cancel: Mutex<CancellationToken>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    /// Grills that already have a polling task.
    spawned: Mutex<HashSet<GrillKey>>,
}

impl GrillClient {
    /// Create a client from configuration. Does NOT connect -- call
    /// [`connect()`](Self::connect) to authenticate and start polling.
    pub fn new(config: ClientConfig) -> Result<Self, CoreError> {
        let transport = TransportConfig {
            timeout: config.timeout,
            ..TransportConfig::default()
        };
        let http = transport.build_client().map_err(CoreError::from)?;
        let auth = TokenManager::new(
            http.clone(),
            config.cognito.clone(),
            config.credentials.clone(),
            config.refresh_margin,
        );
        let api = CloudClient::with_client(http, config.api_base.clone(), auth);

        let (session_state, _) = watch::channel(SessionState::Idle);
        Ok(Self {
            inner: Arc::new(ClientInner {
                config,
                api,
                store: GrillStore::new(),
                session_state,
                cancel: Mutex::new(CancellationToken::new()),
                tasks: Mutex::new(Vec::new()),
                spawned: Mutex::new(HashSet::new()),
            }),
        })
    }

    /// Access the client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Access the underlying store directly.
    pub fn store(&self) -> &GrillStore {
        &self.inner.store
    }

    // ── Session lifecycle ────────────────────────────────────────────

    /// Authenticate, discover grills, and start polling each one.
    pub async fn connect(&self) -> Result<(), CoreError> {
        let _ = self.inner.session_state.send(SessionState::Connecting);

        match self.try_connect().await {
            Ok(count) => {
                if count == 0 {
                    warn!("no grills registered to this account");
                }
                let _ = self.inner.session_state.send(SessionState::Active);
                info!(grills = count, "connected to grill cloud");
                Ok(())
            }
            Err(e) => {
                let next = if e.is_auth_fatal() {
                    SessionState::AuthExpired
                } else {
                    SessionState::Idle
                };
                let _ = self.inner.session_state.send(next);
                Err(e)
            }
        }
    }

    async fn try_connect(&self) -> Result<usize, CoreError> {
        self.inner.api.login().await.map_err(CoreError::from)?;
        self.refresh_devices().await
    }

    /// Re-run discovery, registering (and starting to poll) any grills
    /// added to the account since the last pass. Existing grills keep
    /// their accumulated polling state.
    pub async fn refresh_devices(&self) -> Result<usize, CoreError> {
        let records = self.inner.api.list_grills().await.map_err(CoreError::from)?;
        let total = records.len();

        for record in records {
            let device = GrillDevice::from(record);
            let key = device.key();
            if self.inner.store.register(device.clone()) {
                debug!(grill = %key, name = device.display_name(), "discovered grill");
            }
            self.ensure_polling(device).await;
        }
        self.inner.store.mark_discovery();
        Ok(total)
    }

    /// Log in again with the stored credentials after a fatal auth
    /// failure, then resume polling every known grill.
    pub async fn reauthenticate(&self) -> Result<(), CoreError> {
        self.stop_tasks().await;
        let _ = self.inner.session_state.send(SessionState::Connecting);

        if let Err(e) = self.inner.api.login().await {
            let _ = self.inner.session_state.send(SessionState::AuthExpired);
            return Err(e.into());
        }

        *self.inner.cancel.lock().await = CancellationToken::new();
        for device in self.inner.store.devices() {
            self.ensure_polling(device).await;
        }

        let _ = self.inner.session_state.send(SessionState::Active);
        info!("re-authenticated, polling resumed");
        Ok(())
    }

    /// Stop polling and destroy the session.
    ///
    /// Poll tasks are cancelled at their next suspension point and any
    /// in-flight poll request is discarded. A command submission in
    /// flight runs on its caller's task and completes normally.
    pub async fn shutdown(&self) {
        self.stop_tasks().await;
        self.inner.api.auth().logout().await;
        let _ = self.inner.session_state.send(SessionState::Stopped);
        debug!("client stopped");
    }

    /// Subscribe to session state changes.
    pub fn session_state(&self) -> watch::Receiver<SessionState> {
        self.inner.session_state.subscribe()
    }

    // ── Reads (delegate to the store) ────────────────────────────────

    pub fn snapshot(&self, key: &GrillKey) -> Option<Arc<GrillSnapshot>> {
        self.inner.store.snapshot(key)
    }

    pub fn snapshots(&self) -> Vec<Arc<GrillSnapshot>> {
        self.inner.store.snapshots()
    }

    pub fn subscribe(&self, key: &GrillKey) -> Option<watch::Receiver<Arc<GrillSnapshot>>> {
        self.inner.store.subscribe(key)
    }

    // ── Writes ───────────────────────────────────────────────────────

    pub async fn set_grill_temp(&self, key: &GrillKey, fahrenheit: u16) -> Result<(), CoreError> {
        self.submit(key, GrillCommand::SetGrillTemp(fahrenheit)).await
    }

    pub async fn set_probe_temp(
        &self,
        key: &GrillKey,
        probe: Probe,
        fahrenheit: u16,
    ) -> Result<(), CoreError> {
        self.submit(key, GrillCommand::SetProbeTemp { probe, fahrenheit })
            .await
    }

    pub async fn power_on(&self, key: &GrillKey, mode: GrillMode) -> Result<(), CoreError> {
        self.submit(key, GrillCommand::PowerOn(mode)).await
    }

    pub async fn power_off(&self, key: &GrillKey) -> Result<(), CoreError> {
        self.submit(key, GrillCommand::PowerOff).await
    }

    /// Validate, encode, and submit a command.
    ///
    /// Validation failures return synchronously and never reach the
    /// network. The submission holds the grill's execution slot, so it
    /// defers that grill's next poll tick instead of interleaving with
    /// it -- and never delays polling for other grills.
    pub async fn submit(&self, key: &GrillKey, command: GrillCommand) -> Result<(), CoreError> {
        let encoded = command.encode()?;

        if *self.inner.session_state.borrow() != SessionState::Active {
            return Err(CoreError::NotConnected);
        }

        let snapshot = self
            .inner
            .store
            .snapshot(key)
            .ok_or_else(|| CoreError::GrillNotFound {
                key: key.to_string(),
            })?;
        let slot = self
            .inner
            .store
            .slot(key)
            .ok_or_else(|| CoreError::GrillNotFound {
                key: key.to_string(),
            })?;

        let _slot = slot.lock().await;
        debug!(grill = %key, command = %encoded, "submitting command");
        self.inner
            .api
            .send_command(&snapshot.device.connection_type, &snapshot.device.id, &encoded)
            .await
            .map_err(CoreError::from)
    }

    // ── Internals ────────────────────────────────────────────────────

    /// Spawn a polling task for `device` if it doesn't have one yet.
    async fn ensure_polling(&self, device: GrillDevice) {
        {
            let mut spawned = self.inner.spawned.lock().await;
            if !spawned.insert(device.key()) {
                return;
            }
        }
        let cancel = self.inner.cancel.lock().await.clone();
        let inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(poll_task(inner, device, cancel));
        self.inner.tasks.lock().await.push(handle);
    }

    /// Cancel and join all polling tasks.
    async fn stop_tasks(&self) {
        self.inner.cancel.lock().await.cancel();
        let handles: Vec<JoinHandle<()>> = {
            let mut tasks = self.inner.tasks.lock().await;
            tasks.drain(..).collect()
        };
        for handle in handles {
            let _ = handle.await;
        }
        self.inner.spawned.lock().await.clear();
    }
}

// ── Background polling ───────────────────────────────────────────────

/// One grill's polling loop.
///
/// Owns its reachability machine and failure counter. The cadence is
/// measured from the end of the previous attempt, so a slow response
/// never causes back-to-back overlapping polls. The first poll runs
/// immediately at task start.
async fn poll_task(inner: Arc<ClientInner>, device: GrillDevice, cancel: CancellationToken) {
    let key = device.key();
    let mut tracker = ReachabilityTracker::new(inner.config.offline_threshold);
    debug!(grill = %key, "poll task started");

    loop {
        // In-flight poll requests are discarded on cancellation -- the
        // state fetch has no side effects.
        let outcome = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            outcome = poll_once(&inner, &device, &key) => outcome,
        };

        match outcome {
            PollOutcome::Success { state, warnings } => {
                for warning in &warnings {
                    debug!(grill = %key, %warning, "decode warning");
                }
                tracker.on_success();
                inner.store.apply_success(&key, state);
            }
            PollOutcome::Failure { error } => {
                if error.is_auth_fatal() {
                    // Fatal to the whole session, not just this grill:
                    // halt every polling task until re-authentication.
                    warn!(grill = %key, %error, "session no longer valid, halting polling");
                    let _ = inner.session_state.send(SessionState::AuthExpired);
                    cancel.cancel();
                    break;
                }
                let reachability = tracker.on_failure();
                warn!(
                    grill = %key,
                    failures = tracker.failures(),
                    %reachability,
                    %error,
                    "poll failed"
                );
                inner.store.apply_failure(&key, reachability, tracker.failures());
            }
        }

        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(inner.config.poll_interval) => {}
        }
    }
    debug!(grill = %key, "poll task stopped");
}

/// One poll attempt: fetch the raw frame and decode it.
///
/// Holds the grill's execution slot for the duration, so a command
/// submission in flight defers this poll rather than interleaving
/// plaintext exchanges on the device's control channel.
async fn poll_once(inner: &ClientInner, device: &GrillDevice, key: &GrillKey) -> PollOutcome {
    let Some(slot) = inner.store.slot(key) else {
        return PollOutcome::Failure {
            error: CoreError::GrillNotFound {
                key: key.to_string(),
            },
        };
    };
    let _slot = slot.lock().await;

    let raw = match inner.api.grill_status(&device.connection_type, &device.id).await {
        Ok(raw) => raw,
        Err(e) => {
            return PollOutcome::Failure { error: e.into() };
        }
    };

    match codec::decode(&raw) {
        Ok(decoded) => PollOutcome::Success {
            state: decoded.state,
            warnings: decoded.warnings,
        },
        Err(e) => PollOutcome::Failure {
            error: CoreError::BadPayload {
                message: e.to_string(),
            },
        },
    }
}
