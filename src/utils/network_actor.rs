use crate::utils::config::NetworkConfig;
use crate::utils::network::{
    AccessPointInfo, NetworkCommand, NetworkResult, NetworkService, NetworkUtilError,
    WifiBackend, WifiDetails,
};
use crate::utils::wifi_state::{DeviceState, DeviceStateChange};
use futures_util::stream::{BoxStream, Stream, StreamExt};
use std::{sync::Arc, time::Duration};
use tokio::runtime::Runtime;
use tokio::sync::mpsc::{self, Receiver, Sender};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

const CHANNEL_CAPACITY: usize = 32;

type DeviceEvents = BoxStream<'static, DeviceStateChange>;

/// Owns the backend on the tokio side. Answers commands and doubles as the
/// live state stream: device signals trigger a fresh `Details`, and a slower
/// poll catches anything the signals miss. `Details` is only sent on change.
pub struct NetworkActor<B: WifiBackend> {
    backend: Arc<B>,
    results: Sender<NetworkResult>,
    poll_interval: Duration,
    connect_timeout: Duration,
    last_details: Option<Result<WifiDetails, NetworkUtilError>>,
}

impl<B: WifiBackend> NetworkActor<B> {
    pub fn new(backend: Arc<B>, results: Sender<NetworkResult>, config: &NetworkConfig) -> Self {
        Self {
            backend,
            results,
            poll_interval: Duration::from_millis(config.state_poll_interval_ms.max(50)),
            connect_timeout: Duration::from_secs(config.connect_timeout_secs),
            last_details: None,
        }
    }

    pub async fn run(mut self, mut commands: Receiver<NetworkCommand>) {
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut events = self.subscribe().await;

        loop {
            let mut resubscribe = false;
            let mut events_closed = false;
            tokio::select! {
                cmd = commands.recv() => match cmd {
                    Some(cmd) => resubscribe = self.handle_command(cmd).await,
                    None => break,
                },
                change = next_change(&mut events) => match change {
                    Some(change) => self.on_state_change(change).await,
                    None => events_closed = true,
                },
                _ = ticker.tick() => self.poll_details().await,
            }
            if events_closed {
                debug!("Device signal stream ended; polling only");
                events = None;
            }
            if resubscribe {
                events = self.subscribe().await;
            }
            if self.results.is_closed() {
                break;
            }
        }
        debug!("Network actor stopped");
    }

    async fn subscribe(&self) -> Option<DeviceEvents> {
        match self.backend.device_events().await {
            Ok(stream) => Some(stream),
            Err(e) => {
                warn!("Device state signals unavailable, polling only: {}", e);
                None
            }
        }
    }

    async fn emit(&self, result: NetworkResult) {
        if self.results.send(result).await.is_err() {
            debug!("Network result receiver dropped");
        }
    }

    async fn publish(&mut self, details: Result<WifiDetails, NetworkUtilError>) {
        if self.last_details.as_ref() == Some(&details) {
            return;
        }
        if let Err(e) = &details {
            warn!("Wi-Fi state read failed: {}", e);
        }
        self.last_details = Some(details.clone());
        self.emit(NetworkResult::Details(details)).await;
    }

    async fn poll_details(&mut self) {
        let details = self.backend.wifi_details().await;
        self.publish(details).await;
    }

    /// Short-lived states such as `Deactivating` are reported from the signal
    /// itself, since a property read may already see the next state.
    async fn on_state_change(&mut self, change: DeviceStateChange) {
        debug!(?change, "Wi-Fi device state changed");
        let details = self.backend.wifi_details().await.map(|mut d| {
            d.device_state = change.new;
            d
        });
        self.publish(details).await;
    }

    async fn send_details(&mut self) {
        let details = self.backend.wifi_details().await;
        self.last_details = Some(details.clone());
        self.emit(NetworkResult::Details(details)).await;
    }

    /// Returns true when the Wi-Fi device may have been replaced.
    async fn handle_command(&mut self, cmd: NetworkCommand) -> bool {
        match cmd {
            NetworkCommand::GetDetails => self.send_details().await,
            NetworkCommand::GetAccessPoints => {
                let aps = self.backend.access_points().await;
                self.emit(NetworkResult::AccessPoints(aps)).await;
            }
            NetworkCommand::RequestScan => {
                let res = self.backend.request_scan().await;
                self.emit(NetworkResult::ScanRequested(res)).await;
            }
            NetworkCommand::SetWifiEnabled(enabled) => {
                let res = self.backend.set_wifi_enabled(enabled).await;
                let replaced = enabled && res.is_ok();
                self.emit(NetworkResult::WifiSet(res)).await;
                self.send_details().await;
                return replaced;
            }
            NetworkCommand::Connect { ap, password } => self.spawn_connect(ap, password),
            NetworkCommand::Disconnect => {
                let res = self.backend.disconnect().await;
                self.emit(NetworkResult::Disconnected(res)).await;
            }
        }
        false
    }

    fn spawn_connect(&self, ap: AccessPointInfo, password: Option<String>) {
        let backend = self.backend.clone();
        let results = self.results.clone();
        let limit = self.connect_timeout;

        tokio::spawn(async move {
            info!(bssid = %ap.bssid, ssid = ?ap.ssid, "Connecting to access point");
            let result = connect(backend.as_ref(), &ap, password.as_deref(), limit).await;
            if let Err(e) = &result {
                warn!(bssid = %ap.bssid, "Connection failed: {}", e);
            }
            let _ = results
                .send(NetworkResult::Connected {
                    bssid: ap.bssid,
                    result,
                })
                .await;
        });
    }
}

async fn next_change(events: &mut Option<DeviceEvents>) -> Option<DeviceStateChange> {
    match events {
        Some(stream) => stream.next().await,
        None => std::future::pending().await,
    }
}

/// One connection attempt. A profile created for a failed attempt is removed
/// so rejected keys do not pile up as saved profiles.
pub async fn connect<B: WifiBackend + ?Sized>(
    backend: &B,
    ap: &AccessPointInfo,
    password: Option<&str>,
    limit: Duration,
) -> Result<(), NetworkUtilError> {
    // Subscribe before activating so no transition is missed.
    let events = backend.device_events().await?;
    let activation = backend.activate(ap, password).await?;
    let result = wait_for_activation(events, limit).await;

    if result.is_err() {
        if let Some(profile) = &activation.created_profile {
            match backend.delete_connection(profile).await {
                Ok(()) => debug!(%profile, "Removed profile of failed attempt"),
                Err(e) => warn!(%profile, "Could not remove profile of failed attempt: {}", e),
            }
        }
    }
    result
}

/// Folds device transitions into the outcome of one activation attempt.
#[derive(Debug, Default)]
pub struct ActivationTracker {
    saw_progress: bool,
    saw_need_auth: bool,
}

impl ActivationTracker {
    pub fn observe(&mut self, change: DeviceStateChange) -> Option<Result<(), NetworkUtilError>> {
        match change.new {
            DeviceState::Activated => Some(Ok(())),
            DeviceState::NeedAuth => {
                self.saw_progress = true;
                self.saw_need_auth = true;
                None
            }
            s if s.is_connecting() => {
                self.saw_progress = true;
                None
            }
            DeviceState::Failed => Some(Err(self.failure(change))),
            // Switching networks tears the old one down through Disconnected first.
            DeviceState::Disconnected if self.saw_progress || change.missing_secrets() => {
                Some(Err(self.failure(change)))
            }
            _ => None,
        }
    }

    fn failure(&self, change: DeviceStateChange) -> NetworkUtilError {
        if change.missing_secrets() || self.saw_need_auth {
            NetworkUtilError::SecretsRequired
        } else {
            NetworkUtilError::ActivationFailed(change.new)
        }
    }
}

/// Consumes device transitions until the attempt succeeds, fails, or `limit`
/// elapses.
pub async fn wait_for_activation<S>(mut events: S, limit: Duration) -> Result<(), NetworkUtilError>
where
    S: Stream<Item = DeviceStateChange> + Unpin,
{
    let mut tracker = ActivationTracker::default();
    let wait = async {
        while let Some(change) = events.next().await {
            debug!(?change, "Activation progress");
            if let Some(outcome) = tracker.observe(change) {
                return outcome;
            }
        }
        Err(NetworkUtilError::Nm(
            "Device state stream ended during activation".to_string(),
        ))
    };

    tokio::time::timeout(limit, wait)
        .await
        .map_err(|_| NetworkUtilError::Timeout)?
}

/// Starts the backend and actor on `runtime`. Results are meant to be drained
/// on the glib main context.
pub fn spawn_network_actor(
    runtime: &Runtime,
    config: &NetworkConfig,
) -> (Sender<NetworkCommand>, Receiver<NetworkResult>) {
    let (command_tx, command_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let (result_tx, result_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let config = config.clone();

    runtime.spawn(async move {
        match NetworkService::new().await {
            Ok(service) => {
                info!("NetworkManager service ready");
                NetworkActor::new(service, result_tx, &config)
                    .run(command_rx)
                    .await;
            }
            Err(e) => {
                error!("Failed to start network service: {}", e);
                let _ = result_tx
                    .send(NetworkResult::Details(Err(NetworkUtilError::Unavailable(
                        e.to_string(),
                    ))))
                    .await;
            }
        }
    });

    (command_tx, result_rx)
}
