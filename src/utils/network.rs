use crate::utils::icons::{signal_icon_name, wifi_icon_name};
use crate::utils::wifi_state::{DeviceState, DeviceStateChange};
use async_trait::async_trait;
use futures_util::future::join_all;
use futures_util::stream::{BoxStream, StreamExt};
use rusty_network_manager::{
    dbus_interface_types::NMDeviceType, AccessPointProxy, DeviceProxy, NetworkManagerProxy,
    WirelessProxy,
};
use std::{collections::HashMap, convert::TryFrom, fmt, sync::Arc};
use tokio::sync::Mutex;
use tracing::{debug, warn};
use zbus::{
    zvariant::{ObjectPath, OwnedObjectPath, OwnedValue, Value},
    Connection, Error as ZbusError,
};

const NM_STATE_CONNECTED_GLOBAL: u32 = 70;
const NM_BUS_NAME: &str = "org.freedesktop.NetworkManager";
const NM_PATH: &str = "/org/freedesktop/NetworkManager";
const NM_INTERFACE: &str = "org.freedesktop.NetworkManager";
const NM_DEVICE_INTERFACE: &str = "org.freedesktop.NetworkManager.Device";
const NM_AP_INTERFACE: &str = "org.freedesktop.NetworkManager.AccessPoint";
const NM_SETTINGS_CONNECTION_INTERFACE: &str = "org.freedesktop.NetworkManager.Settings.Connection";
const NM_802_11_AP_FLAGS_PRIVACY: u32 = 0x1;
const NM_802_11_AP_SEC_KEY_MGMT_PSK: u32 = 0x100;
const NM_802_11_AP_SEC_KEY_MGMT_SAE: u32 = 0x400;

type ConnectionSettings = HashMap<String, HashMap<String, OwnedValue>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkUtilError {
    Zbus(String),
    Nm(String),
    NoWifiDevice,
    Io(String),
    Utf8(std::str::Utf8Error),
    TypeConversion(String),
    TryFromIntError(std::num::TryFromIntError),
    SecretsRequired,
    ActivationFailed(DeviceState),
    Timeout,
    Unavailable(String),
}

impl fmt::Display for NetworkUtilError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkUtilError::Zbus(e) => write!(f, "D-Bus error: {}", e),
            NetworkUtilError::Nm(s) => write!(f, "NetworkManager error: {}", s),
            NetworkUtilError::NoWifiDevice => write!(f, "No Wi-Fi device found"),
            NetworkUtilError::Io(e) => write!(f, "I/O error: {}", e),
            NetworkUtilError::Utf8(e) => write!(f, "UTF-8 conversion error: {}", e),
            NetworkUtilError::TypeConversion(s) => write!(f, "Type conversion error: {}", s),
            NetworkUtilError::TryFromIntError(e) => write!(f, "Integer conversion error: {}", e),
            NetworkUtilError::SecretsRequired => write!(f, "A password is required"),
            NetworkUtilError::ActivationFailed(state) => {
                write!(f, "Activation failed (device state: {})", state)
            }
            NetworkUtilError::Timeout => write!(f, "Timed out waiting for activation"),
            NetworkUtilError::Unavailable(s) => write!(f, "Network service unavailable: {}", s),
        }
    }
}

impl std::error::Error for NetworkUtilError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            NetworkUtilError::Utf8(e) => Some(e),
            NetworkUtilError::TryFromIntError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ZbusError> for NetworkUtilError {
    fn from(err: ZbusError) -> Self {
        NetworkUtilError::Zbus(err.to_string())
    }
}

impl From<std::io::Error> for NetworkUtilError {
    fn from(err: std::io::Error) -> Self {
        NetworkUtilError::Io(err.to_string())
    }
}

impl From<std::str::Utf8Error> for NetworkUtilError {
    fn from(err: std::str::Utf8Error) -> Self {
        NetworkUtilError::Utf8(err)
    }
}

impl From<zbus::zvariant::Error> for NetworkUtilError {
    fn from(err: zbus::zvariant::Error) -> Self {
        NetworkUtilError::TypeConversion(err.to_string())
    }
}

impl From<std::num::TryFromIntError> for NetworkUtilError {
    fn from(err: std::num::TryFromIntError) -> Self {
        NetworkUtilError::TryFromIntError(err)
    }
}

fn nm_err(e: impl fmt::Display) -> NetworkUtilError {
    NetworkUtilError::Nm(e.to_string())
}

/// Snapshot of the Wi-Fi device. Rows derive their state from this.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WifiDetails {
    pub enabled: bool,
    pub is_connected: bool,
    pub ssid: Option<String>,
    pub bssid: Option<String>,
    pub strength: Option<u8>,
    pub frequency: Option<u32>,
    pub bitrate: Option<u32>,
    pub icon_name: String,
    pub device_path: Option<OwnedObjectPath>,
    pub device_state: DeviceState,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AccessPointInfo {
    pub path: OwnedObjectPath,
    pub ssid: Option<String>,
    pub bssid: String,
    pub strength: u8,
    pub icon_name: String,
    pub secured: bool,
    /// `key-mgmt` value a new profile for this AP would use.
    pub key_mgmt: &'static str,
    pub is_active: bool,
}

/// Saved-profile side effects of an activation request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Activation {
    /// Profile created for this attempt; it is removed again if the attempt fails.
    pub created_profile: Option<OwnedObjectPath>,
}

/// Operations the actor needs from the system network stack.
#[async_trait]
pub trait WifiBackend: Send + Sync + 'static {
    async fn wifi_details(&self) -> Result<WifiDetails, NetworkUtilError>;
    async fn access_points(&self) -> Result<Vec<AccessPointInfo>, NetworkUtilError>;
    async fn request_scan(&self) -> Result<(), NetworkUtilError>;
    async fn set_wifi_enabled(&self, enabled: bool) -> Result<(), NetworkUtilError>;
    /// Device state transitions as NetworkManager signals them.
    async fn device_events(&self)
        -> Result<BoxStream<'static, DeviceStateChange>, NetworkUtilError>;
    async fn activate(
        &self,
        ap: &AccessPointInfo,
        password: Option<&str>,
    ) -> Result<Activation, NetworkUtilError>;
    async fn delete_connection(&self, profile: &OwnedObjectPath) -> Result<(), NetworkUtilError>;
    async fn disconnect(&self) -> Result<(), NetworkUtilError>;
}

pub struct NetworkService {
    connection: Arc<Connection>,
    manager: NetworkManagerProxy<'static>,
    wifi_device_path: Mutex<Option<OwnedObjectPath>>,
}

impl NetworkService {
    pub async fn new() -> Result<Arc<Self>, NetworkUtilError> {
        let connection = Connection::system().await?;
        let connection = Arc::new(connection);
        let manager = NetworkManagerProxy::new(connection.as_ref())
            .await
            .map_err(nm_err)?;
        let service = Arc::new(Self {
            connection,
            manager,
            wifi_device_path: Mutex::new(None),
        });
        service.find_wifi_device().await?;
        Ok(service)
    }

    async fn find_wifi_device(&self) -> Result<(), NetworkUtilError> {
        let device_paths = self.manager.get_all_devices().await.map_err(nm_err)?;
        let mut wifi_path: Option<OwnedObjectPath> = None;

        for path in device_paths {
            let device_proxy = DeviceProxy::new_from_path(path.clone(), self.connection.as_ref())
                .await
                .map_err(nm_err)?;
            let device_type_u32 = device_proxy.device_type().await.map_err(nm_err)?;

            if matches!(NMDeviceType::try_from(device_type_u32), Ok(t) if t == NMDeviceType::WIFI) {
                wifi_path = Some(path);
                break;
            }
        }

        debug!(?wifi_path, "Wi-Fi device lookup finished");
        *self.wifi_device_path.lock().await = wifi_path;
        Ok(())
    }

    async fn wifi_device_path(&self) -> Result<OwnedObjectPath, NetworkUtilError> {
        self.wifi_device_path
            .lock()
            .await
            .clone()
            .ok_or(NetworkUtilError::NoWifiDevice)
    }

    async fn get_wifi_device_proxy<'a>(&'a self) -> Result<WirelessProxy<'a>, NetworkUtilError> {
        let path = self.wifi_device_path().await?;
        WirelessProxy::new_from_path(path, self.connection.as_ref())
            .await
            .map_err(nm_err)
    }

    async fn generic_proxy(
        &self,
        path: &str,
        interface: &'static str,
    ) -> Result<zbus::Proxy<'static>, NetworkUtilError> {
        let path = ObjectPath::try_from(path.to_owned())?;
        Ok(zbus::Proxy::new(self.connection.as_ref(), NM_BUS_NAME, path, interface).await?)
    }

    async fn device_state(&self, device_path: &OwnedObjectPath) -> DeviceState {
        let proxy = match self
            .generic_proxy(device_path.as_str(), NM_DEVICE_INTERFACE)
            .await
        {
            Ok(p) => p,
            Err(e) => {
                warn!("Could not create device proxy: {}", e);
                return DeviceState::Unknown;
            }
        };
        match proxy.get_property::<u32>("State").await {
            Ok(code) => DeviceState::from_u32(code),
            Err(e) => {
                warn!("Could not read device state: {}", e);
                DeviceState::Unknown
            }
        }
    }

    async fn read_access_point(
        &self,
        ap_path: OwnedObjectPath,
    ) -> Result<AccessPointInfo, NetworkUtilError> {
        let ap_proxy = AccessPointProxy::new_from_path(ap_path.clone(), self.connection.as_ref())
            .await
            .map_err(nm_err)?;
        let strength = ap_proxy.strength().await.map_err(nm_err)?;
        let ssid_bytes = ap_proxy.ssid().await.map_err(nm_err)?;
        let ssid = decode_ssid(&ssid_bytes);

        let props = self.generic_proxy(ap_path.as_str(), NM_AP_INTERFACE).await?;
        let bssid: String = props.get_property("HwAddress").await?;
        let flags: u32 = props.get_property("Flags").await.unwrap_or(0);
        let wpa_flags: u32 = props.get_property("WpaFlags").await.unwrap_or(0);
        let rsn_flags: u32 = props.get_property("RsnFlags").await.unwrap_or(0);

        Ok(AccessPointInfo {
            path: ap_path,
            ssid,
            bssid,
            strength,
            icon_name: signal_icon_name(strength).to_string(),
            secured: flags & NM_802_11_AP_FLAGS_PRIVACY != 0 || wpa_flags != 0 || rsn_flags != 0,
            key_mgmt: key_mgmt_for_flags(wpa_flags, rsn_flags),
            is_active: false,
        })
    }

    /// Finds a saved profile for `ssid` among the device's available connections.
    async fn saved_profile_for(&self, ssid: &str) -> Result<Option<OwnedObjectPath>, NetworkUtilError> {
        let device_path = self.wifi_device_path().await?;
        let device = DeviceProxy::new_from_path(device_path, self.connection.as_ref())
            .await
            .map_err(nm_err)?;
        let candidates = device.available_connections().await.map_err(nm_err)?;

        for profile in candidates {
            let proxy = self
                .generic_proxy(profile.as_str(), NM_SETTINGS_CONNECTION_INTERFACE)
                .await?;
            let settings: ConnectionSettings = match proxy.call("GetSettings", &()).await {
                Ok(settings) => settings,
                Err(e) => {
                    debug!(%profile, "Skipping unreadable profile: {}", e);
                    continue;
                }
            };
            if profile_ssid(&settings).as_deref() == Some(ssid.as_bytes()) {
                return Ok(Some(profile));
            }
        }
        Ok(None)
    }

    /// Stores a new key in an existing profile instead of adding a duplicate one.
    async fn update_profile_secret(
        &self,
        profile: &OwnedObjectPath,
        key_mgmt: &'static str,
        psk: &str,
    ) -> Result<(), NetworkUtilError> {
        let proxy = self
            .generic_proxy(profile.as_str(), NM_SETTINGS_CONNECTION_INTERFACE)
            .await?;
        let mut settings: ConnectionSettings =
            proxy.call("GetSettings", &()).await.map_err(nm_err)?;
        let security = settings
            .entry("802-11-wireless-security".to_string())
            .or_default();
        security.insert("key-mgmt".to_string(), OwnedValue::try_from(Value::from(key_mgmt))?);
        security.insert("psk".to_string(), OwnedValue::try_from(Value::from(psk))?);

        let _: () = proxy.call("Update", &(settings,)).await.map_err(nm_err)?;
        Ok(())
    }

    async fn activate_profile(
        &self,
        profile: &OwnedObjectPath,
        device: &ObjectPath<'_>,
        ap: &ObjectPath<'_>,
    ) -> Result<(), NetworkUtilError> {
        let profile_path = ObjectPath::try_from(profile.as_str())?;
        self.manager
            .activate_connection(&profile_path, device, ap)
            .await
            .map_err(nm_err)?;
        Ok(())
    }
}

#[async_trait]
impl WifiBackend for NetworkService {
    async fn wifi_details(&self) -> Result<WifiDetails, NetworkUtilError> {
        let nm_state_u32 = self.manager.state().await.map_err(nm_err)?;

        let wifi_hw_enabled = self
            .manager
            .wireless_hardware_enabled()
            .await
            .map_err(nm_err)?;
        let wifi_enabled = self.manager.wireless_enabled().await.map_err(nm_err)?;

        if !wifi_hw_enabled || !wifi_enabled {
            return Ok(WifiDetails {
                enabled: false,
                icon_name: "network-wireless-disabled-symbolic".to_string(),
                device_state: DeviceState::Unavailable,
                ..Default::default()
            });
        }

        let wifi_proxy = match self.get_wifi_device_proxy().await {
            Ok(proxy) => proxy,
            Err(NetworkUtilError::NoWifiDevice) => {
                return Ok(WifiDetails {
                    enabled: true,
                    icon_name: "network-wireless-offline-symbolic".to_string(),
                    ..Default::default()
                });
            }
            Err(e) => return Err(e),
        };

        let device_path = self.wifi_device_path().await?;
        let device_state = self.device_state(&device_path).await;
        let active_ap_path = wifi_proxy.active_access_point().await.map_err(nm_err).ok();

        let mut details = WifiDetails {
            enabled: true,
            is_connected: nm_state_u32 >= NM_STATE_CONNECTED_GLOBAL,
            device_path: Some(device_path),
            device_state,
            ..Default::default()
        };

        match active_ap_path {
            Some(ap_path) if ap_path.as_str() != "/" => {
                match self.read_access_point(ap_path.clone()).await {
                    Ok(ap) => {
                        details.ssid = ap.ssid;
                        details.bssid = Some(ap.bssid);
                        details.strength = Some(ap.strength);
                        if let Ok(ap_proxy) =
                            AccessPointProxy::new_from_path(ap_path, self.connection.as_ref()).await
                        {
                            details.frequency = ap_proxy.frequency().await.ok();
                            details.bitrate = ap_proxy.max_bitrate().await.ok();
                        }
                    }
                    Err(e) => {
                        // The active AP can vanish between the two reads while roaming.
                        debug!(%ap_path, "Active access point unreadable: {}", e);
                        details.is_connected = false;
                    }
                }
            }
            _ => details.is_connected = false,
        }

        details.icon_name = wifi_icon_name(details.is_connected, details.strength).to_string();

        Ok(details)
    }

    async fn access_points(&self) -> Result<Vec<AccessPointInfo>, NetworkUtilError> {
        let wifi_proxy = self.get_wifi_device_proxy().await?;
        let ap_paths = wifi_proxy.get_access_points().await.map_err(nm_err)?;
        let active_ap_path = wifi_proxy.active_access_point().await.map_err(nm_err).ok();

        let reads = join_all(ap_paths.into_iter().map(|path| async move {
            let result = self.read_access_point(path.clone()).await;
            (path, result)
        }))
        .await;

        Ok(dedup_and_sort(readable_access_points(
            reads,
            active_ap_path.as_ref(),
        )))
    }

    async fn request_scan(&self) -> Result<(), NetworkUtilError> {
        let wifi_proxy = self.get_wifi_device_proxy().await?;
        wifi_proxy
            .request_scan(HashMap::new())
            .await
            .map_err(nm_err)?;
        Ok(())
    }

    async fn set_wifi_enabled(&self, enabled: bool) -> Result<(), NetworkUtilError> {
        let proxy = self.generic_proxy(NM_PATH, NM_INTERFACE).await?;
        proxy
            .set_property("WirelessEnabled", Value::from(enabled))
            .await
            .map_err(|e| NetworkUtilError::Zbus(e.to_string()))?;

        if enabled {
            tokio::time::sleep(std::time::Duration::from_millis(500)).await;
            self.find_wifi_device().await?;
        } else {
            *self.wifi_device_path.lock().await = None;
        }
        Ok(())
    }

    async fn device_events(
        &self,
    ) -> Result<BoxStream<'static, DeviceStateChange>, NetworkUtilError> {
        let device_path = self.wifi_device_path().await?;
        let proxy = self
            .generic_proxy(device_path.as_str(), NM_DEVICE_INTERFACE)
            .await?;
        let signals = proxy.receive_signal("StateChanged").await?;

        Ok(signals
            .filter_map(|msg| async move {
                match msg.body().deserialize::<(u32, u32, u32)>() {
                    Ok(raw) => Some(DeviceStateChange::from_raw(raw)),
                    Err(e) => {
                        warn!("Malformed StateChanged signal: {}", e);
                        None
                    }
                }
            })
            .boxed())
    }

    async fn activate(
        &self,
        ap: &AccessPointInfo,
        password: Option<&str>,
    ) -> Result<Activation, NetworkUtilError> {
        let Some(ssid) = ap.ssid.as_deref() else {
            return Err(NetworkUtilError::Nm(
                "Hidden networks need an SSID to connect".to_string(),
            ));
        };
        let device_path = self.wifi_device_path().await?;
        let device_obj_path = ObjectPath::try_from(device_path.as_str())?;
        let ap_obj_path = ObjectPath::try_from(ap.path.as_str())?;

        let saved = self.saved_profile_for(ssid).await?;
        match plan_activation(saved, ap.secured, password.is_some()) {
            ActivationPlan::UseSaved(profile) => {
                debug!(%profile, ssid, "Activating saved profile");
                self.activate_profile(&profile, &device_obj_path, &ap_obj_path)
                    .await?;
                Ok(Activation::default())
            }
            ActivationPlan::UpdateSaved(profile) => {
                debug!(%profile, ssid, "Updating key of saved profile");
                let psk = password.unwrap_or_default();
                self.update_profile_secret(&profile, ap.key_mgmt, psk).await?;
                self.activate_profile(&profile, &device_obj_path, &ap_obj_path)
                    .await?;
                Ok(Activation::default())
            }
            ActivationPlan::AskForSecrets => Err(NetworkUtilError::SecretsRequired),
            ActivationPlan::Create { secure } => {
                let security = password.filter(|_| secure).map(|psk| (ap.key_mgmt, psk));
                let settings = new_connection_settings(ssid, security);
                let proxy = self.generic_proxy(NM_PATH, NM_INTERFACE).await?;
                let (profile, _active): (OwnedObjectPath, OwnedObjectPath) = proxy
                    .call(
                        "AddAndActivateConnection",
                        &(settings, &device_obj_path, &ap_obj_path),
                    )
                    .await
                    .map_err(nm_err)?;
                debug!(%profile, ssid, "Created profile");
                Ok(Activation {
                    created_profile: Some(profile),
                })
            }
        }
    }

    async fn delete_connection(&self, profile: &OwnedObjectPath) -> Result<(), NetworkUtilError> {
        let proxy = self
            .generic_proxy(profile.as_str(), NM_SETTINGS_CONNECTION_INTERFACE)
            .await?;
        let _: () = proxy.call("Delete", &()).await.map_err(nm_err)?;
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), NetworkUtilError> {
        let device_path = self.wifi_device_path().await?;
        let proxy = self
            .generic_proxy(device_path.as_str(), NM_DEVICE_INTERFACE)
            .await?;
        let _: () = proxy.call("Disconnect", &()).await.map_err(nm_err)?;
        Ok(())
    }
}

/// SSIDs are raw bytes; invalid UTF-8 is shown lossily rather than as a hidden network.
fn decode_ssid(bytes: &[u8]) -> Option<String> {
    Some(String::from_utf8_lossy(bytes).into_owned()).filter(|s| !s.is_empty())
}

#[derive(Debug, PartialEq)]
enum ActivationPlan {
    UseSaved(OwnedObjectPath),
    UpdateSaved(OwnedObjectPath),
    AskForSecrets,
    Create { secure: bool },
}

/// Saved profiles are reused; a secured network without one needs a key
/// before anything is written to NetworkManager.
fn plan_activation(
    saved: Option<OwnedObjectPath>,
    secured: bool,
    has_password: bool,
) -> ActivationPlan {
    match (saved, has_password) {
        (Some(profile), false) => ActivationPlan::UseSaved(profile),
        (Some(profile), true) if secured => ActivationPlan::UpdateSaved(profile),
        (Some(profile), true) => ActivationPlan::UseSaved(profile),
        (None, false) if secured => ActivationPlan::AskForSecrets,
        (None, _) => ActivationPlan::Create { secure: secured },
    }
}

/// WPA3-only networks reject `wpa-psk`; anything offering PSK keeps it.
fn key_mgmt_for_flags(wpa_flags: u32, rsn_flags: u32) -> &'static str {
    let offered = wpa_flags | rsn_flags;
    if offered & NM_802_11_AP_SEC_KEY_MGMT_SAE != 0 && offered & NM_802_11_AP_SEC_KEY_MGMT_PSK == 0
    {
        "sae"
    } else {
        "wpa-psk"
    }
}

fn profile_ssid(settings: &ConnectionSettings) -> Option<Vec<u8>> {
    let value = settings.get("802-11-wireless")?.get("ssid")?.try_clone().ok()?;
    Vec::<u8>::try_from(Value::from(value)).ok()
}

/// Settings for `AddAndActivateConnection`. `security` is `(key-mgmt, psk)`.
fn new_connection_settings<'a>(
    ssid: &str,
    security: Option<(&'static str, &'a str)>,
) -> HashMap<&'static str, HashMap<&'static str, Value<'a>>> {
    let mut connection = HashMap::new();
    connection.insert("type", Value::from("802-11-wireless"));
    connection.insert("id", Value::from(ssid.to_string()));

    let mut wireless = HashMap::new();
    wireless.insert("ssid", Value::from(ssid.as_bytes().to_vec()));
    wireless.insert("mode", Value::from("infrastructure"));

    let mut settings = HashMap::new();
    settings.insert("connection", connection);
    settings.insert("802-11-wireless", wireless);

    if let Some((key_mgmt, psk)) = security {
        let mut sec = HashMap::new();
        sec.insert("key-mgmt", Value::from(key_mgmt));
        sec.insert("psk", Value::from(psk));
        settings.insert("802-11-wireless-security", sec);
    }
    settings
}

/// Drops access points whose properties could not be read; they usually left
/// range between listing and reading.
fn readable_access_points(
    reads: Vec<(OwnedObjectPath, Result<AccessPointInfo, NetworkUtilError>)>,
    active: Option<&OwnedObjectPath>,
) -> Vec<AccessPointInfo> {
    reads
        .into_iter()
        .filter_map(|(path, result)| match result {
            Ok(mut ap) => {
                ap.is_active = active == Some(&ap.path);
                Some(ap)
            }
            Err(e) => {
                debug!(%path, "Skipping vanished access point: {}", e);
                None
            }
        })
        .collect()
}

/// Keeps the strongest entry per SSID (hidden networks are never merged) and
/// orders active first, then strength, then name.
pub fn dedup_and_sort(aps: Vec<AccessPointInfo>) -> Vec<AccessPointInfo> {
    let mut best: HashMap<String, AccessPointInfo> = HashMap::new();
    let mut hidden = Vec::new();

    for ap in aps {
        let Some(ssid) = ap.ssid.clone() else {
            hidden.push(ap);
            continue;
        };
        match best.get(&ssid) {
            Some(existing)
                if existing.is_active || (!ap.is_active && existing.strength >= ap.strength) => {}
            _ => {
                best.insert(ssid, ap);
            }
        }
    }

    let mut ap_infos: Vec<AccessPointInfo> = best.into_values().chain(hidden).collect();
    ap_infos.sort_unstable_by(|a, b| {
        b.is_active
            .cmp(&a.is_active)
            .then_with(|| b.strength.cmp(&a.strength))
            .then_with(|| a.ssid.cmp(&b.ssid))
            .then_with(|| a.bssid.cmp(&b.bssid))
    });
    ap_infos
}

#[derive(Debug)]
pub enum NetworkCommand {
    GetDetails,
    GetAccessPoints,
    RequestScan,
    SetWifiEnabled(bool),
    Connect {
        ap: AccessPointInfo,
        password: Option<String>,
    },
    Disconnect,
}

#[derive(Debug, Clone)]
pub enum NetworkResult {
    Details(Result<WifiDetails, NetworkUtilError>),
    AccessPoints(Result<Vec<AccessPointInfo>, NetworkUtilError>),
    ScanRequested(Result<(), NetworkUtilError>),
    WifiSet(Result<(), NetworkUtilError>),
    Connected {
        bssid: String,
        result: Result<(), NetworkUtilError>,
    },
    Disconnected(Result<(), NetworkUtilError>),
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn ap(ssid: Option<&str>, bssid: &str, strength: u8, is_active: bool) -> AccessPointInfo {
        AccessPointInfo {
            path: OwnedObjectPath::try_from(format!(
                "/org/freedesktop/NetworkManager/AccessPoint/{}",
                bssid.replace(':', "")
            ))
            .unwrap(),
            ssid: ssid.map(String::from),
            bssid: bssid.to_string(),
            strength,
            icon_name: signal_icon_name(strength).to_string(),
            secured: true,
            key_mgmt: "wpa-psk",
            is_active,
        }
    }

    #[test]
    fn test_dedup_keeps_strongest_per_ssid() {
        let aps = vec![
            ap(Some("Cafe"), "AA:00", 40, false),
            ap(Some("Cafe"), "AA:01", 70, false),
            ap(Some("Home"), "BB:00", 50, false),
        ];
        let out = dedup_and_sort(aps);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].bssid, "AA:01");
        assert_eq!(out[1].bssid, "BB:00");
    }

    #[test]
    fn test_dedup_prefers_active_over_stronger() {
        let aps = vec![
            ap(Some("Cafe"), "AA:00", 30, true),
            ap(Some("Cafe"), "AA:01", 90, false),
        ];
        let out = dedup_and_sort(aps);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].bssid, "AA:00");
    }

    #[test]
    fn test_sort_active_first_then_strength_then_name() {
        let aps = vec![
            ap(Some("Zed"), "01", 60, false),
            ap(Some("Alpha"), "02", 60, false),
            ap(Some("Weak"), "03", 10, true),
            ap(Some("Strong"), "04", 95, false),
        ];
        let names: Vec<_> = dedup_and_sort(aps)
            .into_iter()
            .map(|a| a.ssid.unwrap_or_default())
            .collect();
        assert_eq!(names, ["Weak", "Strong", "Alpha", "Zed"]);
    }

    #[test]
    fn test_hidden_networks_are_not_merged() {
        let aps = vec![ap(None, "01", 50, false), ap(None, "02", 40, false)];
        assert_eq!(dedup_and_sort(aps).len(), 2);
    }

    fn saved_profile() -> OwnedObjectPath {
        OwnedObjectPath::try_from("/org/freedesktop/NetworkManager/Settings/3").unwrap()
    }

    #[test]
    fn test_unsaved_open_network_creates_profile() {
        assert_eq!(
            plan_activation(None, false, false),
            ActivationPlan::Create { secure: false }
        );
    }

    #[test]
    fn test_unsaved_secured_network_asks_for_key_first() {
        assert_eq!(plan_activation(None, true, false), ActivationPlan::AskForSecrets);
        assert_eq!(
            plan_activation(None, true, true),
            ActivationPlan::Create { secure: true }
        );
    }

    #[test]
    fn test_saved_network_reuses_profile() {
        assert_eq!(
            plan_activation(Some(saved_profile()), true, false),
            ActivationPlan::UseSaved(saved_profile())
        );
        assert_eq!(
            plan_activation(Some(saved_profile()), true, true),
            ActivationPlan::UpdateSaved(saved_profile())
        );
        assert_eq!(
            plan_activation(Some(saved_profile()), false, true),
            ActivationPlan::UseSaved(saved_profile())
        );
    }

    #[test]
    fn test_decode_ssid_keeps_non_utf8_names() {
        assert_eq!(decode_ssid(b"Home"), Some("Home".to_string()));
        assert_eq!(decode_ssid(b"Caf\xe9"), Some("Caf\u{fffd}".to_string()));
        assert_eq!(decode_ssid(b""), None);
    }

    #[test]
    fn test_psk_settings_shape() {
        let settings = new_connection_settings("Home", Some(("wpa-psk", "hunter22")));
        assert_eq!(
            settings["802-11-wireless-security"]["key-mgmt"],
            Value::from("wpa-psk")
        );
        assert_eq!(
            settings["802-11-wireless"]["ssid"],
            Value::from(b"Home".to_vec())
        );
        assert_eq!(settings["connection"]["type"], Value::from("802-11-wireless"));
    }

    #[test]
    fn test_open_settings_have_no_security_section() {
        let settings = new_connection_settings("Cafe", None);
        assert!(!settings.contains_key("802-11-wireless-security"));
        assert_eq!(settings["connection"]["id"], Value::from("Cafe"));
    }

    #[test]
    fn test_sae_settings_for_wpa3_only_network() {
        let key_mgmt = key_mgmt_for_flags(0, NM_802_11_AP_SEC_KEY_MGMT_SAE);
        assert_eq!(key_mgmt, "sae");
        let settings = new_connection_settings("Lab", Some((key_mgmt, "hunter22")));
        assert_eq!(
            settings["802-11-wireless-security"]["key-mgmt"],
            Value::from("sae")
        );
    }

    #[test]
    fn test_transition_mode_keeps_wpa_psk() {
        let both = NM_802_11_AP_SEC_KEY_MGMT_PSK | NM_802_11_AP_SEC_KEY_MGMT_SAE;
        assert_eq!(key_mgmt_for_flags(0, both), "wpa-psk");
        assert_eq!(key_mgmt_for_flags(NM_802_11_AP_SEC_KEY_MGMT_PSK, 0), "wpa-psk");
        assert_eq!(key_mgmt_for_flags(0, 0), "wpa-psk");
    }

    #[test]
    fn test_vanished_access_point_is_skipped() {
        let home = ap(Some("Home"), "AA:BB", 80, false);
        let gone = ap(Some("Gone"), "CC:DD", 40, false);
        let reads = vec![
            (home.path.clone(), Ok(home.clone())),
            (
                gone.path.clone(),
                Err(NetworkUtilError::Nm("UnknownObject".to_string())),
            ),
        ];

        let aps = readable_access_points(reads, Some(&home.path));
        assert_eq!(aps.len(), 1);
        assert_eq!(aps[0].bssid, "AA:BB");
        assert!(aps[0].is_active);
    }

    #[test]
    fn test_error_display() {
        assert_eq!(NetworkUtilError::NoWifiDevice.to_string(), "No Wi-Fi device found");
        assert_eq!(
            NetworkUtilError::ActivationFailed(DeviceState::Failed).to_string(),
            "Activation failed (device state: Failed)"
        );
    }
}
