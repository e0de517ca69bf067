//! Device listing payload
//!
//! One entry of the account-wide device list, as refreshed by the account
//! setup code. The listing is the authoritative source for identity,
//! capabilities, cluster relationships and bluetooth pairings.

use serde::{Deserialize, Serialize};

fn default_locale() -> String {
    "en-US".to_string()
}

fn default_timezone() -> String {
    "UTC".to_string()
}

/// A single device from the account device list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceListing {
    /// Friendly name shown in the Alexa app
    pub account_name: String,
    /// Family (ECHO, KNIGHT, WHA, ...)
    pub device_family: String,
    /// Hardware type code
    pub device_type: String,
    /// Serial number, the primary key of a device
    pub serial_number: String,
    /// Companion app devices that can stand in for this device as "last called"
    #[serde(default)]
    pub app_device_list: Vec<AppDevice>,
    #[serde(default)]
    pub device_owner_customer_id: Option<String>,
    #[serde(default)]
    pub software_version: Option<String>,
    /// Whether the cloud currently sees the device as connected
    pub online: bool,
    #[serde(default)]
    pub capabilities: Vec<String>,
    /// Member serials when this device is itself a group
    #[serde(default)]
    pub cluster_members: Vec<String>,
    /// Group serials this device can be a member of
    #[serde(default)]
    pub parent_clusters: Vec<String>,
    #[serde(rename = "bluetooth_state", default)]
    pub bluetooth_state: Option<BluetoothState>,
    #[serde(default = "default_locale")]
    pub locale: String,
    #[serde(rename = "timeZoneId", default = "default_timezone")]
    pub time_zone_id: String,
    #[serde(default)]
    pub dnd: Option<bool>,
    #[serde(rename = "auth_info", default)]
    pub auth_info: AuthInfo,
}

/// Companion app device reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppDevice {
    pub serial_number: String,
}

/// Account authentication details attached to every listing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthInfo {
    #[serde(default)]
    pub authenticated: bool,
    #[serde(default)]
    pub can_access_prime_music_content: bool,
    #[serde(default)]
    pub customer_email: Option<String>,
    #[serde(default)]
    pub customer_id: Option<String>,
    #[serde(default)]
    pub customer_name: Option<String>,
}

/// Bluetooth pairing state of a device
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BluetoothState {
    #[serde(default)]
    pub paired_device_list: Option<Vec<PairedDevice>>,
}

impl BluetoothState {
    /// Paired devices, empty when the list is absent
    pub fn paired_devices(&self) -> &[PairedDevice] {
        self.paired_device_list.as_deref().unwrap_or_default()
    }
}

/// A bluetooth device paired with the speaker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PairedDevice {
    pub friendly_name: String,
    pub address: String,
    #[serde(default)]
    pub connected: bool,
    #[serde(default)]
    pub profiles: Vec<String>,
}

impl PairedDevice {
    /// Profile advertised by devices that can act as an audio source
    pub const A2DP_SOURCE: &'static str = "A2DP-SOURCE";

    pub fn is_audio_source(&self) -> bool {
        self.profiles.iter().any(|p| p == Self::A2DP_SOURCE)
    }
}
