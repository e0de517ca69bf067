//! Merging listings and session payloads into a snapshot
//!
//! Everything here is synchronous and side-effect free: the device entity
//! gathers the inputs (fresh listing, account last-called record, session
//! payload from the remote or from a playing parent group) and these
//! functions fold them into the [`DeviceSnapshot`]. Refreshing twice with
//! the same inputs yields the same snapshot.

use alexa_api::{DeviceListing, PlayerInfo, VolumeInfo};
use tracing::{debug, warn};

use crate::model::{
    DeviceIdentity, DeviceSerial, DeviceSnapshot, LastCalled, PlayerState, LOCAL_SOURCE,
};

/// Fold every input into the snapshot
///
/// `listing` replaces the identity fields first. Nothing session-derived is
/// touched while the device is unavailable beyond clearing media details.
/// `session` must already be resolved (fetched, or derived from a playing
/// parent with [`member_session`]); it is ignored for devices without the
/// music skill.
pub fn reconcile(
    snapshot: &mut DeviceSnapshot,
    listing: Option<&DeviceListing>,
    last_called: Option<&LastCalled>,
    session: Option<PlayerInfo>,
) {
    if let Some(listing) = listing {
        apply_listing(snapshot, listing);
    }

    if !snapshot.available {
        snapshot.clear_media();
        snapshot.session = None;
        return;
    }

    if snapshot.supports_bluetooth() {
        resolve_sources(snapshot);
    }
    resolve_last_called(snapshot, last_called);

    let session = if snapshot.supports_music() {
        session
    } else {
        None
    };
    apply_session(snapshot, session);
}

/// Overwrite identity, capability and cluster fields from a listing
pub fn apply_listing(snapshot: &mut DeviceSnapshot, listing: &DeviceListing) {
    snapshot.identity = DeviceIdentity::from_listing(listing);
    snapshot.auth = listing.auth_info.clone();
    snapshot.capabilities = listing.capabilities.iter().cloned().collect();
    snapshot.available = listing.online;
    snapshot.parent_clusters = listing
        .parent_clusters
        .iter()
        .map(|serial| DeviceSerial::new(serial.as_str()))
        .collect();
    snapshot.cluster_members = listing
        .cluster_members
        .iter()
        .map(|serial| DeviceSerial::new(serial.as_str()))
        .collect();
    snapshot.bluetooth = listing.bluetooth_state.clone().unwrap_or_default();
    snapshot.dnd = listing.dnd;
}

/// Recompute the source list and the active source from bluetooth pairings
pub fn resolve_sources(snapshot: &mut DeviceSnapshot) {
    let paired = snapshot.bluetooth.paired_devices();

    let mut sources = vec![LOCAL_SOURCE.to_string()];
    sources.extend(
        paired
            .iter()
            .filter(|device| device.is_audio_source())
            .map(|device| device.friendly_name.clone()),
    );

    let active = paired
        .iter()
        .find(|device| device.connected && sources.contains(&device.friendly_name))
        .map(|device| device.friendly_name.clone())
        .unwrap_or_else(|| LOCAL_SOURCE.to_string());

    snapshot.source_list = sources;
    snapshot.source = Some(active);
}

/// Compare the account's last-called record against this device
pub fn resolve_last_called(snapshot: &mut DeviceSnapshot, record: Option<&LastCalled>) {
    let is_last_called = record.is_some_and(|r| snapshot.answers_to(&r.serial_number));
    debug!(
        device = %snapshot.serial().hidden(),
        reported = ?record.map(|r| alexa_api::hide_serial(&r.serial_number)),
        is_last_called,
        "Last called check"
    );
    snapshot.last_called = is_last_called;
    if let Some(record) = record.filter(|_| is_last_called) {
        snapshot.last_called_timestamp = record.timestamp;
    }
}

/// Pick the parent group to defer to among those currently playing
///
/// More than one playing parent is an anomaly of the remote service; the
/// first one wins.
pub fn select_playing_parent(
    device: &DeviceSerial,
    playing_parents: Vec<DeviceSerial>,
) -> Option<DeviceSerial> {
    if playing_parents.len() > 1 {
        warn!(
            device = %device.hidden(),
            parents = ?playing_parents.iter().map(DeviceSerial::hidden).collect::<Vec<_>>(),
            "Found multiple playing parents, using the first"
        );
    }
    playing_parents.into_iter().next()
}

/// Derive a member's session from its playing parent's session
///
/// The member does not itself play in a group, and its volume is its own
/// contribution to the group volume when the parent reports one.
pub fn member_session(parent: &PlayerInfo, member: &DeviceSerial) -> PlayerInfo {
    let mut session = parent.clone();
    session.is_playing_in_lemur = Some(false);
    session.lemur_volume = None;
    if let Some(own) = parent
        .lemur_volume
        .as_ref()
        .and_then(|lemur| lemur.member_volume.get(member.as_str()))
    {
        session.volume = Some(own.clone());
    }
    session
}

/// Replace media details from a resolved session
///
/// Media details are cleared first and only repopulated when the session
/// reports a state. Transport tri-states and the volume are kept when the
/// session says nothing about them.
pub fn apply_session(snapshot: &mut DeviceSnapshot, session: Option<PlayerInfo>) {
    snapshot.clear_media();
    snapshot.session = session;

    let Some(info) = snapshot.session.as_ref() else {
        return;
    };

    if let Some(transport) = &info.transport {
        snapshot.shuffle = tri_state(transport.shuffle.as_deref());
        snapshot.repeat = tri_state(transport.repeat.as_deref());
    }

    let Some(state) = info.state.as_deref() else {
        return;
    };

    let progress = info.progress.as_ref();
    let text = info.info_text.as_ref();
    let media = &mut snapshot.media;
    media.player_state = Some(PlayerState::from_remote(state));
    media.position = progress.and_then(|p| p.media_progress);
    media.duration = progress.and_then(|p| p.media_length);
    media.title = text.and_then(|t| t.title.clone());
    media.artist = text.and_then(|t| t.sub_text1.clone());
    media.album = text.and_then(|t| t.sub_text2.clone());
    media.image_url = info.main_art.as_ref().and_then(|art| art.url.clone());

    let volume = match &info.lemur_volume {
        Some(lemur) => lemur.composite_volume.as_ref(),
        None => info.volume.as_ref(),
    };
    if let Some(VolumeInfo { volume, muted }) = volume {
        media.muted = *muted;
        if let Some(percent) = volume {
            snapshot.volume = Some(percent_to_level(*percent));
        }
    }
}

/// Map the SELECTED / DISABLED vocabulary; anything else is unknown
pub fn tri_state(value: Option<&str>) -> Option<bool> {
    match value {
        Some("SELECTED") => Some(true),
        Some("DISABLED") => Some(false),
        _ => None,
    }
}

/// Convert a 0-100 percentage to a level in [0, 1]
pub fn percent_to_level(percent: u32) -> f64 {
    (f64::from(percent) / 100.0).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MediaDetails;
    use alexa_api::{
        AppDevice, BluetoothState, InfoText, LemurVolume, MainArt, PairedDevice, Progress,
        Transport,
    };
    use rstest::rstest;
    use std::collections::BTreeMap;

    fn listing(serial: &str, capabilities: &[&str]) -> DeviceListing {
        serde_json::from_value(serde_json::json!({
            "accountName": "Kitchen",
            "deviceFamily": "ECHO",
            "deviceType": "A3S5BH2HU6VAYF",
            "serialNumber": serial,
            "appDeviceList": [{"serialNumber": "APP-1"}],
            "online": true,
            "capabilities": capabilities,
        }))
        .unwrap()
    }

    fn playing(volume: u32) -> PlayerInfo {
        PlayerInfo {
            state: Some("PLAYING".to_string()),
            progress: Some(Progress {
                media_progress: Some(42),
                media_length: Some(240),
            }),
            info_text: Some(InfoText {
                title: Some("Song".to_string()),
                sub_text1: Some("Artist".to_string()),
                sub_text2: Some("Album".to_string()),
            }),
            main_art: Some(MainArt {
                url: Some("https://art/1.jpg".to_string()),
            }),
            volume: Some(VolumeInfo::new(volume, false)),
            ..Default::default()
        }
    }

    fn paired(name: &str, connected: bool, profiles: &[&str]) -> PairedDevice {
        PairedDevice {
            friendly_name: name.to_string(),
            address: format!("{}-addr", name),
            connected,
            profiles: profiles.iter().map(|p| p.to_string()).collect(),
        }
    }

    #[test]
    fn test_session_populates_media() {
        let mut snapshot = DeviceSnapshot::from_listing(&listing("S1", &["MUSIC_SKILL"]));
        reconcile(&mut snapshot, None, None, Some(playing(35)));

        assert_eq!(snapshot.media.player_state, Some(PlayerState::Playing));
        assert_eq!(snapshot.media.position, Some(42));
        assert_eq!(snapshot.media.duration, Some(240));
        assert_eq!(snapshot.media.title.as_deref(), Some("Song"));
        assert_eq!(snapshot.media.artist.as_deref(), Some("Artist"));
        assert_eq!(snapshot.media.album.as_deref(), Some("Album"));
        assert_eq!(snapshot.volume, Some(0.35));
    }

    #[test]
    fn test_unavailable_clears_media_and_skips_session() {
        let mut snapshot = DeviceSnapshot::from_listing(&listing("S1", &["MUSIC_SKILL"]));
        reconcile(&mut snapshot, None, None, Some(playing(35)));

        let mut offline = listing("S1", &["MUSIC_SKILL"]);
        offline.online = false;
        reconcile(&mut snapshot, Some(&offline), None, Some(playing(80)));

        assert_eq!(snapshot.media, MediaDetails::default());
        assert!(snapshot.session.is_none());
        assert_eq!(snapshot.volume, Some(0.35));
    }

    #[test]
    fn test_no_music_skill_ignores_session() {
        let mut snapshot = DeviceSnapshot::from_listing(&listing("S1", &[]));
        reconcile(&mut snapshot, None, None, Some(playing(35)));
        assert!(snapshot.media.player_state.is_none());
        assert!(snapshot.session.is_none());
    }

    #[test]
    fn test_stateless_session_leaves_media_cleared() {
        let mut snapshot = DeviceSnapshot::from_listing(&listing("S1", &["MUSIC_SKILL"]));
        reconcile(&mut snapshot, None, None, Some(playing(35)));
        reconcile(
            &mut snapshot,
            None,
            None,
            Some(PlayerInfo {
                transport: Some(Transport {
                    shuffle: Some("SELECTED".to_string()),
                    repeat: None,
                }),
                ..Default::default()
            }),
        );
        assert_eq!(snapshot.media, MediaDetails::default());
        assert_eq!(snapshot.shuffle, Some(true));
        assert_eq!(snapshot.repeat, None);
    }

    #[rstest]
    #[case(Some("SELECTED"), Some(true))]
    #[case(Some("DISABLED"), Some(false))]
    #[case(Some("ENABLED"), None)]
    #[case(Some("HIDDEN"), None)]
    #[case(None, None)]
    fn test_tri_state(#[case] value: Option<&str>, #[case] expected: Option<bool>) {
        assert_eq!(tri_state(value), expected);
    }

    #[test]
    fn test_composite_volume_takes_precedence() {
        let mut session = playing(10);
        session.lemur_volume = Some(LemurVolume {
            composite_volume: Some(VolumeInfo::new(60, true)),
            member_volume: BTreeMap::new(),
        });
        let mut snapshot = DeviceSnapshot::from_listing(&listing("S1", &["MUSIC_SKILL"]));
        apply_session(&mut snapshot, Some(session));

        assert_eq!(snapshot.volume, Some(0.6));
        assert_eq!(snapshot.media.muted, Some(true));
    }

    #[test]
    fn test_zero_volume_is_applied() {
        let mut snapshot = DeviceSnapshot::from_listing(&listing("S1", &["MUSIC_SKILL"]));
        apply_session(&mut snapshot, Some(playing(40)));
        apply_session(&mut snapshot, Some(playing(0)));
        assert_eq!(snapshot.volume, Some(0.0));
        assert!(snapshot.is_muted());
    }

    #[test]
    fn test_member_session_uses_own_volume() {
        let mut parent = playing(70);
        parent.is_playing_in_lemur = Some(true);
        parent.lemur_volume = Some(LemurVolume {
            composite_volume: Some(VolumeInfo::new(70, false)),
            member_volume: BTreeMap::from([("S1".to_string(), VolumeInfo::new(25, false))]),
        });

        let session = member_session(&parent, &DeviceSerial::from("S1"));
        assert_eq!(session.is_playing_in_lemur, Some(false));
        assert!(session.lemur_volume.is_none());
        assert_eq!(session.volume, Some(VolumeInfo::new(25, false)));

        let other = member_session(&parent, &DeviceSerial::from("S2"));
        assert_eq!(other.volume, Some(VolumeInfo::new(70, false)));
    }

    #[test]
    fn test_select_playing_parent_first_wins() {
        let device = DeviceSerial::from("S1");
        assert_eq!(select_playing_parent(&device, vec![]), None);
        assert_eq!(
            select_playing_parent(
                &device,
                vec![DeviceSerial::from("G1"), DeviceSerial::from("G2")]
            ),
            Some(DeviceSerial::from("G1"))
        );
    }

    #[test]
    fn test_sources_from_bluetooth() {
        let mut snapshot = DeviceSnapshot::from_listing(&listing("S1", &["PAIR_BT_SOURCE"]));
        snapshot.bluetooth = BluetoothState {
            paired_device_list: Some(vec![
                paired("Headphones", true, &["A2DP-SINK"]),
                paired("Phone", true, &["A2DP-SOURCE", "AVRCP"]),
                paired("Tablet", false, &["A2DP-SOURCE"]),
            ]),
        };
        resolve_sources(&mut snapshot);

        assert_eq!(snapshot.source_list, vec!["Local Speaker", "Phone", "Tablet"]);
        assert_eq!(snapshot.source.as_deref(), Some("Phone"));
    }

    #[test]
    fn test_disconnected_sources_stay_selectable() {
        let mut snapshot = DeviceSnapshot::from_listing(&listing("S1", &["PAIR_BT_SOURCE"]));
        snapshot.bluetooth = BluetoothState {
            paired_device_list: Some(vec![paired("Tablet", false, &["A2DP-SOURCE"])]),
        };
        resolve_sources(&mut snapshot);

        assert_eq!(snapshot.source_list, vec!["Local Speaker", "Tablet"]);
        assert_eq!(snapshot.source.as_deref(), Some(LOCAL_SOURCE));
    }

    #[test]
    fn test_sources_default_to_local() {
        let mut snapshot = DeviceSnapshot::from_listing(&listing("S1", &["PAIR_BT_SOURCE"]));
        resolve_sources(&mut snapshot);
        assert_eq!(snapshot.source_list, vec![LOCAL_SOURCE]);
        assert_eq!(snapshot.source.as_deref(), Some(LOCAL_SOURCE));
    }

    #[test]
    fn test_last_called_matches_app_device() {
        let mut listing = listing("S1", &[]);
        listing.app_device_list.push(AppDevice {
            serial_number: "APP-2".to_string(),
        });
        let mut snapshot = DeviceSnapshot::from_listing(&listing);

        resolve_last_called(&mut snapshot, Some(&LastCalled::new("APP-2", Some(7))));
        assert!(snapshot.last_called);
        assert_eq!(snapshot.last_called_timestamp, Some(7));

        resolve_last_called(&mut snapshot, Some(&LastCalled::new("OTHER", Some(9))));
        assert!(!snapshot.last_called);
        assert_eq!(snapshot.last_called_timestamp, Some(7));

        resolve_last_called(&mut snapshot, None);
        assert!(!snapshot.last_called);
    }
}
