//! Per-account shared context
//!
//! Everything the devices of one account share lives here: the registry of
//! device entities, the latest device listings, the last-called record, the
//! push command kinds seen so far, the websocket flag, the event bus and
//! the re-login handler. It is passed explicitly to every operation that
//! needs it.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use alexa_api::{hide_email, DeviceListing, LoginHandler, RemoteSession};
use alexa_stream::{AccountTopic, EventBus, PushCommand, PushEnvelope, PushEvent};
use dashmap::mapref::entry::Entry;
use dashmap::{DashMap, DashSet};
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::config::StateConfig;
use crate::device::Device;
use crate::error::{Result, StateError};
use crate::model::{DeviceSerial, LastCalled};
use crate::poll::PushHealth;
use crate::throttle::RefreshMode;

/// Builder for [`AccountContext`]
pub struct AccountContextBuilder {
    email: String,
    config: StateConfig,
    bus: Option<Arc<EventBus>>,
    login: Option<Arc<dyn LoginHandler>>,
}

impl AccountContextBuilder {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            config: StateConfig::default(),
            bus: None,
            login: None,
        }
    }

    pub fn with_config(mut self, config: StateConfig) -> Self {
        self.config = config;
        self
    }

    /// Share a bus between accounts; a private one is created otherwise
    pub fn with_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.bus = Some(bus);
        self
    }

    pub fn with_login(mut self, login: Arc<dyn LoginHandler>) -> Self {
        self.login = Some(login);
        self
    }

    pub fn build(self) -> Result<Arc<AccountContext>> {
        self.config.validate()?;

        let topic = AccountTopic::for_account(&self.email);
        debug!(account = %hide_email(&self.email), topic = %topic, "Creating account context");

        Ok(Arc::new(AccountContext {
            topic,
            email: self.email,
            config: self.config,
            bus: self.bus.unwrap_or_default(),
            login: self.login,
            devices: DashMap::new(),
            listings: DashMap::new(),
            last_called: RwLock::new(None),
            seen_commands: DashSet::new(),
            websocket_active: AtomicBool::new(false),
        }))
    }
}

/// Shared state of one account
pub struct AccountContext {
    email: String,
    topic: AccountTopic,
    config: StateConfig,
    bus: Arc<EventBus>,
    login: Option<Arc<dyn LoginHandler>>,
    devices: DashMap<DeviceSerial, Arc<Device>>,
    listings: DashMap<DeviceSerial, DeviceListing>,
    last_called: RwLock<Option<LastCalled>>,
    seen_commands: DashSet<PushCommand>,
    websocket_active: AtomicBool,
}

impl AccountContext {
    pub fn builder(email: impl Into<String>) -> AccountContextBuilder {
        AccountContextBuilder::new(email)
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    /// Email safe for log output
    pub fn hidden_email(&self) -> String {
        hide_email(&self.email)
    }

    pub fn topic(&self) -> &AccountTopic {
        &self.topic
    }

    pub fn config(&self) -> &StateConfig {
        &self.config
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    // ------------------------------------------------------------------
    // Registry
    // ------------------------------------------------------------------

    pub fn device(&self, serial: &DeviceSerial) -> Option<Arc<Device>> {
        self.devices.get(serial).map(|entry| Arc::clone(entry.value()))
    }

    /// Look up a device a host addressed by serial
    pub fn require_device(&self, serial: &str) -> Result<Arc<Device>> {
        self.device(&DeviceSerial::new(serial))
            .ok_or_else(|| StateError::DeviceNotFound(alexa_api::hide_serial(serial)))
    }

    pub fn devices(&self) -> Vec<Arc<Device>> {
        self.devices
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }

    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    /// Latest listing of a device
    pub fn listing(&self, serial: &DeviceSerial) -> Option<DeviceListing> {
        self.listings.get(serial).map(|entry| entry.value().clone())
    }

    /// Store a fresh listing; the device picks it up on its next refresh
    pub fn update_listing(&self, listing: DeviceListing) {
        let serial = DeviceSerial::new(listing.serial_number.as_str());
        self.listings.insert(serial, listing);
    }

    // ------------------------------------------------------------------
    // Push channel state
    // ------------------------------------------------------------------

    pub fn last_called(&self) -> Option<LastCalled> {
        self.last_called.read().clone()
    }

    pub fn set_last_called(&self, record: LastCalled) {
        *self.last_called.write() = Some(record);
    }

    pub fn record_command(&self, command: PushCommand) {
        self.seen_commands.insert(command);
    }

    pub fn has_seen(&self, command: &PushCommand) -> bool {
        self.seen_commands.contains(command)
    }

    /// Whether any playback-progress command kind has been delivered
    pub fn audio_push_seen(&self) -> bool {
        self.seen_commands
            .iter()
            .any(|command| command.is_playback_progress())
    }

    pub fn websocket_active(&self) -> bool {
        self.websocket_active.load(Ordering::Acquire)
    }

    /// Set by whatever owns the push transport
    pub fn set_websocket_active(&self, active: bool) {
        let previous = self.websocket_active.swap(active, Ordering::AcqRel);
        if previous != active {
            info!(account = %self.hidden_email(), active, "Push channel state changed");
        }
    }

    pub fn push_health(&self) -> PushHealth {
        PushHealth {
            websocket_active: self.websocket_active(),
            audio_push_seen: self.audio_push_seen(),
        }
    }

    /// Record a received push notification and publish it to the devices
    ///
    /// Returns the number of device listeners reached.
    pub fn deliver(&self, envelope: PushEnvelope) -> usize {
        self.record_command(envelope.command.clone());

        match &envelope.event {
            PushEvent::LastCalled { serial, timestamp } => {
                self.set_last_called(LastCalled::new(serial.as_str(), *timestamp));
            }
            PushEvent::Bluetooth { serial, state } => {
                let serial = DeviceSerial::new(serial.as_str());
                if let Some(mut listing) = self.listings.get_mut(&serial) {
                    listing.bluetooth_state = Some(state.clone());
                }
            }
            _ => {}
        }

        self.bus.publish(&self.topic, envelope)
    }

    // ------------------------------------------------------------------
    // Remote calls
    // ------------------------------------------------------------------

    /// Run a remote call, re-logging in once on an authentication failure
    ///
    /// The call is retried exactly once after a successful re-login. Without
    /// a login handler, or when re-login or the retry fails authentication
    /// again, the error surfaces as [`StateError::Authentication`].
    pub async fn with_relogin<T, F, Fut>(&self, mut call: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = alexa_api::Result<T>>,
    {
        let error = match call().await {
            Ok(value) => return Ok(value),
            Err(error) if error.is_auth() => error,
            Err(error) => return Err(error.into()),
        };

        let Some(login) = &self.login else {
            return Err(StateError::from(error));
        };

        warn!(account = %self.hidden_email(), error = %error, "Session rejected, logging in again");
        login
            .relogin()
            .await
            .map_err(|e| StateError::Authentication(e.to_string()))?;

        call().await.map_err(StateError::from)
    }

    // ------------------------------------------------------------------
    // Device lifecycle
    // ------------------------------------------------------------------

    /// Create, refresh, register and start the entity for a listing
    ///
    /// A serial that is already registered is skipped and the existing
    /// entity returned.
    pub async fn add_device(
        self: &Arc<Self>,
        listing: DeviceListing,
        session: Arc<dyn RemoteSession>,
    ) -> Arc<Device> {
        let serial = DeviceSerial::new(listing.serial_number.as_str());
        if let Some(existing) = self.device(&serial) {
            debug!(
                account = %self.hidden_email(),
                device = %serial.hidden(),
                "Skipping already added device"
            );
            return existing;
        }

        self.update_listing(listing.clone());
        let device = Device::new(&listing, session, &self.config);
        if let Err(error) = device.refresh(self, RefreshMode::Forced).await {
            warn!(
                account = %self.hidden_email(),
                device = %serial.hidden(),
                error = %error,
                "Initial refresh failed"
            );
        }

        match self.devices.entry(serial.clone()) {
            Entry::Occupied(entry) => return Arc::clone(entry.get()),
            Entry::Vacant(entry) => {
                entry.insert(Arc::clone(&device));
            }
        }

        device.start(self, self.bus.subscribe(&self.topic));
        info!(
            account = %self.hidden_email(),
            device = %serial.hidden(),
            name = %listing.account_name,
            "Added device"
        );
        device
    }

    /// Add every listed device, groups first so members can resolve them
    pub async fn setup_devices<F>(
        self: &Arc<Self>,
        listings: impl IntoIterator<Item = DeviceListing>,
        session_for: F,
    ) -> Vec<Arc<Device>>
    where
        F: Fn(&DeviceListing) -> Arc<dyn RemoteSession>,
    {
        let mut listings: Vec<DeviceListing> = listings.into_iter().collect();
        listings.sort_by_key(|listing| listing.cluster_members.is_empty());

        let mut devices = Vec::with_capacity(listings.len());
        for listing in listings {
            let session = session_for(&listing);
            devices.push(self.add_device(listing, session).await);
        }
        devices
    }

    /// Unregister a device, stop its tasks and unsubscribe it
    pub fn remove_device(&self, serial: &DeviceSerial) -> Option<Arc<Device>> {
        let (_, device) = self.devices.remove(serial)?;
        device.shutdown();
        info!(account = %self.hidden_email(), device = %serial.hidden(), "Removed device");
        Some(device)
    }

    /// Remove every device of the account
    pub fn unload(&self) {
        let serials: Vec<DeviceSerial> = self
            .devices
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        for serial in &serials {
            self.remove_device(serial);
        }
        info!(account = %self.hidden_email(), removed = serials.len(), "Unloaded account");
    }
}
