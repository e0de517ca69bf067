//! The device entity
//!
//! A [`Device`] owns the snapshot of one physical or virtual device and the
//! tasks that keep it current: the bus listener, the host poll loop and the
//! timers scheduled by the poll scheduler and by debounced events. All
//! mutation goes through [`Device::apply_and_notify`], which publishes the
//! resulting [`DeviceAttributes`] to watchers when they change.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use alexa_api::{DeviceListing, PlayerInfo, RemoteSession};
use alexa_stream::{PushEnvelope, Subscription};
use chrono::Utc;
use futures::future::{BoxFuture, FutureExt};
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, trace, warn};

use crate::account::AccountContext;
use crate::config::StateConfig;
use crate::error::{Result, StateError};
use crate::interpreter::{self, EventAction, RefreshPlan};
use crate::model::{DeviceAttributes, DeviceSerial, DeviceSnapshot, VisibleState};
use crate::poll::{PollDecision, PollScheduler};
use crate::reconciler;
use crate::throttle::{RefreshGuard, RefreshMode, RefreshSkipped};

/// Result of a refresh request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Completed,
    Skipped(RefreshSkipped),
}

#[derive(Default)]
struct DeviceTasks {
    listener: Option<JoinHandle<()>>,
    poll_loop: Option<JoinHandle<()>>,
    play_timer: Option<JoinHandle<()>>,
    final_timer: Option<JoinHandle<()>>,
    debounce: Option<JoinHandle<()>>,
}

impl DeviceTasks {
    fn abort_all(&mut self) {
        let handles = [
            self.listener.take(),
            self.poll_loop.take(),
            self.play_timer.take(),
            self.final_timer.take(),
            self.debounce.take(),
        ];
        for handle in handles.into_iter().flatten() {
            handle.abort();
        }
    }
}

/// One device entity
pub struct Device {
    serial: DeviceSerial,
    pub(crate) session: Arc<dyn RemoteSession>,
    snapshot: Mutex<DeviceSnapshot>,
    guard: RefreshGuard,
    scheduler: Mutex<PollScheduler>,
    tasks: Mutex<DeviceTasks>,
    attributes: watch::Sender<DeviceAttributes>,
    event_debounce: Duration,
    default_unmute_volume: f64,
    scan_interval: Duration,
}

impl Device {
    /// Create an entity from its initial listing
    ///
    /// Nothing is fetched until the first refresh.
    pub fn new(
        listing: &DeviceListing,
        session: Arc<dyn RemoteSession>,
        config: &StateConfig,
    ) -> Arc<Self> {
        let snapshot = DeviceSnapshot::from_listing(listing);
        let (attributes, _) = watch::channel(DeviceAttributes::from(&snapshot));

        Arc::new(Self {
            serial: snapshot.serial().clone(),
            session,
            snapshot: Mutex::new(snapshot),
            guard: RefreshGuard::new(config.scan_interval, config.forced_scan_interval),
            scheduler: Mutex::new(PollScheduler::new(config)),
            tasks: Mutex::new(DeviceTasks::default()),
            attributes,
            event_debounce: config.event_debounce,
            default_unmute_volume: config.default_unmute_volume,
            scan_interval: config.scan_interval,
        })
    }

    pub fn serial(&self) -> &DeviceSerial {
        &self.serial
    }

    /// Copy of the current snapshot
    pub fn snapshot(&self) -> DeviceSnapshot {
        self.snapshot.lock().clone()
    }

    pub fn attributes(&self) -> DeviceAttributes {
        self.attributes.borrow().clone()
    }

    /// Receiver that sees every attribute change
    pub fn watch(&self) -> watch::Receiver<DeviceAttributes> {
        self.attributes.subscribe()
    }

    pub fn visible_state(&self) -> VisibleState {
        self.snapshot.lock().visible_state()
    }

    pub fn is_available(&self) -> bool {
        self.snapshot.lock().available
    }

    pub fn poll_enabled(&self) -> bool {
        self.snapshot.lock().poll_enabled
    }

    /// Session the media details were last taken from
    pub fn session_info(&self) -> Option<PlayerInfo> {
        self.snapshot.lock().session.clone()
    }

    pub(crate) fn customer_id(&self) -> Option<String> {
        self.snapshot.lock().auth.customer_id.clone()
    }

    pub(crate) fn default_unmute_volume(&self) -> f64 {
        self.default_unmute_volume
    }

    pub fn refresh_guard(&self) -> &RefreshGuard {
        &self.guard
    }

    pub fn play_timer_pending(&self) -> bool {
        self.scheduler.lock().play_timer_pending()
    }

    /// Mutate the snapshot and publish the resulting attributes
    pub fn apply_and_notify<R>(&self, mutate: impl FnOnce(&mut DeviceSnapshot) -> R) -> R {
        let (result, attributes) = {
            let mut snapshot = self.snapshot.lock();
            let result = mutate(&mut snapshot);
            (result, DeviceAttributes::from(&*snapshot))
        };
        self.attributes.send_if_modified(|current| {
            if *current == attributes {
                false
            } else {
                *current = attributes;
                true
            }
        });
        result
    }

    /// Run a remote call through the account's re-login wrapper
    ///
    /// An authentication failure that survives re-login marks the device
    /// unavailable.
    pub(crate) async fn remote<T, F, Fut>(&self, ctx: &AccountContext, call: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = alexa_api::Result<T>>,
    {
        let result = ctx.with_relogin(call).await;
        if let Err(StateError::Authentication(reason)) = &result {
            warn!(device = %self.serial.hidden(), reason = %reason, "Marking device unavailable");
            self.apply_and_notify(|s| s.available = false);
        }
        result
    }

    // ------------------------------------------------------------------
    // Refresh
    // ------------------------------------------------------------------

    /// Refresh the snapshot from the latest listing and the remote session
    ///
    /// The listing is applied first. When the session fetch fails, only the
    /// listing fields have changed and the error is returned. A completed
    /// refresh of a group that plays across members triggers a refresh of
    /// every available member without waiting for them.
    pub fn refresh(
        self: &Arc<Self>,
        ctx: &Arc<AccountContext>,
        mode: RefreshMode,
    ) -> BoxFuture<'static, Result<RefreshOutcome>> {
        let device = Arc::clone(self);
        let ctx = Arc::clone(ctx);
        async move {
            let _permit = match device.guard.try_acquire(mode, Instant::now()) {
                Ok(permit) => permit,
                Err(skipped) => {
                    trace!(device = %device.serial.hidden(), ?skipped, "Refresh skipped");
                    return Ok(RefreshOutcome::Skipped(skipped));
                }
            };

            let listing = ctx.listing(&device.serial);
            let (available, supports_music, parents) = device.apply_and_notify(|s| {
                if let Some(listing) = &listing {
                    reconciler::apply_listing(s, listing);
                }
                (s.available, s.supports_music(), s.parent_clusters.clone())
            });

            if !available {
                debug!(device = %device.serial.hidden(), "Device offline, clearing media");
                device.apply_and_notify(|s| reconciler::reconcile(s, None, None, None));
                return Ok(RefreshOutcome::Completed);
            }

            debug!(
                account = %ctx.hidden_email(),
                device = %device.serial.hidden(),
                ?mode,
                "Refreshing"
            );

            let mut playing_parent = None;
            let session = if supports_music {
                let playing: Vec<DeviceSerial> = parents
                    .into_iter()
                    .filter(|parent| {
                        ctx.device(parent)
                            .is_some_and(|d| d.visible_state() == VisibleState::Playing)
                    })
                    .collect();
                playing_parent = reconciler::select_playing_parent(&device.serial, playing);

                let parent_session = playing_parent
                    .as_ref()
                    .and_then(|parent| ctx.device(parent))
                    .and_then(|parent| parent.session_info());

                match parent_session {
                    Some(parent) => Some(reconciler::member_session(&parent, &device.serial)),
                    None => {
                        playing_parent = None;
                        let state = device
                            .remote(&ctx, || device.session.get_state())
                            .await?;
                        state.player_info
                    }
                }
            } else {
                None
            };

            let last_called = ctx.last_called();
            let group_playback = device.apply_and_notify(|s| {
                s.playing_parent = playing_parent;
                reconciler::reconcile(s, None, last_called.as_ref(), session);
                s.last_update = Some(Utc::now());
                s.media.player_state.is_some()
                    && s.session.as_ref().is_some_and(PlayerInfo::playing_in_group)
            });

            if group_playback {
                device.refresh_members(&ctx);
            }
            Ok(RefreshOutcome::Completed)
        }
        .boxed()
    }

    fn refresh_members(&self, ctx: &Arc<AccountContext>) {
        let members = self.snapshot.lock().cluster_members.clone();
        for member in members {
            if member == self.serial {
                continue;
            }
            let Some(device) = ctx.device(&member) else {
                continue;
            };
            if !device.is_available() {
                continue;
            }
            let update = device.update(ctx, RefreshMode::Forced);
            tokio::spawn(async move {
                if let Err(error) = update.await {
                    error!(device = %member.hidden(), error = %error, "Group member refresh failed");
                }
            });
        }
    }

    /// Refresh, then let the poll scheduler decide what comes next
    pub fn update(
        self: &Arc<Self>,
        ctx: &Arc<AccountContext>,
        mode: RefreshMode,
    ) -> BoxFuture<'static, Result<RefreshOutcome>> {
        let device = Arc::clone(self);
        let ctx = Arc::clone(ctx);
        async move {
            let outcome = device.refresh(&ctx, mode).await?;
            if outcome == RefreshOutcome::Completed {
                device.schedule_next_poll(&ctx);
            }
            Ok(outcome)
        }
        .boxed()
    }

    fn schedule_next_poll(self: &Arc<Self>, ctx: &Arc<AccountContext>) {
        let (state, poll_enabled) = {
            let snapshot = self.snapshot.lock();
            (snapshot.visible_state(), snapshot.poll_enabled)
        };
        let decision = self
            .scheduler
            .lock()
            .after_refresh(state, poll_enabled, ctx.push_health());

        match decision {
            PollDecision::Unchanged => {}
            PollDecision::SchedulePlayRefresh(delay) => {
                debug!(device = %self.serial.hidden(), ?delay, "Playing; scheduling update");
                let handle = self.spawn_timer(ctx, delay, true);
                self.tasks.lock().play_timer = Some(handle);
            }
            PollDecision::DisablePolling => {
                debug!(device = %self.serial.hidden(), "Disabling polling");
                self.apply_and_notify(|s| s.poll_enabled = false);
            }
            PollDecision::FinalPoll { final_refresh } => {
                self.apply_and_notify(|s| s.poll_enabled = false);
                match final_refresh {
                    Some(delay) => {
                        debug!(
                            device = %self.serial.hidden(),
                            ?delay,
                            "Disabling polling and scheduling last update"
                        );
                        let handle = self.spawn_timer(ctx, delay, false);
                        if let Some(previous) = self.tasks.lock().final_timer.replace(handle) {
                            previous.abort();
                        }
                    }
                    None => debug!(device = %self.serial.hidden(), "Disabling polling"),
                }
            }
        }
    }

    fn spawn_timer(
        self: &Arc<Self>,
        ctx: &Arc<AccountContext>,
        delay: Duration,
        play_timer: bool,
    ) -> JoinHandle<()> {
        let device = Arc::clone(self);
        let ctx = Arc::clone(ctx);
        tokio::spawn(async move {
            let mut delay = delay;
            loop {
                tokio::time::sleep(delay).await;
                if play_timer {
                    device.scheduler.lock().play_timer_done();
                }
                match device.update(&ctx, RefreshMode::Forced).await {
                    Ok(RefreshOutcome::Completed) => return,
                    Ok(RefreshOutcome::Skipped(RefreshSkipped::TooSoon { remaining })) => {
                        trace!(
                            device = %device.serial.hidden(),
                            ?remaining,
                            "Scheduled update too soon, retrying"
                        );
                        if play_timer {
                            device.scheduler.lock().play_timer_rearmed();
                        }
                        delay = remaining;
                    }
                    Ok(RefreshOutcome::Skipped(RefreshSkipped::InFlight)) => {
                        // The running refresh may not reschedule anything
                        if play_timer {
                            device.schedule_next_poll(&ctx);
                        }
                        return;
                    }
                    Err(error) => {
                        warn!(device = %device.serial.hidden(), error = %error, "Scheduled update failed");
                        // Keep polling while playing
                        if play_timer {
                            device.schedule_next_poll(&ctx);
                        }
                        return;
                    }
                }
            }
        })
    }

    /// Refresh after a command, unless the push channel will report the change
    pub(crate) async fn refresh_after_command(self: &Arc<Self>, ctx: &Arc<AccountContext>) {
        if ctx.websocket_active() {
            return;
        }
        if let Err(error) = self.update(ctx, RefreshMode::Forced).await {
            warn!(device = %self.serial.hidden(), error = %error, "Refresh after command failed");
        }
    }

    // ------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------

    /// Apply one push event from the account bus
    pub async fn handle_event(
        self: &Arc<Self>,
        ctx: &Arc<AccountContext>,
        envelope: &PushEnvelope,
    ) -> Result<()> {
        let classification = {
            let snapshot = self.snapshot.lock();
            interpreter::classify(&envelope.event, &snapshot, ctx.push_health())
        };
        if !classification.matched {
            return Ok(());
        }

        debug!(
            device = %self.serial.hidden(),
            command = %envelope.command,
            action = ?classification.action,
            refresh = ?classification.refresh,
            "Handling push event"
        );

        let action = classification.action;
        self.apply_and_notify(|s| {
            s.available = true;
            apply_action(s, action);
        });

        match classification.refresh {
            RefreshPlan::None => Ok(()),
            RefreshPlan::Immediate => self.update(ctx, RefreshMode::Forced).await.map(|_| ()),
            RefreshPlan::Debounced => {
                self.schedule_debounced_refresh(ctx);
                Ok(())
            }
        }
    }

    /// A newer debounced refresh supersedes one still waiting
    fn schedule_debounced_refresh(self: &Arc<Self>, ctx: &Arc<AccountContext>) {
        let handle = self.spawn_timer(ctx, self.event_debounce, false);
        if let Some(previous) = self.tasks.lock().debounce.replace(handle) {
            previous.abort();
        }
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Start the bus listener and, when enabled, the host poll loop
    pub(crate) fn start(self: &Arc<Self>, ctx: &Arc<AccountContext>, subscription: Subscription) {
        let listener = {
            let device = Arc::clone(self);
            let ctx = Arc::clone(ctx);
            let mut subscription = subscription;
            tokio::spawn(async move {
                while let Some(envelope) = subscription.recv().await {
                    if let Err(error) = device.handle_event(&ctx, &envelope).await {
                        warn!(device = %device.serial.hidden(), error = %error, "Event handling failed");
                    }
                }
                debug!(device = %device.serial.hidden(), "Account topic closed");
            })
        };

        let poll_loop = ctx
            .config()
            .periodic_polling
            .then(|| self.spawn_poll_loop(ctx));

        let mut tasks = self.tasks.lock();
        tasks.listener = Some(listener);
        tasks.poll_loop = poll_loop;
    }

    fn spawn_poll_loop(self: &Arc<Self>, ctx: &Arc<AccountContext>) -> JoinHandle<()> {
        let device = Arc::clone(self);
        let ctx = Arc::clone(ctx);
        let period = self.scan_interval;
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // first tick is immediate and the entity was refreshed on setup
            interval.tick().await;
            loop {
                interval.tick().await;
                if !device.poll_enabled() {
                    continue;
                }
                if let Err(error) = device.update(&ctx, RefreshMode::Scheduled).await {
                    warn!(device = %device.serial.hidden(), error = %error, "Poll failed");
                }
            }
        })
    }

    /// Stop every task of the entity; dropping the listener unsubscribes it
    pub(crate) fn shutdown(&self) {
        self.tasks.lock().abort_all();
        self.scheduler.lock().play_timer_done();
    }
}

impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device")
            .field("serial", &self.serial)
            .field("state", &self.visible_state())
            .finish()
    }
}

fn apply_action(snapshot: &mut DeviceSnapshot, action: EventAction) {
    match action {
        EventAction::UpdateLastCalled { timestamp } => {
            snapshot.last_called = true;
            snapshot.last_called_timestamp = timestamp;
        }
        EventAction::UpdateBluetooth(state) => {
            snapshot.bluetooth = state;
            reconciler::resolve_sources(snapshot);
        }
        EventAction::UpdatePlayerVolume(level) => snapshot.volume = Some(level),
        EventAction::UpdateConnection { available } => snapshot.available = available,
        EventAction::UpdateRepeat(repeat) => snapshot.repeat = repeat,
        EventAction::UpdateShuffle(shuffle) => snapshot.shuffle = shuffle,
        EventAction::FullRefresh | EventAction::Ignore => {}
    }
}
