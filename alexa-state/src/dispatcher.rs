//! Media commands of a device entity
//!
//! Every command checks its preconditions and silently does nothing when
//! they fail. Transport commands of a device that defers to a playing
//! parent group are forwarded to the parent's entity; everything else acts
//! on the device itself. After a command that changes remote state the
//! device refreshes unless the push channel will report the change.

use std::sync::Arc;

use alexa_api::CommandOptions;
use futures::future::{BoxFuture, FutureExt};
use tracing::{debug, warn};

use crate::account::AccountContext;
use crate::device::Device;
use crate::error::Result;
use crate::model::LOCAL_SOURCE;

/// Spoken reply to a `music` play-media request
const MUSIC_GUIDANCE: &str = "Sorry, text to speech can only be called with the notify service. \
     Please see the documentation for details.";

/// Play-media types routed to dedicated remote operations
const MEDIA_MUSIC: &str = "music";
const MEDIA_SEQUENCE: &str = "sequence";
const MEDIA_ROUTINE: &str = "routine";
const MEDIA_SOUND: &str = "sound";

/// Transport command, forwarded to a playing parent group when there is one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportCommand {
    Play,
    Pause,
    Next,
    Previous,
}

impl Device {
    /// Send a transport command
    ///
    /// Requires the device to be available and playing or paused.
    pub fn transport(
        self: &Arc<Self>,
        ctx: &Arc<AccountContext>,
        command: TransportCommand,
    ) -> BoxFuture<'static, Result<()>> {
        let device = Arc::clone(self);
        let ctx = Arc::clone(ctx);
        async move {
            let (state, parent) = {
                let snapshot = device.snapshot();
                (snapshot.visible_state(), snapshot.playing_parent)
            };
            if !state.accepts_transport() {
                debug!(device = %device.serial().hidden(), ?command, ?state, "Ignoring transport command");
                return Ok(());
            }

            match parent.and_then(|serial| ctx.device(&serial)) {
                Some(parent) => {
                    debug!(
                        device = %device.serial().hidden(),
                        parent = %parent.serial().hidden(),
                        ?command,
                        "Forwarding to playing parent"
                    );
                    parent.transport(&ctx, command).await?;
                }
                None => {
                    let session = &device.session;
                    device
                        .remote(&ctx, || match command {
                            TransportCommand::Play => session.play(),
                            TransportCommand::Pause => session.pause(),
                            TransportCommand::Next => session.next(),
                            TransportCommand::Previous => session.previous(),
                        })
                        .await?;
                }
            }

            device.refresh_after_command(&ctx).await;
            Ok(())
        }
        .boxed()
    }

    pub async fn media_play(self: &Arc<Self>, ctx: &Arc<AccountContext>) -> Result<()> {
        self.transport(ctx, TransportCommand::Play).await
    }

    pub async fn media_pause(self: &Arc<Self>, ctx: &Arc<AccountContext>) -> Result<()> {
        self.transport(ctx, TransportCommand::Pause).await
    }

    pub async fn media_next_track(self: &Arc<Self>, ctx: &Arc<AccountContext>) -> Result<()> {
        self.transport(ctx, TransportCommand::Next).await
    }

    pub async fn media_previous_track(self: &Arc<Self>, ctx: &Arc<AccountContext>) -> Result<()> {
        self.transport(ctx, TransportCommand::Previous).await
    }

    /// Set the volume, `level` clamped to [0, 1]
    pub async fn set_volume(self: &Arc<Self>, ctx: &Arc<AccountContext>, level: f64) -> Result<()> {
        if !self.is_available() {
            return Ok(());
        }
        let level = level.clamp(0.0, 1.0);
        self.apply_and_notify(|s| s.volume = Some(level));
        self.remote(ctx, || self.session.set_volume(level)).await?;
        self.refresh_after_command(ctx).await;
        Ok(())
    }

    /// Mute by setting the volume to zero; unmute restores the cached volume
    pub async fn mute(self: &Arc<Self>, ctx: &Arc<AccountContext>, mute: bool) -> Result<()> {
        if !self.is_available() {
            return Ok(());
        }
        let fallback = self.default_unmute_volume();
        let level = self.apply_and_notify(|s| {
            s.media.muted = Some(mute);
            let level = if mute {
                s.previous_volume = s.volume;
                0.0
            } else {
                s.previous_volume.unwrap_or(fallback)
            };
            s.volume = Some(level);
            level
        });
        self.remote(ctx, || self.session.set_volume(level)).await?;
        self.refresh_after_command(ctx).await;
        Ok(())
    }

    /// Switch to the local speaker or to a paired bluetooth source by name
    pub async fn select_source(self: &Arc<Self>, ctx: &Arc<AccountContext>, source: &str) -> Result<()> {
        if !self.is_available() {
            return Ok(());
        }

        if source == LOCAL_SOURCE {
            self.remote(ctx, || self.session.disconnect_bluetooth()).await?;
        } else {
            let address = self
                .snapshot()
                .bluetooth
                .paired_devices()
                .iter()
                .find(|device| device.friendly_name == source)
                .map(|device| device.address.clone());
            let Some(address) = address else {
                debug!(device = %self.serial().hidden(), source, "Unknown source, ignoring");
                return Ok(());
            };
            self.remote(ctx, || self.session.set_bluetooth(&address)).await?;
        }

        self.apply_and_notify(|s| s.source = Some(source.to_string()));
        self.refresh_after_command(ctx).await;
        Ok(())
    }

    pub async fn set_shuffle(self: &Arc<Self>, ctx: &Arc<AccountContext>, shuffle: bool) -> Result<()> {
        if !self.is_available() {
            return Ok(());
        }
        self.remote(ctx, || self.session.shuffle(shuffle)).await?;
        self.apply_and_notify(|s| s.shuffle = Some(shuffle));
        Ok(())
    }

    /// Re-enable polling and pause
    pub async fn turn_on(self: &Arc<Self>, ctx: &Arc<AccountContext>) -> Result<()> {
        self.apply_and_notify(|s| s.poll_enabled = true);
        self.media_pause(ctx).await
    }

    /// Disable polling, pause and clear media details
    pub async fn turn_off(self: &Arc<Self>, ctx: &Arc<AccountContext>) -> Result<()> {
        self.apply_and_notify(|s| s.poll_enabled = false);
        self.media_pause(ctx).await?;
        self.apply_and_notify(|s| s.clear_media());
        Ok(())
    }

    pub async fn send_tts(
        self: &Arc<Self>,
        ctx: &Arc<AccountContext>,
        message: &str,
        options: &CommandOptions,
    ) -> Result<()> {
        if !self.is_available() {
            return Ok(());
        }
        let customer_id = self.customer_id();
        self.remote(ctx, || {
            self.session
                .send_tts(message, customer_id.as_deref(), options)
        })
        .await
    }

    pub async fn send_announcement(
        self: &Arc<Self>,
        ctx: &Arc<AccountContext>,
        message: &str,
        options: &CommandOptions,
    ) -> Result<()> {
        if !self.is_available() {
            return Ok(());
        }
        let customer_id = self.customer_id();
        self.remote(ctx, || {
            self.session
                .send_announcement(message, customer_id.as_deref(), options)
        })
        .await
    }

    /// Push a notification to the owner's companion apps
    pub async fn send_mobilepush(
        self: &Arc<Self>,
        ctx: &Arc<AccountContext>,
        message: &str,
        options: &CommandOptions,
    ) -> Result<()> {
        if !self.is_available() {
            return Ok(());
        }
        let customer_id = self.customer_id();
        self.remote(ctx, || {
            self.session
                .send_mobilepush(message, customer_id.as_deref(), options)
        })
        .await
    }

    /// Route a generic play-media request by its type tag
    ///
    /// `music` is answered with spoken guidance; `sequence`, `routine` and
    /// `sound` use their dedicated operations; any other type is taken as
    /// a music provider to search.
    pub async fn play_media(
        self: &Arc<Self>,
        ctx: &Arc<AccountContext>,
        media_type: &str,
        media_id: &str,
        options: &CommandOptions,
    ) -> Result<()> {
        if !self.is_available() {
            return Ok(());
        }
        let customer_id = self.customer_id();
        let customer_id = customer_id.as_deref();
        let session = &self.session;

        match media_type {
            MEDIA_MUSIC => {
                self.send_tts(ctx, MUSIC_GUIDANCE, &CommandOptions::new())
                    .await?;
                warn!(
                    device = %self.serial().hidden(),
                    "Text to speech must be sent through the notify service, not play_media"
                );
            }
            MEDIA_SEQUENCE => {
                self.remote(ctx, || session.send_sequence(media_id, customer_id, options))
                    .await?;
            }
            MEDIA_ROUTINE => {
                self.remote(ctx, || session.run_routine(media_id)).await?;
            }
            MEDIA_SOUND => {
                self.remote(ctx, || session.play_sound(media_id, customer_id, options))
                    .await?;
            }
            provider => {
                self.remote(ctx, || {
                    session.play_music(provider, media_id, customer_id, options)
                })
                .await?;
            }
        }

        self.refresh_after_command(ctx).await;
        Ok(())
    }
}
