//! Media commands: preconditions, group delegation, re-login and the
//! refresh that follows a command.


use std::sync::Arc;
use std::time::Duration;

use alexa_api::mock::{MockLogin, MockSession, SessionCall};
use alexa_api::{ApiError, CommandOptions};
use alexa_state::{AccountContext, DeviceSerial, RefreshMode, StateConfig, StateError, VisibleState};
use test_helpers::*;

fn serial(value: &str) -> DeviceSerial {
    DeviceSerial::new(value)
}

#[tokio::test(start_paused = true)]
async fn test_transport_requires_playing_or_paused() {
    let ctx = context(true);
    let mock = MockSession::with_state(idle());
    let device = ctx.add_device(listing("S1"), session(&mock)).await;

    device.media_play(&ctx).await.unwrap();
    device.media_next_track(&ctx).await.unwrap();
    assert_eq!(mock.count(|c| *c != SessionCall::GetState), 0);

    mock.set_state(playing(30));
    tokio::time::sleep(Duration::from_secs(2)).await;
    device.refresh(&ctx, RefreshMode::Forced).await.unwrap();
    device.media_pause(&ctx).await.unwrap();
    device.media_previous_track(&ctx).await.unwrap();
    assert_eq!(mock.count(|c| *c == SessionCall::Pause), 1);
    assert_eq!(mock.count(|c| *c == SessionCall::Previous), 1);
}

#[tokio::test(start_paused = true)]
async fn test_commands_on_unavailable_device_do_nothing() {
    let ctx = context(true);
    let mock = MockSession::with_state(playing(30));
    let mut offline = listing("S1");
    offline.online = false;
    let device = ctx.add_device(offline, session(&mock)).await;
    assert_eq!(device.visible_state(), VisibleState::Unavailable);

    device.media_pause(&ctx).await.unwrap();
    device.set_volume(&ctx, 0.8).await.unwrap();
    device.send_tts(&ctx, "hello", &CommandOptions::new()).await.unwrap();
    device
        .play_media(&ctx, "routine", "Good morning", &CommandOptions::new())
        .await
        .unwrap();

    assert!(mock.calls().is_empty(), "offline devices are never fetched");
}

#[tokio::test(start_paused = true)]
async fn test_member_delegates_transport_to_playing_parent() {
    let ctx = context(true);
    let g1 = MockSession::with_state(group_playing(40, &[("M", 25)]));
    let g2 = MockSession::with_state(idle());
    let member = MockSession::with_state(idle());

    let sessions = [("G1", g1.clone()), ("G2", g2.clone()), ("M", member.clone())];
    let devices = ctx
        .setup_devices(
            vec![
                listing_with("M", &["G1", "G2"], &[]),
                listing_with("G1", &[], &["M"]),
                listing_with("G2", &[], &["M"]),
            ],
            |listing| {
                let (_, mock) = sessions
                    .iter()
                    .find(|(name, _)| *name == listing.serial_number)
                    .expect("known serial");
                session(mock)
            },
        )
        .await;
    assert_eq!(devices.len(), 3);
    assert_eq!(devices[2].serial(), &serial("M"), "groups are set up first");

    let m = ctx.device(&serial("M")).unwrap();
    let snapshot = m.snapshot();
    assert_eq!(snapshot.playing_parent, Some(serial("G1")));
    assert_eq!(snapshot.volume, Some(0.25));
    assert_eq!(m.visible_state(), VisibleState::Playing);
    assert!(member.calls().is_empty(), "the member session is never fetched");

    m.media_play(&ctx).await.unwrap();
    m.set_volume(&ctx, 0.5).await.unwrap();

    assert_eq!(g1.count(|c| *c == SessionCall::Play), 1);
    assert_eq!(g2.count(|c| *c == SessionCall::Play), 0);
    assert_eq!(member.calls(), vec![SessionCall::SetVolume(0.5)]);
}

#[tokio::test(start_paused = true)]
async fn test_first_of_several_playing_parents_wins() {
    let ctx = context(true);
    let g1 = MockSession::with_state(group_playing(40, &[("M", 10)]));
    let g2 = MockSession::with_state(group_playing(70, &[("M", 90)]));
    ctx.add_device(listing_with("G1", &[], &["M"]), session(&g1)).await;
    ctx.add_device(listing_with("G2", &[], &["M"]), session(&g2)).await;

    let m = ctx
        .add_device(
            listing_with("M", &["G1", "G2"], &[]),
            session(&MockSession::new()),
        )
        .await;

    assert_eq!(m.snapshot().playing_parent, Some(serial("G1")));
    assert_eq!(m.snapshot().volume, Some(0.1));
}

#[tokio::test(start_paused = true)]
async fn test_group_refresh_cascades_to_members() {
    let ctx = context(true);
    let g1 = MockSession::with_state(group_playing(40, &[("M", 25)]));
    let group = ctx.add_device(listing_with("G1", &[], &["M"]), session(&g1)).await;
    let m = ctx
        .add_device(listing_with("M", &["G1"], &[]), session(&MockSession::new()))
        .await;
    assert_eq!(m.snapshot().volume, Some(0.25));
    tokio::time::sleep(Duration::from_secs(5)).await;

    g1.set_state(group_playing(40, &[("M", 60)]));
    group.update(&ctx, RefreshMode::Forced).await.unwrap();
    settle().await;

    assert_eq!(m.snapshot().volume, Some(0.6));
}

#[tokio::test(start_paused = true)]
async fn test_group_cascade_schedules_member_play_refresh() {
    let ctx = context(true);
    let g1 = MockSession::with_state(group_playing(40, &[("M", 25)]));
    let group = ctx.add_device(listing_with("G1", &[], &["M"]), session(&g1)).await;
    let m = ctx
        .add_device(listing_with("M", &["G1"], &[]), session(&MockSession::new()))
        .await;
    assert_eq!(m.visible_state(), VisibleState::Playing);
    assert!(!m.play_timer_pending());
    tokio::time::sleep(Duration::from_secs(5)).await;

    group.update(&ctx, RefreshMode::Forced).await.unwrap();
    settle().await;

    // push is connected but has not proven it reports playback
    assert!(m.play_timer_pending());
    assert!(m.poll_enabled());
}

#[tokio::test(start_paused = true)]
async fn test_group_refresh_without_group_playback_does_not_cascade() {
    let ctx = context(true);
    let g1 = MockSession::with_state(playing(40));
    let group = ctx.add_device(listing_with("G1", &[], &["M"]), session(&g1)).await;
    let member = MockSession::with_state(idle());
    let m = ctx
        .add_device(listing_with("M", &["G1"], &[]), session(&member))
        .await;
    tokio::time::sleep(Duration::from_secs(5)).await;
    let before = m.snapshot();

    group.update(&ctx, RefreshMode::Forced).await.unwrap();
    settle().await;

    assert_eq!(m.snapshot().last_update, before.last_update);
}

#[tokio::test(start_paused = true)]
async fn test_authentication_failure_relogs_in_once() {
    let login = MockLogin::new();
    let ctx = AccountContext::builder(ACCOUNT)
        .with_config(StateConfig::without_periodic_polling())
        .with_login(Arc::new(login.clone()))
        .build()
        .unwrap();
    ctx.set_websocket_active(true);
    let mock = MockSession::with_state(playing(30));
    let device = ctx.add_device(listing("S1"), session(&mock)).await;
    mock.clear_calls();

    mock.fail_next(ApiError::Authentication("expired".to_string()));
    device.set_volume(&ctx, 0.7).await.unwrap();

    assert_eq!(login.attempts(), 1);
    assert_eq!(
        mock.calls(),
        vec![SessionCall::SetVolume(0.7), SessionCall::SetVolume(0.7)]
    );
    assert!(device.is_available());
}

#[tokio::test(start_paused = true)]
async fn test_failed_relogin_marks_device_unavailable() {
    let login = MockLogin::new();
    login.set_fail(true);
    let ctx = AccountContext::builder(ACCOUNT)
        .with_config(StateConfig::without_periodic_polling())
        .with_login(Arc::new(login.clone()))
        .build()
        .unwrap();
    ctx.set_websocket_active(true);
    let mock = MockSession::with_state(playing(30));
    let device = ctx.add_device(listing("S1"), session(&mock)).await;

    mock.fail_next(ApiError::Authentication("expired".to_string()));
    let result = device.media_pause(&ctx).await;

    assert!(matches!(result, Err(StateError::Authentication(_))));
    assert_eq!(login.attempts(), 1);
    assert_eq!(device.visible_state(), VisibleState::Unavailable);
}

#[tokio::test(start_paused = true)]
async fn test_transient_errors_are_not_retried() {
    let login = MockLogin::new();
    let ctx = AccountContext::builder(ACCOUNT)
        .with_config(StateConfig::without_periodic_polling())
        .with_login(Arc::new(login.clone()))
        .build()
        .unwrap();
    ctx.set_websocket_active(true);
    let mock = MockSession::with_state(playing(30));
    let device = ctx.add_device(listing("S1"), session(&mock)).await;
    mock.clear_calls();

    mock.fail_next(ApiError::Network("timeout".to_string()));
    let result = device.media_next_track(&ctx).await;

    assert!(matches!(result, Err(StateError::Api(ApiError::Network(_)))));
    assert_eq!(login.attempts(), 0);
    assert_eq!(mock.calls().len(), 1);
    assert!(device.is_available());
}

#[tokio::test(start_paused = true)]
async fn test_mute_and_unmute_restore_volume() {
    let ctx = context(true);
    let mock = MockSession::with_state(playing(40));
    let device = ctx.add_device(listing("S1"), session(&mock)).await;
    mock.clear_calls();

    device.mute(&ctx, true).await.unwrap();
    assert_eq!(device.snapshot().volume, Some(0.0));
    assert!(device.attributes().is_volume_muted);

    device.mute(&ctx, false).await.unwrap();
    assert_eq!(device.snapshot().volume, Some(0.4));
    assert_eq!(
        mock.calls(),
        vec![SessionCall::SetVolume(0.0), SessionCall::SetVolume(0.4)]
    );
}

#[tokio::test(start_paused = true)]
async fn test_unmute_without_cached_volume_uses_default() {
    let ctx = context(true);
    let mock = MockSession::with_state(idle());
    let device = ctx.add_device(listing("S1"), session(&mock)).await;

    device.mute(&ctx, false).await.unwrap();

    assert_eq!(device.snapshot().volume, Some(0.5));
    assert_eq!(mock.count(|c| *c == SessionCall::SetVolume(0.5)), 1);
}

#[tokio::test(start_paused = true)]
async fn test_set_volume_clamps_and_applies_optimistically() {
    let ctx = context(true);
    let mock = MockSession::with_state(playing(40));
    let device = ctx.add_device(listing("S1"), session(&mock)).await;

    device.set_volume(&ctx, 1.7).await.unwrap();

    assert_eq!(device.snapshot().volume, Some(1.0));
    assert_eq!(mock.count(|c| *c == SessionCall::SetVolume(1.0)), 1);
}

#[tokio::test(start_paused = true)]
async fn test_select_source() {
    let ctx = context(true);
    let mock = MockSession::with_state(idle());
    let device = ctx.add_device(listing("S1"), session(&mock)).await;
    mock.clear_calls();

    device.select_source(&ctx, "Phone").await.unwrap();
    assert_eq!(device.snapshot().source.as_deref(), Some("Phone"));
    device.select_source(&ctx, "Local Speaker").await.unwrap();
    assert_eq!(
        mock.calls(),
        vec![
            SessionCall::SetBluetooth("AA:BB".to_string()),
            SessionCall::DisconnectBluetooth,
        ]
    );

    // unknown names are ignored
    device.select_source(&ctx, "Car").await.unwrap();
    assert_eq!(mock.calls().len(), 2);
    assert_eq!(device.snapshot().source.as_deref(), Some("Local Speaker"));
}

#[tokio::test(start_paused = true)]
async fn test_play_media_routing() {
    let ctx = context(true);
    let mock = MockSession::with_state(idle());
    let device = ctx.add_device(listing("S1"), session(&mock)).await;
    mock.clear_calls();
    let options = CommandOptions::new();
    let customer_id = Some(CUSTOMER_ID.to_string());

    device
        .play_media(&ctx, "sequence", "Alexa.Weather.Play", &options)
        .await
        .unwrap();
    device
        .play_media(&ctx, "routine", "Good morning", &options)
        .await
        .unwrap();
    device
        .play_media(&ctx, "sound", "amzn_sfx_doorbell_01", &options)
        .await
        .unwrap();
    device
        .play_media(&ctx, "SPOTIFY", "jazz", &options)
        .await
        .unwrap();

    assert_eq!(
        mock.calls(),
        vec![
            SessionCall::Sequence {
                sequence: "Alexa.Weather.Play".to_string(),
                customer_id: customer_id.clone(),
            },
            SessionCall::Routine("Good morning".to_string()),
            SessionCall::Sound {
                sound: "amzn_sfx_doorbell_01".to_string(),
                customer_id: customer_id.clone(),
            },
            SessionCall::Music {
                provider: "SPOTIFY".to_string(),
                search: "jazz".to_string(),
                customer_id,
            },
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_play_media_music_answers_with_guidance() {
    let ctx = context(true);
    let mock = MockSession::with_state(idle());
    let device = ctx.add_device(listing("S1"), session(&mock)).await;
    mock.clear_calls();

    device
        .play_media(&ctx, "music", "anything", &CommandOptions::new())
        .await
        .unwrap();

    let calls = mock.calls();
    assert_eq!(calls.len(), 1);
    assert!(matches!(&calls[0], SessionCall::Tts { message, .. } if message.contains("notify")));
}

#[tokio::test(start_paused = true)]
async fn test_commands_refresh_only_without_websocket() {
    let ctx = context(false);
    let mock = MockSession::with_state(idle());
    let device = ctx.add_device(listing("S1"), session(&mock)).await;
    tokio::time::sleep(Duration::from_secs(5)).await;

    device
        .send_announcement(&ctx, "dinner", &CommandOptions::new())
        .await
        .unwrap();
    device
        .send_mobilepush(&ctx, "dinner", &CommandOptions::new())
        .await
        .unwrap();
    assert_eq!(mock.get_state_count(), 1, "messages never refresh");

    device
        .play_media(&ctx, "routine", "Good night", &CommandOptions::new())
        .await
        .unwrap();
    assert_eq!(mock.get_state_count(), 2);

    ctx.set_websocket_active(true);
    tokio::time::sleep(Duration::from_secs(5)).await;
    device
        .play_media(&ctx, "routine", "Good night", &CommandOptions::new())
        .await
        .unwrap();
    assert_eq!(mock.get_state_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_turn_off_pauses_and_clears_media() {
    let ctx = context(true);
    let mock = MockSession::with_state(playing(40));
    let device = ctx.add_device(listing("S1"), session(&mock)).await;
    assert!(device.snapshot().media.title.is_some());

    device.turn_off(&ctx).await.unwrap();

    assert!(!device.poll_enabled());
    assert_eq!(mock.count(|c| *c == SessionCall::Pause), 1);
    assert_eq!(device.snapshot().media.title, None);
}

#[tokio::test(start_paused = true)]
async fn test_device_lifecycle() {
    let ctx = context(true);
    let mock = MockSession::with_state(idle());
    let first = ctx.add_device(listing("S1"), session(&mock)).await;
    let again = ctx.add_device(listing("S1"), session(&mock)).await;
    ctx.add_device(listing("S2"), session(&MockSession::new())).await;

    assert!(Arc::ptr_eq(&first, &again));
    assert_eq!(mock.get_state_count(), 1);
    assert_eq!(ctx.device_count(), 2);
    assert_eq!(ctx.bus().subscriber_count(ctx.topic()), 2);

    ctx.remove_device(&serial("S1"));
    assert_eq!(ctx.device_count(), 1);
    assert_eq!(ctx.bus().subscriber_count(ctx.topic()), 1);

    ctx.unload();
    assert_eq!(ctx.device_count(), 0);
    assert_eq!(ctx.bus().subscriber_count(ctx.topic()), 0);
}
