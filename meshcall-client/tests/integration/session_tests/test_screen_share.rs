use meshcall_client::SessionNotice;
use meshcall_client::session::TileSource;
use meshcall_core::{MediaSource, TrackKind};

use crate::integration::{init_tracing, join_session};
use crate::utils::{
    LoopbackRelay, TransportOp, VIEW_TIMEOUT_MS, wait_for_notice, wait_for_view, wait_until,
};

fn replaced(ops: &[TransportOp]) -> usize {
    ops.iter()
        .filter(|op| matches!(op, TransportOp::ReplaceTrack { .. }))
        .count()
}

#[tokio::test]
async fn test_screen_share_swaps_source_and_reverts_on_revoke() {
    init_tracing();

    let relay = LoopbackRelay::new();
    let (_b, _b_events) = relay.join("b", "Bea").await;
    let (_c, _c_events) = relay.join("c", "Cy").await;
    let a = join_session(&relay, "a", "Ada").await;

    let factory = &a.factory;
    wait_until(VIEW_TIMEOUT_MS, move || async move {
        factory.created().await.len() == 2
    })
    .await
    .expect("Entries not created");

    a.handle.toggle_screen_share().await.unwrap();
    let view = wait_for_view(&a.handle, |v| v.media.active_source == MediaSource::Screen)
        .await
        .expect("Screen share did not start");
    assert_eq!(view.tiles[0].source, TileSource::Preview(MediaSource::Screen));

    // Every peer sends the screen now, over the same connections
    for peer in ["b", "c"] {
        let ops = a.factory.ops_for(peer).await;
        assert!(ops.iter().any(|op| matches!(
            op,
            TransportOp::ReplaceTrack { kind: TrackKind::Video, .. }
        )));
        assert_eq!(replaced(&ops), 2);
        assert_eq!(a.factory.created_for(peer).await, 1);
    }

    // The platform's "stop sharing" button
    assert!(a.devices.revoke_screen().await);
    let view = wait_for_view(&a.handle, |v| v.media.active_source == MediaSource::Camera)
        .await
        .expect("Camera was not restored");
    assert_eq!(view.tiles[0].source, TileSource::Preview(MediaSource::Camera));
    assert_eq!(a.devices.camera_acquisitions(), 2);

    for peer in ["b", "c"] {
        let ops = a.factory.ops_for(peer).await;
        assert_eq!(replaced(&ops), 4);
        assert!(!ops.contains(&TransportOp::Close));
    }
    assert_eq!(a.factory.created().await.len(), 2);
}

#[tokio::test]
async fn test_screen_share_toggles_off() {
    init_tracing();

    let relay = LoopbackRelay::new();
    let a = join_session(&relay, "a", "Ada").await;

    a.handle.toggle_screen_share().await.unwrap();
    wait_for_view(&a.handle, |v| v.media.active_source == MediaSource::Screen)
        .await
        .expect("Screen share did not start");

    a.handle.toggle_screen_share().await.unwrap();
    wait_for_view(&a.handle, |v| v.media.active_source == MediaSource::Camera)
        .await
        .expect("Screen share did not stop");
    assert_eq!(a.devices.screen_acquisitions(), 1);
}

#[tokio::test]
async fn test_denied_screen_share_reverts() {
    init_tracing();

    let relay = LoopbackRelay::new();
    let mut a = join_session(&relay, "a", "Ada").await;
    a.devices.deny_screen(true);

    a.handle.toggle_screen_share().await.unwrap();
    let notice = wait_for_notice(&mut a.notices, |n| {
        matches!(n, SessionNotice::MediaUnavailable(_))
    })
    .await
    .expect("No media notice");
    assert!(matches!(notice, SessionNotice::MediaUnavailable(_)));

    let view = a.handle.snapshot();
    assert_eq!(view.media.active_source, MediaSource::Camera);
    assert!(view.media_ready);
}

#[tokio::test]
async fn test_video_only_screen_keeps_microphone() {
    init_tracing();

    let relay = LoopbackRelay::new();
    let (_b, _b_events) = relay.join("b", "Bea").await;
    let a = join_session(&relay, "a", "Ada").await;
    a.devices.screen_without_audio(true);

    let factory = &a.factory;
    wait_until(VIEW_TIMEOUT_MS, move || async move {
        factory.created_for("b").await == 1
    })
    .await
    .expect("Entry not created");
    let mic = a
        .factory
        .sending("b", TrackKind::Audio)
        .await
        .expect("No microphone sent");

    a.handle.toggle_screen_share().await.unwrap();
    wait_for_view(&a.handle, |v| v.media.active_source == MediaSource::Screen)
        .await
        .expect("Screen share did not start");

    // Only video is swapped; the microphone keeps flowing
    let ops = a.factory.ops_for("b").await;
    assert_eq!(replaced(&ops), 1);
    assert!(ops.iter().any(|op| matches!(
        op,
        TransportOp::ReplaceTrack { kind: TrackKind::Video, .. }
    )));
    let sent = a.factory.sending("b", TrackKind::Audio).await.unwrap();
    assert_eq!(sent.id(), mic.id());
    assert!(!mic.is_stopped());
    assert!(mic.is_enabled());

    a.handle.set_microphone_enabled(false).await.unwrap();
    wait_for_view(&a.handle, |v| !v.media.audio_enabled)
        .await
        .expect("Microphone still on");
    assert!(!mic.is_enabled());

    // Back on the camera the carried microphone is replaced and released
    a.handle.toggle_screen_share().await.unwrap();
    wait_for_view(&a.handle, |v| v.media.active_source == MediaSource::Camera)
        .await
        .expect("Camera was not restored");
    let sent = a.factory.sending("b", TrackKind::Audio).await.unwrap();
    assert_ne!(sent.id(), mic.id());
    assert!(!sent.is_enabled());
    assert!(mic.is_stopped());
}
