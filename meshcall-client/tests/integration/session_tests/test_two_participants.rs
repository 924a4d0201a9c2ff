use meshcall_client::peer::NegotiationState;
use meshcall_client::session::{TileKey, TileSource};
use meshcall_core::{ConnectionState, SignalKind, TrackKind};

use crate::integration::{init_tracing, join_session};
use crate::utils::{LoopbackRelay, wait_for_view};

fn stable_with(peer: &str) -> impl FnMut(&meshcall_client::SessionView) -> bool + '_ {
    move |v| {
        v.participant(&peer.into())
            .is_some_and(|p| p.negotiation == Some(NegotiationState::Stable))
    }
}

#[tokio::test]
async fn test_two_participants() {
    init_tracing();

    let relay = LoopbackRelay::new();
    let b = join_session(&relay, "b", "Bea").await;
    let a = join_session(&relay, "a", "Ada").await;

    wait_for_view(&a.handle, stable_with("b"))
        .await
        .expect("A never reached stable");
    wait_for_view(&b.handle, stable_with("a"))
        .await
        .expect("B never reached stable");

    let offers = relay.signals_of_kind(SignalKind::SdpOffer).await;
    let answers = relay.signals_of_kind(SignalKind::SdpAnswer).await;
    assert_eq!(offers.len(), 1);
    assert_eq!((offers[0].from.as_str(), offers[0].to.as_str()), ("a", "b"));
    assert_eq!(answers.len(), 1);
    assert_eq!((answers[0].from.as_str(), answers[0].to.as_str()), ("b", "a"));

    // B's media reaches A
    a.factory.emit_track("b", TrackKind::Audio).await;
    a.factory.emit_track("b", TrackKind::Video).await;
    a.factory.emit_state("b", ConnectionState::Connected).await;

    let view = wait_for_view(&a.handle, |v| {
        v.tiles.len() == 2
            && matches!(
                v.tile(&TileKey::Remote("b".into())).map(|t| &t.source),
                Some(TileSource::Remote { audio: true, video: true, .. })
            )
            && v.participant(&"b".into())
                .is_some_and(|p| p.connection_state == ConnectionState::Connected)
    })
    .await
    .expect("B's tile never became complete");

    assert_eq!(view.tile_keys(), vec!["local", "b"]);
    assert_eq!(view.tiles[0].name, "Ada");
    assert_eq!(view.tiles[1].name, "Bea");
    assert_eq!(view.tiles[0].source, TileSource::Preview(meshcall_core::MediaSource::Camera));
}
