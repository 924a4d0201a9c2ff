use meshcall_client::SessionNotice;
use meshcall_core::{ConnectionState, SignalKind};

use crate::integration::{init_tracing, join_session_with};
use crate::utils::{
    LoopbackRelay, MockMediaDevices, MockTransportFactory, TransportOp, VIEW_TIMEOUT_MS, settle,
    wait_for_notice, wait_for_view, wait_until,
};

#[tokio::test]
async fn test_configuration_failure_isolates_peer() {
    init_tracing();

    let relay = LoopbackRelay::new();
    let (_b, _b_events) = relay.join("b", "Bea").await;
    let (_c, _c_events) = relay.join("c", "Cy").await;

    let factory = MockTransportFactory::new();
    factory.fail_offer_for("c").await;
    let mut a = join_session_with(&relay, "a", "Ada", MockMediaDevices::new(), factory).await;

    let notice = wait_for_notice(&mut a.notices, |n| {
        matches!(n, SessionNotice::PeerFailed { .. })
    })
    .await
    .expect("No failure notice for C");
    match notice {
        SessionNotice::PeerFailed { peer, .. } => assert_eq!(peer.as_str(), "c"),
        other => panic!("Unexpected notice {other:?}"),
    }

    let hub = &relay;
    wait_until(VIEW_TIMEOUT_MS, move || async move {
        !hub.signals_between("a", "b").await.is_empty()
    })
    .await
    .expect("B was not offered");

    assert_eq!(a.factory.ops_for("c").await.last(), Some(&TransportOp::Close));
    let view = wait_for_view(&a.handle, |v| {
        v.participant(&"c".into())
            .is_some_and(|p| p.connection_state == ConnectionState::Failed)
    })
    .await
    .expect("C not marked failed");
    assert!(view.tile(&meshcall_client::session::TileKey::Remote("c".into())).is_none());

    // A repeated snapshot does not resurrect C
    relay.rebroadcast_roster("a").await;
    settle().await;
    assert_eq!(a.factory.created_for("c").await, 1);
    assert_eq!(a.factory.created_for("b").await, 1);
    assert_eq!(relay.signals_of_kind(SignalKind::SdpOffer).await.len(), 1);
}

#[tokio::test]
async fn test_track_attachment_failure_closes_transport() {
    init_tracing();

    let relay = LoopbackRelay::new();
    let (_b, _b_events) = relay.join("b", "Bea").await;
    let (_c, _c_events) = relay.join("c", "Cy").await;

    let factory = MockTransportFactory::new();
    factory.fail_tracks_for("c").await;
    let mut a = join_session_with(&relay, "a", "Ada", MockMediaDevices::new(), factory).await;

    let notice = wait_for_notice(&mut a.notices, |n| {
        matches!(n, SessionNotice::PeerFailed { .. })
    })
    .await
    .expect("No failure notice for C");
    assert!(matches!(notice, SessionNotice::PeerFailed { ref peer, .. } if peer.as_str() == "c"));

    // The half-built transport is closed, nothing else happened on it
    assert_eq!(a.factory.ops_for("c").await, vec![TransportOp::Close]);
    assert_eq!(a.factory.created_for("c").await, 1);

    let view = wait_for_view(&a.handle, |v| {
        v.participant(&"c".into())
            .is_some_and(|p| p.connection_state == ConnectionState::Failed)
    })
    .await
    .expect("C not marked failed");
    assert!(view.participant(&"b".into()).is_some());
    assert_eq!(relay.signals_of_kind(SignalKind::SdpOffer).await.len(), 1);
}
