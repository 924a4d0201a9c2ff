use meshcall_client::peer::NegotiationState;
use meshcall_core::TrackKind;

use crate::integration::{init_tracing, join_session};
use crate::utils::{LoopbackRelay, TransportOp, wait_for_view};

#[tokio::test]
async fn test_member_leaves() {
    init_tracing();

    let relay = LoopbackRelay::new();
    let b = join_session(&relay, "b", "Bea").await;
    let a = join_session(&relay, "a", "Ada").await;

    wait_for_view(&a.handle, |v| {
        v.participant(&"b".into())
            .is_some_and(|p| p.negotiation == Some(NegotiationState::Stable))
    })
    .await
    .expect("A never reached stable with B");

    a.factory.emit_track("b", TrackKind::Video).await;
    let view = wait_for_view(&a.handle, |v| v.tiles.len() == 2)
        .await
        .expect("B's tile never appeared");
    assert_eq!(view.tile_keys(), vec!["local", "b"]);

    b.handle.leave().await.expect("B failed to leave");

    let view = wait_for_view(&a.handle, |v| v.participant(&"b".into()).is_none())
        .await
        .expect("A kept B after it left");
    assert_eq!(view.tile_keys(), vec!["local"]);
    assert_eq!(view.participants.len(), 1);
    assert!(a.factory.ops_for("b").await.contains(&TransportOp::Close));
}
