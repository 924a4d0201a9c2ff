use meshcall_client::{RelayEvent, RendezvousChannel};
use meshcall_core::{SdpType, SessionDescription, SignalEnvelope, SignalKind};

use crate::integration::{init_tracing, join_session};
use crate::utils::{LoopbackRelay, TransportOp, VIEW_TIMEOUT_MS, settle, wait_until};

#[tokio::test]
async fn test_invalid_signals_are_dropped() {
    init_tracing();

    let relay = LoopbackRelay::new();
    let a = join_session(&relay, "a", "Ada").await;
    let (b, _b_events) = relay.join("b", "Bea").await;
    let to_a = "a".into();

    // An answer nobody asked for
    b.send_signal(
        &to_a,
        &SignalEnvelope::Sdp(SessionDescription::answer("stray")),
    )
    .await
    .unwrap();

    // A payload the channel could not decode
    relay
        .inject(
            "a",
            RelayEvent::SignalRejected {
                from: "b".into(),
                reason: "expected value".into(),
            },
        )
        .await;

    // A peer that is not in the room
    relay
        .inject(
            "a",
            RelayEvent::Signal {
                from: "z".into(),
                envelope: SignalEnvelope::Sdp(SessionDescription::offer("ghost")),
            },
        )
        .await;
    settle().await;

    assert!(
        !a.factory
            .ops_for("b")
            .await
            .iter()
            .any(|op| matches!(op, TransportOp::SetRemote(_)))
    );
    assert_eq!(a.factory.created_for("z").await, 0);
    assert!(relay.signals_between("a", "z").await.is_empty());

    // B's connection is unaffected and still negotiates
    b.send_signal(
        &to_a,
        &SignalEnvelope::Sdp(SessionDescription::offer("offer-from-b")),
    )
    .await
    .unwrap();

    let hub = &relay;
    wait_until(VIEW_TIMEOUT_MS, move || async move {
        hub.signals_between("a", "b")
            .await
            .iter()
            .any(|s| s.kind() == Some(SignalKind::SdpAnswer))
    })
    .await
    .expect("A did not answer after dropping bad signals");
    assert!(
        a.factory
            .ops_for("b")
            .await
            .contains(&TransportOp::SetRemote(SdpType::Offer))
    );
}

#[tokio::test]
async fn test_rejected_remote_description_keeps_peer() {
    init_tracing();

    let relay = LoopbackRelay::new();
    let a = join_session(&relay, "a", "Ada").await;
    a.factory.reject_remote_from("b").await;
    let (b, _b_events) = relay.join("b", "Bea").await;

    b.send_signal(
        &"a".into(),
        &SignalEnvelope::Sdp(SessionDescription::offer("garbled")),
    )
    .await
    .unwrap();
    settle().await;

    assert!(relay.signals_between("a", "b").await.is_empty());
    assert!(!a.factory.ops_for("b").await.contains(&TransportOp::Close));
    assert!(a.handle.snapshot().participant(&"b".into()).is_some());
}
