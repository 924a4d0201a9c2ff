use meshcall_client::RendezvousChannel;
use meshcall_client::peer::NegotiationState;
use meshcall_core::{SdpType, SessionDescription, SignalEnvelope, SignalKind};

use crate::integration::{init_tracing, join_session};
use crate::utils::{LoopbackRelay, TransportOp, VIEW_TIMEOUT_MS, settle, wait_for_view, wait_until};

#[tokio::test]
async fn test_offer_yields_single_answer() {
    init_tracing();

    let relay = LoopbackRelay::new();
    let a = join_session(&relay, "a", "Ada").await;
    let (b, _b_events) = relay.join("b", "Bea").await;

    b.send_signal(
        &"a".into(),
        &SignalEnvelope::Sdp(SessionDescription::offer("offer-from-b")),
    )
    .await
    .expect("Failed to send offer");

    let hub = &relay;
    wait_until(VIEW_TIMEOUT_MS, move || async move {
        !hub.signals_between("a", "b").await.is_empty()
    })
    .await
    .expect("A never answered");
    settle().await;

    let replies = relay.signals_between("a", "b").await;
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].kind(), Some(SignalKind::SdpAnswer));

    // The answer is produced only after the offer is applied
    let ops: Vec<_> = a
        .factory
        .ops_for("b")
        .await
        .into_iter()
        .filter(|op| !matches!(op, TransportOp::AddTrack(_)))
        .collect();
    assert_eq!(
        ops,
        vec![
            TransportOp::SetRemote(SdpType::Offer),
            TransportOp::CreateAnswer,
            TransportOp::SetLocal(SdpType::Answer),
        ]
    );

    wait_for_view(&a.handle, |v| {
        v.participant(&"b".into())
            .is_some_and(|p| p.negotiation == Some(NegotiationState::Stable))
    })
    .await
    .expect("A did not reach stable");
}
