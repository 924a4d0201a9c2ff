use crate::integration::{init_tracing, join_session};
use crate::utils::{LoopbackRelay, settle, wait_for_view};

#[tokio::test]
async fn test_chat() {
    init_tracing();

    let relay = LoopbackRelay::new();
    let b = join_session(&relay, "b", "Bea").await;
    let a = join_session(&relay, "a", "Ada").await;

    a.handle.send_chat("   ").await.unwrap();
    a.handle.send_chat("hello").await.unwrap();

    let view = wait_for_view(&b.handle, |v| v.messages.len() == 1)
        .await
        .expect("B never received the message");
    assert_eq!(view.unseen_messages, 1);
    assert_eq!(view.messages[0].body, "hello");
    assert_eq!(view.messages[0].sender_name, "Ada");
    assert_eq!(view.messages[0].sender_id.as_str(), "a");

    // The relay echo does not duplicate A's own message
    settle().await;
    let view = a.handle.snapshot();
    assert_eq!(view.messages.len(), 1);
    assert_eq!(view.messages[0].sender_id.as_str(), "a");
    assert_eq!(view.unseen_messages, 0);

    b.handle.send_chat("hi Ada").await.unwrap();
    let view = wait_for_view(&a.handle, |v| v.messages.len() == 2)
        .await
        .expect("A never received the reply");
    assert_eq!(view.unseen_messages, 1);

    a.handle.mark_chat_seen().await.unwrap();
    wait_for_view(&a.handle, |v| v.unseen_messages == 0)
        .await
        .expect("Unseen counter not reset");
}
