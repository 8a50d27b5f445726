mod support;

use dongle_relay::config::SessionLostPolicy;
use dongle_relay::messages;
use dongle_relay::poller::{InboxPoller, PollOutcome};
use dongle_relay::types::{InboundSms, ReadState};
use std::time::Duration;
use support::{calls, chat_texts, count_calls, sms, Call, Harness, OWNER};
use tokio_util::sync::CancellationToken;

fn poller(h: &Harness) -> InboxPoller {
    InboxPoller::new(h.device.clone(), h.chat.clone(), h.session.clone(), OWNER)
        .with_interval(Duration::from_millis(10))
        .with_page_size(50)
}

fn three_unread() -> Vec<InboundSms> {
    vec![
        sms("1", "10086", "first", ReadState::Unread),
        sms("2", "+14155552671", "second", ReadState::Unread),
        sms("3", "10010", "third", ReadState::Unread),
    ]
}

#[tokio::test]
async fn test_forwards_then_marks_read_in_order() {
    let h = Harness::new(three_unread());
    let outcome = poller(&h).poll_once().await.unwrap();
    assert_eq!(outcome, PollOutcome::Completed { forwarded: 3 });

    let sequence: Vec<Call> = calls(&h.journal)
        .into_iter()
        .filter(|c| matches!(c, Call::Chat { .. } | Call::MarkRead(_)))
        .collect();
    let expected_ids = ["1", "2", "3"];
    assert_eq!(sequence.len(), 6);
    for (i, id) in expected_ids.iter().enumerate() {
        match &sequence[i * 2] {
            Call::Chat {
                chat_id,
                text,
                disable_link_preview,
            } => {
                assert_eq!(*chat_id, OWNER);
                assert!(*disable_link_preview);
                assert!(text.starts_with("[Receive SMS]"));
            }
            other => panic!("expected forward, got {other:?}"),
        }
        assert_eq!(sequence[i * 2 + 1], Call::MarkRead(id.to_string()));
    }
}

#[tokio::test]
async fn test_forward_text_format() {
    let h = Harness::new(vec![sms("9", "10086", "balance low", ReadState::Unread)]);
    poller(&h).poll_once().await.unwrap();
    assert_eq!(
        chat_texts(&h.journal),
        vec!["[Receive SMS]\nFrom: 10086\nContent: balance low\nDate: 2024-03-01 10:00:00"]
    );
}

#[tokio::test]
async fn test_skips_messages_already_read() {
    let h = Harness::new(vec![
        sms("1", "10086", "old", ReadState::Read),
        sms("2", "10086", "new", ReadState::Unread),
    ]);
    h.device.set(|s| s.unread_override = Some(2));

    let outcome = poller(&h).poll_once().await.unwrap();
    assert_eq!(outcome, PollOutcome::Completed { forwarded: 1 });
    assert_eq!(chat_texts(&h.journal).len(), 1);
    assert_eq!(count_calls(&h.journal, |c| *c == Call::MarkRead("1".into())), 0);
}

#[tokio::test]
async fn test_replaying_read_page_forwards_nothing() {
    let h = Harness::new(three_unread());
    let poller = poller(&h);
    poller.poll_once().await.unwrap();
    h.clear();

    // The gateway still claims unread messages but the page is all read.
    h.device.set(|s| s.unread_override = Some(3));
    let outcome = poller.poll_once().await.unwrap();
    assert_eq!(outcome, PollOutcome::Completed { forwarded: 0 });
    assert!(chat_texts(&h.journal).is_empty());
}

#[tokio::test]
async fn test_zero_unread_skips_listing() {
    let h = Harness::new(vec![sms("1", "10086", "old", ReadState::Read)]);
    let outcome = poller(&h).poll_once().await.unwrap();
    assert_eq!(outcome, PollOutcome::Completed { forwarded: 0 });
    assert_eq!(count_calls(&h.journal, |c| matches!(c, Call::List { .. })), 0);
}

#[tokio::test]
async fn test_lists_first_page_with_configured_size() {
    let h = Harness::new(three_unread());
    poller(&h).with_page_size(20).poll_once().await.unwrap();
    assert_eq!(
        count_calls(&h.journal, |c| *c == Call::List { page: 1, page_size: 20 }),
        1
    );
}

#[tokio::test]
async fn test_unread_count_failure_is_an_error_not_zero() {
    let h = Harness::new(three_unread());
    h.device.set(|s| s.unread_error = true);
    assert!(poller(&h).poll_once().await.is_err());
    assert!(chat_texts(&h.journal).is_empty());
}

#[tokio::test]
async fn test_failed_forward_leaves_message_unread() {
    let h = Harness::new(three_unread());
    *h.chat.fail.lock().unwrap() = true;

    assert!(poller(&h).poll_once().await.is_err());
    assert_eq!(count_calls(&h.journal, |c| matches!(c, Call::MarkRead(_))), 0);
    let state = h.device.state.lock().unwrap();
    assert!(state.messages.iter().all(|m| m.is_unread()));
}

#[tokio::test]
async fn test_session_lost_stops_with_stop_policy() {
    let h = Harness::new(three_unread());
    h.device.set(|s| s.logged_in = false);

    let outcome = poller(&h).poll_once().await.unwrap();
    assert_eq!(outcome, PollOutcome::SessionLost);
    assert_eq!(count_calls(&h.journal, |c| *c == Call::UnreadCount), 0);
    assert_eq!(count_calls(&h.journal, |c| *c == Call::Login), 0);
}

#[tokio::test]
async fn test_reauthenticate_policy_logs_in_and_continues() {
    let h = Harness::new(three_unread());
    h.device.set(|s| s.logged_in = false);

    let outcome = poller(&h)
        .with_policy(SessionLostPolicy::Reauthenticate)
        .poll_once()
        .await
        .unwrap();
    assert_eq!(outcome, PollOutcome::Completed { forwarded: 3 });
    assert_eq!(count_calls(&h.journal, |c| *c == Call::Login), 1);
}

#[tokio::test]
async fn test_reauthenticate_policy_stops_when_login_fails() {
    let h = Harness::new(three_unread());
    h.device.set(|s| {
        s.logged_in = false;
        s.accept_login = false;
    });

    let outcome = poller(&h)
        .with_policy(SessionLostPolicy::Reauthenticate)
        .poll_once()
        .await
        .unwrap();
    assert_eq!(outcome, PollOutcome::SessionLost);
}

#[tokio::test]
async fn test_gateway_session_error_stops_with_stop_policy() {
    let h = Harness::new(three_unread());
    h.device.set(|s| s.list_session_expired = true);

    let outcome = poller(&h).poll_once().await.unwrap();
    assert_eq!(outcome, PollOutcome::SessionLost);
    assert!(chat_texts(&h.journal).is_empty());
    assert_eq!(count_calls(&h.journal, |c| *c == Call::Login), 0);
}

#[tokio::test]
async fn test_gateway_session_error_relogs_with_reauthenticate_policy() {
    let h = Harness::new(three_unread());
    h.device.set(|s| s.list_session_expired = true);
    let p = poller(&h).with_policy(SessionLostPolicy::Reauthenticate);

    let outcome = p.poll_once().await.unwrap();
    assert_eq!(outcome, PollOutcome::Completed { forwarded: 0 });
    assert_eq!(count_calls(&h.journal, |c| *c == Call::Login), 1);
    assert!(chat_texts(&h.journal).is_empty());

    let outcome = p.poll_once().await.unwrap();
    assert_eq!(outcome, PollOutcome::Completed { forwarded: 3 });
}

#[tokio::test]
async fn test_gateway_session_error_stops_when_relogin_fails() {
    let h = Harness::new(three_unread());
    h.device.set(|s| {
        s.list_session_expired = true;
        s.accept_login = false;
    });

    let outcome = poller(&h)
        .with_policy(SessionLostPolicy::Reauthenticate)
        .poll_once()
        .await
        .unwrap();
    assert_eq!(outcome, PollOutcome::SessionLost);
}

#[tokio::test]
async fn test_run_stops_on_gateway_session_error() {
    let h = Harness::new(three_unread());
    h.device.set(|s| s.list_session_expired = true);

    let cancel = CancellationToken::new();
    tokio::time::timeout(Duration::from_secs(5), poller(&h).run(cancel))
        .await
        .expect("poller should stop by itself");
    assert_eq!(chat_texts(&h.journal), vec![messages::POLLING_STOPPED]);
}

#[tokio::test]
async fn test_non_session_gateway_error_is_an_iteration_error() {
    let h = Harness::new(three_unread());
    h.device.set(|s| s.mark_read_error = true);
    assert!(poller(&h).poll_once().await.is_err());
}

#[tokio::test]
async fn test_run_stops_and_notifies_on_session_loss() {
    let h = Harness::new(vec![]);
    h.device.set(|s| s.logged_in = false);

    let cancel = CancellationToken::new();
    tokio::time::timeout(Duration::from_secs(5), poller(&h).run(cancel))
        .await
        .expect("poller should stop by itself");
    assert_eq!(chat_texts(&h.journal), vec![messages::POLLING_STOPPED]);
}

#[tokio::test]
async fn test_run_survives_failed_iterations_until_cancelled() {
    let h = Harness::new(vec![]);
    h.device.set(|s| s.unread_error = true);

    let cancel = CancellationToken::new();
    let task = tokio::spawn(poller(&h).run(cancel.clone()));
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!task.is_finished());
    assert!(count_calls(&h.journal, |c| *c == Call::UnreadCount) >= 2);

    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("poller should stop on cancel")
        .unwrap();
}
