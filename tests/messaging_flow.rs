use std::time::{Duration, Instant};

use chrono::Utc;
use serde_json::json;
use skillsync::{
    api::Credentials,
    composer::FileCandidate,
    jobs::{ApiCall, ApiJob, ApiOutcome, ApiReply},
    model::{DeliveryStatus, Message, Role, Thread},
    notify::ToastKind,
    realtime::{InboundFrame, RealtimeEvent},
    route::Route,
    session::Session,
    Effect, Messenger,
};

const ME: i64 = 1;

fn session(role: Role) -> Session {
    Session {
        user_id: ME,
        display_name: "Ada".to_string(),
        role,
        token: "tok".to_string(),
    }
}

fn thread(peer_id: i64, name: &str, unread: u32) -> Thread {
    Thread {
        peer_id,
        peer_name: name.to_string(),
        last_message: "hi".to_string(),
        last_message_at: Some(Utc::now()),
        unread_count: unread,
        job_title: None,
    }
}

fn incoming(id: i64, from: i64, content: &str) -> Message {
    Message {
        id: Some(id),
        client_id: None,
        sender_id: from,
        receiver_id: ME,
        content: content.to_string(),
        created_at: Utc::now(),
        is_read: false,
        attachments: Vec::new(),
        status: DeliveryStatus::Sent,
        is_own_message: false,
    }
}

/// Signed in as a client, on the messages view with threads for peers 3, 7, 9 and 42.
fn messages_view() -> Messenger {
    let now = Instant::now();
    let mut messenger = Messenger::new(50);
    messenger.handle_outcome(ApiOutcome::LoggedIn(Ok(session(Role::Client))), now);
    messenger.open_messages();
    messenger.handle_outcome(
        ApiOutcome::Threads(Ok(vec![
            thread(3, "Bo", 2),
            thread(7, "Cy", 0),
            thread(9, "Dana", 0),
            thread(42, "Eve", 0),
        ])),
        now,
    );
    messenger.handle_outcome(ApiOutcome::UnreadCount(Ok(2)), now);
    messenger.drain_effects();
    messenger
}

fn sent_request(messenger: &mut Messenger) -> Option<skillsync::api::SendRequest> {
    messenger.drain_effects().into_iter().find_map(|e| match e {
        Effect::Api(ApiCall {
            job: ApiJob::Send { request, .. },
            ..
        }) => Some(request),
        _ => None,
    })
}

fn own(id: i64, to: i64, content: &str) -> Message {
    Message {
        sender_id: ME,
        receiver_id: to,
        is_own_message: true,
        ..incoming(id, ME, content)
    }
}

fn open(messenger: &mut Messenger, peer_id: i64, history: Vec<Message>) {
    messenger.select_thread(peer_id);
    let generation = messenger.conversation().generation();
    messenger.handle_outcome(
        ApiOutcome::History {
            peer_id,
            generation,
            page: 1,
            limit: 50,
            result: Ok(history),
        },
        Instant::now(),
    );
    messenger.drain_effects();
}

#[test]
fn sign_in_lands_on_role_page() {
    let mut client = Messenger::new(50);
    client.login(Credentials {
        username: "ada@example.com".to_string(),
        password: "pw".to_string(),
    });
    assert!(client
        .drain_effects()
        .iter()
        .any(|e| matches!(e, Effect::Api(ApiCall { job: ApiJob::Login(_), .. }))));
    client.handle_outcome(ApiOutcome::LoggedIn(Ok(session(Role::Client))), Instant::now());
    assert_eq!(client.route(), Route::Dashboard);

    let mut freelancer = Messenger::new(50);
    freelancer.handle_outcome(
        ApiOutcome::LoggedIn(Ok(session(Role::Freelancer))),
        Instant::now(),
    );
    assert_eq!(freelancer.route(), Route::FindWork);
    let effects = freelancer.drain_effects();
    assert!(effects
        .iter()
        .any(|e| matches!(e, Effect::Connect { user_id: ME, .. })));
    assert!(effects
        .iter()
        .any(|e| matches!(e, Effect::PersistSession(_))));
}

#[test]
fn selecting_a_thread_clears_unread_before_history_arrives() {
    let mut messenger = messages_view();
    assert_eq!(messenger.threads().get(3).unwrap().unread_count, 2);

    messenger.select_thread(3);
    assert_eq!(messenger.threads().get(3).unwrap().unread_count, 0);
    assert_eq!(messenger.unread_total(), 0);
    assert_eq!(messenger.route(), Route::Messages { peer: Some(3) });
    assert!(messenger
        .drain_effects()
        .iter()
        .any(|e| matches!(
            e,
            Effect::Api(ApiCall {
                job: ApiJob::History {
                    peer_id: 3,
                    page: 1,
                    ..
                },
                ..
            })
        )));
}

#[test]
fn blank_submission_sends_nothing() {
    let mut messenger = messages_view();
    open(&mut messenger, 42, Vec::new());
    messenger.edit_draft("   ");
    messenger.drain_effects();

    assert_eq!(messenger.send(), None);
    assert!(!messenger
        .drain_effects()
        .iter()
        .any(|e| matches!(e, Effect::Api(ApiCall { job: ApiJob::Send { .. }, .. }))));
    assert!(messenger.conversation().messages().is_empty());
}

#[test]
fn oversized_batch_is_rejected_whole() {
    let mut messenger = messages_view();
    open(&mut messenger, 42, Vec::new());
    let batch = (0..6)
        .map(|i| FileCandidate {
            path: format!("/tmp/brief-{i}.pdf").into(),
            size: Ok(1024),
        })
        .collect();

    let rejections = messenger.stage_files(batch, Instant::now());
    assert_eq!(rejections.len(), 6);
    assert!(messenger.composer().staged().is_empty());
    assert!(!messenger.notifications().visible().is_empty());
}

#[test]
fn sent_message_shows_immediately_then_takes_server_id() {
    let mut messenger = messages_view();
    open(&mut messenger, 42, Vec::new());
    messenger.edit_draft("Hello");
    messenger.drain_effects();

    let client_id = messenger.send().unwrap();
    let pending = messenger.conversation().messages().last().unwrap();
    assert!(pending.is_own_message);
    assert_eq!(pending.status, DeliveryStatus::Pending);
    assert_eq!(pending.content, "Hello");
    assert_eq!(messenger.composer().draft(), "");

    let request = sent_request(&mut messenger).unwrap();
    assert_eq!(request.receiver_id, 42);
    assert_eq!(request.client_id, client_id);

    messenger.handle_outcome(
        ApiOutcome::Sent {
            client_id,
            peer_id: 42,
            result: Ok(own(900, 42, "Hello")),
        },
        Instant::now(),
    );
    let messages = messenger.conversation().messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].id, Some(900));
    assert_eq!(messages[0].status, DeliveryStatus::Sent);
    assert_eq!(messenger.threads().threads()[0].peer_id, 42);
}

#[test]
fn typing_indicator_lapses_after_three_seconds() {
    let mut messenger = messages_view();
    open(&mut messenger, 7, Vec::new());
    let start = Instant::now();
    messenger.handle_realtime(
        RealtimeEvent::Frame(InboundFrame::Typing {
            sender_id: 7,
            is_typing: true,
        }),
        start,
    );
    assert!(messenger.is_peer_typing(start + Duration::from_millis(1500)));
    assert!(!messenger.is_peer_typing(start + Duration::from_millis(3000)));
}

#[test]
fn message_for_another_peer_raises_a_toast() {
    let mut messenger = messages_view();
    open(&mut messenger, 3, vec![incoming(10, 3, "earlier")]);
    let before = messenger.conversation().messages().to_vec();

    messenger.handle_realtime(
        RealtimeEvent::Frame(InboundFrame::NewMessage {
            message: json!({
                "id": 11,
                "sender_id": 9,
                "receiver_id": ME,
                "content": "Are you free tomorrow?",
                "sender_name": "Dana",
            }),
        }),
        Instant::now(),
    );

    assert_eq!(messenger.conversation().messages(), before.as_slice());
    let toast = messenger.notifications().visible().last().unwrap();
    assert_eq!(toast.kind, ToastKind::Message);
    assert_eq!(toast.title, "Dana");
    assert_eq!(messenger.threads().get(9).unwrap().unread_count, 1);
    assert_eq!(messenger.unread_total(), 1);
    assert_eq!(messenger.threads().threads()[0].peer_id, 9);
}

#[test]
fn message_for_active_peer_is_read_on_arrival() {
    let mut messenger = messages_view();
    open(&mut messenger, 3, Vec::new());

    messenger.handle_realtime(
        RealtimeEvent::Frame(InboundFrame::NewMessage {
            message: json!({"id": 12, "sender_id": 3, "receiver_id": ME, "content": "ping"}),
        }),
        Instant::now(),
    );
    let last = messenger.conversation().messages().last().unwrap();
    assert_eq!(last.id, Some(12));
    assert!(last.is_read);
    assert!(messenger.notifications().visible().is_empty());
    assert!(messenger.drain_effects().iter().any(|e| matches!(
        e,
        Effect::Realtime(skillsync::realtime::OutboundFrame::MarkRead { message_ids }) if message_ids == &vec![12]
    )));
}

#[test]
fn reselecting_open_thread_keeps_failed_send_retryable() {
    let mut messenger = messages_view();
    open(&mut messenger, 42, Vec::new());
    messenger.edit_draft("Hello");
    let client_id = messenger.send().unwrap();
    messenger.drain_effects();
    messenger.handle_outcome(
        ApiOutcome::Sent {
            client_id,
            peer_id: 42,
            result: Err(skillsync::ClientError::Transport("reset".to_string())),
        },
        Instant::now(),
    );

    open(&mut messenger, 42, Vec::new());
    let messages = messenger.conversation().messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].status, DeliveryStatus::Failed);

    messenger.retry(client_id);
    let request = sent_request(&mut messenger).unwrap();
    assert_eq!(request.client_id, client_id);
    assert_eq!(
        messenger.conversation().messages()[0].status,
        DeliveryStatus::Pending
    );
}

#[test]
fn ack_after_reselect_lands_in_transcript() {
    let mut messenger = messages_view();
    open(&mut messenger, 42, Vec::new());
    messenger.edit_draft("Hello");
    let client_id = messenger.send().unwrap();
    messenger.drain_effects();

    open(&mut messenger, 42, Vec::new());
    assert_eq!(messenger.conversation().messages().len(), 1);
    messenger.handle_outcome(
        ApiOutcome::Sent {
            client_id,
            peer_id: 42,
            result: Ok(own(900, 42, "Hello")),
        },
        Instant::now(),
    );
    let messages = messenger.conversation().messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].id, Some(900));
    assert_eq!(messages[0].status, DeliveryStatus::Sent);
}

#[test]
fn replies_from_a_previous_session_are_dropped() {
    let now = Instant::now();
    let mut messenger = Messenger::new(50);
    messenger.handle_outcome(ApiOutcome::LoggedIn(Ok(session(Role::Client))), now);
    messenger.open_messages();
    let stale_epoch = messenger
        .drain_effects()
        .into_iter()
        .find_map(|e| match e {
            Effect::Api(ApiCall {
                epoch,
                job: ApiJob::Threads { .. },
            }) => Some(epoch),
            _ => None,
        })
        .unwrap();

    messenger.logout();
    let next = Session {
        user_id: 2,
        display_name: "Bea".to_string(),
        role: Role::Freelancer,
        token: "tok-2".to_string(),
    };
    messenger.handle_outcome(ApiOutcome::LoggedIn(Ok(next)), now);
    assert_ne!(messenger.epoch(), stale_epoch);

    messenger.handle_reply(
        ApiReply {
            epoch: stale_epoch,
            outcome: ApiOutcome::Threads(Ok(vec![thread(77, "first user's contact", 3)])),
        },
        now,
    );
    messenger.handle_reply(
        ApiReply {
            epoch: stale_epoch,
            outcome: ApiOutcome::UnreadCount(Ok(3)),
        },
        now,
    );
    assert!(messenger.threads().threads().is_empty());
    assert_eq!(messenger.unread_total(), 0);

    messenger.handle_reply(
        ApiReply {
            epoch: messenger.epoch(),
            outcome: ApiOutcome::UnreadCount(Ok(1)),
        },
        now,
    );
    assert_eq!(messenger.unread_total(), 1);
}
