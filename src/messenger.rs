//! The messaging core.
//!
//! `Messenger` owns all client state and never performs I/O itself. User
//! intents and network results go in; [`Effect`]s come out and are executed
//! by the runtime (REST worker, realtime socket, session store, navigation).

use std::{collections::HashMap, time::Instant};

use chrono::Utc;
use uuid::Uuid;

use crate::{
    api::{Credentials, Registration, SendRequest},
    composer::{Composer, FileCandidate},
    conversation::Conversation,
    error::{AttachmentRejection, ClientError},
    jobs::{ApiCall, ApiJob, ApiOutcome, ApiReply},
    model::{DeliveryStatus, Message, MessageAttachment, UserProfile},
    normalize,
    notify::{Notifications, ToastKind},
    realtime::{ConnectionState, InboundFrame, OutboundFrame, RealtimeEvent},
    route::Route,
    session::{Session, SessionContext, TeardownReason},
    threads::ThreadList,
    typing::TypingIndicator,
};

#[derive(Debug, Clone)]
pub enum Effect {
    Api(ApiCall),
    Realtime(OutboundFrame),
    Connect { user_id: i64, token: String },
    Disconnect,
    Navigate(Route),
    PersistSession(Session),
    ClearPersistedSession,
}

pub struct Messenger {
    session: SessionContext,
    threads: ThreadList,
    conversation: Conversation,
    composer: Composer,
    typing: TypingIndicator,
    notifications: Notifications,
    connection: ConnectionState,
    unread_total: u32,
    route: Route,
    deep_link: Option<Route>,
    page_size: u32,
    outbox: HashMap<Uuid, SendRequest>,
    auth_busy: bool,
    auth_error: Option<String>,
    /// Bumped whenever a session starts or ends; replies from another epoch are dropped.
    epoch: u64,
    effects: Vec<Effect>,
}

impl Messenger {
    pub fn new(page_size: u32) -> Self {
        Self {
            session: SessionContext::default(),
            threads: ThreadList::default(),
            conversation: Conversation::default(),
            composer: Composer::default(),
            typing: TypingIndicator::default(),
            notifications: Notifications::default(),
            connection: ConnectionState::Disconnected,
            unread_total: 0,
            route: Route::Login,
            deep_link: None,
            page_size: page_size.max(1),
            outbox: HashMap::new(),
            auth_busy: false,
            auth_error: None,
            epoch: 0,
            effects: Vec::new(),
        }
    }

    pub fn drain_effects(&mut self) -> Vec<Effect> {
        std::mem::take(&mut self.effects)
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.current()
    }

    pub fn threads(&self) -> &ThreadList {
        &self.threads
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn composer(&self) -> &Composer {
        &self.composer
    }

    pub fn notifications(&self) -> &Notifications {
        &self.notifications
    }

    pub fn connection(&self) -> ConnectionState {
        self.connection
    }

    pub fn unread_total(&self) -> u32 {
        self.unread_total
    }

    pub fn route(&self) -> Route {
        self.route
    }

    pub fn auth_busy(&self) -> bool {
        self.auth_busy
    }

    pub fn auth_error(&self) -> Option<&str> {
        self.auth_error.as_deref()
    }

    /// Whether the peer of the open conversation is typing.
    pub fn is_peer_typing(&self, now: Instant) -> bool {
        self.conversation
            .peer_id()
            .is_some_and(|peer| self.typing.is_typing(peer, now))
    }

    pub fn peer_name(&self, peer_id: i64) -> String {
        self.threads
            .get(peer_id)
            .map(|t| t.peer_name.clone())
            .unwrap_or_else(|| format!("User {peer_id}"))
    }

    fn navigate(&mut self, route: Route) {
        if self.route != route {
            self.route = route;
            self.effects.push(Effect::Navigate(route));
        }
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    fn request(&mut self, job: ApiJob) {
        self.effects.push(Effect::Api(ApiCall {
            epoch: self.epoch,
            job,
        }));
    }

    /// Drops correlation entries whose optimistic message is no longer shown.
    fn prune_outbox(&mut self) {
        let conversation = &self.conversation;
        self.outbox.retain(|client_id, _| conversation.holds(*client_id));
    }

    fn token(&self) -> Option<String> {
        self.session.token().map(str::to_string)
    }

    // ---- auth ----

    /// Remembers a route to open once a session exists.
    pub fn request_route(&mut self, route: Route) {
        if self.session.is_authenticated() {
            self.go_to(route);
        } else {
            self.deep_link = Some(route);
        }
    }

    /// Validates a persisted session before trusting it.
    pub fn restore(&mut self, session: Session) {
        log::info!("[Messenger] validating stored session for user {}", session.user_id);
        self.auth_busy = true;
        self.request(ApiJob::Restore {
            token: session.token,
        });
    }

    pub fn login(&mut self, credentials: Credentials) {
        if self.auth_busy {
            return;
        }
        if credentials.username.trim().is_empty() || credentials.password.is_empty() {
            self.auth_error = Some("Enter your email and password.".to_string());
            return;
        }
        self.auth_busy = true;
        self.auth_error = None;
        self.request(ApiJob::Login(credentials));
    }

    pub fn register(&mut self, registration: Registration) {
        if self.auth_busy {
            return;
        }
        if registration.email.trim().is_empty()
            || registration.password.is_empty()
            || registration.full_name.trim().is_empty()
        {
            self.auth_error = Some("All fields are required.".to_string());
            return;
        }
        self.auth_busy = true;
        self.auth_error = None;
        self.request(ApiJob::Register(registration));
    }

    pub fn logout(&mut self) {
        if self.session.teardown(TeardownReason::Logout).is_some() {
            self.reset_after_teardown();
        }
    }

    fn expire_session(&mut self, now: Instant) {
        if self.session.teardown(TeardownReason::Expired).is_some() {
            self.reset_after_teardown();
            self.notifications.push(
                ToastKind::Error,
                "Session expired",
                "Please sign in again.",
                now,
            );
        }
    }

    fn reset_after_teardown(&mut self) {
        self.epoch += 1;
        self.threads.clear();
        self.conversation.close();
        self.composer.clear();
        self.typing = TypingIndicator::default();
        self.outbox.clear();
        self.unread_total = 0;
        self.connection = ConnectionState::Disconnected;
        self.auth_busy = false;
        self.effects.push(Effect::Disconnect);
        self.effects.push(Effect::ClearPersistedSession);
        self.navigate(Route::Login);
    }

    fn establish(&mut self, session: Session) {
        self.epoch += 1;
        self.auth_busy = false;
        self.auth_error = None;
        self.effects.push(Effect::PersistSession(session.clone()));
        self.effects.push(Effect::Connect {
            user_id: session.user_id,
            token: session.token.clone(),
        });
        let landing = self.session.establish(session);
        match self.deep_link.take() {
            Some(route) => self.go_to(route),
            None => self.navigate(landing),
        }
    }

    fn go_to(&mut self, route: Route) {
        match route {
            Route::Messages { peer } => {
                self.open_messages();
                if let Some(peer) = peer {
                    self.select_thread(peer);
                }
            }
            Route::Login if self.session.is_authenticated() => {}
            other => self.navigate(other),
        }
    }

    // ---- thread list ----

    /// Entering the messages view: loads threads and the unread total.
    pub fn open_messages(&mut self) {
        let Some(token) = self.token() else {
            return;
        };
        self.navigate(Route::Messages {
            peer: self.conversation.peer_id(),
        });
        self.request(ApiJob::Threads {
            token: token.clone(),
        });
        self.request(ApiJob::UnreadCount { token });
    }

    pub fn refresh_threads(&mut self) {
        if let Some(token) = self.token() {
            self.request(ApiJob::Threads { token });
        }
    }

    pub fn set_search(&mut self, query: impl Into<String>) {
        self.threads.set_query(query);
    }

    /// Opens a conversation. The unread counter drops to zero before the history request goes out.
    pub fn select_thread(&mut self, peer_id: i64) {
        let (Some(token), Some(me)) = (self.token(), self.session.user_id()) else {
            return;
        };
        let cleared = self.threads.select(peer_id);
        self.unread_total = self.unread_total.saturating_sub(cleared);
        if self.conversation.peer_id() != Some(peer_id) {
            self.composer.clear();
        }
        let generation = self.conversation.open(peer_id);
        self.prune_outbox();
        self.navigate(Route::Messages {
            peer: Some(peer_id),
        });
        self.request(ApiJob::History {
            token,
            me,
            peer_id,
            generation,
            page: 1,
            limit: self.page_size,
        });
    }

    pub fn load_older(&mut self) {
        let (Some(token), Some(me), Some(peer_id)) = (
            self.token(),
            self.session.user_id(),
            self.conversation.peer_id(),
        ) else {
            return;
        };
        if let Some((generation, page)) = self.conversation.begin_older() {
            self.request(ApiJob::History {
                token,
                me,
                peer_id,
                generation,
                page,
                limit: self.page_size,
            });
        }
    }

    // ---- composer ----

    pub fn edit_draft(&mut self, text: impl Into<String>) {
        let changed = self.composer.set_draft(text);
        if let (Some(is_typing), Some(receiver_id)) = (changed, self.conversation.peer_id()) {
            self.effects.push(Effect::Realtime(OutboundFrame::Typing {
                receiver_id,
                is_typing,
            }));
        }
    }

    pub fn stage_files(&mut self, batch: Vec<FileCandidate>, now: Instant) -> Vec<AttachmentRejection> {
        let rejections = self.composer.stage(batch);
        for rejection in &rejections {
            self.notifications.push(
                ToastKind::Error,
                format!("Cannot attach {}", rejection.name),
                rejection.reason.to_string(),
                now,
            );
        }
        rejections
    }

    pub fn unstage(&mut self, local_id: Uuid) {
        self.composer.unstage(local_id);
    }

    /// Sends the composer contents. Nothing happens for an empty draft without attachments.
    pub fn send(&mut self) -> Option<Uuid> {
        let (Some(token), Some(me), Some(peer_id)) = (
            self.token(),
            self.session.user_id(),
            self.conversation.peer_id(),
        ) else {
            return None;
        };
        let submission = self.composer.take()?;
        let client_id = Uuid::new_v4();
        let request = SendRequest {
            client_id,
            receiver_id: peer_id,
            content: submission.content,
            job_id: None,
            attachments: submission.attachments,
        };
        let optimistic = Message {
            id: None,
            client_id: Some(client_id),
            sender_id: me,
            receiver_id: peer_id,
            content: request.content.clone(),
            created_at: Utc::now(),
            is_read: false,
            attachments: request
                .attachments
                .iter()
                .map(|staged| MessageAttachment {
                    name: staged.name.clone(),
                    url: None,
                    kind: staged.kind,
                    size: Some(staged.size),
                })
                .collect(),
            status: DeliveryStatus::Pending,
            is_own_message: true,
        };
        self.threads.record(&optimistic, me, None);
        self.conversation.push_optimistic(optimistic);
        self.composer.set_sending(true);
        self.outbox.insert(client_id, request.clone());
        self.effects.push(Effect::Realtime(OutboundFrame::Typing {
            receiver_id: peer_id,
            is_typing: false,
        }));
        self.request(ApiJob::Send { token, me, request });
        Some(client_id)
    }

    pub fn retry(&mut self, client_id: Uuid) {
        let (Some(token), Some(me)) = (self.token(), self.session.user_id()) else {
            return;
        };
        let Some(request) = self.outbox.get(&client_id).cloned() else {
            return;
        };
        if self.conversation.retry(client_id).is_some() {
            self.request(ApiJob::Send { token, me, request });
        }
    }

    pub fn discard(&mut self, client_id: Uuid) {
        if self.conversation.discard(client_id) {
            self.outbox.remove(&client_id);
        }
    }

    pub fn dismiss_toast(&mut self, id: u64) {
        self.notifications.dismiss(id);
    }

    /// Expires toasts and stale typing flags.
    pub fn tick(&mut self, now: Instant) {
        self.notifications.expire(now);
        self.typing.sweep(now);
    }

    // ---- network results ----

    /// Applies a finished call, unless it was issued under a session that has since ended.
    pub fn handle_reply(&mut self, reply: ApiReply, now: Instant) {
        if reply.epoch != self.epoch {
            log::debug!(
                "[Messenger] dropping {} result from epoch {} (current {})",
                reply.outcome.label(),
                reply.epoch,
                self.epoch
            );
            return;
        }
        self.handle_outcome(reply.outcome, now);
    }

    /// Applies an outcome that belongs to the current session.
    pub fn handle_outcome(&mut self, outcome: ApiOutcome, now: Instant) {
        match outcome {
            ApiOutcome::LoggedIn(result) => self.on_logged_in(result, now),
            ApiOutcome::Restored { token, result } => self.on_restored(token, result, now),
            _ if !self.session.is_authenticated() => {
                log::debug!("[Messenger] ignoring result after sign-out");
            }
            ApiOutcome::Threads(Ok(threads)) => self.threads.replace(threads),
            ApiOutcome::UnreadCount(Ok(count)) => self.unread_total = count,
            ApiOutcome::History {
                peer_id,
                generation,
                page,
                limit,
                result,
            } => self.on_history(peer_id, generation, page, limit, result, now),
            ApiOutcome::Sent {
                client_id,
                peer_id,
                result,
            } => self.on_sent(client_id, peer_id, result, now),
            ApiOutcome::Threads(Err(err)) => {
                self.on_request_failed("Could not load conversations", err, now)
            }
            ApiOutcome::UnreadCount(Err(err)) => {
                self.on_request_failed("Could not load unread count", err, now)
            }
        }
    }

    fn on_request_failed(&mut self, title: &str, err: ClientError, now: Instant) {
        if err.is_auth() {
            self.expire_session(now);
        } else {
            self.notifications
                .push(ToastKind::Error, title, err.to_string(), now);
        }
    }

    fn on_logged_in(&mut self, result: crate::error::Result<Session>, now: Instant) {
        match result {
            Ok(session) => self.establish(session),
            Err(err) => {
                self.auth_busy = false;
                let message = match &err {
                    ClientError::Unauthorized => "Incorrect email or password.".to_string(),
                    ClientError::Http { message, .. } => message.clone(),
                    other => other.to_string(),
                };
                log::warn!("[Messenger] sign-in failed: {err}");
                self.notifications
                    .push(ToastKind::Error, "Sign-in failed", message.clone(), now);
                self.auth_error = Some(message);
            }
        }
    }

    fn on_restored(
        &mut self,
        token: String,
        result: crate::error::Result<UserProfile>,
        now: Instant,
    ) {
        self.auth_busy = false;
        match result {
            Ok(profile) => self.establish(Session::from_profile(profile, token)),
            Err(ClientError::Unauthorized) => {
                log::info!("[Messenger] stored session rejected");
                self.effects.push(Effect::ClearPersistedSession);
                self.navigate(Route::Login);
            }
            Err(err) => {
                self.notifications
                    .push(ToastKind::Error, "Could not restore session", err.to_string(), now);
                self.navigate(Route::Login);
            }
        }
    }

    fn on_history(
        &mut self,
        peer_id: i64,
        generation: u64,
        page: u32,
        limit: u32,
        result: crate::error::Result<Vec<Message>>,
        now: Instant,
    ) {
        match result {
            Ok(history) => {
                if self.conversation.apply_history(generation, page, history, limit) && page <= 1 {
                    let unread = self.conversation.unread_incoming();
                    if !unread.is_empty() {
                        self.conversation.mark_read(&unread);
                        self.effects.push(Effect::Realtime(OutboundFrame::MarkRead {
                            message_ids: unread,
                        }));
                    }
                }
            }
            Err(err) => {
                if self.conversation.history_failed(generation) || err.is_auth() {
                    let title = format!("Could not load messages with {}", self.peer_name(peer_id));
                    self.on_request_failed(&title, err, now);
                }
            }
        }
    }

    fn on_sent(
        &mut self,
        client_id: Uuid,
        peer_id: i64,
        result: crate::error::Result<Message>,
        now: Instant,
    ) {
        self.composer.set_sending(false);
        match result {
            Ok(message) => {
                self.outbox.remove(&client_id);
                if let Some(me) = self.session.user_id() {
                    self.threads.record(&message, me, None);
                }
                if self.conversation.is_open_with(peer_id) {
                    self.conversation.confirm(client_id, message);
                }
            }
            Err(err) => {
                if !self.conversation.fail(client_id) {
                    // Nothing left on screen to retry.
                    self.outbox.remove(&client_id);
                }
                if err.is_auth() {
                    self.expire_session(now);
                } else {
                    self.notifications
                        .push(ToastKind::Error, "Message not sent", err.to_string(), now);
                }
            }
        }
    }

    // ---- realtime ----

    pub fn handle_realtime(&mut self, event: RealtimeEvent, now: Instant) {
        match event {
            RealtimeEvent::State(state) => {
                if self.session.is_authenticated() {
                    self.connection = state;
                }
            }
            RealtimeEvent::Frame(frame) => self.handle_frame(frame, now),
        }
    }

    fn handle_frame(&mut self, frame: InboundFrame, now: Instant) {
        let Some(me) = self.session.user_id() else {
            return;
        };
        match frame {
            InboundFrame::NewMessage { message: raw } => {
                let Some(mut message) = normalize::message(&raw, me) else {
                    log::warn!("[Realtime] new_message without ids: {raw}");
                    return;
                };
                let peer_id = message.peer_of(me);
                let sender_name = normalize::sender_name(&raw);
                if message.is_own_message {
                    self.threads.record(&message, me, None);
                    if self.conversation.is_open_with(peer_id) {
                        self.conversation.append(message);
                    }
                    return;
                }
                self.typing.clear(peer_id);
                if self.conversation.is_open_with(peer_id) {
                    message.is_read = true;
                    if let Some(id) = message.id {
                        self.effects.push(Effect::Realtime(OutboundFrame::MarkRead {
                            message_ids: vec![id],
                        }));
                    }
                    self.threads.record(&message, me, sender_name.as_deref());
                    self.conversation.append(message);
                } else {
                    self.threads.record(&message, me, sender_name.as_deref());
                    self.unread_total = self.unread_total.saturating_add(1);
                    let title = sender_name.unwrap_or_else(|| self.peer_name(peer_id));
                    self.notifications
                        .push(ToastKind::Message, title, message.preview(), now);
                }
            }
            InboundFrame::Typing {
                sender_id,
                is_typing,
            } => self.typing.observe(sender_id, is_typing, now),
            InboundFrame::MessageRead { message_ids, .. } => {
                self.conversation.mark_read(&message_ids);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::model::{Role, Thread};

    fn session() -> Session {
        Session {
            user_id: 1,
            display_name: "Me".to_string(),
            role: Role::Client,
            token: "tok".to_string(),
        }
    }

    fn signed_in() -> Messenger {
        let mut messenger = Messenger::new(50);
        messenger.handle_outcome(ApiOutcome::LoggedIn(Ok(session())), Instant::now());
        messenger.drain_effects();
        messenger
    }

    #[test]
    fn login_validates_input_locally() {
        let mut messenger = Messenger::new(50);
        messenger.login(Credentials {
            username: " ".to_string(),
            password: "x".to_string(),
        });
        assert!(messenger.drain_effects().is_empty());
        assert!(messenger.auth_error().is_some());
    }

    #[test]
    fn wrong_password_does_not_look_like_expiry() {
        let mut messenger = Messenger::new(50);
        messenger.handle_outcome(
            ApiOutcome::LoggedIn(Err(ClientError::Unauthorized)),
            Instant::now(),
        );
        assert_eq!(messenger.auth_error(), Some("Incorrect email or password."));
        assert!(messenger.drain_effects().is_empty());
    }

    #[test]
    fn deep_link_opens_after_login() {
        let mut messenger = Messenger::new(50);
        messenger.request_route(Route::Messages { peer: Some(5) });
        messenger.handle_outcome(ApiOutcome::LoggedIn(Ok(session())), Instant::now());
        assert_eq!(messenger.route(), Route::Messages { peer: Some(5) });
        let effects = messenger.drain_effects();
        assert!(effects
            .iter()
            .any(|e| matches!(e, Effect::Api(ApiCall { job: ApiJob::History { peer_id: 5, .. }, .. }))));
    }

    #[test]
    fn restored_session_rejected_clears_store() {
        let mut messenger = Messenger::new(50);
        messenger.restore(session());
        messenger.drain_effects();
        messenger.handle_outcome(
            ApiOutcome::Restored {
                token: "tok".to_string(),
                result: Err(ClientError::Unauthorized),
            },
            Instant::now(),
        );
        let effects = messenger.drain_effects();
        assert!(effects
            .iter()
            .any(|e| matches!(e, Effect::ClearPersistedSession)));
        assert!(messenger.session().is_none());
    }

    #[test]
    fn expired_token_tears_everything_down() {
        let mut messenger = signed_in();
        messenger.handle_outcome(
            ApiOutcome::Threads(Err(ClientError::Unauthorized)),
            Instant::now(),
        );
        let effects = messenger.drain_effects();
        assert!(messenger.session().is_none());
        assert_eq!(messenger.route(), Route::Login);
        assert!(effects.iter().any(|e| matches!(e, Effect::Disconnect)));
        assert!(effects
            .iter()
            .any(|e| matches!(e, Effect::ClearPersistedSession)));
        assert_eq!(messenger.notifications().visible().len(), 1);
    }

    #[test]
    fn results_after_logout_are_ignored() {
        let mut messenger = signed_in();
        messenger.logout();
        messenger.handle_outcome(
            ApiOutcome::Threads(Ok(vec![Thread {
                peer_id: 2,
                peer_name: "x".to_string(),
                last_message: String::new(),
                last_message_at: None,
                unread_count: 1,
                job_title: None,
            }])),
            Instant::now(),
        );
        assert!(messenger.threads().threads().is_empty());
    }

    #[test]
    fn editing_draft_announces_typing() {
        let mut messenger = signed_in();
        messenger.select_thread(2);
        messenger.drain_effects();
        messenger.edit_draft("h");
        messenger.edit_draft("");
        let frames: Vec<_> = messenger
            .drain_effects()
            .into_iter()
            .filter_map(|e| match e {
                Effect::Realtime(frame) => Some(frame),
                _ => None,
            })
            .collect();
        assert_eq!(
            frames,
            vec![
                OutboundFrame::Typing {
                    receiver_id: 2,
                    is_typing: true
                },
                OutboundFrame::Typing {
                    receiver_id: 2,
                    is_typing: false
                }
            ]
        );
    }

    #[test]
    fn opening_history_marks_incoming_read() {
        let mut messenger = signed_in();
        messenger.select_thread(2);
        let generation = messenger.conversation().generation();
        messenger.drain_effects();
        let history = normalize::messages(
            &json!([
                {"id": 10, "sender_id": 2, "receiver_id": 1, "content": "a", "is_read": false},
                {"id": 11, "sender_id": 1, "receiver_id": 2, "content": "b", "is_read": false}
            ]),
            1,
        );
        messenger.handle_outcome(
            ApiOutcome::History {
                peer_id: 2,
                generation,
                page: 1,
                limit: 50,
                result: Ok(history),
            },
            Instant::now(),
        );
        let effects = messenger.drain_effects();
        assert!(effects.iter().any(|e| matches!(
            e,
            Effect::Realtime(OutboundFrame::MarkRead { message_ids }) if message_ids == &vec![10]
        )));
        assert!(messenger.conversation().messages()[0].is_read);
    }

    #[test]
    fn failed_send_is_marked_and_retryable() {
        let mut messenger = signed_in();
        messenger.select_thread(2);
        messenger.edit_draft("Hi");
        let client_id = messenger.send().unwrap();
        messenger.drain_effects();
        messenger.handle_outcome(
            ApiOutcome::Sent {
                client_id,
                peer_id: 2,
                result: Err(ClientError::Transport("reset".to_string())),
            },
            Instant::now(),
        );
        assert_eq!(
            messenger.conversation().messages()[0].status,
            DeliveryStatus::Failed
        );
        assert_eq!(messenger.notifications().visible().len(), 1);
        assert!(!messenger.composer().is_sending());

        messenger.retry(client_id);
        let effects = messenger.drain_effects();
        assert!(effects.iter().any(|e| matches!(
            e,
            Effect::Api(ApiCall { job: ApiJob::Send { request, .. }, .. }) if request.client_id == client_id
        )));
        assert_eq!(
            messenger.conversation().messages()[0].status,
            DeliveryStatus::Pending
        );
    }

    #[test]
    fn switching_threads_forgets_unsent_requests() {
        let mut messenger = signed_in();
        messenger.select_thread(2);
        messenger.edit_draft("Hi");
        let failed = messenger.send().unwrap();
        messenger.handle_outcome(
            ApiOutcome::Sent {
                client_id: failed,
                peer_id: 2,
                result: Err(ClientError::Transport("reset".to_string())),
            },
            Instant::now(),
        );
        messenger.edit_draft("Still there?");
        let in_flight = messenger.send().unwrap();
        assert_eq!(messenger.outbox.len(), 2);

        messenger.select_thread(3);
        assert!(messenger.outbox.is_empty());

        // The late failure finds nothing on screen and leaves nothing behind.
        messenger.handle_outcome(
            ApiOutcome::Sent {
                client_id: in_flight,
                peer_id: 2,
                result: Err(ClientError::Transport("reset".to_string())),
            },
            Instant::now(),
        );
        assert!(messenger.outbox.is_empty());
        assert!(messenger.conversation().messages().is_empty());
    }

    #[test]
    fn read_receipts_update_own_messages() {
        let mut messenger = signed_in();
        messenger.select_thread(2);
        let generation = messenger.conversation().generation();
        let history = normalize::messages(
            &json!([{"id": 11, "sender_id": 1, "receiver_id": 2, "content": "b"}]),
            1,
        );
        messenger.handle_outcome(
            ApiOutcome::History {
                peer_id: 2,
                generation,
                page: 1,
                limit: 50,
                result: Ok(history),
            },
            Instant::now(),
        );
        messenger.handle_realtime(
            RealtimeEvent::Frame(InboundFrame::MessageRead {
                message_ids: vec![11],
                reader_id: Some(2),
            }),
            Instant::now(),
        );
        assert!(messenger.conversation().messages()[0].is_read);
    }
}
