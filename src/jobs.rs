use uuid::Uuid;

use crate::{
    api::{Backend, Credentials, Registration, SendRequest},
    error::Result,
    model::{Message, Thread, UserProfile},
    session::Session,
};

/// A REST call requested by the core. Each job carries everything it needs.
#[derive(Debug, Clone)]
pub enum ApiJob {
    Login(Credentials),
    Register(Registration),
    Restore {
        token: String,
    },
    Threads {
        token: String,
    },
    UnreadCount {
        token: String,
    },
    History {
        token: String,
        me: i64,
        peer_id: i64,
        generation: u64,
        page: u32,
        limit: u32,
    },
    Send {
        token: String,
        me: i64,
        request: SendRequest,
    },
}

#[derive(Debug)]
pub enum ApiOutcome {
    LoggedIn(Result<Session>),
    Restored {
        token: String,
        result: Result<UserProfile>,
    },
    Threads(Result<Vec<Thread>>),
    UnreadCount(Result<u32>),
    History {
        peer_id: i64,
        generation: u64,
        page: u32,
        limit: u32,
        result: Result<Vec<Message>>,
    },
    Sent {
        client_id: Uuid,
        peer_id: i64,
        result: Result<Message>,
    },
}

/// A job stamped with the session epoch it was issued under.
#[derive(Debug, Clone)]
pub struct ApiCall {
    pub epoch: u64,
    pub job: ApiJob,
}

/// An outcome carrying the epoch of the call that produced it.
#[derive(Debug)]
pub struct ApiReply {
    pub epoch: u64,
    pub outcome: ApiOutcome,
}

impl ApiCall {
    pub fn label(&self) -> &'static str {
        self.job.label()
    }

    pub fn run(self, backend: &dyn Backend) -> ApiReply {
        ApiReply {
            epoch: self.epoch,
            outcome: self.job.run(backend),
        }
    }
}

impl ApiOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            ApiOutcome::LoggedIn(_) => "login",
            ApiOutcome::Restored { .. } => "restore",
            ApiOutcome::Threads(_) => "threads",
            ApiOutcome::UnreadCount(_) => "unread_count",
            ApiOutcome::History { .. } => "history",
            ApiOutcome::Sent { .. } => "send",
        }
    }
}

impl ApiJob {
    pub fn label(&self) -> &'static str {
        match self {
            ApiJob::Login(_) => "login",
            ApiJob::Register(_) => "register",
            ApiJob::Restore { .. } => "restore",
            ApiJob::Threads { .. } => "threads",
            ApiJob::UnreadCount { .. } => "unread_count",
            ApiJob::History { .. } => "history",
            ApiJob::Send { .. } => "send",
        }
    }

    pub fn run(self, backend: &dyn Backend) -> ApiOutcome {
        match self {
            ApiJob::Login(credentials) => ApiOutcome::LoggedIn(backend.login(&credentials)),
            ApiJob::Register(registration) => ApiOutcome::LoggedIn(backend.register(&registration)),
            ApiJob::Restore { token } => {
                let result = backend.current_user(&token);
                ApiOutcome::Restored { token, result }
            }
            ApiJob::Threads { token } => ApiOutcome::Threads(backend.list_threads(&token)),
            ApiJob::UnreadCount { token } => ApiOutcome::UnreadCount(backend.unread_count(&token)),
            ApiJob::History {
                token,
                me,
                peer_id,
                generation,
                page,
                limit,
            } => ApiOutcome::History {
                peer_id,
                generation,
                page,
                limit,
                result: backend.conversation(&token, me, peer_id, page, limit),
            },
            ApiJob::Send { token, me, request } => ApiOutcome::Sent {
                client_id: request.client_id,
                peer_id: request.receiver_id,
                result: backend.send_message(&token, me, &request),
            },
        }
    }
}
