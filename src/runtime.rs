use std::{
    sync::{mpsc, Arc},
    thread,
    time::Instant,
};

use crate::{
    api::Backend,
    config::ClientConfig,
    error::Result,
    jobs::{ApiCall, ApiReply},
    messenger::{Effect, Messenger},
    realtime::{socket_url, RealtimeChannel},
    route::Route,
    session::SessionStore,
};

/// Runs REST jobs off the UI thread, one thread per request, so a slow
/// history fetch never holds up a send.
pub struct ApiWorker {
    backend: Arc<dyn Backend + Sync>,
    outcomes_tx: mpsc::Sender<ApiReply>,
    outcomes_rx: mpsc::Receiver<ApiReply>,
}

impl ApiWorker {
    pub fn new(backend: Arc<dyn Backend + Sync>) -> Self {
        let (outcomes_tx, outcomes_rx) = mpsc::channel();
        Self {
            backend,
            outcomes_tx,
            outcomes_rx,
        }
    }

    pub fn submit(&self, call: ApiCall) {
        let backend = Arc::clone(&self.backend);
        let tx = self.outcomes_tx.clone();
        let label = call.label();
        let spawned = thread::Builder::new()
            .name(format!("skillsync-api-{label}"))
            .spawn(move || {
                let _ = tx.send(call.run(backend.as_ref()));
            });
        if let Err(err) = spawned {
            log::error!("[Api] could not start {label} request: {err}");
        }
    }

    pub fn try_recv(&self) -> Option<ApiReply> {
        self.outcomes_rx.try_recv().ok()
    }

    pub fn recv_timeout(&self, timeout: std::time::Duration) -> Option<ApiReply> {
        self.outcomes_rx.recv_timeout(timeout).ok()
    }
}

/// Executes the core's effects against the real world.
pub struct Runtime {
    config: ClientConfig,
    worker: ApiWorker,
    store: SessionStore,
    realtime: Option<RealtimeChannel>,
    location: Route,
}

impl Runtime {
    pub fn new(config: ClientConfig, backend: Arc<dyn Backend + Sync>, store: SessionStore) -> Self {
        Self {
            config,
            worker: ApiWorker::new(backend),
            store,
            realtime: None,
            location: Route::Login,
        }
    }

    pub fn location(&self) -> Route {
        self.location
    }

    /// Resumes a persisted session if there is one.
    pub fn start(&mut self, messenger: &mut Messenger) -> Result<()> {
        match self.store.load()? {
            Some(session) => messenger.restore(session),
            None => log::info!("[Session] no stored session"),
        }
        let effects = messenger.drain_effects();
        self.apply(effects);
        Ok(())
    }

    /// Feeds finished requests and realtime events into `messenger`, then runs the resulting effects.
    pub fn pump(&mut self, messenger: &mut Messenger, now: Instant) {
        while let Some(reply) = self.worker.try_recv() {
            messenger.handle_reply(reply, now);
        }
        if let Some(channel) = &self.realtime {
            while let Some(event) = channel.try_recv() {
                messenger.handle_realtime(event, now);
            }
        }
        messenger.tick(now);
        let effects = messenger.drain_effects();
        self.apply(effects);
    }

    pub fn apply(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            self.execute(effect);
        }
    }

    fn execute(&mut self, effect: Effect) {
        match effect {
            Effect::Api(call) => self.worker.submit(call),
            Effect::Realtime(frame) => match &self.realtime {
                Some(channel) => channel.send(frame),
                None => log::debug!("[Realtime] no channel, dropping {frame:?}"),
            },
            Effect::Connect { user_id, token } => {
                // Dropping signals the old thread to stop; it may still be inside connect().
                self.realtime.take();
                match socket_url(&self.config.ws_url, user_id, &token) {
                    Ok(url) => self.realtime = Some(RealtimeChannel::open(url)),
                    Err(err) => log::error!("[Realtime] cannot build socket url: {err}"),
                }
            }
            Effect::Disconnect => {
                self.realtime.take();
            }
            Effect::Navigate(route) => {
                log::info!("[Messenger] navigate to {}", route.path());
                self.location = route;
            }
            Effect::PersistSession(session) => {
                if let Err(err) = self.store.save(&session) {
                    log::warn!("[Session] could not persist session: {err}");
                }
            }
            Effect::ClearPersistedSession => {
                if let Err(err) = self.store.clear() {
                    log::warn!("[Session] could not clear stored session: {err}");
                }
            }
        }
    }
}
