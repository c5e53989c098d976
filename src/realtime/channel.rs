use std::{
    net::TcpStream,
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc, Arc,
    },
    thread,
    time::{Duration, Instant},
};

use tungstenite::{stream::MaybeTlsStream, Message as WsMessage, WebSocket};
use url::Url;

use super::{
    backoff::Backoff,
    frames::{parse_inbound, InboundFrame, OutboundFrame},
    ConnectionState,
};
use crate::error::{ClientError, Result};

type Socket = WebSocket<MaybeTlsStream<TcpStream>>;

const POLL_INTERVAL: Duration = Duration::from_millis(8);

#[derive(Debug, Clone, PartialEq)]
pub enum RealtimeEvent {
    State(ConnectionState),
    Frame(InboundFrame),
}

/// `<base>/<user_id>?token=<token>`
pub fn socket_url(base: &Url, user_id: i64, token: &str) -> Result<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| ClientError::Config(format!("{base} cannot carry a path")))?
        .pop_if_empty()
        .push(&user_id.to_string());
    url.query_pairs_mut().append_pair("token", token);
    Ok(url)
}

fn redacted(url: &Url) -> String {
    let mut shown = url.clone();
    shown.set_query(None);
    shown.to_string()
}

fn is_would_block(err: &tungstenite::Error) -> bool {
    matches!(
        err,
        tungstenite::Error::Io(io_err) if io_err.kind() == std::io::ErrorKind::WouldBlock
    )
}

fn connect(url: &Url) -> Result<Socket> {
    let (socket, _response) = tungstenite::connect(url.as_str())?;
    if let MaybeTlsStream::Plain(stream) = socket.get_ref() {
        stream.set_nonblocking(true)?;
    }
    Ok(socket)
}

struct Worker {
    url: Url,
    outbound: mpsc::Receiver<OutboundFrame>,
    events: mpsc::Sender<RealtimeEvent>,
    shutdown: Arc<AtomicBool>,
}

impl Worker {
    fn stopped(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }

    fn publish(&self, event: RealtimeEvent) -> bool {
        self.events.send(event).is_ok()
    }

    fn run(self) {
        let mut backoff = Backoff::default();
        let shown = redacted(&self.url);
        while !self.stopped() {
            if !self.publish(RealtimeEvent::State(ConnectionState::Connecting {
                attempt: backoff.attempt(),
            })) {
                return;
            }
            match connect(&self.url) {
                Ok(mut socket) => {
                    log::info!("[Realtime] connected to {shown}");
                    backoff.reset();
                    if !self.publish(RealtimeEvent::State(ConnectionState::Connected)) {
                        return;
                    }
                    match self.pump(&mut socket) {
                        Ok(()) => {}
                        Err(err) => log::warn!("[Realtime] connection lost: {err}"),
                    }
                }
                Err(err) => log::warn!("[Realtime] connect to {shown} failed: {err}"),
            }
            if self.stopped() {
                break;
            }
            if !self.publish(RealtimeEvent::State(ConnectionState::Disconnected)) {
                return;
            }
            self.wait(backoff.next_delay());
        }
        let _ = self.publish(RealtimeEvent::State(ConnectionState::Disconnected));
        log::info!("[Realtime] channel closed");
    }

    /// Sleeps out the backoff delay. Frames queued meanwhile are stale and dropped.
    fn wait(&self, delay: Duration) {
        let deadline = Instant::now() + delay;
        while Instant::now() < deadline && !self.stopped() {
            while let Ok(frame) = self.outbound.try_recv() {
                log::debug!("[Realtime] offline, dropping {frame:?}");
            }
            thread::sleep(POLL_INTERVAL * 4);
        }
    }

    fn pump(&self, socket: &mut Socket) -> Result<()> {
        loop {
            if self.stopped() {
                let _ = socket.close(None);
                let _ = socket.flush();
                return Ok(());
            }
            match socket.read() {
                Ok(WsMessage::Text(text)) => {
                    if let Some(frame) = parse_inbound(&text) {
                        if !self.publish(RealtimeEvent::Frame(frame)) {
                            return Ok(());
                        }
                    }
                }
                Ok(WsMessage::Close(_)) => {
                    return Err(ClientError::Realtime("closed by server".to_string()))
                }
                Ok(_) => {}
                Err(err) if is_would_block(&err) => {}
                Err(err) => return Err(err.into()),
            }

            while let Ok(frame) = self.outbound.try_recv() {
                let text = serde_json::to_string(&frame)
                    .map_err(|e| ClientError::Realtime(e.to_string()))?;
                match socket.send(WsMessage::Text(text)) {
                    Ok(()) => {}
                    Err(err) if is_would_block(&err) => {}
                    Err(err) => return Err(err.into()),
                }
            }

            thread::sleep(POLL_INTERVAL);
        }
    }
}

/// One long-lived socket per logged-in user, reconnecting with backoff until closed.
pub struct RealtimeChannel {
    outbound: mpsc::Sender<OutboundFrame>,
    events: mpsc::Receiver<RealtimeEvent>,
    shutdown: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl RealtimeChannel {
    pub fn open(url: Url) -> Self {
        let (outbound_tx, outbound_rx) = mpsc::channel();
        let (events_tx, events_rx) = mpsc::channel();
        let shutdown = Arc::new(AtomicBool::new(false));
        let worker = Worker {
            url,
            outbound: outbound_rx,
            events: events_tx,
            shutdown: Arc::clone(&shutdown),
        };
        let handle = thread::Builder::new()
            .name("skillsync-realtime".to_string())
            .spawn(move || worker.run())
            .map_err(|err| log::error!("[Realtime] could not start channel thread: {err}"))
            .ok();
        Self {
            outbound: outbound_tx,
            events: events_rx,
            shutdown,
            handle,
        }
    }

    pub fn send(&self, frame: OutboundFrame) {
        if self.outbound.send(frame).is_err() {
            log::warn!("[Realtime] channel thread is gone, frame dropped");
        }
    }

    pub fn try_recv(&self) -> Option<RealtimeEvent> {
        self.events.try_recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<RealtimeEvent> {
        self.events.recv_timeout(timeout).ok()
    }

    /// Stops reconnecting and waits for the socket thread to finish.
    pub fn close(mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for RealtimeChannel {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }
}
