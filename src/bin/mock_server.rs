//! Local realtime relay for trying the client without the real backend.
//!
//! Clients connect to `ws://<addr>/ws/<user_id>?token=...`. Typing frames are
//! forwarded to their receiver, `mark_read` is announced to everyone else as
//! `message_read`, and raw `new_message` frames are relayed to the message's
//! receiver so a second terminal can push messages in.

use std::{
    collections::HashMap,
    net::{TcpListener, TcpStream},
    sync::{mpsc, Arc, Mutex},
    thread,
    time::Duration,
};

use skillsync::realtime::{InboundFrame, OutboundFrame};
use tungstenite::{
    accept_hdr,
    handshake::server::{ErrorResponse, Request, Response},
    Message as WsMessage, WebSocket,
};

type Peers = Arc<Mutex<HashMap<i64, Vec<mpsc::Sender<String>>>>>;

fn user_from_path(path: &str) -> Option<i64> {
    path.trim_end_matches('/').rsplit('/').next()?.parse().ok()
}

fn deliver(peers: &Peers, to: i64, frame: &InboundFrame) {
    let Ok(text) = serde_json::to_string(frame) else {
        return;
    };
    if let Ok(mut map) = peers.lock() {
        if let Some(senders) = map.get_mut(&to) {
            senders.retain(|sender| sender.send(text.clone()).is_ok());
        }
    }
}

fn deliver_except(peers: &Peers, except: i64, frame: &InboundFrame) {
    let targets: Vec<i64> = match peers.lock() {
        Ok(map) => map.keys().copied().filter(|id| *id != except).collect(),
        Err(_) => return,
    };
    for id in targets {
        deliver(peers, id, frame);
    }
}

fn route_frame(peers: &Peers, from: i64, text: &str) {
    if let Ok(frame) = serde_json::from_str::<OutboundFrame>(text) {
        match frame {
            OutboundFrame::Typing {
                receiver_id,
                is_typing,
            } => deliver(
                peers,
                receiver_id,
                &InboundFrame::Typing {
                    sender_id: from,
                    is_typing,
                },
            ),
            OutboundFrame::MarkRead { message_ids } => deliver_except(
                peers,
                from,
                &InboundFrame::MessageRead {
                    message_ids,
                    reader_id: Some(from),
                },
            ),
        }
        return;
    }
    match serde_json::from_str::<InboundFrame>(text) {
        Ok(InboundFrame::NewMessage { message }) => {
            match message.get("receiver_id").and_then(|v| v.as_i64()) {
                Some(receiver) => deliver(peers, receiver, &InboundFrame::NewMessage { message }),
                None => log::warn!("new_message from {from} has no receiver_id"),
            }
        }
        Ok(other) => log::debug!("ignoring {other:?} from {from}"),
        Err(err) => log::warn!("unreadable frame from {from} ({err}): {text}"),
    }
}

fn serve(mut socket: WebSocket<TcpStream>, user_id: i64, rx: mpsc::Receiver<String>, peers: Peers) {
    loop {
        match socket.read() {
            Ok(WsMessage::Text(text)) => route_frame(&peers, user_id, &text),
            Ok(WsMessage::Close(_)) => break,
            Ok(_) => {}
            Err(tungstenite::Error::Io(ref err)) if err.kind() == std::io::ErrorKind::WouldBlock => {}
            Err(err) => {
                log::info!("user {user_id} dropped: {err}");
                break;
            }
        }

        while let Ok(payload) = rx.try_recv() {
            if socket.send(WsMessage::Text(payload)).is_err() {
                return;
            }
        }

        thread::sleep(Duration::from_millis(8));
    }
    log::info!("user {user_id} disconnected");
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let addr = std::env::var("SKILLSYNC_MOCK_ADDR").unwrap_or_else(|_| "127.0.0.1:9001".to_string());
    let listener = TcpListener::bind(&addr)?;
    log::info!("mock realtime relay listening on ws://{addr}/ws/<user_id>");

    let peers: Peers = Arc::new(Mutex::new(HashMap::new()));

    for stream in listener.incoming() {
        let stream = match stream {
            Ok(stream) => stream,
            Err(err) => {
                log::warn!("accept failed: {err}");
                continue;
            }
        };
        let mut path = String::new();
        let socket = match accept_hdr(stream, |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
            path = req.uri().path().to_string();
            Ok(resp)
        }) {
            Ok(socket) => socket,
            Err(err) => {
                log::warn!("handshake failed: {err}");
                continue;
            }
        };
        let Some(user_id) = user_from_path(&path) else {
            log::warn!("rejecting connection without a user id: {path}");
            continue;
        };
        if let Err(err) = socket.get_ref().set_nonblocking(true) {
            log::warn!("cannot switch user {user_id} to nonblocking: {err}");
            continue;
        }

        let (tx, rx) = mpsc::channel::<String>();
        if let Ok(mut map) = peers.lock() {
            map.entry(user_id).or_default().push(tx);
        }
        log::info!("user {user_id} connected");

        let peers = Arc::clone(&peers);
        thread::spawn(move || serve(socket, user_id, rx, peers));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_id_comes_from_last_segment() {
        assert_eq!(user_from_path("/ws/42"), Some(42));
        assert_eq!(user_from_path("/ws/42/"), Some(42));
        assert_eq!(user_from_path("/ws"), None);
    }

    #[test]
    fn typing_is_forwarded_to_receiver() {
        let peers: Peers = Arc::new(Mutex::new(HashMap::new()));
        let (tx, rx) = mpsc::channel();
        peers.lock().unwrap().insert(7, vec![tx]);

        route_frame(&peers, 3, r#"{"type":"typing","receiver_id":7,"is_typing":true}"#);
        let text = rx.try_recv().unwrap();
        assert_eq!(
            serde_json::from_str::<InboundFrame>(&text).unwrap(),
            InboundFrame::Typing {
                sender_id: 3,
                is_typing: true
            }
        );
    }

    #[test]
    fn mark_read_reaches_everyone_but_the_reader() {
        let peers: Peers = Arc::new(Mutex::new(HashMap::new()));
        let (reader_tx, reader_rx) = mpsc::channel();
        let (peer_tx, peer_rx) = mpsc::channel();
        peers.lock().unwrap().insert(1, vec![reader_tx]);
        peers.lock().unwrap().insert(2, vec![peer_tx]);

        route_frame(&peers, 1, r#"{"type":"mark_read","message_ids":[5,6]}"#);
        assert!(reader_rx.try_recv().is_err());
        let frame = serde_json::from_str::<InboundFrame>(&peer_rx.try_recv().unwrap()).unwrap();
        assert_eq!(
            frame,
            InboundFrame::MessageRead {
                message_ids: vec![5, 6],
                reader_id: Some(1)
            }
        );
    }
}
