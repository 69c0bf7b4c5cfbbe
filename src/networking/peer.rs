use crate::util::create_timestamp;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tracing::{event, Level};
use uuid::Uuid;
use warp::ws::Message;

pub type PeerSender = mpsc::UnboundedSender<std::result::Result<Message, warp::Error>>;
pub type Peers = Arc<RwLock<HashMap<String, Peer>>>;

/// A peer with an open socket, keyed by the identity it connected as.
///
/// A peer that reconnects under the same identity replaces the old entry.
/// `connection_id` tells the sockets apart so the old one cannot unregister
/// its successor.
#[derive(Debug, Clone)]
pub struct Peer {
    pub connection_id: Uuid,
    pub remote: String,
    pub connected_at: u64,
    pub sender: PeerSender,
}

impl Peer {
    pub fn new(remote: &str, sender: PeerSender) -> Self {
        Peer {
            connection_id: Uuid::new_v4(),
            remote: remote.to_string(),
            connected_at: create_timestamp(),
            sender,
        }
    }
}

pub fn new_peers() -> Peers {
    Arc::new(RwLock::new(HashMap::new()))
}

/// Registers `peer` under `peer_id`, replacing any older socket.
pub async fn register_peer(peers: &Peers, peer_id: &str, peer: Peer) {
    let replaced = peers.write().await.insert(peer_id.to_string(), peer);
    if let Some(old) = replaced {
        event!(
            Level::INFO,
            "{} reconnected, dropping socket opened at {}",
            peer_id,
            old.connected_at
        );
    }
}

/// Removes `peer_id` only while it still belongs to `connection_id`.
/// Returns whether an entry was removed.
pub async fn unregister_peer(peers: &Peers, peer_id: &str, connection_id: Uuid) -> bool {
    let mut peers = peers.write().await;
    match peers.get(peer_id) {
        Some(peer) if peer.connection_id == connection_id => {
            peers.remove(peer_id);
            true
        }
        _ => false,
    }
}

/// Queues `payload` as a text frame on the socket of `peer_id`.
pub async fn send_to_peer(peers: &Peers, peer_id: &str, payload: String) -> crate::Result<()> {
    let peers = peers.read().await;
    let peer = peers
        .get(peer_id)
        .ok_or_else(|| format!("peer {} is not connected", peer_id))?;
    peer.sender.send(Ok(Message::text(payload))).map_err(|err| {
        event!(Level::WARN, "socket of {} is closing", peer_id);
        format!("could not queue message for {}: {}", peer_id, err)
    })?;
    Ok(())
}
