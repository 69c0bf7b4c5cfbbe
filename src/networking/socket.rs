use crate::networking::peer::{register_peer, send_to_peer, unregister_peer, Peer, Peers};
use crate::networking::router::BchRpcRouter;
use futures::{FutureExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{event, Level};
use warp::ws::{Message, WebSocket};

/// Drives one peer socket until it closes.
///
/// Outgoing frames go through an unbounded channel so any task can reply via
/// [`send_to_peer`]. Each text frame is handled on its own task, replies are
/// matched to requests by id, not by order. `remote` is the address the
/// socket was opened from and is charged alongside `peer_id`.
pub async fn peer_connection(
    ws: WebSocket,
    peer_id: String,
    remote: String,
    peers: Peers,
    router: Arc<BchRpcRouter>,
) {
    let (peer_ws_sender, mut peer_ws_rcv) = ws.split();
    let (peer_sender, peer_rcv) = mpsc::unbounded_channel();
    let peer_rcv = UnboundedReceiverStream::new(peer_rcv);
    tokio::task::spawn(peer_rcv.forward(peer_ws_sender).map(|result| {
        if let Err(e) = result {
            event!(Level::ERROR, "error sending websocket msg: {}", e);
        }
    }));

    let peer = Peer::new(&remote, peer_sender);
    let connection_id = peer.connection_id;
    register_peer(&peers, &peer_id, peer).await;
    event!(Level::INFO, "{} connected from {}", peer_id, remote);

    while let Some(result) = peer_ws_rcv.next().await {
        let msg = match result {
            Ok(msg) => msg,
            Err(e) => {
                event!(Level::ERROR, "error receiving ws message for {}: {}", peer_id, e);
                break;
            }
        };
        peer_msg(&peer_id, &remote, msg, peers.clone(), router.clone());
    }

    if unregister_peer(&peers, &peer_id, connection_id).await {
        event!(Level::INFO, "{} disconnected", peer_id);
    } else {
        event!(Level::DEBUG, "replaced socket of {} closed", peer_id);
    }
}

fn peer_msg(peer_id: &str, remote: &str, msg: Message, peers: Peers, router: Arc<BchRpcRouter>) {
    // only text frames carry requests
    let payload = match msg.to_str() {
        Ok(payload) => payload.to_string(),
        Err(()) => return,
    };
    let peer_id = peer_id.to_string();
    let remote = remote.to_string();
    tokio::spawn(async move {
        if let Some(reply) = router.handle_peer_payload(&peer_id, &remote, &payload).await {
            if let Err(err) = send_to_peer(&peers, &peer_id, reply).await {
                event!(Level::WARN, "reply to {} lost: {}", peer_id, err);
            }
        }
    });
}
