use crate::networking::peer::Peers;
use crate::networking::router::{BchRpcRouter, Params};
use serde_json::Value;
use std::convert::Infallible;
use std::sync::Arc;
use warp::{Filter, Reply};

use super::handlers::{
    announce_handler, get_pubkey_handler, handle_rejection, post_endpoint_handler,
    ws_upgrade_handler,
};

pub const MAX_BODY_BYTES: u64 = 1024 * 1024;

/// Every route this node serves, with rejections turned into json errors.
pub fn routes(
    router: Arc<BchRpcRouter>,
    peers: Peers,
    announce: Arc<Value>,
) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    announce_route_filter(announce)
        .or(ws_upgrade_route_filter(peers, router.clone()))
        .or(get_pubkey_route_filter(router.clone()))
        .or(post_endpoint_route_filter(router))
        .recover(handle_rejection)
}

/// websocket upgrade filter, the last path segment is the peer identity.
pub fn ws_upgrade_route_filter(
    peers: Peers,
    router: Arc<BchRpcRouter>,
) -> impl Filter<Extract = (impl Reply,), Error = warp::Rejection> + Clone {
    warp::path!("wsopen" / String)
        .and(warp::ws())
        .and(warp::addr::remote())
        .and(with_peers(peers))
        .and(with_router(router))
        .and_then(ws_upgrade_handler)
}

/// GET / service announcement.
pub fn announce_route_filter(
    announce: Arc<Value>,
) -> impl Filter<Extract = (impl Reply,), Error = warp::Rejection> + Clone {
    warp::path::end()
        .and(warp::get())
        .and(warp::any().map(move || announce.clone()))
        .and_then(announce_handler)
}

/// GET /bch/pubkey/:address
pub fn get_pubkey_route_filter(
    router: Arc<BchRpcRouter>,
) -> impl Filter<Extract = (impl Reply,), Error = warp::Rejection> + Clone {
    warp::path!("bch" / "pubkey" / String)
        .and(warp::get())
        .and(warp::addr::remote())
        .and(with_router(router))
        .and_then(get_pubkey_handler)
}

/// POST /bch/:endpoint with a json object body.
pub fn post_endpoint_route_filter(
    router: Arc<BchRpcRouter>,
) -> impl Filter<Extract = (impl Reply,), Error = warp::Rejection> + Clone {
    warp::path!("bch" / String)
        .and(warp::post())
        .and(warp::addr::remote())
        .and(warp::body::content_length_limit(MAX_BODY_BYTES))
        .and(warp::body::json::<Params>())
        .and(with_router(router))
        .and_then(post_endpoint_handler)
}

/// inject router
fn with_router(
    router: Arc<BchRpcRouter>,
) -> impl Filter<Extract = (Arc<BchRpcRouter>,), Error = Infallible> + Clone {
    warp::any().map(move || router.clone())
}

/// inject peers
fn with_peers(peers: Peers) -> impl Filter<Extract = (Peers,), Error = Infallible> + Clone {
    warp::any().map(move || peers.clone())
}
