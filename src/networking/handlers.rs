use crate::error::GatewayError;
use crate::networking::endpoint::Endpoint;
use crate::networking::peer::Peers;
use crate::networking::router::{BchRpcRouter, Params};
use crate::networking::socket;
use serde_json::{json, Value};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{event, Level};
use warp::http::StatusCode;
use warp::{Rejection, Reply};

pub type Result<T> = std::result::Result<T, Rejection>;

/// A handler failure carrying the HTTP status it is answered with.
#[derive(Debug, Clone, PartialEq)]
pub struct HandlerError {
    pub status: u16,
    pub message: String,
}

impl warp::reject::Reject for HandlerError {}

impl From<GatewayError> for HandlerError {
    fn from(err: GatewayError) -> Self {
        HandlerError {
            status: err.status(),
            message: err.to_string(),
        }
    }
}

fn reject(err: GatewayError) -> Rejection {
    warp::reject::custom(HandlerError::from(err))
}

/// Rate limit key for a remote address, shared by http callers and sockets.
pub fn remote_identity(remote: Option<SocketAddr>) -> String {
    remote
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| String::from("unknown"))
}

pub async fn ws_upgrade_handler(
    peer_id: String,
    ws: warp::ws::Ws,
    remote: Option<SocketAddr>,
    peers: Peers,
    router: Arc<BchRpcRouter>,
) -> Result<impl Reply> {
    let remote = remote_identity(remote);
    event!(Level::DEBUG, "socket upgrade for {} from {}", peer_id, remote);
    Ok(ws.on_upgrade(move |socket| {
        socket::peer_connection(socket, peer_id, remote, peers, router)
    }))
}

pub async fn post_endpoint_handler(
    name: String,
    remote: Option<SocketAddr>,
    params: Params,
    router: Arc<BchRpcRouter>,
) -> Result<impl Reply> {
    let endpoint = name.parse::<Endpoint>().map_err(reject)?;
    call_endpoint(endpoint, &name, remote, params, router).await
}

pub async fn get_pubkey_handler(
    address: String,
    remote: Option<SocketAddr>,
    router: Arc<BchRpcRouter>,
) -> Result<impl Reply> {
    let mut params = Params::new();
    params.insert(String::from("address"), Value::String(address));
    call_endpoint(Endpoint::PubKey, Endpoint::PubKey.as_str(), remote, params, router).await
}

async fn call_endpoint(
    endpoint: Endpoint,
    name: &str,
    remote: Option<SocketAddr>,
    params: Params,
    router: Arc<BchRpcRouter>,
) -> Result<warp::reply::Json> {
    let identity = remote_identity(remote);
    router
        .get_rate_limiter()
        .limiter(&identity)
        .await
        .map_err(reject)?;
    let envelope = router
        .invoke(endpoint, name, &params)
        .await
        .map_err(reject)?;
    Ok(warp::reply::json(&envelope))
}

pub async fn announce_handler(announce: Arc<Value>) -> Result<impl Reply> {
    Ok(warp::reply::json(announce.as_ref()))
}

/// Answers every rejection with `{status, error}` and the matching HTTP
/// status. Anything without an explicit status is a 422.
pub async fn handle_rejection(err: Rejection) -> std::result::Result<impl Reply, Infallible> {
    let (status, message) = if let Some(err) = err.find::<HandlerError>() {
        (err.status, err.message.clone())
    } else if err.is_not_found() {
        (404, String::from("not found"))
    } else if let Some(err) = err.find::<warp::reject::MethodNotAllowed>() {
        (405, err.to_string())
    } else if let Some(err) = err.find::<warp::reject::PayloadTooLarge>() {
        (413, err.to_string())
    } else if let Some(err) = err.find::<warp::body::BodyDeserializeError>() {
        (422, err.to_string())
    } else {
        event!(Level::WARN, "unhandled rejection {:?}", err);
        (422, String::from("request could not be processed"))
    };

    let code = StatusCode::from_u16(status).unwrap_or(StatusCode::UNPROCESSABLE_ENTITY);
    Ok(warp::reply::with_status(
        warp::reply::json(&json!({ "status": status, "error": message })),
        code,
    ))
}
