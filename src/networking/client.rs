use crate::networking::rpc_message::{RpcEnvelope, RpcResponse};
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tokio::sync::RwLock;
use tokio::time::sleep;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{event, Level};
use uuid::Uuid;

pub const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_secs(10);
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Replies waiting to be picked up. Only ids of calls still waiting are
/// accepted, so a reply that shows up after its call gave up is dropped.
#[derive(Debug, Default)]
struct Inbox {
    pending: HashSet<String>,
    replies: HashMap<String, RpcResponse>,
}

impl Inbox {
    fn expect(&mut self, id: &str) {
        self.pending.insert(id.to_string());
    }

    fn deliver(&mut self, response: RpcResponse) -> bool {
        if !self.pending.contains(&response.id) {
            return false;
        }
        self.replies.insert(response.id.clone(), response);
        true
    }

    fn take(&mut self, id: &str) -> Option<RpcResponse> {
        let response = self.replies.remove(id)?;
        self.pending.remove(id);
        Some(response)
    }

    fn abandon(&mut self, id: &str) {
        self.pending.remove(id);
        self.replies.remove(id);
    }
}

type SharedInbox = Arc<RwLock<Inbox>>;

/// Talks to a node over its peer socket.
///
/// Replies are collected into an inbox by a reader task; [`GatewayClient::call`]
/// polls that inbox at a fixed interval and gives up once the timeout passes.
pub struct GatewayClient {
    write_sink: SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>,
    inbox: SharedInbox,
    timeout: Duration,
}

impl GatewayClient {
    /// `url` is the full socket url, see [`crate::util::format_peer_socket_url`].
    pub async fn connect(url: &str) -> crate::Result<Self> {
        let url = url::Url::parse(url)?;
        let (ws_stream, _) = connect_async(url).await?;
        let (write_sink, mut read_stream) = ws_stream.split();

        let inbox: SharedInbox = Arc::new(RwLock::new(Inbox::default()));
        let reader_inbox = inbox.clone();
        tokio::spawn(async move {
            while let Some(result) = read_stream.next().await {
                match result {
                    Ok(Message::Text(payload)) => match RpcResponse::deserialize(&payload) {
                        Ok(response) => {
                            let id = response.id.clone();
                            if !reader_inbox.write().await.deliver(response) {
                                event!(Level::DEBUG, "dropping reply {} nobody waits for", id);
                            }
                        }
                        Err(err) => event!(Level::WARN, "ignoring unexpected frame: {}", err),
                    },
                    Ok(_) => {}
                    Err(error) => {
                        event!(Level::ERROR, "Error reading from node socket {}", error);
                        break;
                    }
                }
            }
        });

        Ok(GatewayClient {
            write_sink,
            inbox,
            timeout: DEFAULT_RESPONSE_TIMEOUT,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sends a `method` request and waits for the reply with the same id.
    pub async fn call(&mut self, method: &str, params: Map<String, Value>) -> crate::Result<RpcResponse> {
        let request = RpcEnvelope::new(&Uuid::new_v4().to_string(), method, params);
        self.inbox.write().await.expect(&request.id);
        if let Err(err) = self.write_sink.send(Message::Text(request.serialize()?)).await {
            self.inbox.write().await.abandon(&request.id);
            return Err(err.into());
        }

        let started = Instant::now();
        loop {
            if let Some(response) = self.inbox.write().await.take(&request.id) {
                return Ok(response);
            }
            if started.elapsed() >= self.timeout {
                self.inbox.write().await.abandon(&request.id);
                return Err(format!(
                    "no response to {} within {} ms",
                    request.id,
                    self.timeout.as_millis()
                )
                .into());
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    /// Shorthand for a `bch` request to `endpoint`.
    pub async fn call_endpoint(
        &mut self,
        endpoint: &str,
        mut params: Map<String, Value>,
    ) -> crate::Result<RpcResponse> {
        params.insert(String::from("endpoint"), Value::String(endpoint.to_string()));
        self.call(crate::networking::router::BCH_METHOD, params).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::networking::filters::routes;
    use crate::networking::peer::new_peers;
    use crate::networking::response::ResponseEnvelope;
    use crate::test_utilities::make_test_router;
    use crate::test_utilities::mocks::MockGateway;
    use crate::util::format_peer_socket_url;
    use serde_json::json;
    use serial_test::serial;
    use warp::Filter;

    async fn spawn_node(gateway: MockGateway) -> std::net::SocketAddr {
        let router = Arc::new(make_test_router(Arc::new(gateway), 100));
        let routes = routes(router, new_peers(), Arc::new(json!({})));
        let (addr, server) = warp::serve(routes).bind_ephemeral(([127, 0, 0, 1], 0));
        tokio::spawn(server);
        addr
    }

    #[tokio::test]
    #[serial]
    async fn call_endpoint_over_socket() {
        let addr = spawn_node(MockGateway::default()).await;
        let url = format_peer_socket_url([127, 0, 0, 1], addr.port(), "QmCliClient");
        let mut client = GatewayClient::connect(&url).await.unwrap();

        let mut params = Map::new();
        params.insert(String::from("hex"), json!("0200"));
        let response = client.call_endpoint("broadcast", params).await.unwrap();
        assert_eq!(response.result.reciever, crate::test_utilities::TEST_NODE_ID);
        assert!(response.result.value.success);
        assert_eq!(response.result.value.endpoint.as_deref(), Some("broadcast"));
    }

    #[tokio::test]
    #[serial]
    async fn silence_is_a_failure() {
        // a node that reads requests and never answers
        let mute = warp::path!("wsopen" / String).and(warp::ws()).map(
            |_peer_id: String, ws: warp::ws::Ws| {
                ws.on_upgrade(|socket| async move {
                    let (_sink, mut stream) = socket.split();
                    while stream.next().await.is_some() {}
                })
            },
        );
        let (addr, server) = warp::serve(mute).bind_ephemeral(([127, 0, 0, 1], 0));
        tokio::spawn(server);

        let url = format_peer_socket_url([127, 0, 0, 1], addr.port(), "QmCliClient");
        let mut client = GatewayClient::connect(&url)
            .await
            .unwrap()
            .with_timeout(Duration::from_millis(300));

        let started = Instant::now();
        let err = client.call_endpoint("balance", Map::new()).await.unwrap_err();
        assert!(err.to_string().starts_with("no response to"));
        assert!(started.elapsed() >= Duration::from_millis(300));
    }

    #[test]
    fn inbox_drops_replies_nobody_waits_for() {
        let reply = |id: &str| {
            RpcResponse::new(
                &RpcEnvelope::new(id, "bch", Map::new()),
                "QmNode",
                ResponseEnvelope::ok(),
            )
        };
        let mut inbox = Inbox::default();
        assert!(!inbox.deliver(reply("unasked")));

        inbox.expect("a");
        inbox.expect("b");
        assert!(inbox.deliver(reply("a")));
        assert_eq!(inbox.take("a").unwrap().id, "a");
        assert!(inbox.take("a").is_none());

        // "b" timed out, its late reply must not pile up
        inbox.abandon("b");
        assert!(!inbox.deliver(reply("b")));
        assert!(inbox.pending.is_empty());
        assert!(inbox.replies.is_empty());
    }
}
