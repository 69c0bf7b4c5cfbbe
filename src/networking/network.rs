use crate::networking::filters::routes;
use crate::networking::peer::{new_peers, Peers};
use crate::networking::router::BchRpcRouter;
use crate::settings::NetworkSettings;
use crate::util::format_host_string;
use serde_json::Value;
use std::sync::Arc;
use tracing::{event, Level};

/// The listening side of the node: the REST api, the peer sockets and the
/// service announcement, all on `network.host:network.port`.
pub struct Network {
    settings: NetworkSettings,
    router: Arc<BchRpcRouter>,
    peers: Peers,
    announce: Arc<Value>,
}

impl Network {
    pub fn new(settings: NetworkSettings, router: Arc<BchRpcRouter>, announce: Value) -> Network {
        Network {
            settings,
            router,
            peers: new_peers(),
            announce: Arc::new(announce),
        }
    }

    pub fn get_peers(&self) -> Peers {
        self.peers.clone()
    }

    pub fn get_router(&self) -> Arc<BchRpcRouter> {
        self.router.clone()
    }

    /// Runs warp::serve to listen for incoming connections
    pub async fn run_server(&self) -> crate::Result<()> {
        let routes = routes(
            self.router.clone(),
            self.peers.clone(),
            self.announce.clone(),
        );
        event!(
            Level::INFO,
            "listening on {} as {}",
            format_host_string(self.settings.host, self.settings.port),
            self.router.get_node_id()
        );
        warp::serve(routes)
            .run((self.settings.host, self.settings.port))
            .await;
        Ok(())
    }
}
