use crate::gateway::rest::RestGateway;
use crate::gateway::BlockchainGateway;
use crate::networking::network::Network;
use crate::networking::router::BchRpcRouter;
use crate::networking::signals::signal_for_shutdown;
use crate::rate_limit::RateLimiter;
use crate::settings::{Settings, DEFAULT_CONFIG_NAME};
use crate::use_cases::BchUseCases;
use clap::{App, Arg};
use std::sync::Arc;
use tracing::{event, Level};

///
/// The entry point to the gateway runtime
///
pub async fn run() -> crate::Result<()> {
    //
    // handle command-line arguments
    //
    let matches = App::new("BCH Gateway")
        .about("Serves BCH wallet operations over REST and peer sockets")
        .version(env!("CARGO_PKG_VERSION"))
        .arg(
            Arg::with_name("config")
                .short("c")
                .long("config")
                .takes_value(true)
                .help("config file name"),
        )
        .get_matches();

    let config_name = matches.value_of("config").unwrap_or(DEFAULT_CONFIG_NAME);
    let settings = Settings::load(config_name)?;

    let gateway: Arc<dyn BlockchainGateway> = Arc::new(RestGateway::new(&settings.gateway)?);
    let network = build_network(&settings, gateway);

    //
    // run until the server fails or we are told to stop
    //
    tokio::select! {
        res = network.run_server() => {
            if let Err(err) = res {
                event!(Level::ERROR, "run_server err {:?}", err)
            }
        },
        _ = signal_for_shutdown() => {
            event!(Level::INFO, "Shutting down!")
        }
    }

    Ok(())
}

///
/// Wires the shared services together. The gateway, use cases and rate
/// limiter are built once here and handed to every request by reference.
///
pub fn build_network(settings: &Settings, gateway: Arc<dyn BlockchainGateway>) -> Network {
    let use_cases = Arc::new(BchUseCases::new(gateway));
    let rate_limiter = Arc::new(RateLimiter::new(
        settings.rate_limit.max,
        settings.rate_limit.window_ms,
    ));
    let router = Arc::new(BchRpcRouter::new(
        use_cases,
        rate_limiter,
        settings.network.node_id.clone(),
    ));
    Network::new(
        settings.network.clone(),
        router,
        settings.announce_json_ld(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utilities::mocks::MockGateway;

    #[test]
    fn build_network_uses_settings() {
        let mut settings = Settings::default();
        settings.rate_limit.max = 7;
        settings.network.node_id = String::from("QmConfiguredNode");

        let network = build_network(&settings, Arc::new(MockGateway::default()));
        let router = network.get_router();
        assert_eq!(router.get_node_id(), "QmConfiguredNode");
        assert_eq!(router.get_rate_limiter().get_max(), 7);
        assert_eq!(router.get_rate_limiter().get_window_ms(), 60_000);
    }
}
