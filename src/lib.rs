/*!
# BCH Gateway

A node that gives wallets access to the Bitcoin Cash blockchain without
running an indexer of its own. Balances, utxos, transaction lookups,
broadcasts and token metadata are forwarded to a bch-api style indexer through
a [`gateway::BlockchainGateway`].

The node speaks two transports, a REST api and JSON-RPC over peer sockets.
Both share one router, one rate limiter and one set of handlers, see
[`networking`] for the wire formats.

# Usage

```bash
bch_gateway --config=config
gatewaycli balance -a bitcoincash:qp3sn6vlwz28ntmf3wmyra7jqttfx7z6zgtkygjhc7
```

Settings come from `config.toml` and `BCH_GATEWAY_*` environment variables,
see [`settings`].

*/
pub mod error;
pub mod gateway;
pub mod networking;
pub mod rate_limit;
pub mod runtime;
pub mod settings;
pub mod test_utilities;
pub mod use_cases;
pub mod util;
pub mod validators;

mod test_setup;

/// Process level error. Request handling uses [`error::GatewayError`] instead.
pub type Error = Box<dyn std::error::Error + Send + Sync>;

pub type Result<T> = std::result::Result<T, Error>;
