/*!
# BCH Gateway Command Line Interface

Sends requests to a running node over its peer socket and prints the reply.

## Usage

```bash
gatewaycli help [subcommand]
```

## Available subcommands

**call**

sends any endpoint with a json object of params

**balance**

balance of one address

**utxos**

utxos of one address

## Example

```bash
gatewaycli call --endpoint utxosBulk --params '{"addresses":["bitcoincash:qp3sn6vlwz28ntmf3wmyra7jqttfx7z6zgtkygjhc7"]}'
```
or
```bash
gatewaycli balance -a bitcoincash:qp3sn6vlwz28ntmf3wmyra7jqttfx7z6zgtkygjhc7 --node ws://127.0.0.1:5020
```

## Dev

To run from source:

```bash
cargo run --bin gatewaycli -- balance -a bitcoincash:qp3sn6vlwz28ntmf3wmyra7jqttfx7z6zgtkygjhc7
```
*/
use bch_gateway::networking::client::GatewayClient;
use clap::{App, Arg, ArgMatches};
use serde_json::{Map, Value};
use std::time::Duration;
use uuid::Uuid;

const DEFAULT_NODE: &str = "ws://127.0.0.1:5020";

fn node_arg() -> Arg<'static, 'static> {
    Arg::with_name("node")
        .short("n")
        .long("node")
        .takes_value(true)
        .default_value(DEFAULT_NODE)
        .help("base url of the node socket")
}

fn timeout_arg() -> Arg<'static, 'static> {
    Arg::with_name("timeout")
        .long("timeout")
        .takes_value(true)
        .default_value("10000")
        .help("milliseconds to wait for the reply")
}

fn address_arg() -> Arg<'static, 'static> {
    Arg::with_name("address")
        .short("a")
        .long("address")
        .takes_value(true)
        .required(true)
        .help("bitcoincash address")
}

async fn connect(matches: &ArgMatches<'_>) -> bch_gateway::Result<GatewayClient> {
    let node = matches.value_of("node").unwrap_or(DEFAULT_NODE);
    let timeout: u64 = matches.value_of("timeout").unwrap_or("10000").parse()?;
    let url = format!(
        "{}/wsopen/{}",
        node.trim_end_matches('/'),
        Uuid::new_v4()
    );
    Ok(GatewayClient::connect(&url)
        .await?
        .with_timeout(Duration::from_millis(timeout)))
}

async fn call_and_print(
    matches: &ArgMatches<'_>,
    endpoint: &str,
    params: Map<String, Value>,
) -> bch_gateway::Result<()> {
    let mut client = connect(matches).await?;
    let response = client.call_endpoint(endpoint, params).await?;
    println!("{}", serde_json::to_string_pretty(&response.result.value)?);
    Ok(())
}

#[tokio::main]
pub async fn main() -> bch_gateway::Result<()> {
    tracing_subscriber::fmt::init();

    let command_matches = App::new("BCH Gateway Command Line Interface")
        .about("Send wallet requests to a node through the command line")
        .subcommand(
            App::new("call")
                .about("calls any endpoint")
                .arg(node_arg())
                .arg(timeout_arg())
                .arg(
                    Arg::with_name("endpoint")
                        .short("e")
                        .long("endpoint")
                        .takes_value(true)
                        .required(true)
                        .help("endpoint name, e.g. txHistory"),
                )
                .arg(
                    Arg::with_name("params")
                        .short("p")
                        .long("params")
                        .takes_value(true)
                        .default_value("{}")
                        .help("params as a json object"),
                ),
        )
        .subcommand(
            App::new("balance")
                .about("prints the balance of an address")
                .arg(node_arg())
                .arg(timeout_arg())
                .arg(address_arg()),
        )
        .subcommand(
            App::new("utxos")
                .about("prints the utxos of an address")
                .arg(node_arg())
                .arg(timeout_arg())
                .arg(address_arg()),
        )
        .get_matches();

    if let Some(matches) = command_matches.subcommand_matches("call") {
        let endpoint = matches.value_of("endpoint").unwrap_or_default();
        let params: Map<String, Value> =
            serde_json::from_str(matches.value_of("params").unwrap_or("{}"))?;
        call_and_print(matches, endpoint, params).await?;
    }
    if let Some(matches) = command_matches.subcommand_matches("balance") {
        let mut params = Map::new();
        params.insert(
            String::from("addresses"),
            Value::String(matches.value_of("address").unwrap_or_default().to_string()),
        );
        call_and_print(matches, "balance", params).await?;
    }
    if let Some(matches) = command_matches.subcommand_matches("utxos") {
        let mut params = Map::new();
        params.insert(
            String::from("address"),
            Value::String(matches.value_of("address").unwrap_or_default().to_string()),
        );
        call_and_print(matches, "utxos", params).await?;
    }
    Ok(())
}
