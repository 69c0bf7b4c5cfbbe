/*!
# BCH Gateway

## Help

```bash
bch_gateway --help
```

## Example Usage

```bash
bch_gateway --config=config
BCH_GATEWAY_NETWORK__PORT=6000 bch_gateway
```

## Dev

To run from source:

```bash
cargo run -- --help
RUST_LOG=bch_gateway=debug cargo run -- --config=config
```
*/

use bch_gateway::runtime;

#[tokio::main]
pub async fn main() -> bch_gateway::Result<()> {
    tracing_subscriber::fmt::init();
    runtime::run().await
}
