use super::{Addresses, BlockchainGateway, GatewayResult, TxHistory, UtxoRef};
use crate::error::GatewayFault;
use crate::settings::GatewaySettings;
use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::{RequestBuilder, StatusCode};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{event, Level};
use url::Url;

/// [`BlockchainGateway`] backed by a bch-api style REST server.
///
/// Every call is bounded by `timeout_ms`; a call that runs out of time comes
/// back as [`GatewayFault::Timeout`].
pub struct RestGateway {
    client: reqwest::Client,
    api_server: Url,
    api_token: Option<String>,
    timeout_ms: u64,
}

impl RestGateway {
    pub fn new(settings: &GatewaySettings) -> crate::Result<Self> {
        let mut api_server = settings.api_server.clone();
        if !api_server.ends_with('/') {
            api_server.push('/');
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(settings.timeout_ms))
            .build()?;
        Ok(RestGateway {
            client,
            api_server: Url::parse(&api_server)?,
            api_token: settings.api_token.clone(),
            timeout_ms: settings.timeout_ms,
        })
    }

    /// Appends `segments` to the api server url. Segments are percent-encoded,
    /// so cashaddr prefixes and hex blobs can be passed as they are.
    pub fn endpoint_url(&self, segments: &[&str]) -> GatewayResult<Url> {
        let mut url = self.api_server.clone();
        url.path_segments_mut()
            .map_err(|_| GatewayFault::exception("api server url cannot be a base"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get(&self, segments: &[&str]) -> GatewayResult<Value> {
        let url = self.endpoint_url(segments)?;
        self.send(self.client.get(url)).await
    }

    async fn post(&self, segments: &[&str], body: Value) -> GatewayResult<Value> {
        let url = self.endpoint_url(segments)?;
        self.send(self.client.post(url).json(&body)).await
    }

    async fn send(&self, request: RequestBuilder) -> GatewayResult<Value> {
        let request = match &self.api_token {
            Some(token) => request.header(AUTHORIZATION, format!("Token {}", token)),
            None => request,
        };
        let response = request
            .send()
            .await
            .map_err(|err| self.fault_from_reqwest(err))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|err| self.fault_from_reqwest(err))?;

        if status.is_success() {
            return serde_json::from_str(&text)
                .map_err(|err| GatewayFault::exception(format!("invalid indexer response: {}", err)));
        }
        event!(Level::DEBUG, "indexer responded with {}: {}", status, text);
        // proxies answer with html or plain text, keep the status in that case
        let body = serde_json::from_str(&text).unwrap_or(Value::Null);
        Err(fault_from_body(status, &body))
    }

    fn fault_from_reqwest(&self, err: reqwest::Error) -> GatewayFault {
        if err.is_timeout() {
            GatewayFault::Timeout {
                elapsed_ms: self.timeout_ms,
            }
        } else {
            GatewayFault::exception(err.to_string())
        }
    }
}

/// Normalizes an error body returned by the indexer. Full-node errors carry an
/// `error` string, everything else is treated as a plain exception.
pub fn fault_from_body(status: StatusCode, body: &Value) -> GatewayFault {
    match (body.get("error"), body.get("message")) {
        (Some(Value::String(error)), _) => GatewayFault::node_error(error.clone()),
        (_, Some(Value::String(message))) => GatewayFault::exception(message.clone()),
        _ => GatewayFault::exception(format!("indexer responded with status {}", status)),
    }
}

#[async_trait]
impl BlockchainGateway for RestGateway {
    async fn transactions(&self, address: &str) -> GatewayResult<TxHistory> {
        let body = self.get(&["electrumx", "transactions", address]).await?;
        serde_json::from_value(body).map_err(|err| GatewayFault::exception(err.to_string()))
    }

    async fn balance(&self, addresses: &Addresses) -> GatewayResult<Value> {
        match addresses {
            Addresses::One(address) => self.get(&["electrumx", "balance", address]).await,
            Addresses::Many(addresses) => {
                self.post(&["electrumx", "balance"], json!({ "addresses": addresses }))
                    .await
            }
        }
    }

    async fn utxos(&self, address: &str) -> GatewayResult<Value> {
        self.get(&["electrumx", "utxos", address]).await
    }

    async fn utxo_is_valid(&self, utxo: &UtxoRef) -> GatewayResult<bool> {
        // getTxOut answers null for a spent output
        let body = self
            .post(
                &["blockchain", "getTxOut"],
                json!({ "txid": utxo.txid, "vout": utxo.vout, "mempool": true }),
            )
            .await?;
        Ok(!body.is_null())
    }

    async fn transaction(&self, txid: &str) -> GatewayResult<Value> {
        let body = self.get(&["electrumx", "tx", "data", txid]).await?;
        Ok(match body.get("details") {
            Some(details) => details.clone(),
            None => body,
        })
    }

    async fn send_raw_transaction(&self, hex: &str) -> GatewayResult<String> {
        let body = self
            .get(&["rawtransactions", "sendRawTransaction", hex])
            .await?;
        match body {
            Value::String(txid) => Ok(txid),
            Value::Array(mut txids) if txids.len() == 1 => match txids.remove(0) {
                Value::String(txid) => Ok(txid),
                other => Err(GatewayFault::exception(format!(
                    "unexpected broadcast response {}",
                    other
                ))),
            },
            other => Err(GatewayFault::exception(format!(
                "unexpected broadcast response {}",
                other
            ))),
        }
    }

    async fn get_pub_key(&self, address: &str) -> GatewayResult<Value> {
        let body = self.get(&["encryption", "publickey", address]).await?;
        // the indexer answers 200 with {success:false, publicKey:"not found"}
        match body.get("success") {
            Some(Value::Bool(false)) => Err(GatewayFault::node_error(
                body.get("publicKey")
                    .and_then(Value::as_str)
                    .unwrap_or("public key not found")
                    .to_string(),
            )),
            _ => Ok(body),
        }
    }

    async fn token_data(&self, token_id: &str, with_tx_history: bool) -> GatewayResult<Value> {
        self.post(
            &["psf", "slp", "token", "data"],
            json!({ "tokenId": token_id, "withTxHistory": with_tx_history }),
        )
        .await
    }

    async fn token_data2(&self, token_id: &str, update_cache: bool) -> GatewayResult<Value> {
        self.post(
            &["psf", "slp", "token", "data2"],
            json!({ "tokenId": token_id, "updateCache": update_cache }),
        )
        .await
    }
}
