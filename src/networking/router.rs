use crate::error::GatewayError;
use crate::gateway::{Addresses, BlockchainGateway, UtxoRef};
use crate::networking::endpoint::Endpoint;
use crate::networking::response::{ResponseEnvelope, UNKNOWN_ENDPOINT};
use crate::networking::rpc_message::{RpcEnvelope, RpcRequestContext, RpcResponse};
use crate::rate_limit::RateLimiter;
use crate::use_cases::{BchUseCases, SortOrder};
use crate::validators::{optional_bool, required_string, validate_bulk, MAX_BULK_ELEMENTS};
use futures::FutureExt;
use serde_json::{Map, Value};
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{event, Level};

/// Wallet service, every endpoint of [`Endpoint`].
pub const BCH_METHOD: &str = "bch";
/// Indexer service. Only knows [`FULCRUM_TRANSACTIONS`].
pub const FULCRUM_METHOD: &str = "fulcrum";
pub const FULCRUM_TRANSACTIONS: &str = "transactions";

pub type Params = Map<String, Value>;

/// Turns requests into [`ResponseEnvelope`]s.
///
/// Every known endpoint is rate limited on the caller identity before its
/// handler runs. Handler errors, and panics, are converted into failure
/// envelopes here so nothing escapes to the transport.
pub struct BchRpcRouter {
    use_cases: Arc<BchUseCases>,
    rate_limiter: Arc<RateLimiter>,
    node_id: String,
}

impl BchRpcRouter {
    pub fn new(use_cases: Arc<BchUseCases>, rate_limiter: Arc<RateLimiter>, node_id: String) -> Self {
        BchRpcRouter {
            use_cases,
            rate_limiter,
            node_id,
        }
    }

    pub fn get_node_id(&self) -> &str {
        &self.node_id
    }

    pub fn get_rate_limiter(&self) -> &Arc<RateLimiter> {
        &self.rate_limiter
    }

    fn gateway(&self) -> &Arc<dyn BlockchainGateway> {
        self.use_cases.gateway()
    }

    /// Decodes and answers one payload. Payloads that do not decode as a
    /// request are logged and dropped.
    pub async fn handle_payload(&self, from: &str, payload: &str) -> Option<String> {
        let envelope = decode_payload(from, payload)?;
        let response = self
            .handle_request(RpcRequestContext::new(from, envelope))
            .await;
        encode_reply(from, &response)
    }

    /// Entry point for the peer transport. Routed requests are charged to the
    /// remote address as well as to the peer id, so reconnecting under a fresh
    /// id does not reset the budget.
    pub async fn handle_peer_payload(
        &self,
        from: &str,
        remote: &str,
        payload: &str,
    ) -> Option<String> {
        let envelope = decode_payload(from, payload)?;
        let charged = self.charge_remote(remote, &envelope).await;
        let response = match charged {
            Ok(()) => {
                self.handle_request(RpcRequestContext::new(from, envelope))
                    .await
            }
            Err((name, err)) => {
                RpcResponse::new(&envelope, &self.node_id, ResponseEnvelope::failure(&name, &err))
            }
        };
        encode_reply(from, &response)
    }

    async fn charge_remote(
        &self,
        remote: &str,
        envelope: &RpcEnvelope,
    ) -> Result<(), (String, GatewayError)> {
        let name = match (envelope.method.as_str(), envelope.endpoint()) {
            (BCH_METHOD, Some(name)) if name.parse::<Endpoint>().is_ok() => name,
            (FULCRUM_METHOD, Some(FULCRUM_TRANSACTIONS)) => FULCRUM_TRANSACTIONS,
            // unknown requests are answered without touching any budget
            _ => return Ok(()),
        };
        self.rate_limiter
            .limiter(remote)
            .await
            .map_err(|err| (name.to_string(), err))
    }

    pub async fn handle_request(&self, context: RpcRequestContext) -> RpcResponse {
        let value = match context.payload.method.as_str() {
            BCH_METHOD => self.route(&context).await,
            FULCRUM_METHOD => self.route_fulcrum(&context).await,
            method => {
                let err = GatewayError::UnknownMethod(method.to_string());
                event!(Level::DEBUG, "{} from {}", err, context.from);
                ResponseEnvelope::failure(UNKNOWN_ENDPOINT, &err)
            }
        };
        RpcResponse::new(&context.payload, &self.node_id, value)
    }

    /// `fulcrum` requests: the raw history of one or more addresses, with the
    /// same rate limit as the wallet service.
    pub async fn route_fulcrum(&self, context: &RpcRequestContext) -> ResponseEnvelope {
        match context.payload.endpoint() {
            Some(FULCRUM_TRANSACTIONS) => (),
            other => {
                let err = GatewayError::UnknownEndpoint(other.unwrap_or("<missing>").to_string());
                return ResponseEnvelope::failure(UNKNOWN_ENDPOINT, &err);
            }
        }

        let result = match self.rate_limiter.limiter(&context.from).await {
            Ok(()) => {
                catch_panics(
                    FULCRUM_TRANSACTIONS,
                    self.fulcrum_transactions(&context.payload.params),
                )
                .await
            }
            Err(err) => Err(err),
        };
        result.unwrap_or_else(|err| ResponseEnvelope::failure(FULCRUM_TRANSACTIONS, &err))
    }

    pub async fn route(&self, context: &RpcRequestContext) -> ResponseEnvelope {
        let name = match context.payload.endpoint() {
            Some(name) => name,
            None => {
                let err = GatewayError::UnknownEndpoint(String::from("<missing>"));
                return ResponseEnvelope::failure(UNKNOWN_ENDPOINT, &err);
            }
        };
        let endpoint = match name.parse::<Endpoint>() {
            Ok(endpoint) => endpoint,
            Err(err) => {
                event!(Level::DEBUG, "{} from {}", err, context.from);
                return ResponseEnvelope::failure(UNKNOWN_ENDPOINT, &err);
            }
        };

        event!(Level::TRACE, "{} -> {}", context.from, endpoint);
        let result = match self.rate_limiter.limiter(&context.from).await {
            Ok(()) => self.invoke(endpoint, name, &context.payload.params).await,
            Err(err) => Err(err),
        };
        result.unwrap_or_else(|err| ResponseEnvelope::failure(name, &err))
    }

    /// Runs the handler for `endpoint`. The caller is responsible for rate
    /// limiting. A panic inside the handler comes back as
    /// [`GatewayError::Unhandled`].
    pub async fn invoke(
        &self,
        endpoint: Endpoint,
        name: &str,
        params: &Params,
    ) -> Result<ResponseEnvelope, GatewayError> {
        catch_panics(name, self.dispatch(endpoint, name, params)).await
    }

    async fn dispatch(
        &self,
        endpoint: Endpoint,
        name: &str,
        params: &Params,
    ) -> Result<ResponseEnvelope, GatewayError> {
        match endpoint {
            Endpoint::TxHistory => self.tx_history(params).await,
            Endpoint::Balance => self.balance(params).await,
            Endpoint::Utxos => self.utxos(params).await,
            Endpoint::UtxosBulk => self.utxos_bulk(params).await,
            Endpoint::Broadcast => self.broadcast(name, params).await,
            Endpoint::TxData => self.tx_data(name, params).await,
            Endpoint::PubKey => self.pub_key(name, params).await,
            Endpoint::UtxoIsValid => self.utxo_is_valid(name, params).await,
            Endpoint::GetTokenData => self.token_data(name, params).await,
            Endpoint::GetTokenData2 => self.token_data2(name, params).await,
        }
    }

    async fn balance(&self, params: &Params) -> Result<ResponseEnvelope, GatewayError> {
        let addresses = match params.get("addresses") {
            None | Some(Value::Null) => {
                return Err(GatewayError::validation("addresses parameter is required"))
            }
            Some(Value::String(address)) => Addresses::One(address.clone()),
            Some(addresses) => Addresses::Many(validate_bulk(
                Some(addresses),
                "addresses",
                MAX_BULK_ELEMENTS,
            )?),
        };
        let body = self.gateway().balance(&addresses).await?;
        ResponseEnvelope::passthrough(body)
    }

    async fn utxos(&self, params: &Params) -> Result<ResponseEnvelope, GatewayError> {
        let address = required_string(params, "address")?;
        let body = self.gateway().utxos(&address).await?;
        ResponseEnvelope::passthrough(body)
    }

    async fn utxos_bulk(&self, params: &Params) -> Result<ResponseEnvelope, GatewayError> {
        let result = self.use_cases.get_utxos_bulk(params.get("addresses")).await?;
        ResponseEnvelope::from_serializable(&result)
    }

    async fn broadcast(&self, name: &str, params: &Params) -> Result<ResponseEnvelope, GatewayError> {
        let hex = required_string(params, "hex")?;
        let txid = self.gateway().send_raw_transaction(&hex).await?;
        event!(Level::INFO, "broadcast {}", txid);
        Ok(ResponseEnvelope::ok_for(name).with("txid", Value::String(txid)))
    }

    async fn tx_history(&self, params: &Params) -> Result<ResponseEnvelope, GatewayError> {
        // older clients send the address as the first element of `addresses`
        let address = match (params.get("address"), params.get("addresses")) {
            (None, Some(Value::Array(addresses))) if !addresses.is_empty() => {
                match &addresses[0] {
                    Value::String(address) => address.clone(),
                    _ => {
                        return Err(GatewayError::validation(
                            "addresses parameter must contain only strings",
                        ))
                    }
                }
            }
            _ => required_string(params, "address")?,
        };
        let sort_order = match params.get("sortOrder") {
            None | Some(Value::Null) => SortOrder::default(),
            Some(Value::String(sort_order)) => sort_order.parse()?,
            Some(_) => {
                return Err(GatewayError::validation(
                    "sortOrder must be ASCENDING or DESCENDING",
                ))
            }
        };
        let page = page_param(params)?;

        let page = self
            .use_cases
            .get_transactions(&address, sort_order, page)
            .await?;
        ResponseEnvelope::from_serializable(&page)
    }

    async fn fulcrum_transactions(&self, params: &Params) -> Result<ResponseEnvelope, GatewayError> {
        let addresses = match params.get("addresses") {
            None | Some(Value::Null) => {
                return Err(GatewayError::validation("addresses parameter is required"))
            }
            Some(Value::String(address)) => vec![address.clone()],
            Some(addresses) => validate_bulk(Some(addresses), "addresses", MAX_BULK_ELEMENTS)?,
        };
        let result = self.use_cases.get_histories(&addresses).await?;
        ResponseEnvelope::from_serializable(&result)
    }

    async fn tx_data(&self, name: &str, params: &Params) -> Result<ResponseEnvelope, GatewayError> {
        // a lone `txid` is a one element batch
        let single = match params.get("txids") {
            None => params.get("txid").map(|txid| Value::Array(vec![txid.clone()])),
            Some(_) => None,
        };
        let txids = params.get("txids").or_else(|| single.as_ref());

        let result = self.use_cases.get_tx_data(txids).await?;
        Ok(ResponseEnvelope::from_serializable(&result)?.with_endpoint(name))
    }

    async fn pub_key(&self, name: &str, params: &Params) -> Result<ResponseEnvelope, GatewayError> {
        let address = required_string(params, "address")?;
        let pubkey = self.gateway().get_pub_key(&address).await?;
        Ok(ResponseEnvelope::ok_for(name).with("pubkey", pubkey))
    }

    async fn utxo_is_valid(
        &self,
        name: &str,
        params: &Params,
    ) -> Result<ResponseEnvelope, GatewayError> {
        let utxo: UtxoRef = match params.get("utxo") {
            None | Some(Value::Null) => {
                return Err(GatewayError::validation("utxo parameter is required"))
            }
            Some(utxo) => serde_json::from_value(utxo.clone()).map_err(|_| {
                GatewayError::validation("utxo parameter must contain txid and vout")
            })?,
        };
        let is_valid = self.gateway().utxo_is_valid(&utxo).await?;
        Ok(ResponseEnvelope::ok_for(name).with("isValid", Value::Bool(is_valid)))
    }

    async fn token_data(&self, name: &str, params: &Params) -> Result<ResponseEnvelope, GatewayError> {
        let token_id = required_string(params, "tokenId")?;
        let with_tx_history = optional_bool(params, "withTxHistory")?;
        let token_data = self.gateway().token_data(&token_id, with_tx_history).await?;
        Ok(ResponseEnvelope::ok_for(name).with("tokenData", token_data))
    }

    async fn token_data2(&self, name: &str, params: &Params) -> Result<ResponseEnvelope, GatewayError> {
        let token_id = required_string(params, "tokenId")?;
        let update_cache = optional_bool(params, "updateCache")?;
        let token_data = self.gateway().token_data2(&token_id, update_cache).await?;
        Ok(ResponseEnvelope::ok_for(name).with("tokenData", token_data))
    }
}

/// `page` absent and `page == 0` both select the first page.
fn page_param(params: &Params) -> Result<usize, GatewayError> {
    let invalid = || GatewayError::validation("page parameter must be a non-negative integer");
    match params.get("page") {
        None | Some(Value::Null) => Ok(0),
        Some(Value::Number(page)) => page.as_u64().map(|page| page as usize).ok_or_else(invalid),
        Some(Value::String(page)) => page.parse::<usize>().map_err(|_| invalid()),
        Some(_) => Err(invalid()),
    }
}

fn decode_payload(from: &str, payload: &str) -> Option<RpcEnvelope> {
    match RpcEnvelope::deserialize(payload) {
        Ok(envelope) => Some(envelope),
        Err(err) => {
            event!(Level::WARN, "dropping undecodable payload from {}: {}", from, err);
            None
        }
    }
}

fn encode_reply(from: &str, response: &RpcResponse) -> Option<String> {
    match response.serialize() {
        Ok(reply) => Some(reply),
        Err(err) => {
            event!(Level::ERROR, "could not encode reply to {}: {}", from, err);
            None
        }
    }
}

/// Turns a panic inside `handler` into [`GatewayError::Unhandled`].
async fn catch_panics<F>(name: &str, handler: F) -> Result<ResponseEnvelope, GatewayError>
where
    F: Future<Output = Result<ResponseEnvelope, GatewayError>>,
{
    AssertUnwindSafe(handler)
        .catch_unwind()
        .await
        .unwrap_or_else(|panic| {
            let message = panic_message(&*panic);
            event!(Level::ERROR, "handler for {} panicked: {}", name, message);
            Err(GatewayError::Unhandled(message))
        })
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        String::from("handler panicked")
    }
}
