use crate::error::GatewayFault;
use crate::gateway::{
    Addresses, BlockchainGateway, GatewayResult, HistoryEntry, TxHistory, UtxoRef,
};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Mutex;

/// Builds a history with one entry per height, hashes numbered in order.
pub fn make_mock_history(heights: &[i64]) -> TxHistory {
    TxHistory {
        success: true,
        transactions: heights
            .iter()
            .enumerate()
            .map(|(idx, height)| HistoryEntry::new(*height, &format!("{:064x}", idx)))
            .collect(),
    }
}

/// A [`BlockchainGateway`] answering from scripted results.
///
/// Every call is recorded as `"<operation>:<argument>"` so tests can assert
/// both how often and in which order the gateway was reached. `utxos` and
/// `transaction` echo their argument back inside the scripted object.
#[derive(Debug)]
pub struct MockGateway {
    pub transactions: GatewayResult<TxHistory>,
    pub balance: GatewayResult<Value>,
    pub utxos: GatewayResult<Value>,
    pub utxo_is_valid: GatewayResult<bool>,
    pub transaction: GatewayResult<Value>,
    pub send_raw_transaction: GatewayResult<String>,
    pub pub_key: GatewayResult<Value>,
    pub token_data: GatewayResult<Value>,
    pub token_data2: GatewayResult<Value>,
    /// `transaction` fails for this txid only.
    pub failing_txid: Option<String>,
    pub panic_on_balance: bool,
    calls: Mutex<Vec<String>>,
}

impl Default for MockGateway {
    fn default() -> Self {
        MockGateway {
            transactions: Ok(make_mock_history(&[603416, 646894, 0])),
            balance: Ok(json!({
                "success": true,
                "balance": { "confirmed": 1000, "unconfirmed": 0 },
            })),
            utxos: Ok(json!({
                "bchUtxos": [],
                "nullUtxos": [],
                "slpUtxos": { "type1": { "tokens": [], "mintBatons": [] }, "nft": {} },
            })),
            utxo_is_valid: Ok(true),
            transaction: Ok(json!({ "blockheight": 646894, "confirmations": 12 })),
            send_raw_transaction: Ok(String::from(
                "a5f972572ee1753e2fd2457dd61ce5f40fa2f8a30173d417e49feef7542c96a1",
            )),
            pub_key: Ok(json!({
                "success": true,
                "publicKey": "033f267fec0f7eb2b27f8c2d7052f1d5ef9a0f7f51e5e2f3f9ab5a4e8f2b7e6d4c",
            })),
            token_data: Ok(json!({ "genesisData": { "ticker": "PSF", "decimals": 8 } })),
            token_data2: Ok(json!({ "tokenStats": { "ticker": "PSF" } })),
            failing_txid: None,
            panic_on_balance: false,
            calls: Mutex::new(vec![]),
        }
    }
}

impl MockGateway {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.calls().len()
    }

    fn record(&self, operation: &str, argument: &str) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(format!("{}:{}", operation, argument));
        }
    }
}

fn with_field(result: &GatewayResult<Value>, field: &str, value: &str) -> GatewayResult<Value> {
    result.clone().map(|mut body| {
        if let Value::Object(map) = &mut body {
            map.insert(field.to_string(), Value::String(value.to_string()));
        }
        body
    })
}

#[async_trait]
impl BlockchainGateway for MockGateway {
    async fn transactions(&self, address: &str) -> GatewayResult<TxHistory> {
        self.record("transactions", address);
        self.transactions.clone()
    }

    async fn balance(&self, addresses: &Addresses) -> GatewayResult<Value> {
        let argument = match addresses {
            Addresses::One(address) => address.clone(),
            Addresses::Many(addresses) => addresses.join(","),
        };
        self.record("balance", &argument);
        if self.panic_on_balance {
            panic!("balance lookup for {} blew up", argument);
        }
        self.balance.clone()
    }

    async fn utxos(&self, address: &str) -> GatewayResult<Value> {
        self.record("utxos", address);
        with_field(&self.utxos, "address", address)
    }

    async fn utxo_is_valid(&self, utxo: &UtxoRef) -> GatewayResult<bool> {
        self.record("utxoIsValid", &format!("{}:{}", utxo.txid, utxo.vout));
        self.utxo_is_valid.clone()
    }

    async fn transaction(&self, txid: &str) -> GatewayResult<Value> {
        self.record("transaction", txid);
        if self.failing_txid.as_deref() == Some(txid) {
            return Err(GatewayFault::exception(
                "No such mempool or blockchain transaction",
            ));
        }
        with_field(&self.transaction, "txid", txid)
    }

    async fn send_raw_transaction(&self, hex: &str) -> GatewayResult<String> {
        self.record("broadcast", hex);
        self.send_raw_transaction.clone()
    }

    async fn get_pub_key(&self, address: &str) -> GatewayResult<Value> {
        self.record("pubkey", address);
        self.pub_key.clone()
    }

    async fn token_data(&self, token_id: &str, with_tx_history: bool) -> GatewayResult<Value> {
        self.record("getTokenData", &format!("{}:{}", token_id, with_tx_history));
        self.token_data.clone()
    }

    async fn token_data2(&self, token_id: &str, update_cache: bool) -> GatewayResult<Value> {
        self.record("getTokenData2", &format!("{}:{}", token_id, update_cache));
        self.token_data2.clone()
    }
}
