/*!
# Blockchain Gateway

The service itself never talks to the Bitcoin Cash network. Every read or
write goes through a [`BlockchainGateway`], an indexer client injected once at
startup and shared read-only by every request.

The trait mirrors the small slice of the indexer API we consume:

```text
Electrumx.transactions      -> transactions()
Electrumx.balance           -> balance()
Utxo.get                    -> utxos()
Utxo.isValid                -> utxo_is_valid()
Transaction.get             -> transaction()
RawTransactions.sendRawTransaction -> send_raw_transaction()
encryption.getPubKey        -> get_pub_key()
PsfSlpIndexer.getTokenData  -> token_data()
PsfSlpIndexer.getTokenData2 -> token_data2()
```

Failures come back as a [`GatewayFault`]; handlers never inspect the shape of
an indexer error themselves.
*/

pub mod rest;

use crate::error::GatewayFault;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub type GatewayResult<T> = std::result::Result<T, GatewayFault>;

/// A single address or a list of them. `balance` accepts both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Addresses {
    One(String),
    Many(Vec<String>),
}

/// One entry of an address' transaction history. Fields beyond height and
/// hash (`fee` on mempool entries, for one) are carried through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub height: i64,
    pub tx_hash: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl HistoryEntry {
    pub fn new(height: i64, tx_hash: &str) -> Self {
        HistoryEntry {
            height,
            tx_hash: tx_hash.to_string(),
            extra: Map::new(),
        }
    }

    /// Heights of zero or below mark unconfirmed entries, which are newer
    /// than anything already mined.
    pub fn is_unconfirmed(&self) -> bool {
        self.height <= 0
    }
}

/// Raw history for an address as reported by the indexer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TxHistory {
    pub success: bool,
    #[serde(default)]
    pub transactions: Vec<HistoryEntry>,
}

/// Outpoint reference. Accepts both `{txid, vout}` and the electrum style
/// `{tx_hash, tx_pos}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UtxoRef {
    #[serde(alias = "tx_hash")]
    pub txid: String,
    #[serde(alias = "tx_pos")]
    pub vout: u32,
}

#[async_trait]
pub trait BlockchainGateway: Send + Sync {
    async fn transactions(&self, address: &str) -> GatewayResult<TxHistory>;

    async fn balance(&self, addresses: &Addresses) -> GatewayResult<Value>;

    async fn utxos(&self, address: &str) -> GatewayResult<Value>;

    async fn utxo_is_valid(&self, utxo: &UtxoRef) -> GatewayResult<bool>;

    async fn transaction(&self, txid: &str) -> GatewayResult<Value>;

    /// Returns the txid of the accepted transaction.
    async fn send_raw_transaction(&self, hex: &str) -> GatewayResult<String>;

    async fn get_pub_key(&self, address: &str) -> GatewayResult<Value>;

    async fn token_data(&self, token_id: &str, with_tx_history: bool) -> GatewayResult<Value>;

    async fn token_data2(&self, token_id: &str, update_cache: bool) -> GatewayResult<Value>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn utxo_ref_accepts_both_shapes() {
        let a: UtxoRef = serde_json::from_value(json!({"txid": "abc", "vout": 1})).unwrap();
        let b: UtxoRef = serde_json::from_value(json!({"tx_hash": "abc", "tx_pos": 1})).unwrap();
        assert_eq!(a, b);
        assert!(serde_json::from_value::<UtxoRef>(json!({"txid": "abc"})).is_err());
    }

    #[test]
    fn addresses_untagged() {
        let one: Addresses = serde_json::from_value(json!("bitcoincash:qp")).unwrap();
        assert_eq!(one, Addresses::One(String::from("bitcoincash:qp")));
        let many: Addresses = serde_json::from_value(json!(["a", "b"])).unwrap();
        assert_eq!(
            many,
            Addresses::Many(vec![String::from("a"), String::from("b")])
        );
        assert!(serde_json::from_value::<Addresses>(json!(42)).is_err());
    }

    #[test]
    fn tx_history_defaults_transactions() {
        let history: TxHistory = serde_json::from_value(json!({"success": false})).unwrap();
        assert!(!history.success);
        assert!(history.transactions.is_empty());
    }

    #[test]
    fn history_entry_keeps_extra_fields() {
        let entry: HistoryEntry =
            serde_json::from_value(json!({"height": -1, "tx_hash": "aa", "fee": 226})).unwrap();
        assert!(entry.is_unconfirmed());
        assert_eq!(entry.extra["fee"], 226);
        assert_eq!(
            serde_json::to_value(&entry).unwrap(),
            json!({"height": -1, "tx_hash": "aa", "fee": 226})
        );
        assert!(!HistoryEntry::new(646894, "bb").is_unconfirmed());
    }
}
