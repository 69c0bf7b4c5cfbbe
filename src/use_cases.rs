//! Multi-step read flows on top of the gateway: sorted and paginated address
//! history, and the bulk lookups that fan out into one gateway call per item.

use crate::error::GatewayError;
use crate::gateway::{BlockchainGateway, HistoryEntry};
use crate::validators::{AddressesParam, BulkParamLimiter, TxidsParam};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{event, Level};

pub const PAGE_SIZE: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl Default for SortOrder {
    fn default() -> Self {
        SortOrder::Descending
    }
}

impl FromStr for SortOrder {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "ASCENDING" => Ok(SortOrder::Ascending),
            "DESCENDING" => Ok(SortOrder::Descending),
            _ => Err(GatewayError::validation(
                "sortOrder must be ASCENDING or DESCENDING",
            )),
        }
    }
}

/// Sorts by block height, unconfirmed entries counting as newer than every
/// mined one. The sort is stable, entries at equal height keep the order the
/// indexer reported them in.
pub fn sort_all_txs(mut txs: Vec<HistoryEntry>, sort_order: SortOrder) -> Vec<HistoryEntry> {
    match sort_order {
        SortOrder::Ascending => txs.sort_by_key(sort_key),
        SortOrder::Descending => txs.sort_by(|a, b| sort_key(b).cmp(&sort_key(a))),
    }
    txs
}

fn sort_key(tx: &HistoryEntry) -> i64 {
    if tx.is_unconfirmed() {
        i64::MAX
    } else {
        tx.height
    }
}

pub fn chunk100<T: Clone>(items: &[T]) -> Vec<Vec<T>> {
    items.chunks(PAGE_SIZE).map(|chunk| chunk.to_vec()).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionsPage {
    pub address: String,
    pub txs: Vec<HistoryEntry>,
    pub status: u16,
    pub success: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxDataResult {
    pub status: u16,
    pub tx_data: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddressUtxos {
    pub address: String,
    pub utxos: Value,
}

/// Unsorted history of one address, as served by the `fulcrum` service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddressHistory {
    pub address: String,
    pub transactions: Vec<HistoryEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoriesResult {
    pub success: bool,
    pub status: u16,
    pub transactions: Vec<AddressHistory>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UtxosBulkResult {
    pub success: bool,
    pub status: u16,
    pub data: Vec<AddressUtxos>,
}

pub struct BchUseCases {
    gateway: Arc<dyn BlockchainGateway>,
}

impl BchUseCases {
    pub fn new(gateway: Arc<dyn BlockchainGateway>) -> Self {
        BchUseCases { gateway }
    }

    pub fn gateway(&self) -> &Arc<dyn BlockchainGateway> {
        &self.gateway
    }

    /// Full history of `address`, sorted, cut into pages of [`PAGE_SIZE`].
    /// A page past the end is empty.
    pub async fn get_transactions(
        &self,
        address: &str,
        sort_order: SortOrder,
        page: usize,
    ) -> Result<TransactionsPage, GatewayError> {
        let history = self.gateway.transactions(address).await?;
        if !history.success {
            event!(Level::WARN, "indexer failed history lookup for {}", address);
            return Err(GatewayError::IndexerUnavailable);
        }

        let sorted = sort_all_txs(history.transactions, sort_order);
        let txs = chunk100(&sorted).into_iter().nth(page).unwrap_or_default();

        Ok(TransactionsPage {
            address: address.to_string(),
            txs,
            status: 200,
            success: true,
        })
    }

    /// Looks up every txid in order, one gateway call at a time. Any failed
    /// lookup fails the whole batch.
    pub async fn get_tx_data(&self, txids: Option<&Value>) -> Result<TxDataResult, GatewayError> {
        let txids = TxidsParam::validate(txids)?;

        let mut tx_data = Vec::with_capacity(txids.len());
        for txid in txids.iter() {
            tx_data.push(self.gateway.transaction(txid).await?);
        }

        Ok(TxDataResult {
            status: 200,
            tx_data,
        })
    }

    pub async fn get_utxos_bulk(
        &self,
        addresses: Option<&Value>,
    ) -> Result<UtxosBulkResult, GatewayError> {
        let addresses = AddressesParam::validate(addresses)?;

        let mut data = Vec::with_capacity(addresses.len());
        for address in addresses {
            let utxos = self.gateway.utxos(&address).await?;
            data.push(AddressUtxos { address, utxos });
        }

        Ok(UtxosBulkResult {
            success: true,
            status: 200,
            data,
        })
    }

    /// Raw history of each address in input order, one lookup at a time.
    pub async fn get_histories(&self, addresses: &[String]) -> Result<HistoriesResult, GatewayError> {
        let mut transactions = Vec::with_capacity(addresses.len());
        for address in addresses {
            let history = self.gateway.transactions(address).await?;
            if !history.success {
                event!(Level::WARN, "indexer failed history lookup for {}", address);
                return Err(GatewayError::IndexerUnavailable);
            }
            transactions.push(AddressHistory {
                address: address.clone(),
                transactions: history.transactions,
            });
        }

        Ok(HistoriesResult {
            success: true,
            status: 200,
            transactions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{GatewayFault, INDEXER_UNAVAILABLE};
    use crate::gateway::TxHistory;
    use crate::test_utilities::mocks::{make_mock_history, MockGateway};
    use serde_json::json;

    fn test_use_cases(gateway: MockGateway) -> (BchUseCases, Arc<MockGateway>) {
        let gateway = Arc::new(gateway);
        (BchUseCases::new(gateway.clone()), gateway)
    }

    #[test]
    fn sort_order_from_str() {
        assert_eq!("ASCENDING".parse::<SortOrder>().unwrap(), SortOrder::Ascending);
        assert_eq!("descending".parse::<SortOrder>().unwrap(), SortOrder::Descending);
        assert!("SIDEWAYS".parse::<SortOrder>().is_err());
        assert_eq!(SortOrder::default(), SortOrder::Descending);
    }

    #[test]
    fn sort_all_txs_is_stable() {
        let txs = vec![
            HistoryEntry::new(5, "a"),
            HistoryEntry::new(7, "b"),
            HistoryEntry::new(5, "c"),
        ];
        let descending = sort_all_txs(txs.clone(), SortOrder::Descending);
        let hashes: Vec<&str> = descending.iter().map(|tx| tx.tx_hash.as_str()).collect();
        assert_eq!(hashes, vec!["b", "a", "c"]);

        let ascending = sort_all_txs(txs, SortOrder::Ascending);
        let hashes: Vec<&str> = ascending.iter().map(|tx| tx.tx_hash.as_str()).collect();
        assert_eq!(hashes, vec!["a", "c", "b"]);
    }

    #[test]
    fn chunk100_test() {
        let items: Vec<u32> = (0..250).collect();
        let chunks = chunk100(&items);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].len(), 100);
        assert_eq!(chunks[2].len(), 50);
        assert_eq!(chunks[2][0], 200);
        assert!(chunk100::<u32>(&[]).is_empty());
    }

    #[tokio::test]
    async fn get_transactions_sorts_descending_by_default() {
        let mut gateway = MockGateway::default();
        gateway.transactions = Ok(make_mock_history(&[10, 500, 3, 77, 500, 0]));
        let (use_cases, _) = test_use_cases(gateway);

        let page = use_cases
            .get_transactions("bitcoincash:qp", SortOrder::default(), 0)
            .await
            .unwrap();
        assert!(page.success);
        assert_eq!(page.status, 200);
        assert_eq!(page.address, "bitcoincash:qp");
        assert_eq!(page.txs.len(), 6);
        for pair in page.txs.windows(2) {
            assert!(sort_key(&pair[0]) >= sort_key(&pair[1]));
        }
    }

    #[tokio::test]
    async fn get_transactions_sorts_ascending() {
        let mut gateway = MockGateway::default();
        gateway.transactions = Ok(make_mock_history(&[10, 500, 3, 77, 500, 0]));
        let (use_cases, _) = test_use_cases(gateway);

        let page = use_cases
            .get_transactions("bitcoincash:qp", SortOrder::Ascending, 0)
            .await
            .unwrap();
        for pair in page.txs.windows(2) {
            assert!(sort_key(&pair[0]) <= sort_key(&pair[1]));
        }
    }

    #[tokio::test]
    async fn unconfirmed_transactions_sort_as_newest() {
        let (use_cases, _) = test_use_cases(MockGateway::default());

        let descending = use_cases
            .get_transactions("bitcoincash:qp", SortOrder::Descending, 0)
            .await
            .unwrap();
        let heights: Vec<i64> = descending.txs.iter().map(|tx| tx.height).collect();
        assert_eq!(heights, vec![0, 646894, 603416]);

        let ascending = use_cases
            .get_transactions("bitcoincash:qp", SortOrder::Ascending, 0)
            .await
            .unwrap();
        let heights: Vec<i64> = ascending.txs.iter().map(|tx| tx.height).collect();
        assert_eq!(heights, vec![603416, 646894, 0]);
    }

    #[test]
    fn unconfirmed_entries_keep_indexer_order() {
        let txs = vec![
            HistoryEntry::new(0, "a"),
            HistoryEntry::new(10, "b"),
            HistoryEntry::new(-1, "c"),
        ];
        let descending = sort_all_txs(txs, SortOrder::Descending);
        let hashes: Vec<&str> = descending.iter().map(|tx| tx.tx_hash.as_str()).collect();
        assert_eq!(hashes, vec!["a", "c", "b"]);
    }

    #[tokio::test]
    async fn get_histories_keeps_input_order() {
        let (use_cases, gateway) = test_use_cases(MockGateway::default());

        let result = use_cases
            .get_histories(&[String::from("addr1"), String::from("addr2")])
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(result.transactions.len(), 2);
        assert_eq!(result.transactions[1].address, "addr2");
        assert_eq!(result.transactions[0].transactions.len(), 3);
        assert_eq!(
            gateway.calls(),
            vec!["transactions:addr1", "transactions:addr2"]
        );
    }

    #[tokio::test]
    async fn get_transactions_paginates() {
        let heights: Vec<i64> = (1..=230).collect();
        let mut gateway = MockGateway::default();
        gateway.transactions = Ok(make_mock_history(&heights));
        let (use_cases, _) = test_use_cases(gateway);

        let first = use_cases
            .get_transactions("bitcoincash:qp", SortOrder::Descending, 0)
            .await
            .unwrap();
        assert_eq!(first.txs.len(), 100);
        assert_eq!(first.txs[0].height, 230);

        let last = use_cases
            .get_transactions("bitcoincash:qp", SortOrder::Descending, 2)
            .await
            .unwrap();
        assert_eq!(last.txs.len(), 30);
        assert_eq!(last.txs[29].height, 1);

        let past_end = use_cases
            .get_transactions("bitcoincash:qp", SortOrder::Descending, 3)
            .await
            .unwrap();
        assert!(past_end.success);
        assert!(past_end.txs.is_empty());
    }

    #[tokio::test]
    async fn get_transactions_reports_indexer_failure() {
        let mut gateway = MockGateway::default();
        gateway.transactions = Ok(TxHistory {
            success: false,
            transactions: make_mock_history(&[1, 2, 3]).transactions,
        });
        let (use_cases, _) = test_use_cases(gateway);

        let err = use_cases
            .get_transactions("bitcoincash:qp", SortOrder::Descending, 0)
            .await
            .unwrap_err();
        assert_eq!(err, GatewayError::IndexerUnavailable);
        assert_eq!(err.to_string(), INDEXER_UNAVAILABLE);
        assert_eq!(err.status(), 422);
    }

    #[tokio::test]
    async fn get_tx_data_rejects_21_txids_without_gateway_calls() {
        let (use_cases, gateway) = test_use_cases(MockGateway::default());
        let txids = Value::Array((0..21).map(|i| json!(format!("txid{}", i))).collect());

        let err = use_cases.get_tx_data(Some(&txids)).await.unwrap_err();
        assert_eq!(err.status(), 422);
        assert_eq!(err.to_string(), "Array input must be 20 elements or less.");
        assert_eq!(gateway.call_count(), 0);

        let err = use_cases.get_tx_data(Some(&json!("txid0"))).await.unwrap_err();
        assert_eq!(err.to_string(), "txids parameter must be an array");
        assert_eq!(gateway.call_count(), 0);
    }

    #[tokio::test]
    async fn get_tx_data_keeps_input_order() {
        let (use_cases, gateway) = test_use_cases(MockGateway::default());
        let txids = json!(["t1", "t2", "t3"]);

        let result = use_cases.get_tx_data(Some(&txids)).await.unwrap();
        assert_eq!(result.status, 200);
        let returned: Vec<&str> = result
            .tx_data
            .iter()
            .map(|tx| tx["txid"].as_str().unwrap())
            .collect();
        assert_eq!(returned, vec!["t1", "t2", "t3"]);
        assert_eq!(
            gateway.calls(),
            vec!["transaction:t1", "transaction:t2", "transaction:t3"]
        );
    }

    #[tokio::test]
    async fn get_tx_data_fails_whole_batch() {
        let mut gateway = MockGateway::default();
        gateway.failing_txid = Some(String::from("t2"));
        let (use_cases, gateway) = test_use_cases(gateway);

        let err = use_cases
            .get_tx_data(Some(&json!(["t1", "t2", "t3"])))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            GatewayError::Gateway(GatewayFault::exception("No such mempool or blockchain transaction"))
        );
        // stops at the first failure
        assert_eq!(gateway.call_count(), 2);
    }

    #[tokio::test]
    async fn get_utxos_bulk_aggregates_sequentially() {
        let (use_cases, gateway) = test_use_cases(MockGateway::default());

        let result = use_cases
            .get_utxos_bulk(Some(&json!(["addr1", "addr2"])))
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(result.status, 200);
        assert_eq!(result.data.len(), 2);
        assert_eq!(result.data[0].address, "addr1");
        assert_eq!(result.data[1].utxos["address"], "addr2");
        assert_eq!(gateway.calls(), vec!["utxos:addr1", "utxos:addr2"]);
    }

    #[tokio::test]
    async fn get_utxos_bulk_validates_first() {
        let (use_cases, gateway) = test_use_cases(MockGateway::default());
        let addresses = Value::Array((0..21).map(|i| json!(format!("addr{}", i))).collect());

        let err = use_cases.get_utxos_bulk(Some(&addresses)).await.unwrap_err();
        assert_eq!(err.to_string(), "addresses parameter must not exceed 20 elements");
        assert_eq!(gateway.call_count(), 0);
    }

    #[test]
    fn tx_data_result_serializes_camel_case() {
        let result = TxDataResult {
            status: 200,
            tx_data: vec![json!({"txid": "a"})],
        };
        let value = serde_json::to_value(result).unwrap();
        assert_eq!(value["txData"][0]["txid"], "a");
    }
}
