use crate::error::GatewayError;
use std::fmt;
use std::str::FromStr;

/// Every operation reachable over either transport. Names that are not
/// listed here never reach a handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    TxHistory,
    Balance,
    Utxos,
    UtxosBulk,
    Broadcast,
    TxData,
    PubKey,
    UtxoIsValid,
    GetTokenData,
    GetTokenData2,
}

impl Endpoint {
    pub const ALL: [Endpoint; 10] = [
        Endpoint::TxHistory,
        Endpoint::Balance,
        Endpoint::Utxos,
        Endpoint::UtxosBulk,
        Endpoint::Broadcast,
        Endpoint::TxData,
        Endpoint::PubKey,
        Endpoint::UtxoIsValid,
        Endpoint::GetTokenData,
        Endpoint::GetTokenData2,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Endpoint::TxHistory => "txHistory",
            Endpoint::Balance => "balance",
            Endpoint::Utxos => "utxos",
            Endpoint::UtxosBulk => "utxosBulk",
            Endpoint::Broadcast => "broadcast",
            Endpoint::TxData => "txData",
            Endpoint::PubKey => "pubkey",
            Endpoint::UtxoIsValid => "utxoIsValid",
            Endpoint::GetTokenData => "getTokenData",
            Endpoint::GetTokenData2 => "getTokenData2",
        }
    }
}

impl FromStr for Endpoint {
    type Err = GatewayError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "transactions" | "txHistory" => Ok(Endpoint::TxHistory),
            "balance" => Ok(Endpoint::Balance),
            "utxos" => Ok(Endpoint::Utxos),
            "utxosBulk" => Ok(Endpoint::UtxosBulk),
            "broadcast" => Ok(Endpoint::Broadcast),
            "transaction" | "txData" => Ok(Endpoint::TxData),
            "pubkey" => Ok(Endpoint::PubKey),
            "utxoIsValid" => Ok(Endpoint::UtxoIsValid),
            "getTokenData" => Ok(Endpoint::GetTokenData),
            "getTokenData2" => Ok(Endpoint::GetTokenData2),
            _ => Err(GatewayError::UnknownEndpoint(name.to_string())),
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
