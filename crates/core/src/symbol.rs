use serde::{Deserialize, Serialize};

/// One ingestion target: which ticker to fetch and which table receives it.
///
/// The market is carried through for logging and destination selection only;
/// it is not validated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolSpec {
    pub symbol: String,
    pub market: String,
    pub destination: String,
}

impl SymbolSpec {
    pub fn new(
        symbol: impl Into<String>,
        market: impl Into<String>,
        destination: impl Into<String>,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            market: market.into(),
            destination: destination.into(),
        }
    }

    /// The compiled-in symbol set ingested by the HTTP trigger and the CLI.
    pub fn defaults() -> Vec<SymbolSpec> {
        vec![
            SymbolSpec::new("AAPL", "NASDAQ", "nasdaq_historical_prices"),
            SymbolSpec::new("MSFT", "NASDAQ", "nasdaq_historical_prices"),
            SymbolSpec::new("IBM", "NYSE", "nyse_historical_prices"),
            SymbolSpec::new("TSCO.L", "LSE", "lse_historical_prices"),
        ]
    }
}
