use pricevault_core::SymbolSpec;
use pricevault_ingest::Coordinator;

/// Shared across handlers. Immutable after startup; each request builds its
/// own report.
pub struct AppState {
    pub coordinator: Coordinator,
    /// Symbols ingested by `GET /api/fetch_stock_data`.
    pub symbols: Vec<SymbolSpec>,
}

impl AppState {
    pub fn new(coordinator: Coordinator, symbols: Vec<SymbolSpec>) -> Self {
        Self {
            coordinator,
            symbols,
        }
    }
}
