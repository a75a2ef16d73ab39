pub mod config;
pub mod error;
pub mod record;
pub mod symbol;

pub use config::Config;
pub use error::*;
pub use record::PriceRecord;
pub use symbol::SymbolSpec;
