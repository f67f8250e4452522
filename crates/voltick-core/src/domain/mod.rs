mod expiry;
mod models;
mod symbol;
mod timestamp;

pub use expiry::ExpiryDate;
pub use models::{
    ContractQuote, MarketQuote, OptionChain, OptionContract, OptionType, VolEstimate,
};
pub use symbol::Symbol;
pub use timestamp::UtcDateTime;
