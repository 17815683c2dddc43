pub mod chain;

pub mod config;

pub mod errors;

pub mod ledger;

pub mod local;

pub mod orchestrator;

pub mod preflight;

pub mod quote;

pub mod reads;

pub mod test_helpers;

pub mod types;

pub mod units;

pub mod wallet;

pub use errors::FlipError;

pub type Result<T, E = FlipError> = std::result::Result<T, E>;
