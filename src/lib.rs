//! # tally
//!
//! tally is a plain-text double-entry ledger: a library for parsing ledger
//! files and commodity-price databases, and for answering balance, register
//! and net-worth queries over the resulting snapshot.
//!
//! ```
//! use tally::options::{AccountFilter, BalanceOptions};
//! use tally::{report, Ledger};
//!
//! let text = "2024-01-05 * Grocery\n    Expenses:Food  50.00 USD\n    Assets:Checking\n";
//! let (ledger, errors) = Ledger::parse(text, "main.ledger".to_string().into());
//! assert!(errors.is_empty());
//!
//! let options = BalanceOptions {
//!     filter: AccountFilter::prefix("Expenses"),
//!     ..Default::default()
//! };
//! let balances = report::balance(&ledger, &options);
//! assert_eq!(balances.total["USD"].to_string(), "50.00");
//! ```

mod checker;
mod ledger;
pub mod options;
pub mod parse;
mod price;
pub mod report;
pub mod utils;

pub use checker::{balance_txn, BalanceError, BalanceErrorKind};
pub use ledger::*;
pub use price::{NoPriceDataError, PriceEntry, PriceIndex};
