//! Reports computed from a [`Ledger`](crate::Ledger).
//!
//! Every report is a pure function of its inputs: it borrows the ledger,
//! builds its own working state and returns a plain value, so reports can run
//! concurrently over one shared ledger.

mod balance;
mod networth;
mod register;

use crate::{Account, Amount, Currency, Decimal, PostingRef, Source};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub use balance::{balance, BalanceReport, BalanceRow};
pub use networth::{net_worth, ConversionError, NetWorthLine, NetWorthReport, Unconverted};
pub use register::{register, RegisterReport, RegisterRow};

/// Numbers per commodity.
pub type Balances = BTreeMap<Currency, Decimal>;

/// A posting left out of a report because a sum including it would not fit
/// in a [`Decimal`].
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Overflow {
    pub account: Account,
    pub amount: Amount,
    pub src: Source,
}

impl From<&PostingRef<'_>> for Overflow {
    fn from(p: &PostingRef<'_>) -> Self {
        Overflow {
            account: p.posting.account.clone(),
            amount: p.posting.amount.clone(),
            src: p.posting.src.clone(),
        }
    }
}

impl fmt::Display for Overflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:>20}  {}: sum out of range at {}",
            self.amount.to_string(),
            self.account,
            self.src
        )
    }
}

fn checked_sum(balances: &Balances, amount: &Amount) -> Option<Decimal> {
    match balances.get(&amount.currency) {
        Some(sum) => sum.checked_add(amount.number),
        None => Some(amount.number),
    }
}

/// Adds `amount` to `balances`. Returns `false`, leaving `balances` unchanged,
/// if the sum does not fit.
#[must_use]
fn add_to(balances: &mut Balances, amount: &Amount) -> bool {
    match checked_sum(balances, amount) {
        Some(sum) => {
            balances.insert(amount.currency.clone(), sum);
            true
        }
        None => false,
    }
}

fn write_overflow(f: &mut fmt::Formatter<'_>, overflow: &[Overflow]) -> fmt::Result {
    if !overflow.is_empty() {
        writeln!(f, "Not included:")?;
        for item in overflow {
            writeln!(f, "{}", item)?;
        }
    }
    Ok(())
}

fn write_balances(f: &mut fmt::Formatter<'_>, balances: &Balances, label: &str) -> fmt::Result {
    if balances.is_empty() {
        return writeln!(f, "{:>20}  {}", 0, label);
    }
    let last = balances.len() - 1;
    for (i, (currency, number)) in balances.iter().enumerate() {
        let amount = format!("{} {}", number, currency);
        if i == last {
            writeln!(f, "{:>20}  {}", amount, label)?;
        } else {
            writeln!(f, "{:>20}", amount)?;
        }
    }
    Ok(())
}
