use super::{add_to, write_overflow, Balances, Overflow};
use crate::options::RegisterOptions;
use crate::{Account, Amount, Date, Ledger, Source, TxnStatus};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::fmt;

/// One posting of a [`RegisterReport`] and the running balance after it.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterRow {
    pub date: Date,
    pub status: TxnStatus,
    pub description: String,
    pub account: Account,
    pub amount: Amount,
    pub inferred: bool,
    pub balance: Balances,
    pub src: Source,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RegisterReport {
    pub rows: Vec<RegisterRow>,
    /// Postings left out because the running balance would go out of range.
    pub overflow: Vec<Overflow>,
}

impl fmt::Display for RegisterReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.rows.iter() {
            let balance = row
                .balance
                .iter()
                .map(|(currency, number)| format!("{} {}", number, currency))
                .collect::<Vec<_>>()
                .join(", ");
            writeln!(
                f,
                "{} {:<24.24} {:<28} {:>16} {:>16}",
                row.date,
                row.description,
                row.account,
                row.amount.to_string(),
                balance
            )?;
        }
        write_overflow(f, &self.overflow)
    }
}

/// Lists the postings selected by `options` in chronological order, each
/// with the running balance of the listed postings.
pub fn register(ledger: &Ledger, options: &RegisterOptions) -> RegisterReport {
    let mut running_balance = Balances::new();
    let mut rows = Vec::new();
    let mut overflow = Vec::new();
    for p in ledger.postings_matching(&options.filter, &options.range) {
        if !add_to(&mut running_balance, &p.posting.amount) {
            log::warn!("{}: running balance out of range", p.posting.src);
            overflow.push(Overflow::from(&p));
            continue;
        }
        rows.push(RegisterRow {
            date: p.txn.date(),
            status: p.txn.status(),
            description: p.txn.description().clone(),
            account: p.posting.account.clone(),
            amount: p.posting.amount.clone(),
            inferred: p.posting.inferred,
            balance: running_balance.clone(),
            src: p.posting.src.clone(),
        });
    }
    log::debug!("register report: {} rows", rows.len());
    RegisterReport { rows, overflow }
}
