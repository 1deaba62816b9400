use super::{add_to, write_overflow, Balances, Overflow};
use crate::options::{AccountClass, DateRange, NetWorthOptions};
use crate::{
    Account, Amount, Currency, Date, Decimal, Ledger, NoPriceDataError, PostingRef, PriceIndex,
};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// The converted balance of one account in one commodity.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetWorthLine {
    pub account: Account,
    pub class: AccountClass,
    /// The balance in its own commodity.
    pub balance: Amount,
    /// The balance in the reporting currency.
    pub value: Decimal,
}

/// Why a balance could not be valued.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionError {
    NoPriceData(NoPriceDataError),
    /// The value, or a total including it, does not fit in a [`Decimal`].
    Overflow,
}

impl fmt::Display for ConversionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConversionError::NoPriceData(e) => write!(f, "{}", e),
            ConversionError::Overflow => write!(f, "value out of range"),
        }
    }
}

impl std::error::Error for ConversionError {}

impl From<NoPriceDataError> for ConversionError {
    fn from(e: NoPriceDataError) -> Self {
        ConversionError::NoPriceData(e)
    }
}

/// A balance left out of the totals because it could not be converted.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unconverted {
    pub account: Account,
    pub amount: Amount,
    pub error: ConversionError,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetWorthReport {
    pub as_of: Date,
    pub currency: Currency,
    pub lines: Vec<NetWorthLine>,
    /// Sum of the converted asset balances.
    pub assets: Decimal,
    /// Amount owed: the negated sum of the converted liability balances.
    pub liabilities: Decimal,
    /// `assets - liabilities`.
    pub net_worth: Decimal,
    /// `true` if any balance or posting is missing from the totals.
    pub partial: bool,
    pub unconverted: Vec<Unconverted>,
    /// Postings left out because an account balance would go out of range.
    pub overflow: Vec<Overflow>,
}

impl fmt::Display for NetWorthReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Net worth as of {} in {}", self.as_of, self.currency)?;
        for line in self.lines.iter() {
            writeln!(
                f,
                "{:>20}  {} ({})",
                format!("{} {}", line.value, self.currency),
                line.account,
                line.balance
            )?;
        }
        writeln!(f, "{}", "-".repeat(20))?;
        writeln!(f, "{:>20}  Assets", self.assets)?;
        writeln!(f, "{:>20}  Liabilities", self.liabilities)?;
        writeln!(f, "{:>20}  Net worth", self.net_worth)?;
        if !self.unconverted.is_empty() {
            writeln!(f, "Not converted:")?;
            for item in self.unconverted.iter() {
                writeln!(
                    f,
                    "{:>20}  {}: {}",
                    item.amount.to_string(),
                    item.account,
                    item.error
                )?;
            }
        }
        write_overflow(f, &self.overflow)
    }
}

/// Values the asset and liability accounts of `ledger` on `options.as_of` in
/// `options.currency`.
///
/// A balance in another commodity is converted with the latest price on or
/// before `as_of` from `prices`. Balances without such a price, or whose value
/// is out of range, are listed in [`NetWorthReport::unconverted`] instead of
/// being counted.
pub fn net_worth(
    ledger: &Ledger,
    prices: &PriceIndex,
    options: &NetWorthOptions,
) -> NetWorthReport {
    let NetWorthOptions {
        as_of,
        currency,
        classes,
    } = options;
    let mut balances: BTreeMap<(&Account, AccountClass), Balances> = BTreeMap::new();
    let mut overflow = Vec::new();
    let range = DateRange::until(*as_of);
    for txn in ledger.txns().iter().take_while(|txn| range.contains(txn.date())) {
        for posting in txn.postings().iter() {
            if let Some(class) = classes.classify(&posting.account) {
                let account_balance = balances.entry((&posting.account, class)).or_default();
                if !add_to(account_balance, &posting.amount) {
                    log::warn!("{}: balance of {} out of range", posting.src, posting.account);
                    overflow.push(Overflow::from(&PostingRef { txn, posting }));
                }
            }
        }
    }

    let mut totals = Totals::default();
    let mut lines = Vec::new();
    let mut unconverted = Vec::new();
    for ((account, class), account_balance) in balances {
        for (commodity, number) in account_balance {
            if number.is_zero() {
                continue;
            }
            let balance = Amount::new(number, commodity);
            let value = if &balance.currency == currency {
                Ok(number)
            } else {
                prices
                    .price_as_of(&balance.currency, currency, *as_of)
                    .map_err(ConversionError::from)
                    .and_then(|entry| {
                        balance
                            .convert(&entry.price)
                            .map(|value| value.number)
                            .ok_or(ConversionError::Overflow)
                    })
            };
            let value = value.and_then(|value| {
                totals.add(class, value).ok_or(ConversionError::Overflow)?;
                Ok(value)
            });
            match value {
                Ok(value) => lines.push(NetWorthLine {
                    account: account.clone(),
                    class,
                    balance,
                    value,
                }),
                Err(error) => {
                    log::debug!("{}: {}", account, error);
                    unconverted.push(Unconverted {
                        account: account.clone(),
                        amount: balance,
                        error,
                    })
                }
            }
        }
    }

    NetWorthReport {
        as_of: *as_of,
        currency: currency.clone(),
        assets: totals.assets,
        liabilities: totals.liabilities,
        net_worth: totals.net_worth,
        partial: !unconverted.is_empty() || !overflow.is_empty(),
        lines,
        unconverted,
        overflow,
    }
}

/// Running totals of the converted balances.
#[derive(Debug, Default)]
struct Totals {
    assets: Decimal,
    liabilities: Decimal,
    net_worth: Decimal,
}

impl Totals {
    /// Counts `value` in `class`, leaving `self` unchanged if any total would
    /// go out of range.
    fn add(&mut self, class: AccountClass, value: Decimal) -> Option<()> {
        let (assets, liabilities) = match class {
            AccountClass::Asset => (self.assets.checked_add(value)?, self.liabilities),
            AccountClass::Liability => (self.assets, self.liabilities.checked_sub(value)?),
        };
        let net_worth = assets.checked_sub(liabilities)?;
        *self = Totals {
            assets,
            liabilities,
            net_worth,
        };
        Some(())
    }
}
