//! Options of the reports in [`report`](crate::report).
//!
//! Every option struct implements [`Default`]. With the `serde` feature they
//! also deserialize with missing fields taking their default values.

use crate::utils::{is_sub_account, root_account};
use crate::{Currency, Date};
use regex::Regex;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// An inclusive range of dates. A missing bound is open.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateRange {
    pub begin: Option<Date>,
    pub end: Option<Date>,
}

impl DateRange {
    pub fn new(begin: Option<Date>, end: Option<Date>) -> Self {
        DateRange { begin, end }
    }

    /// Everything up to and including `end`.
    pub fn until(end: Date) -> Self {
        DateRange {
            begin: None,
            end: Some(end),
        }
    }

    pub fn contains(&self, date: Date) -> bool {
        self.begin.map_or(true, |begin| begin <= date) && self.end.map_or(true, |end| date <= end)
    }
}

/// Selects accounts for a report.
///
/// Written as a string, `""` selects every account, `/re/` selects accounts
/// matching the regular expression `re`, and anything else selects an account
/// together with its sub-accounts.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "String", into = "String"))]
#[derive(Debug, Clone, Default)]
pub enum AccountFilter {
    #[default]
    All,
    Prefix(String),
    Pattern(Regex),
}

impl AccountFilter {
    pub fn prefix(account: impl Into<String>) -> Self {
        AccountFilter::Prefix(account.into())
    }

    pub fn pattern(re: &str) -> Result<Self, regex::Error> {
        Ok(AccountFilter::Pattern(Regex::new(re)?))
    }

    pub fn matches(&self, account: &str) -> bool {
        match self {
            AccountFilter::All => true,
            AccountFilter::Prefix(prefix) => is_sub_account(account, prefix),
            AccountFilter::Pattern(re) => re.is_match(account),
        }
    }
}

impl PartialEq for AccountFilter {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (AccountFilter::All, AccountFilter::All) => true,
            (AccountFilter::Prefix(a), AccountFilter::Prefix(b)) => a == b,
            (AccountFilter::Pattern(a), AccountFilter::Pattern(b)) => a.as_str() == b.as_str(),
            _ => false,
        }
    }
}

impl fmt::Display for AccountFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountFilter::All => Ok(()),
            AccountFilter::Prefix(prefix) => write!(f, "{}", prefix),
            AccountFilter::Pattern(re) => write!(f, "/{}/", re),
        }
    }
}

impl FromStr for AccountFilter {
    type Err = regex::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            Ok(AccountFilter::All)
        } else if let Some(re) = s
            .strip_prefix('/')
            .and_then(|rest| rest.strip_suffix('/'))
        {
            AccountFilter::pattern(re)
        } else {
            Ok(AccountFilter::prefix(s))
        }
    }
}

impl TryFrom<String> for AccountFilter {
    type Error = regex::Error;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<AccountFilter> for String {
    fn from(filter: AccountFilter) -> Self {
        filter.to_string()
    }
}

/// Options of [`report::balance`](crate::report::balance).
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BalanceOptions {
    pub filter: AccountFilter,
    pub range: DateRange,
    /// Keep accounts and commodities whose balance is zero.
    pub show_zero: bool,
    /// Hide accounts with more than this many segments. Their amounts are
    /// still included in their ancestors.
    pub depth: Option<usize>,
}

/// Options of [`report::register`](crate::report::register).
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RegisterOptions {
    pub filter: AccountFilter,
    pub range: DateRange,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AccountClass {
    Asset,
    Liability,
}

/// Top-level account names counted as assets and liabilities.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountClasses {
    pub assets: Vec<String>,
    pub liabilities: Vec<String>,
}

impl Default for AccountClasses {
    fn default() -> Self {
        AccountClasses {
            assets: vec!["Assets".to_string()],
            liabilities: vec!["Liabilities".to_string()],
        }
    }
}

impl AccountClasses {
    pub fn classify(&self, account: &str) -> Option<AccountClass> {
        let root = root_account(account);
        if self.assets.iter().any(|name| name == root) {
            Some(AccountClass::Asset)
        } else if self.liabilities.iter().any(|name| name == root) {
            Some(AccountClass::Liability)
        } else {
            None
        }
    }
}

/// Options of [`report::net_worth`](crate::report::net_worth).
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetWorthOptions {
    pub as_of: Date,
    pub currency: Currency,
    #[cfg_attr(feature = "serde", serde(default))]
    pub classes: AccountClasses,
}

impl NetWorthOptions {
    pub fn new(as_of: Date, currency: impl Into<Currency>) -> Self {
        NetWorthOptions {
            as_of,
            currency: currency.into(),
            classes: AccountClasses::default(),
        }
    }
}
