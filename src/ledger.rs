use crate::options::{AccountFilter, DateRange};
use crate::parse::Parser;
use crate::price::PriceEntry;
pub use chrono::NaiveDate as Date;
use getset::{CopyGetters, Getters};
pub use rust_decimal::Decimal;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::ops::Neg;
use std::sync::Arc;

/// Representing a location, line number and column number, in a source file.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Location {
    pub line: usize,
    pub col: usize,
}

impl From<(usize, usize)> for Location {
    fn from(tuple: (usize, usize)) -> Self {
        Location {
            line: tuple.0,
            col: tuple.1,
        }
    }
}

/// A string wrapped in [`Arc`](std::sync::Arc)
/// representing the source file path.
pub type SrcFile = Arc<String>;

/// Represents a range in a source file. This struct is used to track the origins
/// of any information in the generated [`Ledger`], as well as for locating errors.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Source {
    pub file: SrcFile,
    pub start: Location,
    pub end: Location,
}

impl Source {
    pub(crate) fn file_start(file: SrcFile) -> Self {
        Source {
            file,
            start: (1, 1).into(),
            end: (1, 1).into(),
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.start.line, self.start.col)
    }
}

/// Kinds of errors that `tally` encountered while loading a ledger or a price
/// database.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorType {
    /// IO error, e.g., the content of an input file cannot be read.
    Io,
    /// A malformed token: a bad number, an unterminated string, a stray
    /// character.
    Lex,
    /// A grammar violation in the source file.
    Syntax,
    /// A transaction that does not balance, or whose elided amount cannot be
    /// inferred.
    NotBalanced,
    /// Duplicate information, such as two prices of one pair on the same date.
    Duplicate,
}

/// The level of an error. Any entry in the source file resulting in an
/// [`ErrorLevel::Error`] is dropped.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorLevel {
    Info,
    Warning,
    Error,
}

/// Contains the full information of an error.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Error {
    pub msg: String,
    pub src: Source,
    pub r#type: ErrorType,
    pub level: ErrorLevel,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?}: {}\n  {}:{}:{}",
            self.level, self.msg, self.src.file, self.src.start.line, self.src.start.col
        )
    }
}

impl std::error::Error for Error {}

pub type Currency = String;

/// A [`Decimal`] number plus the currency.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Amount {
    pub number: Decimal,
    pub currency: Currency,
}

impl Amount {
    pub fn new(number: Decimal, currency: impl Into<Currency>) -> Self {
        Amount {
            number,
            currency: currency.into(),
        }
    }

    /// Converts `self` at `rate`, a price of one unit of `self.currency`.
    /// Returns `None` if the product does not fit in a [`Decimal`].
    pub fn convert(&self, rate: &Amount) -> Option<Amount> {
        let number = self.number.checked_mul(rate.number)?;
        Some(Amount::new(number, rate.currency.clone()))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.number, self.currency)
    }
}

impl Neg for Amount {
    type Output = Amount;

    fn neg(self) -> Self::Output {
        Amount {
            number: -self.number,
            currency: self.currency,
        }
    }
}


/// The status marker of a [`Transaction`].
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum TxnStatus {
    /// No marker.
    #[default]
    Unmarked,
    /// transactions marked by `!`.
    Pending,
    /// transactions marked by `*`.
    Cleared,
}

impl fmt::Display for TxnStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TxnStatus::Unmarked => Ok(()),
            TxnStatus::Pending => write!(f, "!"),
            TxnStatus::Cleared => write!(f, "*"),
        }
    }
}

/// A string wrapped in [`Arc`](std::sync::Arc)
/// representing the account name, e.g. `Expenses:Food:Groceries`.
pub type Account = Arc<String>;

/// A posting like `Assets:Bank -100 JPY` inside a [`Transaction`].
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Posting {
    pub account: Account,
    pub amount: Amount,
    /// `true` if the amount was elided in the source and inferred by balancing.
    pub inferred: bool,
    pub comment: Option<String>,
    pub src: Source,
}

impl fmt::Display for Posting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let num_str = self.amount.to_string();
        let width = f.width().unwrap_or(46);
        let account_width = std::cmp::max(
            self.account.len() + 2,
            width.saturating_sub(num_str.len()),
        );
        write!(
            f,
            "{:width$}{}",
            self.account,
            num_str,
            width = account_width
        )?;
        if let Some(comment) = &self.comment {
            write!(f, " ;{}", comment)?;
        }
        Ok(())
    }
}

/// A validated transaction: every commodity among its postings sums to zero.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Getters, CopyGetters)]
pub struct Transaction {
    /// Returns the transaction date.
    #[getset(get_copy = "pub")]
    pub(crate) date: Date,

    /// Returns the auxiliary date written after `=`.
    #[getset(get_copy = "pub")]
    pub(crate) aux_date: Option<Date>,

    /// Returns the status marker.
    #[getset(get_copy = "pub")]
    pub(crate) status: TxnStatus,

    /// Returns the code written in parentheses.
    #[getset(get = "pub")]
    pub(crate) code: Option<String>,

    /// Returns the description.
    #[getset(get = "pub")]
    pub(crate) description: String,

    /// Returns the comment trailing the header line.
    #[getset(get = "pub")]
    pub(crate) comment: Option<String>,

    /// Returns the postings of this transaction.
    #[getset(get = "pub")]
    pub(crate) postings: Vec<Posting>,

    /// Returns the source of this transaction.
    #[getset(get = "pub")]
    pub(crate) src: Source,
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.date)?;
        if let Some(aux_date) = self.aux_date {
            write!(f, "={}", aux_date)?;
        }
        if self.status != TxnStatus::Unmarked {
            write!(f, " {}", self.status)?;
        }
        if let Some(code) = &self.code {
            write!(f, " ({})", code)?;
        }
        write!(f, " {}", self.description)?;
        if let Some(comment) = &self.comment {
            write!(f, " ;{}", comment)?;
        }
        let width = f.width().unwrap_or(50);
        for posting in self.postings.iter() {
            write!(f, "\n    {:width$}", posting, width = width.saturating_sub(4))?;
        }
        Ok(())
    }
}

/// A posting together with the transaction that owns it, as returned by the
/// queries of [`Ledger`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostingRef<'l> {
    pub txn: &'l Transaction,
    pub posting: &'l Posting,
}

/// Represents a valid ledger containing balanced transactions only.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Default, Getters)]
pub struct Ledger {
    /// Returns transactions sorted by date. Transactions of the same date keep
    /// their order in the source file.
    #[getset(get = "pub")]
    pub(crate) txns: Vec<Transaction>,
    /// Returns the accounts referred to by any transaction.
    #[getset(get = "pub")]
    pub(crate) accounts: BTreeSet<Account>,
    /// Returns the `P` directives written in the ledger file.
    #[getset(get = "pub")]
    pub(crate) prices: Vec<PriceEntry>,
}

impl Ledger {
    /// Reads and parses the ledger file at `path`.
    pub fn from_file(path: &str) -> (Self, Vec<Error>) {
        let (draft, mut errors) = Parser::parse(path);
        let (ledger, check_errors) = draft.into_ledger();
        errors.extend(check_errors);
        (ledger, errors)
    }

    /// Parses ledger text; `file` is used in diagnostics only.
    pub fn parse(src: &str, file: SrcFile) -> (Self, Vec<Error>) {
        let (draft, mut errors) = Parser::parse_str(src, file);
        let (ledger, check_errors) = draft.into_ledger();
        errors.extend(check_errors);
        (ledger, errors)
    }

    pub fn all_accounts(&self) -> &BTreeSet<Account> {
        &self.accounts
    }

    /// Returns the postings to `prefix` or any of its sub-accounts within
    /// `range`, in chronological order.
    pub fn postings_for_account(&self, prefix: &str, range: &DateRange) -> Vec<PostingRef<'_>> {
        self.postings_matching(&AccountFilter::prefix(prefix), range)
    }

    /// Returns the postings whose account matches `filter` within `range`,
    /// in chronological order.
    pub fn postings_matching(
        &self,
        filter: &AccountFilter,
        range: &DateRange,
    ) -> Vec<PostingRef<'_>> {
        let first = match range.begin {
            Some(begin) => self.txns.partition_point(|txn| txn.date < begin),
            None => 0,
        };
        self.txns[first..]
            .iter()
            .take_while(|txn| range.end.map_or(true, |end| txn.date <= end))
            .flat_map(|txn| {
                txn.postings
                    .iter()
                    .filter(|posting| filter.matches(&posting.account))
                    .map(move |posting| PostingRef { txn, posting })
            })
            .collect()
    }
}
