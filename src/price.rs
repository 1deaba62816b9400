//! Historical commodity prices.

use crate::parse::Parser;
use crate::{Amount, Currency, Date, Error, ErrorLevel, ErrorType, Source, SrcFile};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// A `P` directive: one unit of `commodity` was worth `price` on `date`.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceEntry {
    pub date: Date,
    pub commodity: Currency,
    pub price: Amount,
    pub src: Source,
}

impl fmt::Display for PriceEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P {} {} {}", self.date, self.commodity, self.price)
    }
}

/// No price of `source` in `target` is known on or before `date`.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoPriceDataError {
    pub source: Currency,
    pub target: Currency,
    pub date: Date,
}

impl fmt::Display for NoPriceDataError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "No price of {} in {} as of {}.",
            self.source, self.target, self.date
        )
    }
}

impl std::error::Error for NoPriceDataError {}

/// Price series keyed by (commodity, target commodity), each sorted by date
/// with at most one entry per date.
///
/// The index is read-only once built and can be shared between threads.
#[derive(Debug, Clone, Default)]
pub struct PriceIndex {
    series: HashMap<Currency, HashMap<Currency, Vec<PriceEntry>>>,
}

impl PriceIndex {
    /// Reads and parses the price database at `path`.
    pub fn from_file(path: &str) -> (Self, Vec<Error>) {
        let (draft, errors) = Parser::parse(path);
        Self::from_draft_parts(draft.prices, draft.txns.iter().map(|t| &t.src), errors)
    }

    /// Parses price-database text; `file` is used in diagnostics only.
    pub fn parse(src: &str, file: SrcFile) -> (Self, Vec<Error>) {
        let (draft, errors) = Parser::parse_str(src, file);
        Self::from_draft_parts(draft.prices, draft.txns.iter().map(|t| &t.src), errors)
    }

    fn from_draft_parts<'a>(
        prices: Vec<PriceEntry>,
        txn_srcs: impl Iterator<Item = &'a Source>,
        mut errors: Vec<Error>,
    ) -> (Self, Vec<Error>) {
        errors.extend(txn_srcs.map(|src| Error {
            msg: "Transactions are not allowed in a price database.".to_string(),
            src: src.clone(),
            r#type: ErrorType::Syntax,
            level: ErrorLevel::Error,
        }));
        let (index, warnings) = Self::from_entries(prices);
        errors.extend(warnings);
        (index, errors)
    }

    /// Builds an index from parsed entries. When one pair has two entries on
    /// the same date, the later one wins and a warning is returned for the
    /// one it replaced.
    pub fn from_entries(entries: impl IntoIterator<Item = PriceEntry>) -> (Self, Vec<Error>) {
        let mut series: HashMap<Currency, HashMap<Currency, Vec<PriceEntry>>> = HashMap::new();
        for entry in entries {
            series
                .entry(entry.commodity.clone())
                .or_default()
                .entry(entry.price.currency.clone())
                .or_default()
                .push(entry);
        }
        let mut warnings = Vec::new();
        for entries in series.values_mut().flat_map(|targets| targets.values_mut()) {
            entries.sort_by_key(|entry| entry.date);
            let mut deduped: Vec<PriceEntry> = Vec::with_capacity(entries.len());
            for entry in entries.drain(..) {
                match deduped.last_mut() {
                    Some(last) if last.date == entry.date => {
                        log::warn!("{}: {} replaces {}", entry.src, entry, last);
                        warnings.push(Error {
                            msg: format!("Price {} replaced by {}.", last, entry),
                            src: last.src.clone(),
                            r#type: ErrorType::Duplicate,
                            level: ErrorLevel::Warning,
                        });
                        *last = entry;
                    }
                    _ => deduped.push(entry),
                }
            }
            *entries = deduped;
        }
        let index = PriceIndex { series };
        log::debug!(
            "built {} price series holding {} entries",
            index.pairs().len(),
            index.len()
        );
        (index, warnings)
    }

    /// Returns the latest price of `source` in `target` dated on or before
    /// `date`. Only the exact pair is searched.
    pub fn price_as_of(
        &self,
        source: &str,
        target: &str,
        date: Date,
    ) -> Result<&PriceEntry, NoPriceDataError> {
        let entries = self.series(source, target);
        let index = entries.partition_point(|entry| entry.date <= date);
        match index.checked_sub(1) {
            Some(i) => Ok(&entries[i]),
            None => Err(NoPriceDataError {
                source: source.to_string(),
                target: target.to_string(),
                date,
            }),
        }
    }

    /// Returns the prices of `source` in `target`, oldest first.
    pub fn series(&self, source: &str, target: &str) -> &[PriceEntry] {
        self.series
            .get(source)
            .and_then(|targets| targets.get(target))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Returns the known (commodity, target) pairs in order.
    pub fn pairs(&self) -> Vec<(&str, &str)> {
        let mut pairs: Vec<_> = self
            .series
            .iter()
            .flat_map(|(source, targets)| {
                targets
                    .keys()
                    .map(move |target| (source.as_str(), target.as_str()))
            })
            .collect();
        pairs.sort_unstable();
        pairs
    }

    pub fn entries(&self) -> impl Iterator<Item = &PriceEntry> {
        self.series
            .values()
            .flat_map(|targets| targets.values())
            .flatten()
    }

    pub fn len(&self) -> usize {
        self.entries().count()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

impl PriceIndex {
    /// An index over the `P` lines of a ledger file followed by those of a
    /// separate price database; the database wins on duplicate dates.
    pub fn merged(inline: &[PriceEntry], db: PriceIndex) -> (Self, Vec<Error>) {
        let entries = inline
            .iter()
            .cloned()
            .chain(db.series.into_values().flat_map(|t| t.into_values()).flatten());
        Self::from_entries(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Decimal;
    use indoc::indoc;
    use std::sync::Arc;

    fn test_file() -> SrcFile {
        Arc::new("prices.db".to_string())
    }

    fn date(y: i32, m: u32, d: u32) -> Date {
        Date::from_ymd_opt(y, m, d).unwrap()
    }

    fn index(src: &str) -> (PriceIndex, Vec<Error>) {
        PriceIndex::parse(src, test_file())
    }

    const DB: &str = indoc! {"
        ; daily closes
        P 2024-01-02 AAPL 185.64 USD
        P 2024-01-04 AAPL 181.91 USD
        P 2024-01-03 AAPL 184.25 USD

        P 2024-01-03 EUR $1.09
    "};

    #[test]
    fn latest_on_or_before() {
        let (prices, errors) = index(DB);
        assert!(errors.is_empty(), "{:?}", errors);
        let entry = prices.price_as_of("AAPL", "USD", date(2024, 1, 3)).unwrap();
        assert_eq!(entry.price.number, Decimal::new(18425, 2));
        let entry = prices.price_as_of("AAPL", "USD", date(2024, 6, 1)).unwrap();
        assert_eq!(entry.price.number, Decimal::new(18191, 2));
        let entry = prices.price_as_of("EUR", "$", date(2024, 1, 3)).unwrap();
        assert_eq!(entry.price, Amount::new(Decimal::new(109, 2), "$"));
    }

    #[test]
    fn no_price_before_first_entry() {
        let (prices, _) = index(DB);
        let error = prices
            .price_as_of("AAPL", "USD", date(2024, 1, 1))
            .unwrap_err();
        assert_eq!(
            error,
            NoPriceDataError {
                source: "AAPL".to_string(),
                target: "USD".to_string(),
                date: date(2024, 1, 1),
            }
        );
    }

    #[test]
    fn no_reciprocal_rates() {
        let (prices, _) = index(DB);
        assert!(prices.price_as_of("USD", "AAPL", date(2024, 6, 1)).is_err());
        assert!(prices.price_as_of("AAPL", "EUR", date(2024, 6, 1)).is_err());
    }

    #[test]
    fn series_is_sorted() {
        let (prices, _) = index(DB);
        let dates: Vec<_> = prices.series("AAPL", "USD").iter().map(|e| e.date).collect();
        assert_eq!(dates, vec![date(2024, 1, 2), date(2024, 1, 3), date(2024, 1, 4)]);
        assert_eq!(prices.pairs(), vec![("AAPL", "USD"), ("EUR", "$")]);
        assert_eq!(prices.len(), 4);
        assert!(!prices.is_empty());
        assert!(prices.series("BTC", "USD").is_empty());
    }

    #[test]
    fn duplicate_date_last_wins() {
        let (prices, errors) = index(indoc! {"
            P 2024-01-02 AAPL 185.64 USD
            P 2024-01-02 AAPL 190.00 USD
        "});
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].r#type, ErrorType::Duplicate);
        assert_eq!(errors[0].level, ErrorLevel::Warning);
        assert_eq!(errors[0].src.start.line, 1);
        let entry = prices.price_as_of("AAPL", "USD", date(2024, 1, 2)).unwrap();
        assert_eq!(entry.price.number, Decimal::new(19000, 2));
        assert_eq!(prices.len(), 1);
    }

    #[test]
    fn transactions_are_rejected() {
        let (prices, errors) = index(indoc! {"
            P 2024-01-02 AAPL 185.64 USD
            2024-01-05 * Grocery
                Expenses:Food  50.00 USD
                Assets:Checking
            P 2024-01-03 AAPL bad USD
        "});
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().any(|e| e.src.start.line == 2));
        assert!(errors.iter().any(|e| e.src.start.line == 5));
        assert_eq!(prices.len(), 1);
    }

    #[test]
    fn merged_prefers_db() {
        let (inline, _) = index("P 2024-01-02 AAPL 100 USD\nP 2024-01-01 AAPL 99 USD\n");
        let inline: Vec<_> = inline.entries().cloned().collect();
        let (db, _) = index("P 2024-01-02 AAPL 185.64 USD\n");
        let (prices, warnings) = PriceIndex::merged(&inline, db);
        assert_eq!(warnings.len(), 1);
        assert_eq!(prices.len(), 2);
        let entry = prices.price_as_of("AAPL", "USD", date(2024, 1, 2)).unwrap();
        assert_eq!(entry.price.number, Decimal::new(18564, 2));
    }

    #[test]
    fn missing_file() {
        let (prices, errors) = PriceIndex::from_file("/nonexistent/tally/prices.db");
        assert!(prices.is_empty());
        assert_eq!(errors[0].r#type, ErrorType::Io);
    }
}
