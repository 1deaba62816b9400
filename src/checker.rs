use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::{
    parse::{LedgerDraft, PostingDraft, TxnDraft},
    Amount, Currency, Decimal, Error, ErrorLevel, ErrorType, Ledger, Posting, Transaction,
};

/// Why a [`TxnDraft`] could not be balanced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BalanceErrorKind {
    /// More than one posting omits its amount.
    MultipleElided { count: usize, residual: Vec<Amount> },
    /// One posting omits its amount but more than one commodity is unbalanced.
    Ambiguous { residual: Vec<Amount> },
    /// One posting omits its amount but every commodity already sums to zero.
    NothingToInfer,
    /// Every amount is given and they do not sum to zero.
    NotBalanced { residual: Vec<Amount> },
    /// The sum of the amounts in `currency` does not fit in a [`Decimal`].
    Overflow { currency: Currency },
}

impl fmt::Display for BalanceErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BalanceErrorKind::MultipleElided { count, residual } => {
                write!(f, "cannot infer the amounts of {} postings", count)?;
                if !residual.is_empty() {
                    write!(f, ": {}", join_amounts(residual))?;
                }
                Ok(())
            }
            BalanceErrorKind::Ambiguous { residual } => write!(
                f,
                "cannot infer one amount from multiple unbalanced commodities: {}",
                join_amounts(residual)
            ),
            BalanceErrorKind::NothingToInfer => {
                write!(f, "nothing left to infer for the elided posting")
            }
            BalanceErrorKind::NotBalanced { residual } => {
                write!(f, "transaction not balanced: {}", join_amounts(residual))
            }
            BalanceErrorKind::Overflow { currency } => {
                write!(f, "sum of the {} amounts is out of range", currency)
            }
        }
    }
}

fn join_amounts(amounts: &[Amount]) -> String {
    amounts
        .iter()
        .map(|amount| amount.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// A transaction rejected by [`balance_txn`], returned together with the
/// draft it was built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceError {
    pub txn: Box<TxnDraft>,
    pub kind: BalanceErrorKind,
}

impl BalanceError {
    /// The unbalanced commodities and their sums, if any.
    pub fn residual(&self) -> &[Amount] {
        match &self.kind {
            BalanceErrorKind::MultipleElided { residual, .. }
            | BalanceErrorKind::Ambiguous { residual }
            | BalanceErrorKind::NotBalanced { residual } => residual,
            _ => &[],
        }
    }
}

impl fmt::Display for BalanceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.txn.date, self.txn.description, self.kind)
    }
}

impl std::error::Error for BalanceError {}

impl From<BalanceError> for Error {
    fn from(error: BalanceError) -> Self {
        Error {
            msg: error.to_string(),
            src: error.txn.src.clone(),
            r#type: ErrorType::NotBalanced,
            level: ErrorLevel::Error,
        }
    }
}

/// Checks that `draft` balances in every commodity, filling in the amount of
/// an elided posting if there is exactly one.
///
/// The returned [`Transaction`] keeps the postings in source order; an
/// inferred posting is marked [`Posting::inferred`].
pub fn balance_txn(draft: TxnDraft) -> Result<Transaction, BalanceError> {
    let mut sums: BTreeMap<&Currency, Decimal> = BTreeMap::new();
    let mut elided = 0;
    let mut overflow = None;
    for posting in draft.postings.iter() {
        match &posting.amount {
            Some(amount) => {
                let sum = sums.entry(&amount.currency).or_default();
                match sum.checked_add(amount.number) {
                    Some(total) => *sum = total,
                    None => overflow = Some(amount.currency.clone()),
                }
            }
            None => elided += 1,
        }
    }
    let residual: Vec<Amount> = sums
        .into_iter()
        .filter(|(_, number)| !number.is_zero())
        .map(|(currency, number)| Amount::new(number, currency.clone()))
        .collect();

    let inferred = match (overflow, elided, residual.len()) {
        (Some(currency), _, _) => Some(Err(BalanceErrorKind::Overflow { currency })),
        (None, 0, 0) => None,
        (None, 0, _) => Some(Err(BalanceErrorKind::NotBalanced { residual })),
        (None, 1, 0) => Some(Err(BalanceErrorKind::NothingToInfer)),
        (None, 1, 1) => residual.into_iter().next().map(|amount| Ok(-amount)),
        (None, 1, _) => Some(Err(BalanceErrorKind::Ambiguous { residual })),
        (None, count, _) => Some(Err(BalanceErrorKind::MultipleElided { count, residual })),
    };
    let inferred = match inferred.transpose() {
        Ok(inferred) => inferred,
        Err(kind) => {
            return Err(BalanceError {
                txn: Box::new(draft),
                kind,
            })
        }
    };

    let TxnDraft {
        date,
        aux_date,
        status,
        code,
        description,
        comment,
        postings,
        src,
    } = draft;
    let postings = postings
        .into_iter()
        .map(|posting| {
            let PostingDraft {
                account,
                amount,
                comment,
                src,
            } = posting;
            let (amount, inferred) = match (amount, &inferred) {
                (Some(amount), _) => (amount, false),
                (None, Some(fill)) => (fill.clone(), true),
                (None, None) => unreachable!(),
            };
            Posting {
                account,
                amount,
                inferred,
                comment,
                src,
            }
        })
        .collect();
    Ok(Transaction {
        date,
        aux_date,
        status,
        code,
        description,
        comment,
        postings,
        src,
    })
}

impl LedgerDraft {
    /// Consuming `self`, returns a [`Ledger`] holding every transaction that
    /// balances, and one error for each that does not.
    pub fn into_ledger(self) -> (Ledger, Vec<Error>) {
        let LedgerDraft { txns, prices } = self;
        let total = txns.len();
        let mut errors = Vec::new();
        let mut valid_txns = Vec::with_capacity(total);
        for txn in txns {
            match balance_txn(txn) {
                Ok(valid_txn) => valid_txns.push(valid_txn),
                Err(e) => errors.push(e.into()),
            }
        }
        // stable, so same-day transactions keep their order in the file
        valid_txns.sort_by_key(|txn| txn.date);
        let accounts: BTreeSet<_> = valid_txns
            .iter()
            .flat_map(|txn| txn.postings.iter().map(|p| p.account.clone()))
            .collect();
        log::debug!(
            "accepted {} of {} transactions over {} accounts",
            valid_txns.len(),
            total,
            accounts.len()
        );
        let ledger = Ledger {
            txns: valid_txns,
            accounts,
            prices,
        };
        (ledger, errors)
    }
}

impl Ledger {
    /// Builds a ledger from parsed drafts. See [`LedgerDraft::into_ledger`].
    pub fn from_draft(draft: LedgerDraft) -> (Ledger, Vec<Error>) {
        draft.into_ledger()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Date, Source, TxnStatus};
    use std::sync::Arc;

    fn src() -> Source {
        Source::file_start(Arc::new("test.ledger".to_string()))
    }

    fn posting(account: &str, amount: Option<(i64, u32, &str)>) -> PostingDraft {
        PostingDraft {
            account: Arc::new(account.to_string()),
            amount: amount.map(|(num, scale, currency)| Amount::new(Decimal::new(num, scale), currency)),
            comment: None,
            src: src(),
        }
    }

    fn draft(postings: Vec<PostingDraft>) -> TxnDraft {
        TxnDraft {
            date: Date::from_ymd_opt(2024, 1, 5).unwrap(),
            aux_date: None,
            status: TxnStatus::Cleared,
            code: None,
            description: "Grocery".to_string(),
            comment: None,
            postings,
            src: src(),
        }
    }

    #[test]
    fn infer_elided_amount() {
        let txn = balance_txn(draft(vec![
            posting("Expenses:Food", Some((5000, 2, "USD"))),
            posting("Assets:Checking", None),
        ]))
        .unwrap();
        let checking = &txn.postings()[1];
        assert_eq!(checking.amount, Amount::new(Decimal::new(-5000, 2), "USD"));
        assert_eq!(checking.amount.to_string(), "-50.00 USD");
        assert!(checking.inferred);
        assert!(!txn.postings()[0].inferred);
        assert_eq!(txn.description(), "Grocery");
    }

    #[test]
    fn balanced_is_accepted_unchanged() {
        let postings = vec![
            posting("Expenses:Food", Some((5000, 2, "USD"))),
            posting("Assets:Checking", Some((-50, 0, "USD"))),
        ];
        let txn = balance_txn(draft(postings.clone())).unwrap();
        for (valid, draft) in txn.postings().iter().zip(postings) {
            assert_eq!(Some(&valid.amount), draft.amount.as_ref());
            assert!(!valid.inferred);
        }
    }

    #[test]
    fn multi_commodity_balanced() {
        let result = balance_txn(draft(vec![
            posting("Assets:Broker", Some((10, 0, "AAPL"))),
            posting("Assets:Broker", Some((-1850, 0, "USD"))),
            posting("Equity:Trading", Some((-10, 0, "AAPL"))),
            posting("Equity:Trading", Some((1850, 0, "USD"))),
        ]));
        assert!(result.is_ok());
    }

    #[test]
    fn not_balanced() {
        let error = balance_txn(draft(vec![
            posting("Expenses:Food", Some((5000, 2, "USD"))),
            posting("Assets:Checking", Some((-4999, 2, "USD"))),
        ]))
        .unwrap_err();
        assert_eq!(
            error.kind,
            BalanceErrorKind::NotBalanced {
                residual: vec![Amount::new(Decimal::new(1, 2), "USD")]
            }
        );
        assert_eq!(error.residual().len(), 1);
        assert_eq!(error.txn.description, "Grocery");
        let diagnostic: Error = error.into();
        assert_eq!(diagnostic.r#type, ErrorType::NotBalanced);
        assert!(diagnostic.msg.contains("0.01 USD"));
    }

    #[test]
    fn multiple_elided() {
        let error = balance_txn(draft(vec![
            posting("Expenses:Food", Some((5000, 2, "USD"))),
            posting("Assets:Checking", None),
            posting("Assets:Savings", None),
        ]))
        .unwrap_err();
        assert_eq!(
            error.kind,
            BalanceErrorKind::MultipleElided {
                count: 2,
                residual: vec![Amount::new(Decimal::new(5000, 2), "USD")]
            }
        );
        assert_eq!(error.residual().len(), 1);
        assert!(error.to_string().contains("2 postings: 50.00 USD"));
    }

    #[test]
    fn sum_out_of_range() {
        let max = PostingDraft {
            amount: Some(Amount::new(Decimal::MAX, "USD")),
            ..posting("Assets:Checking", None)
        };
        let error = balance_txn(draft(vec![
            max.clone(),
            max,
            posting("Equity:Opening", None),
        ]))
        .unwrap_err();
        assert_eq!(
            error.kind,
            BalanceErrorKind::Overflow {
                currency: "USD".to_string()
            }
        );
        let diagnostic: Error = error.into();
        assert_eq!(diagnostic.r#type, ErrorType::NotBalanced);
        assert!(diagnostic.msg.contains("out of range"));
    }

    #[test]
    fn ambiguous_residual() {
        let error = balance_txn(draft(vec![
            posting("Expenses:Food", Some((5000, 2, "USD"))),
            posting("Expenses:Travel", Some((20, 0, "EUR"))),
            posting("Assets:Checking", None),
        ]))
        .unwrap_err();
        match error.kind {
            BalanceErrorKind::Ambiguous { residual } => {
                let currencies: Vec<_> = residual.iter().map(|a| a.currency.as_str()).collect();
                assert_eq!(currencies, vec!["EUR", "USD"]);
            }
            kind => panic!("unexpected {:?}", kind),
        }
    }

    #[test]
    fn nothing_to_infer() {
        let error = balance_txn(draft(vec![
            posting("Expenses:Food", Some((5000, 2, "USD"))),
            posting("Assets:Checking", Some((-5000, 2, "USD"))),
            posting("Assets:Savings", None),
        ]))
        .unwrap_err();
        assert_eq!(error.kind, BalanceErrorKind::NothingToInfer);
        assert!(error.residual().is_empty());
    }

    #[test]
    fn into_ledger_keeps_valid_txns() {
        let mut late = draft(vec![
            posting("Expenses:Food", Some((5, 0, "USD"))),
            posting("Assets:Cash", None),
        ]);
        late.date = Date::from_ymd_opt(2024, 2, 1).unwrap();
        let bad = draft(vec![
            posting("Expenses:Food", Some((5, 0, "USD"))),
            posting("Assets:Cash", Some((5, 0, "USD"))),
        ]);
        let early = draft(vec![
            posting("Expenses:Rent", Some((5, 0, "USD"))),
            posting("Assets:Bank", None),
        ]);
        let (ledger, errors) = Ledger::from_draft(LedgerDraft {
            txns: vec![late, bad, early],
            prices: vec![],
        });
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].level, ErrorLevel::Error);
        let dates: Vec<_> = ledger.txns().iter().map(|t| t.date()).collect();
        assert_eq!(
            dates,
            vec![
                Date::from_ymd_opt(2024, 1, 5).unwrap(),
                Date::from_ymd_opt(2024, 2, 1).unwrap()
            ]
        );
        let accounts: Vec<_> = ledger.all_accounts().iter().map(|a| a.as_str()).collect();
        assert_eq!(
            accounts,
            vec!["Assets:Bank", "Assets:Cash", "Expenses:Food", "Expenses:Rent"]
        );
    }
}
