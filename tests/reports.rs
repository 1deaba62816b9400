use indoc::indoc;
use rust_decimal::Decimal;
use std::sync::Arc;
use tally::options::{AccountFilter, BalanceOptions, DateRange, NetWorthOptions, RegisterOptions};
use tally::{report, Date, ErrorLevel, ErrorType, Ledger, PriceIndex};

const LEDGER: &str = indoc! {r#"
    ; Household ledger
    2024-01-01 * Opening balances
        Assets:Bank:Checking      2,500.00 USD
        Assets:Broker             10 "MUTF2351"
        Liabilities:Visa          -120.00 USD
        Equity:Opening            -2,380.00 USD
        Equity:Opening            -10 "MUTF2351"

    2024-01-05 * Grocery
        Expenses:Food  50.00 USD
        Assets:Bank:Checking

    2024-01-05 ! (1042) Bookshop ; paid by card
        Expenses:Books            $32.10
        Liabilities:Visa          $-32.10

    2024/01/12 Salary
        Assets:Bank:Checking      3,000.00 USD
        Income:Salary

    P 2024-01-10 "MUTF2351" $5.42
    P 2024-01-10 "MUTF2351" 5.40 USD
"#};

fn date(y: i32, m: u32, d: u32) -> Date {
    Date::from_ymd_opt(y, m, d).unwrap()
}

fn load(text: &str) -> Ledger {
    let (ledger, errors) = Ledger::parse(text, Arc::new("household.ledger".to_string()));
    assert!(errors.is_empty(), "{:?}", errors);
    ledger
}

#[test]
fn grocery_is_balanced_by_inference() {
    let ledger = load(LEDGER);
    let grocery = ledger
        .txns()
        .iter()
        .find(|txn| txn.description() == "Grocery")
        .unwrap();
    let checking = &grocery.postings()[1];
    assert_eq!(checking.account.as_str(), "Assets:Bank:Checking");
    assert_eq!(checking.amount.to_string(), "-50.00 USD");
    assert!(checking.inferred);
}

#[test]
fn balance_of_expenses() {
    let ledger = load(LEDGER);
    let options = BalanceOptions {
        filter: AccountFilter::prefix("Expenses"),
        ..Default::default()
    };
    let report = report::balance(&ledger, &options);
    let food = report.get("Expenses:Food").unwrap();
    assert_eq!(food.total.get("USD"), Some(&Decimal::new(5000, 2)));
    assert_eq!(report.total.get("USD"), Some(&Decimal::new(5000, 2)));
    assert_eq!(report.total.get("$"), Some(&Decimal::new(3210, 2)));
    assert_eq!(report.currencies, vec!["$".to_string(), "USD".to_string()]);
}

#[test]
fn balance_with_pattern_and_range() {
    let ledger = load(LEDGER);
    let options = BalanceOptions {
        filter: "/^(Assets|Liabilities):/".parse().unwrap(),
        range: DateRange::new(Some(date(2024, 1, 2)), Some(date(2024, 1, 10))),
        ..Default::default()
    };
    let report = report::balance(&ledger, &options);
    let accounts: Vec<_> = report.rows.iter().map(|r| r.account.as_str()).collect();
    assert_eq!(
        accounts,
        vec![
            "Assets",
            "Assets:Bank",
            "Assets:Bank:Checking",
            "Liabilities",
            "Liabilities:Visa"
        ]
    );
    let checking = report.get("Assets:Bank:Checking").unwrap();
    assert_eq!(checking.own.get("USD"), Some(&Decimal::new(-5000, 2)));
}

#[test]
fn register_of_checking() {
    let ledger = load(LEDGER);
    let options = RegisterOptions {
        filter: AccountFilter::prefix("Assets:Bank"),
        ..Default::default()
    };
    let report = report::register(&ledger, &options);
    let balances: Vec<_> = report
        .rows
        .iter()
        .map(|row| row.balance["USD"].to_string())
        .collect();
    assert_eq!(balances, vec!["2500.00", "2450.00", "5450.00"]);
    assert!(report.rows[1].inferred);
    assert!(!report.rows[2].inferred);
}

#[test]
fn net_worth_single_commodity() {
    let ledger = load(indoc! {"
        2024-01-01 * Opening
            Assets:Checking  1000 USD
            Liabilities:Card  -150 USD
            Equity:Opening

        2024-01-05 * Grocery
            Expenses:Food  50.00 USD
            Assets:Checking
    "});
    let report = report::net_worth(
        &ledger,
        &PriceIndex::default(),
        &NetWorthOptions::new(date(2024, 1, 5), "USD"),
    );
    assert_eq!(report.assets, Decimal::new(95000, 2));
    assert_eq!(report.liabilities, Decimal::new(150, 0));
    assert_eq!(report.net_worth, Decimal::new(80000, 2));
    assert!(!report.partial);
}

#[test]
fn net_worth_with_inline_prices() {
    let ledger = load(LEDGER);
    let (prices, warnings) = PriceIndex::from_entries(ledger.prices().iter().cloned());
    assert!(warnings.is_empty());
    let report = report::net_worth(
        &ledger,
        &prices,
        &NetWorthOptions::new(date(2024, 1, 31), "USD"),
    );
    // the $ balance of Visa has no USD rate
    assert!(report.partial);
    assert_eq!(report.unconverted.len(), 1);
    assert_eq!(report.unconverted[0].account.as_str(), "Liabilities:Visa");
    assert_eq!(report.unconverted[0].amount.to_string(), "-32.10 $");
    // 2500 - 50 + 3000 in cash, 10 MUTF2351 at 5.40
    assert_eq!(report.assets, Decimal::new(550400, 2));
    assert_eq!(report.liabilities, Decimal::new(12000, 2));
    assert_eq!(report.net_worth, report.assets - report.liabilities);
}

#[test]
fn net_worth_before_any_price() {
    let ledger = load(LEDGER);
    let (prices, _) = PriceIndex::from_entries(ledger.prices().iter().cloned());
    let report = report::net_worth(
        &ledger,
        &prices,
        &NetWorthOptions::new(date(2024, 1, 5), "USD"),
    );
    let missing: Vec<_> = report
        .unconverted
        .iter()
        .map(|u| match &u.error {
            report::ConversionError::NoPriceData(e) => (u.account.as_str(), e.source.as_str()),
            report::ConversionError::Overflow => (u.account.as_str(), ""),
        })
        .collect();
    assert_eq!(
        missing,
        vec![("Assets:Broker", "MUTF2351"), ("Liabilities:Visa", "$")]
    );
}

#[test]
fn errors_are_collected() {
    let (ledger, errors) = Ledger::parse(
        indoc! {"
            2024-01-01 * Not balanced
                Expenses:Food  50.00 USD
                Assets:Checking  -49.00 USD

            2024-01-02 * Two elided
                Expenses:Food  5 USD
                Assets:Checking
                Assets:Savings

            2024-01-03 * Broken
                Expenses::Food  5 USD
                Assets:Checking

            2024-01-04 * Fine
                Expenses:Food  5 USD
                Assets:Checking
        "},
        Arc::new("broken.ledger".to_string()),
    );
    assert_eq!(ledger.txns().len(), 1);
    assert_eq!(ledger.txns()[0].description(), "Fine");
    let mut found: Vec<_> = errors
        .iter()
        .map(|e| (e.src.start.line, e.r#type, e.level))
        .collect();
    found.sort_by_key(|(line, _, _)| *line);
    assert_eq!(
        found,
        vec![
            (1, ErrorType::NotBalanced, ErrorLevel::Error),
            (5, ErrorType::NotBalanced, ErrorLevel::Error),
            (11, ErrorType::Syntax, ErrorLevel::Error),
        ]
    );
    assert!(errors[0].to_string().contains("broken.ledger"));
}

#[test]
fn price_db_from_file() {
    let path = std::env::temp_dir().join(format!("tally-prices-{}.db", std::process::id()));
    std::fs::write(
        &path,
        indoc! {"
            ; closing prices
            P 2024-01-02 AAPL 185.64 USD
            P 2024-01-03 AAPL 184.25 USD
            P 2024-01-03 AAPL 184.30 USD
        "},
    )
    .unwrap();
    let (prices, errors) = PriceIndex::from_file(path.to_str().unwrap());
    std::fs::remove_file(&path).unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].level, ErrorLevel::Warning);
    assert_eq!(errors[0].r#type, ErrorType::Duplicate);
    let entry = prices.price_as_of("AAPL", "USD", date(2024, 1, 4)).unwrap();
    assert_eq!(entry.price.number, Decimal::new(18430, 2));
    assert!(prices.price_as_of("AAPL", "USD", date(2024, 1, 1)).is_err());
}
