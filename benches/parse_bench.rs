use criterion::{criterion_group, criterion_main, Criterion};
use std::fmt::Write;
use std::sync::Arc;
use tally::options::{AccountFilter, BalanceOptions};
use tally::{report, Ledger};

fn synthetic_ledger(days: u32) -> String {
    let accounts = ["Food:Groceries", "Food:Dining", "Travel", "Rent", "Books"];
    let mut text = String::new();
    for i in 0..days {
        let month = i / 28 % 12 + 1;
        let day = i % 28 + 1;
        let account = accounts[i as usize % accounts.len()];
        let _ = write!(
            text,
            "2024-{:02}-{:02} * Purchase {}\n    Expenses:{}  {}.{:02} USD\n    Assets:Checking\n\n",
            month,
            day,
            i,
            account,
            i % 200,
            i % 100
        );
        if day == 1 {
            let _ = writeln!(text, "P 2024-{:02}-01 EUR 1.{:02} USD\n", month, i % 100);
        }
    }
    text
}

fn parse_text_ledger(text: &str) -> Ledger {
    let (ledger, _) = Ledger::parse(text, Arc::new("bench.ledger".to_string()));
    ledger
}

fn criterion_benchmark(c: &mut Criterion) {
    let text = match std::env::var("TALLY_BENCH_INPUT") {
        Ok(path) => std::fs::read_to_string(path).unwrap(),
        Err(_) => synthetic_ledger(10_000),
    };
    c.bench_function("Parse text", |b| b.iter(|| parse_text_ledger(&text)));

    let ledger = parse_text_ledger(&text);
    let options = BalanceOptions {
        filter: AccountFilter::prefix("Expenses"),
        ..Default::default()
    };
    c.bench_function("Balance report", |b| {
        b.iter(|| report::balance(&ledger, &options))
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
