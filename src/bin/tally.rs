use clap::{Parser, Subcommand};
use tally::options::{AccountFilter, BalanceOptions, DateRange, NetWorthOptions, RegisterOptions};
use tally::{report, Date, Error, ErrorLevel, Ledger, PriceIndex};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Parser)]
#[command(
    name = "tally",
    about = "Reports over a plain-text ledger.",
    version = VERSION,
)]
struct Cli {
    /// The ledger file.
    #[arg(short, long, required = true)]
    input: String,
    /// A price database with `P` lines.
    #[arg(short, long)]
    prices: Option<String>,
    /// First date to include.
    #[arg(short, long)]
    begin: Option<Date>,
    /// Last date to include.
    #[arg(short, long)]
    end: Option<Date>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Account balances, rolled up along the account tree.
    Balance {
        /// An account with its sub-accounts, or `/regex/`.
        #[arg(default_value = "")]
        account: AccountFilter,
        /// Show accounts whose balance is zero.
        #[arg(long)]
        empty: bool,
        /// Hide accounts deeper than this.
        #[arg(short, long)]
        depth: Option<usize>,
    },
    /// Postings with a running balance.
    Register {
        #[arg(default_value = "")]
        account: AccountFilter,
    },
    /// Assets minus liabilities in one currency.
    Networth {
        #[arg(short, long, default_value = "USD")]
        currency: String,
        /// Defaults to `--end`, or today.
        #[arg(long)]
        as_of: Option<Date>,
    },
}

fn print_errors(errors: &[Error]) -> bool {
    for error in errors {
        eprintln!("{}\n", error);
    }
    errors.iter().any(|e| e.level == ErrorLevel::Error)
}

fn load_prices(ledger: &Ledger, path: Option<&str>) -> (PriceIndex, Vec<Error>) {
    match path {
        Some(path) => {
            let (db, mut errors) = PriceIndex::from_file(path);
            let (prices, warnings) = PriceIndex::merged(ledger.prices(), db);
            errors.extend(warnings);
            (prices, errors)
        }
        None => PriceIndex::from_entries(ledger.prices().iter().cloned()),
    }
}

fn main() -> std::process::ExitCode {
    pretty_env_logger::init();
    let args = Cli::parse();
    let (ledger, errors) = Ledger::from_file(&args.input);
    let mut failed = print_errors(&errors);
    let range = DateRange::new(args.begin, args.end);
    match args.command {
        Commands::Balance {
            account,
            empty,
            depth,
        } => {
            let options = BalanceOptions {
                filter: account,
                range,
                show_zero: empty,
                depth,
            };
            print!("{}", report::balance(&ledger, &options));
        }
        Commands::Register { account } => {
            let options = RegisterOptions {
                filter: account,
                range,
            };
            print!("{}", report::register(&ledger, &options));
        }
        Commands::Networth { currency, as_of } => {
            let (prices, errors) = load_prices(&ledger, args.prices.as_deref());
            failed |= print_errors(&errors);
            let as_of = as_of
                .or(args.end)
                .unwrap_or_else(|| chrono::Local::now().date_naive());
            let options = NetWorthOptions::new(as_of, currency);
            print!("{}", report::net_worth(&ledger, &prices, &options));
        }
    }
    if failed {
        std::process::ExitCode::FAILURE
    } else {
        std::process::ExitCode::SUCCESS
    }
}
