//! Demo data seeder for Tally development and testing.
//!
//! Seeds an in-memory store with accounts, exchange rates, entries and
//! categorization rules, imports a bank statement, then runs automatic
//! reconciliation and categorization and logs what happened.
//!
//! Usage: cargo run --bin seeder [-- path/to/statement.csv]
//!
//! Without a path the bundled demo statement is imported. A custom file needs
//! `Date`, `Description`, `Amount` and `Reference` columns.

use anyhow::Context;
use chrono::{DateTime, Duration, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use tally_core::categorize::{Categorizer, Clause, Matcher};
use tally_core::currency::FxRateTable;
use tally_core::import::{ColumnMapping, StatementImporter};
use tally_core::ledger::{
    BuiltEntry, CreateEntryInput, EntryBuilder, LineSpec, account_balance, trial_balance,
};
use tally_core::reconcile::Reconciler;
use tally_core::store::{
    Account, AccountNature, EntryStatus, InMemoryStore, LedgerStore, Rule, RuleAction,
};
use tally_shared::AppConfig;
use tally_shared::config::{KeywordConfig, LogConfig};
use tally_shared::types::{AccountId, CategoryId, CurrencyCode, LedgerId, OwnerId, RuleId};

/// Statement for the checking account matching the seeded entries.
const DEMO_STATEMENT: &str = "\
Date,Description,Amount,Reference
2024-06-01,NOMINA ACME SA,\"32,000.00\",BNK-0001
2024-06-03,WALMART SUPERCENTER,-1250.40,BNK-0002
2024-06-05,NETFLIX.COM,(219.00),
2024-06-06,OXXO REFORMA,-45.50,
2024-06-07,CAJERO,-500.00,BNK-0005
";

/// Demo accounts.
struct Books {
    owner: OwnerId,
    ledger: LedgerId,
    mxn: CurrencyCode,
    usd: CurrencyCode,
    checking: AccountId,
    card_usd: AccountId,
    salary: AccountId,
    groceries: AccountId,
    transport: AccountId,
    subscriptions: AccountId,
}

/// Demo categories.
struct Categories {
    food: CategoryId,
    transport: CategoryId,
    entertainment: CategoryId,
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let mut config = AppConfig::load().context("Failed to load configuration")?;
    init_tracing(&config.log);

    let store = InMemoryStore::new();
    let categories = Categories {
        food: CategoryId::new(),
        transport: CategoryId::new(),
        entertainment: CategoryId::new(),
    };

    info!("Seeding accounts...");
    let books = seed_accounts(&store)?;

    info!("Seeding exchange rates...");
    seed_exchange_rates(&store, &books)?;

    info!("Seeding entries...");
    let entries = seed_entries(&store, &books)?;

    info!("Seeding categorization rules...");
    seed_rules(&store, &books, &categories)?;

    let statement = match std::env::args().nth(1) {
        Some(path) => std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read statement file {path}"))?,
        None => DEMO_STATEMENT.to_string(),
    };
    let mapping = ColumnMapping::new("Date", "Amount")
        .memo("Description")
        .external_id("Reference");
    let report = StatementImporter::new(&store, config.import.clone())
        .from_delimited(books.checking, &statement, &mapping)
        .context("Statement import failed")?;
    for failure in &report.failed {
        warn!(row = failure.row, reason = %failure.reason, "statement row skipped");
    }

    let reconciled = Reconciler::new(&store, &config.reconcile)
        .auto(books.checking, config.reconcile.window_days)
        .context("Automatic reconciliation failed")?;

    // The keyword agent covers what the rules leave out.
    config.categorization.keywords.extend([
        KeywordConfig {
            keyword: "uber".into(),
            category_id: categories.transport,
        },
        KeywordConfig {
            keyword: "netflix".into(),
            category_id: categories.entertainment,
        },
    ]);
    let categorizer = Categorizer::new(&store, &config.categorization);
    let mut needs_review = 0;
    for entry in &entries {
        let result = categorizer
            .categorize(books.owner, entry)
            .context("Categorization failed")?;
        if result.needs_review {
            needs_review += 1;
        }
    }

    let trial = trial_balance(&store, books.ledger, books.mxn)?;
    let checking = account_balance(&store, books.checking)?;
    info!(
        entries = store.entry_count(),
        statement_lines = store.statement_line_count(),
        imported = report.inserted,
        duplicates = report.duplicates,
        linked = reconciled.linked,
        ambiguous = reconciled.skipped,
        unmatched = reconciled.remaining_statement_ids.len(),
        needs_review,
        checking_balance = %checking.balance,
        trial_balanced = trial.is_balanced(),
        "Seeding complete!"
    );

    Ok(())
}

fn init_tracing(log: &LogConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.filter));
    let registry = tracing_subscriber::registry().with(filter);
    if log.json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

fn june(day: u32) -> anyhow::Result<DateTime<Utc>> {
    Utc.with_ymd_and_hms(2024, 6, day, 12, 0, 0)
        .single()
        .with_context(|| format!("invalid demo date 2024-06-{day}"))
}

/// Seeds the chart of accounts.
fn seed_accounts(store: &InMemoryStore) -> anyhow::Result<Books> {
    let owner = OwnerId::new();
    let mxn = CurrencyCode::parse("MXN").map_err(anyhow::Error::msg)?;
    let usd = CurrencyCode::parse("USD").map_err(anyhow::Error::msg)?;

    let open = |name: &str, nature: AccountNature, currency: CurrencyCode| {
        store
            .create_account(Account::new(AccountId::new(), owner, name, nature, currency))
            .map(|a| a.id)
            .with_context(|| format!("Failed to create account {name}"))
    };

    let books = Books {
        owner,
        ledger: LedgerId::new(),
        mxn,
        usd,
        checking: open("Checking", AccountNature::Asset, mxn)?,
        card_usd: open("Travel card", AccountNature::Liability, usd)?,
        salary: open("Salary", AccountNature::Income, mxn)?,
        groceries: open("Groceries", AccountNature::Expense, mxn)?,
        transport: open("Transport", AccountNature::Expense, mxn)?,
        subscriptions: open("Subscriptions", AccountNature::Expense, mxn)?,
    };
    info!(accounts = store.list_accounts(owner).len(), "  accounts created");
    Ok(books)
}

/// Seeds one MXN/USD snapshot per day of June 2024, at noon UTC.
fn seed_exchange_rates(store: &InMemoryStore, books: &Books) -> anyhow::Result<()> {
    let table = FxRateTable::new(store);
    let base_rate = dec!(17.15);
    let first = june(1)?;

    let mut inserted = 0;
    for day_offset in 0..30i64 {
        // Small alternating drift to simulate market movement.
        let drift = Decimal::from(day_offset) * dec!(0.001);
        let variation = if day_offset % 2 == 0 {
            Decimal::ONE + drift
        } else {
            Decimal::ONE - drift
        };
        table.ensure(
            books.mxn,
            books.usd,
            first + Duration::days(day_offset),
            (base_rate * variation).round_dp(6),
        )?;
        inserted += 1;
    }

    info!(inserted, "  exchange rates registered (MXN per USD)");
    Ok(())
}

fn entry(
    books: &Books,
    booked_at: DateTime<Utc>,
    description: &str,
    external_id: &str,
    lines: Vec<LineSpec>,
) -> CreateEntryInput {
    CreateEntryInput {
        ledger_id: books.ledger,
        booked_at,
        base_currency: books.mxn.to_string(),
        description: description.to_string(),
        lines,
        external_id: Some(external_id.to_string()),
        category_id: None,
        status: EntryStatus::Posted,
    }
}

/// Seeds a month of activity, replaying one entry to show idempotency.
fn seed_entries(store: &InMemoryStore, books: &Books) -> anyhow::Result<Vec<BuiltEntry>> {
    let builder = EntryBuilder::new(store);
    let mut inputs = vec![
        entry(
            books,
            june(1)?,
            "Payroll June",
            "seed-payroll-06",
            vec![
                LineSpec::debit(books.checking, dec!(32000), "MXN"),
                LineSpec::credit(books.salary, dec!(32000), "MXN"),
            ],
        ),
        entry(
            books,
            june(2)?,
            "Walmart weekly groceries",
            "seed-walmart-06-02",
            vec![
                LineSpec::debit(books.groceries, dec!(1250.40), "MXN"),
                LineSpec::credit(books.checking, dec!(1250.40), "MXN"),
            ],
        ),
        entry(
            books,
            june(5)?,
            "Netflix subscription",
            "seed-netflix-06",
            vec![
                LineSpec::debit(books.subscriptions, dec!(219), "MXN"),
                LineSpec::credit(books.checking, dec!(219), "MXN"),
            ],
        ),
        entry(
            books,
            june(6)?,
            "OXXO snacks",
            "seed-oxxo-06-06",
            vec![
                LineSpec::debit(books.groceries, dec!(45.50), "MXN"),
                LineSpec::credit(books.checking, dec!(45.50), "MXN"),
            ],
        ),
    ];

    // Card purchase in USD, booked in MXN at the registered rate.
    let uber_at = june(12)?;
    let uber_usd = dec!(14.20);
    let uber_mxn = FxRateTable::new(store).convert(uber_usd, books.mxn, books.usd, uber_at)?;
    inputs.push(entry(
        books,
        uber_at,
        "Uber airport ride",
        "seed-uber-06-12",
        vec![
            LineSpec::debit(books.transport, uber_mxn, "MXN"),
            LineSpec::credit(books.card_usd, uber_usd, "USD"),
        ],
    ));

    let mut built = Vec::with_capacity(inputs.len());
    for input in &inputs {
        built.push(builder.create(input.clone())?);
    }

    let replay = builder.create(inputs[0].clone())?;
    info!(
        entries = built.len(),
        replay_is_same = replay.entry.id == built[0].entry.id,
        "  entries posted"
    );
    Ok(built)
}

/// Seeds the owner's categorization rules.
fn seed_rules(store: &InMemoryStore, books: &Books, categories: &Categories) -> anyhow::Result<()> {
    let rules = [
        (
            "Supermarkets",
            10,
            Matcher::Any(vec![
                Clause::contains("walmart").into(),
                Clause::contains("soriana").into(),
            ]),
            categories.food,
        ),
        (
            "Convenience stores",
            5,
            Matcher::All(vec![
                Clause::matches(r"\boxxo\b").into(),
                Clause::debit_between(None, Some(dec!(500))).into(),
            ]),
            categories.food,
        ),
    ];

    for (name, priority, matcher, category_id) in rules {
        store
            .create_rule(Rule {
                id: RuleId::new(),
                owner_id: books.owner,
                name: name.to_string(),
                is_active: true,
                priority,
                matcher,
                action: RuleAction {
                    category_id,
                    confidence: None,
                },
            })
            .with_context(|| format!("Failed to create rule {name}"))?;
    }

    info!(rules = store.list_rules(books.owner).len(), "  rules created");
    Ok(())
}
