use std::error::Error;

use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use sea_orm::{Database, DatabaseConnection};
use uuid::Uuid;

use engine::{
    Category, Currency, Engine, Granularity, NewTransactionCmd, NewWalletCmd, TransactionKind,
    TransactionListFilter, UpdateWalletCmd,
};
use migration::MigratorTrait;

#[derive(Parser, Debug)]
#[command(name = "centavo_admin")]
#[command(about = "Admin utilities for Centavo (inspect wallets, record transactions)")]
struct Cli {
    /// Database connection string (also read from `DATABASE_URL`).
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "sqlite:./centavo.db?mode=rwc"
    )]
    database_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Wallet(Wallet),
    Tx(Tx),
    /// Print an aggregated statistics report as JSON.
    Stats(StatsArgs),
    /// Compare every stored wallet total against its replayed ledger.
    Check(CheckArgs),
}

#[derive(Args, Debug)]
struct Wallet {
    #[command(subcommand)]
    command: WalletCommand,
}

#[derive(Subcommand, Debug)]
enum WalletCommand {
    Create(WalletCreateArgs),
    List(WalletListArgs),
    Rename(WalletRenameArgs),
    /// Delete a wallet and every transaction recorded against it.
    Delete(WalletDeleteArgs),
}

#[derive(Args, Debug)]
struct WalletCreateArgs {
    #[arg(long)]
    user: String,
    #[arg(long)]
    name: String,
    #[arg(long, default_value = "COP")]
    currency: String,
}

#[derive(Args, Debug)]
struct WalletListArgs {
    #[arg(long)]
    user: String,
}

#[derive(Args, Debug)]
struct WalletRenameArgs {
    #[arg(long)]
    user: String,
    #[arg(long)]
    wallet: Uuid,
    #[arg(long)]
    name: String,
}

#[derive(Args, Debug)]
struct WalletDeleteArgs {
    #[arg(long)]
    user: String,
    #[arg(long)]
    wallet: Uuid,
}

#[derive(Args, Debug)]
struct Tx {
    #[command(subcommand)]
    command: TxCommand,
}

#[derive(Subcommand, Debug)]
enum TxCommand {
    Add(TxAddArgs),
    List(TxListArgs),
    Remove(TxRemoveArgs),
}

#[derive(Args, Debug)]
struct TxAddArgs {
    #[arg(long)]
    user: String,
    #[arg(long)]
    wallet: Uuid,
    /// "income" or "expense".
    #[arg(long)]
    kind: String,
    /// Positive amount in minor units.
    #[arg(long)]
    amount: i64,
    /// Required for expenses, e.g. "groceries".
    #[arg(long)]
    category: Option<String>,
    /// Effective date, RFC 3339. Defaults to now.
    #[arg(long)]
    date: Option<DateTime<Utc>>,
    #[arg(long)]
    note: Option<String>,
}

#[derive(Args, Debug)]
struct TxListArgs {
    #[arg(long)]
    user: String,
    #[arg(long)]
    wallet: Option<Uuid>,
    #[arg(long, default_value_t = 20)]
    limit: u64,
}

#[derive(Args, Debug)]
struct TxRemoveArgs {
    #[arg(long)]
    user: String,
    #[arg(long)]
    id: Uuid,
}

#[derive(Args, Debug)]
struct StatsArgs {
    #[arg(long)]
    user: String,
    /// "week", "month", or "year".
    #[arg(long, default_value = "week")]
    granularity: String,
}

#[derive(Args, Debug)]
struct CheckArgs {
    #[arg(long)]
    user: String,
    /// Rewrite drifted totals from the ledger instead of only reporting them.
    #[arg(long)]
    repair: bool,
}

async fn connect_db(
    database_url: &str,
) -> Result<DatabaseConnection, Box<dyn Error + Send + Sync>> {
    let db = Database::connect(database_url).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    let db = connect_db(&cli.database_url).await?;
    let engine = Engine::builder().database(db).build().await?;

    match cli.command {
        Command::Wallet(Wallet {
            command: WalletCommand::Create(args),
        }) => {
            let currency = Currency::try_from(args.currency.to_lowercase().as_str())?;
            let wallet_id = engine
                .new_wallet(NewWalletCmd::new(&args.user, &args.name).currency(currency))
                .await?;
            println!("created wallet: {} ({wallet_id})", args.name);
        }
        Command::Wallet(Wallet {
            command: WalletCommand::List(args),
        }) => {
            for wallet in engine.wallets(&args.user).await? {
                println!(
                    "{}  {}  balance {} {} (income {}, expenses {})",
                    wallet.id,
                    wallet.name,
                    wallet.balance,
                    wallet.currency,
                    wallet.total_income,
                    wallet.total_expenses,
                );
            }
        }
        Command::Wallet(Wallet {
            command: WalletCommand::Rename(args),
        }) => {
            engine
                .update_wallet(UpdateWalletCmd::new(&args.user, args.wallet).name(&args.name))
                .await?;
            println!("renamed wallet {} to {}", args.wallet, args.name);
        }
        Command::Wallet(Wallet {
            command: WalletCommand::Delete(args),
        }) => {
            engine.delete_wallet(&args.user, args.wallet).await?;
            println!("deleted wallet {} and its transactions", args.wallet);
        }
        Command::Tx(Tx {
            command: TxCommand::Add(args),
        }) => {
            let kind = TransactionKind::try_from(args.kind.as_str())?;
            let mut cmd = NewTransactionCmd::new(
                &args.user,
                args.wallet,
                kind,
                args.amount,
                args.date.unwrap_or_else(Utc::now),
            );
            if let Some(category) = args.category.as_deref() {
                cmd = cmd.category(Category::try_from(category)?);
            }
            if let Some(note) = args.note {
                cmd = cmd.note(note);
            }
            let tx_id = engine.add_transaction(cmd).await?;
            println!("recorded transaction {tx_id}");
        }
        Command::Tx(Tx {
            command: TxCommand::List(args),
        }) => {
            let mut filter = TransactionListFilter::new();
            if let Some(wallet_id) = args.wallet {
                filter = filter.wallet_id(wallet_id);
            }
            for tx in engine
                .transactions(&args.user, &filter, Some(args.limit))
                .await?
            {
                println!(
                    "{}  {}  {:>12}  {}  {}",
                    tx.id,
                    tx.occurred_at.format("%Y-%m-%d"),
                    tx.signed_amount(),
                    tx.category.map_or("-", |c| c.as_str()),
                    tx.note.as_deref().unwrap_or(""),
                );
            }
        }
        Command::Tx(Tx {
            command: TxCommand::Remove(args),
        }) => {
            engine.remove_transaction(&args.user, args.id).await?;
            println!("removed transaction {}", args.id);
        }
        Command::Stats(args) => {
            let granularity = Granularity::try_from(args.granularity.as_str())?;
            let report = engine.stats(&args.user, granularity).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Check(args) => {
            let mut drifted = 0usize;
            for wallet in engine.wallets(&args.user).await? {
                let report = if args.repair {
                    engine.recompute_wallet_totals(&args.user, wallet.id).await?
                } else {
                    engine.check_wallet_totals(&args.user, wallet.id).await?
                };
                if report.consistent() {
                    println!("{}  {}  ok", wallet.id, wallet.name);
                } else {
                    drifted += 1;
                    println!(
                        "{}  {}  DRIFT stored {}/{}/{} replayed {}/{}/{}",
                        wallet.id,
                        wallet.name,
                        report.stored_balance,
                        report.stored_income,
                        report.stored_expenses,
                        report.replayed_balance,
                        report.replayed_income,
                        report.replayed_expenses,
                    );
                }
            }
            if drifted > 0 && !args.repair {
                eprintln!("{drifted} wallet(s) drifted; rerun with --repair to fix");
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
