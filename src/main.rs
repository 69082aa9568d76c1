use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use clap::{Parser, Subcommand};
mod auth;
use finvault::{Amount, Category, KdfParams, Ledger, VaultConfig, default_vault_path};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

const LOG_ENV: &str = "FINVAULT_LOG";

#[derive(Debug, Parser)]
#[command(name = "finvault")]
#[command(version, about = "Offline, password-protected personal finance ledger.")]
struct Cli {
    /// Path to the vault file (salt and lock files are kept next to it)
    #[arg(long, global = true, value_name = "PATH", env = "FINVAULT_PATH")]
    vault: Option<PathBuf>,

    /// PBKDF2 iteration count; must match the value the vault was created with
    #[arg(
        long,
        global = true,
        value_name = "N",
        env = "FINVAULT_KDF_ITERATIONS",
        default_value_t = KdfParams::default().iterations()
    )]
    kdf_iterations: u32,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Adds an income or expense record
    #[command(arg_required_else_help = true)]
    Add {
        /// income or expense
        #[arg(short, long)]
        category: String,

        /// Positive decimal amount, e.g. 1000.00
        #[arg(short, long)]
        amount: String,

        #[arg(short, long)]
        description: String,

        /// Tag to attach; repeat for several
        #[arg(short, long = "tag")]
        tags: Vec<String>,

        /// Timestamp as YYYY-MM-DDTHH:MM:SS (default: now)
        #[arg(long)]
        date: Option<NaiveDateTime>,
    },

    /// Lists records, optionally filtered
    List {
        #[arg(short, long)]
        category: Option<String>,

        #[arg(short, long)]
        tag: Option<String>,
    },

    /// Shows income minus expenses
    Balance,

    /// Shows income, expense and net totals
    Totals,

    /// Deletes a record by id
    #[command(arg_required_else_help = true)]
    Delete { id: String },

    /// Shows information about the vault
    Info,
}

fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn resolve_config(cli: &Cli) -> Result<VaultConfig> {
    let path = match &cli.vault {
        Some(p) => p.clone(),
        None => default_vault_path().context("could not determine platform directories")?,
    };
    let kdf = KdfParams::new(cli.kdf_iterations)?;
    Ok(VaultConfig::for_vault(path).with_kdf(kdf))
}

fn parse_category(s: Option<&str>) -> Result<Option<Category>> {
    Ok(s.map(str::parse).transpose()?)
}

fn main() -> Result<()> {
    init_logging();
    let args = Cli::parse();
    let config = resolve_config(&args)?;

    let creating = !config.paths.vault().exists() && matches!(args.command, Commands::Add { .. });
    let password = if creating {
        auth::read_new_password_with_confirmation()?
    } else {
        auth::read_password()?
    };

    let mut ledger = Ledger::open(config, password)?;

    match args.command {
        Commands::Add {
            category,
            amount,
            description,
            tags,
            date,
        } => {
            let category: Category = category.parse()?;
            let amount = Amount::parse(&amount)
                .map_err(|_| finvault::LedgerError::InvalidAmount(amount.clone()))?;
            let record = ledger.add_record(category, amount, &description, date, tags)?;
            println!("record added with id: {}", record.id());
        }
        Commands::List { category, tag } => {
            let category = parse_category(category.as_deref())?;
            let records = ledger.list_records(category, tag.as_deref());

            if records.is_empty() {
                println!("No records found.");
                return Ok(());
            }

            let desc_width = records
                .iter()
                .map(|r| r.description().chars().count())
                .chain(std::iter::once("Description".len()))
                .max()
                .unwrap_or_default();

            let amount_width = records
                .iter()
                .map(|r| r.amount().as_str().chars().count())
                .chain(std::iter::once("Amount".len()))
                .max()
                .unwrap_or_default();

            println!(
                "{:<36}  {:<7}  {:>amount_width$}  {:<desc_width$}  {:<19}  Tags",
                "ID", "Type", "Amount", "Description", "Date"
            );
            println!(
                "{:-<36}  {:-<7}  {:->amount_width$}  {:-<desc_width$}  {:-<19}  ----",
                "", "", "", "", ""
            );

            for r in records {
                println!(
                    "{:<36}  {:<7}  {:>amount_width$}  {:<desc_width$}  {:<19}  {}",
                    r.id().to_string(),
                    r.category().as_str(),
                    r.amount().as_str(),
                    r.description(),
                    r.date().format("%Y-%m-%d %H:%M:%S").to_string(),
                    r.tags().join(", ")
                );
            }
        }
        Commands::Balance => {
            println!("Current balance: {}", ledger.balance());
        }
        Commands::Totals => {
            let income = ledger.total_by_category(Category::Income);
            let expense = ledger.total_by_category(Category::Expense);
            println!("Total income:   {income}");
            println!("Total expenses: {expense}");
            println!("Net:            {}", income - expense);
        }
        Commands::Delete { id } => {
            let removed = match Uuid::parse_str(id.trim()) {
                Ok(uuid) => ledger.delete_record(&uuid)?,
                Err(_) => false,
            };
            if removed {
                println!("record '{id}' deleted");
            } else {
                println!("record '{id}' not found");
            }
        }
        Commands::Info => {
            println!("{}", ledger.info());
        }
    }

    Ok(())
}
