//! Wallet CLI
//!
//! Command-line interface for the Wallet API.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use wallet_client::{PollState, PollerConfig, RatePoller, WalletClient};
use wallet_types::{AddExpenseRequest, CurrencyCode, RateSnapshot, to_local};

#[derive(Parser)]
#[command(name = "wallet")]
#[command(author, version, about = "Wallet API CLI client", long_about = None)]
struct Cli {
    /// Base URL of the Wallet API
    #[arg(long, env = "WALLET_API_URL", default_value = "http://localhost:3000")]
    api_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show current exchange rates
    Rates,
    /// Convert an amount to the local currency
    Convert {
        amount: f64,
        /// Currency (IRT, USD, EUR, USDT)
        #[arg(default_value = "USD")]
        currency: CurrencyCode,
    },
    /// Holdings operations
    Holdings {
        #[command(subcommand)]
        action: HoldingsCommands,
    },
    /// Expense operations
    Expense {
        #[command(subcommand)]
        action: ExpenseCommands,
    },
    /// Net worth summary in local currency
    Summary,
    /// Export or import a backup file
    Backup {
        #[command(subcommand)]
        action: BackupCommands,
    },
    /// Keep polling rates and print every update
    Watch {
        /// Seconds between refreshes
        #[arg(long, default_value = "60")]
        interval: u64,
    },
    /// Check API health
    Health,
}

#[derive(Subcommand)]
enum HoldingsCommands {
    /// Show balances
    Show,
    /// Set the balance of one currency
    Set { currency: CurrencyCode, value: f64 },
    /// Reset every balance to zero
    Reset,
}

#[derive(Subcommand)]
enum ExpenseCommands {
    /// Record an expense
    Add {
        amount: f64,
        #[arg(long, default_value = "IRT")]
        currency: CurrencyCode,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        note: Option<String>,
    },
    /// List expenses, newest first
    List,
    /// Remove an expense
    Remove { id: String },
    /// Restore the last removed expense
    Undo,
    /// Remove every expense
    Clear,
}

#[derive(Subcommand)]
enum BackupCommands {
    /// Write a backup document
    Export {
        /// Output file (stdout when omitted)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Import a backup document
    Import { file: PathBuf },
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_banner(error: Option<&str>) {
    match error {
        Some(error) => eprintln!("! Degraded: rates may be out of date ({error})"),
        None => eprintln!("! Degraded: rates may be out of date"),
    }
}

fn print_rates(rates: &RateSnapshot) {
    if rates.stale {
        print_banner(rates.error_message.as_deref());
    }
    println!("Rates as of {}", rates.as_of);
    for currency in CurrencyCode::all().iter().filter(|c| !c.is_local()) {
        println!(
            "  1 {:<4} = {:>10} {}",
            currency.code(),
            currency.rate_in(rates),
            CurrencyCode::LOCAL.code()
        );
    }
}

fn print_poll_state(state: &PollState) {
    if state.is_degraded() {
        let error = state
            .last_error
            .as_deref()
            .or_else(|| state.snapshot.as_ref().and_then(|s| s.error_message.as_deref()));
        print_banner(error);
    }
    match &state.snapshot {
        Some(rates) => print_rates(rates),
        None => println!("No rates yet"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let client = WalletClient::new(&cli.api_url);

    match cli.command {
        Commands::Health => {
            let healthy = client.health().await?;
            if healthy {
                println!("✓ API is healthy");
            } else {
                println!("✗ API is not healthy");
                std::process::exit(1);
            }
        }

        Commands::Rates => {
            let rates = client.rates().await?;
            print_rates(&rates);
        }

        Commands::Convert { amount, currency } => {
            // Local amounts convert without rates; foreign ones fall back to 0
            let rates = if currency.is_local() {
                None
            } else {
                match client.rates().await {
                    Ok(rates) => {
                        if rates.stale {
                            print_banner(rates.error_message.as_deref());
                        }
                        Some(rates)
                    }
                    Err(e) => {
                        print_banner(Some(&e.to_string()));
                        None
                    }
                }
            };
            let value = to_local(amount, currency, rates.as_ref());
            println!(
                "{} {} = {} {}",
                amount,
                currency.code(),
                value,
                CurrencyCode::LOCAL.code()
            );
        }

        Commands::Holdings { action } => match action {
            HoldingsCommands::Show => print_json(&client.holdings().await?)?,
            HoldingsCommands::Set { currency, value } => {
                print_json(&client.update_holding(currency, value).await?)?
            }
            HoldingsCommands::Reset => print_json(&client.reset_holdings().await?)?,
        },

        Commands::Expense { action } => match action {
            ExpenseCommands::Add {
                amount,
                currency,
                category,
                note,
            } => {
                let expense = client
                    .add_expense(&AddExpenseRequest {
                        amount,
                        currency,
                        category,
                        note,
                        created_at: None,
                    })
                    .await?;
                print_json(&expense)?;
            }
            ExpenseCommands::List => print_json(&client.expenses().await?)?,
            ExpenseCommands::Remove { id } => {
                client.remove_expense(&id).await?;
                println!("✓ Expense removed (run `wallet expense undo` to restore it)");
            }
            ExpenseCommands::Undo => print_json(&client.restore_expense().await?)?,
            ExpenseCommands::Clear => {
                client.clear_expenses().await?;
                println!("✓ Expenses cleared");
            }
        },

        Commands::Summary => {
            let summary = client.summary().await?;
            if summary.degraded {
                print_banner(None);
            }
            print_json(&summary)?;
        }

        Commands::Backup { action } => match action {
            BackupCommands::Export { out } => {
                let backup = client.export_backup().await?;
                let body = serde_json::to_string_pretty(&backup)?;
                match out {
                    Some(path) => {
                        std::fs::write(&path, body)
                            .with_context(|| format!("Failed to write {}", path.display()))?;
                        println!("✓ Backup written to {}", path.display());
                    }
                    None => println!("{}", body),
                }
            }
            BackupCommands::Import { file } => {
                let body = std::fs::read_to_string(&file)
                    .with_context(|| format!("Failed to read {}", file.display()))?;
                let document: serde_json::Value = serde_json::from_str(&body)
                    .with_context(|| format!("{} is not valid JSON", file.display()))?;
                print_json(&client.import_backup(&document).await?)?;
            }
        },

        Commands::Watch { interval } => {
            let poller = RatePoller::spawn(
                client,
                PollerConfig {
                    interval: Duration::from_secs(interval.max(1)),
                    ..PollerConfig::default()
                },
            );
            let mut updates = poller.subscribe();
            loop {
                tokio::select! {
                    changed = updates.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let state = updates.borrow_and_update().clone();
                        print_poll_state(&state);
                    }
                    _ = tokio::signal::ctrl_c() => break,
                }
            }
        }
    }

    Ok(())
}
