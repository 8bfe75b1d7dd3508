//! OpenFiber CLI
//!
//! Operator command-line interface for the subscriber platform. Used for
//! operational testing and emergency control of single accounts, and for
//! triggering the batch jobs by hand.
//!
//! # Usage
//!
//! ```bash
//! openfiber billing run
//! openfiber billing preview --activation-date 2024-06-20 --price 300000
//! openfiber suspension run
//! openfiber suspension suspend "budi"
//! openfiber suspension reinstate CUST-0001
//! openfiber suspension status "budi" --format json
//! ```

use clap::{Parser, Subcommand};

mod commands;
mod output;

#[derive(Parser)]
#[command(name = "openfiber")]
#[command(author = "OpenFiber")]
#[command(version = "0.1.0")]
#[command(about = "OpenFiber Subscriber Platform CLI", long_about = None)]
struct Cli {
    /// API endpoint URL
    #[arg(long, env = "OPENFIBER_API_URL", default_value = "http://localhost:8080/api/v1")]
    api_url: String,

    /// Output format
    #[arg(long, short, default_value = "table")]
    format: output::OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Invoice generation and payments
    Billing {
        #[command(subcommand)]
        action: BillingCommands,
    },
    /// Grace-period suspension control
    Suspension {
        #[command(subcommand)]
        action: SuspensionCommands,
    },
}

#[derive(Subcommand)]
enum BillingCommands {
    /// Run the monthly invoice batch
    Run,
    /// Preview a first-month proration
    Preview {
        /// Activation date, e.g. 2024-06-20
        #[arg(long)]
        activation_date: String,
        /// Package price in whole currency units
        #[arg(long)]
        price: i64,
        /// Billing period unit: months or days
        #[arg(long, default_value = "months")]
        unit: String,
    },
    /// Record an invoice payment
    Pay { invoice_id: String },
}

#[derive(Subcommand)]
enum SuspensionCommands {
    /// Run the suspension cycle (no-op off the suspension day)
    Run,
    /// Disable one subscriber's PPP account, by id or name substring
    Suspend { pattern: String },
    /// Re-enable one subscriber's PPP account, by id or name substring
    Reinstate { pattern: String },
    /// Show the device-side PPP account state
    Status { pattern: String },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let client = commands::ApiClient::new(&cli.api_url);

    let result = match cli.command {
        Commands::Billing { action } => commands::billing::handle(action, &client, cli.format).await,
        Commands::Suspension { action } => {
            commands::suspension::handle(action, &client, cli.format).await
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
