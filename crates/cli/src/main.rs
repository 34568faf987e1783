//! `cm-cli`: operator tasks for Commission Manager.
//!
//! ```bash
//! cm-cli migrate
//! cm-cli overview --shop demo.myshopify.com
//! cm-cli shop redact --shop demo.myshopify.com
//! ```
//!
//! Every command reads `DATABASE_URL` (a `.env` file is honoured).
//! `shop redact` performs the same erasure as the `shop/redact` webhook.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use commission_manager_core::ShopDomain;
use serde::Serialize;

mod commands;

use commands::CommandError;

#[derive(Parser)]
#[command(name = "cm-cli", author, version, about = "Commission Manager operator tools")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Apply pending database migrations
    Migrate,
    /// Print a shop's commission overview as JSON
    Overview(ShopArg),
    /// Installed shop maintenance
    #[command(subcommand)]
    Shop(ShopCommand),
}

#[derive(Subcommand)]
enum ShopCommand {
    /// Delete a shop together with its commissions
    Redact(ShopArg),
}

#[derive(Args)]
struct ShopArg {
    /// Shop domain, e.g. `demo.myshopify.com`
    #[arg(short, long, value_parser = ShopDomain::parse)]
    shop: ShopDomain,
}

#[allow(clippy::print_stdout)]
fn print_json(value: &impl Serialize) -> Result<(), CommandError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run(command: Command) -> Result<(), CommandError> {
    match command {
        Command::Migrate => commands::migrate::run().await,
        Command::Overview(ShopArg { shop }) => print_json(&commands::shop::overview(&shop).await?),
        Command::Shop(ShopCommand::Redact(ShopArg { shop })) => {
            print_json(&commands::shop::redact(shop).await?)
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cm_cli=info,commission_manager_admin=info".into()),
        )
        .init();

    match run(Cli::parse().command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            ExitCode::FAILURE
        }
    }
}
