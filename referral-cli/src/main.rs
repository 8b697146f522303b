use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use referral_shared::api::HttpReferralApi;
use referral_shared::config::ClientConfig;
use std::sync::Arc;

mod commands;
mod errors;

#[derive(Debug, Parser)]
#[command(
    name = "referral",
    about = "Register users under an invitor and inspect the invitation tree."
)]
struct Cli {
    /// Base URL of the referral API
    #[arg(long, global = true, env = "REFERRAL_API_BASE")]
    api_base: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Register a new user under an invitor
    Register {
        /// Id of the inviting user
        #[arg(long)]
        invitor: Option<String>,
        /// Id for the new user
        #[arg(long)]
        id: String,
        /// Display name for the new user
        #[arg(long)]
        name: String,
        /// Print the tree before and after registering
        #[arg(long)]
        show_tree: bool,
    },
    /// Print the invitation tree with its member counts
    Tree,
    /// Print the member counts as JSON
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let mut config = ClientConfig::from_env().context("Invalid client configuration")?;
    if let Some(api_base) = &cli.api_base {
        config = config
            .with_api_base(api_base)
            .context("Invalid --api-base")?;
    }
    info!("Using referral API at {}", config.api_base);

    let api = Arc::new(HttpReferralApi::new(&config).context("Failed to build HTTP client")?);

    match cli.command {
        Command::Register {
            invitor,
            id,
            name,
            show_tree,
        } => {
            let input = commands::RegisterInput {
                invitor_id: invitor,
                user_id: id,
                name,
                show_tree,
            };
            let mut stdout = std::io::stdout();
            commands::register(api, &config, input, &mut stdout).await?;
        }
        Command::Tree => {
            let outline = commands::tree(api, &config).await?;
            print!("{}", outline);
        }
        Command::Stats => {
            let stats = commands::stats(api, &config).await?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
    }

    Ok(())
}
