use anyhow::Result;
use clap::{Parser, Subcommand};
use chrono::Utc;
use serde::Serialize;
use std::time::Duration;

use linkpulse::analytics::{normalize_referrer, parse_user_agent, BotClassifier, ParsedUserAgent};
use linkpulse::config::Config;
use linkpulse::health::LinkHealthProber;
use linkpulse::storage;

#[derive(Parser)]
#[command(name = "linkpulse-admin")]
#[command(about = "LinkPulse maintenance CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify a request the way the redirect path would
    Classify {
        /// Raw User-Agent header
        #[arg(long)]
        user_agent: String,
        /// Raw cf-bot-management JSON, if any
        #[arg(long)]
        bot_management: Option<String>,
        /// Referer header, if any
        #[arg(long)]
        referrer: Option<String>,
        /// Domain the short link is served on
        #[arg(long, default_value = "")]
        domain: String,
    },
    /// Run a single health probe against a URL
    Probe {
        url: String,
        /// Probe timeout in milliseconds
        #[arg(long, default_value_t = 10_000)]
        timeout_ms: u64,
        /// Responses slower than this are degraded
        #[arg(long, default_value_t = 5_000)]
        slow_ms: u64,
    },
    /// List links currently due for a health check
    Due {
        #[arg(long, default_value_t = 50)]
        limit: i64,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Classification {
    #[serde(flatten)]
    user_agent: ParsedUserAgent,
    bot_verdict: bool,
    referrer_domain: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Classify {
            user_agent,
            bot_management,
            referrer,
            domain,
        } => {
            let classification = Classification {
                bot_verdict: BotClassifier::default()
                    .is_bot(Some(&user_agent), bot_management.as_deref()),
                referrer_domain: normalize_referrer(referrer.as_deref(), &domain),
                user_agent: parse_user_agent(&user_agent),
            };
            println!("{}", serde_json::to_string_pretty(&classification)?);
        }
        Commands::Probe {
            url,
            timeout_ms,
            slow_ms,
        } => {
            let prober = LinkHealthProber::new(
                Duration::from_millis(timeout_ms),
                Duration::from_millis(slow_ms),
            )?;
            let result = prober.probe(&url).await;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Commands::Due { limit } => {
            let config = Config::from_env()?;
            let storage = storage::connect(&config.database).await?;
            storage.init().await?;

            let now = Utc::now();
            let due = storage.find_due_for_health_check(now, limit).await?;
            if due.is_empty() {
                println!("No links due for a health check");
            }
            for link in &due {
                println!(
                    "{}  {}/{}  status={}  last_checked={}  -> {}",
                    link.id,
                    link.domain,
                    link.slug,
                    link.status(),
                    link.last_checked_at()
                        .map(|t| t.to_rfc3339())
                        .unwrap_or_else(|| "never".to_string()),
                    link.destination_url
                );
            }
        }
    }

    Ok(())
}
