//! Subtrack CLI
//!
//! Command-line front end for the subscription tracker:
//! - Sign in, register, sign out
//! - List, add, upload and delete subscriptions
//! - Show totals, the monthly cost chart, savings and upcoming renewals

use anyhow::{anyhow, Context};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use subtrack::auth::{self, Credentials, Registration};
use subtrack::config::{generate_default_config, Config};
use subtrack::derive::{
    chart_series, format_long_date, round_money, savings_projections, upcoming_renewals,
    SavingsPolicy,
};
use subtrack::gateway::Gateway;
use subtrack::session::{FileTokenStore, SessionStore};
use subtrack::subscriptions::{
    BulkUploadFile, CsvPreview, NewSubscription, RenewalType, Subscription, SubscriptionId,
    SubscriptionRepository,
};
use subtrack::ClientError;

#[derive(Parser)]
#[command(name = "subtrack")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Track personal subscriptions and what they cost")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: search the user config dir, then ./config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Backend URL, overrides the config file
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Output format (table, json)
    #[arg(short, long, default_value = "table", global = true)]
    pub format: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sign in and store the token
    Login {
        username: String,
        #[arg(long, env = "SUBTRACK_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Create an account and sign in
    Register {
        username: String,
        #[arg(long, env = "SUBTRACK_PASSWORD", hide_env_values = true)]
        password: Option<String>,
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
    },

    /// Erase the stored token
    Logout,

    /// Show the signed-in user
    Whoami,

    /// List subscriptions
    List,

    /// Backend totals alongside locally computed ones
    Stats,

    /// Add a subscription
    Add {
        name: String,
        /// Cost per renewal period, e.g. 15.99
        cost: String,
        /// Start date (YYYY-MM-DD)
        date: Option<NaiveDate>,
        /// Renewal type (monthly, yearly)
        #[arg(short, long, default_value = "monthly")]
        renewal: RenewalType,
    },

    /// Bulk import from a CSV file
    Upload {
        /// Path to a CSV with name,cost,subscription_date,renewal_type
        path: PathBuf,
        /// Parse locally and show what would be imported
        #[arg(long)]
        dry_run: bool,
    },

    /// Delete a subscription
    Delete { id: SubscriptionId },

    /// Monthly-equivalent cost per subscription
    Chart,

    /// Savings from switching monthly plans to yearly billing
    Savings,

    /// Subscriptions renewing within the next 7 days
    Upcoming,

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::load_default(),
    };
    if let Some(url) = &cli.api_url {
        config.api.base_url = url.clone();
    }

    init_logging(&config);

    if let Commands::Config { output } = &cli.command {
        return write_default_config(output.as_ref());
    }

    let gateway = Gateway::new(&config.api).map_err(|e| report(e, "Failed to create HTTP client"))?;
    let mut session = SessionStore::new(FileTokenStore::new(config.session.token_path()));
    session.initialize(&gateway).await;

    let json = cli.format == "json";

    match cli.command {
        Commands::Login { username, password } => {
            let credentials = Credentials::new(username, require_password(password)?);
            let user = auth::login(&mut session, &gateway, &credentials)
                .await
                .map_err(|e| report(e, "Login failed"))?;
            println!("Logged in as {}", user.display_name());
        }

        Commands::Register {
            username,
            password,
            first_name,
            last_name,
        } => {
            let mut registration = Registration::new(username, require_password(password)?);
            if let Some(first) = first_name {
                registration = registration.first_name(first);
            }
            if let Some(last) = last_name {
                registration = registration.last_name(last);
            }

            let user = auth::register(&mut session, &gateway, &registration)
                .await
                .map_err(|e| report(e, "Registration failed"))?;
            println!("Registered and logged in as {}", user.display_name());
        }

        Commands::Logout => {
            session.logout().await.map_err(|e| report(e, "Logout failed"))?;
            println!("Logged out");
        }

        Commands::Whoami => match session.user() {
            Some(user) if json => println!("{}", serde_json::to_string_pretty(user)?),
            Some(user) => println!("{} ({})", user.display_name(), user.username),
            None => println!("Not logged in"),
        },

        Commands::List => {
            let mut repo = repository(&session, &gateway, &config)?;
            repo.list()
                .await
                .map_err(|e| report(e, "Failed to load subscriptions"))?;

            if json {
                println!("{}", serde_json::to_string_pretty(repo.subscriptions())?);
            } else {
                print_subscriptions(repo.subscriptions());
            }
        }

        Commands::Stats => {
            let mut repo = repository(&session, &gateway, &config)?;
            repo.list()
                .await
                .map_err(|e| report(e, "Failed to load subscriptions"))?;
            let stats = repo
                .stats()
                .await
                .map_err(|e| report(e, "Failed to load stats"))?;
            let totals = repo.local_totals();

            if json {
                let body = serde_json::json!({ "backend": stats, "local": totals });
                println!("{}", serde_json::to_string_pretty(&body)?);
            } else {
                println!("Subscriptions: {}", repo.subscriptions().len());
                println!();
                println!("{:<10} {:>12} {:>12}", "", "Monthly", "Yearly");
                println!("{}", "-".repeat(36));
                println!(
                    "{:<10} {:>12} {:>12}",
                    "Backend",
                    money(stats.monthly_cost),
                    money(stats.yearly_cost)
                );
                println!(
                    "{:<10} {:>12} {:>12}",
                    "Local",
                    money(totals.total_monthly),
                    money(totals.total_annual)
                );
            }
        }

        Commands::Add {
            name,
            cost,
            date,
            renewal,
        } => {
            let mut input = NewSubscription::new(name, cost).renewal_type(renewal);
            if let Some(date) = date {
                input = input.subscription_date(date);
            }

            let mut repo = repository(&session, &gateway, &config)?;
            repo.list()
                .await
                .map_err(|e| report(e, "Failed to load subscriptions"))?;
            let created = repo
                .create(&input)
                .await
                .map_err(|e| report(e, "Failed to add subscription"))?;

            if json {
                println!("{}", serde_json::to_string_pretty(&created)?);
            } else {
                println!(
                    "Added {} (id {}), renews {}",
                    created.name,
                    created.id,
                    format_long_date(created.renewal_date)
                );
                println!("Monthly total: {}", money(repo.local_totals().total_monthly));
            }
        }

        Commands::Upload { path, dry_run } => {
            let file = BulkUploadFile::from_path(&path)
                .await
                .map_err(|e| report(e, "Failed to read file"))?;
            let preview = file.preview().map_err(|e| report(e, "Failed to parse file"))?;

            if dry_run {
                print!("{}", render_preview(&preview, json, true)?);
                return Ok(());
            }
            if !json {
                print!("{}", render_preview(&preview, false, false)?);
            }

            let mut repo = repository(&session, &gateway, &config)?;
            let result = repo
                .bulk_upload(file)
                .await
                .map_err(|e| report(e, "Upload failed"))?;

            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!();
                println!(
                    "{}",
                    result["message"].as_str().unwrap_or("Upload complete")
                );
                println!("Subscriptions now: {}", repo.subscriptions().len());
            }
        }

        Commands::Delete { id } => {
            let mut repo = repository(&session, &gateway, &config)?;
            repo.list()
                .await
                .map_err(|e| report(e, "Failed to load subscriptions"))?;
            let totals = repo
                .delete(id)
                .await
                .map_err(|e| report(e, "Failed to delete subscription"))?;

            if json {
                println!("{}", serde_json::to_string_pretty(&totals)?);
            } else {
                println!("Deleted subscription {}", id);
                println!(
                    "Monthly total: {}  Yearly total: {}",
                    money(totals.total_monthly),
                    money(totals.total_annual)
                );
            }
        }

        Commands::Chart => {
            let mut repo = repository(&session, &gateway, &config)?;
            repo.list()
                .await
                .map_err(|e| report(e, "Failed to load subscriptions"))?;
            let series = chart_series(repo.subscriptions());

            if json {
                println!("{}", serde_json::to_string_pretty(&series)?);
            } else if series.is_empty() {
                println!("No subscriptions yet.");
            } else {
                let max = series
                    .iter()
                    .map(|p| p.monthly_cost)
                    .max()
                    .unwrap_or_default();

                for point in &series {
                    println!(
                        "{:<24} {:>10} {}",
                        point.name,
                        money(point.monthly_cost),
                        bar(point.monthly_cost, max)
                    );
                }
            }
        }

        Commands::Savings => {
            let mut repo = repository(&session, &gateway, &config)?;
            repo.list()
                .await
                .map_err(|e| report(e, "Failed to load subscriptions"))?;
            let policy = SavingsPolicy::new(config.savings.yearly_discount);
            let projections = savings_projections(repo.subscriptions(), policy);

            if json {
                println!("{}", serde_json::to_string_pretty(&projections)?);
            } else if projections.is_empty() {
                println!("No monthly subscriptions to switch.");
            } else {
                println!(
                    "{:<24} {:>10} {:>12} {:>14} {:>10}",
                    "Name", "Monthly", "Yearly", "With discount", "Savings"
                );
                println!("{}", "-".repeat(74));
                for p in &projections {
                    println!(
                        "{:<24} {:>10} {:>12} {:>14} {:>10}",
                        p.name,
                        money(p.monthly_cost),
                        money(p.yearly_cost),
                        money(p.potential_yearly_cost),
                        money(p.savings)
                    );
                }
            }
        }

        Commands::Upcoming => {
            let mut repo = repository(&session, &gateway, &config)?;
            repo.list()
                .await
                .map_err(|e| report(e, "Failed to load subscriptions"))?;
            let upcoming = upcoming_renewals(repo.subscriptions());

            if json {
                println!("{}", serde_json::to_string_pretty(&upcoming)?);
            } else if upcoming.is_empty() {
                println!("Nothing renews in the next 7 days.");
            } else {
                for sub in upcoming {
                    println!(
                        "{:<24} {:>10} {}",
                        sub.name,
                        money(sub.cost),
                        format_long_date(sub.renewal_date)
                    );
                }
            }
        }

        // Written before the session is set up
        Commands::Config { .. } => {}
    }

    Ok(())
}

fn init_logging(config: &Config) {
    let filter = std::env::var("RUST_LOG")
        .ok()
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(format!("subtrack={}", config.logging.level)));

    let json = config.logging.format == "json";

    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr)))
        .with((!json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr)))
        .init();
}

fn write_default_config(output: Option<&PathBuf>) -> anyhow::Result<()> {
    let config = generate_default_config();

    match output {
        Some(path) => {
            // Create parent directory if needed
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, &config)
                .with_context(|| format!("Failed to write config to {:?}", path))?;
            println!("Config written to {:?}", path);
        }
        None => {
            print!("{}", config);
        }
    }

    Ok(())
}

fn repository(
    session: &SessionStore,
    gateway: &Gateway,
    config: &Config,
) -> anyhow::Result<SubscriptionRepository> {
    let authed = session
        .authorized(gateway)
        .map_err(|e| report(e, "Not logged in"))?;

    Ok(SubscriptionRepository::new(authed)
        .refresh_stats_after_mutation(config.api.refresh_stats_after_mutation))
}

fn require_password(password: Option<String>) -> anyhow::Result<String> {
    password.ok_or_else(|| anyhow!("Password required: pass --password or set SUBTRACK_PASSWORD"))
}

/// Log the full error, surface the user-facing message
fn report(err: ClientError, fallback: &str) -> anyhow::Error {
    tracing::debug!(error = %err, "Command failed");
    anyhow!(err.user_message(fallback))
}

fn money(value: Decimal) -> String {
    format!("${}", round_money(value))
}

fn bar(value: Decimal, max: Decimal) -> String {
    const WIDTH: usize = 30;

    if max.is_zero() {
        return String::new();
    }
    let len = (value * Decimal::from(WIDTH) / max)
        .round()
        .to_usize()
        .unwrap_or(0)
        .min(WIDTH);
    "#".repeat(len)
}

/// Local parse result of an upload; JSON mode yields exactly one document
fn render_preview(preview: &CsvPreview, json: bool, list_rows: bool) -> anyhow::Result<String> {
    use std::fmt::Write;

    if json {
        return Ok(format!("{}\n", serde_json::to_string_pretty(preview)?));
    }

    let mut out = String::new();
    writeln!(out, "Rows ready: {}", preview.rows.len())?;
    writeln!(out, "Rows failed: {}", preview.rows_failed)?;
    if !preview.errors.is_empty() {
        writeln!(out)?;
        writeln!(out, "Errors (first 10):")?;
        for error in preview.errors.iter().take(10) {
            writeln!(out, "  {}", error)?;
        }
    }

    if list_rows {
        writeln!(out)?;
        for row in &preview.rows {
            writeln!(
                out,
                "  line {:<4} {:<24} {:>10} {}",
                row.line,
                row.draft.name,
                row.draft.cost,
                row.draft.renewal_type.as_str()
            )?;
        }
        writeln!(out)?;
        writeln!(out, "(Dry run - nothing was uploaded)")?;
    }

    Ok(out)
}

fn print_subscriptions(subs: &[Subscription]) {
    if subs.is_empty() {
        println!("No subscriptions yet.");
        println!();
        println!("Add your first one with:");
        println!("  subtrack add Netflix 15.99 2024-01-15");
        return;
    }

    println!(
        "{:<6} {:<24} {:>10} {:<8} {:<20} {}",
        "ID", "Name", "Cost", "Renews", "Started", "Next renewal"
    );
    println!("{}", "-".repeat(90));

    for sub in subs {
        let marker = if sub.renewing_in_7_days { " *" } else { "" };
        println!(
            "{:<6} {:<24} {:>10} {:<8} {:<20} {}{}",
            sub.id,
            sub.name,
            money(sub.cost),
            sub.renewal_type.as_str(),
            format_long_date(sub.subscription_date),
            format_long_date(sub.renewal_date),
            marker
        );
    }
}
