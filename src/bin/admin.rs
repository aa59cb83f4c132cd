//! CLI administration tool for shortcode-service.
//!
//! Runs maintenance operations against the configured store and cache
//! without requiring HTTP API access.
//!
//! # Usage
//!
//! ```bash
//! # List dead links still present in the store
//! cargo run --bin admin -- expired list
//!
//! # Delete them (asks for confirmation unless -y)
//! cargo run --bin admin -- expired purge -y
//!
//! # Usage statistics of one link
//! cargo run --bin admin -- stats abc123
//!
//! # Re-derive the popularity ranking from the store
//! cargo run --bin admin -- popular rebuild --limit 500
//!
//! # Check database connection
//! cargo run --bin admin -- db check
//! ```
//!
//! # Environment Variables
//!
//! Same as the server (see `shortcode_service::config`). A PostgreSQL store
//! is required; `popular rebuild` also requires Redis.

use shortcode_service::application::services::LinkService;
use shortcode_service::config::{self, Config};
use shortcode_service::domain::entities::Link;
use shortcode_service::domain::repositories::LinkRepository;
use shortcode_service::infrastructure::persistence::PgLinkRepository;
use shortcode_service::server::{build_caches, connect_database};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use dialoguer::Confirm;
use std::sync::Arc;

/// CLI tool for managing shortcode-service.
#[derive(Parser)]
#[command(name = "admin")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Top-level command groups.
#[derive(Subcommand)]
enum Commands {
    /// Inspect or purge expired links
    Expired {
        #[command(subcommand)]
        action: ExpiredAction,
    },

    /// Show usage statistics of a link
    Stats {
        /// Short code or custom alias
        code: String,
    },

    /// Maintain the popularity ranking
    Popular {
        #[command(subcommand)]
        action: PopularAction,
    },

    /// Database operations
    Db {
        #[command(subcommand)]
        action: DbAction,
    },
}

/// Expired link subcommands.
#[derive(Subcommand)]
enum ExpiredAction {
    /// List expired links without deleting them
    List,

    /// Delete every expired link
    Purge {
        /// Skip confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },
}

/// Popularity ranking subcommands.
#[derive(Subcommand)]
enum PopularAction {
    /// Replace the ranking with the most used links from the store
    Rebuild {
        /// Number of links to rank
        #[arg(short, long, default_value_t = 1000)]
        limit: usize,
    },
}

/// Database operation subcommands.
#[derive(Subcommand)]
enum DbAction {
    /// Check database connection
    Check,
}

type AdminService = LinkService<dyn LinkRepository>;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = config::load_from_env().context("Invalid configuration")?;

    let database_url = config
        .database_url
        .clone()
        .context("DATABASE_URL (or DB_USER/DB_PASSWORD/DB_NAME) must be set")?;
    let pool = Arc::new(connect_database(&config, &database_url).await?);

    match cli.command {
        Commands::Db {
            action: DbAction::Check,
        } => check_database(&pool).await?,
        Commands::Expired { action } => {
            let service = build_service(&config, pool).await;
            match action {
                ExpiredAction::List => list_expired(&service).await?,
                ExpiredAction::Purge { yes } => purge_expired(&service, yes).await?,
            }
        }
        Commands::Stats { code } => {
            let service = build_service(&config, pool).await;
            show_stats(&service, &code).await?;
        }
        Commands::Popular {
            action: PopularAction::Rebuild { limit },
        } => {
            anyhow::ensure!(
                config.is_redis_enabled(),
                "popular rebuild needs REDIS_URL: the in-process ranking lives inside the server"
            );
            let service = build_service(&config, pool).await;
            rebuild_popularity(&service, limit).await?;
        }
    }

    Ok(())
}

async fn build_service(config: &Config, pool: Arc<sqlx::PgPool>) -> AdminService {
    let repository: Arc<dyn LinkRepository> = Arc::new(PgLinkRepository::new(pool));
    let (cache, popularity) = build_caches(config).await;

    LinkService::new(repository, cache, popularity, config.link_settings())
}

fn print_links(links: &[Link]) {
    println!(
        "  {:<34} {:<20} {:>6}  {}",
        "Code".bright_white().bold(),
        "Expired at".bright_white().bold(),
        "Uses".bright_white().bold(),
        "Target".bright_white().bold()
    );
    println!("  {}", "-".repeat(90).bright_black());

    for link in links {
        let expired_at = link
            .expires_at
            .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());

        println!(
            "  {:<34} {:<20} {:>6}  {}",
            link.code.cyan(),
            expired_at.bright_black(),
            link.use_count,
            link.target_url
        );
    }
}

/// Lists dead links; nothing is deleted.
async fn list_expired(service: &AdminService) -> Result<()> {
    println!("{}", "Expired links".bright_blue().bold());
    println!();

    let links = service.list_expired().await?;
    if links.is_empty() {
        println!("{}", "  No expired links".green());
        return Ok(());
    }

    print_links(&links);
    println!();
    println!("  Total: {}", links.len().to_string().bright_white().bold());
    println!();

    Ok(())
}

/// Deletes dead links after confirmation.
///
/// Cached snapshots and ranking entries of purged codes are dropped too.
async fn purge_expired(service: &AdminService, skip_confirm: bool) -> Result<()> {
    println!("{}", "Purge expired links".bright_blue().bold());
    println!();

    let pending = service.list_expired().await?.len();
    if pending == 0 {
        println!("{}", "  Nothing to purge".green());
        return Ok(());
    }

    if !skip_confirm {
        let confirmed = Confirm::new()
            .with_prompt(format!("Delete {} expired link(s)?", pending))
            .default(false)
            .interact()?;

        if !confirmed {
            println!("{}", "Cancelled".red());
            return Ok(());
        }
    }

    let purged = service.purge_expired().await?;

    println!();
    println!(
        "{} {}",
        "Purged:".green().bold(),
        purged.to_string().bright_white().bold()
    );
    println!();

    Ok(())
}

/// Prints the usage snapshot of one live link.
async fn show_stats(service: &AdminService, code: &str) -> Result<()> {
    let stats = service.stats(code).await?;

    println!("{}", "Link statistics".bright_blue().bold());
    println!();
    println!("  Code:       {}", stats.code.cyan());
    println!("  Target:     {}", stats.target_url);
    println!(
        "  Uses:       {}",
        stats.use_count.to_string().bright_green().bold()
    );
    println!(
        "  Created:    {}",
        stats.created_at.format("%Y-%m-%d %H:%M:%S")
    );
    println!(
        "  Last used:  {}",
        stats
            .last_used_at
            .map(|at| at.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "never".to_string())
    );
    println!(
        "  Expires:    {}",
        stats
            .expires_at
            .map(|at| at.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "never".to_string())
    );
    println!();

    Ok(())
}

async fn rebuild_popularity(service: &AdminService, limit: usize) -> Result<()> {
    println!("{}", "Rebuilding popularity ranking...".bright_blue());

    let ranked = service.rebuild_popularity(limit).await?;

    println!(
        "{} {} code(s) ranked",
        "Done:".green().bold(),
        ranked.to_string().bright_white().bold()
    );

    Ok(())
}

/// Checks connectivity and prints link counts.
async fn check_database(pool: &sqlx::PgPool) -> Result<()> {
    println!("{}", "Checking database connection...".bright_blue());

    sqlx::query("SELECT 1").fetch_one(pool).await?;

    let links: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM links")
        .fetch_one(pool)
        .await?;
    let expired: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM links WHERE expires_at IS NOT NULL AND expires_at < NOW()")
            .fetch_one(pool)
            .await?;

    println!("{}", "Database connection OK".green().bold());
    println!();
    println!("  Links:   {}", links.to_string().bright_green().bold());
    println!("  Expired: {}", expired.to_string().bright_yellow().bold());
    println!();

    Ok(())
}
