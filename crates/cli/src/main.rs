//! Panel Labels CLI - catalog inspection, quotes, and sitemap export.
//!
//! # Usage
//!
//! ```bash
//! # List the catalog, optionally one category
//! pl-cli catalog --category bulk
//!
//! # Price a cart: subtotal, tax, shipping, total
//! pl-cli quote residential-40-circuit-kit:2 subpanel-12-circuit-kit
//!
//! # Write sitemap.xml for a deployment
//! pl-cli sitemap --base-url https://panellabels.example > sitemap.xml
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::io;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "pl-cli")]
#[command(author, version, about = "Panel Labels CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List catalog products
    Catalog {
        /// Only show one category (`standard`, `custom`, `bulk`)
        #[arg(short, long)]
        category: Option<String>,
    },
    /// Price a cart from `slug[:quantity]` lines
    Quote {
        /// Cart lines, e.g. `residential-40-circuit-kit:2`
        #[arg(required = true)]
        lines: Vec<String>,
    },
    /// Print sitemap.xml
    Sitemap {
        /// Public base URL of the storefront
        #[arg(short, long, env = "STOREFRONT_BASE_URL")]
        base_url: String,

        /// Content directory whose `pages/*.md` are included
        #[arg(long, env = "STOREFRONT_CONTENT_DIR", default_value = "crates/storefront/content")]
        content_dir: PathBuf,
    },
}

fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt().with_writer(io::stderr).init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), commands::CliError> {
    let mut out = io::stdout().lock();
    match cli.command {
        Commands::Catalog { category } => commands::catalog::run(&mut out, category.as_deref()),
        Commands::Quote { lines } => commands::quote::run(&mut out, &lines),
        Commands::Sitemap {
            base_url,
            content_dir,
        } => commands::sitemap::run(&mut out, &base_url, &content_dir),
    }
}
