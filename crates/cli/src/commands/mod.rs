//! CLI subcommands. Each writes its report to the given writer.

pub mod catalog;
pub mod quote;
pub mod sitemap;

use thiserror::Error;

/// Errors reported by any subcommand.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("unknown category: {0} (expected standard, custom, or bulk)")]
    UnknownCategory(String),

    #[error("unknown product: {0}")]
    UnknownProduct(String),

    #[error("invalid quantity in {0:?}")]
    InvalidQuantity(String),

    #[error("{name} has only {available} in stock")]
    InsufficientStock { name: &'static str, available: u32 },

    #[error("content error: {0}")]
    Content(#[from] panel_labels_storefront::content::ContentError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
