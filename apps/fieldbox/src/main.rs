//! # Fieldbox - document tool
//!
//! The command-line front end for Fieldbox box graph documents.
//!
//! This application provides:
//! - Inspection of saved documents and their load diagnostics
//! - Import of text files and `.box` files into a document
//! - Workspace initialization and document normalization
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │           apps/fieldbox (THE BINARY)         │
//! │                                              │
//! │   ┌─────────────┐        ┌──────────────┐    │
//! │   │    CLI      │───────▶│ fieldbox.toml│    │
//! │   │   (clap)    │        │   (toml)     │    │
//! │   └──────┬──────┘        └──────────────┘    │
//! │          ▼                                   │
//! │   ┌───────────────┐                          │
//! │   │ fieldbox-core │                          │
//! │   │ (THE ENGINE)  │                          │
//! │   └───────────────┘                          │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! fieldbox init
//! fieldbox import sketch.js shader.box
//! fieldbox inspect --verbose
//! fieldbox --json-mode catalog
//! ```

use clap::Parser;
use fieldbox::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

fn main() {
    // Initialize tracing — FIELDBOX_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("FIELDBOX_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "fieldbox=info,fieldbox_core=info".into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    // Parse CLI arguments
    let cli = cli::Cli::parse();

    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    // Execute command
    if let Err(e) = cli::execute(cli) {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Print the Fieldbox startup banner.
fn print_banner() {
    println!("fieldbox v{} - box graph documents", env!("CARGO_PKG_VERSION"));
    println!();
}
