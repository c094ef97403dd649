//! # Fieldbox CLI Module
//!
//! This module implements the CLI interface for Fieldbox.
//!
//! ## Available Commands
//!
//! - `inspect` - Show the records, catalog and load diagnostics of a document
//! - `import` - Add text files or `.box` files to a document
//! - `resave` - Load and save a document, assigning any missing paths
//! - `init` - Create the workspace, a config file and an empty document
//! - `catalog` - Show the file-backed and persisted property registrations

mod commands;

use crate::config::Config;
use clap::{Parser, Subcommand};
use fieldbox_core::FieldboxError;
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Fieldbox - box graph documents
///
/// Saves and loads live-coding box graphs as a workspace of plain files.
#[derive(Parser, Debug)]
#[command(name = "fieldbox")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the configuration file (default: ./fieldbox.toml if present)
    #[arg(short = 'c', long, global = true)]
    pub config: Option<PathBuf>,

    /// Workspace directory, overriding the configuration
    #[arg(short = 'W', long, global = true)]
    pub workspace: Option<PathBuf>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the contents of a document
    Inspect {
        /// Document path (token or literal); defaults to the configured document
        #[arg(short, long)]
        document: Option<String>,
    },

    /// Import files into a document as children of its root
    Import {
        /// Files to import; `.box` files are loaded as whole boxes
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Document path (token or literal); defaults to the configured document
        #[arg(short, long)]
        document: Option<String>,
    },

    /// Load a document and save it again
    Resave {
        /// Document path (token or literal); defaults to the configured document
        #[arg(short, long)]
        document: Option<String>,
    },

    /// Initialize a workspace with a config file and an empty document
    Init {
        /// Overwrite an existing document
        #[arg(short, long)]
        force: bool,
    },

    /// Show property registrations
    Catalog {
        /// Also show the catalog stored in this document
        #[arg(short, long)]
        document: Option<String>,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub fn execute(cli: Cli) -> Result<(), FieldboxError> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(workspace) = cli.workspace {
        config.workspace = workspace;
    }
    let json_mode = cli.json_mode;
    let verbose = cli.verbose;

    match cli.command {
        Some(Commands::Inspect { document }) => {
            let path = document.unwrap_or_else(|| config.document.clone());
            cmd_inspect(&config, &path, json_mode, verbose)
        }
        Some(Commands::Import { files, document }) => {
            let path = document.unwrap_or_else(|| config.document.clone());
            cmd_import(&config, &path, &files, json_mode)
        }
        Some(Commands::Resave { document }) => {
            let path = document.unwrap_or_else(|| config.document.clone());
            cmd_resave(&config, &path, json_mode)
        }
        Some(Commands::Init { force }) => cmd_init(&config, cli.config.as_deref(), force),
        Some(Commands::Catalog { document }) => cmd_catalog(&config, document.as_deref(), json_mode),
        None => {
            // No subcommand - inspect the configured document
            let path = config.document.clone();
            cmd_inspect(&config, &path, json_mode, verbose)
        }
    }
}
