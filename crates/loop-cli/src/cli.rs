use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "loopctl")]
#[command(about = "Manage LOOP ordered collections, organisations and CiviCRM sync")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to local database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Ordered collections (SNOMED codes, categories, personas)
    #[command(alias = "c")]
    Collections {
        #[command(subcommand)]
        command: CollectionCommands,
    },
    /// Organisations and their CiviCRM contacts
    #[command(alias = "orgs")]
    Organisations {
        #[command(subcommand)]
        command: OrganisationCommands,
    },
    /// Failed CiviCRM syncs awaiting retry
    FailedSyncs {
        #[command(subcommand)]
        command: FailedSyncCommands,
    },
}

#[derive(Subcommand)]
pub enum CollectionCommands {
    /// List a partition in order
    List {
        /// Partition key, e.g. snomed, category, persona
        partition: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Insert an item, shifting later items down
    Add {
        partition: String,
        name: String,
        /// 1-based position (appends when omitted)
        #[arg(short, long)]
        order: Option<i64>,
    },
    /// Move an item to a new position
    Move {
        /// Item ID
        id: String,
        /// 1-based target position
        order: i64,
    },
    /// Rename an item, optionally moving it
    Rename {
        /// Item ID
        id: String,
        name: String,
        /// 1-based target position (keeps current when omitted)
        #[arg(short, long)]
        order: Option<i64>,
    },
    /// Remove an item and close the gap
    #[command(alias = "rm")]
    Remove {
        /// Item ID
        id: String,
    },
    /// Replace a partition from a JSON file of `{"name": ...}` rows
    Import {
        partition: String,
        #[arg(value_name = "PATH")]
        file: PathBuf,
    },
}

#[derive(Subcommand)]
pub enum OrganisationCommands {
    /// List organisations alphabetically
    List {
        /// Number of organisations to show
        #[arg(short, long, default_value = "25")]
        limit: usize,
        /// Number of organisations to skip
        #[arg(long, default_value = "0")]
        offset: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show an organisation and its CiviCRM sync state
    Show {
        /// Organisation ID
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Create an organisation (syncs to CiviCRM when enabled)
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: String,
        #[command(flatten)]
        profile: ProfileArgs,
        /// Enable CiviCRM sync
        #[arg(long)]
        civi_sync: bool,
    },
    /// Update an organisation; omitted fields keep their value, empty clears
    Update {
        /// Organisation ID
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[command(flatten)]
        profile: ProfileArgs,
        /// Enable or disable CiviCRM sync
        #[arg(long, value_name = "BOOL")]
        civi_sync: Option<bool>,
    },
    /// Delete an organisation and mark its CiviCRM contact deleted
    Delete {
        /// Organisation ID
        id: String,
    },
}

/// Optional organisation profile fields.
#[derive(Args, Debug, Default)]
pub struct ProfileArgs {
    #[arg(long)]
    pub url: Option<String>,
    #[arg(long)]
    pub email: Option<String>,
    #[arg(long)]
    pub phone: Option<String>,
    #[arg(long)]
    pub address_line_1: Option<String>,
    #[arg(long)]
    pub address_line_2: Option<String>,
    #[arg(long)]
    pub address_line_3: Option<String>,
    #[arg(long)]
    pub city: Option<String>,
    #[arg(long)]
    pub county: Option<String>,
    #[arg(long)]
    pub postcode: Option<String>,
    #[arg(long)]
    pub country: Option<String>,
}

#[derive(Subcommand)]
pub enum FailedSyncCommands {
    /// List failed syncs, newest first
    List {
        /// Number of failed syncs to show
        #[arg(short, long, default_value = "25")]
        limit: usize,
        /// Number of failed syncs to skip
        #[arg(long, default_value = "0")]
        offset: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one failed sync
    Show {
        /// Failed sync ID
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Retry a failed sync; success clears all failed syncs of the organisation
    Retry {
        /// Failed sync ID
        id: String,
    },
}
