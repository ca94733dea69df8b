use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use fieldlog_core::config::StorageBackend;
use fieldlog_core::{EventType, SyncStatus};

#[derive(Parser)]
#[command(name = "fieldlog")]
#[command(about = "Record field events offline and sync them when a connection is available")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to the CLI config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Directory holding local event storage
    #[arg(long, global = true, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Keep every change local; never contact the events API
    #[arg(long, global = true)]
    pub offline: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Record a new event
    #[command(alias = "new")]
    Add {
        /// Identifier of the object the event concerns
        #[arg(long, value_name = "ID")]
        object: String,
        /// Event type
        #[arg(long = "type", short = 't', value_enum)]
        kind: EventKind,
        /// When it happened (RFC 3339); defaults to now
        #[arg(long, value_name = "TIMESTAMP")]
        occurred_at: Option<String>,
        /// Reference to an attached photo
        #[arg(long, value_name = "URI")]
        photo: Option<String>,
        /// Event comment; read from stdin when omitted
        comment: Vec<String>,
    },
    /// List recorded events
    List {
        /// Only show events with this sync status
        #[arg(long, value_enum)]
        status: Option<StatusFilter>,
        /// Number of events to show (most recent first)
        #[arg(short, long)]
        limit: Option<usize>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show a single event
    Show {
        /// Event ID or unique ID prefix
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Edit an existing event
    Edit {
        /// Event ID or unique ID prefix
        id: String,
        /// New comment
        #[arg(long)]
        comment: Option<String>,
        /// New object identifier
        #[arg(long, value_name = "ID")]
        object: Option<String>,
        /// New event type
        #[arg(long = "type", short = 't', value_enum)]
        kind: Option<EventKind>,
        /// New occurrence time (RFC 3339)
        #[arg(long, value_name = "TIMESTAMP")]
        occurred_at: Option<String>,
        /// New photo reference
        #[arg(long, value_name = "URI", conflicts_with = "clear_photo")]
        photo: Option<String>,
        /// Remove the photo reference
        #[arg(long)]
        clear_photo: bool,
    },
    /// Delete an event locally
    Delete {
        /// Event ID or unique ID prefix
        id: String,
    },
    /// Push every unconfirmed event to the events API
    Sync,
    /// Reset an event's attempt budget and push it again
    Retry {
        /// Event ID or unique ID prefix
        id: String,
    },
    /// Show sync status counts
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Export events
    Export {
        /// Export format
        #[arg(long, value_enum, default_value_t = ExportFormat::Json)]
        format: ExportFormat,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
    /// Stay running and sync whenever the events API becomes reachable
    Watch,
    /// Manage the CLI configuration file
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum EventKind {
    Accident,
    Service,
    Transfer,
}

impl From<EventKind> for EventType {
    fn from(kind: EventKind) -> Self {
        match kind {
            EventKind::Accident => Self::Accident,
            EventKind::Service => Self::Service,
            EventKind::Transfer => Self::Transfer,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum StatusFilter {
    Pending,
    Sent,
    Failed,
}

impl From<StatusFilter> for SyncStatus {
    fn from(filter: StatusFilter) -> Self {
        match filter {
            StatusFilter::Pending => Self::Pending,
            StatusFilter::Sent => Self::Sent,
            StatusFilter::Failed => Self::Failed,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum ExportFormat {
    Json,
    Markdown,
}

impl From<ExportFormat> for fieldlog_core::export::ExportFormat {
    fn from(format: ExportFormat) -> Self {
        match format {
            ExportFormat::Json => Self::Json,
            ExportFormat::Markdown => Self::Markdown,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum StorageKind {
    File,
    Libsql,
    Memory,
}

impl From<StorageKind> for StorageBackend {
    fn from(kind: StorageKind) -> Self {
        match kind {
            StorageKind::File => Self::File,
            StorageKind::Libsql => Self::LibSql,
            StorageKind::Memory => Self::Memory,
        }
    }
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Create or update the config file
    Init {
        /// Base URL of the events API
        #[arg(long, value_name = "URL")]
        api_url: Option<String>,
        /// Health endpoint probed for connectivity (defaults to {api-url}/health)
        #[arg(long, value_name = "URL")]
        health_url: Option<String>,
        /// Storage backend
        #[arg(long, value_enum)]
        storage: Option<StorageKind>,
        /// Attempts before an event is left for manual retry
        #[arg(long, value_name = "N")]
        max_retry_attempts: Option<u32>,
        /// Start from defaults instead of the existing file
        #[arg(long)]
        reset: bool,
    },
    /// Print the effective configuration
    Show,
}
