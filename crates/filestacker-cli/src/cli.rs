use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use filestacker_core::models::ThemeMode;

#[derive(Parser)]
#[command(name = "filestacker")]
#[command(about = "Manage your FileStacker files from the command line")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// CLI profile name
    #[arg(long, global = true, value_name = "NAME")]
    pub profile: Option<String>,

    /// Backend API base URL (overrides env and profile)
    #[arg(long, global = true, value_name = "URL")]
    pub api_url: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sign in, register, or sign out
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },
    /// List files in your organization
    #[command(alias = "ls")]
    List {
        /// Only show files whose name matches
        #[arg(short, long)]
        search: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show details for one file
    Show {
        /// File ID or unique ID prefix
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Upload one or more files, in order
    Upload {
        /// Files to upload
        #[arg(required = true, value_name = "PATH")]
        paths: Vec<PathBuf>,
    },
    /// Open a file in the system viewer
    Open {
        /// File ID or unique ID prefix
        id: String,
    },
    /// Download a file
    Download {
        /// File ID or unique ID prefix
        id: String,
        /// Destination directory (current directory when omitted)
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,
    },
    /// Delete a file
    #[command(alias = "rm")]
    Delete {
        /// File ID or unique ID prefix
        id: String,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Rename a file
    Rename {
        /// File ID or unique ID prefix
        id: String,
        /// New filename
        name: String,
    },
    /// Keep the file list on screen, refreshing periodically
    Watch {
        /// Refresh interval in seconds
        #[arg(long, value_name = "SECS")]
        interval: Option<u64>,
        /// Only show files whose name matches
        #[arg(short, long)]
        search: Option<String>,
    },
    /// Show storage statistics
    Stats {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show or change account settings
    Settings {
        #[command(subcommand)]
        command: SettingsCommands,
    },
    /// Configure CLI profiles
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum ThemeArg {
    Light,
    Dark,
}

impl From<ThemeArg> for ThemeMode {
    fn from(value: ThemeArg) -> Self {
        match value {
            ThemeArg::Light => Self::Light,
            ThemeArg::Dark => Self::Dark,
        }
    }
}

#[derive(Subcommand)]
pub enum AuthCommands {
    /// Sign in and store the session in the keychain
    Login {
        /// Account email
        #[arg(long, value_name = "EMAIL")]
        email: String,
        /// Account password
        #[arg(long, value_name = "PASSWORD")]
        password: String,
    },
    /// Create an account and sign in
    Register {
        /// Account email
        #[arg(long, value_name = "EMAIL")]
        email: String,
        /// Account password
        #[arg(long, value_name = "PASSWORD")]
        password: String,
        /// Display name
        #[arg(long, value_name = "NAME")]
        name: String,
        /// Organization name
        #[arg(long, value_name = "ORG")]
        org: String,
    },
    /// Show who the profile is signed in as
    Status,
    /// Sign out and clear the stored session
    Logout,
}

#[derive(Subcommand)]
pub enum SettingsCommands {
    /// Show current settings
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Change settings
    Set {
        /// Color theme
        #[arg(long, value_enum)]
        theme: Option<ThemeArg>,
        /// Enable or disable notifications
        #[arg(long, value_name = "BOOL")]
        notifications: Option<bool>,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Initialize or update a profile (selected with --profile)
    Init {
        /// Backend API base URL
        #[arg(long, value_name = "URL")]
        api_base_url: Option<String>,
        /// Catalog refresh interval for `watch`, in seconds
        #[arg(long, value_name = "SECS")]
        poll_interval: Option<u64>,
        /// Keep current active profile instead of activating this one
        #[arg(long)]
        no_activate: bool,
    },
    /// Show the resolved configuration
    Show,
}
