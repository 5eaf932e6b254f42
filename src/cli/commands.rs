//! CLI command definitions using clap.
//!
//! Defines the main CLI structure and subcommands:
//! - daemon / sweep: run the publishing and reminder sweeps
//! - schedule / bulk: create schedules from YAML or JSON files
//! - list / status / calendar / suggest: inspect schedules
//! - edit / cancel: change queued schedules

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use cadence::domain::{ContentType, Platform};

/// Cadence - multi-platform content scheduling and publishing
#[derive(Parser, Debug)]
#[command(name = "cadence")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Optional config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}

/// Main subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run sweeps at the configured interval until interrupted
    Daemon {
        /// Stop after this many ticks
        #[arg(long)]
        ticks: Option<u64>,
    },

    /// Run one publishing sweep and one reminder sweep
    Sweep,

    /// Schedule content from a request file
    Schedule {
        /// YAML or JSON schedule request
        file: PathBuf,
    },

    /// Schedule a batch from a bulk request file
    Bulk {
        /// YAML or JSON bulk request
        file: PathBuf,
    },

    /// List schedules
    List {
        /// Only this brand
        #[arg(short, long)]
        brand: Option<String>,

        /// Filter by status (draft, scheduled, publishing, published, failed, cancelled)
        #[arg(short, long)]
        status: Option<String>,

        /// Filter by platform
        #[arg(short, long)]
        platform: Option<Platform>,

        /// Maximum number of rows
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Show a schedule and its per-platform publishing status
    Status {
        /// Schedule ID
        id: String,
    },

    /// Apply an update file to a schedule
    Edit {
        /// Schedule ID
        id: String,

        /// YAML or JSON update
        file: PathBuf,

        /// Editor to attribute and notify
        #[arg(short, long)]
        user: Option<String>,
    },

    /// Cancel a schedule
    Cancel {
        /// Schedule ID
        id: String,

        /// Reason for cancelling
        #[arg(short, long)]
        reason: Option<String>,

        /// User to attribute and notify
        #[arg(short, long)]
        user: Option<String>,
    },

    /// Show a brand's calendar
    Calendar {
        /// Brand ID
        brand: String,

        /// day, week or month
        #[arg(long, default_value = "week")]
        view: String,

        /// First day (YYYY-MM-DD), defaults to today
        #[arg(short, long)]
        date: Option<String>,

        /// IANA timezone, defaults to the configured one
        #[arg(short, long)]
        timezone: Option<String>,
    },

    /// Suggest publication times
    Suggest {
        /// Brand ID
        brand: String,

        /// Target platforms, comma separated
        #[arg(short, long, value_delimiter = ',', required = true)]
        platforms: Vec<Platform>,

        /// Content type
        #[arg(short = 't', long, default_value = "text")]
        content_type: ContentType,

        /// Days ahead to search
        #[arg(long, default_value_t = 7)]
        days: i64,

        /// Number of suggestions
        #[arg(short = 'n', long, default_value_t = 5)]
        count: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_requires_command() {
        assert!(Cli::try_parse_from(["cadence"]).is_err());
    }

    #[test]
    fn test_cli_global_flags() {
        let cli = Cli::try_parse_from(["cadence", "-v", "-c", "/etc/cadence.yml", "sweep"]).unwrap();
        assert!(cli.is_verbose());
        assert_eq!(cli.config.as_ref(), Some(&PathBuf::from("/etc/cadence.yml")));
        assert!(matches!(cli.command, Commands::Sweep));
    }

    #[test]
    fn test_daemon_ticks() {
        let cli = Cli::try_parse_from(["cadence", "daemon", "--ticks", "3"]).unwrap();
        match cli.command {
            Commands::Daemon { ticks } => assert_eq!(ticks, Some(3)),
            _ => panic!("Expected daemon command"),
        }
    }

    #[test]
    fn test_list_with_filters() {
        let cli = Cli::try_parse_from(["cadence", "list", "-b", "acme", "-s", "scheduled", "-p", "twitter"]).unwrap();
        match cli.command {
            Commands::List {
                brand,
                status,
                platform,
                limit,
            } => {
                assert_eq!(brand.as_deref(), Some("acme"));
                assert_eq!(status.as_deref(), Some("scheduled"));
                assert_eq!(platform, Some(Platform::Twitter));
                assert!(limit.is_none());
            }
            _ => panic!("Expected list command"),
        }
    }

    #[test]
    fn test_cancel_with_reason() {
        let cli = Cli::try_parse_from(["cadence", "cancel", "sch-1", "-r", "recalled", "-u", "sam"]).unwrap();
        match cli.command {
            Commands::Cancel { id, reason, user } => {
                assert_eq!(id, "sch-1");
                assert_eq!(reason.as_deref(), Some("recalled"));
                assert_eq!(user.as_deref(), Some("sam"));
            }
            _ => panic!("Expected cancel command"),
        }
    }

    #[test]
    fn test_suggest_parses_platform_list() {
        let cli = Cli::try_parse_from(["cadence", "suggest", "acme", "-p", "twitter,linkedin", "-t", "video"]).unwrap();
        match cli.command {
            Commands::Suggest {
                brand,
                platforms,
                content_type,
                days,
                count,
            } => {
                assert_eq!(brand, "acme");
                assert_eq!(platforms, vec![Platform::Twitter, Platform::Linkedin]);
                assert_eq!(content_type, ContentType::Video);
                assert_eq!(days, 7);
                assert_eq!(count, 5);
            }
            _ => panic!("Expected suggest command"),
        }
    }

    #[test]
    fn test_suggest_rejects_unknown_platform() {
        assert!(Cli::try_parse_from(["cadence", "suggest", "acme", "-p", "myspace"]).is_err());
    }

    #[test]
    fn test_calendar_defaults() {
        let cli = Cli::try_parse_from(["cadence", "calendar", "acme"]).unwrap();
        match cli.command {
            Commands::Calendar { view, date, .. } => {
                assert_eq!(view, "week");
                assert!(date.is_none());
            }
            _ => panic!("Expected calendar command"),
        }
    }

    #[test]
    fn test_help_works() {
        Cli::command().debug_assert();
    }
}
