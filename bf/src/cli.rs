//! CLI command definitions and subcommands

use clap::{Parser, Subcommand, ValueEnum};
use lockstore::Point;
use std::path::PathBuf;

/// Bruteforce - walk a combination lock through every code
#[derive(Parser, Debug)]
#[command(
    name = "bf",
    author,
    version,
    about = "Enumerate combination lock codes with resumable progress",
    long_about = None
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start or resume enumeration
    Run {
        /// Jump to this combination before starting (e.g. 0012)
        #[arg(short, long)]
        start: Option<String>,

        /// Log guesses instead of sending input
        #[arg(long)]
        dry_run: bool,

        /// Do not read operator commands from stdin
        #[arg(long)]
        no_console: bool,

        /// Seconds to wait before the first attempt (overrides config)
        #[arg(long)]
        countdown: Option<u64>,
    },

    /// Show saved progress
    Status {
        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// List discovered combinations
    Successes,

    /// Forget all discovered combinations
    ClearSuccesses,

    /// Start over, keeping calibration
    Reset {
        /// Combination to restart from (default: configured start)
        #[arg(short, long)]
        start: Option<String>,
    },

    /// Store screen positions for the native input backend
    Calibrate {
        /// Input field position as X,Y
        #[arg(long, value_parser = parse_point)]
        input: Option<Point>,

        /// Submit button position as X,Y
        #[arg(long, value_parser = parse_point)]
        submit: Option<Point>,

        /// Remove both stored positions
        #[arg(long, conflicts_with_all = ["input", "submit"])]
        clear: bool,

        /// Click each stored position once to check it (native backend)
        #[arg(long, conflicts_with = "clear")]
        test: bool,
    },
}

/// Output format for status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Parse `X,Y` into a screen point
pub fn parse_point(s: &str) -> Result<Point, String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("expected X,Y but got '{}'", s))?;
    let x = x.trim().parse::<i32>().map_err(|e| format!("bad X in '{}': {}", s, e))?;
    let y = y.trim().parse::<i32>().map_err(|e| format!("bad Y in '{}': {}", s, e))?;
    Ok([x, y])
}
