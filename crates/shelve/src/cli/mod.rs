pub mod check;
pub mod history;
pub mod run;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "shelve")]
#[command(about = "Rule-based file organizer driven by block scripts", long_about = None)]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Path to the file history")]
    pub history: Option<PathBuf>,

    #[arg(long, short = 'v', global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, short = 'q', global = true, help = "Suppress non-error output")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Load block scripts and run every block")]
    Run {
        #[arg(required = true, help = "Block scripts (TOML)")]
        scripts: Vec<PathBuf>,

        #[arg(long, help = "Show what would happen without touching any file")]
        simulate: bool,

        #[arg(long, help = "Keep running on an interval until interrupted")]
        daemon: bool,

        #[arg(long, help = "Seconds between daemon runs")]
        interval: Option<u64>,

        #[arg(long, help = "Run every block against this directory instead")]
        root: Option<PathBuf>,

        #[arg(long, help = "Never prompt; conflicts are skipped")]
        non_interactive: bool,

        #[arg(long, help = "Print what each command touched")]
        show_history: bool,
    },

    #[command(about = "Load block scripts and print them without running")]
    Check {
        #[arg(required = true, help = "Block scripts (TOML)")]
        scripts: Vec<PathBuf>,
    },

    #[command(about = "Show or undo moved and copied files")]
    History {
        #[arg(long, help = "Move the files of the last run back")]
        undo: bool,

        #[arg(long, default_value = "20", help = "Number of records to show")]
        limit: usize,
    },
}

pub fn init_logging(verbose: bool) {
    let level = if verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}
