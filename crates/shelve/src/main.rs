mod cli;

use anyhow::Result;
use clap::Parser;
use shelve_lib::Config;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    cli::init_logging(cli.verbose);

    let config = Config::new(cli.history)?;

    match cli.command {
        cli::Commands::Run {
            scripts,
            simulate,
            daemon,
            interval,
            root,
            non_interactive,
            show_history,
        } => {
            let options = cli::run::RunOptions {
                simulate,
                daemon,
                interval,
                root,
                non_interactive,
                show_history,
            };
            cli::run::handle_run_command(&config, &scripts, options, cli.quiet)
        }

        cli::Commands::Check { scripts } => cli::check::handle_check_command(&scripts),

        cli::Commands::History { undo, limit } => {
            cli::history::handle_history_command(&config, undo, limit, cli.quiet)
        }
    }
}
