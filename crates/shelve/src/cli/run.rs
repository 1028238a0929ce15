use anyhow::{Context, Result};
use console::style;
use shelve_lib::services::{LocalFileSystem, NonInteractive};
use shelve_lib::{Config, Document, Services};
use std::path::PathBuf;
use std::rc::Rc;
use std::thread;
use std::time::{Duration, Instant};

pub struct RunOptions {
    pub simulate: bool,
    pub daemon: bool,
    pub interval: Option<u64>,
    pub root: Option<PathBuf>,
    pub non_interactive: bool,
    pub show_history: bool,
}

pub fn handle_run_command(
    config: &Config,
    scripts: &[PathBuf],
    options: RunOptions,
    quiet: bool,
) -> Result<()> {
    let settings = &config.settings;
    let mut services = Services::system(quiet);
    if let Some(trash_dir) = &settings.trash_dir {
        services = services.with_fs(Rc::new(LocalFileSystem::with_trash_dir(trash_dir)));
    }
    if options.non_interactive || !settings.interactive {
        services = services.with_interaction(Rc::new(NonInteractive));
    }

    let cancel = services.cancel.clone();
    ctrlc::set_handler(move || cancel.cancel()).context("Failed to install Ctrl-C handler")?;

    let simulate = options.simulate || settings.simulate;
    let interval = Duration::from_secs(options.interval.unwrap_or(settings.interval).max(1));

    loop {
        services.begin_run();
        run_once(config, scripts, &options, simulate, &services)?;

        if !options.daemon || services.cancel.is_cancelled() {
            break;
        }
        if !quiet {
            println!(
                "{}",
                style(format!("Next run in {}s (Ctrl-C to stop)", interval.as_secs())).dim()
            );
        }
        if !sleep_unless_cancelled(&services, interval) {
            break;
        }
    }

    if services.cancel.is_cancelled() {
        log::info!("Run interrupted");
        if !quiet {
            println!("{}", style("Interrupted").yellow());
        }
    }
    Ok(())
}

fn run_once(
    config: &Config,
    scripts: &[PathBuf],
    options: &RunOptions,
    simulate: bool,
    services: &Services,
) -> Result<()> {
    for script in scripts {
        if services.cancel.is_cancelled() {
            break;
        }
        let mut document = Document::from_path(script, services.reporter.as_ref());
        if simulate {
            document.set_simulate(true);
        }
        if let Some(root) = &options.root {
            document.set_root(root);
        }

        log::info!("Running {} ({} blocks)", script.display(), document.blocks.len());
        document.eval(services);

        if options.show_history {
            for block in &document.blocks {
                println!("{}", style(format!("[[{}]]", block.name)).bold());
                print!("{}", block.history);
            }
        }
    }

    persist_history(config, services)
}

fn persist_history(config: &Config, services: &Services) -> Result<()> {
    let records = services.file_history.borrow_mut().take();
    if records.is_empty() {
        return Ok(());
    }
    config.ensure_history_directory()?;
    records
        .append_to(&config.history_path)
        .with_context(|| format!("Failed to write history to {}", config.history_path.display()))?;
    log::info!("Recorded {} files in {}", records.len(), config.history_path.display());
    Ok(())
}

/// Returns false when the wait was cut short by Ctrl-C.
fn sleep_unless_cancelled(services: &Services, interval: Duration) -> bool {
    let started = Instant::now();
    while started.elapsed() < interval {
        if services.cancel.is_cancelled() {
            return false;
        }
        thread::sleep(Duration::from_millis(200));
    }
    !services.cancel.is_cancelled()
}
