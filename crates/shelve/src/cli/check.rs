use anyhow::{bail, Result};
use console::style;
use shelve_lib::Document;
use std::path::PathBuf;

pub fn handle_check_command(scripts: &[PathBuf]) -> Result<()> {
    let mut failed = 0;

    for script in scripts {
        match Document::load(script) {
            Ok(document) => {
                println!(
                    "{} {} ({} blocks)",
                    style("OK").green().bold(),
                    script.display(),
                    document.blocks.len()
                );
                for block in &document.blocks {
                    print!("{}", block);
                }
            }
            Err(e) => {
                failed += 1;
                eprintln!("{} {}", style("FAILED").red().bold(), script.display());
                eprintln!("{}", style(e.to_string()).red());
            }
        }
    }

    if failed > 0 {
        bail!("{} of {} scripts failed to load", failed, scripts.len());
    }
    Ok(())
}
