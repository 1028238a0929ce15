use anyhow::Result;
use comfy_table::{presets::UTF8_FULL, Cell, Color, Table};
use console::style;
use shelve_lib::services::{ConsoleReporter, LocalFileSystem};
use shelve_lib::util::format_timestamp;
use shelve_lib::{Config, FileHistory};

pub fn handle_history_command(config: &Config, undo: bool, limit: usize, quiet: bool) -> Result<()> {
    let mut history = FileHistory::load(&config.history_path)?;

    if history.is_empty() {
        println!("{}", style("No files recorded yet").yellow());
        return Ok(());
    }

    if undo {
        return undo_last_run(config, &mut history, quiet);
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec![
        Cell::new("Time").fg(Color::Cyan),
        Cell::new("From").fg(Color::Cyan),
        Cell::new("To").fg(Color::Cyan),
    ]);

    let records = history.records();
    let skip = records.len().saturating_sub(limit);
    for record in &records[skip..] {
        table.add_row(vec![
            Cell::new(format_timestamp(&record.timestamp)),
            Cell::new(record.input.display()),
            Cell::new(record.output.display()),
        ]);
    }

    println!("{}", table);
    if skip > 0 {
        println!(
            "{}",
            style(format!("{} older records not shown (use --limit)", skip)).dim()
        );
    }
    Ok(())
}

fn undo_last_run(config: &Config, history: &mut FileHistory, quiet: bool) -> Result<()> {
    let fs = LocalFileSystem::new();
    let reporter = ConsoleReporter::new(quiet);
    let batch = history.last_batch().len();

    let undone = history.undo_last_batch(&fs, &reporter);
    history.save(&config.history_path)?;

    let message = format!("Undid {} of {} files", undone.len(), batch);
    if undone.len() == batch {
        println!("{}", style(message).green());
    } else {
        println!("{}", style(message).yellow());
    }
    Ok(())
}
