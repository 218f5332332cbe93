use crate::output::{table_with_header, Output};
use color_eyre::Result;
use comfy_table::{Cell, Table};
use serde_json::json;

use anisync_config::PathManager;
use anisync_core::{store, ErrorLedger};

pub fn run_errors(output: &Output) -> Result<()> {
    let path_manager = PathManager::default();
    let ledger: ErrorLedger = store::load_or_default(&path_manager.error_ledger_file())?;

    if !output.is_human() {
        output.json(&ledger_json(&ledger));
        return Ok(());
    }

    if ledger.is_empty() {
        output.success("Every season is mapped to a MyAnimeList entry");
        return Ok(());
    }
    output.table(&ledger_table(&ledger));
    output.info("Fix an entry with: anisync map <tvdb-id> <season> <mal-id>");
    Ok(())
}

fn ledger_table(ledger: &ErrorLedger) -> Table {
    let mut table = table_with_header(&["TVDB id", "Title", "Season", "MAL search"]);
    for (library_id, entry) in ledger.iter() {
        for (season, url) in &entry.unmapped_seasons {
            table.add_row(vec![
                Cell::new(library_id),
                Cell::new(&entry.title),
                Cell::new(season),
                Cell::new(url).fg(comfy_table::Color::Cyan),
            ]);
        }
    }
    table
}

fn ledger_json(ledger: &ErrorLedger) -> serde_json::Value {
    json!({
        "shows": ledger.len(),
        "errors": ledger,
    })
}
