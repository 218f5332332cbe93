use crate::output::Output;
use color_eyre::Result;
use serde_json::json;

use anisync_config::PathManager;
use anisync_core::{ManualMapping, MappingState};

/// Write a manual mapping and drop the season from the error ledger.
///
/// Runs outside the daemon's process, so a pass in flight there may still
/// hold the old ledger in memory until it ends.
pub fn run_map(library_id: &str, season: u32, tracking_id: &str, output: &Output) -> Result<()> {
    let Some(mapping) = ManualMapping::parse(library_id, season, tracking_id)? else {
        output.warn("Empty MyAnimeList id, nothing to do");
        return Ok(());
    };

    let path_manager = PathManager::default();
    let mut state = MappingState::load(&path_manager)?;
    let was_listed = state
        .ledger()
        .get(&mapping.library_id)
        .is_some_and(|entry| entry.unmapped_seasons.contains_key(&mapping.season.to_string()));
    mapping.apply(&mut state)?;

    if output.is_human() {
        output.success(format!(
            "Mapped {} season {} to MyAnimeList id {}",
            mapping.library_id, mapping.season, mapping.tracking_id
        ));
        if was_listed {
            output.info("Removed the season from the error ledger");
        }
    } else {
        output.json(&json!({
            "success": true,
            "library_id": mapping.library_id,
            "season": mapping.season,
            "tracking_id": mapping.tracking_id,
            "ledger_entry_removed": was_listed,
        }));
    }
    Ok(())
}
