use crate::output::Output;
use color_eyre::Result;
use serde_json::json;

use anisync_config::PathManager;
use anisync_core::RecentUpdates;

pub fn run_recent(output: &Output) -> Result<()> {
    let path_manager = PathManager::default();
    let updates = RecentUpdates::load(&path_manager.recent_updates_file())?;

    if !output.is_human() {
        output.json(&json!({ "recent_updates": updates.lines() }));
        return Ok(());
    }

    if updates.is_empty() {
        output.info("No updates applied yet");
        return Ok(());
    }
    // Newest first
    for line in updates.lines().iter().rev() {
        output.println(format!("  {}", line));
    }
    Ok(())
}
