use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{debug, info};

use anisync_config::PathManager;

use crate::ledger::ErrorLedger;
use crate::store::{self, StoreError};

/// `library-id -> season -> tracking-id`, persisted as `tvdb_to_mal.json`.
///
/// Seasons are string keys on disk. Entries are only ever set or
/// overwritten.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct MappingTable {
    shows: BTreeMap<String, BTreeMap<String, String>>,
}

impl MappingTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, library_id: &str, season: u32) -> Option<&str> {
        self.shows
            .get(library_id)?
            .get(&season.to_string())
            .map(String::as_str)
    }

    pub fn contains_show(&self, library_id: &str) -> bool {
        self.shows.contains_key(library_id)
    }

    pub fn set(&mut self, library_id: &str, season: u32, tracking_id: &str) {
        self.shows
            .entry(library_id.to_string())
            .or_default()
            .insert(season.to_string(), tracking_id.to_string());
    }

    /// Number of mapped seasons across all shows
    pub fn len(&self) -> usize {
        self.shows.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The mapping table and error ledger, loaded together because every change
/// to the former has to be reflected in the latter.
pub struct MappingState {
    mappings: MappingTable,
    ledger: ErrorLedger,
    mapping_path: PathBuf,
    ledger_path: PathBuf,
}

impl MappingState {
    pub fn load(paths: &PathManager) -> Result<Self, StoreError> {
        Self::open(paths.mapping_file(), paths.error_ledger_file())
    }

    pub fn open(mapping_path: PathBuf, ledger_path: PathBuf) -> Result<Self, StoreError> {
        let mappings = store::load_or_default(&mapping_path)?;
        let ledger = store::load_or_default(&ledger_path)?;
        Ok(Self {
            mappings,
            ledger,
            mapping_path,
            ledger_path,
        })
    }

    pub fn mappings(&self) -> &MappingTable {
        &self.mappings
    }

    pub fn ledger(&self) -> &ErrorLedger {
        &self.ledger
    }

    /// Write a mapping and heal the ledger in one step
    pub fn add_mapping(&mut self, library_id: &str, season: u32, tracking_id: &str) -> Result<(), StoreError> {
        info!("Mapping {} season {} to MAL id {}", library_id, season, tracking_id);
        self.mappings.set(library_id, season, tracking_id);
        store::save(&self.mapping_path, &self.mappings)?;
        self.reconcile_ledger()?;
        Ok(())
    }

    /// Record a season for manual correction. The ledger is not reconciled
    /// here, so a mapped season whose page failed stays visible.
    pub fn record_unresolved(&mut self, library_id: &str, title: &str, season: u32) -> Result<(), StoreError> {
        if self.ledger.record_unresolved(library_id, title, season) {
            debug!("Recorded {} season {} in the error ledger", title, season);
            store::save(&self.ledger_path, &self.ledger)?;
        }
        Ok(())
    }

    pub fn reconcile_ledger(&mut self) -> Result<usize, StoreError> {
        let removed = self.ledger.reconcile(&self.mappings);
        store::save(&self.ledger_path, &self.ledger)?;
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_in(dir: &tempfile::TempDir) -> MappingState {
        MappingState::open(dir.path().join("tvdb_to_mal.json"), dir.path().join("mapping_errors.json")).unwrap()
    }

    #[test]
    fn test_table_get_and_set() {
        let mut table = MappingTable::new();
        assert!(table.is_empty());
        table.set("81797", 1, "21");
        table.set("81797", 1, "22");
        table.set("81797", 2, "23");

        assert_eq!(table.get("81797", 1), Some("22"));
        assert_eq!(table.get("81797", 3), None);
        assert_eq!(table.get("1", 1), None);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_table_uses_string_season_keys_on_disk() {
        let mut table = MappingTable::new();
        table.set("267440", 2, "25777");
        let json = serde_json::to_string(&table).unwrap();
        assert_eq!(json, r#"{"267440":{"2":"25777"}}"#);
    }

    #[test]
    fn test_add_mapping_persists_and_heals_ledger() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = state_in(&dir);
        state.record_unresolved("267440", "Attack on Titan", 1).unwrap();
        state.record_unresolved("267440", "Attack on Titan", 2).unwrap();

        state.add_mapping("267440", 1, "16498").unwrap();
        assert!(state.ledger().get("267440").unwrap().unmapped_seasons.contains_key("2"));
        assert!(!state.ledger().get("267440").unwrap().unmapped_seasons.contains_key("1"));

        state.add_mapping("267440", 2, "25777").unwrap();
        assert!(state.ledger().is_empty());

        let reloaded = state_in(&dir);
        assert_eq!(reloaded.mappings().get("267440", 2), Some("25777"));
        assert!(reloaded.ledger().is_empty());
    }

    #[test]
    fn test_record_unresolved_keeps_mapped_season_visible() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = state_in(&dir);
        state.add_mapping("76885", 1, "1").unwrap();
        state.record_unresolved("76885", "Cowboy Bebop", 1).unwrap();

        assert!(state_in(&dir).ledger().contains("76885"));
        assert_eq!(state.reconcile_ledger().unwrap(), 1);
        assert!(state.ledger().is_empty());
    }
}
