use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

use crate::mapping::MappingTable;

const MAL_SEARCH_URL: &str = "https://myanimelist.net/search/all?q=";

/// A show with at least one season that has no MAL id
///
/// A mapped season whose MAL page failed during apply is also listed here.
/// It stays until the next pass reconciles the ledger against the mappings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LedgerEntry {
    pub title: String,
    /// `season -> MAL search URL` to help the user find the right id
    pub unmapped_seasons: BTreeMap<String, String>,
}

/// Seasons awaiting manual correction, persisted as `mapping_errors.json`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct ErrorLedger {
    entries: BTreeMap<String, LedgerEntry>,
}

/// MAL search link for a season, with the query form-encoded
pub fn search_url(title: &str, season: u32) -> String {
    let query = format!("{} season {}", title, season);
    format!("{}{}", MAL_SEARCH_URL, urlencoding::encode(&query).replace("%20", "+"))
}

impl ErrorLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a season to the ledger. Returns false if it was already recorded.
    pub fn record_unresolved(&mut self, library_id: &str, title: &str, season: u32) -> bool {
        let entry = self
            .entries
            .entry(library_id.to_string())
            .or_insert_with(|| LedgerEntry {
                title: title.to_string(),
                unmapped_seasons: BTreeMap::new(),
            });

        let key = season.to_string();
        if entry.unmapped_seasons.contains_key(&key) {
            return false;
        }
        entry.unmapped_seasons.insert(key, search_url(title, season));
        true
    }

    /// Drop every season that now has a mapping, and every show left empty.
    ///
    /// Returns the number of seasons removed.
    pub fn reconcile(&mut self, mappings: &MappingTable) -> usize {
        let mut removed = 0;
        self.entries.retain(|library_id, entry| {
            if mappings.contains_show(library_id) {
                entry.unmapped_seasons.retain(|season, _| {
                    let mapped = season
                        .parse::<u32>()
                        .ok()
                        .and_then(|s| mappings.get(library_id, s))
                        .is_some();
                    if mapped {
                        info!("{} Season {} has been mapped. Removing from errors", entry.title, season);
                        removed += 1;
                    }
                    !mapped
                });
            }
            if entry.unmapped_seasons.is_empty() {
                info!("{} no longer has any unmapped seasons. Removing from errors", entry.title);
                return false;
            }
            true
        });
        removed
    }

    pub fn get(&self, library_id: &str) -> Option<&LedgerEntry> {
        self.entries.get(library_id)
    }

    pub fn contains(&self, library_id: &str) -> bool {
        self.entries.contains_key(library_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &LedgerEntry)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_url_is_form_encoded() {
        assert_eq!(
            search_url("Attack on Titan", 3),
            "https://myanimelist.net/search/all?q=Attack+on+Titan+season+3"
        );
        assert_eq!(
            search_url("Re:Zero", 1),
            "https://myanimelist.net/search/all?q=Re%3AZero+season+1"
        );
    }

    #[test]
    fn test_record_is_idempotent() {
        let mut ledger = ErrorLedger::new();
        assert!(ledger.record_unresolved("81797", "One Piece", 1));
        assert!(!ledger.record_unresolved("81797", "One Piece", 1));
        assert!(ledger.record_unresolved("81797", "One Piece", 2));

        let entry = ledger.get("81797").unwrap();
        assert_eq!(entry.title, "One Piece");
        assert_eq!(entry.unmapped_seasons.len(), 2);
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_reconcile_removes_mapped_seasons_and_empty_entries() {
        let mut ledger = ErrorLedger::new();
        ledger.record_unresolved("1", "Show A", 1);
        ledger.record_unresolved("1", "Show A", 2);
        ledger.record_unresolved("2", "Show B", 1);
        ledger.record_unresolved("3", "Show C", 1);

        let mut mappings = MappingTable::new();
        mappings.set("1", 1, "100");
        mappings.set("2", 1, "200");
        mappings.set("3", 2, "300");

        assert_eq!(ledger.reconcile(&mappings), 2);
        assert_eq!(ledger.get("1").unwrap().unmapped_seasons.keys().collect::<Vec<_>>(), vec!["2"]);
        assert!(!ledger.contains("2"));
        assert!(ledger.contains("3"));

        let snapshot = ledger.clone();
        assert_eq!(ledger.reconcile(&mappings), 0);
        assert_eq!(ledger, snapshot);
    }

    #[test]
    fn test_serialized_shape() {
        let mut ledger = ErrorLedger::new();
        ledger.record_unresolved("76885", "Cowboy Bebop", 1);
        let json: serde_json::Value = serde_json::to_value(&ledger).unwrap();
        assert_eq!(json["76885"]["title"], "Cowboy Bebop");
        assert_eq!(
            json["76885"]["unmapped_seasons"]["1"],
            "https://myanimelist.net/search/all?q=Cowboy+Bebop+season+1"
        );
    }
}
