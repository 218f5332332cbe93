//! TVDB to AniDB cross-reference, built from the community anime-list snapshot.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use thiserror::Error;
use tracing::{debug, info};

use anisync_config::PathManager;
use anisync_sources::{SnapshotSource, SourceError};

use crate::store::{self, StoreError};

/// The snapshot is re-downloaded once it is a week old
pub const SNAPSHOT_MAX_AGE: Duration = Duration::from_secs(604_800);

#[derive(Debug, Error)]
pub enum XrefError {
    #[error("failed to download cross-reference snapshot: {0}")]
    Fetch(#[from] SourceError),

    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid cross-reference XML: {0}")]
    Xml(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// `library-id -> season -> cross-reference-id`. Always replaced as a whole.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct CrossReferenceTable {
    shows: BTreeMap<String, BTreeMap<u32, String>>,
}

impl CrossReferenceTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, library_id: &str, season: u32) -> Option<&str> {
        self.shows.get(library_id)?.get(&season).map(String::as_str)
    }

    pub fn insert(&mut self, library_id: &str, season: u32, xref_id: &str) {
        self.shows
            .entry(library_id.to_string())
            .or_default()
            .insert(season, xref_id.to_string());
    }

    pub fn len(&self) -> usize {
        self.shows.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn is_all_digits(value: &str) -> bool {
    !value.is_empty() && value.chars().all(|c| c.is_ascii_digit())
}

/// Pull `(tvdbid, anidbid, season)` out of an `<anime>` element if it is usable
fn anime_mapping(e: &BytesStart) -> Option<(String, String, u32)> {
    let mut tvdb_id = None;
    let mut anidb_id = None;
    let mut season = None;

    for attr in e.attributes().flatten() {
        let value = String::from_utf8_lossy(&attr.value).to_string();
        match attr.key.as_ref() {
            b"tvdbid" => tvdb_id = Some(value),
            b"anidbid" => anidb_id = Some(value),
            b"defaulttvdbseason" => season = Some(value),
            _ => {}
        }
    }

    let (tvdb_id, anidb_id, season) = (tvdb_id?, anidb_id?, season?);
    if !is_all_digits(&tvdb_id) || !is_all_digits(&anidb_id) || !is_all_digits(&season) {
        return None;
    }
    let season: u32 = season.parse().ok()?;
    if season == 0 {
        return None;
    }
    Some((tvdb_id, anidb_id, season))
}

/// Parse the anime-list XML into a cross-reference table.
///
/// Specials, absolute-numbered (`a`) seasons and entries without numeric ids
/// are skipped. Later duplicates win.
pub fn parse_snapshot(xml: &str) -> Result<CrossReferenceTable, XrefError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut table = CrossReferenceTable::new();
    let mut skipped = 0usize;
    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) if e.name().as_ref() == b"anime" => {
                match anime_mapping(e) {
                    Some((tvdb_id, anidb_id, season)) => table.insert(&tvdb_id, season, &anidb_id),
                    None => skipped += 1,
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(XrefError::Xml(format!(
                    "error at position {}: {}",
                    reader.error_position(),
                    e
                )))
            }
            _ => {}
        }
    }

    debug!("Parsed {} cross-references, skipped {} entries", table.len(), skipped);
    Ok(table)
}

/// Keeps the local copy of the snapshot and its parsed table up to date
pub struct CrossReferenceImporter {
    snapshot_url: String,
    snapshot_path: PathBuf,
    table_path: PathBuf,
}

impl CrossReferenceImporter {
    pub fn new(snapshot_url: impl Into<String>, snapshot_path: PathBuf, table_path: PathBuf) -> Self {
        Self {
            snapshot_url: snapshot_url.into(),
            snapshot_path,
            table_path,
        }
    }

    pub fn from_paths(snapshot_url: impl Into<String>, paths: &PathManager) -> Self {
        Self::new(snapshot_url, paths.snapshot_file(), paths.cross_reference_file())
    }

    /// True when either file is missing or the snapshot is at least
    /// [`SNAPSHOT_MAX_AGE`] old by modification time
    pub fn is_stale(&self, now: SystemTime) -> bool {
        if !self.snapshot_path.exists() || !self.table_path.exists() {
            return true;
        }
        let modified = std::fs::metadata(&self.snapshot_path).and_then(|m| m.modified());
        match modified {
            // A timestamp in the future counts as fresh
            Ok(modified) => now
                .duration_since(modified)
                .map(|age| age >= SNAPSHOT_MAX_AGE)
                .unwrap_or(false),
            Err(_) => true,
        }
    }

    pub async fn refresh_if_stale(
        &self,
        source: &dyn SnapshotSource,
        now: SystemTime,
    ) -> Result<CrossReferenceTable, XrefError> {
        if !self.is_stale(now) {
            debug!("Cross-reference snapshot is fresh, loading {}", self.table_path.display());
            return Ok(store::load_or_default(&self.table_path)?);
        }

        info!("Downloading new XML mapping file");
        let bytes = source.fetch(&self.snapshot_url).await?;
        self.replace_snapshot(&bytes)?;

        info!("Parsing new XML data");
        let xml = String::from_utf8_lossy(&bytes);
        let table = parse_snapshot(&xml)?;
        store::save(&self.table_path, &table)?;
        info!("Stored {} cross-references", table.len());
        Ok(table)
    }

    fn replace_snapshot(&self, bytes: &[u8]) -> Result<(), XrefError> {
        if let Some(parent) = self.snapshot_path.parent() {
            create_dir(parent)?;
        }
        store::write_atomic(&self.snapshot_path, bytes)?;
        Ok(())
    }
}

fn create_dir(path: &Path) -> Result<(), XrefError> {
    std::fs::create_dir_all(path).map_err(|source| XrefError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeSnapshot;
    use filetime::FileTime;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<anime-list>
  <anime anidbid="23" tvdbid="76885" defaulttvdbseason="1" episodeoffset="" tmdbid="" imdbid="">
    <name>Cowboy Bebop</name>
    <mapping-list>
      <mapping anidbseason="0" tvdbseason="0">;1-1;</mapping>
    </mapping-list>
  </anime>
  <anime anidbid="69" tvdbid="81797" defaulttvdbseason="a" episodeoffset="">
    <name>One Piece</name>
  </anime>
  <anime anidbid="4563" tvdbid="267440" defaulttvdbseason="0">
    <name>Specials</name>
  </anime>
  <anime anidbid="9541" tvdbid="267440" defaulttvdbseason="1"/>
  <anime anidbid="10944" tvdbid="267440" defaulttvdbseason="2"/>
  <anime anidbid="5" tvdbid="movie" defaulttvdbseason="1"/>
  <anime anidbid="6" tvdbid="unknown" defaulttvdbseason="1"/>
  <anime anidbid="7" defaulttvdbseason="1"/>
  <anime anidbid="11111" tvdbid="267440" defaulttvdbseason="2"/>
</anime-list>"#;

    fn importer(dir: &tempfile::TempDir) -> CrossReferenceImporter {
        CrossReferenceImporter::new(
            "https://example.invalid/anime-list-full.xml",
            dir.path().join("anime-list-full.xml"),
            dir.path().join("tvdb_to_anidb.json"),
        )
    }

    #[test]
    fn test_parse_accepts_only_numeric_positive_seasons() {
        let table = parse_snapshot(SAMPLE).unwrap();

        assert_eq!(table.get("76885", 1), Some("23"));
        assert_eq!(table.get("267440", 1), Some("9541"));
        assert_eq!(table.get("267440", 0), None);
        assert!(table.get("81797", 1).is_none());
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn test_parse_later_duplicate_wins() {
        let table = parse_snapshot(SAMPLE).unwrap();
        assert_eq!(table.get("267440", 2), Some("11111"));
    }

    #[test]
    fn test_parse_rejects_broken_xml() {
        assert!(matches!(
            parse_snapshot("<anime-list><anime tvdbid=\"1\"></anime-list>"),
            Err(XrefError::Xml(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_files_trigger_download() {
        let dir = tempfile::tempdir().unwrap();
        let importer = importer(&dir);
        let source = FakeSnapshot::new(SAMPLE);

        assert!(importer.is_stale(SystemTime::now()));
        let table = importer.refresh_if_stale(&source, SystemTime::now()).await.unwrap();

        assert_eq!(source.fetches(), 1);
        assert_eq!(table.get("76885", 1), Some("23"));
        assert!(dir.path().join("anime-list-full.xml").exists());
        let stored: CrossReferenceTable =
            store::load_or_default(&dir.path().join("tvdb_to_anidb.json")).unwrap();
        assert_eq!(stored, table);
    }

    #[tokio::test]
    async fn test_fresh_snapshot_is_not_downloaded_again() {
        let dir = tempfile::tempdir().unwrap();
        let importer = importer(&dir);
        let source = FakeSnapshot::new(SAMPLE);
        importer.refresh_if_stale(&source, SystemTime::now()).await.unwrap();

        let later = SystemTime::now() + Duration::from_secs(3600);
        let table = importer.refresh_if_stale(&source, later).await.unwrap();

        assert_eq!(source.fetches(), 1);
        assert_eq!(table.get("267440", 2), Some("11111"));
    }

    #[tokio::test]
    async fn test_week_old_snapshot_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let importer = importer(&dir);
        let source = FakeSnapshot::new(SAMPLE);
        importer.refresh_if_stale(&source, SystemTime::now()).await.unwrap();

        let week_ago = SystemTime::now() - SNAPSHOT_MAX_AGE - Duration::from_secs(1);
        filetime::set_file_mtime(
            dir.path().join("anime-list-full.xml"),
            FileTime::from_system_time(week_ago),
        )
        .unwrap();
        assert!(importer.is_stale(SystemTime::now()));

        source.set_body(r#"<anime-list><anime anidbid="1" tvdbid="2" defaulttvdbseason="1"/></anime-list>"#);
        let table = importer.refresh_if_stale(&source, SystemTime::now()).await.unwrap();

        assert_eq!(source.fetches(), 2);
        // The table is rebuilt rather than merged
        assert_eq!(table.len(), 1);
        assert_eq!(table.get("2", 1), Some("1"));
        assert_eq!(table.get("76885", 1), None);
    }

    #[tokio::test]
    async fn test_missing_table_forces_refresh() {
        let dir = tempfile::tempdir().unwrap();
        let importer = importer(&dir);
        let source = FakeSnapshot::new(SAMPLE);
        importer.refresh_if_stale(&source, SystemTime::now()).await.unwrap();

        std::fs::remove_file(dir.path().join("tvdb_to_anidb.json")).unwrap();
        importer.refresh_if_stale(&source, SystemTime::now()).await.unwrap();
        assert_eq!(source.fetches(), 2);
    }

    #[tokio::test]
    async fn test_fetch_failure_propagates() {
        let dir = tempfile::tempdir().unwrap();
        let importer = importer(&dir);
        let source = FakeSnapshot::failing();

        let err = importer.refresh_if_stale(&source, SystemTime::now()).await.unwrap_err();
        assert!(matches!(err, XrefError::Fetch(_)));
        assert!(!dir.path().join("tvdb_to_anidb.json").exists());
    }
}
