use std::fmt;
use tracing::{debug, info, warn};

use anisync_models::LibraryShow;
use anisync_sources::PageLookup;

use crate::mapping::MappingState;
use crate::store::StoreError;
use crate::xref::CrossReferenceTable;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnresolvedReason {
    /// The snapshot has no AniDB id for this season
    NoCrossReference,
    /// The AniDB page has no MAL link
    NoTrackerLink,
    /// The AniDB page could not be read
    LookupFailed(String),
}

impl fmt::Display for UnresolvedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnresolvedReason::NoCrossReference => f.write_str("no AniDB cross-reference"),
            UnresolvedReason::NoTrackerLink => f.write_str("AniDB page has no MAL link"),
            UnresolvedReason::LookupFailed(e) => write!(f, "AniDB lookup failed: {}", e),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Resolved(String),
    Unresolved(UnresolvedReason),
}

/// Seasons resolved and left unresolved during one resolution phase
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveSummary {
    pub resolved: usize,
    pub unresolved: usize,
}

/// Finds MAL ids for library seasons: stored mappings first, then the
/// cross-reference table plus an AniDB page lookup.
pub struct Resolver<'a> {
    state: &'a mut MappingState,
    xref: &'a CrossReferenceTable,
}

impl<'a> Resolver<'a> {
    pub fn new(state: &'a mut MappingState, xref: &'a CrossReferenceTable) -> Self {
        Self { state, xref }
    }

    /// Resolve one season, storing any newly found mapping.
    ///
    /// Only persistence failures are errors; lookup failures resolve to
    /// [`Resolution::Unresolved`].
    pub async fn resolve(
        &mut self,
        lookup: &mut dyn PageLookup,
        library_id: &str,
        season: u32,
    ) -> Result<Resolution, StoreError> {
        if let Some(tracking_id) = self.state.mappings().get(library_id, season) {
            return Ok(Resolution::Resolved(tracking_id.to_string()));
        }

        let Some(xref_id) = self.xref.get(library_id, season) else {
            return Ok(Resolution::Unresolved(UnresolvedReason::NoCrossReference));
        };

        debug!("Getting MAL id for {} season {} from AniDB {}", library_id, season, xref_id);
        match lookup.lookup_tracking_id(xref_id).await {
            Ok(Some(tracking_id)) => {
                self.state.add_mapping(library_id, season, &tracking_id)?;
                Ok(Resolution::Resolved(tracking_id))
            }
            Ok(None) => Ok(Resolution::Unresolved(UnresolvedReason::NoTrackerLink)),
            Err(e) => Ok(Resolution::Unresolved(UnresolvedReason::LookupFailed(e.to_string()))),
        }
    }

    /// Resolve every season of a show, sending failures to the error ledger
    pub async fn resolve_show(
        &mut self,
        lookup: &mut dyn PageLookup,
        show: &LibraryShow,
    ) -> Result<ResolveSummary, StoreError> {
        debug!("Checking mappings for {}", show.title);
        let mut summary = ResolveSummary::default();
        for season in show.season_numbers() {
            match self.resolve(lookup, &show.library_id, season).await? {
                Resolution::Resolved(_) => summary.resolved += 1,
                Resolution::Unresolved(reason) => {
                    warn!("Unable to map {} season {}: {}", show.title, season, reason);
                    self.state.record_unresolved(&show.library_id, &show.title, season)?;
                    summary.unresolved += 1;
                }
            }
        }
        Ok(summary)
    }

    /// Resolve all shows, then reconcile the ledger once more
    pub async fn resolve_all(
        &mut self,
        lookup: &mut dyn PageLookup,
        shows: &[LibraryShow],
    ) -> Result<ResolveSummary, StoreError> {
        info!("Updating MAL to TVDB mappings");
        let mut total = ResolveSummary::default();
        for show in shows {
            let summary = self.resolve_show(lookup, show).await?;
            total.resolved += summary.resolved;
            total.unresolved += summary.unresolved;
        }
        self.state.reconcile_ledger()?;
        Ok(total)
    }
}
