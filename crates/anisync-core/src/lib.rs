pub mod ledger;
pub mod mapping;
pub mod recent;
pub mod reconcile;
pub mod resolver;
pub mod service;
pub mod store;
pub mod sync;
pub mod xref;

#[cfg(test)]
pub(crate) mod testing;

pub use ledger::{search_url, ErrorLedger, LedgerEntry};
pub use mapping::{MappingState, MappingTable};
pub use recent::{update_line, RecentUpdates, MAX_RECENT_UPDATES};
pub use reconcile::{compute_candidates, needs_update, status_for};
pub use resolver::{Resolution, ResolveSummary, Resolver, UnresolvedReason};
pub use service::{ManualMapping, RunGuard, SyncService, SyncState};
pub use store::StoreError;
pub use sync::{
    SyncCollaborators, SyncError, SyncOrchestrator, SyncOutcome, SyncReport, SyncSettings,
    MAX_LOGIN_ATTEMPTS,
};
pub use xref::{CrossReferenceImporter, CrossReferenceTable, XrefError, SNAPSHOT_MAX_AGE};
