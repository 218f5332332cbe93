pub mod anidb;
pub mod error;
pub mod factory;
pub mod mal;
pub mod plex;
pub mod snapshot;
pub mod traits;

pub use anidb::AnidbLookup;
pub use error::SourceError;
pub use factory::MalSessionFactory;
pub use mal::{MalBrowserSession, MalListClient};
pub use plex::{PlexHttpClient, PlexLibrary};
pub use snapshot::HttpSnapshotSource;
pub use traits::{
    AnimePage, LibrarySource, PageLookup, SessionFactory, SnapshotSource, TrackerSession,
    TrackingListFetcher,
};
