pub mod library;
pub mod status;
pub mod tracking;
pub mod update;

pub use library::{LibraryEpisode, LibrarySeason, LibraryShow};
pub use status::WatchStatus;
pub use tracking::{TrackedEntry, TrackingList};
pub use update::UpdateCandidate;
