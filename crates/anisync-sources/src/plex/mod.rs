pub mod api;
pub mod library;

pub use api::PlexHttpClient;
pub use library::PlexLibrary;
