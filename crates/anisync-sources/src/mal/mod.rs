pub mod browser;
pub mod list;
pub mod session;

pub use browser::BrowserOptions;
pub use list::MalListClient;
pub use session::MalBrowserSession;
