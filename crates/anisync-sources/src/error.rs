use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("unexpected response from {url}: {message}")]
    Response { url: String, message: String },

    #[error("library '{0}' was not found on the Plex server")]
    LibraryNotFound(String),

    #[error("browser automation failed: {0}")]
    Browser(String),

    #[error("missing credential: {0}")]
    MissingCredential(&'static str),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SourceError {
    pub fn http(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Http {
            url: url.into(),
            source,
        }
    }

    pub fn browser(message: impl std::fmt::Display) -> Self {
        Self::Browser(message.to_string())
    }
}

impl From<chromiumoxide::error::CdpError> for SourceError {
    fn from(e: chromiumoxide::error::CdpError) -> Self {
        Self::Browser(e.to_string())
    }
}
