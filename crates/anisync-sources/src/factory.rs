use async_trait::async_trait;

use anisync_config::{Config, CredentialStore, PathManager};

use crate::error::SourceError;
use crate::mal::{BrowserOptions, MalBrowserSession};
use crate::traits::{SessionFactory, TrackerSession};

/// Launches a fresh MAL browser session for each sync pass
pub struct MalSessionFactory {
    options: BrowserOptions,
    username: String,
    password: String,
}

impl MalSessionFactory {
    pub fn new(
        config: &Config,
        credentials: &CredentialStore,
        paths: &PathManager,
    ) -> Result<Self, SourceError> {
        let password = credentials
            .get_mal_password()
            .cloned()
            .ok_or(SourceError::MissingCredential("mal_password"))?;

        Ok(Self {
            options: BrowserOptions {
                headless: config.browser.headless,
                executable: config.browser.executable.clone(),
                user_data_dir: paths.data_dir().join("browser"),
            },
            username: config.myanimelist.username.clone(),
            password,
        })
    }
}

#[async_trait]
impl SessionFactory for MalSessionFactory {
    async fn open(&self) -> Result<Box<dyn TrackerSession>, SourceError> {
        let session =
            MalBrowserSession::launch(&self.options, self.username.clone(), self.password.clone())
                .await?;
        Ok(Box::new(session))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factory_requires_password() {
        let dir = tempfile::tempdir().unwrap();
        let paths = PathManager::with_base(dir.path().to_path_buf());
        let mut config = Config::template();
        config.myanimelist.username = "someone".to_string();
        let mut credentials = CredentialStore::new(paths.credentials_file());

        assert!(matches!(
            MalSessionFactory::new(&config, &credentials, &paths),
            Err(SourceError::MissingCredential("mal_password"))
        ));

        credentials.set_mal_password("secret".to_string());
        let factory = MalSessionFactory::new(&config, &credentials, &paths).unwrap();
        assert_eq!(factory.options.user_data_dir, dir.path().join("data").join("browser"));
        assert!(factory.options.headless);
    }
}
