use std::sync::Arc;

use tracing::warn;

use crate::archive::ArchiveBuilder;
use crate::auth::login::LoginFlow;
use crate::auth::token::TokenIssuer;
use crate::catalog::Catalog;
use crate::config::AppConfig;
use crate::database::connection::DbConnection;
use crate::github::contents::{GithubContents, SourceFetcher};
use crate::github::oauth::{GithubOAuth, IdentityProvider};
use crate::storage::memory::MemoryStore;
use crate::storage::SharedStorage;

pub struct AppState {
    pub config: AppConfig,
    pub catalog: Catalog,
    pub login: LoginFlow,
    pub tokens: TokenIssuer,
    pub sources: Arc<dyn SourceFetcher>,
    pub archives: ArchiveBuilder,
}

impl AppState {
    pub async fn try_init(config: &AppConfig) -> anyhow::Result<Self> {
        let storage: SharedStorage = match &config.database {
            Some(database) => Arc::new(DbConnection::connect(database).await?),
            None => {
                warn!("no database configured, catalog is kept in memory only");
                Arc::new(MemoryStore::new())
            }
        };
        let provider = Arc::new(GithubOAuth::new(&config.github)?);
        let sources = Arc::new(GithubContents::new(&config.github)?);
        Ok(Self::new(config, storage, provider, sources))
    }

    pub fn new(
        config: &AppConfig,
        storage: SharedStorage,
        provider: Arc<dyn IdentityProvider>,
        sources: Arc<dyn SourceFetcher>,
    ) -> Self {
        let tokens = TokenIssuer::from_config(&config.auth);
        Self {
            config: config.clone(),
            catalog: Catalog::new(storage.clone(), &config.files),
            login: LoginFlow::new(provider, storage, tokens.clone()),
            tokens,
            sources,
            archives: ArchiveBuilder::new(config.files.tasks_dir.clone()),
        }
    }
}
