use std::sync::Arc;

use tracing::{info, instrument};

use crate::auth::token::TokenIssuer;
use crate::error::RequestError;
use crate::github::oauth::IdentityProvider;
use crate::models::user::{LoginResponse, UpsertUser};
use crate::storage::SharedStorage;

/// GitHub OAuth login: nothing is stored until the provider has vouched for the user.
#[derive(Clone)]
pub struct LoginFlow {
    provider: Arc<dyn IdentityProvider>,
    storage: SharedStorage,
    tokens: TokenIssuer,
}

impl LoginFlow {
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        storage: SharedStorage,
        tokens: TokenIssuer,
    ) -> Self {
        Self {
            provider,
            storage,
            tokens,
        }
    }

    #[instrument(skip_all)]
    pub async fn login(&self, code: &str) -> Result<LoginResponse, RequestError> {
        let access_token = self.provider.exchange_code(code).await?;
        let identity = self.provider.lookup_user(&access_token).await?;
        let user_id = self
            .storage
            .upsert_user(&UpsertUser {
                id: identity.id,
                username: identity.username.clone(),
                access_token,
            })
            .await?;
        let token = self.tokens.issue(user_id)?;
        info!("user `{}` ({user_id}) logged in", identity.username);
        Ok(LoginResponse { token, user_id })
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::models::user::GithubIdentity;
    use crate::storage::memory::MemoryStore;

    struct StubProvider {
        lookup_fails: bool,
    }

    #[async_trait]
    impl IdentityProvider for StubProvider {
        async fn exchange_code(&self, code: &str) -> Result<String, RequestError> {
            if code == "valid" {
                Ok("gho_stub".to_string())
            } else {
                Err(RequestError::BadCredentials)
            }
        }

        async fn lookup_user(&self, _access_token: &str) -> Result<GithubIdentity, RequestError> {
            if self.lookup_fails {
                Err(RequestError::Transient("api.github.com timed out".to_string()))
            } else {
                Ok(GithubIdentity {
                    username: "octocat".to_string(),
                    id: 583231,
                })
            }
        }
    }

    fn flow(store: &Arc<MemoryStore>, lookup_fails: bool) -> LoginFlow {
        LoginFlow::new(
            Arc::new(StubProvider { lookup_fails }),
            store.clone(),
            TokenIssuer::new("a-secret-long-enough-for-hs256-usage", 60),
        )
    }

    #[tokio::test]
    async fn login_upserts_user_and_issues_token() {
        let store = Arc::new(MemoryStore::new());
        let login = flow(&store, false);

        let first = login.login("valid").await.unwrap();
        let second = login.login("valid").await.unwrap();
        assert_eq!(first.user_id, 583231);
        assert_eq!(second.user_id, 583231);
        assert_eq!(store.access_token(583231).as_deref(), Some("gho_stub"));

        let issuer = TokenIssuer::new("a-secret-long-enough-for-hs256-usage", 60);
        assert_eq!(issuer.verify(&first.token).unwrap().user_id, 583231);
    }

    #[tokio::test]
    async fn provider_failures_store_nothing() {
        let store = Arc::new(MemoryStore::new());

        let err = flow(&store, false).login("expired").await.unwrap_err();
        assert!(matches!(err, RequestError::BadCredentials));
        let err = flow(&store, true).login("valid").await.unwrap_err();
        assert!(err.is_transient());
        assert_eq!(store.access_token(583231), None);
    }
}
