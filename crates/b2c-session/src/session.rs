use std::sync::Arc;

use b2c_core::{
    AcquisitionOutcome, Account, AccountStore, AuthError, AuthorityResolver, B2cConfig, CacheKey,
    ConfigError, HomeAccountId, Policy, ScopeSet, TokenCache, TokenResult,
};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::broker::{BrokerOptions, TokenBroker};
use crate::resource::ResourceClient;
use crate::surface::{InteractiveSurface, TokenRefresher};

/// Immutable view of the signed-in user.
///
/// Operations never mutate a session in place; they return a new one on
/// success, so a failed call leaves the caller's value as it was.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    account: Option<Account>,
    token: Option<TokenResult>,
}

impl Session {
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn signed_in(token: TokenResult) -> Self {
        Self {
            account: Some(token.account.clone()),
            token: Some(token),
        }
    }

    /// Known account without a usable token, e.g. restored from an expired cache entry.
    #[must_use]
    pub fn with_account(account: Account) -> Self {
        Self {
            account: Some(account),
            token: None,
        }
    }

    #[must_use]
    pub fn account(&self) -> Option<&Account> {
        self.account.as_ref()
    }

    #[must_use]
    pub fn token(&self) -> Option<&TokenResult> {
        self.token.as_ref()
    }

    #[must_use]
    pub fn access_token(&self) -> Option<&str> {
        self.token
            .as_ref()
            .filter(|token| token.has_access_token())
            .map(|token| token.access_token.as_str())
    }

    #[must_use]
    pub fn is_signed_in(&self) -> bool {
        self.account.is_some()
    }
}

/// User-level operations over the broker, one B2C tenant per controller.
pub struct SessionController {
    config: B2cConfig,
    scopes: ScopeSet,
    resolver: Arc<AuthorityResolver>,
    accounts: AccountStore,
    cache: Arc<dyn TokenCache>,
    broker: TokenBroker,
    resource: ResourceClient,
}

impl SessionController {
    pub fn new(
        config: B2cConfig,
        cache: Arc<dyn TokenCache>,
        surface: Arc<dyn InteractiveSurface>,
    ) -> Result<Self, AuthError> {
        config.validate()?;
        let resolver = Arc::new(AuthorityResolver::from_config(&config));
        resolver.known_authorities()?;
        let resource = ResourceClient::new(config.resource_timeout())
            .map_err(|err| AuthError::ResourceCall(err.to_string()))?;
        let broker = TokenBroker::new(
            resolver.clone(),
            cache.clone(),
            surface,
            BrokerOptions::from_config(&config),
        );
        Ok(Self {
            scopes: config.scope_set(),
            accounts: AccountStore::new(config.policies.clone()),
            config,
            resolver,
            cache,
            broker,
            resource,
        })
    }

    #[must_use]
    pub fn with_refresher(mut self, refresher: Arc<dyn TokenRefresher>) -> Self {
        self.broker = self.broker.with_refresher(refresher);
        self
    }

    #[must_use]
    pub fn config(&self) -> &B2cConfig {
        &self.config
    }

    #[must_use]
    pub fn resolver(&self) -> &AuthorityResolver {
        &self.resolver
    }

    #[must_use]
    pub fn account_store(&self) -> &AccountStore {
        &self.accounts
    }

    #[must_use]
    pub fn broker(&self) -> &TokenBroker {
        &self.broker
    }

    pub fn cached_accounts(&self) -> Result<Vec<Account>, AuthError> {
        Ok(self.cache.accounts()?)
    }

    /// Interactive sign-up/sign-in, restarting once under the password reset
    /// policy when the user picks "forgot password".
    pub async fn sign_in(&self, cancel: &CancellationToken) -> Result<Session, AuthError> {
        let authority = self.resolver.for_policy(Policy::SignUpOrSignIn)?;
        let result = match self
            .broker
            .acquire_interactive(&authority, &self.scopes, None, cancel)
            .await
        {
            AcquisitionOutcome::PolicyRedirectRequired(Policy::ResetPassword) => {
                info!(event = "password_reset_redirect");
                let reset = self.resolver.for_policy(Policy::ResetPassword)?;
                self.broker
                    .acquire_interactive(&reset, &self.scopes, None, cancel)
                    .await
                    .into_result()?
            }
            outcome => outcome.into_result()?,
        };
        info!(event = "signed_in", account = %result.account.home_account_id);
        Ok(Session::signed_in(result))
    }

    /// Runs the edit-profile policy for the current user.
    ///
    /// Only the session user's own edit-profile record is passed as the
    /// account; other users' records are never used as a hint. The returned
    /// token belongs to the edit-profile policy and the session keeps its
    /// sign-in token.
    pub async fn edit_profile(
        &self,
        session: &Session,
        cancel: &CancellationToken,
    ) -> Result<TokenResult, AuthError> {
        let authority = self.resolver.for_policy(Policy::EditProfile)?;
        let cached = self.cache.accounts()?;
        let hint = match session.account() {
            Some(current) => self
                .accounts
                .related(&cached, current)
                .into_iter()
                .find(|account| self.accounts.matches(account, Policy::EditProfile)),
            None => self.accounts.find_by_policy(&cached, Policy::EditProfile),
        };
        let outcome = match hint {
            Some(account) => {
                self.broker
                    .acquire_interactive(&authority, &self.scopes, Some(account), cancel)
                    .await
            }
            None => {
                let login_hint = session.account().and_then(Account::login_hint);
                self.broker
                    .acquire_interactive_hinted(&authority, &self.scopes, None, login_hint, cancel)
                    .await
            }
        };
        let result = outcome.into_result()?;
        info!(event = "profile_edited", account = %result.account.home_account_id);
        Ok(result)
    }

    /// Renews the sign-in token, silently when possible.
    pub async fn refresh(
        &self,
        session: &Session,
        cancel: &CancellationToken,
    ) -> Result<Session, AuthError> {
        let authority = self.resolver.for_policy(Policy::SignUpOrSignIn)?;
        let account = match session
            .account()
            .filter(|account| self.accounts.matches(account, Policy::SignUpOrSignIn))
        {
            Some(account) => account.clone(),
            None => {
                let cached = self.cache.accounts()?;
                self.accounts
                    .find_by_policy(&cached, Policy::SignUpOrSignIn)
                    .cloned()
                    .ok_or(AuthError::NoMatchingAccount(Policy::SignUpOrSignIn))?
            }
        };
        let result = self
            .broker
            .acquire_with_fallback(&authority, &self.scopes, &account, cancel)
            .await
            .into_result()?;
        Ok(Session::signed_in(result))
    }

    /// Forgets the signed-in user and every cached record of the same identity.
    ///
    /// An empty session signs out the first cached sign-in account. Calling it
    /// again is a no-op.
    pub fn sign_out(&self, session: &Session) -> Result<Session, AuthError> {
        let authority = self.resolver.for_policy(Policy::SignUpOrSignIn)?;
        let cached = self.cache.accounts()?;
        let target = match session.account() {
            Some(account) => Some(account),
            None => self.accounts.find_by_policy(&cached, Policy::SignUpOrSignIn),
        };
        let mut removed = 0;
        if let Some(target) = target {
            let mut ids: Vec<&HomeAccountId> = vec![&target.home_account_id];
            for account in self.accounts.related(&cached, target) {
                if !ids.contains(&&account.home_account_id) {
                    ids.push(&account.home_account_id);
                }
            }
            for id in ids {
                removed += self.cache.remove(id)?;
            }
        }
        info!(event = "signed_out", authority = %authority, removed);
        Ok(Session::empty())
    }

    pub async fn call_protected_resource(
        &self,
        session: &Session,
        uri: &str,
    ) -> Result<Value, AuthError> {
        let token = session.access_token().ok_or(AuthError::NoActiveToken)?;
        self.resource
            .get_json(uri, token)
            .await
            .map_err(|err| AuthError::ResourceCall(err.to_string()))
    }

    pub async fn call_api(&self, session: &Session) -> Result<Value, AuthError> {
        let endpoint = self
            .config
            .api_endpoint
            .as_deref()
            .ok_or_else(|| ConfigError::Invalid {
                field: "api_endpoint",
                reason: "not configured".to_string(),
            })?;
        self.call_protected_resource(session, endpoint).await
    }

    /// Rebuilds the session from the token cache.
    ///
    /// Prefers the sign-in account; an account minted by a password reset is
    /// used when no sign-in account is cached.
    pub fn restore(&self) -> Result<Session, AuthError> {
        let cached = self.cache.accounts()?;
        for policy in [Policy::SignUpOrSignIn, Policy::ResetPassword] {
            let Some(account) = self.accounts.find_by_policy(&cached, policy) else {
                continue;
            };
            let authority = self.resolver.for_policy(policy)?;
            let key = CacheKey::new(&authority, &account.home_account_id, &self.scopes);
            return Ok(match self.cache.get(&key)? {
                Some(token) => Session::signed_in(token),
                None => Session::with_account(account.clone()),
            });
        }
        Ok(Session::empty())
    }
}
