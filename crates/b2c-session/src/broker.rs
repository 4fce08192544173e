use std::sync::Arc;
use std::time::Duration;

use b2c_core::constants::REFRESH_SKEW_SECONDS;
use b2c_core::{
    AcquisitionMode, AcquisitionOutcome, AcquisitionState, Account, AuthError, Authority,
    AuthorityResolver, B2cConfig, CacheKey, HomeAccountId, InteractionReason, Policy,
    ProviderError, ProviderErrorKind, ScopeSet, TokenCache, TokenResult,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::guard::{FlightGuards, InFlightPolicy};
use crate::surface::{
    InteractiveRequest, InteractiveSurface, Prompt, RefreshRequest, SurfaceError, TokenRefresher,
};

#[derive(Debug, Clone)]
pub struct BrokerOptions {
    pub refresh_skew_seconds: i64,
    pub interactive_timeout: Option<Duration>,
    pub prompt: Prompt,
    pub silent_in_flight: InFlightPolicy,
    pub interactive_in_flight: InFlightPolicy,
}

impl Default for BrokerOptions {
    fn default() -> Self {
        Self {
            refresh_skew_seconds: REFRESH_SKEW_SECONDS,
            interactive_timeout: None,
            prompt: Prompt::default(),
            silent_in_flight: InFlightPolicy::Wait,
            interactive_in_flight: InFlightPolicy::Reject,
        }
    }
}

impl BrokerOptions {
    #[must_use]
    pub fn from_config(config: &B2cConfig) -> Self {
        Self {
            refresh_skew_seconds: config.refresh_skew_seconds,
            interactive_timeout: config.interactive_timeout(),
            ..Self::default()
        }
    }
}

/// Token acquisition state machine.
///
/// Each call runs `Idle -> Acquiring(mode) -> {Succeeded, InteractionRequired,
/// Failed}`; nothing but the token cache outlives a call. At most one
/// acquisition per `(authority, account, scopes)` runs at a time.
pub struct TokenBroker {
    resolver: Arc<AuthorityResolver>,
    cache: Arc<dyn TokenCache>,
    surface: Arc<dyn InteractiveSurface>,
    refresher: Option<Arc<dyn TokenRefresher>>,
    options: BrokerOptions,
    flights: FlightGuards,
}

impl TokenBroker {
    pub fn new(
        resolver: Arc<AuthorityResolver>,
        cache: Arc<dyn TokenCache>,
        surface: Arc<dyn InteractiveSurface>,
        options: BrokerOptions,
    ) -> Self {
        Self {
            resolver,
            cache,
            surface,
            refresher: None,
            options,
            flights: FlightGuards::default(),
        }
    }

    #[must_use]
    pub fn with_refresher(mut self, refresher: Arc<dyn TokenRefresher>) -> Self {
        self.refresher = Some(refresher);
        self
    }

    #[must_use]
    pub fn options(&self) -> &BrokerOptions {
        &self.options
    }

    pub async fn acquire_interactive(
        &self,
        authority: &Authority,
        scopes: &ScopeSet,
        account: Option<&Account>,
        cancel: &CancellationToken,
    ) -> AcquisitionOutcome {
        self.acquire_interactive_hinted(authority, scopes, account, None, cancel)
            .await
    }

    /// Interactive acquisition with an optional plain login hint, used when
    /// the caller knows the user but has no account record for this policy.
    pub async fn acquire_interactive_hinted(
        &self,
        authority: &Authority,
        scopes: &ScopeSet,
        account: Option<&Account>,
        login_hint: Option<&str>,
        cancel: &CancellationToken,
    ) -> AcquisitionOutcome {
        let correlation_id = Uuid::now_v7();
        let mode = AcquisitionMode::Interactive;
        let policy = match self.resolver.ensure_known(authority) {
            Ok(policy) => policy,
            Err(err) => return self.fail(mode, correlation_id, authority, err),
        };
        let account_id = account.map(|account| &account.home_account_id);
        let key = flight_key(authority, account_id, scopes);
        let _permit = match self
            .flights
            .enter(&key, self.options.interactive_in_flight)
            .await
        {
            Ok(permit) => permit,
            Err(err) => return self.fail(mode, correlation_id, authority, err),
        };
        self.enter(mode, correlation_id, authority, policy, account);

        let request = InteractiveRequest {
            authority: authority.clone(),
            scopes: scopes.clone(),
            account: account.cloned(),
            login_hint: match account {
                Some(account) => account.login_hint().map(str::to_string),
                None => login_hint.map(str::to_string),
            },
            prompt: self.options.prompt,
            correlation_id,
        };
        let presented = async {
            match self.options.interactive_timeout {
                Some(limit) => tokio::time::timeout(limit, self.surface.present(request))
                    .await
                    .map_err(|_| AuthError::TimedOut {
                        seconds: limit.as_secs(),
                    }),
                None => Ok(self.surface.present(request).await),
            }
        };

        // The cache write happens only after the surface future completed, so
        // cancellation can never interrupt it.
        let outcome = tokio::select! {
            biased;
            () = cancel.cancelled() => AcquisitionOutcome::Failure(AuthError::UserCancelled),
            presented = presented => match presented {
                Err(err) => AcquisitionOutcome::Failure(err),
                Ok(Ok(result)) => self.accept(authority, scopes, account, result),
                Ok(Err(err)) => classify_surface_error(err),
            },
        };
        self.finish(mode, correlation_id, authority, outcome)
    }

    pub async fn acquire_silent(
        &self,
        authority: &Authority,
        scopes: &ScopeSet,
        account: Option<&Account>,
        cancel: &CancellationToken,
    ) -> AcquisitionOutcome {
        let correlation_id = Uuid::now_v7();
        let mode = AcquisitionMode::Silent;
        let policy = match self.resolver.ensure_known(authority) {
            Ok(policy) => policy,
            Err(err) => return self.fail(mode, correlation_id, authority, err),
        };
        let Some(account) = account else {
            let err = AuthError::NoMatchingAccount(policy);
            return self.fail(mode, correlation_id, authority, err);
        };
        let key = CacheKey::new(authority, &account.home_account_id, scopes);
        let permit = match self
            .flights
            .enter(&key.to_string(), self.options.silent_in_flight)
            .await
        {
            Ok(permit) => permit,
            Err(err) => return self.fail(mode, correlation_id, authority, err),
        };
        if permit.waited {
            debug!(event = "token_acquisition_joined", correlation_id = %correlation_id);
        }
        self.enter(mode, correlation_id, authority, policy, Some(account));

        let outcome = self
            .silent_inner(&key, authority, scopes, account, correlation_id, cancel)
            .await;
        self.finish(mode, correlation_id, authority, outcome)
    }

    async fn silent_inner(
        &self,
        key: &CacheKey,
        authority: &Authority,
        scopes: &ScopeSet,
        account: &Account,
        correlation_id: Uuid,
        cancel: &CancellationToken,
    ) -> AcquisitionOutcome {
        let cached = match self.cache.get(key) {
            Ok(Some(cached)) => cached,
            Ok(None) => {
                return AcquisitionOutcome::InteractionRequired(InteractionReason::NoCachedToken)
            }
            Err(err) => return AcquisitionOutcome::Failure(err.into()),
        };
        if !cached.is_expired(self.options.refresh_skew_seconds) && cached.has_access_token() {
            debug!(event = "token_cache_hit", correlation_id = %correlation_id);
            return AcquisitionOutcome::Success(cached);
        }
        let Some(refresh_token) = cached.refresh_token.clone() else {
            return AcquisitionOutcome::InteractionRequired(InteractionReason::NoRefreshCredential);
        };
        let Some(refresher) = self.refresher.as_ref() else {
            return AcquisitionOutcome::InteractionRequired(InteractionReason::RefreshUnavailable);
        };

        let request = RefreshRequest {
            authority: authority.clone(),
            scopes: scopes.clone(),
            account: account.clone(),
            refresh_token: refresh_token.clone(),
            correlation_id,
        };
        let refreshed = tokio::select! {
            biased;
            () = cancel.cancelled() => return AcquisitionOutcome::Failure(AuthError::UserCancelled),
            refreshed = refresher.refresh(request) => refreshed,
        };
        match refreshed {
            Ok(mut result) => {
                if result.refresh_token.is_none() {
                    result.refresh_token = Some(refresh_token);
                }
                self.accept(authority, scopes, Some(account), result)
            }
            Err(err) => classify_refresh_error(err),
        }
    }

    /// Silent acquisition with a single interactive retry for the same account.
    ///
    /// The account is passed to the interactive attempt so the provider reuses
    /// its session instead of prompting for an unrelated identity.
    pub async fn acquire_with_fallback(
        &self,
        authority: &Authority,
        scopes: &ScopeSet,
        account: &Account,
        cancel: &CancellationToken,
    ) -> AcquisitionOutcome {
        match self.acquire_silent(authority, scopes, Some(account), cancel).await {
            AcquisitionOutcome::InteractionRequired(reason) => {
                info!(
                    event = "token_acquisition_fallback",
                    account = %account.home_account_id,
                    reason = %reason
                );
                match self
                    .acquire_interactive(authority, scopes, Some(account), cancel)
                    .await
                {
                    AcquisitionOutcome::InteractionRequired(reason) => {
                        AcquisitionOutcome::Failure(AuthError::InteractionRequired(reason))
                    }
                    outcome => outcome,
                }
            }
            outcome => outcome,
        }
    }

    fn accept(
        &self,
        authority: &Authority,
        scopes: &ScopeSet,
        expected: Option<&Account>,
        result: TokenResult,
    ) -> AcquisitionOutcome {
        if let Some(expected) = expected {
            if expected.home_account_id != result.account.home_account_id {
                return AcquisitionOutcome::Failure(AuthError::AccountMismatch {
                    expected: expected.home_account_id.clone(),
                    actual: result.account.home_account_id.clone(),
                });
            }
        }
        let key = CacheKey::new(authority, &result.account.home_account_id, scopes);
        match self.cache.put(key, result.clone()) {
            Ok(()) => AcquisitionOutcome::Success(result),
            Err(err) => AcquisitionOutcome::Failure(err.into()),
        }
    }

    fn enter(
        &self,
        mode: AcquisitionMode,
        correlation_id: Uuid,
        authority: &Authority,
        policy: Policy,
        account: Option<&Account>,
    ) {
        debug!(
            event = "token_acquisition_started",
            state = AcquisitionState::Acquiring(mode).as_str(),
            correlation_id = %correlation_id,
            authority = %authority,
            policy = %policy,
            account = account.map(|account| account.home_account_id.as_str()).unwrap_or("-")
        );
    }

    fn fail(
        &self,
        mode: AcquisitionMode,
        correlation_id: Uuid,
        authority: &Authority,
        err: impl Into<AuthError>,
    ) -> AcquisitionOutcome {
        self.finish(mode, correlation_id, authority, AcquisitionOutcome::Failure(err.into()))
    }

    fn finish(
        &self,
        mode: AcquisitionMode,
        correlation_id: Uuid,
        authority: &Authority,
        outcome: AcquisitionOutcome,
    ) -> AcquisitionOutcome {
        let state = outcome.state();
        match &outcome {
            AcquisitionOutcome::Failure(err) => warn!(
                event = "token_acquisition_finished",
                mode = %mode,
                state = state.as_str(),
                correlation_id = %correlation_id,
                authority = %authority,
                error_kind = err.kind(),
                error = %err
            ),
            _ => info!(
                event = "token_acquisition_finished",
                mode = %mode,
                state = state.as_str(),
                correlation_id = %correlation_id,
                authority = %authority
            ),
        }
        outcome
    }
}

fn flight_key(authority: &Authority, account: Option<&HomeAccountId>, scopes: &ScopeSet) -> String {
    format!(
        "{}|{}|{}",
        authority.as_str().to_ascii_lowercase(),
        account.map_or("*", HomeAccountId::as_str),
        scopes.to_scope_string()
    )
}

fn classify_surface_error(err: SurfaceError) -> AcquisitionOutcome {
    match err {
        SurfaceError::Cancelled => AcquisitionOutcome::Failure(AuthError::UserCancelled),
        SurfaceError::Unavailable(detail) => AcquisitionOutcome::Failure(AuthError::Provider(
            ProviderError::new("surface_unavailable", detail),
        )),
        SurfaceError::Provider(err) => match err.kind() {
            ProviderErrorKind::ForgotPassword => {
                AcquisitionOutcome::PolicyRedirectRequired(Policy::ResetPassword)
            }
            ProviderErrorKind::UserCancelled => {
                AcquisitionOutcome::Failure(AuthError::UserCancelled)
            }
            ProviderErrorKind::InteractionRequired => {
                AcquisitionOutcome::InteractionRequired(InteractionReason::ProviderRequested {
                    detail: err.to_string(),
                })
            }
            ProviderErrorKind::Transient | ProviderErrorKind::Other => {
                AcquisitionOutcome::Failure(AuthError::Provider(err))
            }
        },
    }
}

fn classify_refresh_error(err: ProviderError) -> AcquisitionOutcome {
    match err.kind() {
        ProviderErrorKind::InteractionRequired => {
            AcquisitionOutcome::InteractionRequired(InteractionReason::RefreshRejected {
                detail: err.to_string(),
            })
        }
        ProviderErrorKind::ForgotPassword => {
            AcquisitionOutcome::PolicyRedirectRequired(Policy::ResetPassword)
        }
        ProviderErrorKind::UserCancelled => AcquisitionOutcome::Failure(AuthError::UserCancelled),
        ProviderErrorKind::Transient | ProviderErrorKind::Other => {
            AcquisitionOutcome::Failure(AuthError::Provider(err))
        }
    }
}
