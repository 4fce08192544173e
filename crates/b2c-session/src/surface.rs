use async_trait::async_trait;
use b2c_core::{Account, Authority, ProviderError, ScopeSet, TokenResult};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Prompt {
    #[default]
    SelectAccount,
    Login,
    Consent,
}

impl Prompt {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SelectAccount => "select_account",
            Self::Login => "login",
            Self::Consent => "consent",
        }
    }
}

/// Everything a user-facing authentication surface needs to run one prompt.
#[derive(Debug, Clone)]
pub struct InteractiveRequest {
    pub authority: Authority,
    pub scopes: ScopeSet,
    /// Account whose existing provider session should be reused.
    pub account: Option<Account>,
    /// Username to prefill when no account is passed.
    pub login_hint: Option<String>,
    pub prompt: Prompt,
    pub correlation_id: Uuid,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum SurfaceError {
    #[error("user cancelled the interaction")]
    Cancelled,
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error("authentication surface unavailable: {0}")]
    Unavailable(String),
}

/// Browser, web view or console prompt that completes an interactive flow.
#[async_trait]
pub trait InteractiveSurface: Send + Sync {
    async fn present(&self, request: InteractiveRequest) -> Result<TokenResult, SurfaceError>;
}

pub struct RefreshRequest {
    pub authority: Authority,
    pub scopes: ScopeSet,
    pub account: Account,
    pub refresh_token: String,
    pub correlation_id: Uuid,
}

impl std::fmt::Debug for RefreshRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshRequest")
            .field("authority", &self.authority.as_str())
            .field("scopes", &self.scopes)
            .field("account", &self.account.home_account_id)
            .field("refresh_token", &"<redacted>")
            .field("correlation_id", &self.correlation_id)
            .finish()
    }
}

/// Token endpoint client that redeems a refresh credential.
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh(&self, request: RefreshRequest) -> Result<TokenResult, ProviderError>;
}
