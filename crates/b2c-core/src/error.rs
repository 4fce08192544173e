use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{AuthorityError, ConfigError, HomeAccountId, InteractionReason, Policy, ProviderError};

#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CacheError {
    #[error("token cache io error: {message}")]
    Io { message: String },
    #[error("token cache data is corrupt: {message}")]
    Corrupt { message: String },
    #[error("token cache backend unsupported on this platform")]
    Unsupported,
    #[error("token cache backend error: {message}")]
    Backend { message: String },
}

/// Coarse grouping used by callers to decide how to react to an [`AuthError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Misconfiguration; fatal to the operation and never retried.
    Configuration,
    /// Expected control-flow branch the caller handles explicitly.
    FlowSignal,
    /// Network or server side; the caller may retry manually.
    Transient,
    /// The user dismissed the interaction.
    Cancelled,
    /// Caller misuse or state precondition.
    Precondition,
}

#[derive(Error, Debug, Clone)]
pub enum AuthError {
    #[error("malformed authority '{value}': {reason}")]
    MalformedAuthority { value: String, reason: &'static str },
    #[error("authority is not registered for this application: {0}")]
    UnknownAuthority(String),
    #[error("no account available for policy {0}")]
    NoMatchingAccount(Policy),
    #[error("interaction required: {0}")]
    InteractionRequired(InteractionReason),
    #[error("flow must restart under policy {0}")]
    PolicyRedirectRequired(Policy),
    #[error("provider error: {0}")]
    Provider(ProviderError),
    #[error("user cancelled the interaction")]
    UserCancelled,
    #[error("acquisition already in progress for {0}")]
    AcquisitionInProgress(String),
    #[error("acquisition timed out after {seconds}s")]
    TimedOut { seconds: u64 },
    #[error("provider returned account {actual}, expected {expected}")]
    AccountMismatch {
        expected: HomeAccountId,
        actual: HomeAccountId,
    },
    #[error("no active access token")]
    NoActiveToken,
    #[error("resource call failed: {0}")]
    ResourceCall(String),
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl From<AuthorityError> for AuthError {
    fn from(value: AuthorityError) -> Self {
        match value {
            AuthorityError::Malformed { value, reason } => Self::MalformedAuthority { value, reason },
            AuthorityError::Unknown(value) => Self::UnknownAuthority(value),
        }
    }
}

impl From<ProviderError> for AuthError {
    fn from(value: ProviderError) -> Self {
        Self::Provider(value)
    }
}

impl AuthError {
    #[must_use]
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::MalformedAuthority { .. } | Self::UnknownAuthority(_) | Self::Config(_) => {
                ErrorClass::Configuration
            }
            Self::InteractionRequired(_) | Self::PolicyRedirectRequired(_) => ErrorClass::FlowSignal,
            Self::Provider(_) | Self::ResourceCall(_) | Self::Cache(_) | Self::TimedOut { .. } => {
                ErrorClass::Transient
            }
            Self::UserCancelled => ErrorClass::Cancelled,
            Self::NoMatchingAccount(_)
            | Self::AcquisitionInProgress(_)
            | Self::AccountMismatch { .. }
            | Self::NoActiveToken => ErrorClass::Precondition,
        }
    }

    /// Stable snake_case name for structured logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MalformedAuthority { .. } => "malformed_authority",
            Self::UnknownAuthority(_) => "unknown_authority",
            Self::NoMatchingAccount(_) => "no_matching_account",
            Self::InteractionRequired(_) => "interaction_required",
            Self::PolicyRedirectRequired(_) => "policy_redirect_required",
            Self::Provider(_) => "provider_error",
            Self::UserCancelled => "user_cancelled",
            Self::AcquisitionInProgress(_) => "acquisition_in_progress",
            Self::TimedOut { .. } => "timed_out",
            Self::AccountMismatch { .. } => "account_mismatch",
            Self::NoActiveToken => "no_active_token",
            Self::ResourceCall(_) => "resource_call_error",
            Self::Cache(_) => "cache_error",
            Self::Config(_) => "config_error",
        }
    }
}
