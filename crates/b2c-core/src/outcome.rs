use serde::{Deserialize, Serialize};

use crate::constants::b2c_codes;
use crate::{AuthError, Policy, TokenResult};

/// Error reported by the identity provider or the transport in front of it.
///
/// `code` carries the provider-specific error code (B2C `AADB2Cnnnnn`) as a
/// field of its own; classification never looks at `description`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{error}: {description}")]
pub struct ProviderError {
    pub error: String,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: Option<u16>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    /// The user asked to reset their password from the sign-in page.
    ForgotPassword,
    UserCancelled,
    /// The refresh credential or session is no longer usable.
    InteractionRequired,
    Transient,
    Other,
}

impl ProviderError {
    #[must_use]
    pub fn new(error: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: None,
            description: description.into(),
            status: None,
        }
    }

    #[must_use]
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    #[must_use]
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    #[must_use]
    pub fn transport(detail: impl Into<String>) -> Self {
        Self::new("transport_error", detail)
    }

    /// Builds an error from the raw OAuth `error`/`error_description` pair,
    /// lifting a leading B2C code (`AADB2C90118: ...`) into `code`.
    #[must_use]
    pub fn from_oauth(error: &str, description: &str) -> Self {
        let description = description.trim();
        let code = description
            .split(|c: char| c == ':' || c.is_whitespace())
            .next()
            .filter(|token| {
                token.len() > "AADB2C".len()
                    && token.starts_with("AADB2C")
                    && token["AADB2C".len()..].chars().all(|c| c.is_ascii_digit())
            })
            .map(str::to_string);
        Self {
            error: error.trim().to_string(),
            code,
            description: description.to_string(),
            status: None,
        }
    }

    #[must_use]
    pub fn kind(&self) -> ProviderErrorKind {
        match self.code.as_deref() {
            Some(b2c_codes::FORGOT_PASSWORD) => return ProviderErrorKind::ForgotPassword,
            Some(b2c_codes::USER_CANCELLED) => return ProviderErrorKind::UserCancelled,
            _ => {}
        }
        match self.error.as_str() {
            "interaction_required" | "login_required" | "consent_required" | "invalid_grant" => {
                ProviderErrorKind::InteractionRequired
            }
            "server_error" | "temporarily_unavailable" | "transport_error" => {
                ProviderErrorKind::Transient
            }
            _ if self.status.is_some_and(|status| status >= 500) => ProviderErrorKind::Transient,
            _ => ProviderErrorKind::Other,
        }
    }
}

/// Why a silent acquisition could not complete without the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InteractionReason {
    #[error("no cached token for this account")]
    NoCachedToken,
    #[error("cached token has no refresh credential")]
    NoRefreshCredential,
    #[error("no token refresher configured")]
    RefreshUnavailable,
    #[error("refresh credential rejected: {detail}")]
    RefreshRejected { detail: String },
    #[error("provider requested interaction: {detail}")]
    ProviderRequested { detail: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AcquisitionMode {
    Interactive,
    Silent,
}

impl AcquisitionMode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Interactive => "interactive",
            Self::Silent => "silent",
        }
    }
}

impl std::fmt::Display for AcquisitionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "mode", rename_all = "snake_case")]
pub enum AcquisitionState {
    Idle,
    Acquiring(AcquisitionMode),
    Succeeded,
    InteractionRequired,
    Failed,
}

impl AcquisitionState {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Acquiring(AcquisitionMode::Interactive) => "acquiring_interactive",
            Self::Acquiring(AcquisitionMode::Silent) => "acquiring_silent",
            Self::Succeeded => "succeeded",
            Self::InteractionRequired => "interaction_required",
            Self::Failed => "failed",
        }
    }
}

/// Result of one acquisition attempt.
#[derive(Debug, Clone)]
pub enum AcquisitionOutcome {
    Success(TokenResult),
    InteractionRequired(InteractionReason),
    /// The flow must restart under another policy (e.g. password reset).
    PolicyRedirectRequired(Policy),
    Failure(AuthError),
}

impl AcquisitionOutcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Terminal state this outcome leaves the acquisition in.
    #[must_use]
    pub fn state(&self) -> AcquisitionState {
        match self {
            Self::Success(_) => AcquisitionState::Succeeded,
            Self::InteractionRequired(_) | Self::PolicyRedirectRequired(_) => {
                AcquisitionState::InteractionRequired
            }
            Self::Failure(_) => AcquisitionState::Failed,
        }
    }

    /// Collapses flow signals into their error variants.
    pub fn into_result(self) -> Result<TokenResult, AuthError> {
        match self {
            Self::Success(result) => Ok(result),
            Self::InteractionRequired(reason) => Err(AuthError::InteractionRequired(reason)),
            Self::PolicyRedirectRequired(policy) => Err(AuthError::PolicyRedirectRequired(policy)),
            Self::Failure(err) => Err(err),
        }
    }
}
