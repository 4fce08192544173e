use serde::{Deserialize, Serialize};

/// User flows a B2C application drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Policy {
    SignUpOrSignIn,
    EditProfile,
    ResetPassword,
}

impl Policy {
    pub const ALL: [Policy; 3] = [
        Policy::SignUpOrSignIn,
        Policy::EditProfile,
        Policy::ResetPassword,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SignUpOrSignIn => "sign_up_or_sign_in",
            Self::EditProfile => "edit_profile",
            Self::ResetPassword => "reset_password",
        }
    }
}

impl std::fmt::Display for Policy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provider-side policy names, one per [`Policy`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicySet {
    #[serde(alias = "sign_up_or_sign_in")]
    pub sign_in: String,
    pub edit_profile: String,
    pub reset_password: String,
}

impl Default for PolicySet {
    fn default() -> Self {
        Self {
            sign_in: "b2c_1_susi".to_string(),
            edit_profile: "b2c_1_edit_profile".to_string(),
            reset_password: "b2c_1_reset".to_string(),
        }
    }
}

impl PolicySet {
    #[must_use]
    pub fn name(&self, policy: Policy) -> &str {
        match policy {
            Policy::SignUpOrSignIn => &self.sign_in,
            Policy::EditProfile => &self.edit_profile,
            Policy::ResetPassword => &self.reset_password,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Policy, &str)> + '_ {
        Policy::ALL.into_iter().map(move |policy| (policy, self.name(policy)))
    }

    /// Maps a provider policy name back to its tag, ignoring case.
    #[must_use]
    pub fn policy_for_name(&self, name: &str) -> Option<Policy> {
        self.iter()
            .find(|(_, configured)| configured.eq_ignore_ascii_case(name))
            .map(|(policy, _)| policy)
    }
}
