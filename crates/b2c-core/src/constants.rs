/// Instance host used when the configuration does not name one.
pub const DEFAULT_INSTANCE_HOST: &str = "login.microsoftonline.com";

/// Seconds before expiry at which a cached access token is treated as stale.
pub const REFRESH_SKEW_SECONDS: i64 = 30;

/// Upper bound for a protected resource call.
pub const DEFAULT_RESOURCE_TIMEOUT_SECONDS: u64 = 10;

pub mod b2c_codes {
    /// The user clicked "Forgot your password?" on the sign-in page.
    pub const FORGOT_PASSWORD: &str = "AADB2C90118";

    /// The user dismissed a self-asserted page.
    pub const USER_CANCELLED: &str = "AADB2C90091";
}
