//! Configuration for the Halseth authorization server.

use std::time::Duration;

/// OAuth constants.
pub mod oauth {
    use std::time::Duration;

    /// Authorization code lifetime (10 minutes).
    pub const CODE_LIFETIME: Duration = Duration::from_secs(600);

    /// Default display name for the system.
    pub const SYSTEM_NAME: &str = "Halseth";

    /// Client name recorded when registration omits one.
    pub const UNKNOWN_CLIENT_NAME: &str = "Unknown";

    /// Default PKCE method when the authorization request omits one.
    pub const DEFAULT_CHALLENGE_METHOD: &str = "S256";
}

/// Server configuration.
///
/// Built once at startup and shared with every component; nothing reads the
/// environment after that.
#[derive(Clone)]
pub struct Config {
    /// Name shown on the authorization form and used as the challenge realm.
    pub system_name: String,

    /// Public origin of the service. Derived per request when unset.
    pub base_url: Option<String>,

    /// Operator passphrase for the authorization form.
    pub admin_secret: Option<String>,

    /// Static bearer secret accepted by the resource gate.
    pub mcp_auth_secret: Option<String>,

    /// SQLite URL for the durable credential store (in-memory when unset).
    pub database_url: Option<String>,

    /// Authorization code lifetime.
    pub code_lifetime: Duration,
}

impl Config {
    /// Create a configuration with the two operator secrets.
    ///
    /// Empty secrets count as unset.
    #[must_use]
    pub fn new(admin_secret: Option<String>, mcp_auth_secret: Option<String>) -> Self {
        Self {
            system_name: oauth::SYSTEM_NAME.to_string(),
            base_url: None,
            admin_secret: non_empty(admin_secret),
            mcp_auth_secret: non_empty(mcp_auth_secret),
            database_url: None,
            code_lifetime: oauth::CODE_LIFETIME,
        }
    }

    /// Create a test configuration with a fixed public origin and both secrets.
    #[must_use]
    pub fn for_testing(base_url: &str) -> Self {
        Self::new(Some("test-passphrase".to_string()), Some("test-operator-secret".to_string()))
            .with_base_url(base_url)
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        self.base_url = Some(base_url.trim_end_matches('/').to_string());
        self
    }

    #[must_use]
    pub fn with_system_name(mut self, system_name: impl Into<String>) -> Self {
        self.system_name = system_name.into();
        self
    }

    #[must_use]
    pub fn with_database_url(mut self, database_url: impl Into<String>) -> Self {
        self.database_url = Some(database_url.into());
        self
    }

    /// Check if the resource gate is enforcing.
    #[must_use]
    pub const fn gate_enabled(&self) -> bool {
        self.mcp_auth_secret.is_some()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(None, None)
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("system_name", &self.system_name)
            .field("base_url", &self.base_url)
            .field("admin_secret", &self.admin_secret.as_ref().map(|_| "<redacted>"))
            .field("mcp_auth_secret", &self.mcp_auth_secret.as_ref().map(|_| "<redacted>"))
            .field("database_url", &self.database_url)
            .field("code_lifetime", &self.code_lifetime)
            .finish()
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
