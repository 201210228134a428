use secrecy::{ExposeSecret, SecretString};

use crate::error::{Result, RetrieverError};
use crate::model::Service;
use crate::secret::SecretSource;

pub const ENV_TENANT_ID: &str = "CYBERARK_IDENTITY_TENANT_ID";
pub const ENV_SUBDOMAIN: &str = "CYBERARK_SUBDOMAIN";
pub const ENV_CLIENT_ID: &str = "CYBERARK_CLIENT_ID";
pub const ENV_HTTP_TIMEOUT: &str = "CYBERARK_HTTP_TIMEOUT_SECS";

/// Domain hosting both the identity tenant and the policy services.
pub const PLATFORM_DOMAIN: &str = "cyberark.cloud";

const SECRET_PROMPT: &str = "\nEnter client secret: ";

/// Tenant identifiers and client settings read from the environment.
#[derive(Debug, Clone)]
pub struct TenantSettings {
    /// Identity tenant, e.g. `abc1234` in `abc1234.id.cyberark.cloud`
    pub tenant_id: String,

    /// Platform subdomain used by the SCA and SIA services
    pub subdomain: String,

    /// OAuth client id of the service user
    pub client_id: String,

    /// Outbound HTTP settings
    pub http: HttpConfig,
}

#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

/// Everything a run needs, secret included.
#[derive(Debug)]
pub struct RetrieverConfig {
    pub tenant_id: String,
    pub subdomain: String,
    pub client_id: String,
    pub client_secret: SecretString,
    pub http: HttpConfig,
}

impl TenantSettings {
    /// Load settings from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load settings through an arbitrary variable lookup.
    ///
    /// Every missing variable is reported in one error so the user can fix
    /// them all at once.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let tenant_id = read(ENV_TENANT_ID);
        let subdomain = read(ENV_SUBDOMAIN);
        let client_id = read(ENV_CLIENT_ID);

        let missing: Vec<&str> = [
            (ENV_TENANT_ID, tenant_id.is_none()),
            (ENV_SUBDOMAIN, subdomain.is_none()),
            (ENV_CLIENT_ID, client_id.is_none()),
        ]
        .iter()
        .filter(|(_, absent)| *absent)
        .map(|(key, _)| *key)
        .collect();

        let (tenant_id, subdomain, client_id) = match (tenant_id, subdomain, client_id) {
            (Some(t), Some(s), Some(c)) => (t, s, c),
            _ => {
                return Err(RetrieverError::ConfigError(format!(
                    "Missing environment variables: {}. Set them in the environment or a .env file",
                    missing.join(", ")
                )))
            }
        };

        validate_host_label(ENV_TENANT_ID, &tenant_id)?;
        validate_host_label(ENV_SUBDOMAIN, &subdomain)?;

        let timeout_secs = lookup(ENV_HTTP_TIMEOUT)
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .unwrap_or_else(default_timeout);

        Ok(TenantSettings {
            tenant_id,
            subdomain,
            client_id,
            http: HttpConfig { timeout_secs },
        })
    }

    /// Attach the client secret, completing the configuration.
    pub fn with_secret(self, source: &dyn SecretSource) -> Result<RetrieverConfig> {
        let client_secret = source.read_secret(SECRET_PROMPT)?;
        if client_secret.expose_secret().trim().is_empty() {
            return Err(RetrieverError::ConfigError(
                "Client secret must not be empty".to_string(),
            ));
        }

        Ok(RetrieverConfig {
            tenant_id: self.tenant_id,
            subdomain: self.subdomain,
            client_id: self.client_id,
            client_secret,
            http: self.http,
        })
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        HttpConfig {
            timeout_secs: default_timeout(),
        }
    }
}

/// Tenant and subdomain end up inside a hostname.
fn validate_host_label(key: &str, value: &str) -> Result<()> {
    let valid = value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-')
        && !value.starts_with('-')
        && !value.ends_with('-');

    if valid {
        Ok(())
    } else {
        Err(RetrieverError::ConfigError(format!(
            "{} must be a bare host label (letters, digits, '-'), got {:?}",
            key, value
        )))
    }
}

/// Resolved URLs for the token exchange and both policy services.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub token_url: String,
    pub sca_url: String,
    pub sia_url: String,
}

impl Endpoints {
    /// Production URLs for the configured tenant.
    pub fn for_tenant(tenant_id: &str, subdomain: &str) -> Self {
        Endpoints {
            token_url: format!(
                "https://{}.id.{}/oauth2/platformtoken",
                tenant_id, PLATFORM_DOMAIN
            ),
            sca_url: Self::policies_url(subdomain, Service::Sca),
            sia_url: Self::policies_url(subdomain, Service::Sia),
        }
    }

    pub fn from_config(config: &RetrieverConfig) -> Self {
        Self::for_tenant(&config.tenant_id, &config.subdomain)
    }

    fn policies_url(subdomain: &str, service: Service) -> String {
        format!(
            "https://{}.{}.{}/api/policies",
            subdomain,
            service.host_label(),
            PLATFORM_DOMAIN
        )
    }

    pub fn policies(&self, service: Service) -> &str {
        match service {
            Service::Sca => &self.sca_url,
            Service::Sia => &self.sia_url,
        }
    }
}

// Defaults
pub fn default_timeout() -> u64 {
    30
}
