//! Environment-backed configuration.
//!
//! Server settings use `CASHGUARD_*` variables. Upstream credentials keep the names the
//! deployment already provides (`GEMINI_API_KEY`, `GCP_*`, `ENABLE_VERTEX_AI`).

pub mod error;


pub use error::ConfigError;

use std::env;
use std::fmt;
use std::net::IpAddr;
use std::time::Duration;

use crate::constants::{
    DEFAULT_GEMINI_MODEL, DEFAULT_RATE_LIMIT_MAX, DEFAULT_RATE_LIMIT_MAX_KEYS,
    DEFAULT_RATE_LIMIT_WINDOW_SECS, DEFAULT_UPSTREAM_TIMEOUT_SECS,
};

/// Deployment environment. Development attaches diagnostic detail to error bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Production,
    Development,
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "production" | "prod" => Ok(Self::Production),
            "development" | "dev" => Ok(Self::Development),
            _ => Err(format!("Unknown environment: {}", s)),
        }
    }
}

/// Server configuration loaded from environment variables.
///
/// `Debug` redacts credentials.
#[derive(Clone)]
pub struct Config {
    /// HTTP server port. Default: `8080`.
    pub port: u16,

    /// IP address to bind to. Default: `127.0.0.1`.
    pub bind_addr: IpAddr,

    /// Generative model API key. Absent means every validation fails with a configuration
    /// error; the server still starts so health probes work.
    pub gemini_api_key: Option<String>,

    /// Default generative model. Default: `gemini-2.5-pro`.
    pub gemini_model: String,

    /// Classifier feature flag. Default: `true`.
    pub vertex_enabled: bool,

    pub gcp_project: Option<String>,
    pub gcp_location: Option<String>,
    pub gcp_endpoint_id: Option<String>,

    /// Project hosting the classifier endpoint when it differs from `gcp_project`.
    pub gcp_vertex_project: Option<String>,

    /// Static bearer token for the classifier. When unset, tokens come from the GCE
    /// metadata server.
    pub gcp_access_token: Option<String>,

    /// Deadline applied to each upstream call. Default: 30 s.
    pub upstream_timeout: Duration,

    /// Admitted validations per client per window. Default: `10`.
    pub rate_limit_max: u32,

    /// Admission window. Default: 60 s.
    pub rate_limit_window: Duration,

    /// Bound on tracked client keys. Default: `100_000`.
    pub rate_limit_max_keys: u64,

    pub environment: Environment,
}

/// Resolved classifier endpoint settings; only exists when the classifier is usable.
#[derive(Clone, PartialEq, Eq)]
pub struct VertexSettings {
    pub project: String,
    pub location: String,
    pub endpoint_id: String,
    pub access_token: Option<String>,
}

impl VertexSettings {
    /// `projects/{project}/locations/{location}/endpoints/{id}`
    pub fn endpoint_path(&self) -> String {
        format!(
            "projects/{}/locations/{}/endpoints/{}",
            self.project, self.location, self.endpoint_id
        )
    }

    /// Regional REST URL of the `:predict` method.
    pub fn predict_url(&self) -> String {
        format!(
            "https://{}-aiplatform.googleapis.com/v1/{}:predict",
            self.location,
            self.endpoint_path()
        )
    }
}

impl fmt::Debug for VertexSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VertexSettings")
            .field("project", &self.project)
            .field("location", &self.location)
            .field("endpoint_id", &self.endpoint_id)
            .field("access_token", &redact(&self.access_token))
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            bind_addr: IpAddr::V4(std::net::Ipv4Addr::new(127, 0, 0, 1)),
            gemini_api_key: None,
            gemini_model: DEFAULT_GEMINI_MODEL.to_string(),
            vertex_enabled: true,
            gcp_project: None,
            gcp_location: None,
            gcp_endpoint_id: None,
            gcp_vertex_project: None,
            gcp_access_token: None,
            upstream_timeout: Duration::from_secs(DEFAULT_UPSTREAM_TIMEOUT_SECS),
            rate_limit_max: DEFAULT_RATE_LIMIT_MAX,
            rate_limit_window: Duration::from_secs(DEFAULT_RATE_LIMIT_WINDOW_SECS),
            rate_limit_max_keys: DEFAULT_RATE_LIMIT_MAX_KEYS,
            environment: Environment::default(),
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("port", &self.port)
            .field("bind_addr", &self.bind_addr)
            .field("gemini_api_key", &redact(&self.gemini_api_key))
            .field("gemini_model", &self.gemini_model)
            .field("vertex_enabled", &self.vertex_enabled)
            .field("gcp_project", &self.gcp_project)
            .field("gcp_location", &self.gcp_location)
            .field("gcp_endpoint_id", &self.gcp_endpoint_id)
            .field("gcp_vertex_project", &self.gcp_vertex_project)
            .field("gcp_access_token", &redact(&self.gcp_access_token))
            .field("upstream_timeout", &self.upstream_timeout)
            .field("rate_limit_max", &self.rate_limit_max)
            .field("rate_limit_window", &self.rate_limit_window)
            .field("rate_limit_max_keys", &self.rate_limit_max_keys)
            .field("environment", &self.environment)
            .finish()
    }
}

fn redact(secret: &Option<String>) -> &'static str {
    if secret.is_some() { "<redacted>" } else { "<unset>" }
}

impl Config {
    pub const ENV_PORT: &'static str = "CASHGUARD_PORT";
    pub const ENV_BIND_ADDR: &'static str = "CASHGUARD_BIND_ADDR";
    pub const ENV_GEMINI_API_KEY: &'static str = "GEMINI_API_KEY";
    pub const ENV_GEMINI_MODEL: &'static str = "GEMINI_MODEL";
    pub const ENV_ENABLE_VERTEX: &'static str = "ENABLE_VERTEX_AI";
    pub const ENV_ENABLE_VERTEX_PUBLIC: &'static str = "NEXT_PUBLIC_ENABLE_VERTEX_AI";
    pub const ENV_GCP_PROJECT: &'static str = "GCP_PROJECT";
    pub const ENV_GCP_LOCATION: &'static str = "GCP_LOCATION";
    pub const ENV_GCP_ENDPOINT_ID: &'static str = "GCP_ENDPOINT_ID";
    pub const ENV_GCP_VERTEX_PROJECT: &'static str = "GCP_VERTEX_PROJECT";
    pub const ENV_GCP_ACCESS_TOKEN: &'static str = "GCP_ACCESS_TOKEN";
    pub const ENV_UPSTREAM_TIMEOUT_SECS: &'static str = "CASHGUARD_UPSTREAM_TIMEOUT_SECS";
    pub const ENV_RATE_LIMIT_MAX: &'static str = "CASHGUARD_RATE_LIMIT_MAX";
    pub const ENV_RATE_LIMIT_WINDOW_SECS: &'static str = "CASHGUARD_RATE_LIMIT_WINDOW_SECS";
    pub const ENV_RATE_LIMIT_MAX_KEYS: &'static str = "CASHGUARD_RATE_LIMIT_MAX_KEYS";
    pub const ENV_ENVIRONMENT: &'static str = "CASHGUARD_ENV";

    /// Loads configuration from environment variables (falling back to defaults).
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let port = Self::parse_port_from_env(defaults.port)?;
        let bind_addr = Self::parse_bind_addr_from_env(defaults.bind_addr)?;
        let gemini_api_key = Self::parse_optional_string_from_env(Self::ENV_GEMINI_API_KEY);
        let gemini_model = Self::parse_optional_string_from_env(Self::ENV_GEMINI_MODEL)
            .unwrap_or(defaults.gemini_model);
        let vertex_enabled = Self::parse_vertex_flag_from_env(defaults.vertex_enabled);
        let gcp_project = Self::parse_optional_string_from_env(Self::ENV_GCP_PROJECT);
        let gcp_location = Self::parse_optional_string_from_env(Self::ENV_GCP_LOCATION);
        let gcp_endpoint_id = Self::parse_optional_string_from_env(Self::ENV_GCP_ENDPOINT_ID);
        let gcp_vertex_project =
            Self::parse_optional_string_from_env(Self::ENV_GCP_VERTEX_PROJECT);
        let gcp_access_token = Self::parse_optional_string_from_env(Self::ENV_GCP_ACCESS_TOKEN);
        let upstream_timeout = Self::parse_u64_from_env(
            Self::ENV_UPSTREAM_TIMEOUT_SECS,
            defaults.upstream_timeout.as_secs(),
        )
        .map(Duration::from_secs)?;
        let rate_limit_max = Self::parse_u64_from_env(
            Self::ENV_RATE_LIMIT_MAX,
            u64::from(defaults.rate_limit_max),
        )
        .and_then(|v| {
            u32::try_from(v).map_err(|_| ConfigError::InvalidValue {
                name: Self::ENV_RATE_LIMIT_MAX,
                reason: format!("{} exceeds {}", v, u32::MAX),
            })
        })?;
        let rate_limit_window = Self::parse_u64_from_env(
            Self::ENV_RATE_LIMIT_WINDOW_SECS,
            defaults.rate_limit_window.as_secs(),
        )
        .map(Duration::from_secs)?;
        let rate_limit_max_keys =
            Self::parse_u64_from_env(Self::ENV_RATE_LIMIT_MAX_KEYS, defaults.rate_limit_max_keys)?;
        let environment = env::var(Self::ENV_ENVIRONMENT)
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.environment);

        Ok(Self {
            port,
            bind_addr,
            gemini_api_key,
            gemini_model,
            vertex_enabled,
            gcp_project,
            gcp_location,
            gcp_endpoint_id,
            gcp_vertex_project,
            gcp_access_token,
            upstream_timeout,
            rate_limit_max,
            rate_limit_window,
            rate_limit_max_keys,
            environment,
        })
    }

    /// Validates basic invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.upstream_timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                name: Self::ENV_UPSTREAM_TIMEOUT_SECS,
                reason: "must be at least 1 second".to_string(),
            });
        }
        if self.rate_limit_max == 0 {
            return Err(ConfigError::InvalidValue {
                name: Self::ENV_RATE_LIMIT_MAX,
                reason: "must admit at least one call per window".to_string(),
            });
        }
        if self.rate_limit_window.is_zero() {
            return Err(ConfigError::InvalidValue {
                name: Self::ENV_RATE_LIMIT_WINDOW_SECS,
                reason: "must be at least 1 second".to_string(),
            });
        }
        if self.rate_limit_max_keys == 0 {
            return Err(ConfigError::InvalidValue {
                name: Self::ENV_RATE_LIMIT_MAX_KEYS,
                reason: "must track at least one client".to_string(),
            });
        }
        Ok(())
    }

    /// Returns `"{bind_addr}:{port}"` (useful for logging/binding).
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }

    /// Returns the generative model API key or the name of the missing variable.
    pub fn require_gemini_api_key(&self) -> Result<&str, ConfigError> {
        self.gemini_api_key
            .as_deref()
            .ok_or(ConfigError::MissingEnvVar {
                name: Self::ENV_GEMINI_API_KEY,
            })
    }

    /// Classifier settings, or `None` when the flag is off or an identifier is missing.
    pub fn vertex_settings(&self) -> Option<VertexSettings> {
        if !self.vertex_enabled {
            return None;
        }
        let project = self.gcp_project.as_ref()?;
        let location = self.gcp_location.as_ref()?;
        let endpoint_id = self.gcp_endpoint_id.as_ref()?;

        Some(VertexSettings {
            project: self
                .gcp_vertex_project
                .clone()
                .unwrap_or_else(|| project.clone()),
            location: location.clone(),
            endpoint_id: endpoint_id.clone(),
            access_token: self.gcp_access_token.clone(),
        })
    }

    #[inline]
    pub fn is_development(&self) -> bool {
        self.environment == Environment::Development
    }

    fn parse_port_from_env(default: u16) -> Result<u16, ConfigError> {
        match env::var(Self::ENV_PORT) {
            Ok(value) => {
                let port: u16 = value.parse().map_err(|e| ConfigError::PortParseError {
                    value: value.clone(),
                    source: e,
                })?;

                if port == 0 {
                    return Err(ConfigError::InvalidPort { value });
                }

                Ok(port)
            }
            Err(_) => Ok(default),
        }
    }

    fn parse_bind_addr_from_env(default: IpAddr) -> Result<IpAddr, ConfigError> {
        match env::var(Self::ENV_BIND_ADDR) {
            Ok(value) => value
                .parse()
                .map_err(|e| ConfigError::InvalidBindAddr { value, source: e }),
            Err(_) => Ok(default),
        }
    }

    // Only the literal "false" disables; the public variant is read when the server one is unset.
    fn parse_vertex_flag_from_env(default: bool) -> bool {
        env::var(Self::ENV_ENABLE_VERTEX)
            .or_else(|_| env::var(Self::ENV_ENABLE_VERTEX_PUBLIC))
            .map(|v| !v.trim().eq_ignore_ascii_case("false"))
            .unwrap_or(default)
    }

    fn parse_optional_string_from_env(var_name: &str) -> Option<String> {
        env::var(var_name)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn parse_u64_from_env(var_name: &'static str, default: u64) -> Result<u64, ConfigError> {
        match env::var(var_name) {
            Ok(value) => value
                .trim()
                .parse()
                .map_err(|e: std::num::ParseIntError| ConfigError::InvalidValue {
                    name: var_name,
                    reason: format!("'{}' is not a non-negative integer: {}", value, e),
                }),
            Err(_) => Ok(default),
        }
    }
}
