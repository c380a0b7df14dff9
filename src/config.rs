use reqwest::header::HeaderName;
use reqwest::Url;
use thiserror::Error;

use crate::refresh::DEFAULT_WAITER_CAPACITY;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub api: ApiConfig,
    pub csrf: CsrfConfig,
    pub routes: RouteConfig,
    pub session: SessionConfig,
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base URL every endpoint path is joined onto. Always ends with `/`.
    pub base_url: String,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone)]
pub struct CsrfConfig {
    /// Cookie set by the remote service that carries the anti-forgery token
    pub cookie_name: String,
    /// Header the token is mirrored into on state-changing requests
    pub header_name: String,
}

#[derive(Debug, Clone)]
pub struct RouteConfig {
    pub login: String,
    pub register: String,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// JSON file backing the cached profile. `None` keeps it in memory only.
    pub profile_cache_path: Option<String>,
    /// Maximum number of callers parked behind an in-flight renewal
    pub waiter_capacity: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000/api/".to_string(),
            timeout_seconds: 30,
        }
    }
}

impl Default for CsrfConfig {
    fn default() -> Self {
        Self {
            cookie_name: "csrf-token".to_string(),
            header_name: "x-csrf-token".to_string(),
        }
    }
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self {
            login: "/login".to_string(),
            register: "/register".to_string(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            profile_cache_path: None,
            waiter_capacity: DEFAULT_WAITER_CAPACITY,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let base_url = std::env::var("API_BASE_URL")
            .map(|url| normalize_base_url(&url))
            .unwrap_or_else(|_| ApiConfig::default().base_url);

        let timeout_seconds = std::env::var("REQUEST_TIMEOUT_SECONDS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(30);

        let csrf_defaults = CsrfConfig::default();
        let cookie_name =
            std::env::var("CSRF_COOKIE_NAME").unwrap_or(csrf_defaults.cookie_name);
        let header_name =
            std::env::var("CSRF_HEADER_NAME").unwrap_or(csrf_defaults.header_name);

        let profile_cache_path = std::env::var("PROFILE_CACHE_PATH")
            .ok()
            .filter(|p| !p.trim().is_empty());

        let waiter_capacity = std::env::var("RENEWAL_QUEUE_CAPACITY")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_WAITER_CAPACITY);

        let route_defaults = RouteConfig::default();
        let login = std::env::var("LOGIN_ROUTE").unwrap_or(route_defaults.login);
        let register = std::env::var("REGISTER_ROUTE").unwrap_or(route_defaults.register);

        let config = Config {
            api: ApiConfig {
                base_url,
                timeout_seconds,
            },
            csrf: CsrfConfig {
                cookie_name,
                header_name,
            },
            routes: RouteConfig { login, register },
            session: SessionConfig {
                profile_cache_path,
                waiter_capacity,
            },
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        Url::parse(&self.api.base_url).map_err(|e| {
            ConfigError::ValidationError(format!(
                "API_BASE_URL '{}' is not a valid URL: {e}",
                self.api.base_url
            ))
        })?;

        if self.api.timeout_seconds == 0 {
            return Err(ConfigError::ValidationError(
                "REQUEST_TIMEOUT_SECONDS must be greater than 0".to_string(),
            ));
        }

        if self.csrf.cookie_name.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "CSRF_COOKIE_NAME cannot be empty".to_string(),
            ));
        }

        HeaderName::from_bytes(self.csrf.header_name.as_bytes()).map_err(|_| {
            ConfigError::ValidationError(format!(
                "CSRF_HEADER_NAME '{}' is not a valid header name",
                self.csrf.header_name
            ))
        })?;

        if self.session.waiter_capacity == 0 {
            return Err(ConfigError::ValidationError(
                "RENEWAL_QUEUE_CAPACITY must be greater than 0".to_string(),
            ));
        }

        if self.routes.login == self.routes.register {
            tracing::warn!(
                route = %self.routes.login,
                "Login and register routes are identical"
            );
        }

        Ok(())
    }
}

/// Ensure the base URL ends with a slash so relative joins keep its path.
pub fn normalize_base_url(url: &str) -> String {
    let trimmed = url.trim();
    if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{trimmed}/")
    }
}
