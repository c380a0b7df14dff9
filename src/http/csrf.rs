//! Anti-forgery credential attacher
//!
//! Mirrors the CSRF token from the cookie the remote service sets into a
//! request header. Only state-changing methods carry it. The token is read
//! from the cookie store on every request and never cached here.

use cookie::Cookie;
use reqwest::cookie::CookieStore;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, Url};
use tracing::trace;

use crate::config::{ConfigError, CsrfConfig};

#[derive(Debug, Clone)]
pub struct CsrfAttacher {
    cookie_name: String,
    header_name: HeaderName,
}

impl CsrfAttacher {
    pub fn new(config: &CsrfConfig) -> Result<Self, ConfigError> {
        let header_name = HeaderName::from_bytes(config.header_name.as_bytes()).map_err(|_| {
            ConfigError::ValidationError(format!(
                "'{}' is not a valid header name",
                config.header_name
            ))
        })?;

        Ok(Self {
            cookie_name: config.cookie_name.clone(),
            header_name,
        })
    }

    pub fn header_name(&self) -> &HeaderName {
        &self.header_name
    }

    /// Add the anti-forgery header for state-changing requests.
    ///
    /// A missing cookie leaves the request untouched; rejecting it is up to
    /// the remote service.
    pub fn attach<C: CookieStore + ?Sized>(
        &self,
        method: &Method,
        cookies: &C,
        url: &Url,
        headers: &mut HeaderMap,
    ) {
        if method.is_safe() {
            return;
        }

        let Some(token) = self.read_token(cookies, url) else {
            trace!(method = %method, url = %url, "No CSRF cookie present");
            return;
        };

        match HeaderValue::from_str(&token) {
            Ok(value) => {
                headers.insert(self.header_name.clone(), value);
            }
            Err(_) => trace!(cookie = %self.cookie_name, "CSRF cookie is not a valid header value"),
        }
    }

    /// Look up the token cookie among the cookies that would be sent to `url`.
    ///
    /// The value is percent-decoded, matching what the remote service
    /// compares the header against.
    pub fn read_token<C: CookieStore + ?Sized>(&self, cookies: &C, url: &Url) -> Option<String> {
        let header = cookies.cookies(url)?;
        let raw = header.to_str().ok()?;

        Cookie::split_parse_encoded(raw)
            .filter_map(Result::ok)
            .find(|cookie| cookie.name() == self.cookie_name)
            .map(|cookie| cookie.value_trimmed().to_string())
            .filter(|value| !value.is_empty())
    }
}
