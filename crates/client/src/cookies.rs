//! Cookie storage and session restoration.

use common::ApiResult;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};
use url::Url;

/// Origin the restored session cookies are scoped to.
pub const SESSION_ORIGIN: &str = "https://api.meridian.app/";

/// A cookie.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Cookie {
    /// Cookie name.
    pub name: String,
    /// Cookie value.
    pub value: String,
    /// Domain.
    #[serde(default)]
    pub domain: Option<String>,
    /// Path.
    #[serde(default)]
    pub path: Option<String>,
    /// Expiration time (Unix timestamp). `None` means session-scoped.
    #[serde(default)]
    pub expires: Option<u64>,
    /// Secure flag.
    #[serde(default)]
    pub secure: bool,
    /// HttpOnly flag.
    #[serde(default)]
    pub http_only: bool,
}

impl Cookie {
    /// Create a new cookie.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            domain: None,
            path: None,
            expires: None,
            secure: false,
            http_only: false,
        }
    }

    /// Parse a Set-Cookie header.
    pub fn parse(header: &str) -> Option<Self> {
        let mut parts = header.split(';').map(|s| s.trim());

        // First part is name=value
        let name_value = parts.next()?;
        let (name, value) = name_value.split_once('=')?;

        let mut cookie = Cookie::new(name.trim(), value.trim());

        for attr in parts {
            let (attr_name, attr_value) = attr
                .split_once('=')
                .map(|(n, v)| (n.trim().to_lowercase(), Some(v.trim())))
                .unwrap_or_else(|| (attr.trim().to_lowercase(), None));

            match attr_name.as_str() {
                "domain" => cookie.domain = attr_value.map(|s| s.to_string()),
                "path" => cookie.path = attr_value.map(|s| s.to_string()),
                "max-age" => {
                    cookie.expires = attr_value
                        .and_then(|s| s.parse::<u64>().ok())
                        .map(|age| unix_now() + age);
                }
                "secure" => cookie.secure = true,
                "httponly" => cookie.http_only = true,
                _ => {}
            }
        }

        Some(cookie)
    }

    /// Check if the cookie is expired.
    pub fn is_expired(&self) -> bool {
        match self.expires {
            Some(expires) => expires < unix_now(),
            None => false,
        }
    }

    /// Check if cookie is valid for a URL.
    pub fn matches_url(&self, url: &Url) -> bool {
        if self.secure && url.scheme() != "https" {
            return false;
        }

        if let Some(domain) = &self.domain {
            match url.host_str() {
                Some(host) if host.ends_with(domain) || host == domain.trim_start_matches('.') => {}
                _ => return false,
            }
        }

        if let Some(path) = &self.path {
            if !url.path().starts_with(path.as_str()) {
                return false;
            }
        }

        true
    }
}

/// Cookie jar for storing cookies.
///
/// This is the one piece of globally mutable shared state in the client;
/// callers wrap it in `Arc<RwLock<_>>` and hand it to the transport and to
/// `restore_session`.
#[derive(Clone, Debug, Default)]
pub struct CookieJar {
    /// Cookies indexed by domain and name.
    cookies: HashMap<String, IndexMap<String, Cookie>>,
}

impl CookieJar {
    /// Create a new cookie jar.
    pub fn new() -> Self {
        Self {
            cookies: HashMap::new(),
        }
    }

    /// Add a cookie from a Set-Cookie response header.
    pub fn add_from_response(&mut self, url: &Url, header: &str) {
        if let Some(mut cookie) = Cookie::parse(header) {
            if cookie.domain.is_none() {
                cookie.domain = url.host_str().map(|s| s.to_string());
            }
            if cookie.path.is_none() {
                cookie.path = Some(url.path().to_string());
            }
            self.add(cookie);
        }
    }

    /// Add a cookie, replacing any same-named cookie for the same domain.
    pub fn add(&mut self, cookie: Cookie) {
        let domain = cookie.domain.clone().unwrap_or_default();
        let cookies = self.cookies.entry(domain).or_default();
        cookies.insert(cookie.name.clone(), cookie);
    }

    /// Get cookies valid for a URL.
    pub fn get_cookies(&self, url: &Url) -> Vec<&Cookie> {
        let host = url.host_str().unwrap_or("");

        let mut result = Vec::new();
        for (domain, cookies) in &self.cookies {
            if host.ends_with(domain) || host == domain.trim_start_matches('.') {
                for cookie in cookies.values() {
                    if !cookie.is_expired() && cookie.matches_url(url) {
                        result.push(cookie);
                    }
                }
            }
        }
        result
    }

    /// Get the Cookie header value for a URL.
    pub fn cookie_header(&self, url: &Url) -> String {
        self.get_cookies(url)
            .iter()
            .map(|c| format!("{}={}", c.name, c.value))
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// Clear all cookies.
    pub fn clear(&mut self) {
        self.cookies.clear();
    }

    /// Get total number of cookies.
    pub fn len(&self) -> usize {
        self.cookies.values().map(|c| c.len()).sum()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.cookies.values().all(|c| c.is_empty())
    }
}

/// Restore a persisted session's cookies into the shared jar.
///
/// Each blob is a serialized cookie record; records that fail to parse are
/// skipped, so the restore is best-effort rather than all-or-nothing.
/// Restored cookies are scoped to [`SESSION_ORIGIN`]; if that URL cannot be
/// constructed the whole operation fails before anything is installed.
pub fn restore_session(jar: &parking_lot::RwLock<CookieJar>, blobs: &[Vec<u8>]) -> ApiResult<()> {
    let origin = Url::parse(SESSION_ORIGIN)?;

    let mut restored = 0usize;
    let mut jar = jar.write();
    for blob in blobs {
        let mut cookie: Cookie = match serde_json::from_slice(blob) {
            Ok(cookie) => cookie,
            Err(err) => {
                tracing::debug!("skipping unreadable cookie record: {}", err);
                continue;
            }
        };
        if cookie.domain.is_none() {
            cookie.domain = origin.host_str().map(|s| s.to_string());
        }
        if cookie.path.is_none() {
            cookie.path = Some("/".to_string());
        }
        jar.add(cookie);
        restored += 1;
    }
    tracing::debug!(restored, total = blobs.len(), "session cookies restored");
    Ok(())
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
