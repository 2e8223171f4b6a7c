//! HTTP header handling and the fixed Meridian header set.

use indexmap::IndexMap;
use std::fmt;

/// HTTP header map (case-insensitive keys, order-preserving).
#[derive(Clone, Debug, Default)]
pub struct HeaderMap {
    headers: IndexMap<String, String>,
}

impl HeaderMap {
    /// Create a new empty header map.
    pub fn new() -> Self {
        Self {
            headers: IndexMap::new(),
        }
    }

    /// Insert a header, replacing any existing value for the same name.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into().to_lowercase();
        self.headers.insert(name, value.into());
    }

    /// Get a header value.
    pub fn get(&self, name: &str) -> Option<&String> {
        self.headers.get(&name.to_lowercase())
    }

    /// Check if a header exists.
    pub fn contains(&self, name: &str) -> bool {
        self.headers.contains_key(&name.to_lowercase())
    }

    /// Remove a header.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.headers.shift_remove(&name.to_lowercase())
    }

    /// Get number of headers.
    pub fn len(&self) -> usize {
        self.headers.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    /// Iterate over headers.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.headers.iter()
    }

    /// Merge another map into this one; its entries win on collision.
    pub fn merge(&mut self, other: &HeaderMap) {
        for (name, value) in other.iter() {
            self.insert(name.clone(), value.clone());
        }
    }
}

impl fmt::Display for HeaderMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in &self.headers {
            writeln!(f, "{}: {}", name, value)?;
        }
        Ok(())
    }
}

/// Common HTTP headers.
pub mod names {
    pub const ACCEPT_LANGUAGE: &str = "accept-language";
    pub const CONTENT_ENCODING: &str = "content-encoding";
    pub const CONTENT_TYPE: &str = "content-type";
    pub const COOKIE: &str = "cookie";
    pub const SET_COOKIE: &str = "set-cookie";
    pub const USER_AGENT: &str = "user-agent";
    pub const CAPABILITY: &str = "x-meridian-capability";
    pub const CONNECTION_TYPE: &str = "x-connection-type";
}

/// Fixed header values the Meridian API expects on every request.
///
/// These are domain constants supplied once; they are the lowest layer of the
/// header merge and can be overridden by configuration and per-call headers.
pub mod defaults {
    pub const ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9";
    pub const CAPABILITY: &str = "c2Vzc2lvbi1kaXNwYXRjaC12Mg";
    pub const CONNECTION_TYPE: &str = "wifi";
    pub const CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
    pub const USER_AGENT: &str = "MeridianClient/2.4.1";
}

/// Build the default header set for an outbound request.
pub fn default_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(names::ACCEPT_LANGUAGE, defaults::ACCEPT_LANGUAGE);
    headers.insert(names::CAPABILITY, defaults::CAPABILITY);
    headers.insert(names::CONNECTION_TYPE, defaults::CONNECTION_TYPE);
    headers.insert(names::CONTENT_TYPE, defaults::CONTENT_TYPE);
    headers.insert(names::USER_AGENT, defaults::USER_AGENT);
    headers
}
