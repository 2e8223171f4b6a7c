//! Request specification and outbound request construction.

use crate::body::Body;
use crate::dispatch::DelayRange;
use crate::headers::{self, HeaderMap};
use bytes::Bytes;
use http::Method;
use std::time::Duration;
use url::Url;

/// Per-request timeout applied by the transport.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// A fully formed outbound request.
#[derive(Clone, Debug)]
pub struct Request {
    /// Request method.
    pub method: Method,
    /// Request URL.
    pub url: Url,
    /// Request headers.
    pub headers: HeaderMap,
    /// Request body.
    pub body: Option<Bytes>,
    /// Request timeout.
    pub timeout: Duration,
}

/// Specification of a single dispatch, consumed exactly once by the engine.
#[derive(Debug)]
pub struct RequestSpec {
    pub(crate) method: Method,
    pub(crate) url: Result<Url, url::ParseError>,
    pub(crate) body: Option<Body>,
    pub(crate) headers: HeaderMap,
    pub(crate) validate_status: bool,
    pub(crate) deliver_on_response_queue: bool,
    pub(crate) delay_range: Option<DelayRange>,
}

impl RequestSpec {
    /// Create a specification for `method` against `url`.
    ///
    /// URL resolution happens here; a failure is carried inside the spec and
    /// short-circuits dispatch without touching the transport.
    pub fn new(method: Method, url: &str) -> Self {
        Self {
            method,
            url: Url::parse(url),
            body: None,
            headers: HeaderMap::new(),
            validate_status: true,
            deliver_on_response_queue: true,
            delay_range: None,
        }
    }

    /// GET request specification.
    pub fn get(url: &str) -> Self {
        Self::new(Method::GET, url)
    }

    /// POST request specification.
    pub fn post(url: &str) -> Self {
        Self::new(Method::POST, url)
    }

    /// Attach a body. Forces the effective method to POST.
    pub fn body(mut self, body: Body) -> Self {
        self.body = Some(body);
        self
    }

    /// Add an extra header; extras win over every other header layer.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Enable or disable the status-code check in the decode layer.
    pub fn validate_status(mut self, enabled: bool) -> Self {
        self.validate_status = enabled;
        self
    }

    /// Choose whether the outcome takes a final hop through the response
    /// queue (the default) or is delivered straight from the working queue.
    pub fn deliver_on_response_queue(mut self, enabled: bool) -> Self {
        self.deliver_on_response_queue = enabled;
        self
    }

    /// Override the configuration's default jitter range for this request.
    pub fn delay_range(mut self, range: DelayRange) -> Self {
        self.delay_range = Some(range);
        self
    }
}

/// Assemble the outbound request from a spec and the configuration snapshot.
///
/// Header layers apply default -> configuration -> body-encoding -> caller
/// extras, so later layers always win on key collision.
pub(crate) fn build_request(spec: &RequestSpec, url: Url, overrides: &HeaderMap) -> Request {
    let method = if spec.body.is_some() {
        Method::POST
    } else {
        spec.method.clone()
    };

    let mut headers = headers::default_headers();
    headers.merge(overrides);

    let (payload, encoding_headers) = match &spec.body {
        Some(body) => body.encode(),
        None => (None, Vec::new()),
    };
    for (name, value) in encoding_headers {
        headers.insert(name, value);
    }

    headers.merge(&spec.headers);

    Request {
        method,
        url,
        headers,
        body: payload,
        timeout: REQUEST_TIMEOUT,
    }
}
