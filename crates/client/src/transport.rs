//! Transport seam and the reqwest-backed production transport.

use crate::cookies::CookieJar;
use crate::headers::HeaderMap;
use crate::request::Request;
use async_trait::async_trait;
use bytes::Bytes;
use common::{ApiError, ApiResult};
use http::StatusCode;
use parking_lot::RwLock;
use std::sync::Arc;

/// Response metadata recorded alongside the payload.
#[derive(Clone, Debug)]
pub struct ResponseMeta {
    /// Response status code.
    pub status: StatusCode,
    /// Response headers.
    pub headers: HeaderMap,
}

/// What a single transport attempt produced on success.
#[derive(Clone, Debug, Default)]
pub struct Reply {
    /// Raw response bytes, if any arrived.
    pub body: Option<Bytes>,
    /// Response metadata, if a response was received.
    pub meta: Option<ResponseMeta>,
}

/// Result of one dispatched request.
pub type Outcome = Result<Reply, ApiError>;

/// The seam between the dispatch engine and the actual network stack.
///
/// The engine owns no transport state; tests substitute their own
/// implementation here.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Issue a built request and resolve once the exchange completes.
    async fn issue(&self, request: Request) -> Outcome;
}

/// Production transport over a pooled reqwest client.
pub struct HttpTransport {
    inner: reqwest::Client,
    cookies: Arc<RwLock<CookieJar>>,
}

impl HttpTransport {
    /// Create a transport sharing the given cookie jar.
    pub fn new(cookies: Arc<RwLock<CookieJar>>) -> ApiResult<Self> {
        let inner = reqwest::Client::builder()
            .gzip(true)
            .build()
            .map_err(|err| ApiError::transport(err.to_string()))?;
        Ok(Self { inner, cookies })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn issue(&self, request: Request) -> Outcome {
        let mut builder = self
            .inner
            .request(request.method.clone(), request.url.clone())
            .timeout(request.timeout);

        for (name, value) in request.headers.iter() {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let cookie_header = self.cookies.read().cookie_header(&request.url);
        if !cookie_header.is_empty() {
            builder = builder.header(crate::headers::names::COOKIE, cookie_header);
        }

        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|err| ApiError::transport(err.to_string()))?;

        // Fold Set-Cookie values back into the shared jar.
        {
            let mut jar = self.cookies.write();
            for value in response.headers().get_all(http::header::SET_COOKIE) {
                if let Ok(value) = value.to_str() {
                    jar.add_from_response(response.url(), value);
                }
            }
        }

        let status = response.status();
        let mut headers = HeaderMap::new();
        for (name, value) in response.headers() {
            if let Ok(value) = value.to_str() {
                headers.insert(name.as_str(), value);
            }
        }

        let body = response
            .bytes()
            .await
            .map_err(|err| ApiError::transport(err.to_string()))?;

        Ok(Reply {
            body: Some(body),
            meta: Some(ResponseMeta { status, headers }),
        })
    }
}
