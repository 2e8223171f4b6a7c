//! Session-wide configuration shared by every dispatch.

use crate::cookies::CookieJar;
use crate::dispatch::DelayRange;
use crate::headers::HeaderMap;
use crate::queue::WorkQueue;
use crate::transport::{HttpTransport, Transport};
use common::ApiResult;
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::runtime::Handle;

/// Process-wide configuration snapshot for the dispatch layer.
///
/// Owned by the embedding application and handed around as
/// `Arc<SessionConfig>`; the dispatch core itself only ever holds a `Weak`
/// back-reference and reads a snapshot per request.
pub struct SessionConfig {
    transport: Arc<dyn Transport>,
    request_queue: WorkQueue,
    working_queue: WorkQueue,
    response_queue: WorkQueue,
    header_overrides: HeaderMap,
    default_delay_range: Option<DelayRange>,
    cookies: Arc<RwLock<CookieJar>>,
    runtime: Handle,
}

impl SessionConfig {
    /// Configuration with the production transport and no overrides.
    ///
    /// Must be called within a tokio runtime.
    pub fn new() -> ApiResult<Arc<Self>> {
        SessionConfigBuilder::new().build()
    }

    /// Start building a configuration.
    pub fn builder() -> SessionConfigBuilder {
        SessionConfigBuilder::new()
    }

    /// The transport requests are issued against.
    pub fn transport(&self) -> Arc<dyn Transport> {
        self.transport.clone()
    }

    /// Queue deferred dispatch steps are scheduled on.
    pub fn request_queue(&self) -> &WorkQueue {
        &self.request_queue
    }

    /// Queue transport completions are mapped on.
    pub fn working_queue(&self) -> &WorkQueue {
        &self.working_queue
    }

    /// Queue outcomes are delivered on by default.
    pub fn response_queue(&self) -> &WorkQueue {
        &self.response_queue
    }

    /// Header overrides applied on top of the fixed default set.
    pub fn header_overrides(&self) -> &HeaderMap {
        &self.header_overrides
    }

    /// Default jitter range for asynchronous dispatch.
    pub fn default_delay_range(&self) -> Option<DelayRange> {
        self.default_delay_range
    }

    /// The shared cookie jar.
    pub fn cookies(&self) -> &Arc<RwLock<CookieJar>> {
        &self.cookies
    }

    pub(crate) fn runtime(&self) -> &Handle {
        &self.runtime
    }
}

/// Builder for [`SessionConfig`].
pub struct SessionConfigBuilder {
    transport: Option<Arc<dyn Transport>>,
    header_overrides: HeaderMap,
    default_delay_range: Option<DelayRange>,
    cookies: Option<Arc<RwLock<CookieJar>>>,
}

impl SessionConfigBuilder {
    pub fn new() -> Self {
        Self {
            transport: None,
            header_overrides: HeaderMap::new(),
            default_delay_range: None,
            cookies: None,
        }
    }

    /// Substitute the transport (tests use this for mocks).
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Add a header override; overrides beat the fixed defaults.
    pub fn header_override(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.header_overrides.insert(name, value);
        self
    }

    /// Set the default jitter range for asynchronous dispatch.
    pub fn delay_range(mut self, range: DelayRange) -> Self {
        self.default_delay_range = Some(range);
        self
    }

    /// Use an existing cookie jar instead of a fresh one.
    pub fn cookies(mut self, cookies: Arc<RwLock<CookieJar>>) -> Self {
        self.cookies = Some(cookies);
        self
    }

    /// Build the configuration, spawning the three work queues.
    ///
    /// Must be called within a tokio runtime.
    pub fn build(self) -> ApiResult<Arc<SessionConfig>> {
        let cookies = self
            .cookies
            .unwrap_or_else(|| Arc::new(RwLock::new(CookieJar::new())));
        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(HttpTransport::new(cookies.clone())?),
        };

        Ok(Arc::new(SessionConfig {
            transport,
            request_queue: WorkQueue::new("meridian.request"),
            working_queue: WorkQueue::new("meridian.working"),
            response_queue: WorkQueue::new("meridian.response"),
            header_overrides: self.header_overrides,
            default_delay_range: self.default_delay_range,
            cookies,
            runtime: Handle::current(),
        }))
    }
}

impl Default for SessionConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headers::names;

    #[tokio::test]
    async fn test_builder_overrides_and_range() {
        let config = SessionConfig::builder()
            .header_override(names::USER_AGENT, "MeridianClient/0.0.0")
            .delay_range(DelayRange::new(0.1, 0.5))
            .build()
            .unwrap();

        assert_eq!(
            config.header_overrides().get(names::USER_AGENT),
            Some(&"MeridianClient/0.0.0".to_string())
        );
        assert_eq!(config.default_delay_range(), Some(DelayRange::new(0.1, 0.5)));
    }

    #[tokio::test]
    async fn test_queues_are_distinct() {
        let config = SessionConfig::new().unwrap();
        assert_eq!(config.request_queue().label(), "meridian.request");
        assert_eq!(config.working_queue().label(), "meridian.working");
        assert_eq!(config.response_queue().label(), "meridian.response");
    }
}
