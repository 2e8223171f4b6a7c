//! Request dispatch under two concurrency disciplines.

use crate::config::SessionConfig;
use crate::request::{build_request, RequestSpec};
use crate::transport::Outcome;
use common::ApiError;
use rand::Rng;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::oneshot;

/// Bounds, in seconds, for the single random pre-dispatch delay.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DelayRange {
    pub min: f64,
    pub max: f64,
}

impl DelayRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Draw one uniformly random delay from the range.
    pub(crate) fn sample(&self) -> Duration {
        let min = self.min.max(0.0);
        let max = self.max.max(min);
        let secs = if max > min {
            rand::rng().random_range(min..=max)
        } else {
            min
        };
        Duration::from_secs_f64(secs)
    }
}

/// The dispatch engine.
///
/// Holds a non-owning back-reference to the [`SessionConfig`]; every
/// deferred step re-checks that the configuration is still alive before
/// touching it, and fails the request with
/// [`ApiError::SessionReleased`] otherwise.
pub struct Dispatcher {
    config: Weak<SessionConfig>,
}

impl Dispatcher {
    pub fn new(config: &Arc<SessionConfig>) -> Self {
        Self {
            config: Arc::downgrade(config),
        }
    }

    /// Asynchronous dispatch: schedule the request and return immediately.
    ///
    /// The callback is invoked exactly once with the outcome. Stages of a
    /// single request run in order (delay, build, issue, completion,
    /// delivery); independent requests are not serialized against each
    /// other. A spec whose URL failed to resolve short-circuits here,
    /// before any delay, queue, or transport involvement. There is no
    /// cancellation once scheduled.
    pub fn send(&self, spec: RequestSpec, callback: impl FnOnce(Outcome) + Send + 'static) {
        let url = match &spec.url {
            Ok(url) => url.clone(),
            Err(err) => {
                callback(Err(err.clone().into()));
                return;
            }
        };
        let Some(config) = self.config.upgrade() else {
            callback(Err(ApiError::SessionReleased));
            return;
        };

        // Per-call range beats the configured default; no range, no delay.
        let delay = spec
            .delay_range
            .or(config.default_delay_range())
            .map(|range| range.sample())
            .unwrap_or(Duration::ZERO);

        let weak = self.config.clone();
        config.request_queue().dispatch_after(delay, move || {
            let Some(config) = weak.upgrade() else {
                // Configuration torn down while we waited; deliver directly
                // from this context rather than hop through dead queues.
                callback(Err(ApiError::SessionReleased));
                return;
            };

            let request = build_request(&spec, url, config.header_overrides());
            tracing::debug!(method = %request.method, url = %request.url, "issuing request");

            let transport = config.transport();
            let working = config.working_queue().clone();
            let response_queue = config.response_queue().clone();
            let on_response_queue = spec.deliver_on_response_queue;

            config.runtime().spawn(async move {
                let outcome = transport.issue(request).await;
                working.dispatch(move || {
                    if let Err(err) = &outcome {
                        tracing::debug!("request failed: {}", err);
                    }
                    if on_response_queue {
                        response_queue.dispatch(move || callback(outcome));
                    } else {
                        callback(outcome);
                    }
                });
            });
        });
    }

    /// Synchronous dispatch: block the calling thread until the outcome.
    ///
    /// No jitter is applied in this mode. Exactly one outcome is returned;
    /// the thread resumes only after the transport completion recorded it.
    ///
    /// Must not be called from a runtime worker thread, or it deadlocks;
    /// that is the caller's responsibility.
    pub fn send_blocking(&self, spec: RequestSpec) -> Outcome {
        let url = match &spec.url {
            Ok(url) => url.clone(),
            Err(err) => return Err(err.clone().into()),
        };
        let config = self.config.upgrade().ok_or(ApiError::SessionReleased)?;

        let request = build_request(&spec, url, config.header_overrides());
        tracing::debug!(method = %request.method, url = %request.url, "issuing blocking request");

        let transport = config.transport();
        let (tx, rx) = oneshot::channel();
        config.runtime().spawn(async move {
            let outcome = transport.issue(request).await;
            let _ = tx.send(outcome);
        });

        rx.blocking_recv()
            .unwrap_or_else(|_| Err(ApiError::SessionReleased))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::Body;
    use crate::config::SessionConfig;
    use crate::headers::{names, HeaderMap};
    use crate::request::Request;
    use crate::transport::{Reply, ResponseMeta, Transport};
    use async_trait::async_trait;
    use bytes::Bytes;
    use http::StatusCode;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct FixedTransport {
        status: StatusCode,
        body: &'static str,
        hits: AtomicUsize,
        last_request: Mutex<Option<Request>>,
    }

    impl FixedTransport {
        fn ok(body: &'static str) -> Arc<Self> {
            Arc::new(Self {
                status: StatusCode::OK,
                body,
                hits: AtomicUsize::new(0),
                last_request: Mutex::new(None),
            })
        }
    }

    #[async_trait]
    impl Transport for FixedTransport {
        async fn issue(&self, request: Request) -> Outcome {
            self.hits.fetch_add(1, Ordering::SeqCst);
            *self.last_request.lock().unwrap() = Some(request);
            Ok(Reply {
                body: Some(Bytes::from_static(self.body.as_bytes())),
                meta: Some(ResponseMeta {
                    status: self.status,
                    headers: HeaderMap::new(),
                }),
            })
        }
    }

    fn config_with(transport: Arc<FixedTransport>) -> Arc<SessionConfig> {
        SessionConfig::builder()
            .transport(transport)
            .build()
            .unwrap()
    }

    async fn collect(
        dispatcher: &Dispatcher,
        spec: RequestSpec,
    ) -> Outcome {
        let (tx, rx) = oneshot::channel();
        dispatcher.send(spec, move |outcome| {
            let _ = tx.send(outcome);
        });
        tokio::time::timeout(Duration::from_secs(5), rx)
            .await
            .expect("callback never invoked")
            .unwrap()
    }

    #[tokio::test]
    async fn test_send_delivers_success() {
        let transport = FixedTransport::ok("{\"ok\":true}");
        let config = config_with(transport.clone());
        let dispatcher = Dispatcher::new(&config);

        let outcome = collect(&dispatcher, RequestSpec::get("https://api.meridian.app/v1/ping")).await;

        let reply = outcome.unwrap();
        assert_eq!(reply.meta.unwrap().status, StatusCode::OK);
        assert_eq!(reply.body.unwrap(), Bytes::from("{\"ok\":true}"));
        assert_eq!(transport.hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_send_direct_delivery() {
        let transport = FixedTransport::ok("{}");
        let config = config_with(transport);
        let dispatcher = Dispatcher::new(&config);

        let spec = RequestSpec::get("https://api.meridian.app/v1/ping")
            .deliver_on_response_queue(false);
        assert!(collect(&dispatcher, spec).await.is_ok());
    }

    #[tokio::test]
    async fn test_invalid_url_short_circuits() {
        let transport = FixedTransport::ok("{}");
        let config = config_with(transport.clone());
        let dispatcher = Dispatcher::new(&config);

        let outcome = collect(&dispatcher, RequestSpec::get("::bad::")).await;

        assert!(matches!(outcome, Err(ApiError::InvalidUrl(_))));
        assert_eq!(transport.hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_released_config_fails_pending_request() {
        let transport = FixedTransport::ok("{}");
        let config = config_with(transport.clone());
        let dispatcher = Dispatcher::new(&config);

        let spec = RequestSpec::get("https://api.meridian.app/v1/ping")
            .delay_range(DelayRange::new(0.05, 0.05));
        let (tx, rx) = oneshot::channel();
        dispatcher.send(spec, move |outcome| {
            let _ = tx.send(outcome);
        });
        drop(config);

        let outcome = tokio::time::timeout(Duration::from_secs(5), rx)
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(outcome, Err(ApiError::SessionReleased)));
        assert_eq!(transport.hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_released_config_fails_immediately() {
        let transport = FixedTransport::ok("{}");
        let config = config_with(transport);
        let dispatcher = Dispatcher::new(&config);
        drop(config);

        let outcome = collect(&dispatcher, RequestSpec::get("https://api.meridian.app/v1/ping")).await;
        assert!(matches!(outcome, Err(ApiError::SessionReleased)));
    }

    #[tokio::test]
    async fn test_built_request_reaches_transport() {
        let transport = FixedTransport::ok("{}");
        let config = config_with(transport.clone());
        let dispatcher = Dispatcher::new(&config);

        let spec = RequestSpec::get("https://api.meridian.app/v1/state")
            .body(Body::parameters([("cursor", "10")]));
        collect(&dispatcher, spec).await.unwrap();

        let request = transport.last_request.lock().unwrap().take().unwrap();
        assert_eq!(request.method, http::Method::POST);
        assert_eq!(request.body.unwrap(), Bytes::from("cursor=10"));
        assert!(request.headers.contains(names::CAPABILITY));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_send_blocking_returns_one_outcome() {
        let transport = FixedTransport::ok("{\"ok\":true}");
        let config = config_with(transport.clone());
        let dispatcher = Dispatcher::new(&config);

        let outcome = tokio::task::spawn_blocking(move || {
            dispatcher.send_blocking(RequestSpec::get("https://api.meridian.app/v1/ping"))
        })
        .await
        .unwrap();

        let reply = outcome.unwrap();
        assert_eq!(reply.meta.unwrap().status, StatusCode::OK);
        assert_eq!(transport.hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_send_blocking_invalid_url() {
        let transport = FixedTransport::ok("{}");
        let config = config_with(transport.clone());
        let dispatcher = Dispatcher::new(&config);

        let outcome = tokio::task::spawn_blocking(move || {
            dispatcher.send_blocking(RequestSpec::get("::bad::"))
        })
        .await
        .unwrap();

        assert!(matches!(outcome, Err(ApiError::InvalidUrl(_))));
        assert_eq!(transport.hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_delay_range_sampling() {
        let range = DelayRange::new(0.1, 0.5);
        for _ in 0..1000 {
            let delay = range.sample();
            assert!(delay >= Duration::from_secs_f64(0.1));
            assert!(delay <= Duration::from_secs_f64(0.5));
        }
    }

    #[test]
    fn test_degenerate_delay_range() {
        assert_eq!(
            DelayRange::new(0.2, 0.2).sample(),
            Duration::from_secs_f64(0.2)
        );
        assert_eq!(DelayRange::new(-1.0, -0.5).sample(), Duration::ZERO);
    }
}
