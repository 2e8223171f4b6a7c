//! Request/response dispatch layer for the Meridian API.
//!
//! This crate handles:
//! - Building authenticated requests (layered header merge, body-forced POST)
//! - Form, raw, and gzip-compressed request bodies
//! - Fire-and-forget callback dispatch with a jittered pre-dispatch delay
//! - Blocking synchronous dispatch
//! - Typed JSON decoding of responses
//! - Restoring a persisted session's cookies into the shared jar

pub mod body;
pub mod config;
pub mod cookies;
pub mod decode;
pub mod dispatch;
pub mod headers;
pub mod queue;
pub mod request;
pub mod transport;

pub use body::Body;
pub use common::{ApiError, ApiResult};
pub use config::{SessionConfig, SessionConfigBuilder};
pub use cookies::{restore_session, Cookie, CookieJar};
pub use decode::decode;
pub use dispatch::{DelayRange, Dispatcher};
pub use headers::HeaderMap;
pub use queue::WorkQueue;
pub use request::{Request, RequestSpec};
pub use transport::{HttpTransport, Outcome, Reply, ResponseMeta, Transport};
