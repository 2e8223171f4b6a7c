//! Typed decoding of dispatch outcomes.

use crate::dispatch::Dispatcher;
use crate::request::RequestSpec;
use crate::transport::Outcome;
use common::{ApiError, ApiResult};
use http::StatusCode;
use serde::de::DeserializeOwned;

/// Decode an outcome's payload as JSON into `T`.
///
/// A failed outcome propagates unchanged. With status validation enabled,
/// anything but 200 is an invalid response; an absent payload always is.
/// Response JSON uses snake_case keys, which map directly onto Rust field
/// names.
pub fn decode<T: DeserializeOwned>(outcome: Outcome, validate_status: bool) -> ApiResult<T> {
    let reply = outcome?;

    if validate_status {
        let ok = reply
            .meta
            .as_ref()
            .is_some_and(|meta| meta.status == StatusCode::OK);
        if !ok {
            return Err(ApiError::InvalidResponse);
        }
    }

    let body = reply.body.ok_or(ApiError::InvalidResponse)?;
    Ok(serde_json::from_slice(&body)?)
}

impl Dispatcher {
    /// Asynchronous dispatch with typed decoding of the outcome.
    ///
    /// Delivery follows the request's response-queue-or-direct setting; the
    /// decode runs in the delivery context, just before the callback.
    pub fn send_json<T>(&self, spec: RequestSpec, callback: impl FnOnce(ApiResult<T>) + Send + 'static)
    where
        T: DeserializeOwned + Send + 'static,
    {
        let validate_status = spec.validate_status;
        self.send(spec, move |outcome| {
            callback(decode(outcome, validate_status));
        });
    }

    /// Blocking dispatch with typed decoding of the outcome.
    pub fn send_json_blocking<T: DeserializeOwned>(&self, spec: RequestSpec) -> ApiResult<T> {
        let validate_status = spec.validate_status;
        decode(self.send_blocking(spec), validate_status)
    }
}
