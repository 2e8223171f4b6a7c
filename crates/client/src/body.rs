//! Request body variants and their wire encoding.

use crate::headers::names;
use bytes::Bytes;
use flate2::write::GzEncoder;
use flate2::Compression;
use indexmap::IndexMap;
use std::io::Write;

/// A request body, in one of the shapes the Meridian API accepts.
#[derive(Clone, Debug)]
pub enum Body {
    /// Form parameters, serialized as `key=value` pairs joined by `&`.
    Parameters(IndexMap<String, String>),
    /// Raw bytes, attached verbatim.
    Raw(Bytes),
    /// Form parameters, gzip-compressed after serialization.
    GzipParameters(IndexMap<String, String>),
}

impl Body {
    /// Build a `Parameters` body from an iterator of pairs.
    pub fn parameters<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self::Parameters(collect_pairs(pairs))
    }

    /// Build a `GzipParameters` body from an iterator of pairs.
    pub fn gzip_parameters<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self::GzipParameters(collect_pairs(pairs))
    }

    /// Encode the body into a wire-ready payload plus the headers it requires.
    ///
    /// A gzip failure leaves the payload unset and the request proceeds
    /// without one; the `content-encoding` header is still attached.
    pub fn encode(&self) -> (Option<Bytes>, Vec<(&'static str, String)>) {
        match self {
            Body::Parameters(params) => (form_encode(params).map(Bytes::from), Vec::new()),
            Body::Raw(data) => (Some(data.clone()), Vec::new()),
            Body::GzipParameters(params) => {
                let headers = vec![(names::CONTENT_ENCODING, "gzip".to_string())];
                let payload = form_encode(params).and_then(|text| {
                    match gzip(text.as_bytes()) {
                        Ok(compressed) => Some(Bytes::from(compressed)),
                        Err(err) => {
                            tracing::warn!("gzip encoding failed, sending without payload: {}", err);
                            None
                        }
                    }
                });
                (payload, headers)
            }
        }
    }
}

fn collect_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> IndexMap<String, String>
where
    K: Into<String>,
    V: Into<String>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

/// Serialize parameters as `key=value` pairs joined by `&`, insertion order.
///
/// Values are not percent-encoded; callers must supply transport-safe values.
fn form_encode(params: &IndexMap<String, String>) -> Option<String> {
    if params.is_empty() {
        return None;
    }
    Some(
        params
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect::<Vec<_>>()
            .join("&"),
    )
}

fn gzip(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}
