use may_minihttp::Request;
use serde_json::Value;
use smallvec::SmallVec;
use std::collections::BTreeMap;
use std::io::Read;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Maximum inline headers before heap allocation.
pub const MAX_INLINE_HEADERS: usize = 16;

/// Request headers as `(lowercase name, value)` pairs.
///
/// Most requests carry fewer than 16 headers, so these stay on the stack.
pub type HeaderVec = SmallVec<[(Arc<str>, String); MAX_INLINE_HEADERS]>;

/// Decoded request parameters. Keys are unique; later values replace earlier ones.
pub type ParamMap = BTreeMap<String, String>;

/// Transport-neutral request as read off the wire.
///
/// Nothing here is decoded yet: the method is the raw token, `target` is the
/// request target including any query string, and `body` holds the raw bytes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRequest {
    pub method: String,
    pub target: String,
    pub headers: HeaderVec,
    pub body: Vec<u8>,
}

impl RawRequest {
    #[must_use]
    pub fn new(method: &str, target: &str) -> Self {
        Self {
            method: method.to_string(),
            target: target.to_string(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers
            .push((Arc::from(name.to_ascii_lowercase()), value.to_string()));
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }
}

/// Parse a query string (without the leading `?`) into a parameter map.
///
/// Names and values are form-urlencoded; `+` decodes to a space.
pub fn parse_query_params(query: &str) -> ParamMap {
    url::form_urlencoded::parse(query.as_bytes())
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

/// Decode a request body according to its content type.
///
/// Returns form parameters for `application/x-www-form-urlencoded` bodies and
/// a JSON value for `application/json` (or `+json`) bodies. A JSON body that
/// fails to parse is dropped.
pub fn decode_body(content_type: Option<&str>, text: &str) -> (ParamMap, Option<Value>) {
    if text.is_empty() {
        return (ParamMap::new(), None);
    }
    let media = content_type
        .and_then(|ct| ct.split(';').next())
        .map(|m| m.trim().to_ascii_lowercase())
        .unwrap_or_default();

    if media == "application/x-www-form-urlencoded" {
        return (parse_query_params(text), None);
    }
    if media.is_empty() || media == "application/json" || media.ends_with("+json") {
        match serde_json::from_str::<Value>(text) {
            Ok(json) => {
                debug!(
                    body_fields = json.as_object().map(|o| o.len()),
                    "JSON body parsed"
                );
                return (ParamMap::new(), Some(json));
            }
            Err(e) => {
                debug!(error = %e, "JSON body parse attempted");
            }
        }
    }
    (ParamMap::new(), None)
}

/// Read a `may_minihttp::Request` into a [`RawRequest`].
pub fn parse_request(req: Request) -> RawRequest {
    let method = req.method().to_string();
    let target = req.path().to_string();

    let headers: HeaderVec = req
        .headers()
        .iter()
        .map(|h| {
            (
                Arc::from(h.name.to_ascii_lowercase()),
                String::from_utf8_lossy(h.value).to_string(),
            )
        })
        .collect();

    debug!(
        header_count = headers.len(),
        header_names = ?headers.iter().take(20).map(|(k, _)| k.as_ref()).collect::<Vec<_>>(),
        "Headers extracted"
    );

    let mut body = Vec::new();
    if let Err(e) = req.body().read_to_end(&mut body) {
        warn!(error = %e, "Request body read failed");
        body.clear();
    } else if !body.is_empty() {
        debug!(body_size_bytes = body.len(), "Request body read");
    }

    info!(
        method = %method,
        target = %target,
        headers_count = headers.len(),
        "HTTP request parsed"
    );

    RawRequest {
        method,
        target,
        headers,
        body,
    }
}
