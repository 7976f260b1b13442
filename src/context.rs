//! # Request Context
//!
//! [`RequestContext`] is the per-request state threaded through the dispatch
//! pipeline. It is built once from a [`RawRequest`] at dispatch entry, is never
//! mutated afterwards, and owns the write-once outbound half of the transport.
//!
//! Construction performs, in order:
//!
//! 1. method decoding (`http::Method`)
//! 2. path resolution (query string stripped, empty path becomes `/`)
//! 3. charset negotiation from the request `Content-Type`
//! 4. query and form-body parameter decoding, JSON body decoding
//! 5. stamping of the service identity headers on the outbound response
//!
//! Only an invalid method or a declared charset the gateway cannot decode
//! fails construction. The outbound response is then handed back to the
//! caller together with a [`ContextError`] so a fallback can still be sent.
//!
//! Bodies are decoded as text only for form, JSON and `text/*` media types,
//! when a charset is declared, or when no `Content-Type` is sent. Anything
//! else, and any body whose bytes are not valid in the negotiated charset,
//! is kept as raw bytes and skips parameter and JSON decoding.

use crate::config::{check_header_name, check_header_value, ConfigError};
use crate::ids::{RequestId, REQUEST_ID_HEADER};
use crate::server::request::{
    decode_body, parse_query_params, HeaderVec, ParamMap, RawRequest,
};
use crate::server::response::{status_reason, ResponseSink};
use http::Method;
use serde_json::Value;
use std::fmt;
use std::io;
use tracing::debug;

/// Character encodings accepted on the inbound stream.
///
/// Both are written back as UTF-8; ASCII is a strict subset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Charset {
    Utf8,
    UsAscii,
}

impl Charset {
    /// Negotiate from a `Content-Type` header value. A missing header or a
    /// missing `charset` parameter means UTF-8.
    pub fn negotiate(content_type: Option<&str>) -> Result<Self, ContextError> {
        match declared_charset(content_type).as_deref() {
            None | Some("utf-8") | Some("utf8") => Ok(Charset::Utf8),
            Some("us-ascii") | Some("ascii") => Ok(Charset::UsAscii),
            Some(other) => Err(ContextError::UnsupportedEncoding(other.to_string())),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Charset::Utf8 => "utf-8",
            Charset::UsAscii => "us-ascii",
        }
    }

    /// Borrow `bytes` as text, or `None` when they are not valid in this charset.
    fn text(self, bytes: &[u8]) -> Option<&str> {
        if self == Charset::UsAscii && !bytes.is_ascii() {
            return None;
        }
        std::str::from_utf8(bytes).ok()
    }
}

/// Lowercased `charset` parameter of a `Content-Type` value, if any.
fn declared_charset(content_type: Option<&str>) -> Option<String> {
    content_type?.split(';').skip(1).find_map(|param| {
        let (k, v) = param.split_once('=')?;
        k.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| v.trim().trim_matches('"').to_ascii_lowercase())
    })
}

/// Whether a body of this `Content-Type` is decoded as text.
fn is_textual(content_type: Option<&str>) -> bool {
    let Some(ct) = content_type else {
        return true;
    };
    let media = ct.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
    media.is_empty()
        || media.starts_with("text/")
        || media == "application/json"
        || media.ends_with("+json")
        || media == "application/x-www-form-urlencoded"
        || declared_charset(Some(ct)).is_some()
}

/// Reasons a [`RequestContext`] could not be built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextError {
    /// The request declared a charset the gateway cannot decode.
    UnsupportedEncoding(String),
    /// The request method is not a valid HTTP token.
    InvalidMethod(String),
}

impl ContextError {
    /// Status of the fallback response sent for this failure.
    #[must_use]
    pub fn status(&self) -> u16 {
        match self {
            ContextError::UnsupportedEncoding(_) => 415,
            ContextError::InvalidMethod(_) => 400,
        }
    }
}

impl fmt::Display for ContextError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextError::UnsupportedEncoding(cs) => write!(f, "unsupported charset '{cs}'"),
            ContextError::InvalidMethod(m) => write!(f, "invalid request method '{m}'"),
        }
    }
}

impl std::error::Error for ContextError {}

/// Fixed headers identifying the serving process.
///
/// Lines are rendered once and live for the rest of the process, so stamping
/// them on a response never allocates. Each successful construction leaks the
/// two rendered lines; build an identity once at start-up and clone it.
#[derive(Debug, Clone)]
pub struct ServiceIdentity {
    server_id: String,
    module_name: String,
    lines: [&'static str; 2],
}

impl ServiceIdentity {
    pub const DEFAULT_SERVER_ID_HEADER: &'static str = "X-Server-Id";
    pub const DEFAULT_MODULE_NAME_HEADER: &'static str = "X-Module-Name";

    /// Identity using the default header names.
    ///
    /// # Errors
    ///
    /// Fails when a value is empty or contains characters not allowed in a
    /// header value, such as CR or LF.
    pub fn new(server_id: &str, module_name: &str) -> Result<Self, ConfigError> {
        Self::with_headers(
            Self::DEFAULT_SERVER_ID_HEADER,
            server_id,
            Self::DEFAULT_MODULE_NAME_HEADER,
            module_name,
        )
    }

    /// Identity with custom header names.
    ///
    /// # Errors
    ///
    /// Fails when a header name is not an HTTP token or a value is not a
    /// valid header value. Nothing is leaked on failure.
    pub fn with_headers(
        server_id_header: &str,
        server_id: &str,
        module_name_header: &str,
        module_name: &str,
    ) -> Result<Self, ConfigError> {
        check_header_name("identity.server_id_header", server_id_header)?;
        check_header_name("identity.module_name_header", module_name_header)?;
        check_header_value("identity.server_id", server_id)?;
        check_header_value("identity.module_name", module_name)?;

        let server_line = format!("{server_id_header}: {server_id}").into_boxed_str();
        let module_line = format!("{module_name_header}: {module_name}").into_boxed_str();
        Ok(Self {
            server_id: server_id.to_string(),
            module_name: module_name.to_string(),
            lines: [Box::leak(server_line), Box::leak(module_line)],
        })
    }

    #[must_use]
    pub fn server_id(&self) -> &str {
        &self.server_id
    }

    #[must_use]
    pub fn module_name(&self) -> &str {
        &self.module_name
    }

    #[must_use]
    pub fn header_lines(&self) -> [&'static str; 2] {
        self.lines
    }
}

/// Write-once wrapper over the transport response.
pub struct Outbound<'a> {
    sink: &'a mut dyn ResponseSink,
    stamped: [&'static str; 2],
    committed: bool,
}

impl<'a> Outbound<'a> {
    pub fn new(sink: &'a mut dyn ResponseSink, identity: &ServiceIdentity) -> Self {
        Self {
            sink,
            stamped: identity.header_lines(),
            committed: false,
        }
    }

    /// Write status, identity headers, content type and body in one go.
    ///
    /// Fails with `AlreadyExists` once a response has been fully written. A
    /// failed body write leaves the response uncommitted so a replacement
    /// (typically a 500) can still be sent.
    pub fn send(&mut self, status: u16, content_type: &'static str, body: Vec<u8>) -> io::Result<()> {
        if self.committed {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                "response already written",
            ));
        }
        self.sink.status(status, status_reason(status));
        for line in self.stamped {
            self.sink.header(line);
        }
        self.sink.header(content_type);
        self.sink.body(body)?;
        self.committed = true;
        Ok(())
    }

    #[must_use]
    pub fn is_committed(&self) -> bool {
        self.committed
    }
}

/// State of one in-flight request.
pub struct RequestContext<'a> {
    request_id: RequestId,
    method: Method,
    path: String,
    params: ParamMap,
    headers: HeaderVec,
    body: Option<Value>,
    raw_body: Vec<u8>,
    charset: Charset,
    response: Outbound<'a>,
}

impl<'a> RequestContext<'a> {
    /// Build the context for `raw`, taking ownership of the outbound response.
    ///
    /// On failure the outbound response is returned untouched alongside the
    /// error.
    pub fn build(
        raw: RawRequest,
        response: Outbound<'a>,
    ) -> Result<Self, (ContextError, Outbound<'a>)> {
        let RawRequest {
            method,
            target,
            headers,
            body,
        } = raw;

        let request_id = RequestId::from_header_or_new(lookup(&headers, REQUEST_ID_HEADER));

        let method = match Method::from_bytes(method.as_bytes()) {
            Ok(m) => m,
            Err(_) => return Err((ContextError::InvalidMethod(method), response)),
        };

        let (path, query) = match target.split_once('?') {
            Some((p, q)) => (p, Some(q)),
            None => (target.as_str(), None),
        };
        let path = if path.is_empty() { "/" } else { path }.to_string();

        let content_type = lookup(&headers, "content-type");
        let charset = match Charset::negotiate(content_type) {
            Ok(cs) => cs,
            Err(e) => return Err((e, response)),
        };

        let mut params = query.map(parse_query_params).unwrap_or_default();
        let text = if is_textual(content_type) {
            charset.text(&body)
        } else {
            None
        };
        let decoded = match text {
            Some(text) => {
                let (form, json) = decode_body(content_type, text);
                params.extend(form);
                json
            }
            None => {
                if !body.is_empty() {
                    debug!(
                        request_id = %request_id,
                        body_size_bytes = body.len(),
                        content_type = ?content_type,
                        "Body kept as raw bytes"
                    );
                }
                None
            }
        };

        Ok(Self {
            request_id,
            method,
            path,
            params,
            headers,
            body: decoded,
            raw_body: body,
            charset,
            response,
        })
    }

    #[must_use]
    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn params(&self) -> &ParamMap {
        &self.params
    }

    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// Header lookup, case-insensitive per RFC 7230.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        lookup(&self.headers, name)
    }

    #[must_use]
    pub fn headers(&self) -> &HeaderVec {
        &self.headers
    }

    #[must_use]
    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    /// Body bytes exactly as received.
    #[must_use]
    pub fn raw_body(&self) -> &[u8] {
        &self.raw_body
    }

    #[must_use]
    pub fn charset(&self) -> Charset {
        self.charset
    }

    pub(crate) fn response(&mut self) -> &mut Outbound<'a> {
        &mut self.response
    }
}

fn lookup<'h>(headers: &'h HeaderVec, name: &str) -> Option<&'h str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}
