use crate::context::ContextError;
use crate::server::response::{CONTENT_TYPE_JSON, CONTENT_TYPE_TEXT};
use serde_json::{json, Value};

/// Terminal state reached by one dispatch.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The context could not be built; a fallback response was sent.
    Rejected(ContextError),
    /// Unmatched OPTIONS request answered with `200 OK`.
    Preflight,
    /// No handler for the method and path.
    NotFound,
    /// The handler failed or its value could not be written.
    ServerError,
    /// The handler returned a value.
    Success,
}

impl Outcome {
    /// Status code written for this outcome.
    #[must_use]
    pub fn status(&self) -> u16 {
        match self {
            Outcome::Rejected(e) => e.status(),
            Outcome::Preflight | Outcome::Success => 200,
            Outcome::NotFound => 404,
            Outcome::ServerError => 500,
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Preflight | Outcome::Success)
    }
}

/// A response ready to be written: status, content type line, body bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub status: u16,
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

impl Rendered {
    fn json(status: u16, body: &Value) -> Self {
        Self {
            status,
            content_type: CONTENT_TYPE_JSON,
            body: body.to_string().into_bytes(),
        }
    }
}

pub fn preflight() -> Rendered {
    Rendered {
        status: 200,
        content_type: CONTENT_TYPE_TEXT,
        body: b"OK".to_vec(),
    }
}

pub fn not_found(method: &str, path: &str) -> Rendered {
    Rendered::json(
        404,
        &json!({ "error": "Not Found", "method": method, "path": path }),
    )
}

/// Generic 500 body. Failure details stay in the logs.
pub fn server_error() -> Rendered {
    Rendered::json(500, &json!({ "error": "Internal Server Error" }))
}

pub fn rejected(err: &ContextError) -> Rendered {
    let message = match err.status() {
        415 => "Unsupported Media Type",
        _ => "Bad Request",
    };
    Rendered::json(err.status(), &json!({ "error": message }))
}

/// Serialize a handler value as the `200 OK` body.
pub fn success(value: &Value) -> Result<Rendered, serde_json::Error> {
    Ok(Rendered {
        status: 200,
        content_type: CONTENT_TYPE_JSON,
        body: serde_json::to_vec(value)?,
    })
}
