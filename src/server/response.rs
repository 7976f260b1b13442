use may_minihttp::Response;
use std::io;

pub const CONTENT_TYPE_JSON: &str = "Content-Type: application/json; charset=utf-8";
pub const CONTENT_TYPE_TEXT: &str = "Content-Type: text/plain; charset=utf-8";

pub fn status_reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        400 => "Bad Request",
        404 => "Not Found",
        415 => "Unsupported Media Type",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "OK",
    }
}

/// Outbound half of the transport.
///
/// Header lines are passed as complete `Name: value` strings with a static
/// lifetime, which is what `may_minihttp` stores without copying.
///
/// After a failed `body` write, [`Outbound`](crate::context::Outbound) sends a
/// replacement response with all headers written again. A sink whose `body`
/// can fail must therefore drop earlier headers when `status` is called, as
/// [`BufferedResponse`] does. The `may_minihttp` sink only buffers the body,
/// never fails, and so is never asked to start over.
pub trait ResponseSink {
    fn status(&mut self, status: u16, reason: &'static str);
    fn header(&mut self, line: &'static str);
    fn body(&mut self, bytes: Vec<u8>) -> io::Result<()>;
}

impl ResponseSink for Response<'_> {
    fn status(&mut self, status: u16, reason: &'static str) {
        self.status_code(status as usize, reason);
    }

    fn header(&mut self, line: &'static str) {
        Response::header(self, line);
    }

    fn body(&mut self, bytes: Vec<u8>) -> io::Result<()> {
        self.body_vec(bytes);
        Ok(())
    }
}

/// In-memory response, used when the gateway is embedded without a socket.
#[derive(Debug, Default, Clone)]
pub struct BufferedResponse {
    pub status: Option<u16>,
    pub reason: &'static str,
    pub headers: Vec<&'static str>,
    pub body: Vec<u8>,
    /// Number of upcoming body writes that fail with `BrokenPipe`.
    fail_writes: usize,
}

impl BufferedResponse {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink whose first `n` body writes fail, as a closed connection would.
    #[must_use]
    pub fn failing_writes(n: usize) -> Self {
        Self {
            fail_writes: n,
            ..Self::default()
        }
    }

    /// Case-insensitive lookup of a header value.
    #[must_use]
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers.iter().find_map(|line| {
            let (k, v) = line.split_once(':')?;
            k.trim().eq_ignore_ascii_case(name).then(|| v.trim())
        })
    }

    #[must_use]
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

impl ResponseSink for BufferedResponse {
    fn status(&mut self, status: u16, reason: &'static str) {
        self.status = Some(status);
        self.reason = reason;
        self.headers.clear();
        self.body.clear();
    }

    fn header(&mut self, line: &'static str) {
        self.headers.push(line);
    }

    fn body(&mut self, bytes: Vec<u8>) -> io::Result<()> {
        if self.fail_writes > 0 {
            self.fail_writes -= 1;
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "connection closed"));
        }
        self.body = bytes;
        Ok(())
    }
}
