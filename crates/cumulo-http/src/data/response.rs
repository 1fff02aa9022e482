use super::Headers;
use crate::core::{ContentRange, StatusClass, parse_content_range};
use crate::effects::BodyStream;
use crate::error::{Error, Result};

/// Status, headers and body of one HTTP exchange.
///
/// The response owns its body stream exclusively. Taking the body moves it
/// out; dropping the response releases the stream and with it the
/// connection.
#[derive(Debug)]
pub struct Response {
    status:  u16,
    reason:  String,
    headers: Headers,
    body:    Option<BodyStream>,
}

impl Response {
    pub fn new(status: u16, reason: impl Into<String>) -> Self {
        Self {
            status,
            reason: reason.into(),
            headers: Headers::new(),
            body: None,
        }
    }

    /// Parse a raw response head: a status line followed by header lines,
    /// ending at the first empty line.
    ///
    /// Header lines without a colon are skipped.
    pub fn parse_head(raw: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(raw).map_err(|e| Error::Parse(format!("response head is not UTF-8: {e}")))?;
        let mut lines = text.split('\n');

        let status_line = lines.next().unwrap_or_default().trim_end_matches('\r');
        let mut parts = status_line.splitn(3, ' ');
        let version = parts.next().unwrap_or_default();
        if !version.starts_with("HTTP/") {
            return Err(Error::Parse(format!("invalid status line: {status_line:?}")));
        }
        let status = parts
            .next()
            .and_then(|code| code.parse::<u16>().ok())
            .filter(|code| (100..1000).contains(code))
            .ok_or_else(|| Error::Parse(format!("invalid status code in {status_line:?}")))?;
        let reason = parts.next().unwrap_or_default();

        let mut response = Self::new(status, reason);
        for line in lines {
            if line.trim_end_matches('\r').is_empty() {
                break;
            }
            response.add_header_line(line);
        }
        Ok(response)
    }

    /// Add a raw `Name: value` header line. Malformed lines are ignored.
    pub fn add_header_line(&mut self, line: &str) -> bool { self.headers.add_line(line) }

    pub fn add_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.add(name, value);
    }

    pub fn status(&self) -> u16 { self.status }

    pub fn status_class(&self) -> StatusClass { StatusClass::of(self.status) }

    pub fn is_success(&self) -> bool { self.status_class() == StatusClass::Success }

    pub fn reason_phrase(&self) -> &str { &self.reason }

    pub fn headers(&self) -> &Headers { &self.headers }

    pub fn headers_mut(&mut self) -> &mut Headers { &mut self.headers }

    /// Attach a body stream, releasing any stream attached before.
    pub fn set_body_stream(&mut self, body: BodyStream) {
        drop(self.body.take());
        self.body = Some(body);
    }

    #[must_use]
    pub fn with_body_stream(mut self, body: BodyStream) -> Self {
        self.set_body_stream(body);
        self
    }

    pub fn has_body(&self) -> bool { self.body.is_some() }

    /// Move the body out, leaving the response without one.
    pub fn take_body(&mut self) -> BodyStream { self.body.take().unwrap_or_else(BodyStream::empty) }

    pub fn into_body(mut self) -> BodyStream { self.take_body() }

    pub fn content_length(&self) -> Option<u64> {
        self.headers.get("Content-Length").and_then(|v| v.trim().parse().ok())
    }

    pub fn content_range(&self) -> Option<ContentRange> {
        self.headers.get("Content-Range").and_then(parse_content_range)
    }

    /// Turn a non-2xx response into a service error, keep the rest.
    pub fn error_for_status(self) -> Result<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(Error::from_response(&self))
        }
    }
}
