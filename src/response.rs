//! The response sink handed to every middleware and terminal handler.
//!
//! [`ResponseWriter`] buffers status, headers, and body while the chain runs.
//! Once the composed handler returns, the host server turns it into an
//! `http::Response` with [`ResponseWriter::into_response`]. The chain itself
//! never inspects the writer; only user middleware and handlers do.

use std::fmt;

use bytes::{Bytes, BytesMut};
use http::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use http::StatusCode;
use http_body_util::Full;

// ── ContentType ───────────────────────────────────────────────────────────────

/// Common content-type values for use with [`ResponseWriter::set_content_type`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ContentType {
    Csv,          // text/csv
    EventStream,  // text/event-stream  (SSE)
    Html,         // text/html; charset=utf-8
    Json,         // application/json
    OctetStream,  // application/octet-stream
    Text,         // text/plain; charset=utf-8
    Xml,          // application/xml
}

impl ContentType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Csv         => "text/csv",
            Self::EventStream => "text/event-stream",
            Self::Html        => "text/html; charset=utf-8",
            Self::Json        => "application/json",
            Self::OctetStream => "application/octet-stream",
            Self::Text        => "text/plain; charset=utf-8",
            Self::Xml         => "application/xml",
        }
    }
}

// ── ResponseWriter ────────────────────────────────────────────────────────────

/// A buffered HTTP response under construction.
///
/// The status is fixed by the first call to [`set_status`](Self::set_status)
/// or [`write`](Self::write); later status changes are ignored, the same way
/// a status line cannot be resent once it is on the wire.
///
/// ```rust
/// use handler_chain::{ContentType, ResponseWriter};
/// use http::StatusCode;
///
/// let mut w = ResponseWriter::new();
/// w.set_content_type(ContentType::Json);
/// w.set_status(StatusCode::CREATED);
/// w.write(br#"{"id":42}"#);
///
/// let res = w.into_response();
/// assert_eq!(res.status(), StatusCode::CREATED);
/// ```
#[derive(Debug, Default)]
pub struct ResponseWriter {
    status: Option<StatusCode>,
    headers: HeaderMap,
    body: BytesMut,
}

impl ResponseWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// The response status. `200 OK` until something else is written.
    pub fn status(&self) -> StatusCode {
        self.status.unwrap_or(StatusCode::OK)
    }

    /// Sets the status, unless a status or body was already written.
    pub fn set_status(&mut self, code: StatusCode) {
        if self.status.is_none() {
            self.status = Some(code);
        }
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    pub fn set_content_type(&mut self, content_type: ContentType) {
        self.headers
            .insert(CONTENT_TYPE, HeaderValue::from_static(content_type.as_str()));
    }

    /// Appends `buf` to the body. Implies `200 OK` if no status was set.
    pub fn write(&mut self, buf: &[u8]) {
        self.status.get_or_insert(StatusCode::OK);
        self.body.extend_from_slice(buf);
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Whether a status or any body bytes have been written.
    pub fn is_written(&self) -> bool {
        self.status.is_some()
    }

    /// Converts the buffered response into the type hyper and friends serve.
    pub fn into_response(self) -> http::Response<Full<Bytes>> {
        let status = self.status();
        let mut res = http::Response::new(Full::new(self.body.freeze()));
        *res.status_mut() = status;
        *res.headers_mut() = self.headers;
        res
    }
}

/// Lets handlers use `write!` on the writer.
impl fmt::Write for ResponseWriter {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.write(s.as_bytes());
        Ok(())
    }
}
