//! Terminal handler types and type erasure.
//!
//! # How handlers are stored
//!
//! A chain mixes handlers of *different* concrete types: plain functions,
//! closures capturing configuration, structs implementing [`Handler`]. Rust
//! collections hold one concrete type, so every terminal shape is erased to
//! the same trait object before it enters a chain:
//!
//! ```text
//! fn hello(w: &mut ResponseWriter, r: &Request) { … }   ← user writes this
//!        ↓ HandlerFunc::new(hello)
//! Arc::new(hello)                                       ← one allocation
//!        ↓  stored as Arc<dyn Fn(&mut ResponseWriter, &Request)>
//! handler.call(w, r)  per request                       ← one vtable dispatch
//! ```
//!
//! Cloning a [`HandlerFunc`] is one atomic increment, so middleware can hold
//! its `next` handler by value without caring who else holds it.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use http::StatusCode;
use tracing::error;

use crate::response::{ContentType, ResponseWriter};

/// The request type threaded through every chain.
///
/// The body is fully buffered; the chain passes the request through
/// untouched.
pub type Request = http::Request<Bytes>;

type BoxedHandlerFn = dyn Fn(&mut ResponseWriter, &Request) + Send + Sync + 'static;

// ── HandlerFunc ───────────────────────────────────────────────────────────────

/// The terminal-handler function type: `(response sink, request) → ()`.
///
/// The [`Default`] value does nothing, and is where every composed chain
/// bottoms out.
#[derive(Clone)]
pub struct HandlerFunc {
    inner: Arc<BoxedHandlerFn>,
}

impl HandlerFunc {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&mut ResponseWriter, &Request) + Send + Sync + 'static,
    {
        Self { inner: Arc::new(f) }
    }

    /// A handler that can fail.
    ///
    /// An `Err` is logged at `error` level. If `f` had not written a status
    /// or body yet, the response becomes `500 Internal Server Error`;
    /// otherwise the partial response is left as it is.
    pub fn fallible<F, E>(f: F) -> Self
    where
        F: Fn(&mut ResponseWriter, &Request) -> Result<(), E> + Send + Sync + 'static,
        E: fmt::Display,
    {
        Self::new(move |w, r| {
            if let Err(err) = f(&mut *w, r) {
                error!(
                    error = %err,
                    method = %r.method(),
                    path = r.uri().path(),
                    "terminal handler failed",
                );
                if !w.is_written() {
                    w.set_status(StatusCode::INTERNAL_SERVER_ERROR);
                    w.set_content_type(ContentType::Text);
                    w.write(b"Internal Server Error");
                }
            }
        })
    }

    /// Adapts any [`Handler`] to the function type by calling its dispatch
    /// method.
    pub fn from_handler(handler: ServiceRef) -> Self {
        Self::new(move |w, r| handler.serve(w, r))
    }

    pub fn call(&self, w: &mut ResponseWriter, r: &Request) {
        (self.inner)(w, r)
    }
}

impl Default for HandlerFunc {
    fn default() -> Self {
        Self::new(|_, _| {})
    }
}

impl fmt::Debug for HandlerFunc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("HandlerFunc { .. }")
    }
}

// ── Handler trait ─────────────────────────────────────────────────────────────

/// A value with a single dispatch method, the interface form of a terminal
/// handler.
///
/// Implement it on structs that carry state:
///
/// ```rust
/// use handler_chain::{Handler, Request, ResponseWriter};
///
/// struct Greeting(&'static str);
///
/// impl Handler for Greeting {
///     fn serve(&self, w: &mut ResponseWriter, _r: &Request) {
///         w.write(self.0.as_bytes());
///     }
/// }
/// ```
pub trait Handler: Send + Sync + 'static {
    fn serve(&self, w: &mut ResponseWriter, r: &Request);
}

/// A shared, type-erased [`Handler`].
pub type ServiceRef = Arc<dyn Handler>;

impl Handler for HandlerFunc {
    fn serve(&self, w: &mut ResponseWriter, r: &Request) {
        self.call(w, r)
    }
}

impl<H: Handler + ?Sized> Handler for Arc<H> {
    fn serve(&self, w: &mut ResponseWriter, r: &Request) {
        (**self).serve(w, r)
    }
}

impl<H: Handler + ?Sized> Handler for Box<H> {
    fn serve(&self, w: &mut ResponseWriter, r: &Request) {
        (**self).serve(w, r)
    }
}

// ── Generator ─────────────────────────────────────────────────────────────────

/// A terminal that picks the handler per request: `(request) → HandlerFunc`.
#[derive(Clone)]
pub struct Generator {
    inner: Arc<dyn Fn(&Request) -> HandlerFunc + Send + Sync + 'static>,
}

impl Generator {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Request) -> HandlerFunc + Send + Sync + 'static,
    {
        Self { inner: Arc::new(f) }
    }

    /// The handler this generator selects for `r`.
    pub fn select(&self, r: &Request) -> HandlerFunc {
        (self.inner)(r)
    }

    /// Flattens the generator into a handler that selects, then serves.
    pub fn into_handler(self) -> HandlerFunc {
        HandlerFunc::new(move |w, r| self.select(r).call(w, r))
    }
}

impl fmt::Debug for Generator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Generator { .. }")
    }
}

#[cfg(test)]
mod tests {
    use tracing_test::traced_test;

    use super::*;

    fn request(path: &str) -> Request {
        http::Request::builder().uri(path).body(Bytes::new()).unwrap()
    }

    struct Fixed(&'static [u8]);

    impl Handler for Fixed {
        fn serve(&self, w: &mut ResponseWriter, _r: &Request) {
            w.write(self.0);
        }
    }

    #[test]
    fn default_handler_is_a_no_op() {
        let mut w = ResponseWriter::new();
        HandlerFunc::default().call(&mut w, &request("/"));
        assert!(!w.is_written());
        assert!(w.headers().is_empty());
    }

    #[test]
    fn from_handler_dispatches_to_serve() {
        let h = HandlerFunc::from_handler(Arc::new(Fixed(b"fixed")));
        let mut w = ResponseWriter::new();
        h.call(&mut w, &request("/"));
        assert_eq!(w.body(), b"fixed");
    }

    #[test]
    fn generator_selects_per_request() {
        let generator = Generator::new(|r: &Request| {
            if r.uri().path() == "/a" {
                HandlerFunc::new(|w, _| w.write(b"a"))
            } else {
                HandlerFunc::new(|w, _| w.write(b"other"))
            }
        });
        let h = generator.into_handler();

        let mut w = ResponseWriter::new();
        h.call(&mut w, &request("/a"));
        assert_eq!(w.body(), b"a");

        let mut w = ResponseWriter::new();
        h.call(&mut w, &request("/b"));
        assert_eq!(w.body(), b"other");
    }

    #[test]
    #[traced_test]
    fn fallible_error_is_logged_and_becomes_500() {
        let h = HandlerFunc::fallible(|_w: &mut ResponseWriter, _r: &Request| -> Result<(), String> {
            Err("user 7 not found".to_owned())
        });
        let mut w = ResponseWriter::new();
        h.call(&mut w, &request("/users/7"));

        assert_eq!(w.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(w.headers()[http::header::CONTENT_TYPE], "text/plain; charset=utf-8");
        assert_eq!(w.body(), b"Internal Server Error");
        assert!(logs_contain("terminal handler failed"));
        assert!(logs_contain("user 7 not found"));
        assert!(logs_contain("/users/7"));
    }

    #[test]
    #[traced_test]
    fn fallible_success_logs_nothing() {
        let h = HandlerFunc::fallible(|w: &mut ResponseWriter, _r: &Request| -> Result<(), String> {
            w.write(b"ok");
            Ok(())
        });
        let mut w = ResponseWriter::new();
        h.call(&mut w, &request("/"));

        assert_eq!(w.body(), b"ok");
        assert!(!logs_contain("terminal handler failed"));
    }
}
