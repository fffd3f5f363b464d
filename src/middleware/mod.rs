//! The canonical middleware type.
//!
//! Middleware receives the rest of the chain as `next` and returns a new
//! handler that may run code before and after delegating to it:
//!
//! ```rust
//! use handler_chain::{HandlerFunc, Middleware};
//! use http::HeaderValue;
//!
//! let stamp = Middleware::new(|next: HandlerFunc| {
//!     HandlerFunc::new(move |w, r| {
//!         w.headers_mut().append("x-before", HeaderValue::from_static("1"));
//!         next.call(w, r);
//!         w.headers_mut().append("x-after", HeaderValue::from_static("1"));
//!     })
//! });
//! # let _ = stamp;
//! ```
//!
//! Four wrapper shapes are accepted, differing in whether they take and
//! return the function form ([`HandlerFunc`]) or the interface form
//! ([`ServiceRef`]) of a handler. All of them normalize to [`Middleware`].
//! Terminal handlers normalize to it as well, through
//! [`Middleware::terminal`], which ignores `next`.

use std::fmt;
use std::sync::Arc;

use crate::handler::{HandlerFunc, ServiceRef};

type BoxedMiddlewareFn = dyn Fn(HandlerFunc) -> HandlerFunc + Send + Sync + 'static;

/// `(next: HandlerFunc) → HandlerFunc`, shared and cheap to clone.
#[derive(Clone)]
pub struct Middleware {
    inner: Arc<BoxedMiddlewareFn>,
}

impl Middleware {
    /// `Fn(HandlerFunc) -> HandlerFunc`, the basic shape.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(HandlerFunc) -> HandlerFunc + Send + Sync + 'static,
    {
        Self { inner: Arc::new(f) }
    }

    /// `Fn(ServiceRef) -> ServiceRef`.
    pub fn from_service_fn<F>(f: F) -> Self
    where
        F: Fn(ServiceRef) -> ServiceRef + Send + Sync + 'static,
    {
        Self::new(move |next| HandlerFunc::from_handler(f(Arc::new(next))))
    }

    /// `Fn(HandlerFunc) -> ServiceRef`.
    pub fn from_fn_into_service<F>(f: F) -> Self
    where
        F: Fn(HandlerFunc) -> ServiceRef + Send + Sync + 'static,
    {
        Self::new(move |next| HandlerFunc::from_handler(f(next)))
    }

    /// `Fn(ServiceRef) -> HandlerFunc`.
    pub fn from_service_into_fn<F>(f: F) -> Self
    where
        F: Fn(ServiceRef) -> HandlerFunc + Send + Sync + 'static,
    {
        Self::new(move |next| f(Arc::new(next)))
    }

    /// A middleware that drops `next` and always yields `handler`.
    pub fn terminal(handler: HandlerFunc) -> Self {
        Self::new(move |_next| handler.clone())
    }

    pub fn apply(&self, next: HandlerFunc) -> HandlerFunc {
        (self.inner)(next)
    }
}

impl fmt::Debug for Middleware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Middleware { .. }")
    }
}
