//! # handler-chain
//!
//! Compose HTTP middleware and a terminal handler into one handler.
//! Nothing more. Nothing less.
//!
//! ## The contract
//!
//! Writing `m1(m2(m3(handler)))` by hand works until the list grows, gets
//! reused across routes, or comes from configuration. handler-chain takes
//! the same pieces as a flat (or nested) list and folds them for you:
//!
//! ```text
//! chain![m1, [m2, m3], handler]   ≡   m1(m2(m3(handler)))
//! ```
//!
//! - **Middleware** runs outermost-first and may act before and after `next`.
//! - **The first terminal wins.** Anything after it is never looked at.
//! - **Nesting is transparent.** Sublists splice in place, depth-first.
//! - **No terminal?** The innermost `next` does nothing.
//!
//! What this crate intentionally ignores: routing, serving, I/O, retries.
//! The composed [`HandlerFunc`] is a plain synchronous function; whatever
//! server hosts it calls it once per request. See `demos/basic.rs` for hyper.
//!
//! ## Quick start
//!
//! ```rust
//! use handler_chain::{HandlerFunc, Request, ResponseWriter, chain};
//! use http::HeaderValue;
//!
//! fn stamp(next: HandlerFunc) -> HandlerFunc {
//!     HandlerFunc::new(move |w, r| {
//!         w.headers_mut().append("before", HeaderValue::from_static("stamp"));
//!         next.call(w, r);
//!         w.headers_mut().append("after", HeaderValue::from_static("stamp"));
//!     })
//! }
//!
//! fn hello(w: &mut ResponseWriter, _r: &Request) {
//!     w.write(b"hello");
//! }
//!
//! let app = chain![stamp, hello];
//!
//! let mut w = ResponseWriter::new();
//! app.call(&mut w, &http::Request::new(bytes::Bytes::new()));
//! assert_eq!(w.body(), b"hello");
//! ```
//!
//! ## Accepted shapes
//!
//! Middleware: `Fn(HandlerFunc) -> HandlerFunc`, plus the three variants
//! that take or return a [`ServiceRef`] instead. Terminals: a plain
//! `Fn(&mut ResponseWriter, &Request)`, any [`Handler`], a per-request
//! generator `Fn(&Request) -> HandlerFunc`, or a fallible handler returning
//! `Result<(), E>`. See [`IntoElement`] for the full table.

mod chain;
mod classify;
mod element;
mod error;
mod handler;
mod registry;
mod response;

pub mod middleware;

pub use chain::{compose, try_compose};
pub use element::{Dynamic, Element, IntoElement, marker};
pub use error::Error;
pub use handler::{Generator, Handler, HandlerFunc, Request, ServiceRef};
pub use middleware::Middleware;
pub use registry::{ChainConfig, ChainEntry, Registry};
pub use response::{ContentType, ResponseWriter};
