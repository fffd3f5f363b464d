//! Minimal handler-chain example — a composed chain served by hyper.
//!
//! Run with:
//!   RUST_LOG=debug cargo run --example basic
//!
//! Try:
//!   curl -i http://localhost:3000/
//!   curl -i http://localhost:3000/users/42
//!   curl -i http://localhost:3000/users/oops
//!   curl -i http://localhost:3000/nope

use std::num::ParseIntError;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use bytes::Bytes;
use handler_chain::{ContentType, HandlerFunc, Request, ResponseWriter, chain};
use http::{HeaderValue, StatusCode};
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // Wired once at startup; every connection shares the same chain.
    let app = chain![request_id, [access_log], route];

    let listener = TcpListener::bind("127.0.0.1:3000").await?;
    info!(addr = %listener.local_addr()?, "listening");

    loop {
        let (stream, peer) = listener.accept().await?;
        let app = app.clone();

        tokio::spawn(async move {
            let svc = service_fn(move |req| serve(app.clone(), req));
            if let Err(e) = ConnBuilder::new(TokioExecutor::new())
                .serve_connection(TokioIo::new(stream), svc)
                .await
            {
                error!(peer = %peer, "connection error: {e}");
            }
        });
    }
}

/// Buffers the body, runs the chain, hands the buffered response to hyper.
async fn serve(
    app: HandlerFunc,
    req: hyper::Request<Incoming>,
) -> Result<http::Response<Full<Bytes>>, hyper::Error> {
    let (parts, body) = req.into_parts();
    let body = body.collect().await?.to_bytes();
    let req = Request::from_parts(parts, body);

    let mut w = ResponseWriter::new();
    app.call(&mut w, &req);
    Ok(w.into_response())
}

// ── Middleware ────────────────────────────────────────────────────────────────

fn request_id(next: HandlerFunc) -> HandlerFunc {
    static NEXT_ID: AtomicU64 = AtomicU64::new(1);

    HandlerFunc::new(move |w, r| {
        let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
        w.headers_mut().insert("x-request-id", HeaderValue::from(id));
        next.call(w, r);
    })
}

fn access_log(next: HandlerFunc) -> HandlerFunc {
    HandlerFunc::new(move |w, r| {
        let started = Instant::now();
        next.call(w, r);
        info!(
            method = %r.method(),
            path = r.uri().path(),
            status = w.status().as_u16(),
            elapsed = ?started.elapsed(),
            "request",
        );
    })
}

// ── Terminals ─────────────────────────────────────────────────────────────────

// Picks the handler per request; the chain treats it as one terminal.
fn route(r: &Request) -> HandlerFunc {
    match r.uri().path() {
        "/" => HandlerFunc::new(hello),
        path if path.starts_with("/users/") => user_handler(),
        _ => HandlerFunc::new(not_found),
    }
}

fn hello(w: &mut ResponseWriter, _r: &Request) {
    w.set_content_type(ContentType::Text);
    w.write(b"hello");
}

fn not_found(w: &mut ResponseWriter, _r: &Request) {
    w.set_status(StatusCode::NOT_FOUND);
}

// A fallible terminal: a bad id surfaces as a logged 500.
fn user_handler() -> HandlerFunc {
    HandlerFunc::fallible(|w: &mut ResponseWriter, r: &Request| -> Result<(), ParseIntError> {
        let id: u64 = r.uri().path().trim_start_matches("/users/").parse()?;
        w.set_content_type(ContentType::Json);
        w.write(format!(r#"{{"id":{id},"name":"alice"}}"#).as_bytes());
        Ok(())
    })
}
