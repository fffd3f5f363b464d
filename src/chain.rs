//! Folding normalized middleware into one handler.

use tracing::debug;

use crate::classify;
use crate::element::Element;
use crate::error::Error;
use crate::handler::HandlerFunc;
use crate::middleware::Middleware;

/// Composes `elements` into one handler, or reports why it cannot.
///
/// For middleware `m0, m1, …, mN` followed by a terminal `h`, the result
/// behaves exactly like `m0(m1(…mN(h)…))`. Without a terminal, the
/// innermost `next` is a handler that does nothing.
pub fn try_compose<I>(elements: I) -> Result<HandlerFunc, Error>
where
    I: IntoIterator<Item = Element>,
{
    let middlewares = classify::normalize(elements)?;
    debug!(middlewares = middlewares.len(), "composed handler chain");
    Ok(fold(&middlewares))
}

/// Composes `elements` into one handler.
///
/// # Panics
///
/// Panics if an [`Element::Dynamic`] reached before the terminal holds a
/// value of no recognized shape. Chains are wired once at startup, so this
/// is a programming error; use [`try_compose`] to handle it instead.
pub fn compose<I>(elements: I) -> HandlerFunc
where
    I: IntoIterator<Item = Element>,
{
    try_compose(elements).unwrap_or_else(|e| panic!("{e}"))
}

fn fold(middlewares: &[Middleware]) -> HandlerFunc {
    middlewares
        .iter()
        .rev()
        .fold(HandlerFunc::default(), |next, m| m.apply(next))
}

/// Composes a literal list of chain elements into one handler.
///
/// Entries follow [`elements!`](crate::elements): anything implementing
/// [`IntoElement`](crate::IntoElement), or a bracketed sublist.
///
/// ```rust
/// use handler_chain::{HandlerFunc, Request, ResponseWriter, chain};
///
/// fn shout(next: HandlerFunc) -> HandlerFunc {
///     HandlerFunc::new(move |w, r| {
///         next.call(w, r);
///         w.write(b"!");
///     })
/// }
///
/// fn hello(w: &mut ResponseWriter, _r: &Request) {
///     w.write(b"hello");
/// }
///
/// let app = chain![shout, [shout], hello];
///
/// let mut w = ResponseWriter::new();
/// app.call(&mut w, &http::Request::new(bytes::Bytes::new()));
/// assert_eq!(w.body(), b"hello!!");
/// ```
#[macro_export]
macro_rules! chain {
    ($($input:tt)*) => {
        $crate::compose($crate::elements!($($input)*))
    };
}
