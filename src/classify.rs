//! Normalization of chain elements into canonical middleware.
//!
//! Elements are walked depth-first, left to right. Nested chains are
//! spliced in place, `Nil` is skipped, middleware is collected, and the
//! first terminal ends the walk: nothing after it is looked at, not even to
//! check that it is well formed.

use std::ops::ControlFlow;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::element::{Dynamic, Element};
use crate::error::Error;
use crate::handler::{Generator, HandlerFunc, Request, ServiceRef};
use crate::middleware::Middleware;
use crate::response::ResponseWriter;

/// The flat middleware list for `elements`, ending in at most one terminal.
pub(crate) fn normalize<I>(elements: I) -> Result<Vec<Middleware>, Error>
where
    I: IntoIterator<Item = Element>,
{
    let mut out = Vec::new();
    if walk(elements, &mut out, 0)?.is_break() {
        debug!(middlewares = out.len(), "terminal reached, remaining elements ignored");
    }
    Ok(out)
}

fn walk<I>(elements: I, out: &mut Vec<Middleware>, depth: usize) -> Result<ControlFlow<()>, Error>
where
    I: IntoIterator<Item = Element>,
{
    for element in elements {
        if classify(element, out, depth)?.is_break() {
            return Ok(ControlFlow::Break(()));
        }
    }
    Ok(ControlFlow::Continue(()))
}

fn classify(element: Element, out: &mut Vec<Middleware>, depth: usize) -> Result<ControlFlow<()>, Error> {
    trace!(kind = element.kind(), depth, "classifying chain element");

    let terminal = match element {
        Element::Nil => return Ok(ControlFlow::Continue(())),
        Element::Chain(items) => return walk(items, out, depth + 1),
        Element::Dynamic(value) => return classify(reify(&value)?, out, depth),
        Element::Middleware(m) => {
            out.push(m);
            return Ok(ControlFlow::Continue(()));
        }
        Element::Handler(h) => h,
        Element::Service(s) => HandlerFunc::from_handler(s),
        Element::Generator(g) => g.into_handler(),
    };

    out.push(Middleware::terminal(terminal));
    Ok(ControlFlow::Break(()))
}

// Function-pointer shapes a `Dynamic` may hold. A named `fn` item coerces
// to these with `as`, e.g. `hello as fn(&mut ResponseWriter, &Request)`.
type WrapFn = fn(HandlerFunc) -> HandlerFunc;
type WrapServiceFn = fn(ServiceRef) -> ServiceRef;
type WrapIntoServiceFn = fn(HandlerFunc) -> ServiceRef;
type WrapFromServiceFn = fn(ServiceRef) -> HandlerFunc;
type HandlerFn = fn(&mut ResponseWriter, &Request);
type FallibleFn = fn(&mut ResponseWriter, &Request) -> Result<(), BoxError>;
type GeneratorFn = fn(&Request) -> HandlerFunc;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Recovers a typed element from a dynamic value.
///
/// Wrapper shapes are tried before terminal shapes, and both before
/// sequences.
fn reify(value: &Dynamic) -> Result<Element, Error> {
    if let Some(element) = value.downcast_ref::<Element>() {
        return Ok(element.clone());
    }

    // wrappers
    if let Some(m) = value.downcast_ref::<Middleware>() {
        return Ok(Element::Middleware(m.clone()));
    }
    if let Some(f) = value.downcast_ref::<WrapFn>() {
        return Ok(Element::Middleware(Middleware::new(*f)));
    }
    if let Some(f) = value.downcast_ref::<WrapServiceFn>() {
        return Ok(Element::Middleware(Middleware::from_service_fn(*f)));
    }
    if let Some(f) = value.downcast_ref::<WrapIntoServiceFn>() {
        return Ok(Element::Middleware(Middleware::from_fn_into_service(*f)));
    }
    if let Some(f) = value.downcast_ref::<WrapFromServiceFn>() {
        return Ok(Element::Middleware(Middleware::from_service_into_fn(*f)));
    }

    // terminals
    if let Some(h) = value.downcast_ref::<HandlerFunc>() {
        return Ok(Element::Handler(h.clone()));
    }
    if let Some(f) = value.downcast_ref::<HandlerFn>() {
        return Ok(Element::Handler(HandlerFunc::new(*f)));
    }
    if let Some(s) = value.downcast_ref::<ServiceRef>() {
        return Ok(Element::Service(s.clone()));
    }
    if let Some(g) = value.downcast_ref::<Generator>() {
        return Ok(Element::Generator(g.clone()));
    }
    if let Some(f) = value.downcast_ref::<GeneratorFn>() {
        return Ok(Element::Generator(Generator::new(*f)));
    }
    if let Some(f) = value.downcast_ref::<FallibleFn>() {
        return Ok(Element::Handler(HandlerFunc::fallible(*f)));
    }

    // sequences
    if let Some(items) = value.downcast_ref::<Vec<Element>>() {
        return Ok(Element::Chain(items.clone()));
    }
    if let Some(items) = value.downcast_ref::<Box<[Element]>>() {
        return Ok(Element::Chain(items.to_vec()));
    }
    if let Some(items) = value.downcast_ref::<Arc<[Element]>>() {
        return Ok(Element::Chain(items.to_vec()));
    }
    if let Some(items) = reify_array(value) {
        return Ok(Element::Chain(items));
    }
    if let Some(element) = value.downcast_ref::<Option<Element>>() {
        return Ok(element.clone().unwrap_or_default());
    }

    Err(Error::UnrecognizedShape { type_name: value.type_name() })
}

macro_rules! reify_array {
    ($($n:literal)*) => {
        /// Fixed-size arrays of elements, up to 16 long.
        fn reify_array(value: &Dynamic) -> Option<Vec<Element>> {
            $(
                if let Some(items) = value.downcast_ref::<[Element; $n]>() {
                    return Some(items.to_vec());
                }
            )*
            None
        }
    };
}

reify_array!(0 1 2 3 4 5 6 7 8 9 10 11 12 13 14 15 16);

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::handler::Handler;

    fn pass() -> Element {
        Element::wrap(|next| next)
    }

    fn exploding() -> Element {
        Element::wrap(|_next| panic!("must not be applied"))
    }

    fn body() -> Element {
        Element::handler(|w, _| w.write(b"body"))
    }

    fn run(middlewares: &[Middleware]) -> Vec<u8> {
        let h = middlewares
            .iter()
            .rev()
            .fold(HandlerFunc::default(), |next, m| m.apply(next));
        let mut w = ResponseWriter::new();
        h.call(&mut w, &http::Request::new(Bytes::new()));
        w.body().to_vec()
    }

    struct Fixed;

    impl Handler for Fixed {
        fn serve(&self, w: &mut ResponseWriter, _r: &Request) {
            w.write(b"fixed");
        }
    }

    #[test]
    fn empty_input_yields_nothing() {
        assert!(normalize(Vec::new()).unwrap().is_empty());
        assert!(normalize(vec![Element::Nil, Element::Chain(vec![Element::Nil])]).unwrap().is_empty());
    }

    #[test]
    fn nested_chains_are_flattened_in_order() {
        let out = normalize(vec![
            pass(),
            Element::Chain(vec![pass(), Element::Chain(vec![pass()]), Element::Nil]),
            pass(),
        ])
        .unwrap();
        assert_eq!(out.len(), 4);
    }

    #[test]
    fn terminal_stops_the_walk() {
        let out = normalize(vec![
            pass(),
            Element::Chain(vec![pass(), body(), exploding()]),
            Element::dynamic("never classified"),
            exploding(),
        ])
        .unwrap();
        assert_eq!(out.len(), 3);
        assert_eq!(run(&out), b"body");
    }

    #[test]
    fn every_terminal_variant_ends_the_list() {
        let terminals = [
            body(),
            Element::service(Fixed),
            Element::generator(|_r| HandlerFunc::new(|w, _| w.write(b"generated"))),
        ];
        for terminal in terminals {
            let out = normalize(vec![terminal, exploding()]).unwrap();
            assert_eq!(out.len(), 1);
        }
    }

    #[test]
    fn dynamic_values_are_reified() {
        let out = normalize(vec![
            Element::dynamic(Middleware::new(|next| next)),
            Element::dynamic(vec![pass(), Element::Nil]),
            Element::dynamic(None::<Element>),
            Element::dynamic(Arc::new(Fixed) as ServiceRef),
        ])
        .unwrap();
        assert_eq!(out.len(), 3);
        assert_eq!(run(&out), b"fixed");
    }

    #[test]
    fn dynamic_function_pointers_and_arrays_are_reified() {
        fn passthrough(next: HandlerFunc) -> HandlerFunc {
            next
        }
        fn hello(w: &mut ResponseWriter, _r: &Request) {
            w.write(b"hello");
        }

        let out = normalize(vec![
            Element::dynamic(passthrough as fn(HandlerFunc) -> HandlerFunc),
            Element::dynamic([pass(), Element::Nil]),
            Element::dynamic(vec![pass()].into_boxed_slice()),
            Element::dynamic(Arc::<[Element]>::from(vec![pass()])),
            Element::dynamic(hello as fn(&mut ResponseWriter, &Request)),
            exploding(),
        ])
        .unwrap();
        assert_eq!(out.len(), 5);
        assert_eq!(run(&out), b"hello");
    }

    #[test]
    fn dynamic_service_and_generator_pointers() {
        fn keep(next: ServiceRef) -> ServiceRef {
            next
        }
        fn route(_r: &Request) -> HandlerFunc {
            HandlerFunc::new(|w, _| w.write(b"routed"))
        }
        fn broken(_w: &mut ResponseWriter, _r: &Request) -> Result<(), BoxError> {
            Err("boom".into())
        }

        let out = normalize(vec![
            Element::dynamic(keep as fn(ServiceRef) -> ServiceRef),
            Element::dynamic(route as fn(&Request) -> HandlerFunc),
        ])
        .unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(run(&out), b"routed");

        let out = normalize(vec![Element::dynamic(
            broken as fn(&mut ResponseWriter, &Request) -> Result<(), BoxError>,
        )])
        .unwrap();
        assert_eq!(run(&out), b"Internal Server Error");
    }

    #[test]
    fn uncoerced_function_item_is_not_recognized() {
        fn hello(w: &mut ResponseWriter, _r: &Request) {
            w.write(b"hello");
        }

        let err = normalize(vec![Element::dynamic(hello)]).unwrap_err();
        assert!(matches!(err, Error::UnrecognizedShape { .. }));
    }

    #[test]
    fn unrecognized_dynamic_value_fails() {
        let err = normalize(vec![pass(), Element::dynamic("not a valid shape")]).unwrap_err();
        assert_eq!(err, Error::UnrecognizedShape { type_name: "&str" });
        assert_eq!(
            err.to_string(),
            "invalid argument: can't process value with type: &str",
        );
    }
}
