//! Chain elements and the conversions into them.
//!
//! Everything that can appear in a chain is an [`Element`]. The variant is
//! picked when the element is built, either through one of the explicit
//! constructors (`Element::wrap`, `Element::handler`, …) or through
//! [`IntoElement`], which the `chain!` and `elements!` macros call on each
//! entry. Which conversion applies is resolved at compile time from the
//! value's signature; a value of no recognized shape does not compile:
//!
//! ```rust,compile_fail
//! let _ = handler_chain::chain!["not a valid shape"];
//! ```
//!
//! Values whose type is only known at runtime go through
//! [`Element::dynamic`] and are classified when the chain is composed.

use std::any::{Any, type_name};
use std::fmt;
use std::sync::Arc;

use crate::handler::{Generator, Handler, HandlerFunc, Request, ServiceRef};
use crate::middleware::Middleware;
use crate::response::ResponseWriter;

// ── Element ───────────────────────────────────────────────────────────────────

/// One entry of a chain, before normalization.
#[derive(Clone, Default)]
pub enum Element {
    /// An absent entry. Contributes nothing.
    #[default]
    Nil,
    /// A wrapper; composition continues past it.
    Middleware(Middleware),
    /// Terminal: a plain handler function.
    Handler(HandlerFunc),
    /// Terminal: a [`Handler`] implementor.
    Service(ServiceRef),
    /// Terminal: a per-request handler selector.
    Generator(Generator),
    /// A nested sequence, spliced in place.
    Chain(Vec<Element>),
    /// A value classified by its runtime type at compose time.
    Dynamic(Dynamic),
}

impl Element {
    /// Middleware of shape `Fn(HandlerFunc) -> HandlerFunc`.
    pub fn wrap<F>(f: F) -> Self
    where
        F: Fn(HandlerFunc) -> HandlerFunc + Send + Sync + 'static,
    {
        Self::Middleware(Middleware::new(f))
    }

    /// Middleware of shape `Fn(ServiceRef) -> ServiceRef`.
    pub fn wrap_service<F>(f: F) -> Self
    where
        F: Fn(ServiceRef) -> ServiceRef + Send + Sync + 'static,
    {
        Self::Middleware(Middleware::from_service_fn(f))
    }

    /// Middleware of shape `Fn(HandlerFunc) -> ServiceRef`.
    pub fn wrap_into_service<F>(f: F) -> Self
    where
        F: Fn(HandlerFunc) -> ServiceRef + Send + Sync + 'static,
    {
        Self::Middleware(Middleware::from_fn_into_service(f))
    }

    /// Middleware of shape `Fn(ServiceRef) -> HandlerFunc`.
    pub fn wrap_from_service<F>(f: F) -> Self
    where
        F: Fn(ServiceRef) -> HandlerFunc + Send + Sync + 'static,
    {
        Self::Middleware(Middleware::from_service_into_fn(f))
    }

    pub fn handler<F>(f: F) -> Self
    where
        F: Fn(&mut ResponseWriter, &Request) + Send + Sync + 'static,
    {
        Self::Handler(HandlerFunc::new(f))
    }

    pub fn service<H: Handler>(handler: H) -> Self {
        Self::Service(Arc::new(handler))
    }

    pub fn generator<F>(f: F) -> Self
    where
        F: Fn(&Request) -> HandlerFunc + Send + Sync + 'static,
    {
        Self::Generator(Generator::new(f))
    }

    /// Terminal handler that can fail. See [`HandlerFunc::fallible`].
    pub fn fallible<F, E>(f: F) -> Self
    where
        F: Fn(&mut ResponseWriter, &Request) -> Result<(), E> + Send + Sync + 'static,
        E: fmt::Display,
    {
        Self::Handler(HandlerFunc::fallible(f))
    }

    pub fn chain<I>(items: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Element>,
    {
        Self::Chain(items.into_iter().map(Into::into).collect())
    }

    pub fn dynamic<T: Any + Send + Sync>(value: T) -> Self {
        Self::Dynamic(Dynamic::new(value))
    }

    /// Whether this element ends classification when reached.
    ///
    /// `Chain` and `Dynamic` report `false`; what they hold is only known
    /// once they are walked.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Handler(_) | Self::Service(_) | Self::Generator(_))
    }

    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Self::Nil           => "nil",
            Self::Middleware(_) => "middleware",
            Self::Handler(_)    => "handler",
            Self::Service(_)    => "service",
            Self::Generator(_)  => "generator",
            Self::Chain(_)      => "chain",
            Self::Dynamic(_)    => "dynamic",
        }
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nil              => f.write_str("Nil"),
            Self::Middleware(m)    => f.debug_tuple("Middleware").field(m).finish(),
            Self::Handler(h)       => f.debug_tuple("Handler").field(h).finish(),
            Self::Service(_)       => f.write_str("Service(..)"),
            Self::Generator(g)     => f.debug_tuple("Generator").field(g).finish(),
            Self::Chain(items)     => f.debug_tuple("Chain").field(items).finish(),
            Self::Dynamic(value)   => f.debug_tuple("Dynamic").field(value).finish(),
        }
    }
}

impl From<Middleware> for Element {
    fn from(m: Middleware) -> Self {
        Self::Middleware(m)
    }
}

impl From<HandlerFunc> for Element {
    fn from(h: HandlerFunc) -> Self {
        Self::Handler(h)
    }
}

impl From<ServiceRef> for Element {
    fn from(s: ServiceRef) -> Self {
        Self::Service(s)
    }
}

impl From<Generator> for Element {
    fn from(g: Generator) -> Self {
        Self::Generator(g)
    }
}

impl From<Vec<Element>> for Element {
    fn from(items: Vec<Element>) -> Self {
        Self::Chain(items)
    }
}

impl<T: Into<Element>> From<Option<T>> for Element {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Nil, Into::into)
    }
}

// ── Dynamic ───────────────────────────────────────────────────────────────────

/// A value of any type, remembered together with its type name.
///
/// At compose time the value is matched, in order, against:
///
/// - an [`Element`];
/// - wrappers: [`Middleware`], `fn(HandlerFunc) -> HandlerFunc`,
///   `fn(ServiceRef) -> ServiceRef`, `fn(HandlerFunc) -> ServiceRef`,
///   `fn(ServiceRef) -> HandlerFunc`;
/// - terminals: [`HandlerFunc`], `fn(&mut ResponseWriter, &Request)`,
///   [`ServiceRef`], [`Generator`], `fn(&Request) -> HandlerFunc`,
///   `fn(&mut ResponseWriter, &Request) -> Result<(), Box<dyn Error + Send + Sync>>`;
/// - sequences: `Vec<Element>`, `Box<[Element]>`, `Arc<[Element]>`,
///   `[Element; N]` for `N` up to 16, and `Option<Element>`.
///
/// Function items and closures have unnameable types, so a function must be
/// cast to its pointer type first (`hello as fn(&mut ResponseWriter, &Request)`).
/// Anything else fails composition with
/// [`Error::UnrecognizedShape`](crate::Error::UnrecognizedShape).
#[derive(Clone)]
pub struct Dynamic {
    value: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl Dynamic {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self { value: Arc::new(value), type_name: type_name::<T>() }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub(crate) fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }
}

impl fmt::Debug for Dynamic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dynamic")
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}

// ── IntoElement ───────────────────────────────────────────────────────────────

/// Conversion into an [`Element`], selected by the value's shape.
///
/// `Marker` only exists to keep the blanket implementations apart; callers
/// never name it. Implemented for:
///
/// | Shape | Element |
/// |---|---|
/// | `Fn(HandlerFunc) -> HandlerFunc` | middleware |
/// | `Fn(ServiceRef) -> ServiceRef` | middleware |
/// | `Fn(HandlerFunc) -> ServiceRef` | middleware |
/// | `Fn(ServiceRef) -> HandlerFunc` | middleware |
/// | `Fn(&mut ResponseWriter, &Request)` | terminal handler |
/// | any [`Handler`] (including [`HandlerFunc`]) | terminal service |
/// | `Fn(&Request) -> HandlerFunc` | terminal generator |
/// | `Fn(&mut ResponseWriter, &Request) -> Result<(), E>` | fallible terminal |
/// | [`Element`], [`Middleware`], [`Generator`] | itself |
/// | `Option<T>` | `T`, or nil |
/// | `Vec<T>`, `[T; N]` | nested chain |
///
/// Closures need their parameter types annotated, since the shape is read
/// off the signature.
pub trait IntoElement<Marker>: Sized {
    fn into_element(self) -> Element;
}

/// Marker types for [`IntoElement`].
pub mod marker {
    #[derive(Debug)]
    pub enum Itself {}
    #[derive(Debug)]
    pub enum Wrap {}
    #[derive(Debug)]
    pub enum WrapService {}
    #[derive(Debug)]
    pub enum WrapIntoService {}
    #[derive(Debug)]
    pub enum WrapFromService {}
    #[derive(Debug)]
    pub enum HandlerFn {}
    #[derive(Debug)]
    pub enum Service {}
    #[derive(Debug)]
    pub enum Generator {}
    #[derive(Debug)]
    pub enum Fallible {}
    #[derive(Debug)]
    pub struct Optional<M>(std::marker::PhantomData<M>);
    #[derive(Debug)]
    pub struct Sequence<M>(std::marker::PhantomData<M>);
}

impl IntoElement<marker::Itself> for Element {
    fn into_element(self) -> Element {
        self
    }
}

impl IntoElement<marker::Itself> for Middleware {
    fn into_element(self) -> Element {
        Element::Middleware(self)
    }
}

impl IntoElement<marker::Itself> for Generator {
    fn into_element(self) -> Element {
        Element::Generator(self)
    }
}

impl<F> IntoElement<marker::Wrap> for F
where
    F: Fn(HandlerFunc) -> HandlerFunc + Send + Sync + 'static,
{
    fn into_element(self) -> Element {
        Element::wrap(self)
    }
}

impl<F> IntoElement<marker::WrapService> for F
where
    F: Fn(ServiceRef) -> ServiceRef + Send + Sync + 'static,
{
    fn into_element(self) -> Element {
        Element::wrap_service(self)
    }
}

impl<F> IntoElement<marker::WrapIntoService> for F
where
    F: Fn(HandlerFunc) -> ServiceRef + Send + Sync + 'static,
{
    fn into_element(self) -> Element {
        Element::wrap_into_service(self)
    }
}

impl<F> IntoElement<marker::WrapFromService> for F
where
    F: Fn(ServiceRef) -> HandlerFunc + Send + Sync + 'static,
{
    fn into_element(self) -> Element {
        Element::wrap_from_service(self)
    }
}

impl<F> IntoElement<marker::HandlerFn> for F
where
    F: Fn(&mut ResponseWriter, &Request) + Send + Sync + 'static,
{
    fn into_element(self) -> Element {
        Element::handler(self)
    }
}

impl<H: Handler> IntoElement<marker::Service> for H {
    fn into_element(self) -> Element {
        Element::service(self)
    }
}

impl<F> IntoElement<marker::Generator> for F
where
    F: Fn(&Request) -> HandlerFunc + Send + Sync + 'static,
{
    fn into_element(self) -> Element {
        Element::generator(self)
    }
}

impl<F, E> IntoElement<marker::Fallible> for F
where
    F: Fn(&mut ResponseWriter, &Request) -> Result<(), E> + Send + Sync + 'static,
    E: fmt::Display,
{
    fn into_element(self) -> Element {
        Element::fallible(self)
    }
}

impl<M, T: IntoElement<M>> IntoElement<marker::Optional<M>> for Option<T> {
    fn into_element(self) -> Element {
        self.map_or(Element::Nil, IntoElement::into_element)
    }
}

impl<M, T: IntoElement<M>> IntoElement<marker::Sequence<M>> for Vec<T> {
    fn into_element(self) -> Element {
        Element::Chain(self.into_iter().map(IntoElement::into_element).collect())
    }
}

impl<M, T: IntoElement<M>, const N: usize> IntoElement<marker::Sequence<M>> for [T; N] {
    fn into_element(self) -> Element {
        Element::Chain(self.into_iter().map(IntoElement::into_element).collect())
    }
}

// ── elements! ─────────────────────────────────────────────────────────────────

/// Builds a `Vec<Element>` from a comma-separated list.
///
/// Each entry is anything implementing [`IntoElement`], or a bracketed
/// sublist, which becomes a nested [`Element::Chain`]:
///
/// ```rust
/// use handler_chain::{Element, HandlerFunc, elements};
///
/// fn pass(next: HandlerFunc) -> HandlerFunc { next }
///
/// let list = elements![pass, [pass, [pass]], Element::Nil];
/// assert_eq!(list.len(), 3);
/// ```
#[macro_export]
macro_rules! elements {
    (@acc [$($out:expr),*]) => {{
        let elements: ::std::vec::Vec<$crate::Element> = ::std::vec![$($out),*];
        elements
    }};
    (@acc [$($out:expr),*] [$($nested:tt)*] $(, $($rest:tt)*)?) => {
        $crate::elements!(
            @acc [$($out,)* $crate::Element::Chain($crate::elements!($($nested)*))]
            $($($rest)*)?
        )
    };
    (@acc [$($out:expr),*] $next:expr $(, $($rest:tt)*)?) => {
        $crate::elements!(
            @acc [$($out,)* $crate::IntoElement::into_element($next)]
            $($($rest)*)?
        )
    };
    (@acc $($unexpected:tt)*) => {
        ::std::compile_error!("elements!: expected a comma-separated list of chain elements")
    };
    ($($input:tt)*) => {
        $crate::elements!(@acc [] $($input)*)
    };
}
