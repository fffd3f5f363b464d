//! Named chain elements and chains described by configuration.
//!
//! When the order of middleware comes from configuration rather than code,
//! register each element under a name and describe the chain as a list of
//! names. Nested lists are allowed and flatten like nested [`Element::Chain`]s.
//!
//! The configuration type only derives `serde::Deserialize`; pick whatever
//! format the application already reads. In JSON:
//!
//! ```json
//! { "chain": ["request-id", ["auth", "audit"], "users"] }
//! ```

use std::collections::HashMap;
use std::fmt;
use std::ops::ControlFlow;

use serde::Deserialize;
use tracing::debug;

use crate::chain::try_compose;
use crate::element::{Element, IntoElement};
use crate::error::Error;
use crate::handler::HandlerFunc;

/// One entry of a configured chain: a registered name or a nested list.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(untagged)]
pub enum ChainEntry {
    Name(String),
    Nested(Vec<ChainEntry>),
}

/// A chain described by element names.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
pub struct ChainConfig {
    #[serde(default)]
    pub chain: Vec<ChainEntry>,
}

/// Elements available to configured chains, by name.
///
/// Each [`Registry::register`] call returns `self` so registrations chain
/// naturally. Build it once at startup.
#[derive(Clone, Default)]
pub struct Registry {
    elements: HashMap<String, Element>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `element` under `name`, replacing any previous entry.
    pub fn register<M>(mut self, name: impl Into<String>, element: impl IntoElement<M>) -> Self {
        self.elements.insert(name.into(), element.into_element());
        self
    }

    pub fn get(&self, name: &str) -> Option<&Element> {
        self.elements.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.elements.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Looks up the names in `config`, keeping the nesting.
    ///
    /// Resolution stops at the first element that ends a chain, the same
    /// place composition stops: names after a registered terminal are never
    /// looked up, so they need not be registered. A [`Element::Dynamic`]
    /// is only classified at compose time and does not stop resolution.
    pub fn resolve(&self, config: &ChainConfig) -> Result<Vec<Element>, Error> {
        let mut out = Vec::new();
        self.resolve_entries(&config.chain, &mut out)?;
        Ok(out)
    }

    fn resolve_entries(&self, entries: &[ChainEntry], out: &mut Vec<Element>) -> Result<ControlFlow<()>, Error> {
        for entry in entries {
            let flow = match entry {
                ChainEntry::Name(name) => {
                    let element = self
                        .elements
                        .get(name)
                        .cloned()
                        .ok_or_else(|| Error::UnknownElement { name: name.clone() })?;
                    let ends = ends_chain(&element);
                    out.push(element);
                    if ends { ControlFlow::Break(()) } else { ControlFlow::Continue(()) }
                }
                ChainEntry::Nested(inner) => {
                    let mut nested = Vec::new();
                    let flow = self.resolve_entries(inner, &mut nested)?;
                    out.push(Element::Chain(nested));
                    flow
                }
            };
            if flow.is_break() {
                return Ok(flow);
            }
        }
        Ok(ControlFlow::Continue(()))
    }

    /// Resolves `config` and composes the result.
    pub fn compose(&self, config: &ChainConfig) -> Result<HandlerFunc, Error> {
        let elements = self.resolve(config)?;
        debug!(entries = config.chain.len(), "composing configured chain");
        try_compose(elements)
    }
}

fn ends_chain(element: &Element) -> bool {
    match element {
        Element::Chain(items) => items.iter().any(ends_chain),
        other => other.is_terminal(),
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.elements.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("Registry").field("elements", &names).finish()
    }
}
