//! Candidate registry - the explicit universe of page objects a proxy may
//! dispatch to.
//!
//! Registration order is the enumeration order, and with first-match
//! resolution it decides which page object wins when several support the
//! same operation.

use crate::capability::{Page, PageObject};
use crate::proxy::DispatchProxy;
use crate::result::{HarnessError, HarnessResult};
use std::fmt;

/// Constructor for a registered candidate
pub type Constructor = Box<dyn Fn(DispatchProxy) -> HarnessResult<Box<dyn Page>>>;

/// A registered candidate type
pub struct Candidate {
    name: String,
    construct: Constructor,
}

impl fmt::Debug for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Candidate")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl Candidate {
    /// Candidate name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Build an instance around a detached proxy
    pub fn instantiate(&self, proxy: DispatchProxy) -> HarnessResult<Box<dyn Page>> {
        (self.construct)(proxy)
    }
}

fn build_boxed<P: PageObject>(proxy: DispatchProxy) -> HarnessResult<Box<dyn Page>> {
    match P::build(proxy) {
        Ok(page) => Ok(Box::new(page)),
        Err(err) => Err(HarnessError::CandidateConstruction {
            candidate: P::page_name().to_string(),
            message: err.to_string(),
        }),
    }
}

/// Ordered registry of candidate page objects
#[derive(Debug, Default)]
pub struct CandidateRegistry {
    candidates: Vec<Candidate>,
}

impl CandidateRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a page object type
    #[must_use]
    pub fn with<P: PageObject>(mut self) -> Self {
        self.register_page::<P>();
        self
    }

    /// Register a page object type in place
    pub fn register_page<P: PageObject>(&mut self) {
        self.register(P::page_name(), build_boxed::<P>);
    }

    /// Register a candidate with a custom constructor
    pub fn register<F>(&mut self, name: impl Into<String>, construct: F)
    where
        F: Fn(DispatchProxy) -> HarnessResult<Box<dyn Page>> + 'static,
    {
        self.candidates.push(Candidate {
            name: name.into(),
            construct: Box::new(construct),
        });
    }

    /// Candidates in enumeration order
    pub fn iter(&self) -> impl Iterator<Item = &Candidate> {
        self.candidates.iter()
    }

    /// Candidate names in enumeration order
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.candidates.iter().map(Candidate::name).collect()
    }

    /// Number of registered candidates
    #[must_use]
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    /// Whether no candidates are registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}
