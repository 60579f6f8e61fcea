//! Pagehand: capability-resolution proxy for page-object UI tests
//!
//! Test steps talk to a single [`DispatchProxy`]. Each operation name goes to
//! the browser driver when the driver supports it, otherwise to the first
//! registered page object that does. The page object that answers a name is
//! built once and reused for the rest of the scenario.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     PAGEHAND Dispatch                         │
//! ├──────────────────────────────────────────────────────────────┤
//! │  step ──► DispatchProxy ──► Driver (supports?) ──► call       │
//! │                │                                              │
//! │                ├──► ResolutionCache (name → page object)      │
//! │                │                                              │
//! │                └──► CandidateRegistry ──► build + supports?   │
//! │                                                               │
//! │  Waiter ──► poll(invoke / seek) until ready or timeout        │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use pagehand::prelude::*;
//!
//! let registry = CandidateRegistry::new().with::<ApplicantHomepage>();
//! let mut proxy = DispatchProxy::new(driver, WaitOptions::default(), registry);
//!
//! proxy.await_all([WaitTarget::operation("getting_started_button")])?;
//! proxy.invoke("getting_started_button", &[])?;
//! ```

#![warn(missing_docs)]
#![cfg_attr(test, allow(clippy::large_stack_arrays, clippy::large_stack_frames))]

// Lets `#[capabilities]` expansions refer to `::pagehand` from inside this crate.
extern crate self as pagehand;

mod capability;
#[allow(clippy::missing_errors_doc, clippy::must_use_candidate)]
mod driver;
#[allow(clippy::missing_errors_doc)]
mod locator;
#[allow(clippy::missing_errors_doc)]
mod proxy;
mod registry;
mod result;
mod value;
#[allow(clippy::missing_errors_doc, clippy::missing_const_for_fn)]
mod wait;

pub use capability::{Capable, Page, PageObject};
pub use driver::{call_standard, ops, Driver, MockDriver};
pub use locator::ELEMENT_COUNT;
pub use proxy::{DispatchProxy, ResolutionPolicy};
pub use registry::{Candidate, CandidateRegistry, Constructor};
pub use result::{HarnessError, HarnessResult};
pub use value::{By, ElementHandle, Value};
pub use wait::{
    wait_until, WaitOptions, WaitResult, WaitTarget, Waiter, DEFAULT_POLL_INTERVAL_MS,
    DEFAULT_WAIT_TIMEOUT_MS,
};

#[cfg(feature = "derive")]
pub use pagehand_derive::capabilities;

/// Prelude for convenient imports
pub mod prelude {
    pub use super::capability::*;
    pub use super::driver::*;
    pub use super::proxy::*;
    pub use super::registry::*;
    pub use super::result::*;
    pub use super::value::*;
    pub use super::wait::*;
    pub use super::ELEMENT_COUNT;

    #[cfg(feature = "derive")]
    pub use pagehand_derive::capabilities;
}
