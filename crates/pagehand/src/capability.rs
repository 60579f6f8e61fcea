//! Capability contract shared by page objects.
//!
//! A page object answers two questions for the dispatcher: "do you handle
//! this operation?" ([`Capable::supports`]) and "run it with these
//! arguments" ([`Capable::perform`]). Write the table by hand or generate it
//! with `#[capabilities]` on an inherent `impl` block.
//!
//! # Example
//!
//! ```ignore
//! #[derive(Debug)]
//! struct ApplicantHomepage {
//!     proxy: DispatchProxy,
//! }
//!
//! #[capabilities]
//! impl ApplicantHomepage {
//!     fn getting_started_button(&mut self) -> HarnessResult<ElementHandle> {
//!         self.proxy.seek("getStarted")
//!     }
//! }
//!
//! impl PageObject for ApplicantHomepage {
//!     fn build(proxy: DispatchProxy) -> HarnessResult<Self> {
//!         Ok(Self { proxy })
//!     }
//! }
//! ```

use crate::proxy::DispatchProxy;
use crate::result::HarnessResult;
use crate::value::Value;

/// Explicit capability query and invocation.
pub trait Capable {
    /// Whether this object handles `operation`. Names are exact and
    /// case-sensitive.
    fn supports(&self, operation: &str) -> bool;

    /// Run `operation` with `args`.
    ///
    /// # Errors
    ///
    /// Returns `CapabilityNotFound` for unsupported names, or whatever the
    /// operation itself reports.
    fn perform(&mut self, operation: &str, args: &[Value]) -> HarnessResult<Value>;
}

/// Object-safe page object stored by the dispatcher.
pub trait Page: Capable + std::fmt::Debug {}

impl<T: Capable + std::fmt::Debug> Page for T {}

/// A page object type that can be registered as a dispatch candidate.
pub trait PageObject: Page + Sized + 'static {
    /// Build the page object.
    ///
    /// `proxy` is detached: it forwards to the same driver and wait options
    /// as the scenario's proxy but has no candidates of its own.
    fn build(proxy: DispatchProxy) -> HarnessResult<Self>;

    /// Name used for registration and logging.
    fn page_name() -> &'static str {
        let full = std::any::type_name::<Self>();
        full.rsplit("::").next().unwrap_or(full)
    }
}
