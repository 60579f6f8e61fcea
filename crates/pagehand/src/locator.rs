//! Element lookup helpers.
//!
//! Both helpers go through the proxy's `find_elements` dispatch, so a driver
//! or page object answering that name is used transparently.

use crate::driver::ops;
use crate::proxy::DispatchProxy;
use crate::result::{HarnessError, HarnessResult};
use crate::value::{By, ElementHandle, Value};
use tracing::trace;

/// Capability consulted by [`DispatchProxy::seek_duplicate_counted`]
pub const ELEMENT_COUNT: &str = "element_count";

impl DispatchProxy {
    /// First element with the given id
    ///
    /// # Errors
    ///
    /// `ElementNotFound` when nothing matches.
    pub fn seek(&mut self, value: &str) -> HarnessResult<ElementHandle> {
        self.seek_by(By::Id, value)
    }

    /// First element matching `by`/`value`, in document order
    pub fn seek_by(&mut self, by: By, value: &str) -> HarnessResult<ElementHandle> {
        self.find_all(by, value)?
            .into_iter()
            .next()
            .ok_or_else(|| not_found(by, value))
    }

    /// Element at 0-based `index` among those sharing an id
    ///
    /// # Errors
    ///
    /// `IndexOutOfRange` when fewer than `index + 1` elements match,
    /// including when nothing matches.
    pub fn seek_duplicate(&mut self, value: &str, index: usize) -> HarnessResult<ElementHandle> {
        self.seek_duplicate_by(By::Id, value, index)
    }

    /// Element at 0-based `index` among those matching `by`/`value`
    pub fn seek_duplicate_by(
        &mut self,
        by: By,
        value: &str,
        index: usize,
    ) -> HarnessResult<ElementHandle> {
        let mut elements = self.find_all(by, value)?;
        let len = elements.len();
        if index >= len {
            return Err(HarnessError::IndexOutOfRange { index, len });
        }
        Ok(elements.swap_remove(index))
    }

    /// Duplicate lookup whose index comes from the `element_count`
    /// capability.
    ///
    /// The count is taken as the 0-based index, which selects past the end
    /// unless the page object reports something smaller than the number of
    /// matches.
    pub fn seek_duplicate_counted(&mut self, by: By, value: &str) -> HarnessResult<ElementHandle> {
        let count = self.invoke(ELEMENT_COUNT, &[])?;
        let index = count
            .as_int()
            .and_then(|n| usize::try_from(n).ok())
            .ok_or_else(|| HarnessError::UnexpectedValue {
                expected: "non-negative int",
                found: count.kind().to_string(),
            })?;
        self.seek_duplicate_by(by, value, index)
    }

    fn find_all(&mut self, by: By, value: &str) -> HarnessResult<Vec<ElementHandle>> {
        let found = self
            .invoke(ops::FIND_ELEMENTS, &[Value::from(by), Value::from(value)])?
            .into_elements()?;
        trace!(%by, value, matches = found.len(), "find_elements");
        Ok(found)
    }
}

fn not_found(by: By, value: &str) -> HarnessError {
    HarnessError::ElementNotFound {
        by: by.to_string(),
        value: value.to_string(),
    }
}
