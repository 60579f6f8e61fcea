//! Driver contract - the default dispatch target.
//!
//! The dispatcher never automates a browser itself. It consumes a [`Driver`]
//! through a narrow interface: a capability probe, a generic call entry
//! point, plural element lookup, script execution, and the teardown and
//! artifact operations the scenario harness uses.
//!
//! [`MockDriver`] is an in-memory implementation for unit testing.

use crate::result::{HarnessError, HarnessResult};
use crate::value::{By, ElementHandle, Value};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Operation names every driver answers to.
pub mod ops {
    /// Plural lookup: `(by, value) -> elements`
    pub const FIND_ELEMENTS: &str = "find_elements";
    /// Singular lookup: `(by, value) -> element`
    pub const FIND_ELEMENT: &str = "find_element";
    /// Script execution: `(script, args...) -> json`
    pub const EXECUTE_SCRIPT: &str = "execute_script";
    /// Artifact capture: `(path) -> unit`
    pub const SAVE_SCREENSHOT: &str = "save_screenshot";
    /// Session identifier: `() -> text | unit`
    pub const SESSION_ID: &str = "session_id";
    /// Session teardown: `() -> unit`
    pub const QUIT: &str = "quit";

    /// All standard operations
    pub const STANDARD: &[&str] = &[
        FIND_ELEMENTS,
        FIND_ELEMENT,
        EXECUTE_SCRIPT,
        SAVE_SCREENSHOT,
        SESSION_ID,
        QUIT,
    ];
}

/// Abstract driver trait for UI automation.
///
/// Methods take `&self` so a driver can be shared between the scenario's
/// proxy and the detached proxies its page objects hold; implementations
/// keep their own interior state.
pub trait Driver: fmt::Debug + Send + Sync {
    /// Plural element lookup, in document order
    fn find_elements(&self, by: By, value: &str) -> HarnessResult<Vec<ElementHandle>>;

    /// Execute a script in the page context
    fn execute_script(&self, script: &str, args: &[Value]) -> HarnessResult<serde_json::Value>;

    /// Save a screenshot to `path`
    fn save_screenshot(&self, path: &Path) -> HarnessResult<()>;

    /// Current session identifier, if a session is open
    fn session_id(&self) -> Option<String>;

    /// End the session
    fn quit(&self) -> HarnessResult<()>;

    /// Whether the driver handles `operation` directly.
    fn supports(&self, operation: &str) -> bool {
        ops::STANDARD.contains(&operation)
    }

    /// Generic entry point used by the dispatcher.
    fn call(&self, operation: &str, args: &[Value]) -> HarnessResult<Value> {
        call_standard(self, operation, args)
    }
}

/// Route a standard operation name to the matching [`Driver`] method.
pub fn call_standard<D: Driver + ?Sized>(
    driver: &D,
    operation: &str,
    args: &[Value],
) -> HarnessResult<Value> {
    match operation {
        ops::FIND_ELEMENTS => {
            let (by, value) = lookup_args(operation, args)?;
            driver.find_elements(by, value).map(Value::Elements)
        }
        ops::FIND_ELEMENT => {
            let (by, value) = lookup_args(operation, args)?;
            driver
                .find_elements(by, value)?
                .into_iter()
                .next()
                .map(Value::Element)
                .ok_or_else(|| HarnessError::ElementNotFound {
                    by: by.to_string(),
                    value: value.to_string(),
                })
        }
        ops::EXECUTE_SCRIPT => {
            let script = text_arg(operation, args, 0)?;
            driver.execute_script(script, &args[1..]).map(Value::Json)
        }
        ops::SAVE_SCREENSHOT => {
            let path = text_arg(operation, args, 0)?;
            driver.save_screenshot(Path::new(path)).map(Value::from)
        }
        ops::SESSION_ID => Ok(driver.session_id().into()),
        ops::QUIT => driver.quit().map(Value::from),
        other => Err(HarnessError::not_found(other)),
    }
}

fn text_arg<'a>(operation: &str, args: &'a [Value], index: usize) -> HarnessResult<&'a str> {
    args.get(index)
        .and_then(Value::as_str)
        .ok_or_else(|| HarnessError::InvalidArguments {
            operation: operation.to_string(),
            message: format!("expected text argument at position {index}"),
        })
}

fn lookup_args<'a>(operation: &str, args: &'a [Value]) -> HarnessResult<(By, &'a str)> {
    let by = text_arg(operation, args, 0)?.parse::<By>()?;
    let value = text_arg(operation, args, 1)?;
    Ok((by, value))
}

#[derive(Debug, Default)]
struct MockState {
    elements: HashMap<(By, String), Vec<ElementHandle>>,
    script_results: VecDeque<serde_json::Value>,
    extra_results: HashMap<String, Value>,
    call_history: Vec<String>,
    current_url: String,
    screenshots: Vec<PathBuf>,
    fail_screenshots: bool,
    quit: bool,
}

/// Mock driver for unit testing
pub struct MockDriver {
    state: Mutex<MockState>,
    session_id: String,
}

impl fmt::Debug for MockDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockDriver")
            .field("session_id", &self.session_id)
            .finish_non_exhaustive()
    }
}

impl Default for MockDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl MockDriver {
    /// Create new mock driver with a fresh session id
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState::default()),
            session_id: uuid::Uuid::new_v4().to_string(),
        }
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add elements matched by `(by, value)`
    #[must_use]
    pub fn with_elements(self, by: By, value: &str, elements: Vec<ElementHandle>) -> Self {
        self.set_elements(by, value, elements);
        self
    }

    /// Replace the elements matched by `(by, value)` on a live driver
    pub fn set_elements(&self, by: By, value: &str, elements: Vec<ElementHandle>) {
        let _ = self
            .state()
            .elements
            .insert((by, value.to_string()), elements);
    }

    /// Support an extra operation that returns `result`
    #[must_use]
    pub fn with_operation(self, operation: impl Into<String>, result: impl Into<Value>) -> Self {
        let _ = self
            .state()
            .extra_results
            .insert(operation.into(), result.into());
        self
    }

    /// Queue a script result
    #[must_use]
    pub fn with_script_result(self, result: serde_json::Value) -> Self {
        self.state().script_results.push_back(result);
        self
    }

    /// Make screenshot capture fail
    #[must_use]
    pub fn with_failing_screenshots(self) -> Self {
        self.state().fail_screenshots = true;
        self
    }

    /// Navigate to `url`
    pub fn navigate(&self, url: &str) {
        let mut state = self.state();
        state.call_history.push(format!("navigate:{url}"));
        state.current_url = url.to_string();
    }

    /// Current URL
    #[must_use]
    pub fn current_url(&self) -> String {
        self.state().current_url.clone()
    }

    /// Get call history
    #[must_use]
    pub fn history(&self) -> Vec<String> {
        self.state().call_history.clone()
    }

    /// Check if method was called
    #[must_use]
    pub fn was_called(&self, method: &str) -> bool {
        self.state()
            .call_history
            .iter()
            .any(|c| c.split(':').next() == Some(method))
    }

    /// Number of recorded calls to `method`
    #[must_use]
    pub fn call_count(&self, method: &str) -> usize {
        self.state()
            .call_history
            .iter()
            .filter(|c| c.split(':').next() == Some(method))
            .count()
    }

    /// Paths of saved screenshots
    #[must_use]
    pub fn screenshots(&self) -> Vec<PathBuf> {
        self.state().screenshots.clone()
    }

    /// Whether `quit` has been called
    #[must_use]
    pub fn is_quit(&self) -> bool {
        self.state().quit
    }
}

impl Driver for MockDriver {
    fn find_elements(&self, by: By, value: &str) -> HarnessResult<Vec<ElementHandle>> {
        let mut state = self.state();
        state
            .call_history
            .push(format!("{}:{by}={value}", ops::FIND_ELEMENTS));
        Ok(state
            .elements
            .get(&(by, value.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    fn execute_script(&self, script: &str, _args: &[Value]) -> HarnessResult<serde_json::Value> {
        let mut state = self.state();
        state
            .call_history
            .push(format!("{}:{script}", ops::EXECUTE_SCRIPT));
        Ok(state
            .script_results
            .pop_front()
            .unwrap_or(serde_json::Value::Null))
    }

    fn save_screenshot(&self, path: &Path) -> HarnessResult<()> {
        let mut state = self.state();
        state
            .call_history
            .push(format!("{}:{}", ops::SAVE_SCREENSHOT, path.display()));
        if state.fail_screenshots {
            return Err(HarnessError::driver("screenshot capture failed"));
        }
        state.screenshots.push(path.to_path_buf());
        Ok(())
    }

    fn session_id(&self) -> Option<String> {
        if self.state().quit {
            None
        } else {
            Some(self.session_id.clone())
        }
    }

    fn quit(&self) -> HarnessResult<()> {
        let mut state = self.state();
        state.call_history.push(ops::QUIT.to_string());
        state.quit = true;
        Ok(())
    }

    fn supports(&self, operation: &str) -> bool {
        ops::STANDARD.contains(&operation) || self.state().extra_results.contains_key(operation)
    }

    fn call(&self, operation: &str, args: &[Value]) -> HarnessResult<Value> {
        let extra = self.state().extra_results.get(operation).cloned();
        match extra {
            Some(result) => {
                self.state().call_history.push(operation.to_string());
                Ok(result)
            }
            None => call_standard(self, operation, args),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn lookup(by: By, value: &str) -> Vec<Value> {
        vec![Value::from(by), Value::from(value)]
    }

    mod mock_driver_tests {
        use super::*;

        #[test]
        fn test_new_has_session() {
            let driver = MockDriver::new();
            assert!(driver.session_id().is_some());
            assert!(!driver.is_quit());
        }

        #[test]
        fn test_sessions_are_unique() {
            assert_ne!(MockDriver::new().session_id(), MockDriver::new().session_id());
        }

        #[test]
        fn test_find_elements_returns_fixture_in_order() {
            let driver = MockDriver::new().with_elements(
                By::Css,
                ".row",
                vec![ElementHandle::new("r1", "tr"), ElementHandle::new("r2", "tr")],
            );
            let found = driver.find_elements(By::Css, ".row").unwrap();
            let ids: Vec<_> = found.iter().map(|e| e.id.as_str()).collect();
            assert_eq!(ids, ["r1", "r2"]);
            assert!(driver.find_elements(By::Id, ".row").unwrap().is_empty());
        }

        #[test]
        fn test_navigate_records_url() {
            let driver = MockDriver::new();
            driver.navigate("http://localhost:8000");
            assert_eq!(driver.current_url(), "http://localhost:8000");
            assert!(driver.was_called("navigate"));
        }

        #[test]
        fn test_quit_ends_session() {
            let driver = MockDriver::new();
            driver.quit().unwrap();
            assert!(driver.is_quit());
            assert!(driver.session_id().is_none());
        }

        #[test]
        fn test_screenshot_failure() {
            let driver = MockDriver::new().with_failing_screenshots();
            assert!(driver.save_screenshot(Path::new("x.png")).is_err());
            assert!(driver.screenshots().is_empty());
        }

        #[test]
        fn test_call_count() {
            let driver = MockDriver::new();
            let _ = driver.find_elements(By::Id, "a");
            let _ = driver.find_elements(By::Id, "b");
            assert_eq!(driver.call_count(ops::FIND_ELEMENTS), 2);
            assert_eq!(driver.call_count(ops::QUIT), 0);
        }
    }

    mod standard_call_tests {
        use super::*;

        #[test]
        fn test_supports_standard_ops() {
            let driver = MockDriver::new();
            for op in ops::STANDARD {
                assert!(driver.supports(op));
            }
            assert!(!driver.supports("getting_started_button"));
            assert!(!driver.supports("FIND_ELEMENTS"));
        }

        #[test]
        fn test_extra_operation() {
            let driver = MockDriver::new().with_operation("title", "Applicant Portal");
            assert!(driver.supports("title"));
            assert_eq!(
                driver.call("title", &[]).unwrap(),
                Value::from("Applicant Portal")
            );
        }

        #[test]
        fn test_call_find_elements() {
            let driver = MockDriver::new().with_elements(
                By::Id,
                "cardbody",
                vec![ElementHandle::new("cardbody", "div")],
            );
            let result = driver
                .call(ops::FIND_ELEMENTS, &lookup(By::Id, "cardbody"))
                .unwrap();
            assert_eq!(result.into_elements().unwrap().len(), 1);
        }

        #[test]
        fn test_call_find_element_not_found() {
            let driver = MockDriver::new();
            let err = driver
                .call(ops::FIND_ELEMENT, &lookup(By::Id, "missing"))
                .unwrap_err();
            assert!(matches!(err, HarnessError::ElementNotFound { .. }));
        }

        #[test]
        fn test_call_rejects_missing_arguments() {
            let driver = MockDriver::new();
            let err = driver.call(ops::FIND_ELEMENTS, &[]).unwrap_err();
            assert!(matches!(err, HarnessError::InvalidArguments { .. }));
        }

        #[test]
        fn test_call_execute_script_pops_results() {
            let driver = MockDriver::new().with_script_result(serde_json::json!(42));
            let first = driver
                .call(ops::EXECUTE_SCRIPT, &[Value::from("return 42")])
                .unwrap();
            assert_eq!(first, Value::Json(serde_json::json!(42)));
            let second = driver
                .call(ops::EXECUTE_SCRIPT, &[Value::from("return 42")])
                .unwrap();
            assert_eq!(second, Value::Json(serde_json::Value::Null));
        }

        #[test]
        fn test_call_session_and_quit() {
            let driver = MockDriver::new();
            assert!(matches!(
                driver.call(ops::SESSION_ID, &[]).unwrap(),
                Value::Text(_)
            ));
            assert_eq!(driver.call(ops::QUIT, &[]).unwrap(), Value::Unit);
            assert_eq!(driver.call(ops::SESSION_ID, &[]).unwrap(), Value::Unit);
        }

        #[test]
        fn test_call_unknown_operation() {
            let driver = MockDriver::new();
            let err = driver.call("card_body", &[]).unwrap_err();
            assert!(matches!(err, HarnessError::CapabilityNotFound { .. }));
        }
    }
}
