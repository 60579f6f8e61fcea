//! Dispatch proxy - the single object test steps talk to.
//!
//! ## Resolution order
//!
//! 1. The driver, if it supports the operation. Checked on every call and
//!    never cached.
//! 2. The page object already resolved for this operation name.
//! 3. The first registered candidate whose fresh instance supports the
//!    operation. That instance is cached under the name for the life of the
//!    proxy.
//! 4. Otherwise `CapabilityNotFound`.
//!
//! Candidates are built with a detached proxy (same driver, same wait
//! options, no candidates), so page objects cannot recurse into resolution.

use crate::capability::Page;
use crate::driver::{ops, Driver};
use crate::registry::CandidateRegistry;
use crate::result::{HarnessError, HarnessResult};
use crate::value::Value;
use crate::wait::{WaitOptions, WaitResult, WaitTarget, Waiter};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// How resolution treats operations supported by several candidates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionPolicy {
    /// The earliest registered candidate wins
    #[default]
    FirstMatch,
    /// More than one supporting candidate is an `AmbiguousCapability` error
    Strict,
}

#[derive(Debug)]
struct Resolved {
    candidate: String,
    page: Box<dyn Page>,
}

/// Capability-resolution façade over a driver and its page objects
pub struct DispatchProxy {
    driver: Arc<dyn Driver>,
    wait: WaitOptions,
    candidates: CandidateRegistry,
    policy: ResolutionPolicy,
    cache: HashMap<String, Resolved>,
}

impl fmt::Debug for DispatchProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut resolved: Vec<_> = self.cache.keys().collect();
        resolved.sort();
        f.debug_struct("DispatchProxy")
            .field("driver", &self.driver)
            .field("candidates", &self.candidates.names())
            .field("policy", &self.policy)
            .field("resolved", &resolved)
            .finish_non_exhaustive()
    }
}

impl DispatchProxy {
    /// Create a proxy over `driver` with the given candidates
    #[must_use]
    pub fn new(driver: Arc<dyn Driver>, wait: WaitOptions, candidates: CandidateRegistry) -> Self {
        Self {
            driver,
            wait,
            candidates,
            policy: ResolutionPolicy::default(),
            cache: HashMap::new(),
        }
    }

    /// Create a proxy with no candidates; everything goes to the driver
    #[must_use]
    pub fn detached(driver: Arc<dyn Driver>, wait: WaitOptions) -> Self {
        Self::new(driver, wait, CandidateRegistry::new())
    }

    /// Set the resolution policy
    #[must_use]
    pub const fn with_policy(mut self, policy: ResolutionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// The default target
    #[must_use]
    pub fn driver(&self) -> &Arc<dyn Driver> {
        &self.driver
    }

    /// Wait options used by [`DispatchProxy::await_all`]
    #[must_use]
    pub const fn wait_options(&self) -> &WaitOptions {
        &self.wait
    }

    /// Resolution policy
    #[must_use]
    pub const fn policy(&self) -> ResolutionPolicy {
        self.policy
    }

    /// Registered candidate names in enumeration order
    #[must_use]
    pub fn candidates(&self) -> Vec<&str> {
        self.candidates.names()
    }

    /// Operation names resolved to page objects so far, sorted
    #[must_use]
    pub fn resolved_operations(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.cache.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Candidate that handles a resolved operation
    #[must_use]
    pub fn resolved_by(&self, operation: &str) -> Option<&str> {
        self.cache.get(operation).map(|r| r.candidate.as_str())
    }

    /// Invoke `operation` on whichever target implements it.
    ///
    /// # Errors
    ///
    /// `CapabilityNotFound` when neither the driver nor any candidate
    /// supports the name, `AmbiguousCapability` under the strict policy, or
    /// the error returned by the target itself.
    pub fn invoke(&mut self, operation: &str, args: &[Value]) -> HarnessResult<Value> {
        if self.driver.supports(operation) {
            debug!(operation, "forwarding to driver");
            return self.driver.call(operation, args);
        }

        if let Some(resolved) = self.cache.get_mut(operation) {
            return resolved.page.perform(operation, args);
        }

        let resolved = self.resolve(operation)?;
        debug!(operation, candidate = %resolved.candidate, "resolved operation");
        let resolved = self
            .cache
            .entry(operation.to_string())
            .or_insert(resolved);
        resolved.page.perform(operation, args)
    }

    /// Whether `invoke(operation)` would find a target.
    ///
    /// Probing builds candidates but never fills the resolution cache. Under
    /// the strict policy a name supported by several candidates is reported
    /// as unsupported, since resolving it fails.
    pub fn supports(&self, operation: &str) -> bool {
        if self.driver.supports(operation) || self.cache.contains_key(operation) {
            return true;
        }
        let mut matching = self.candidates.iter().filter(|candidate| {
            candidate
                .instantiate(self.detached_handle())
                .is_ok_and(|page| page.supports(operation))
        });
        match self.policy {
            ResolutionPolicy::FirstMatch => matching.next().is_some(),
            ResolutionPolicy::Strict => matching.count() == 1,
        }
    }

    /// Run a script through the driver
    pub fn execute_script(&mut self, script: &str, args: &[Value]) -> HarnessResult<Value> {
        let mut call_args = Vec::with_capacity(args.len() + 1);
        call_args.push(Value::from(script));
        call_args.extend_from_slice(args);
        self.invoke(ops::EXECUTE_SCRIPT, &call_args)
    }

    /// Wait for each target in turn using this proxy's wait options
    pub fn await_all<I>(&mut self, targets: I) -> HarnessResult<Vec<WaitResult>>
    where
        I: IntoIterator,
        I::Item: Into<WaitTarget>,
    {
        let waiter = Waiter::with_options(self.wait.clone());
        waiter.await_all(self, targets)
    }

    fn detached_handle(&self) -> Self {
        Self::detached(Arc::clone(&self.driver), self.wait.clone())
    }

    fn resolve(&self, operation: &str) -> HarnessResult<Resolved> {
        let mut matches = self.candidates.iter().filter_map(|candidate| {
            match candidate.instantiate(self.detached_handle()) {
                Ok(page) if page.supports(operation) => Some(Resolved {
                    candidate: candidate.name().to_string(),
                    page,
                }),
                Ok(_) => None,
                Err(err) => {
                    debug!(candidate = candidate.name(), error = %err, "skipping candidate");
                    None
                }
            }
        });

        let first = matches
            .next()
            .ok_or_else(|| HarnessError::not_found(operation))?;

        if self.policy == ResolutionPolicy::Strict {
            let others: Vec<String> = matches.map(|r| r.candidate).collect();
            if !others.is_empty() {
                let mut candidates = vec![first.candidate];
                candidates.extend(others);
                return Err(HarnessError::AmbiguousCapability {
                    operation: operation.to_string(),
                    candidates,
                });
            }
        }

        Ok(first)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::capability::Capable;
    use crate::driver::MockDriver;
    use crate::value::{By, ElementHandle};
    use proptest::prelude::*;
    use std::cell::Cell;
    use std::rc::Rc;

    /// Page object that answers a fixed set of names and counts its own calls.
    #[derive(Debug)]
    struct Probe {
        label: &'static str,
        operations: &'static [&'static str],
        calls: i64,
    }

    impl Capable for Probe {
        fn supports(&self, operation: &str) -> bool {
            self.operations.contains(&operation)
        }

        fn perform(&mut self, operation: &str, _args: &[Value]) -> HarnessResult<Value> {
            if !self.supports(operation) {
                return Err(HarnessError::not_found(operation));
            }
            self.calls += 1;
            Ok(Value::from(format!("{}#{}", self.label, self.calls)))
        }
    }

    fn register_probe(
        registry: &mut CandidateRegistry,
        label: &'static str,
        operations: &'static [&'static str],
    ) {
        registry.register(label, move |_proxy| {
            Ok(Box::new(Probe {
                label,
                operations,
                calls: 0,
            }) as Box<dyn Page>)
        });
    }

    fn proxy_with(driver: MockDriver, registry: CandidateRegistry) -> DispatchProxy {
        DispatchProxy::new(Arc::new(driver), WaitOptions::default(), registry)
    }

    mod driver_precedence_tests {
        use super::*;

        #[test]
        fn test_driver_wins_over_helper() {
            let mut registry = CandidateRegistry::new();
            register_probe(&mut registry, "Title", &["title"]);
            let mut proxy = proxy_with(
                MockDriver::new().with_operation("title", "from driver"),
                registry,
            );

            for _ in 0..3 {
                assert_eq!(proxy.invoke("title", &[]).unwrap(), Value::from("from driver"));
            }
            assert!(proxy.resolved_operations().is_empty());
        }

        #[test]
        fn test_standard_operation_goes_to_driver() {
            let mut registry = CandidateRegistry::new();
            register_probe(&mut registry, "Shadow", &[ops::FIND_ELEMENTS]);
            let driver = MockDriver::new().with_elements(
                By::Id,
                "cardbody",
                vec![ElementHandle::new("cardbody", "div")],
            );
            let mut proxy = proxy_with(driver, registry);

            let result = proxy
                .invoke(ops::FIND_ELEMENTS, &[By::Id.into(), "cardbody".into()])
                .unwrap();
            assert_eq!(result.into_elements().unwrap().len(), 1);
            assert!(proxy.resolved_by(ops::FIND_ELEMENTS).is_none());
        }
    }

    mod resolution_tests {
        use super::*;

        #[test]
        fn test_resolves_once_and_reuses_instance() {
            let mut registry = CandidateRegistry::new();
            register_probe(&mut registry, "Home", &["card_body"]);
            let mut proxy = proxy_with(MockDriver::new(), registry);

            assert_eq!(proxy.invoke("card_body", &[]).unwrap(), Value::from("Home#1"));
            assert_eq!(proxy.invoke("card_body", &[]).unwrap(), Value::from("Home#2"));
            assert_eq!(proxy.invoke("card_body", &[]).unwrap(), Value::from("Home#3"));
            assert_eq!(proxy.resolved_by("card_body"), Some("Home"));
        }

        #[test]
        fn test_candidates_built_only_on_first_resolution() {
            let built = Rc::new(Cell::new(0));
            let mut registry = CandidateRegistry::new();
            let counter = Rc::clone(&built);
            registry.register("Counted", move |_proxy| {
                counter.set(counter.get() + 1);
                Ok(Box::new(Probe {
                    label: "Counted",
                    operations: &["banner"],
                    calls: 0,
                }) as Box<dyn Page>)
            });
            let mut proxy = proxy_with(MockDriver::new(), registry);

            for _ in 0..5 {
                let _ = proxy.invoke("banner", &[]).unwrap();
            }
            assert_eq!(built.get(), 1);
        }

        #[test]
        fn test_first_match_wins() {
            let mut registry = CandidateRegistry::new();
            register_probe(&mut registry, "Unrelated", &["footer"]);
            register_probe(&mut registry, "Earlier", &["submit"]);
            register_probe(&mut registry, "Later", &["submit"]);
            let mut proxy = proxy_with(MockDriver::new(), registry);

            assert_eq!(proxy.invoke("submit", &[]).unwrap(), Value::from("Earlier#1"));
            assert_eq!(proxy.resolved_by("submit"), Some("Earlier"));
        }

        #[test]
        fn test_separate_names_get_separate_instances() {
            let mut registry = CandidateRegistry::new();
            register_probe(&mut registry, "Home", &["header", "footer"]);
            let mut proxy = proxy_with(MockDriver::new(), registry);

            assert_eq!(proxy.invoke("header", &[]).unwrap(), Value::from("Home#1"));
            assert_eq!(proxy.invoke("footer", &[]).unwrap(), Value::from("Home#1"));
            assert_eq!(proxy.invoke("header", &[]).unwrap(), Value::from("Home#2"));
            assert_eq!(proxy.resolved_operations(), ["footer", "header"]);
        }

        #[test]
        fn test_names_are_case_sensitive() {
            let mut registry = CandidateRegistry::new();
            register_probe(&mut registry, "Home", &["card_body"]);
            let mut proxy = proxy_with(MockDriver::new(), registry);

            assert!(matches!(
                proxy.invoke("Card_Body", &[]),
                Err(HarnessError::CapabilityNotFound { .. })
            ));
        }

        #[test]
        fn test_failing_candidates_are_skipped() {
            let mut registry = CandidateRegistry::new();
            registry.register("Broken", |_proxy| Err(HarnessError::driver("no page")));
            register_probe(&mut registry, "Working", &["card_body"]);
            let mut proxy = proxy_with(MockDriver::new(), registry);

            assert_eq!(
                proxy.invoke("card_body", &[]).unwrap(),
                Value::from("Working#1")
            );
        }

        #[test]
        fn test_candidates_receive_detached_proxy() {
            let seen = Rc::new(Cell::new(usize::MAX));
            let mut registry = CandidateRegistry::new();
            let probe = Rc::clone(&seen);
            registry.register("Inspector", move |proxy: DispatchProxy| {
                probe.set(proxy.candidates().len());
                Ok(Box::new(Probe {
                    label: "Inspector",
                    operations: &["inspect"],
                    calls: 0,
                }) as Box<dyn Page>)
            });
            register_probe(&mut registry, "Other", &[]);
            let mut proxy = proxy_with(MockDriver::new(), registry);

            let _ = proxy.invoke("inspect", &[]).unwrap();
            assert_eq!(seen.get(), 0);
        }
    }

    mod not_found_tests {
        use super::*;

        #[test]
        fn test_missing_operation_fails_every_time() {
            let mut registry = CandidateRegistry::new();
            register_probe(&mut registry, "Home", &["card_body"]);
            let mut proxy = proxy_with(MockDriver::new(), registry);

            for _ in 0..3 {
                match proxy.invoke("accept_and_login", &[]) {
                    Err(HarnessError::CapabilityNotFound { operation }) => {
                        assert_eq!(operation, "accept_and_login");
                    }
                    other => panic!("expected CapabilityNotFound, got {other:?}"),
                }
            }
            assert!(proxy.resolved_operations().is_empty());
        }

        #[test]
        fn test_empty_registry() {
            let mut proxy =
                DispatchProxy::detached(Arc::new(MockDriver::new()), WaitOptions::default());
            assert!(proxy.invoke("anything", &[]).is_err());
        }
    }

    mod strict_policy_tests {
        use super::*;

        #[test]
        fn test_strict_rejects_ambiguity() {
            let mut registry = CandidateRegistry::new();
            register_probe(&mut registry, "Login", &["submit"]);
            register_probe(&mut registry, "Search", &["query"]);
            register_probe(&mut registry, "Signup", &["submit"]);
            let mut proxy =
                proxy_with(MockDriver::new(), registry).with_policy(ResolutionPolicy::Strict);

            match proxy.invoke("submit", &[]) {
                Err(HarnessError::AmbiguousCapability {
                    operation,
                    candidates,
                }) => {
                    assert_eq!(operation, "submit");
                    assert_eq!(candidates, ["Login", "Signup"]);
                }
                other => panic!("expected AmbiguousCapability, got {other:?}"),
            }
            assert!(proxy.resolved_operations().is_empty());
        }

        #[test]
        fn test_strict_accepts_unique_match() {
            let mut registry = CandidateRegistry::new();
            register_probe(&mut registry, "Login", &["submit"]);
            register_probe(&mut registry, "Search", &["query"]);
            let mut proxy =
                proxy_with(MockDriver::new(), registry).with_policy(ResolutionPolicy::Strict);

            assert_eq!(proxy.invoke("query", &[]).unwrap(), Value::from("Search#1"));
        }

        #[test]
        fn test_strict_supports_agrees_with_invoke() {
            let mut registry = CandidateRegistry::new();
            register_probe(&mut registry, "Login", &["submit"]);
            register_probe(&mut registry, "Search", &["query"]);
            register_probe(&mut registry, "Signup", &["submit"]);
            let mut proxy =
                proxy_with(MockDriver::new(), registry).with_policy(ResolutionPolicy::Strict);

            assert!(!proxy.supports("submit"));
            assert!(proxy.invoke("submit", &[]).is_err());
            assert!(proxy.supports("query"));
            assert!(proxy.supports(ops::QUIT));
        }

        #[test]
        fn test_first_match_supports_shared_name() {
            let mut registry = CandidateRegistry::new();
            register_probe(&mut registry, "Login", &["submit"]);
            register_probe(&mut registry, "Signup", &["submit"]);
            let proxy = proxy_with(MockDriver::new(), registry);

            assert!(proxy.supports("submit"));
        }
    }

    mod probing_tests {
        use super::*;

        #[test]
        fn test_supports_does_not_populate_cache() {
            let mut registry = CandidateRegistry::new();
            register_probe(&mut registry, "Home", &["card_body"]);
            let proxy = proxy_with(MockDriver::new(), registry);

            assert!(proxy.supports("card_body"));
            assert!(proxy.supports(ops::QUIT));
            assert!(!proxy.supports("missing"));
            assert!(proxy.resolved_operations().is_empty());
        }

        #[test]
        fn test_execute_script_passes_through() {
            let driver = MockDriver::new().with_script_result(serde_json::json!("done"));
            let mut proxy =
                DispatchProxy::detached(Arc::new(driver), WaitOptions::default());
            let result = proxy
                .execute_script("window.scrollTo(0, document.body.scrollHeight)", &[])
                .unwrap();
            assert_eq!(result, Value::Json(serde_json::json!("done")));
        }

        #[test]
        fn test_debug_lists_resolved() {
            let mut registry = CandidateRegistry::new();
            register_probe(&mut registry, "Home", &["card_body"]);
            let mut proxy = proxy_with(MockDriver::new(), registry);
            let _ = proxy.invoke("card_body", &[]).unwrap();
            let debug = format!("{proxy:?}");
            assert!(debug.contains("card_body"));
            assert!(debug.contains("Home"));
        }
    }

    proptest! {
        #[test]
        fn prop_unknown_names_never_cached(name in "[a-z_]{1,16}") {
            prop_assume!(name != "card_body" && !ops::STANDARD.contains(&name.as_str()));
            let mut registry = CandidateRegistry::new();
            register_probe(&mut registry, "Home", &["card_body"]);
            let mut proxy = proxy_with(MockDriver::new(), registry);

            let is_not_found = matches!(
                proxy.invoke(&name, &[]),
                Err(HarnessError::CapabilityNotFound { .. })
            );
            prop_assert!(is_not_found);
            prop_assert!(proxy.resolved_operations().is_empty());
        }

        #[test]
        fn prop_resolution_is_stable(calls in 1usize..20) {
            let mut registry = CandidateRegistry::new();
            register_probe(&mut registry, "First", &["shared"]);
            register_probe(&mut registry, "Second", &["shared"]);
            let mut proxy = proxy_with(MockDriver::new(), registry);

            for n in 1..=calls {
                let value = proxy.invoke("shared", &[]).unwrap();
                prop_assert_eq!(value, Value::from(format!("First#{n}")));
            }
        }
    }
}
