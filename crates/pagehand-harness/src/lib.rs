//! Pagehand Harness: scenario lifecycle around the dispatch proxy
//!
//! The harness is the only layer that reads the environment. It turns it
//! into a [`HarnessConfig`], starts one [`Scenario`] per test with a fresh
//! proxy, and at the end captures a screenshot and ends the driver session.
//!
//! # Example
//!
//! ```ignore
//! use pagehand_harness::{logging, HarnessConfig, Scenario, ScenarioOutcome};
//!
//! logging::init(logging::Verbosity::Normal, logging::LogFormat::Text);
//! let config = HarnessConfig::from_env();
//! let request = config.driver_request("I am on the home page");
//! let driver = connect(&request)?; // any `pagehand::Driver`
//!
//! let mut scenario = Scenario::start("I am on the home page", driver, registry(), &config);
//! let url = config.app_url("app1")?;
//! scenario.proxy().invoke("getting_started_button", &[])?;
//! let report = scenario.finish(ScenarioOutcome::Passed);
//! ```

#![warn(missing_docs)]

#[allow(clippy::missing_errors_doc)]
pub mod config;
pub mod logging;
#[allow(clippy::missing_errors_doc)]
pub mod scenario;

pub use config::{
    BrowserKind, BuildInfo, Capabilities, Credentials, DriverRequest, DriverTarget,
    GridCredentials, GridOptions, HarnessConfig, ProxySettings, UserDirectory,
};
pub use logging::{LogFormat, Verbosity};
pub use scenario::{Scenario, ScenarioOutcome, ScenarioReport};
