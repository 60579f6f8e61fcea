//! Harness configuration
//!
//! A plain value object built once per run, either from the process
//! environment or from an injected lookup in tests. Nothing below the
//! harness reads the environment.

use pagehand::{HarnessError, HarnessResult, ResolutionPolicy, WaitOptions};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use tracing::debug;
use url::Url;

/// Environment used when `ENVIRONMENT` is unset
pub const DEFAULT_ENVIRONMENT: &str = "local";

/// Browser used when `BROWSER` is unset
pub const DEFAULT_BROWSER: &str = "chrome";

/// Platform used when `PLATFORM` is unset
pub const DEFAULT_PLATFORM: &str = "any";

/// Directory for screenshots and scenario reports
pub const DEFAULT_REPORTS_DIR: &str = "reports";

/// Host fragment identifying the hosted browser grid
pub const GRID_HOST: &str = "saucelabs.com";

// =============================================================================
// BROWSER
// =============================================================================

/// Browser family requested from the driver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BrowserKind {
    /// Google Chrome
    #[default]
    #[serde(rename = "chrome")]
    Chrome,
    /// Mozilla Firefox
    #[serde(rename = "firefox")]
    Firefox,
    /// Microsoft Edge
    #[serde(rename = "MicrosoftEdge")]
    Edge,
    /// Apple Safari
    #[serde(rename = "safari")]
    Safari,
    /// Internet Explorer
    #[serde(rename = "internet explorer")]
    InternetExplorer,
}

impl BrowserKind {
    /// Parse a browser name, case-insensitively. Unknown names fall back to
    /// Chrome.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "chrome" => Self::Chrome,
            "firefox" => Self::Firefox,
            "edge" => Self::Edge,
            "safari" => Self::Safari,
            "ie" => Self::InternetExplorer,
            other => {
                debug!(browser = other, "unknown browser, using chrome");
                Self::Chrome
            }
        }
    }

    /// Short lowercase name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Chrome => "chrome",
            Self::Firefox => "firefox",
            Self::Edge => "edge",
            Self::Safari => "safari",
            Self::InternetExplorer => "ie",
        }
    }

    /// Whether sessions for this browser accept self-signed certificates
    #[must_use]
    pub const fn accepts_insecure_certs(self) -> bool {
        !matches!(self, Self::Safari | Self::InternetExplorer)
    }
}

impl fmt::Display for BrowserKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// CAPABILITIES
// =============================================================================

/// Manual HTTP/SSL proxy settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxySettings {
    /// Always `manual`
    pub proxy_type: String,
    /// HTTP proxy address
    pub http_proxy: String,
    /// SSL proxy address
    pub ssl_proxy: String,
}

impl ProxySettings {
    /// Same address for HTTP and SSL
    #[must_use]
    pub fn manual(address: impl Into<String>) -> Self {
        let address = address.into();
        Self {
            proxy_type: "manual".to_string(),
            http_proxy: address.clone(),
            ssl_proxy: address,
        }
    }
}

/// Vendor options sent to the hosted grid
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridOptions {
    /// Scenario name
    pub name: String,
    /// Build label
    pub build: Option<String>,
    /// Screen resolution, e.g. `800x600`
    pub screen_resolution: Option<String>,
}

/// Session capabilities requested from the driver
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Capabilities {
    /// Browser family
    pub browser_name: BrowserKind,
    /// Accept self-signed certificates
    pub accept_insecure_certs: bool,
    /// Requested browser version
    pub browser_version: Option<String>,
    /// Requested platform
    pub platform_name: String,
    /// Proxy settings
    pub proxy: Option<ProxySettings>,
    /// Grid vendor options
    #[serde(rename = "sauce:options")]
    pub grid_options: GridOptions,
}

/// Where the driver session runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "browser")]
pub enum DriverTarget {
    /// A browser on this machine
    Local(BrowserKind),
    /// A remote WebDriver endpoint
    Remote,
}

/// Everything needed to open a driver session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverRequest {
    /// Local browser or remote endpoint
    pub target: DriverTarget,
    /// Remote endpoint URL
    pub url: Option<String>,
    /// Requested capabilities
    pub capabilities: Capabilities,
}

// =============================================================================
// CREDENTIALS
// =============================================================================

/// Username and password pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// Username
    pub username: String,
    /// Password
    pub password: String,
}

impl Credentials {
    /// Create a credential pair
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

/// Grid account, either half of which may be missing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GridCredentials {
    /// Account name
    pub username: Option<String>,
    /// Access key
    pub password: Option<String>,
}

/// Test users by role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDirectory {
    users: BTreeMap<String, Credentials>,
}

impl Default for UserDirectory {
    fn default() -> Self {
        Self::empty()
            .with_user("applicant", Credentials::new("applicant", "password"))
            .with_user("supervisor", Credentials::new("supervisor", "password"))
            .with_user("nonexistent", Credentials::new("baduser", "password"))
    }
}

impl UserDirectory {
    /// Directory with no users
    #[must_use]
    pub fn empty() -> Self {
        Self {
            users: BTreeMap::new(),
        }
    }

    /// Add or replace a role
    #[must_use]
    pub fn with_user(mut self, role: &str, credentials: Credentials) -> Self {
        let _ = self.users.insert(role.to_lowercase(), credentials);
        self
    }

    /// Credentials for `role`, case-insensitively
    pub fn lookup(&self, role: &str) -> HarnessResult<&Credentials> {
        self.users
            .get(&role.to_lowercase())
            .ok_or_else(|| HarnessError::config("No such user"))
    }
}

// =============================================================================
// HARNESS CONFIG
// =============================================================================

/// CI build information
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildInfo {
    /// CI job URL; the build label is only produced when this is set
    pub url: Option<String>,
    /// Branch being built
    pub branch_name: Option<String>,
    /// Build number
    pub number: Option<String>,
    /// Kind of test run, e.g. `Compatibility Test`
    pub test_type: Option<String>,
}

/// Harness configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Target environment, `local` or a deployed stage
    pub environment: String,
    /// Browser name
    pub browser: String,
    /// Remote WebDriver URL
    pub remote: Option<String>,
    /// HTTP/SSL proxy address
    pub proxy: Option<String>,
    /// Platform name
    pub platform: String,
    /// Browser version
    pub browser_version: Option<String>,
    /// CI build information
    pub build: BuildInfo,
    /// Screen resolution for grid sessions
    pub resolution: Option<String>,
    /// Explicit grid account name
    pub grid_username: Option<String>,
    /// Explicit grid access key
    pub grid_password: Option<String>,
    /// Local port per application, used when the environment is `local`
    pub local_ports: BTreeMap<String, u16>,
    /// Directory for screenshots and reports
    pub reports_dir: PathBuf,
    /// Wait options for every scenario proxy
    pub wait: WaitOptions,
    /// Resolution policy for every scenario proxy
    pub policy: ResolutionPolicy,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            environment: DEFAULT_ENVIRONMENT.to_string(),
            browser: DEFAULT_BROWSER.to_string(),
            remote: None,
            proxy: None,
            platform: DEFAULT_PLATFORM.to_string(),
            browser_version: None,
            build: BuildInfo::default(),
            resolution: None,
            grid_username: None,
            grid_password: None,
            local_ports: BTreeMap::from([("app1".to_string(), 8000), ("app2".to_string(), 8001)]),
            reports_dir: PathBuf::from(DEFAULT_REPORTS_DIR),
            wait: WaitOptions::default(),
            policy: ResolutionPolicy::default(),
        }
    }
}

impl HarnessConfig {
    /// Create new default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read configuration from the process environment
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through `lookup`. Empty values count as unset.
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());
        let defaults = Self::default();
        Self {
            environment: get("ENVIRONMENT").unwrap_or(defaults.environment),
            browser: get("BROWSER").unwrap_or(defaults.browser),
            remote: get("REMOTE"),
            proxy: get("PROXY"),
            platform: get("PLATFORM").unwrap_or(defaults.platform),
            browser_version: get("VERSION"),
            build: BuildInfo {
                url: get("BUILD_URL"),
                branch_name: get("BRANCH_NAME"),
                number: get("BUILD_NUMBER"),
                test_type: get("TEST_TYPE"),
            },
            resolution: get("RESOLUTION"),
            grid_username: get("SAUCE_USERNAME"),
            grid_password: get("SAUCE_PASSWORD"),
            ..defaults
        }
    }

    /// Set the environment
    #[must_use]
    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = environment.into();
        self
    }

    /// Set the browser
    #[must_use]
    pub fn with_browser(mut self, browser: impl Into<String>) -> Self {
        self.browser = browser.into();
        self
    }

    /// Set the remote WebDriver URL
    #[must_use]
    pub fn with_remote(mut self, remote: impl Into<String>) -> Self {
        self.remote = Some(remote.into());
        self
    }

    /// Set the reports directory
    #[must_use]
    pub fn with_reports_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.reports_dir = dir.into();
        self
    }

    /// Set wait options
    #[must_use]
    pub fn with_wait(mut self, wait: WaitOptions) -> Self {
        self.wait = wait;
        self
    }

    /// Set the resolution policy
    #[must_use]
    pub const fn with_policy(mut self, policy: ResolutionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Base URL of `app` in the configured environment
    pub fn app_url(&self, app: &str) -> HarnessResult<String> {
        let environment = self.environment.to_lowercase();
        if environment == DEFAULT_ENVIRONMENT {
            return self
                .local_ports
                .get(&app.to_lowercase())
                .map(|port| format!("http://localhost:{port}"))
                .ok_or_else(|| {
                    HarnessError::config(format!("No local port found for application: {app}"))
                });
        }
        Ok(format!("https://{app}-{environment}.mysite.net"))
    }

    /// Grid build label, present only for CI runs
    #[must_use]
    pub fn build_label(&self) -> Option<String> {
        self.build.url.as_ref()?;
        Some(format!(
            "{} for {} Build {}",
            self.build.test_type.as_deref().unwrap_or_default(),
            self.build.branch_name.as_deref().unwrap_or_default(),
            self.build.number.as_deref().unwrap_or_default(),
        ))
    }

    /// Configured browser family
    #[must_use]
    pub fn browser_kind(&self) -> BrowserKind {
        BrowserKind::from_name(&self.browser)
    }

    /// Session capabilities for a scenario
    #[must_use]
    pub fn capabilities(&self, scenario_name: &str) -> Capabilities {
        let browser = self.browser_kind();
        Capabilities {
            browser_name: browser,
            accept_insecure_certs: browser.accepts_insecure_certs(),
            browser_version: self.browser_version.clone(),
            platform_name: self.platform.clone(),
            proxy: self.proxy.as_deref().map(ProxySettings::manual),
            grid_options: GridOptions {
                name: scenario_name.to_string(),
                build: self.build_label(),
                screen_resolution: self.resolution.clone(),
            },
        }
    }

    /// Driver session request for a scenario
    #[must_use]
    pub fn driver_request(&self, scenario_name: &str) -> DriverRequest {
        let capabilities = self.capabilities(scenario_name);
        let target = match self.remote {
            Some(_) => DriverTarget::Remote,
            None => DriverTarget::Local(capabilities.browser_name),
        };
        DriverRequest {
            target,
            url: self.remote.clone(),
            capabilities,
        }
    }

    /// Whether the remote endpoint is the hosted grid; `None` without a
    /// remote
    #[must_use]
    pub fn is_grid(&self) -> Option<bool> {
        self.remote.as_deref().map(|remote| remote.contains(GRID_HOST))
    }

    /// Grid account: explicit settings first, then the remote URL's userinfo
    pub fn grid_credentials(&self) -> HarnessResult<GridCredentials> {
        let from_url = match self.remote.as_deref() {
            Some(remote) => {
                let url = Url::parse(remote).map_err(|e| {
                    HarnessError::config(format!("Invalid remote URL {remote}: {e}"))
                })?;
                GridCredentials {
                    username: Some(url.username())
                        .filter(|u| !u.is_empty())
                        .map(str::to_string),
                    password: url.password().map(str::to_string),
                }
            }
            None => GridCredentials::default(),
        };

        Ok(GridCredentials {
            username: self.grid_username.clone().or(from_url.username),
            password: self.grid_password.clone().or(from_url.password),
        })
    }
}
