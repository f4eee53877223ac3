//! Suite settings.
//!
//! Resolution order, later wins:
//!
//! 1. built-in defaults
//! 2. YAML file named by `GROCERYMATE_CONFIG`, else `./grocerymate.yaml` if present
//! 3. `.env` in the working directory (loaded into the process environment)
//! 4. environment variables
//!
//! Credentials are optional. Scenarios that need a login skip when they are
//! missing.

use crate::driver::{Backend, DriverConfig};
use crate::result::{E2eError, E2eResult};
use crate::session::SessionMode;
use crate::wait::{WaitOptions, WaitProfile};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable naming the settings file
pub const CONFIG_ENV: &str = "GROCERYMATE_CONFIG";

/// Settings file picked up from the working directory
pub const DEFAULT_CONFIG_FILE: &str = "grocerymate.yaml";

/// Production storefront
pub const DEFAULT_BASE_URL: &str = "https://grocerymate.masterschool.com";

/// Login credentials for authenticated scenarios
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct Credentials {
    /// Account email
    pub email: String,
    /// Account password
    pub password: String,
}

impl Credentials {
    /// Create credentials
    #[must_use]
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    fn is_complete(&self) -> bool {
        !self.email.trim().is_empty() && !self.password.is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Browser window size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    /// Width in CSS pixels
    pub width: u32,
    /// Height in CSS pixels
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1366,
            height: 820,
        }
    }
}

/// Per-preset wait overrides in milliseconds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaitOverrides {
    /// Element readiness budget
    pub short_ms: Option<u64>,
    /// Toast detection budget
    pub toast_ms: Option<u64>,
    /// Checkout and navigation budget
    pub long_ms: Option<u64>,
    /// Optional-element probe budget
    pub probe_ms: Option<u64>,
    /// Poll interval for the short, toast and long presets
    pub poll_interval_ms: Option<u64>,
}

impl WaitOverrides {
    /// Defaults with these overrides applied
    #[must_use]
    pub fn profile(&self) -> WaitProfile {
        let apply = |base: WaitOptions, timeout: Option<u64>, poll: Option<u64>| {
            let mut opts = base;
            if let Some(ms) = timeout {
                opts = opts.with_timeout(Duration::from_millis(ms));
            }
            if let Some(ms) = poll {
                opts = opts.with_poll_interval(Duration::from_millis(ms));
            }
            opts
        };
        let defaults = WaitProfile::default();
        WaitProfile {
            short: apply(defaults.short, self.short_ms, self.poll_interval_ms),
            toast: apply(defaults.toast, self.toast_ms, self.poll_interval_ms),
            long: apply(defaults.long, self.long_ms, self.poll_interval_ms),
            probe: apply(defaults.probe, self.probe_ms, None),
        }
    }
}

/// Dates of birth fed to the age gate, `DD-MM-YYYY`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DobFixtures {
    /// Passes the gate
    pub adult: String,
    /// Blocked by the gate
    pub underage: String,
    /// Used by the store page to get past the gate
    pub store_pass: String,
}

impl Default for DobFixtures {
    fn default() -> Self {
        Self {
            adult: "08-08-2000".to_string(),
            underage: "08-08-2008".to_string(),
            store_pass: "01-01-1990".to_string(),
        }
    }
}

/// Bounds of the cart-clearing loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CartSettings {
    /// Maximum removal passes
    pub max_passes: u32,
    /// Overall deadline in seconds
    pub deadline_secs: u64,
}

impl Default for CartSettings {
    fn default() -> Self {
        Self {
            max_passes: 25,
            deadline_secs: 60,
        }
    }
}

impl CartSettings {
    /// Deadline as a duration
    #[must_use]
    pub const fn deadline(&self) -> Duration {
        Duration::from_secs(self.deadline_secs)
    }
}

/// Resolved suite settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuiteConfig {
    /// Storefront origin, no trailing slash needed
    pub base_url: String,
    /// Browser backend
    pub backend: Backend,
    /// Run without a visible window
    pub headless: bool,
    /// Browser executable override
    pub chromium_path: Option<PathBuf>,
    /// Window size
    pub viewport: Viewport,
    /// Where failure screenshots go
    pub artifacts_dir: PathBuf,
    /// Budget for a failure screenshot
    pub artifact_timeout_ms: u64,
    /// Display name the test account reviews under
    pub author: String,
    /// Fresh browser per test or one shared browser
    pub session_mode: SessionMode,
    /// Wait preset overrides
    pub waits: WaitOverrides,
    /// YAML file with locator overrides
    pub locators_file: Option<PathBuf>,
    /// Test account
    #[serde(skip_serializing)]
    pub auth: Option<Credentials>,
    /// Age gate dates of birth
    pub fixtures: DobFixtures,
    /// Cart clearing bounds
    pub cart: CartSettings,
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            backend: Backend::default(),
            headless: true,
            chromium_path: None,
            viewport: Viewport::default(),
            artifacts_dir: PathBuf::from("test-results"),
            artifact_timeout_ms: 5000,
            author: "AutoTestG".to_string(),
            session_mode: SessionMode::default(),
            waits: WaitOverrides::default(),
            locators_file: None,
            auth: None,
            fixtures: DobFixtures::default(),
            cart: CartSettings::default(),
        }
    }
}

fn parse_flag(raw: &str) -> bool {
    !matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "0" | "false" | "no" | "off"
    )
}

impl SuiteConfig {
    /// Resolve settings from files and the environment
    pub fn load() -> E2eResult<Self> {
        Self::load_from(None)
    }

    /// Like [`SuiteConfig::load`], with `file` taking precedence over
    /// `GROCERYMATE_CONFIG`
    pub fn load_from(file: Option<&Path>) -> E2eResult<Self> {
        match dotenvy::dotenv() {
            Ok(path) => tracing::debug!(path = %path.display(), "Loaded .env"),
            Err(e) if e.not_found() => {}
            Err(e) => tracing::warn!(error = %e, "Ignoring unreadable .env"),
        }

        let file = file
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from))
            .or_else(|| {
                let local = PathBuf::from(DEFAULT_CONFIG_FILE);
                local.exists().then_some(local)
            });

        let mut config = match file {
            Some(path) => Self::from_yaml_file(&path)?,
            None => Self::default(),
        };
        config.apply_env_with(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse settings from YAML
    pub fn from_yaml_str(yaml: &str) -> E2eResult<Self> {
        Ok(serde_yaml_ng::from_str(yaml)?)
    }

    /// Read settings from a YAML file
    pub fn from_yaml_file(path: &Path) -> E2eResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            E2eError::config(format!("cannot read {}: {e}", path.display()))
        })?;
        let config = Self::from_yaml_str(&raw)?;
        tracing::info!(path = %path.display(), "Loaded suite settings");
        Ok(config)
    }

    /// Overlay environment variables read through `lookup`
    pub fn apply_env_with<F>(&mut self, lookup: F) -> E2eResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("GROCERYMATE_BASE_URL") {
            self.base_url = url;
        }
        if let Some(backend) = lookup("GROCERYMATE_BACKEND") {
            self.backend = backend.parse()?;
        }
        if let Some(headless) = lookup("HEADLESS") {
            self.headless = parse_flag(&headless);
        }
        if let Some(path) = lookup("CHROMIUM_PATH") {
            self.chromium_path = Some(PathBuf::from(path));
        }
        if let Some(dir) = lookup("GROCERYMATE_ARTIFACTS") {
            self.artifacts_dir = PathBuf::from(dir);
        }

        let email = lookup("USER_EMAIL");
        let password = lookup("USER_PASSWORD");
        if email.is_some() || password.is_some() {
            let current = self.auth.take();
            let (old_email, old_password) = current
                .map(|c| (c.email, c.password))
                .unwrap_or_default();
            self.auth = Some(Credentials::new(
                email.unwrap_or(old_email),
                password.unwrap_or(old_password),
            ));
        }
        Ok(())
    }

    /// Reject settings no scenario could run with
    pub fn validate(&self) -> E2eResult<()> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(E2eError::config(format!(
                "base_url must be an http(s) URL, got {:?}",
                self.base_url
            )));
        }
        if self.viewport.width == 0 || self.viewport.height == 0 {
            return Err(E2eError::config("viewport must be non-empty"));
        }
        if self.artifact_timeout_ms == 0 {
            return Err(E2eError::config("artifact_timeout_ms must be positive"));
        }
        if self.cart.max_passes == 0 || self.cart.deadline_secs == 0 {
            return Err(E2eError::config("cart bounds must be positive"));
        }
        Ok(())
    }

    /// Credentials when both email and password are set
    #[must_use]
    pub fn credentials(&self) -> Option<&Credentials> {
        self.auth.as_ref().filter(|c| c.is_complete())
    }

    /// Absolute URL for an app path
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        if path.is_empty() {
            format!("{base}/")
        } else if path.starts_with('/') {
            format!("{base}{path}")
        } else {
            format!("{base}/{path}")
        }
    }

    /// Launch settings for the browser backend
    #[must_use]
    pub fn driver_config(&self) -> DriverConfig {
        let mut config = DriverConfig::new()
            .headless(self.headless)
            .viewport(self.viewport.width, self.viewport.height);
        if let Some(ref path) = self.chromium_path {
            config = config.executable(path.clone());
        }
        config
    }

    /// Wait presets after overrides
    #[must_use]
    pub fn wait_profile(&self) -> WaitProfile {
        self.waits.profile()
    }

    /// Budget for a failure screenshot
    #[must_use]
    pub const fn artifact_timeout(&self) -> Duration {
        Duration::from_millis(self.artifact_timeout_ms)
    }

    /// Set base URL
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set backend
    #[must_use]
    pub const fn with_backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }

    /// Set credentials
    #[must_use]
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.auth = Some(credentials);
        self
    }

    /// Set the artifacts directory
    #[must_use]
    pub fn with_artifacts_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.artifacts_dir = dir.into();
        self
    }

    /// Set the session mode
    #[must_use]
    pub const fn with_session_mode(mut self, mode: SessionMode) -> Self {
        self.session_mode = mode;
        self
    }

    /// Set wait overrides
    #[must_use]
    pub const fn with_waits(mut self, waits: WaitOverrides) -> Self {
        self.waits = waits;
        self
    }
}
