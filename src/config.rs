use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Configuration for the browser state probe
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserProbeConfig {
    /// URL of the page to probe
    pub target_url: String,

    /// URL for the WebDriver instance
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,

    /// Username for the scripted login interaction (optional)
    #[serde(default)]
    pub username: Option<String>,

    /// Password for the scripted login interaction (optional)
    #[serde(default)]
    pub password: Option<String>,

    /// Viewport width applied when the session is opened
    #[serde(default = "default_viewport_width")]
    pub viewport_width: u32,

    /// Viewport height applied when the session is opened
    #[serde(default = "default_viewport_height")]
    pub viewport_height: u32,

    /// CSS selector for an explicit readiness marker; when set, the probe
    /// waits for this element instead of guessing with a fixed delay
    #[serde(default)]
    pub ready_selector: Option<String>,

    /// Extra settle delay in milliseconds, used only when no readiness
    /// marker is configured (tolerates client-side rendering that keeps
    /// mutating the DOM after network activity stops)
    #[serde(default = "default_settle_grace_ms")]
    pub settle_grace_ms: u64,

    /// Maximum time to wait for the page to settle, in seconds
    #[serde(default = "default_settle_timeout_secs")]
    pub settle_timeout_secs: u64,

    /// Maximum time for a single navigation, in seconds
    #[serde(default = "default_navigation_timeout_secs")]
    pub navigation_timeout_secs: u64,

    /// Maximum time for any other single WebDriver command, in seconds.
    /// Bounds every round-trip to the browser so a stalled server cannot
    /// hang the probe.
    #[serde(default = "default_command_timeout_secs")]
    pub command_timeout_secs: u64,

    /// CSS selector for the client-rendering mount point; an empty mount
    /// is classified as a triggered error boundary
    #[serde(default = "default_root_mount_selector")]
    pub root_mount_selector: String,

    /// Directory where screenshots are written
    #[serde(default = "default_artifact_dir")]
    pub artifact_dir: String,

    /// When set, screenshots reuse this fixed file stem on every run.
    /// Last writer wins; concurrent runs clobber each other's artifacts.
    #[serde(default)]
    pub fixed_artifact_name: Option<String>,

    /// CSS selectors summarized in each snapshot
    #[serde(default = "default_snapshot_selectors")]
    pub snapshot_selectors: Vec<String>,
}

/// Configuration for the data existence probe
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataProbeConfig {
    /// Base URL of the hosted table store
    pub endpoint: String,

    /// Access key for the hosted table store. Injected from configuration
    /// or the environment, never a source literal.
    pub api_key: String,

    /// Row limit for the primary sample query; statistics describe only
    /// this sampled page, not the full table
    #[serde(default = "default_sample_limit")]
    pub sample_limit: usize,

    /// Per-request timeout, in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

/// Enum containing all probe configuration types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ProbeConfigType {
    /// Browser state probe configuration
    Browser(BrowserProbeConfig),

    /// Data existence probe configuration
    Data(DataProbeConfig),
}

impl ProbeConfigType {
    /// Load configuration from a file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn Error>> {
        let mut file = File::open(path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;

        let config: Self = serde_json::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from a JSON string
    pub fn from_json(json: &str) -> Result<Self, Box<dyn Error>> {
        let config: Self = serde_json::from_str(json)?;
        Ok(config)
    }
}

/// Default value for webdriver_url
fn default_webdriver_url() -> String {
    "http://localhost:4444".to_string()
}

/// Default viewport width
fn default_viewport_width() -> u32 {
    1280
}

/// Default viewport height
fn default_viewport_height() -> u32 {
    800
}

/// Default extra settle delay when no readiness marker is configured
fn default_settle_grace_ms() -> u64 {
    1500
}

/// Default settle timeout
fn default_settle_timeout_secs() -> u64 {
    20
}

/// Default navigation timeout
fn default_navigation_timeout_secs() -> u64 {
    30
}

/// Default per-command WebDriver timeout
fn default_command_timeout_secs() -> u64 {
    15
}

/// Default client-rendering mount selector
fn default_root_mount_selector() -> String {
    "#root".to_string()
}

/// Default artifact directory
fn default_artifact_dir() -> String {
    "artifacts".to_string()
}

/// Default selectors summarized in snapshots
fn default_snapshot_selectors() -> Vec<String> {
    vec![
        "form".to_string(),
        "input".to_string(),
        "button".to_string(),
        "[role='alert']".to_string(),
    ]
}

/// Default row limit for the primary sample query
fn default_sample_limit() -> usize {
    10
}

/// Default per-request timeout for store queries
fn default_request_timeout_secs() -> u64 {
    15
}

impl BrowserProbeConfig {
    /// Create a new configuration with default values
    pub fn new(target_url: &str) -> Self {
        Self {
            target_url: target_url.to_string(),
            webdriver_url: default_webdriver_url(),
            username: None,
            password: None,
            viewport_width: default_viewport_width(),
            viewport_height: default_viewport_height(),
            ready_selector: None,
            settle_grace_ms: default_settle_grace_ms(),
            settle_timeout_secs: default_settle_timeout_secs(),
            navigation_timeout_secs: default_navigation_timeout_secs(),
            command_timeout_secs: default_command_timeout_secs(),
            root_mount_selector: default_root_mount_selector(),
            artifact_dir: default_artifact_dir(),
            fixed_artifact_name: None,
            snapshot_selectors: default_snapshot_selectors(),
        }
    }
}

impl DataProbeConfig {
    /// Create a new configuration for the given endpoint and key
    pub fn new(endpoint: &str, api_key: &str) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            api_key: api_key.to_string(),
            sample_limit: default_sample_limit(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}
