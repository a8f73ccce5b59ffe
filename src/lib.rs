// Re-export modules
pub mod artifacts;
pub mod config;
pub mod matchers;
pub mod outcome;
pub mod probes;
pub mod session;
pub mod snapshot;
pub mod stats;

// Re-export commonly used types for convenience
pub use outcome::{BrowserProbeReport, ProbeOutcome};
pub use probes::ProbeError;
pub use probes::data::DataProbeReport;
pub use snapshot::Snapshot;

use config::{BrowserProbeConfig, DataProbeConfig, ProbeConfigType};

/// The kinds of diagnostic probe this crate can run
#[derive(Debug, Clone)]
pub enum ProbeTarget {
    /// Browser state probe against a page URL
    Browser(String),
    /// Data existence probe against the hosted table store
    Data,
}

/// Report produced by a probe run
#[derive(Debug)]
pub enum ProbeRunReport {
    Browser(BrowserProbeReport),
    Data(DataProbeReport),
}

impl ProbeRunReport {
    /// Render the report to the console
    pub fn print(&self) {
        match self {
            ProbeRunReport::Browser(report) => report.print(),
            ProbeRunReport::Data(report) => report.print(),
        }
    }
}

/// Builder for configuring and running a probe
pub struct Probe {
    target: ProbeTarget,
    config: Option<ProbeConfigType>,
    username: Option<String>,
    password: Option<String>,
}

impl Probe {
    /// Create a new Probe builder for the given target
    pub fn new(target: ProbeTarget) -> Self {
        Self {
            target,
            config: None,
            username: None,
            password: None,
        }
    }

    /// Apply a configuration
    pub fn with_config(mut self, config: ProbeConfigType) -> Self {
        self.config = Some(config);
        self
    }

    /// Load configuration from a JSON file
    pub fn with_config_file(
        mut self,
        path: impl AsRef<std::path::Path>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        self.config = Some(ProbeConfigType::from_file(path)?);
        Ok(self)
    }

    /// Apply configuration from a JSON string
    pub fn with_config_str(mut self, json: &str) -> Result<Self, Box<dyn std::error::Error>> {
        self.config = Some(ProbeConfigType::from_json(json)?);
        Ok(self)
    }

    /// Provide a credential pair for the scripted login interaction
    pub fn with_credentials(mut self, username: &str, password: &str) -> Self {
        self.username = Some(username.to_string());
        self.password = Some(password.to_string());
        self
    }

    /// Run the probe and collect its report
    pub async fn run(self) -> Result<ProbeRunReport, Box<dyn std::error::Error>> {
        match self.target {
            ProbeTarget::Browser(ref url) => {
                let mut config =
                    resolve_browser_config(url, self.config, self.username, self.password)?;

                // Override the WebDriver URL with an environment variable if provided
                if let Ok(webdriver_url) = std::env::var("PROBE_WEBDRIVER_URL") {
                    if !webdriver_url.is_empty() {
                        config.webdriver_url = webdriver_url;
                    }
                }

                let report = probes::browser::run(&config).await?;
                Ok(ProbeRunReport::Browser(report))
            }
            ProbeTarget::Data => {
                let config = match self.config {
                    Some(ProbeConfigType::Data(cfg)) => cfg,
                    Some(ProbeConfigType::Browser(_)) => {
                        return Err("browser probe configuration given for a data target".into());
                    }
                    None => data_config_from_env()?,
                };

                let report = probes::data::run(&config).await?;
                Ok(ProbeRunReport::Data(report))
            }
        }
    }
}

/// Resolves the effective browser configuration for a target URL. The
/// builder's target always wins over whatever URL the configuration
/// carries, so the two agree on what is being probed.
fn resolve_browser_config(
    url: &str,
    config: Option<ProbeConfigType>,
    username: Option<String>,
    password: Option<String>,
) -> Result<BrowserProbeConfig, Box<dyn std::error::Error>> {
    let mut config = match config {
        Some(ProbeConfigType::Browser(cfg)) => cfg,
        Some(ProbeConfigType::Data(_)) => {
            return Err("data probe configuration given for a browser target".into());
        }
        None => BrowserProbeConfig::new(url),
    };
    config.target_url = url.to_string();

    if username.is_some() {
        config.username = username;
    }
    if password.is_some() {
        config.password = password;
    }

    Ok(config)
}

/// Builds a data probe configuration from the environment. The endpoint
/// and access key are deployment secrets and are never compiled in.
fn data_config_from_env() -> Result<DataProbeConfig, ProbeError> {
    let endpoint = std::env::var("PROBE_STORE_ENDPOINT").unwrap_or_default();
    let api_key = std::env::var("PROBE_STORE_KEY").unwrap_or_default();

    if endpoint.is_empty() || api_key.is_empty() {
        return Err(ProbeError::Config(
            "set PROBE_STORE_ENDPOINT and PROBE_STORE_KEY, or pass --endpoint/--api-key"
                .to_string(),
        ));
    }

    Ok(DataProbeConfig::new(&endpoint, &api_key))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_target_url_overrides_config_url() {
        let file_cfg = BrowserProbeConfig::new("http://localhost:5173/stale");
        let config = resolve_browser_config(
            "http://localhost:5173/login",
            Some(ProbeConfigType::Browser(file_cfg)),
            None,
            None,
        )
        .unwrap();
        assert_eq!(config.target_url, "http://localhost:5173/login");
    }

    #[test]
    fn test_builder_credentials_override_config() {
        let mut file_cfg = BrowserProbeConfig::new("http://localhost:5173/login");
        file_cfg.username = Some("stale@example.com".to_string());

        let config = resolve_browser_config(
            "http://localhost:5173/login",
            Some(ProbeConfigType::Browser(file_cfg)),
            Some("admin@example.com".to_string()),
            Some("hunter2".to_string()),
        )
        .unwrap();
        assert_eq!(config.username.as_deref(), Some("admin@example.com"));
        assert_eq!(config.password.as_deref(), Some("hunter2"));
    }

    #[test]
    fn test_mismatched_config_kind_is_rejected() {
        let data_cfg = crate::config::DataProbeConfig::new("https://store.example.com", "k");
        let err = resolve_browser_config(
            "http://localhost:5173/login",
            Some(ProbeConfigType::Data(data_cfg)),
            None,
            None,
        )
        .unwrap_err();
        assert!(err.to_string().contains("data probe configuration"));
    }
}
