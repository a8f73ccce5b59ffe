use clap::Parser;
use state_probe::config::{BrowserProbeConfig, DataProbeConfig, ProbeConfigType};
use state_probe::{Probe, ProbeTarget};

mod args;
use args::{Args, Command};

#[tokio::main]
async fn main() {
    // Initialize logging
    env_logger::init();

    // Parse command-line arguments
    let args = Args::parse();

    // Every entry point maps success to exit 0 and any failure to exit 1.
    match run(args).await {
        Ok(()) => {}
        Err(e) => {
            ::log::error!("Probe failed: {}", e);
            std::process::exit(1);
        }
    }
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let file_config = match &args.config {
        Some(path) => Some(ProbeConfigType::from_file(path)?),
        None => None,
    };

    let (target, config) = match args.command {
        Command::Browser {
            url,
            username,
            password,
            ready_selector,
            artifact_dir,
            webdriver_url,
        } => {
            println!("Note: the browser probe requires a WebDriver server (e.g. chromedriver).");
            println!(
                "Set PROBE_WEBDRIVER_URL or --webdriver-url if not using the default http://localhost:4444"
            );

            let config = resolve_browser_command(
                file_config,
                &url,
                username,
                password,
                ready_selector,
                artifact_dir,
                webdriver_url,
            )?;
            (
                ProbeTarget::Browser(url),
                ProbeConfigType::Browser(config),
            )
        }
        Command::Data {
            endpoint,
            api_key,
            limit,
        } => {
            let config = resolve_data_command(file_config, endpoint, api_key, limit)?;
            (ProbeTarget::Data, ProbeConfigType::Data(config))
        }
    };

    let start_time = std::time::Instant::now();
    ::log::info!("Starting probe");

    let report = Probe::new(target).with_config(config).run().await?;
    report.print();

    ::log::info!(
        "Probe complete in {:.2} seconds",
        start_time.elapsed().as_secs_f64()
    );
    Ok(())
}

/// Merges the browser config file with command-line flags; flags override
/// the file only when actually given
fn resolve_browser_command(
    file_config: Option<ProbeConfigType>,
    url: &str,
    username: Option<String>,
    password: Option<String>,
    ready_selector: Option<String>,
    artifact_dir: Option<String>,
    webdriver_url: Option<String>,
) -> Result<BrowserProbeConfig, Box<dyn std::error::Error>> {
    let mut config = match file_config {
        Some(ProbeConfigType::Browser(cfg)) => cfg,
        Some(ProbeConfigType::Data(_)) => {
            return Err("config file holds a data probe configuration".into());
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
    if ready_selector.is_some() {
        config.ready_selector = ready_selector;
    }
    if let Some(dir) = artifact_dir {
        config.artifact_dir = dir;
    }
    if let Some(wd) = webdriver_url {
        config.webdriver_url = wd;
    }

    Ok(config)
}

/// Merges the data config file with command-line flags; flags override
/// the file only when actually given
fn resolve_data_command(
    file_config: Option<ProbeConfigType>,
    endpoint: Option<String>,
    api_key: Option<String>,
    limit: Option<usize>,
) -> Result<DataProbeConfig, Box<dyn std::error::Error>> {
    let mut config = match file_config {
        Some(ProbeConfigType::Data(cfg)) => cfg,
        Some(ProbeConfigType::Browser(_)) => {
            return Err("config file holds a browser probe configuration".into());
        }
        None => DataProbeConfig::new(
            endpoint.as_deref().unwrap_or_default(),
            api_key.as_deref().unwrap_or_default(),
        ),
    };

    if let Some(endpoint) = endpoint {
        config.endpoint = endpoint;
    }
    if let Some(api_key) = api_key {
        config.api_key = api_key;
    }
    if let Some(limit) = limit {
        config.sample_limit = limit;
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data_file_config(sample_limit: usize) -> ProbeConfigType {
        let mut cfg = DataProbeConfig::new("https://store.example.com", "file-key");
        cfg.sample_limit = sample_limit;
        ProbeConfigType::Data(cfg)
    }

    #[test]
    fn test_absent_limit_flag_parses_as_none() {
        let args = Args::try_parse_from(["probe", "data"]).unwrap();
        match args.command {
            Command::Data { limit, .. } => assert_eq!(limit, None),
            _ => panic!("expected data command"),
        }
    }

    #[test]
    fn test_config_file_sample_limit_survives_without_flag() {
        let config = resolve_data_command(Some(data_file_config(50)), None, None, None).unwrap();
        assert_eq!(config.sample_limit, 50);
        assert_eq!(config.api_key, "file-key");
    }

    #[test]
    fn test_limit_flag_overrides_config_file() {
        let config =
            resolve_data_command(Some(data_file_config(50)), None, None, Some(5)).unwrap();
        assert_eq!(config.sample_limit, 5);
    }

    #[test]
    fn test_limit_defaults_without_file_or_flag() {
        let config = resolve_data_command(
            None,
            Some("https://store.example.com".to_string()),
            Some("k".to_string()),
            None,
        )
        .unwrap();
        assert_eq!(config.sample_limit, 10);
    }

    #[test]
    fn test_positional_url_overrides_config_file_target() {
        let mut file_cfg = BrowserProbeConfig::new("http://localhost:5173/old");
        file_cfg.ready_selector = Some("[data-app-ready]".to_string());

        let config = resolve_browser_command(
            Some(ProbeConfigType::Browser(file_cfg)),
            "http://localhost:5173/login",
            None,
            None,
            None,
            None,
            None,
        )
        .unwrap();

        assert_eq!(config.target_url, "http://localhost:5173/login");
        assert_eq!(config.ready_selector.as_deref(), Some("[data-app-ready]"));
    }

    #[test]
    fn test_mismatched_config_kind_is_rejected() {
        let err = resolve_data_command(
            Some(ProbeConfigType::Browser(BrowserProbeConfig::new(
                "http://localhost:5173/login",
            ))),
            None,
            None,
            None,
        )
        .unwrap_err();
        assert!(err.to_string().contains("browser probe configuration"));
    }
}
