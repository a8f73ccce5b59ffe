use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "probe")]
#[command(about = "Diagnostic probes for the admin dashboard and its hosted data store")]
#[command(version)]
pub struct Args {
    /// Path to a JSON probe configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Probe a page's state through an automated browser session
    Browser {
        /// URL of the page to probe
        url: String,

        /// Username for the scripted login interaction
        #[arg(long, env = "PROBE_USERNAME")]
        username: Option<String>,

        /// Password for the scripted login interaction
        #[arg(long, env = "PROBE_PASSWORD", hide_env_values = true)]
        password: Option<String>,

        /// CSS selector the page shows once it is genuinely ready;
        /// replaces the fixed-delay settle heuristic
        #[arg(long)]
        ready_selector: Option<String>,

        /// Directory screenshots are written into
        #[arg(long)]
        artifact_dir: Option<String>,

        /// WebDriver server URL
        #[arg(long, env = "PROBE_WEBDRIVER_URL")]
        webdriver_url: Option<String>,
    },

    /// Run the read-only query battery against the hosted table store
    Data {
        /// Base URL of the hosted table store
        #[arg(long, env = "PROBE_STORE_ENDPOINT")]
        endpoint: Option<String>,

        /// Access key for the hosted table store
        #[arg(long, env = "PROBE_STORE_KEY", hide_env_values = true)]
        api_key: Option<String>,

        /// Row limit for the primary sample query (defaults to 10 when
        /// neither this flag nor a config file sets it)
        #[arg(long)]
        limit: Option<usize>,
    },
}
