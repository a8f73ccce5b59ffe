use crate::probes::ProbeError;
use crate::snapshot::{ConsoleEntry, FailedRequest};
use fantoccini::{Client, ClientBuilder, Locator};
use std::future::Future;
use std::time::Duration;

/// Script installed after each navigation to buffer console output so the
/// probe can drain it later. Navigation resets page scripts, so this is
/// re-installed on every goto.
const CONSOLE_CAPTURE_JS: &str = r#"
(function() {
  if (window.__probe_console) { return; }
  window.__probe_console = [];
  ['log', 'info', 'warn', 'error'].forEach(function(level) {
    var original = console[level];
    console[level] = function() {
      window.__probe_console.push({
        level: level,
        message: Array.prototype.slice.call(arguments).join(' '),
        timestamp: new Date().toISOString()
      });
      original.apply(console, arguments);
    };
  });
})();
"#;

/// Script that drains buffered console entries
const CONSOLE_DRAIN_JS: &str = "return (window.__probe_console || []).splice(0);";

/// Script that reports resource requests which completed with an error status
const FAILED_REQUESTS_JS: &str = r#"
return performance.getEntriesByType('resource')
  .filter(function(e) { return e.responseStatus && e.responseStatus >= 400; })
  .map(function(e) {
    return { method: 'GET', url: e.name, status: e.responseStatus };
  });
"#;

/// The WebDriver operations a browser probe needs from a session.
///
/// The probe pipeline is generic over this trait so tests can drive it
/// with a scripted session and verify teardown and matcher ordering.
pub trait BrowserSession {
    /// Navigate to a URL
    async fn goto(&mut self, url: &str) -> Result<(), ProbeError>;

    /// URL of the current page
    async fn current_url(&mut self) -> Result<String, ProbeError>;

    /// Title of the current page, if any
    async fn title(&mut self) -> Result<Option<String>, ProbeError>;

    /// Full page source
    async fn page_source(&mut self) -> Result<String, ProbeError>;

    /// Document readiness state ("loading", "interactive", "complete")
    async fn ready_state(&mut self) -> Result<String, ProbeError>;

    /// Whether a visible element matches the selector
    async fn is_visible(&mut self, selector: &str) -> Result<bool, ProbeError>;

    /// Type a value into the element matching the selector
    async fn fill(&mut self, selector: &str, value: &str) -> Result<(), ProbeError>;

    /// Click the element matching the selector
    async fn click(&mut self, selector: &str) -> Result<(), ProbeError>;

    /// Drain console entries buffered since the last drain
    async fn drain_console(&mut self) -> Result<Vec<ConsoleEntry>, ProbeError>;

    /// Resource requests that completed with an error status
    async fn failed_requests(&mut self) -> Result<Vec<FailedRequest>, ProbeError>;

    /// PNG screenshot of the current viewport
    async fn screenshot(&mut self) -> Result<Vec<u8>, ProbeError>;

    /// Tear the session down. Must be called exactly once per session.
    async fn close(self) -> Result<(), ProbeError>;
}

/// Bounds a single WebDriver round-trip so a stalled server cannot hang
/// the probe indefinitely. The step name identifies which command
/// overran in the resulting error.
async fn bounded<T>(
    limit: Duration,
    step: &'static str,
    fut: impl Future<Output = Result<T, ProbeError>>,
) -> Result<T, ProbeError> {
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(ProbeError::Timeout {
            step,
            secs: limit.as_secs(),
        }),
    }
}

/// A fantoccini-backed browser session.
///
/// Every command is bounded by the configured per-command timeout; only
/// navigation carries its own, larger bound at the pipeline level.
pub struct WebDriverSession {
    client: Client,
    command_timeout: Duration,
}

impl WebDriverSession {
    /// Connect to a WebDriver server and apply the probe viewport.
    ///
    /// Falls back to common alternative WebDriver ports when the
    /// configured URL refuses the connection.
    pub async fn connect(
        webdriver_url: &str,
        viewport: (u32, u32),
        command_timeout: Duration,
    ) -> Result<Self, ProbeError> {
        let client = Self::connect_with_fallbacks(webdriver_url).await?;

        let (width, height) = viewport;
        if let Err(e) = client.set_window_size(width, height).await {
            ::log::warn!("Failed to set viewport to {}x{}: {}", width, height, e);
        }

        Ok(Self {
            client,
            command_timeout,
        })
    }

    async fn connect_with_fallbacks(webdriver_url: &str) -> Result<Client, ProbeError> {
        let first_error = match ClientBuilder::native().connect(webdriver_url).await {
            Ok(client) => {
                ::log::debug!("Connected to WebDriver at {}", webdriver_url);
                return Ok(client);
            }
            Err(e) => {
                ::log::error!("Failed to connect to WebDriver at {}: {}", webdriver_url, e);
                e
            }
        };

        // Common alternative ports, same list a local WebDriver setup
        // usually ends up on
        let fallback_urls = [
            "http://localhost:9515", // ChromeDriver default
            "http://localhost:4444", // geckodriver default
            "http://127.0.0.1:4444",
        ];

        for url in fallback_urls.iter() {
            if *url == webdriver_url {
                continue;
            }

            ::log::info!("Trying fallback WebDriver URL: {}", url);
            if let Ok(client) = ClientBuilder::native().connect(url).await {
                ::log::debug!("Connected to fallback WebDriver at {}", url);
                return Ok(client);
            }
        }

        ::log::error!(
            "No WebDriver server reachable; start one or set PROBE_WEBDRIVER_URL"
        );
        Err(ProbeError::Connect(first_error))
    }
}

impl BrowserSession for WebDriverSession {
    async fn goto(&mut self, url: &str) -> Result<(), ProbeError> {
        let client = &self.client;
        // Navigation is bounded by the pipeline's navigation timeout,
        // which wraps this whole call; only the capture-script install
        // needs the per-command bound here.
        client.goto(url).await?;
        bounded(self.command_timeout, "console capture install", async {
            client.execute(CONSOLE_CAPTURE_JS, vec![]).await?;
            Ok(())
        })
        .await
    }

    async fn current_url(&mut self) -> Result<String, ProbeError> {
        let client = &self.client;
        bounded(self.command_timeout, "current URL", async {
            Ok(client.current_url().await?.to_string())
        })
        .await
    }

    async fn title(&mut self) -> Result<Option<String>, ProbeError> {
        let client = &self.client;
        bounded(self.command_timeout, "title", async {
            let value = client.execute("return document.title;", vec![]).await?;
            let title = value.as_str().unwrap_or_default().to_string();
            Ok(if title.is_empty() { None } else { Some(title) })
        })
        .await
    }

    async fn page_source(&mut self) -> Result<String, ProbeError> {
        let client = &self.client;
        bounded(self.command_timeout, "page source", async {
            Ok(client.source().await?)
        })
        .await
    }

    async fn ready_state(&mut self) -> Result<String, ProbeError> {
        let client = &self.client;
        bounded(self.command_timeout, "ready state", async {
            let value = client
                .execute("return document.readyState;", vec![])
                .await?;
            Ok(value.as_str().unwrap_or_default().to_string())
        })
        .await
    }

    async fn is_visible(&mut self, selector: &str) -> Result<bool, ProbeError> {
        let client = &self.client;
        bounded(self.command_timeout, "visibility check", async {
            match client.find(Locator::Css(selector)).await {
                Ok(element) => Ok(element.is_displayed().await?),
                Err(e) if e.is_no_such_element() => Ok(false),
                Err(e) => Err(e.into()),
            }
        })
        .await
    }

    async fn fill(&mut self, selector: &str, value: &str) -> Result<(), ProbeError> {
        let client = &self.client;
        bounded(self.command_timeout, "fill", async {
            let element = client
                .find(Locator::Css(selector))
                .await
                .map_err(|e| ProbeError::Interaction {
                    selector: selector.to_string(),
                    source: e,
                })?;
            element
                .send_keys(value)
                .await
                .map_err(|e| ProbeError::Interaction {
                    selector: selector.to_string(),
                    source: e,
                })
        })
        .await
    }

    async fn click(&mut self, selector: &str) -> Result<(), ProbeError> {
        let client = &self.client;
        bounded(self.command_timeout, "click", async {
            let element = client
                .find(Locator::Css(selector))
                .await
                .map_err(|e| ProbeError::Interaction {
                    selector: selector.to_string(),
                    source: e,
                })?;
            element.click().await.map_err(|e| ProbeError::Interaction {
                selector: selector.to_string(),
                source: e,
            })
        })
        .await
    }

    async fn drain_console(&mut self) -> Result<Vec<ConsoleEntry>, ProbeError> {
        let client = &self.client;
        bounded(self.command_timeout, "console drain", async {
            let value = client.execute(CONSOLE_DRAIN_JS, vec![]).await?;
            Ok(serde_json::from_value(value).unwrap_or_else(|e| {
                ::log::warn!("Could not decode console entries: {}", e);
                Vec::new()
            }))
        })
        .await
    }

    async fn failed_requests(&mut self) -> Result<Vec<FailedRequest>, ProbeError> {
        let client = &self.client;
        bounded(self.command_timeout, "failed-request scan", async {
            let value = client.execute(FAILED_REQUESTS_JS, vec![]).await?;
            Ok(serde_json::from_value(value).unwrap_or_else(|e| {
                ::log::warn!("Could not decode failed request entries: {}", e);
                Vec::new()
            }))
        })
        .await
    }

    async fn screenshot(&mut self) -> Result<Vec<u8>, ProbeError> {
        let client = &self.client;
        bounded(self.command_timeout, "screenshot", async {
            Ok(client.screenshot().await?)
        })
        .await
    }

    async fn close(self) -> Result<(), ProbeError> {
        bounded(self.command_timeout, "session close", async {
            self.client.close().await?;
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::future::pending;

    #[tokio::test]
    async fn test_stalled_command_times_out() {
        let result: Result<(), ProbeError> =
            bounded(Duration::from_millis(50), "page source", pending()).await;

        match result {
            Err(ProbeError::Timeout { step, secs }) => {
                assert_eq!(step, "page source");
                assert_eq!(secs, 0);
            }
            other => panic!("expected a timeout, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_completed_command_passes_through() {
        let result = bounded(Duration::from_secs(5), "title", async { Ok(7) }).await;
        assert_eq!(result.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_bounded_preserves_command_errors() {
        let result: Result<(), ProbeError> = bounded(Duration::from_secs(5), "fill", async {
            Err(ProbeError::Session("injected".to_string()))
        })
        .await;

        match result {
            Err(ProbeError::Session(msg)) => assert_eq!(msg, "injected"),
            other => panic!("expected the original error, got {:?}", other),
        }
    }
}
