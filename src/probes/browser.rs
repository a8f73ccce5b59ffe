use crate::artifacts::{ArtifactNaming, ArtifactStore};
use crate::config::BrowserProbeConfig;
use crate::matchers::{FieldIntent, MatchResult, MatcherPlan};
use crate::outcome::{BrowserProbeReport, ProbeOutcome};
use crate::probes::ProbeError;
use crate::session::{BrowserSession, WebDriverSession};
use crate::snapshot::{self, Snapshot};
use std::time::Duration;
use tokio::time::{Instant, sleep, timeout};
use url::Url;

/// Poll interval while waiting for the page to settle
const SETTLE_POLL_MS: u64 = 100;

/// Runs the browser state probe end to end: open a session, settle,
/// snapshot, optionally log in, and tear down.
pub async fn run(config: &BrowserProbeConfig) -> Result<BrowserProbeReport, ProbeError> {
    Url::parse(&config.target_url)
        .map_err(|e| ProbeError::Config(format!("invalid target URL '{}': {}", config.target_url, e)))?;

    ::log::info!("Starting browser probe for: {}", config.target_url);

    let session = WebDriverSession::connect(
        &config.webdriver_url,
        (config.viewport_width, config.viewport_height),
        Duration::from_secs(config.command_timeout_secs),
    )
    .await?;

    let artifacts = artifact_store(config);
    run_with_session(session, config, &artifacts).await
}

/// Builds the artifact store described by the configuration
pub fn artifact_store(config: &BrowserProbeConfig) -> ArtifactStore {
    let naming = match &config.fixed_artifact_name {
        Some(name) => ArtifactNaming::Fixed(name.clone()),
        None => ArtifactNaming::Timestamped,
    };
    ArtifactStore::new(config.artifact_dir.clone(), naming)
}

/// Drives the probe body over an already-open session.
///
/// Owns the session for its whole lifetime and closes it exactly once on
/// every exit path. On failure a best-effort error-state screenshot is
/// attempted first; a secondary failure there never masks the original
/// error.
pub async fn run_with_session<S: BrowserSession>(
    mut session: S,
    config: &BrowserProbeConfig,
    artifacts: &ArtifactStore,
) -> Result<BrowserProbeReport, ProbeError> {
    let result = probe_body(&mut session, config, artifacts).await;

    let result = match result {
        Ok(report) => Ok(report),
        Err(err) => {
            ::log::error!("Browser probe failed: {}", err);
            match session.screenshot().await {
                Ok(bytes) => {
                    if let Err(write_err) = artifacts.write_screenshot("error-state", &bytes) {
                        ::log::warn!("Could not write error-state screenshot: {}", write_err);
                    }
                }
                Err(shot_err) => {
                    ::log::warn!("Could not capture error-state screenshot: {}", shot_err);
                }
            }
            Err(err)
        }
    };

    if let Err(close_err) = session.close().await {
        ::log::warn!("Failed to close browser session: {}", close_err);
    }

    result
}

async fn probe_body<S: BrowserSession>(
    session: &mut S,
    config: &BrowserProbeConfig,
    artifacts: &ArtifactStore,
) -> Result<BrowserProbeReport, ProbeError> {
    let nav_secs = config.navigation_timeout_secs;
    timeout(Duration::from_secs(nav_secs), session.goto(&config.target_url))
        .await
        .map_err(|_| ProbeError::Timeout {
            step: "navigation",
            secs: nav_secs,
        })??;

    settle(session, config).await?;

    let initial = capture_snapshot(session, config).await?;
    let mut written = Vec::new();
    written.push(write_screenshot(session, artifacts, "initial").await?);

    // A present-but-empty mount point means the client-side render died
    // before producing any UI; nothing below is worth trying.
    if snapshot::root_mount_is_empty(
        &session.page_source().await?,
        &config.root_mount_selector,
    ) == Some(true)
    {
        ::log::warn!(
            "Mount point '{}' is empty; classifying as error boundary",
            config.root_mount_selector
        );
        return Ok(BrowserProbeReport {
            outcome: ProbeOutcome::ErrorBoundaryTriggered,
            initial,
            after_submit: None,
            artifacts: written,
        });
    }

    let username_plan = MatcherPlan::for_intent(FieldIntent::Username);
    let username_match = locate(session, &username_plan).await?;

    let MatchResult::Found {
        selector: username_selector,
        priority,
    } = username_match
    else {
        // No login form anywhere; assume this session already holds an
        // authenticated state rather than failing outright.
        ::log::info!("No login form matched; assuming already authenticated");
        return Ok(BrowserProbeReport {
            outcome: ProbeOutcome::AlreadyAuthenticated,
            initial,
            after_submit: None,
            artifacts: written,
        });
    };

    ::log::info!(
        "Login form found via '{}' (strategy {})",
        username_selector,
        priority
    );

    let (Some(username), Some(password)) = (&config.username, &config.password) else {
        return Ok(BrowserProbeReport {
            outcome: ProbeOutcome::LoginFormFound,
            initial,
            after_submit: None,
            artifacts: written,
        });
    };

    let password_match = locate(session, &MatcherPlan::for_intent(FieldIntent::Password)).await?;
    let submit_match = locate(session, &MatcherPlan::for_intent(FieldIntent::Submit)).await?;

    let (MatchResult::Found { selector: password_selector, .. }, Some(submit_selector)) =
        (password_match, submit_match.selector().map(str::to_string))
    else {
        ::log::warn!("Login form is incomplete; skipping scripted interaction");
        return Ok(BrowserProbeReport {
            outcome: ProbeOutcome::LoginFormFound,
            initial,
            after_submit: None,
            artifacts: written,
        });
    };

    // Scripted interaction. No retry: a failed fill or click propagates
    // to the top-level handler, which still guarantees a screenshot and
    // session teardown.
    session.fill(&username_selector, username).await?;
    session.fill(&password_selector, password).await?;
    session.click(&submit_selector).await?;

    settle(session, config).await?;

    let after_submit = capture_snapshot(session, config).await?;
    written.push(write_screenshot(session, artifacts, "after-submit").await?);

    let still_on_form = session.is_visible(&username_selector).await?;
    let outcome = if still_on_form {
        ProbeOutcome::LoginRejected
    } else {
        ProbeOutcome::LoginSubmitted {
            landed_url: after_submit.url.clone(),
        }
    };

    Ok(BrowserProbeReport {
        outcome,
        initial,
        after_submit: Some(after_submit),
        artifacts: written,
    })
}

/// Waits until the page is considered settled.
///
/// With a configured readiness marker this is an explicit contract: the
/// document must be complete and the marker visible. Without one it
/// falls back to readiness plus a fixed grace delay, which tolerates
/// client-side rendering that finishes network activity before finishing
/// DOM mutation but remains a heuristic.
pub async fn settle<S: BrowserSession>(
    session: &mut S,
    config: &BrowserProbeConfig,
) -> Result<(), ProbeError> {
    let deadline = Instant::now() + Duration::from_secs(config.settle_timeout_secs);

    loop {
        if session.ready_state().await? == "complete" {
            match &config.ready_selector {
                Some(marker) => {
                    if session.is_visible(marker).await? {
                        ::log::debug!("Readiness marker '{}' is visible", marker);
                        return Ok(());
                    }
                }
                None => {
                    sleep(Duration::from_millis(config.settle_grace_ms)).await;
                    return Ok(());
                }
            }
        }

        if Instant::now() >= deadline {
            return Err(ProbeError::Settle {
                waited_secs: config.settle_timeout_secs,
            });
        }
        sleep(Duration::from_millis(SETTLE_POLL_MS)).await;
    }
}

/// Evaluates a matcher plan against the live page: selectors are tried in
/// declared priority order and the first visible match wins.
pub async fn locate<S: BrowserSession>(
    session: &mut S,
    plan: &MatcherPlan,
) -> Result<MatchResult, ProbeError> {
    for (priority, selector) in plan.selectors().enumerate() {
        if session.is_visible(&selector).await? {
            return Ok(MatchResult::Found { selector, priority });
        }
        ::log::debug!("No visible match for '{}'", selector);
    }
    Ok(MatchResult::NoMatch)
}

/// Captures a snapshot of the current page state. Console and network
/// capture are best effort; a failure there degrades the snapshot rather
/// than failing the probe.
pub async fn capture_snapshot<S: BrowserSession>(
    session: &mut S,
    config: &BrowserProbeConfig,
) -> Result<Snapshot, ProbeError> {
    let url = session.current_url().await?;
    let title = session.title().await?;
    let html = session.page_source().await?;

    let console = match session.drain_console().await {
        Ok(entries) => entries,
        Err(e) => {
            ::log::warn!("Console capture failed: {}", e);
            Vec::new()
        }
    };
    let failed_requests = match session.failed_requests().await {
        Ok(entries) => entries,
        Err(e) => {
            ::log::warn!("Failed-request capture failed: {}", e);
            Vec::new()
        }
    };

    Ok(Snapshot::from_page_source(
        &url,
        title,
        &html,
        &config.snapshot_selectors,
        console,
        failed_requests,
    ))
}

async fn write_screenshot<S: BrowserSession>(
    session: &mut S,
    artifacts: &ArtifactStore,
    scenario: &str,
) -> Result<std::path::PathBuf, ProbeError> {
    let bytes = session.screenshot().await?;
    Ok(artifacts.write_screenshot(scenario, &bytes)?)
}
