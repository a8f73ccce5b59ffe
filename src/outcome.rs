use crate::snapshot::Snapshot;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Classification of what state the probed page was found in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProbeOutcome {
    /// A visible login form was located and no interaction was requested
    LoginFormFound,

    /// No login form matched; the page is assumed to be past authentication
    AlreadyAuthenticated,

    /// The client-rendering mount point exists but is empty
    ErrorBoundaryTriggered,

    /// Credentials were submitted and the page moved on
    LoginSubmitted { landed_url: String },

    /// Credentials were submitted but the login form is still present
    LoginRejected,
}

impl fmt::Display for ProbeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeOutcome::LoginFormFound => write!(f, "login form found"),
            ProbeOutcome::AlreadyAuthenticated => write!(f, "already authenticated"),
            ProbeOutcome::ErrorBoundaryTriggered => write!(f, "error boundary triggered"),
            ProbeOutcome::LoginSubmitted { landed_url } => {
                write!(f, "login submitted, landed on {}", landed_url)
            }
            ProbeOutcome::LoginRejected => write!(f, "login rejected, form still present"),
        }
    }
}

/// Everything a browser probe run produced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserProbeReport {
    /// Final classification
    pub outcome: ProbeOutcome,

    /// Snapshot captured once the page first settled
    pub initial: Snapshot,

    /// Snapshot captured after the scripted interaction, if one ran
    pub after_submit: Option<Snapshot>,

    /// Screenshot files written during the run
    pub artifacts: Vec<PathBuf>,
}

impl BrowserProbeReport {
    /// Render the report to the console
    pub fn print(&self) {
        println!("=== browser probe: {} ===", self.outcome);
        print_snapshot("initial", &self.initial);
        if let Some(after) = &self.after_submit {
            print_snapshot("after submit", after);
        }
        for path in &self.artifacts {
            println!("artifact: {}", path.display());
        }
    }
}

fn print_snapshot(label: &str, snapshot: &Snapshot) {
    println!("--- snapshot ({}) at {} ---", label, snapshot.captured_at);
    println!("url:   {}", snapshot.url);
    if let Some(title) = &snapshot.title {
        println!("title: {}", title);
    }
    if !snapshot.text_excerpt.is_empty() {
        println!("text:  {}", snapshot.text_excerpt);
    }
    for element in &snapshot.elements {
        println!(
            "  <{} class=\"{}\"> {}",
            element.tag,
            element.classes.join(" "),
            element.text
        );
    }
    for entry in snapshot.console_problems() {
        println!("  console[{}] {}: {}", entry.level, entry.timestamp, entry.message);
    }
    for request in &snapshot.failed_requests {
        println!(
            "  failed request: {} {} -> {}",
            request.method, request.url, request.status
        );
    }
}
