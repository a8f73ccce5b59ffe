pub mod browser;
pub mod data;

#[cfg(test)]
mod tests;

use std::fmt;

/// Errors surfaced by probe pipelines.
///
/// Store-query failures are recorded in the report and do not halt the
/// data probe battery; browser-automation failures propagate to the
/// single top-level handler.
#[derive(Debug)]
pub enum ProbeError {
    /// Invalid or missing configuration
    Config(String),

    /// Could not establish a WebDriver session
    Connect(fantoccini::error::NewSessionError),

    /// A WebDriver command failed
    WebDriver(fantoccini::error::CmdError),

    /// A network-bound step exceeded its timeout
    Timeout { step: &'static str, secs: u64 },

    /// The page did not settle within the configured window
    Settle { waited_secs: u64 },

    /// A fill or click against a located element failed
    Interaction {
        selector: String,
        source: fantoccini::error::CmdError,
    },

    /// The hosted store returned an error object for a query
    Store { table: String, message: String },

    /// HTTP transport failure talking to the hosted store
    Http(reqwest::Error),

    /// Failed to write a screenshot artifact
    Artifact(std::io::Error),

    /// Session-level failure (also used by test doubles for injection)
    Session(String),
}

impl fmt::Display for ProbeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeError::Config(msg) => write!(f, "configuration error: {}", msg),
            ProbeError::Connect(e) => write!(f, "failed to open WebDriver session: {}", e),
            ProbeError::WebDriver(e) => write!(f, "WebDriver command failed: {}", e),
            ProbeError::Timeout { step, secs } => {
                write!(f, "{} timed out after {}s", step, secs)
            }
            ProbeError::Settle { waited_secs } => {
                write!(f, "page did not settle within {}s", waited_secs)
            }
            ProbeError::Interaction { selector, source } => {
                write!(f, "interaction with '{}' failed: {}", selector, source)
            }
            ProbeError::Store { table, message } => {
                write!(f, "store query against '{}' failed: {}", table, message)
            }
            ProbeError::Http(e) => write!(f, "store request failed: {}", e),
            ProbeError::Artifact(e) => write!(f, "failed to write artifact: {}", e),
            ProbeError::Session(msg) => write!(f, "session error: {}", msg),
        }
    }
}

impl std::error::Error for ProbeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProbeError::Connect(e) => Some(e),
            ProbeError::WebDriver(e) => Some(e),
            ProbeError::Interaction { source, .. } => Some(source),
            ProbeError::Http(e) => Some(e),
            ProbeError::Artifact(e) => Some(e),
            _ => None,
        }
    }
}

impl From<fantoccini::error::CmdError> for ProbeError {
    fn from(e: fantoccini::error::CmdError) -> Self {
        ProbeError::WebDriver(e)
    }
}

impl From<fantoccini::error::NewSessionError> for ProbeError {
    fn from(e: fantoccini::error::NewSessionError) -> Self {
        ProbeError::Connect(e)
    }
}

impl From<reqwest::Error> for ProbeError {
    fn from(e: reqwest::Error) -> Self {
        ProbeError::Http(e)
    }
}

impl From<std::io::Error> for ProbeError {
    fn from(e: std::io::Error) -> Self {
        ProbeError::Artifact(e)
    }
}
