use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

/// Naming scheme for screenshot artifacts
#[derive(Debug, Clone)]
pub enum ArtifactNaming {
    /// Reuse one fixed file stem per scenario. Last writer wins;
    /// concurrent runs against the same directory clobber each other.
    Fixed(String),

    /// Derive names from scenario, timestamp, process id and a per-store
    /// sequence number so repeated and concurrent runs never collide
    Timestamped,
}

/// Writes screenshot artifacts under a single directory
#[derive(Debug)]
pub struct ArtifactStore {
    dir: PathBuf,
    naming: ArtifactNaming,
    sequence: AtomicU64,
}

impl ArtifactStore {
    /// Create a store rooted at the given directory
    pub fn new(dir: impl Into<PathBuf>, naming: ArtifactNaming) -> Self {
        Self {
            dir: dir.into(),
            naming,
            sequence: AtomicU64::new(0),
        }
    }

    /// Directory the store writes into
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Compute the path the next screenshot for this scenario will use
    pub fn screenshot_path(&self, scenario: &str) -> PathBuf {
        let stem = match &self.naming {
            ArtifactNaming::Fixed(name) => sanitize_name(name),
            ArtifactNaming::Timestamped => {
                let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
                format!(
                    "{}_{}_{}-{}",
                    sanitize_name(scenario),
                    chrono::Utc::now().format("%Y%m%dT%H%M%S"),
                    std::process::id(),
                    seq
                )
            }
        };
        self.dir.join(format!("{}.png", stem))
    }

    /// Write screenshot bytes, creating the directory if needed.
    /// Returns the path written.
    pub fn write_screenshot(&self, scenario: &str, bytes: &[u8]) -> io::Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;
        let path = self.screenshot_path(scenario);
        fs::write(&path, bytes)?;
        ::log::info!("Wrote screenshot: {}", path.display());
        Ok(path)
    }
}

/// Sanitize a scenario name for use in filenames
fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' => c,
            _ => '_',
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("login probe"), "login_probe");
        assert_eq!(sanitize_name("after/submit"), "after_submit");
        assert_eq!(sanitize_name("error-state"), "error-state");
    }

    #[test]
    fn test_fixed_naming_last_writer_wins() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(
            tmp.path(),
            ArtifactNaming::Fixed("login-state".to_string()),
        );

        let first = store.write_screenshot("initial", b"first").unwrap();
        let second = store.write_screenshot("after-submit", b"second").unwrap();

        // Both writes land on the same fixed path; the later one wins.
        assert_eq!(first, second);
        assert_eq!(fs::read(&second).unwrap(), b"second");
        assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_timestamped_naming_never_collides() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(tmp.path(), ArtifactNaming::Timestamped);

        let first = store.write_screenshot("initial", b"a").unwrap();
        let second = store.write_screenshot("initial", b"b").unwrap();

        assert_ne!(first, second);
        assert!(first.exists());
        assert!(second.exists());
    }

    #[test]
    fn test_screenshot_path_uses_scenario() {
        let store = ArtifactStore::new("artifacts", ArtifactNaming::Timestamped);
        let path = store.screenshot_path("error state");
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("error_state_"));
        assert!(name.ends_with(".png"));
    }
}
